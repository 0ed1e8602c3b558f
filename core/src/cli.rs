//! Command-line interface for tfc-rs.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Run TensorFlow graphs through the libtensorflow C API.
#[derive(Parser, Debug)]
#[command(name = "tfc-rs")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Root of the unpacked libtensorflow archive.
    ///
    /// Takes precedence over `tensorflow.home` in the config file and the
    /// TENSORFLOW_HOME environment variable.
    #[arg(long, global = true)]
    pub tensorflow_home: Option<PathBuf>,

    /// Path to an optional YAML config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log every native handle creation and release.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute a + b with a Const/Const/Add graph.
    Add {
        /// Left operand (default from config, else 1.5).
        #[arg(long, allow_negative_numbers = true)]
        a: Option<f32>,

        /// Right operand (default from config, else 2.25).
        #[arg(long, allow_negative_numbers = true)]
        b: Option<f32>,

        /// Output format.
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Print the library version reported by TF_Version.
    Version,

    /// Resolve the shared libraries without loading them.
    Locate,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Pretty,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add() {
        let cli = Cli::try_parse_from([
            "tfc-rs",
            "add",
            "--a",
            "-1.5",
            "--b",
            "2",
            "--format",
            "json",
            "--tensorflow-home",
            "/opt/tf",
        ])
        .unwrap();
        assert_eq!(cli.tensorflow_home, Some(PathBuf::from("/opt/tf")));
        match cli.command {
            Commands::Add { a, b, format } => {
                assert_eq!(a, Some(-1.5));
                assert_eq!(b, Some(2.0));
                assert_eq!(format, OutputFormat::Json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_locate_with_config() {
        let cli = Cli::try_parse_from(["tfc-rs", "-c", "tf.yaml", "-v", "locate"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("tf.yaml")));
        assert!(matches!(cli.command, Commands::Locate));
    }

    #[test]
    fn test_command_required() {
        assert!(Cli::try_parse_from(["tfc-rs"]).is_err());
    }
}
