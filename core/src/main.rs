//! CLI entry point for tfc-rs.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use tfc_rs::cli::{Cli, Commands, OutputFormat};
use tfc_rs::config::Config;
use tfc_rs::demo;
use tfc_rs::native::{resolve_home, resolve_libraries, BindingTable, Libraries, Platform};
use tfc_rs::TfError;

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .init();

    let config = if let Some(config_path) = &cli.config {
        Config::from_yaml_file(config_path)
            .with_context(|| format!("Failed to load config: {}", config_path.display()))?
    } else {
        Config::default()
    };

    let libraries = locate(&cli, &config)?;

    match cli.command {
        Commands::Locate => {
            println!("library:   {}", libraries.tensorflow.display());
            println!("framework: {}", display_optional(&libraries.framework));
        }

        Commands::Version => {
            let tf = load(libraries)?;
            println!("{}", demo::version(&tf).unwrap_or_else(|| "unknown".to_string()));
            tf.close();
        }

        Commands::Add { a, b, format } => {
            let a = a.unwrap_or(config.demo.a);
            let b = b.unwrap_or(config.demo.b);

            let tf = load(libraries)?;
            let version = demo::version(&tf);
            info!("TF_Version={}", version.as_deref().unwrap_or("unknown"));

            let result = demo::add_scalars(&tf, a, b).context("TensorFlow computation failed")?;

            match format {
                OutputFormat::Text => println!("{} + {} = {}", a, b, result),
                OutputFormat::Json | OutputFormat::Pretty => {
                    let output = serde_json::json!({
                        "version": version,
                        "a": a,
                        "b": b,
                        "result": result,
                        "library": tf.libraries().tensorflow,
                        "framework": tf.libraries().framework,
                    });
                    if format == OutputFormat::Pretty {
                        println!("{}", serde_json::to_string_pretty(&output)?);
                    } else {
                        println!("{}", serde_json::to_string(&output)?);
                    }
                }
            }
            tf.close();
        }
    }

    Ok(())
}

/// Resolve the library paths, adding a download hint when nothing is found.
fn locate(cli: &Cli, config: &Config) -> Result<Libraries> {
    let property = cli
        .tensorflow_home
        .as_ref()
        .map(|p| p.to_string_lossy().into_owned())
        .or_else(|| config.tensorflow.home.clone());
    let home = resolve_home(property.as_deref())?;
    info!("TensorFlow home: {}", home.display());

    let platform = Platform::current();
    match resolve_libraries(&home, platform) {
        Ok(libraries) => Ok(libraries),
        Err(err @ TfError::LibraryNotFound { .. }) => {
            let hint = platform
                .archive_url(&config.tensorflow.version)
                .map(|url| format!("unpack {} into {}", url, home.display()))
                .unwrap_or_else(|| {
                    "no prebuilt libtensorflow is published for this platform".to_string()
                });
            Err(anyhow::Error::new(err).context(hint))
        }
        Err(err) => Err(err.into()),
    }
}

fn load(libraries: Libraries) -> Result<BindingTable> {
    info!("Loading TensorFlow native library...");
    let tf = BindingTable::open(libraries).context("Failed to load the TensorFlow C API")?;
    info!("Library loaded successfully");
    Ok(tf)
}

fn display_optional(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<none>".to_string())
}
