//! Configuration types for tfc-rs.

use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Native library configuration.
    #[serde(default)]
    pub tensorflow: TensorFlowConfig,

    /// Demo inputs.
    #[serde(default)]
    pub demo: DemoConfig,
}

/// Native library configuration.
#[derive(Debug, Deserialize)]
pub struct TensorFlowConfig {
    /// Installation root of the unpacked libtensorflow archive.
    #[serde(default)]
    pub home: Option<String>,

    /// Release used when suggesting a download.
    #[serde(default = "default_version")]
    pub version: String,
}

impl Default for TensorFlowConfig {
    fn default() -> Self {
        Self {
            home: None,
            version: default_version(),
        }
    }
}

/// Operands for the `add` demo.
#[derive(Debug, Deserialize)]
pub struct DemoConfig {
    #[serde(default = "default_a")]
    pub a: f32,

    #[serde(default = "default_b")]
    pub b: f32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            a: default_a(),
            b: default_b(),
        }
    }
}

fn default_version() -> String {
    "2.18.0".to_string()
}

fn default_a() -> f32 {
    1.5
}

fn default_b() -> f32 {
    2.25
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<std::path::Path>) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> crate::error::Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }
}
