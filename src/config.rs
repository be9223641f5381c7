use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "config.toml";
const CONFIG_PATH_ENV: &str = "ROADSENSE_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("server port must be non-zero")]
    InvalidPort,
    #[error("jpeg quality must be within 1..=100, got {0}")]
    InvalidJpegQuality(u8),
    #[error("remote detector requires a url")]
    MissingDetectorUrl,
    #[error("onnx detector requested but roadsense was built without the `onnx` feature")]
    OnnxUnavailable,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_cors_allow_any() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_cors_allow_any")]
    pub cors_allow_any: bool,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_allow_any: default_cors_allow_any(),
        }
    }
}

fn default_idle_ms() -> u64 {
    5
}

fn default_jpeg_quality() -> u8 {
    80
}

fn default_outline_thickness() -> u32 {
    2
}

#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    /// Sleep between slot checks while no frame is pending.
    #[serde(default = "default_idle_ms")]
    pub idle_ms: u64,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    #[serde(default = "default_outline_thickness")]
    pub outline_thickness: u32,
}

impl InferenceConfig {
    pub fn idle_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.idle_ms)
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            idle_ms: default_idle_ms(),
            jpeg_quality: default_jpeg_quality(),
            outline_thickness: default_outline_thickness(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    Remote,
    Onnx,
}

fn default_detector_kind() -> DetectorKind {
    DetectorKind::Remote
}

fn default_detector_url() -> String {
    "http://127.0.0.1:8000/detect".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    2000
}

fn default_model_path() -> String {
    "models/hazards.onnx".to_string()
}

fn default_confidence_threshold() -> f32 {
    0.5
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfig {
    #[serde(default = "default_detector_kind")]
    pub kind: DetectorKind,
    #[serde(default = "default_detector_url")]
    pub url: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_model_path")]
    #[cfg_attr(not(feature = "onnx"), allow(dead_code))]
    pub model_path: String,
    #[serde(default = "default_confidence_threshold")]
    #[cfg_attr(not(feature = "onnx"), allow(dead_code))]
    pub confidence_threshold: f32,
    /// Class indices kept by the onnx detector. Empty keeps every class.
    #[serde(default)]
    #[cfg_attr(not(feature = "onnx"), allow(dead_code))]
    pub class_ids: Vec<usize>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            kind: default_detector_kind(),
            url: default_detector_url(),
            connect_timeout_ms: default_connect_timeout_ms(),
            model_path: default_model_path(),
            confidence_threshold: default_confidence_threshold(),
            class_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        Self::load_from(path)
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidPort);
        }

        let quality = self.inference.jpeg_quality;
        if !(1..=100).contains(&quality) {
            return Err(ConfigError::InvalidJpegQuality(quality));
        }

        match self.detector.kind {
            DetectorKind::Remote if self.detector.url.trim().is_empty() => {
                Err(ConfigError::MissingDetectorUrl)
            }
            DetectorKind::Onnx if !cfg!(feature = "onnx") => Err(ConfigError::OnnxUnavailable),
            _ => Ok(()),
        }
    }
}
