use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::geometry::JointModel;
use crate::render::OverlayStyle;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub joint: JointModel,
    #[serde(default)]
    pub overlay: OverlayStyle,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// ONNXモデルのパス
    #[serde(default = "default_model_path")]
    pub path: PathBuf,
    /// 17点の平均信頼度の閾値
    #[serde(default = "default_detection_threshold")]
    pub detection_threshold: f32,
    /// 個々のランドマークの信頼度の閾値
    #[serde(default = "default_keypoint_threshold")]
    pub keypoint_threshold: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    /// 結果の保存先ディレクトリ
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    /// 出力動画の fourcc
    #[serde(default = "default_fourcc")]
    pub fourcc: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProbeConfig {
    /// ffprobe の実行ファイル
    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,
}

fn default_model_path() -> PathBuf { PathBuf::from("models/movenet_lightning.onnx") }
fn default_detection_threshold() -> f32 { 0.2 }
fn default_keypoint_threshold() -> f32 { 0.1 }
fn default_output_dir() -> PathBuf { PathBuf::from("saved_results") }
fn default_fourcc() -> String { "mp4v".to_string() }
fn default_ffprobe() -> String { "ffprobe".to_string() }

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            detection_threshold: default_detection_threshold(),
            keypoint_threshold: default_keypoint_threshold(),
        }
    }
}

#[cfg(feature = "onnx")]
impl ModelConfig {
    pub fn thresholds(&self) -> crate::pose::MoveNetThresholds {
        crate::pose::MoveNetThresholds {
            detection: self.detection_threshold,
            keypoint: self.keypoint_threshold,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            fourcc: default_fourcc(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            ffprobe: default_ffprobe(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.output.fourcc.chars().count() > 4 {
            anyhow::bail!("fourcc must be at most 4 characters: {:?}", config.output.fourcc);
        }
        Ok(config)
    }

    /// 読めなければ警告を出して既定値を使う
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            warn!("{} not found, using defaults", path.display());
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{:#}, using defaults", e);
                Self::default()
            }
        }
    }
}
