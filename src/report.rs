//! 解析結果のファイル出力（角度CSV・サマリTOML）

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::pipeline::PipelineOutcome;
use crate::rom::{AngleSeries, RomSummary};

pub const ANGLE_CSV_FILE: &str = "angle_data.csv";
pub const ANGLE_PLOT_FILE: &str = "angle_plot.png";
pub const SUMMARY_FILE: &str = "summary.toml";

/// `frame,angle_deg` 形式で書き出す
pub fn write_angle_csv<W: Write>(mut writer: W, series: &AngleSeries) -> std::io::Result<()> {
    writeln!(writer, "frame,angle_deg")?;
    for sample in series.samples() {
        writeln!(writer, "{},{}", sample.frame_index, sample.angle_deg)?;
    }
    writer.flush()
}

pub fn save_angle_csv<P: AsRef<Path>>(path: P, series: &AngleSeries) -> Result<()> {
    let path = path.as_ref();
    let file = fs::File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_angle_csv(BufWriter::new(file), series)
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// summary.toml の内容
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub input: PathBuf,
    pub output_video: PathBuf,
    pub joint: String,
    /// メタデータの回転
    pub rotation_deg: i32,
    /// 解析側で補正した回転（デコーダが回転済みなら 0）
    pub applied_rotation_deg: i32,
    pub output_width: i32,
    pub output_height: i32,
    pub frames_written: usize,
    pub frames_detected: usize,
    pub frames_degenerate: usize,
    pub rom_deg: f64,
    /// 検出が1フレームもなければ省略
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angles: Option<RomSummary>,
}

impl AnalysisSummary {
    pub fn new(input: &Path, output_video: &Path, joint: &str, outcome: &PipelineOutcome) -> Self {
        Self {
            input: input.to_path_buf(),
            output_video: output_video.to_path_buf(),
            joint: joint.to_string(),
            rotation_deg: outcome.rotation.degrees(),
            applied_rotation_deg: outcome.applied_rotation.degrees(),
            output_width: outcome.output_size.0,
            output_height: outcome.output_size.1,
            frames_written: outcome.frames_written,
            frames_detected: outcome.frames_detected,
            frames_degenerate: outcome.frames_degenerate,
            rom_deg: outcome.rom(),
            angles: outcome.series.summary(),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize summary")
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_toml()?).with_context(|| format!("Failed to write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::Rotation;

    fn outcome(series: AngleSeries) -> PipelineOutcome {
        PipelineOutcome {
            frames_detected: series.len(),
            series,
            rotation: Rotation::Cw90,
            applied_rotation: Rotation::Cw90,
            output_size: (720, 1280),
            frames_written: 10,
            frames_degenerate: 1,
        }
    }

    #[test]
    fn test_csv() {
        let series: AngleSeries = [(2, 15.5), (5, 90.0)].into_iter().collect();
        let mut buf = Vec::new();
        write_angle_csv(&mut buf, &series).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "frame,angle_deg\n2,15.5\n5,90\n");
    }

    #[test]
    fn test_csv_empty_series_has_header() {
        let mut buf = Vec::new();
        write_angle_csv(&mut buf, &AngleSeries::new()).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "frame,angle_deg\n");
    }

    #[test]
    fn test_summary_toml() {
        let series: AngleSeries = [(1, 20.0), (4, 110.0)].into_iter().collect();
        let summary = AnalysisSummary::new(
            Path::new("in.mp4"),
            Path::new("saved_results/output.mp4"),
            "right_shoulder_abduction",
            &outcome(series),
        );
        let text = summary.to_toml().unwrap();
        let value: toml::Value = toml::from_str(&text).unwrap();

        assert_eq!(value["rotation_deg"].as_integer(), Some(90));
        assert_eq!(value["applied_rotation_deg"].as_integer(), Some(90));
        assert_eq!(value["output_width"].as_integer(), Some(720));
        assert_eq!(value["frames_detected"].as_integer(), Some(2));
        assert_eq!(value["rom_deg"].as_float(), Some(90.0));
        assert_eq!(value["angles"]["peak_frame"].as_integer(), Some(4));
        assert_eq!(value["joint"].as_str(), Some("right_shoulder_abduction"));
    }

    #[test]
    fn test_summary_without_detection() {
        let summary = AnalysisSummary::new(Path::new("a.mp4"), Path::new("b.mp4"), "j", &outcome(AngleSeries::new()));
        let value: toml::Value = toml::from_str(&summary.to_toml().unwrap()).unwrap();
        assert!(value.get("angles").is_none());
        assert_eq!(value["rom_deg"].as_float(), Some(0.0));
    }
}
