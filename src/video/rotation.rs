//! コンテナメタデータから表示回転を読み取る

use std::path::Path;
use std::process::Command;

use tracing::debug;

/// 表示回転（時計回り）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Rot180,
    /// 270° = 反時計回り90°
    Ccw90,
}

impl Rotation {
    /// 90/180/270 以外はすべて回転なし
    pub fn from_degrees(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            90 => Rotation::Cw90,
            180 => Rotation::Rot180,
            270 => Rotation::Ccw90,
            _ => Rotation::None,
        }
    }

    pub fn degrees(&self) -> i32 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 90,
            Rotation::Rot180 => 180,
            Rotation::Ccw90 => 270,
        }
    }

    /// 幅と高さが入れ替わるか
    pub fn swaps_dimensions(&self) -> bool {
        matches!(self, Rotation::Cw90 | Rotation::Ccw90)
    }

    /// 回転後の (幅, 高さ)
    pub fn apply_to_size(&self, width: i32, height: i32) -> (i32, i32) {
        if self.swaps_dimensions() {
            (height, width)
        } else {
            (width, height)
        }
    }
}

/// 回転メタデータの読み取り
pub trait RotationReader {
    /// 最初の映像ストリームの回転（度）。取得できなければ None
    fn read_rotation_tag(&self, path: &Path) -> Option<i32>;
}

/// ffprobe を呼び出して回転を読む
#[derive(Debug, Clone)]
pub struct FfprobeReader {
    program: String,
}

impl FfprobeReader {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for FfprobeReader {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl RotationReader for FfprobeReader {
    fn read_rotation_tag(&self, path: &Path) -> Option<i32> {
        let output = Command::new(&self.program)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream_tags=rotate:stream_side_data=rotation",
                "-of",
                "default=noprint_wrappers=1",
            ])
            .arg(path)
            .output();

        let output = match output {
            Ok(o) if o.status.success() => o,
            Ok(o) => {
                debug!(
                    "{} exited with {} for {}",
                    self.program,
                    o.status,
                    path.display()
                );
                return None;
            }
            Err(e) => {
                debug!("failed to run {}: {}", self.program, e);
                return None;
            }
        };

        parse_rotation_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// ffprobe の `key=value` 出力から回転（時計回り, 0〜359）を取り出す
///
/// - `TAG:rotate=90` はそのまま時計回り
/// - `rotation=-90` (display matrix) は反時計回りが正なので符号を反転
/// - キーのない行は旧来の `nokey=1` 出力として `rotate` 扱い
pub fn parse_rotation_output(output: &str) -> Option<i32> {
    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (key, value) = match line.split_once('=') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => ("rotate", line),
        };

        let Ok(degrees) = value.parse::<i32>() else {
            continue;
        };

        let clockwise = match key {
            "rotate" | "TAG:rotate" => degrees,
            "rotation" => -degrees,
            _ => continue,
        };
        return Some(clockwise.rem_euclid(360));
    }
    None
}

/// 動画の回転を取得。失敗時は回転なし
pub fn get_rotation(reader: &dyn RotationReader, path: &Path) -> Rotation {
    match reader.read_rotation_tag(path) {
        Some(degrees) => {
            let rotation = Rotation::from_degrees(degrees);
            debug!("rotation tag {}° -> {:?}", degrees, rotation);
            rotation
        }
        None => {
            debug!("no rotation metadata for {}", path.display());
            Rotation::None
        }
    }
}
