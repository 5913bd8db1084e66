use anyhow::{Context, Result};
use opencv::{
    core::{Mat, Size},
    prelude::*,
    videoio::{self, VideoCapture, VideoWriter},
};
use std::path::Path;
use tracing::{debug, info, warn};

use super::rotation::Rotation;

/// 映像ストリームの基本情報
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamInfo {
    pub width: i32,
    pub height: i32,
    pub fps: f64,
    /// コンテナが申告するフレーム数（不明なら None）
    pub frame_count: Option<i32>,
    /// デコーダがメタデータの回転を適用済み（自動回転を切れなかった）
    pub decoder_oriented: bool,
}

impl StreamInfo {
    /// 回転補正後の寸法
    pub fn rotated(&self, rotation: Rotation) -> StreamInfo {
        let (width, height) = rotation.apply_to_size(self.width, self.height);
        StreamInfo {
            width,
            height,
            ..*self
        }
    }
}

/// フレームの読み出し元（BGR）
pub trait FrameSource {
    fn info(&self) -> StreamInfo;

    /// 次のフレーム。ストリーム終端では None
    fn read(&mut self) -> opencv::Result<Option<Mat>>;

    /// ハンドルを解放する。複数回呼んでもよい
    fn release(&mut self);
}

/// フレームの書き出し先（BGR）
pub trait FrameSink {
    fn write(&mut self, frame: &Mat) -> opencv::Result<()>;

    /// ハンドルを解放する。複数回呼んでもよい
    fn release(&mut self);
}

/// ソースとシンクを開く
pub trait MediaBackend {
    type Source: FrameSource;
    type Sink: FrameSink;

    fn open_source(&self, path: &Path) -> Result<Self::Source>;

    /// `info` の寸法・FPSで書き出し先を開く
    fn open_sink(&self, path: &Path, info: &StreamInfo) -> Result<Self::Sink>;
}

/// OpenCV videoio による実装
#[derive(Debug, Clone)]
pub struct OpenCvBackend {
    fourcc: [char; 4],
}

impl OpenCvBackend {
    /// fourcc は4文字（例: "mp4v"）。足りない分は空白で埋める
    pub fn new(fourcc: &str) -> Self {
        let mut code = [' '; 4];
        for (slot, ch) in code.iter_mut().zip(fourcc.chars()) {
            *slot = ch;
        }
        Self { fourcc: code }
    }

    pub fn fourcc(&self) -> [char; 4] {
        self.fourcc
    }
}

impl Default for OpenCvBackend {
    fn default() -> Self {
        Self::new("mp4v")
    }
}

impl MediaBackend for OpenCvBackend {
    type Source = VideoFileSource;
    type Sink = VideoFileSink;

    fn open_source(&self, path: &Path) -> Result<VideoFileSource> {
        VideoFileSource::open(path)
    }

    fn open_sink(&self, path: &Path, info: &StreamInfo) -> Result<VideoFileSink> {
        VideoFileSink::create(path, self.fourcc, info)
    }
}

/// 動画ファイルからの読み込み
pub struct VideoFileSource {
    capture: VideoCapture,
    info: StreamInfo,
    released: bool,
}

impl VideoFileSource {
    pub fn open(path: &Path) -> Result<Self> {
        let path_str = path
            .to_str()
            .with_context(|| format!("Non UTF-8 path: {}", path.display()))?;

        let mut capture = VideoCapture::from_file(path_str, videoio::CAP_ANY)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        if !capture.is_opened()? {
            anyhow::bail!("Video {} is not readable", path.display());
        }

        // 回転はメタデータから自前で補正するので、OpenCV 側の自動回転は切る
        if !capture.set(videoio::CAP_PROP_ORIENTATION_AUTO, 0.0)? {
            debug!("backend refused CAP_PROP_ORIENTATION_AUTO = 0");
        }
        // 対応しないバックエンドは 0 を返す（自動回転もしない）
        let decoder_oriented = capture.get(videoio::CAP_PROP_ORIENTATION_AUTO)? != 0.0;
        if decoder_oriented {
            warn!(
                "{}: decoder keeps auto-orientation on, frames arrive already rotated",
                path.display()
            );
        }

        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as i32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as i32;
        let fps = capture.get(videoio::CAP_PROP_FPS)?;
        let frame_count = capture.get(videoio::CAP_PROP_FRAME_COUNT)? as i32;

        let info = StreamInfo {
            width,
            height,
            fps,
            frame_count: (frame_count > 0).then_some(frame_count),
            decoder_oriented,
        };
        info!(
            "Source {}: {}x{} @ {:.2} fps, {:?} frames",
            path.display(),
            width,
            height,
            fps,
            info.frame_count
        );

        Ok(Self {
            capture,
            info,
            released: false,
        })
    }
}

impl FrameSource for VideoFileSource {
    fn info(&self) -> StreamInfo {
        self.info
    }

    fn read(&mut self) -> opencv::Result<Option<Mat>> {
        if self.released {
            return Ok(None);
        }
        let mut frame = Mat::default();
        if !self.capture.read(&mut frame)? || frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            if let Err(e) = self.capture.release() {
                debug!("VideoCapture::release failed: {}", e);
            }
        }
    }
}

impl Drop for VideoFileSource {
    fn drop(&mut self) {
        self.release();
    }
}

/// 動画ファイルへの書き出し
pub struct VideoFileSink {
    writer: VideoWriter,
    released: bool,
}

impl VideoFileSink {
    pub fn create(path: &Path, fourcc: [char; 4], info: &StreamInfo) -> Result<Self> {
        let path_str = path
            .to_str()
            .with_context(|| format!("Non UTF-8 path: {}", path.display()))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let code = VideoWriter::fourcc(fourcc[0], fourcc[1], fourcc[2], fourcc[3])?;
        // fps が取れないコンテナもあるので 30 にフォールバック
        let fps = if info.fps.is_finite() && info.fps > 0.0 {
            info.fps
        } else {
            30.0
        };
        let writer = VideoWriter::new(
            path_str,
            code,
            fps,
            Size::new(info.width, info.height),
            true,
        )
        .with_context(|| format!("Failed to create writer for {}", path.display()))?;

        if !writer.is_opened()? {
            anyhow::bail!("Video writer for {} is not available", path.display());
        }

        info!(
            "Destination {}: {}x{} @ {:.2} fps",
            path.display(),
            info.width,
            info.height,
            fps
        );

        Ok(Self {
            writer,
            released: false,
        })
    }
}

impl FrameSink for VideoFileSink {
    fn write(&mut self, frame: &Mat) -> opencv::Result<()> {
        self.writer.write(frame)
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            if let Err(e) = self.writer.release() {
                debug!("VideoWriter::release failed: {}", e);
            }
        }
    }
}

impl Drop for VideoFileSink {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_info_rotated() {
        let info = StreamInfo {
            width: 1920,
            height: 1080,
            fps: 29.97,
            frame_count: Some(300),
            decoder_oriented: false,
        };
        let rotated = info.rotated(Rotation::Cw90);
        assert_eq!((rotated.width, rotated.height), (1080, 1920));
        assert_eq!(rotated.fps, 29.97);
        assert_eq!(rotated.frame_count, Some(300));
        assert_eq!(info.rotated(Rotation::Rot180), info);
    }

    #[test]
    fn test_fourcc_padding() {
        assert_eq!(OpenCvBackend::new("mp4v").fourcc(), ['m', 'p', '4', 'v']);
        assert_eq!(OpenCvBackend::new("h26").fourcc(), ['h', '2', '6', ' ']);
        assert_eq!(OpenCvBackend::default().fourcc(), ['m', 'p', '4', 'v']);
    }

    #[test]
    fn test_open_missing_file_fails() {
        let result = VideoFileSource::open(Path::new("no/such/video.mp4"));
        assert!(result.is_err());
    }
}
