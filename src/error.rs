use std::path::PathBuf;
use thiserror::Error;

/// 解析を中断するエラー
///
/// 検出なし・角度が定義できないフレームはここには来ない（パイプライン内で吸収）。
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("could not read source video {path}: {reason}")]
    SourceOpen { path: PathBuf, reason: String },

    #[error("could not write destination video {path}: {reason}")]
    DestinationOpen { path: PathBuf, reason: String },

    #[error("frame {frame_index}: {source}")]
    Frame {
        frame_index: usize,
        #[source]
        source: opencv::Error,
    },

    #[error("landmark detection failed at frame {frame_index}: {source}")]
    Detection {
        frame_index: usize,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = PipelineError::SourceOpen {
            path: PathBuf::from("in.mp4"),
            reason: "not readable".to_string(),
        };
        assert_eq!(err.to_string(), "could not read source video in.mp4: not readable");

        let err = PipelineError::DestinationOpen {
            path: PathBuf::from("out.mp4"),
            reason: "permission denied".to_string(),
        };
        assert_eq!(err.to_string(), "could not write destination video out.mp4: permission denied");
    }
}
