//! フレームごとの解析ループ
//!
//! 読み込み → 回転補正 → 検出 → 角度計算 → 描画 → 書き出し を順に行う。

use opencv::{
    core::{AlgorithmHint, Mat, Size},
    imgproc,
    prelude::*,
};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::geometry::JointModel;
use crate::pose::LandmarkDetector;
use crate::render::OverlayRenderer;
use crate::rom::AngleSeries;
use crate::video::{
    correct, get_rotation, FrameSink, FrameSource, MediaBackend, Rotation, RotationReader,
    StreamInfo,
};

/// 進捗ログの間隔（フレーム）
const PROGRESS_INTERVAL: usize = 100;

/// パイプラインの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// 入出力を開いている（回転取得を含む）
    Open,
    /// 次のフレームを読んでいる
    Reading,
    /// 検出器を呼んでいる
    Detecting,
    Done,
    Failed,
}

/// 解析結果
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub series: AngleSeries,
    /// メタデータの回転
    pub rotation: Rotation,
    /// パイプラインが実際に補正した回転（デコーダが回転済みなら None）
    pub applied_rotation: Rotation,
    /// 出力動画の (幅, 高さ)
    pub output_size: (i32, i32),
    pub frames_written: usize,
    /// 角度が得られたフレーム数
    pub frames_detected: usize,
    /// ランドマークはあったが角度が定義できなかったフレーム数
    pub frames_degenerate: usize,
}

impl PipelineOutcome {
    pub fn rom(&self) -> f64 {
        self.series.rom()
    }
}

#[derive(Debug, Default)]
struct FrameStats {
    series: AngleSeries,
    written: usize,
    degenerate: usize,
}

/// 動画1本分の解析
pub struct VideoPipeline<B: MediaBackend, R: RotationReader> {
    backend: B,
    rotation_reader: R,
    joint: JointModel,
    renderer: OverlayRenderer,
    state: PipelineState,
}

impl<B: MediaBackend, R: RotationReader> VideoPipeline<B, R> {
    pub fn new(backend: B, rotation_reader: R, joint: JointModel, renderer: OverlayRenderer) -> Self {
        Self {
            backend,
            rotation_reader,
            joint,
            renderer,
            state: PipelineState::Open,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn transition(&mut self, next: PipelineState) {
        if self.state != next {
            debug!("pipeline {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    /// 動画を解析して、マーカー付き動画を `destination` に書き出す
    ///
    /// 検出器は呼び出し側が所有し、実行中だけ借りる。
    /// どの経路で終わっても、開いた入出力は返る前に解放される。
    pub fn run(
        &mut self,
        detector: &mut dyn LandmarkDetector,
        source_path: &Path,
        destination_path: &Path,
    ) -> Result<PipelineOutcome, PipelineError> {
        self.transition(PipelineState::Open);

        let rotation = get_rotation(&self.rotation_reader, source_path);
        info!("Rotation: {}°", rotation.degrees());

        let mut source = match self.backend.open_source(source_path) {
            Ok(source) => source,
            Err(e) => {
                self.transition(PipelineState::Failed);
                return Err(PipelineError::SourceOpen {
                    path: source_path.to_path_buf(),
                    reason: format!("{:#}", e),
                });
            }
        };

        // デコーダが回転済みのフレームをもう一度回さない
        let info = source.info();
        let applied_rotation = if info.decoder_oriented && rotation != Rotation::None {
            warn!(
                "Decoder already applied the {}° rotation, skipping correction",
                rotation.degrees()
            );
            Rotation::None
        } else {
            rotation
        };

        // 書き出し側は回転補正後の寸法で開く
        let output_info = info.rotated(applied_rotation);
        let mut sink = match self.backend.open_sink(destination_path, &output_info) {
            Ok(sink) => sink,
            Err(e) => {
                source.release();
                self.transition(PipelineState::Failed);
                return Err(PipelineError::DestinationOpen {
                    path: destination_path.to_path_buf(),
                    reason: format!("{:#}", e),
                });
            }
        };

        let result = self.process_frames(&mut source, &mut sink, detector, applied_rotation, &output_info);

        source.release();
        sink.release();

        match result {
            Ok(stats) => {
                self.transition(PipelineState::Done);
                info!(
                    "Processed {} frames, {} with angle, {} degenerate",
                    stats.written,
                    stats.series.len(),
                    stats.degenerate
                );
                Ok(PipelineOutcome {
                    frames_detected: stats.series.len(),
                    frames_written: stats.written,
                    frames_degenerate: stats.degenerate,
                    series: stats.series,
                    rotation,
                    applied_rotation,
                    output_size: (output_info.width, output_info.height),
                })
            }
            Err(e) => {
                self.transition(PipelineState::Failed);
                warn!("Pipeline failed: {}", e);
                Err(e)
            }
        }
    }

    fn process_frames(
        &mut self,
        source: &mut B::Source,
        sink: &mut B::Sink,
        detector: &mut dyn LandmarkDetector,
        rotation: Rotation,
        output_info: &StreamInfo,
    ) -> Result<FrameStats, PipelineError> {
        let mut stats = FrameStats::default();
        let mut size_warned = false;

        loop {
            let frame_index = stats.written;
            let frame_err = |source: opencv::Error| PipelineError::Frame {
                frame_index,
                source,
            };

            self.transition(PipelineState::Reading);
            let Some(raw) = source.read().map_err(frame_err)? else {
                break;
            };

            let mut frame = correct(raw, rotation).map_err(frame_err)?;

            let mut rgb = Mat::default();
            imgproc::cvt_color(
                &frame,
                &mut rgb,
                imgproc::COLOR_BGR2RGB,
                0,
                AlgorithmHint::ALGO_HINT_DEFAULT,
            )
            .map_err(frame_err)?;

            self.transition(PipelineState::Detecting);
            let detection = detector
                .detect(&rgb)
                .map_err(|source| PipelineError::Detection {
                    frame_index,
                    source,
                })?;

            if let Some(landmarks) = detection {
                match self.joint.measure(&landmarks, frame.cols(), frame.rows()) {
                    Ok(measurement) => {
                        self.renderer
                            .render(&mut frame, &measurement, &landmarks)
                            .map_err(frame_err)?;
                        stats.series.push(frame_index, measurement.angle_deg);
                    }
                    Err(e) => {
                        debug!("frame {}: {}", frame_index, e);
                        stats.degenerate += 1;
                    }
                }
            }

            // 検出と計測は実サイズのフレームで行い、書き出す分だけ申告サイズに揃える
            // （VideoWriter はサイズ違いのフレームを黙って捨てる）
            if frame.cols() != output_info.width || frame.rows() != output_info.height {
                if !size_warned {
                    warn!(
                        "Frame size {}x{} differs from stream size {}x{}, resizing output",
                        frame.cols(),
                        frame.rows(),
                        output_info.width,
                        output_info.height
                    );
                    size_warned = true;
                }
                let mut resized = Mat::default();
                imgproc::resize(
                    &frame,
                    &mut resized,
                    Size::new(output_info.width, output_info.height),
                    0.0,
                    0.0,
                    imgproc::INTER_LINEAR,
                )
                .map_err(frame_err)?;
                sink.write(&resized).map_err(frame_err)?;
            } else {
                sink.write(&frame).map_err(frame_err)?;
            }
            stats.written += 1;

            if stats.written % PROGRESS_INTERVAL == 0 {
                match output_info.frame_count {
                    Some(total) => info!("{}/{} frames", stats.written, total),
                    None => info!("{} frames", stats.written),
                }
            }
        }

        Ok(stats)
    }
}
