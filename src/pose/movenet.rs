use anyhow::{Context, Result};
use ndarray::{Array4, ArrayViewD};
use opencv::{
    core::{Mat, Size, CV_32FC3},
    imgproc,
    prelude::*,
};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;

use super::detector::LandmarkDetector;
use super::landmark::{Landmark, LandmarkName, LandmarkSet};

/// MoveNet用の入力サイズ
pub const MOVENET_INPUT_SIZE: i32 = 192;

/// 検出判定の閾値
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveNetThresholds {
    /// 17点の平均信頼度がこれ未満なら「検出なし」
    pub detection: f32,
    /// 個々のランドマークがこれ未満なら集合から除外
    pub keypoint: f32,
}

impl Default for MoveNetThresholds {
    fn default() -> Self {
        Self {
            detection: 0.2,
            keypoint: 0.1,
        }
    }
}

/// MoveNet (single pose) を使用したランドマーク検出器
pub struct MoveNetDetector {
    session: Session,
    thresholds: MoveNetThresholds,
}

impl MoveNetDetector {
    /// ONNXモデルを読み込んで初期化
    pub fn new<P: AsRef<Path>>(model_path: P, thresholds: MoveNetThresholds) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path.as_ref())
            .with_context(|| format!("Failed to load ONNX model {}", model_path.as_ref().display()))?;

        Ok(Self { session, thresholds })
    }
}

impl LandmarkDetector for MoveNetDetector {
    fn detect(&mut self, image: &Mat) -> Result<Option<LandmarkSet>> {
        let input = preprocess_rgb(image)?;
        let input_tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs!["serving_default_input_0" => input_tensor])
            .context("Inference failed")?;

        // 出力は [1, 1, 17, 3] (y, x, confidence)
        let output: ArrayViewD<f32> = outputs["StatefulPartitionedCall_0"]
            .try_extract_array()
            .context("Failed to extract output tensor")?;

        Ok(landmarks_from_output(&output, self.thresholds))
    }
}

/// RGB Mat を [1, 192, 192, 3] の f32 テンソル (0.0-255.0) に変換
pub fn preprocess_rgb(frame: &Mat) -> Result<Array4<f32>> {
    let mut resized = Mat::default();
    imgproc::resize(
        frame,
        &mut resized,
        Size::new(MOVENET_INPUT_SIZE, MOVENET_INPUT_SIZE),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;

    let mut float_mat = Mat::default();
    resized.convert_to(&mut float_mat, CV_32FC3, 1.0, 0.0)?;

    let size = MOVENET_INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, size, size, 3));

    for y in 0..MOVENET_INPUT_SIZE {
        for x in 0..MOVENET_INPUT_SIZE {
            let pixel = float_mat.at_2d::<opencv::core::Vec3f>(y, x)?;
            for c in 0..3 {
                tensor[[0, y as usize, x as usize, c]] = pixel[c];
            }
        }
    }

    Ok(tensor)
}

/// MoveNet の出力を LandmarkSet に変換
///
/// 平均信頼度が `detection` 未満なら None。
pub fn landmarks_from_output(
    output: &ArrayViewD<f32>,
    thresholds: MoveNetThresholds,
) -> Option<LandmarkSet> {
    if output.ndim() != 4 || output.shape()[2] < LandmarkName::COUNT || output.shape()[3] < 3 {
        return None;
    }

    // 17点すべてを入れた集合で平均を取る
    let all: LandmarkSet = LandmarkName::ALL
        .iter()
        .map(|&name| {
            let i = name as usize;
            let y = output[[0, 0, i, 0]];
            let x = output[[0, 0, i, 1]];
            let confidence = output[[0, 0, i, 2]];
            (name, Landmark::new(x, y, confidence))
        })
        .collect();

    if all.average_confidence() < thresholds.detection {
        return None;
    }

    let kept: LandmarkSet = all
        .iter()
        .filter(|(_, lm)| lm.is_valid(thresholds.keypoint))
        .map(|(name, lm)| (name, *lm))
        .collect();
    Some(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;

    fn output_with(confidence: f32) -> Array4<f32> {
        let mut out = Array4::<f32>::zeros((1, 1, 17, 3));
        for i in 0..17 {
            out[[0, 0, i, 0]] = 0.25; // y
            out[[0, 0, i, 1]] = 0.75; // x
            out[[0, 0, i, 2]] = confidence;
        }
        out
    }

    #[test]
    fn test_low_average_confidence_is_no_detection() {
        let out = output_with(0.05);
        let thresholds = MoveNetThresholds::default();
        assert!(landmarks_from_output(&out.view().into_dyn(), thresholds).is_none());
    }

    #[test]
    fn test_xy_order_is_swapped() {
        let out = output_with(0.9);
        let set = landmarks_from_output(&out.view().into_dyn(), MoveNetThresholds::default()).unwrap();
        assert_eq!(set.len(), 17);
        let nose = set.get(LandmarkName::Nose).unwrap();
        assert_eq!(nose.x, 0.75);
        assert_eq!(nose.y, 0.25);
    }

    #[test]
    fn test_low_confidence_keypoints_are_dropped() {
        let mut out = output_with(0.9);
        out[[0, 0, LandmarkName::RightElbow as usize, 2]] = 0.05;
        let set = landmarks_from_output(&out.view().into_dyn(), MoveNetThresholds::default()).unwrap();
        assert_eq!(set.len(), 16);
        assert!(!set.contains(LandmarkName::RightElbow));
    }

    #[test]
    fn test_average_includes_dropped_keypoints() {
        // 残る8点だけなら平均0.4だが、17点では 0.4 * 8 / 17 < 0.2
        let mut out = output_with(0.0);
        for i in 0..8 {
            out[[0, 0, i, 2]] = 0.4;
        }
        assert!(landmarks_from_output(&out.view().into_dyn(), MoveNetThresholds::default()).is_none());

        for i in 8..17 {
            out[[0, 0, i, 2]] = 0.05;
        }
        // (0.4 * 8 + 0.05 * 9) / 17 ≈ 0.215
        let set = landmarks_from_output(&out.view().into_dyn(), MoveNetThresholds::default()).unwrap();
        assert_eq!(set.len(), 8);
    }

    #[test]
    fn test_unexpected_shape() {
        let out = Array4::<f32>::zeros((1, 1, 5, 3));
        assert!(landmarks_from_output(&out.view().into_dyn(), MoveNetThresholds::default()).is_none());
    }
}
