//! ランドマークから関節角度を求める幾何計算
//!
//! 関節は「基準セグメント」と「可動セグメント」の2本のベクトルで表し、
//! その間の角度 (0°〜180°) を返す。既定は右肩外転:
//! 基準 = 腰の中点 → 肩の中点（体幹軸）、可動 = 右肘 → 右肩（上腕）。

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pose::{LandmarkName, LandmarkSet};

/// ピクセル座標の点
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn midpoint(&self, other: &PixelPoint) -> PixelPoint {
        PixelPoint::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// `self - origin`
    pub fn vector_from(&self, origin: &PixelPoint) -> Vector2D {
        Vector2D::new(self.x - origin.x, self.y - origin.y)
    }

    /// 描画用の整数座標（切り捨て）
    pub fn to_i32(&self) -> (i32, i32) {
        (self.x as i32, self.y as i32)
    }
}

/// ピクセル単位の2次元ベクトル
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector2D {
    pub dx: f64,
    pub dy: f64,
}

impl Vector2D {
    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    pub fn dot(&self, other: &Vector2D) -> f64 {
        self.dx * other.dx + self.dy * other.dy
    }

    pub fn norm(&self) -> f64 {
        self.dx.hypot(self.dy)
    }

    /// 長さが0または非有限なら角度は定義できない
    pub fn is_degenerate(&self) -> bool {
        let n = self.norm();
        !n.is_finite() || n <= 0.0
    }

    /// 2ベクトル間の角度（度, 0〜180）。どちらかが退化していれば None
    pub fn angle_to(&self, other: &Vector2D) -> Option<f64> {
        if self.is_degenerate() || other.is_degenerate() {
            return None;
        }
        // 丸め誤差で |cos| > 1 になると acos が NaN を返す
        let cos = (self.dot(other) / (self.norm() * other.norm())).clamp(-1.0, 1.0);
        let angle = cos.acos().to_degrees();
        angle.is_finite().then_some(angle)
    }
}

/// セグメント端点: 単一ランドマーク、または2点の中点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Anchor {
    Single(LandmarkName),
    Midpoint([LandmarkName; 2]),
}

impl Anchor {
    /// ピクセル座標に解決する
    pub fn resolve(
        &self,
        landmarks: &LandmarkSet,
        width: i32,
        height: i32,
    ) -> Result<PixelPoint, GeometryError> {
        let pixel = |name: LandmarkName| -> Result<PixelPoint, GeometryError> {
            let lm = landmarks
                .get(name)
                .ok_or(GeometryError::MissingLandmark(name))?;
            let (x, y) = lm.to_pixel(width, height);
            Ok(PixelPoint::new(x, y))
        };

        match self {
            Anchor::Single(name) => pixel(*name),
            Anchor::Midpoint([a, b]) => Ok(pixel(*a)?.midpoint(&pixel(*b)?)),
        }
    }
}

/// `from` → `to` のセグメント。ベクトルは `to - from`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub from: Anchor,
    pub to: Anchor,
}

/// どちらのセグメントか
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentRole {
    Reference,
    Moving,
}

impl std::fmt::Display for SegmentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SegmentRole::Reference => f.write_str("reference"),
            SegmentRole::Moving => f.write_str("moving"),
        }
    }
}

/// 角度が定義できないフレーム
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("landmark {0} is missing")]
    MissingLandmark(LandmarkName),
    #[error("{0} segment has zero length")]
    Degenerate(SegmentRole),
}

/// 解決済みセグメント（ピクセル座標）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedSegment {
    pub from: PixelPoint,
    pub to: PixelPoint,
}

impl ResolvedSegment {
    pub fn vector(&self) -> Vector2D {
        self.to.vector_from(&self.from)
    }
}

/// 1フレームの計測結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointMeasurement {
    pub angle_deg: f64,
    /// 既定モデルでは 腰の中点 → 肩の中点
    pub reference: ResolvedSegment,
    /// 既定モデルでは 右肘 → 右肩
    pub moving: ResolvedSegment,
}

impl JointMeasurement {
    /// マーカーを描く4点
    ///
    /// 既定モデルでは [右肩, 右肘, 肩の中点, 腰の中点] の順。
    pub fn reference_points(&self) -> [PixelPoint; 4] {
        [
            self.moving.to,
            self.moving.from,
            self.reference.to,
            self.reference.from,
        ]
    }
}

/// 関節の定義
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JointModel {
    pub name: String,
    pub reference: Segment,
    pub moving: Segment,
}

impl JointModel {
    /// 右肩外転: 体幹軸と上腕の角度
    pub fn shoulder_abduction() -> Self {
        use LandmarkName::*;
        Self {
            name: "right_shoulder_abduction".to_string(),
            reference: Segment {
                from: Anchor::Midpoint([LeftHip, RightHip]),
                to: Anchor::Midpoint([LeftShoulder, RightShoulder]),
            },
            moving: Segment {
                from: Anchor::Single(RightElbow),
                to: Anchor::Single(RightShoulder),
            },
        }
    }

    /// ランドマーク集合から角度を計算
    pub fn measure(
        &self,
        landmarks: &LandmarkSet,
        frame_width: i32,
        frame_height: i32,
    ) -> Result<JointMeasurement, GeometryError> {
        let resolve = |segment: &Segment| -> Result<ResolvedSegment, GeometryError> {
            Ok(ResolvedSegment {
                from: segment.from.resolve(landmarks, frame_width, frame_height)?,
                to: segment.to.resolve(landmarks, frame_width, frame_height)?,
            })
        };

        let reference = resolve(&self.reference)?;
        let moving = resolve(&self.moving)?;

        let reference_vector = reference.vector();
        let moving_vector = moving.vector();
        if reference_vector.is_degenerate() {
            return Err(GeometryError::Degenerate(SegmentRole::Reference));
        }
        if moving_vector.is_degenerate() {
            return Err(GeometryError::Degenerate(SegmentRole::Moving));
        }

        let angle_deg = moving_vector
            .angle_to(&reference_vector)
            .ok_or(GeometryError::Degenerate(SegmentRole::Moving))?;

        Ok(JointMeasurement {
            angle_deg,
            reference,
            moving,
        })
    }
}

impl Default for JointModel {
    fn default() -> Self {
        Self::shoulder_abduction()
    }
}

/// 右肩外転角度を計算（既定モデル）
pub fn compute_angle(
    landmarks: &LandmarkSet,
    frame_width: i32,
    frame_height: i32,
) -> Result<JointMeasurement, GeometryError> {
    JointModel::shoulder_abduction().measure(landmarks, frame_width, frame_height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Landmark;
    use proptest::prelude::*;

    fn set_of(points: &[(LandmarkName, f32, f32)]) -> LandmarkSet {
        points
            .iter()
            .map(|&(name, x, y)| (name, Landmark::new(x, y, 0.9)))
            .collect()
    }

    fn upright_torso_with_arm(elbow: (f32, f32)) -> LandmarkSet {
        use LandmarkName::*;
        set_of(&[
            (LeftShoulder, 0.4, 0.3),
            (RightShoulder, 0.6, 0.3),
            (LeftHip, 0.4, 0.7),
            (RightHip, 0.6, 0.7),
            (RightElbow, elbow.0, elbow.1),
        ])
    }

    #[test]
    fn test_right_angle() {
        // 体幹は真上、上腕は水平 → 90°
        let set = upright_torso_with_arm((0.8, 0.3));
        let m = compute_angle(&set, 640, 480).unwrap();
        assert!((m.angle_deg - 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_arm_hanging_down() {
        // 肘が肩の真下: arm = shoulder - elbow は上向き、体幹と同方向 → 0°
        let set = upright_torso_with_arm((0.6, 0.5));
        let m = compute_angle(&set, 640, 480).unwrap();
        assert!(m.angle_deg.abs() < 1e-6);
    }

    #[test]
    fn test_arm_raised_overhead() {
        let set = upright_torso_with_arm((0.6, 0.1));
        let m = compute_angle(&set, 640, 480).unwrap();
        assert!((m.angle_deg - 180.0).abs() < 1e-6);
    }

    #[test]
    fn test_pixel_scaling_uses_frame_aspect() {
        // 正規化座標で45°でも、横長フレームでは角度が変わる
        let set = upright_torso_with_arm((0.8, 0.1));
        let square = compute_angle(&set, 100, 100).unwrap();
        let wide = compute_angle(&set, 200, 100).unwrap();
        assert!((square.angle_deg - 135.0).abs() < 1e-4);
        assert!(wide.angle_deg < square.angle_deg);
    }

    #[test]
    fn test_reference_points_order() {
        let set = upright_torso_with_arm((0.8, 0.3));
        let m = compute_angle(&set, 100, 100).unwrap();
        let close = |p: PixelPoint, x: f64, y: f64| (p.x - x).abs() < 1e-3 && (p.y - y).abs() < 1e-3;
        let [shoulder, elbow, shoulder_mid, hip_mid] = m.reference_points();
        assert!(close(shoulder, 60.0, 30.0));
        assert!(close(elbow, 80.0, 30.0));
        assert!(close(shoulder_mid, 50.0, 30.0));
        assert!(close(hip_mid, 50.0, 70.0));
    }

    #[test]
    fn test_degenerate_torso() {
        use LandmarkName::*;
        let set = set_of(&[
            (LeftShoulder, 0.5, 0.5),
            (RightShoulder, 0.5, 0.5),
            (LeftHip, 0.5, 0.5),
            (RightHip, 0.5, 0.5),
            (RightElbow, 0.7, 0.5),
        ]);
        assert_eq!(
            compute_angle(&set, 640, 480),
            Err(GeometryError::Degenerate(SegmentRole::Reference))
        );
    }

    #[test]
    fn test_degenerate_arm() {
        let set = upright_torso_with_arm((0.6, 0.3));
        assert_eq!(
            compute_angle(&set, 640, 480),
            Err(GeometryError::Degenerate(SegmentRole::Moving))
        );
    }

    #[test]
    fn test_missing_landmark() {
        use LandmarkName::*;
        let set = set_of(&[(LeftShoulder, 0.4, 0.3), (RightShoulder, 0.6, 0.3)]);
        assert_eq!(
            compute_angle(&set, 640, 480),
            Err(GeometryError::MissingLandmark(LeftHip))
        );
    }

    #[test]
    fn test_nan_landmark_is_degenerate() {
        let set = upright_torso_with_arm((f32::NAN, 0.3));
        assert!(matches!(
            compute_angle(&set, 640, 480),
            Err(GeometryError::Degenerate(_))
        ));
    }

    #[test]
    fn test_custom_joint_left_elbow() {
        use LandmarkName::*;
        // 左肘の屈曲: 上腕(肘→肩) と 前腕(肘→手首)
        let model = JointModel {
            name: "left_elbow_flexion".to_string(),
            reference: Segment {
                from: Anchor::Single(LeftElbow),
                to: Anchor::Single(LeftShoulder),
            },
            moving: Segment {
                from: Anchor::Single(LeftElbow),
                to: Anchor::Single(LeftWrist),
            },
        };
        let set = set_of(&[
            (LeftShoulder, 0.5, 0.2),
            (LeftElbow, 0.5, 0.5),
            (LeftWrist, 0.8, 0.5),
        ]);
        let m = model.measure(&set, 100, 100).unwrap();
        assert!((m.angle_deg - 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_joint_model_from_toml() {
        let model: JointModel = toml::from_str(
            r#"
            name = "right_shoulder_abduction"
            reference = { from = ["LEFT_HIP", "RIGHT_HIP"], to = ["LEFT_SHOULDER", "RIGHT_SHOULDER"] }
            moving = { from = "RIGHT_ELBOW", to = "RIGHT_SHOULDER" }
            "#,
        )
        .unwrap();
        assert_eq!(model, JointModel::shoulder_abduction());
    }

    #[test]
    fn test_vector_angle_degenerate() {
        let zero = Vector2D::new(0.0, 0.0);
        let unit = Vector2D::new(1.0, 0.0);
        assert!(zero.angle_to(&unit).is_none());
        assert!(unit.angle_to(&zero).is_none());
    }

    proptest! {
        #[test]
        fn angle_is_within_range(
            ax in -1000.0f64..1000.0, ay in -1000.0f64..1000.0,
            bx in -1000.0f64..1000.0, by in -1000.0f64..1000.0,
        ) {
            let a = Vector2D::new(ax, ay);
            let b = Vector2D::new(bx, by);
            prop_assume!(!a.is_degenerate() && !b.is_degenerate());
            let angle = a.angle_to(&b).unwrap();
            prop_assert!((0.0..=180.0).contains(&angle));
        }

        #[test]
        fn measured_angle_is_finite_or_error(
            coords in proptest::collection::vec(0.0f32..1.0, 10),
        ) {
            use LandmarkName::*;
            let names = [LeftShoulder, RightShoulder, LeftHip, RightHip, RightElbow];
            let set: LandmarkSet = names
                .iter()
                .enumerate()
                .map(|(i, &n)| (n, Landmark::new(coords[2 * i], coords[2 * i + 1], 1.0)))
                .collect();
            if let Ok(m) = compute_angle(&set, 640, 480) {
                prop_assert!(m.angle_deg.is_finite());
                prop_assert!((0.0..=180.0).contains(&m.angle_deg));
            }
        }
    }
}
