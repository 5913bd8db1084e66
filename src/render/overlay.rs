use opencv::{
    core::{Mat, Point, Scalar},
    imgproc,
};
use serde::{Deserialize, Serialize};

use super::skeleton::draw_skeleton;
use crate::geometry::{JointMeasurement, PixelPoint};
use crate::pose::LandmarkSet;

/// マーカー描画の設定（色は BGR）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    /// 関節マーカーの半径（px）
    pub marker_radius: i32,
    /// 関節マーカーの色（緑）
    pub marker_color: [u8; 3],
    /// 可動セグメント（肩→肘）の色（黄）
    pub moving_color: [u8; 3],
    /// 基準セグメント（肩の中点→腰の中点）の色（青）
    pub reference_color: [u8; 3],
    pub line_thickness: i32,
    /// 角度を数値で表示
    pub show_angle: bool,
    /// 全身の骨格を表示
    pub show_skeleton: bool,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            marker_radius: 5,
            marker_color: [0, 255, 0],
            moving_color: [0, 255, 255],
            reference_color: [255, 0, 0],
            line_thickness: 2,
            show_angle: false,
            show_skeleton: false,
        }
    }
}

/// BGR 配列を OpenCV の色に変換
pub fn bgr(color: [u8; 3]) -> Scalar {
    Scalar::new(color[0] as f64, color[1] as f64, color[2] as f64, 0.0)
}

pub fn to_point(p: &PixelPoint) -> Point {
    let (x, y) = p.to_i32();
    Point::new(x, y)
}

/// 計測結果をフレームに描き込む
#[derive(Debug, Clone, Default)]
pub struct OverlayRenderer {
    style: OverlayStyle,
}

impl OverlayRenderer {
    pub fn new(style: OverlayStyle) -> Self {
        Self { style }
    }

    /// 4点のマーカーと2本のセグメントを描画（フレームを直接書き換える）
    pub fn render(
        &self,
        frame: &mut Mat,
        measurement: &JointMeasurement,
        landmarks: &LandmarkSet,
    ) -> opencv::Result<()> {
        let style = &self.style;

        if style.show_skeleton {
            draw_skeleton(frame, landmarks)?;
        }

        for point in measurement.reference_points() {
            imgproc::circle(
                frame,
                to_point(&point),
                style.marker_radius,
                bgr(style.marker_color),
                -1,
                imgproc::LINE_8,
                0,
            )?;
        }

        imgproc::line(
            frame,
            to_point(&measurement.moving.to),
            to_point(&measurement.moving.from),
            bgr(style.moving_color),
            style.line_thickness,
            imgproc::LINE_8,
            0,
        )?;
        imgproc::line(
            frame,
            to_point(&measurement.reference.to),
            to_point(&measurement.reference.from),
            bgr(style.reference_color),
            style.line_thickness,
            imgproc::LINE_8,
            0,
        )?;

        if style.show_angle {
            let anchor = to_point(&measurement.moving.to);
            imgproc::put_text(
                frame,
                &format!("{:.1} deg", measurement.angle_deg),
                Point::new(anchor.x + 10, anchor.y - 10),
                imgproc::FONT_HERSHEY_SIMPLEX,
                0.6,
                bgr(style.marker_color),
                2,
                imgproc::LINE_AA,
                false,
            )?;
        }

        Ok(())
    }
}
