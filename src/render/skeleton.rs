use opencv::{core::Mat, imgproc, prelude::*};

use super::overlay::{bgr, to_point};
use crate::geometry::PixelPoint;
use crate::pose::{LandmarkName, LandmarkSet};

/// 骨格の接続定義 (開始ランドマーク, 終了ランドマーク)
pub const SKELETON_CONNECTIONS: [(LandmarkName, LandmarkName); 16] = [
    // 顔
    (LandmarkName::LeftEar, LandmarkName::LeftEye),
    (LandmarkName::LeftEye, LandmarkName::Nose),
    (LandmarkName::Nose, LandmarkName::RightEye),
    (LandmarkName::RightEye, LandmarkName::RightEar),
    // 上半身
    (LandmarkName::LeftShoulder, LandmarkName::RightShoulder),
    (LandmarkName::LeftShoulder, LandmarkName::LeftElbow),
    (LandmarkName::LeftElbow, LandmarkName::LeftWrist),
    (LandmarkName::RightShoulder, LandmarkName::RightElbow),
    (LandmarkName::RightElbow, LandmarkName::RightWrist),
    // 胴体
    (LandmarkName::LeftShoulder, LandmarkName::LeftHip),
    (LandmarkName::RightShoulder, LandmarkName::RightHip),
    (LandmarkName::LeftHip, LandmarkName::RightHip),
    // 下半身
    (LandmarkName::LeftHip, LandmarkName::LeftKnee),
    (LandmarkName::LeftKnee, LandmarkName::LeftAnkle),
    (LandmarkName::RightHip, LandmarkName::RightKnee),
    (LandmarkName::RightKnee, LandmarkName::RightAnkle),
];

/// キーポイントの色 (BGR, 灰色)
pub const SKELETON_POINT_COLOR: [u8; 3] = [200, 200, 200];

/// 骨格線の色 (BGR, 灰色)
pub const SKELETON_LINE_COLOR: [u8; 3] = [128, 128, 128];

/// 検出された全ランドマークの骨格を薄く描く
///
/// 片端が欠けている接続は描かない。
pub fn draw_skeleton(frame: &mut Mat, landmarks: &LandmarkSet) -> opencv::Result<()> {
    let width = frame.cols();
    let height = frame.rows();
    let pixel = |name: LandmarkName| {
        landmarks.get(name).map(|lm| {
            let (x, y) = lm.to_pixel(width, height);
            PixelPoint::new(x, y)
        })
    };

    for (start, end) in SKELETON_CONNECTIONS.iter() {
        if let (Some(a), Some(b)) = (pixel(*start), pixel(*end)) {
            imgproc::line(
                frame,
                to_point(&a),
                to_point(&b),
                bgr(SKELETON_LINE_COLOR),
                1,
                imgproc::LINE_8,
                0,
            )?;
        }
    }

    for (_, lm) in landmarks.iter() {
        let (x, y) = lm.to_pixel(width, height);
        imgproc::circle(
            frame,
            to_point(&PixelPoint::new(x, y)),
            3,
            bgr(SKELETON_POINT_COLOR),
            -1,
            imgproc::LINE_8,
            0,
        )?;
    }

    Ok(())
}
