use opencv::{core, core::Mat};

use super::rotation::Rotation;

/// 回転補正を適用する
///
/// `Rotation::None` のときは受け取ったフレームをそのまま返す（コピーしない）。
pub fn correct(frame: Mat, rotation: Rotation) -> opencv::Result<Mat> {
    let code = match rotation {
        Rotation::None => return Ok(frame),
        Rotation::Cw90 => core::ROTATE_90_CLOCKWISE,
        Rotation::Rot180 => core::ROTATE_180,
        Rotation::Ccw90 => core::ROTATE_90_COUNTERCLOCKWISE,
    };

    let mut rotated = Mat::default();
    core::rotate(&frame, &mut rotated, code)?;
    Ok(rotated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Scalar, Vec3b, CV_8UC3};
    use opencv::prelude::*;

    /// 2行3列、各ピクセルに (行*10 + 列) を入れたフレーム
    fn numbered_frame() -> Mat {
        let mut frame = Mat::new_rows_cols_with_default(2, 3, CV_8UC3, Scalar::all(0.0)).unwrap();
        for r in 0..2 {
            for c in 0..3 {
                *frame.at_2d_mut::<Vec3b>(r, c).unwrap() = Vec3b::all((r * 10 + c) as u8);
            }
        }
        frame
    }

    fn value_at(frame: &Mat, r: i32, c: i32) -> u8 {
        frame.at_2d::<Vec3b>(r, c).unwrap()[0]
    }

    #[test]
    fn test_identity_for_unsupported_angles() {
        for degrees in [0, 45, 360, -179, 91] {
            let frame = numbered_frame();
            let before = frame.data_bytes().unwrap().to_vec();
            let out = correct(frame, Rotation::from_degrees(degrees)).unwrap();
            assert_eq!(out.rows(), 2);
            assert_eq!(out.cols(), 3);
            assert_eq!(out.data_bytes().unwrap(), before.as_slice());
        }
    }

    #[test]
    fn test_rotate_clockwise() {
        let out = correct(numbered_frame(), Rotation::Cw90).unwrap();
        assert_eq!((out.rows(), out.cols()), (3, 2));
        // 左下 (1,0) が左上に来る
        assert_eq!(value_at(&out, 0, 0), 10);
        assert_eq!(value_at(&out, 0, 1), 0);
        assert_eq!(value_at(&out, 2, 0), 12);
        assert_eq!(out.typ(), CV_8UC3);
    }

    #[test]
    fn test_rotate_180() {
        let out = correct(numbered_frame(), Rotation::Rot180).unwrap();
        assert_eq!((out.rows(), out.cols()), (2, 3));
        assert_eq!(value_at(&out, 0, 0), 12);
        assert_eq!(value_at(&out, 1, 2), 0);
    }

    #[test]
    fn test_rotate_counter_clockwise() {
        let out = correct(numbered_frame(), Rotation::Ccw90).unwrap();
        assert_eq!((out.rows(), out.cols()), (3, 2));
        // 右上 (0,2) が左上に来る
        assert_eq!(value_at(&out, 0, 0), 2);
        assert_eq!(value_at(&out, 2, 1), 10);
    }
}
