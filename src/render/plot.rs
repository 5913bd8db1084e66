use anyhow::{Context, Result};
use opencv::{
    core::{Mat, Point, Scalar, Vector, CV_8UC3},
    imgcodecs, imgproc,
};
use std::path::Path;

use crate::rom::AngleSeries;

const MARGIN_LEFT: i32 = 70;
const MARGIN_RIGHT: i32 = 20;
const MARGIN_TOP: i32 = 40;
const MARGIN_BOTTOM: i32 = 50;

/// 縦軸の範囲（度）
const ANGLE_MAX: f64 = 180.0;
const ANGLE_TICK: f64 = 30.0;

fn white() -> Scalar {
    Scalar::all(255.0)
}

fn black() -> Scalar {
    Scalar::all(0.0)
}

fn grid_gray() -> Scalar {
    Scalar::all(220.0)
}

/// グラフの線色 (BGR, matplotlib 既定の青)
fn line_blue() -> Scalar {
    Scalar::new(180.0, 119.0, 31.0, 0.0)
}

/// 描画領域と座標変換
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotLayout {
    pub width: i32,
    pub height: i32,
    /// 横軸の最大フレーム番号
    pub max_frame: usize,
}

impl PlotLayout {
    pub fn new(width: i32, height: i32, series: &AngleSeries) -> Self {
        let max_frame = series
            .samples()
            .last()
            .map_or(1, |s| s.frame_index.max(1));
        Self {
            width,
            height,
            max_frame,
        }
    }

    fn plot_width(&self) -> f64 {
        (self.width - MARGIN_LEFT - MARGIN_RIGHT).max(1) as f64
    }

    fn plot_height(&self) -> f64 {
        (self.height - MARGIN_TOP - MARGIN_BOTTOM).max(1) as f64
    }

    /// (フレーム番号, 角度) → キャンバス座標
    pub fn to_canvas(&self, frame_index: usize, angle_deg: f64) -> Point {
        let x = MARGIN_LEFT as f64 + frame_index as f64 / self.max_frame as f64 * self.plot_width();
        let clamped = angle_deg.clamp(0.0, ANGLE_MAX);
        let y = MARGIN_TOP as f64 + (1.0 - clamped / ANGLE_MAX) * self.plot_height();
        Point::new(x.round() as i32, y.round() as i32)
    }

    fn origin(&self) -> Point {
        Point::new(MARGIN_LEFT, self.height - MARGIN_BOTTOM)
    }
}

fn put_label(canvas: &mut Mat, text: &str, at: Point, scale: f64) -> opencv::Result<()> {
    imgproc::put_text(
        canvas,
        text,
        at,
        imgproc::FONT_HERSHEY_SIMPLEX,
        scale,
        black(),
        1,
        imgproc::LINE_AA,
        false,
    )
}

/// 関節角度の変化をグラフとして描画（横軸: フレーム番号, 縦軸: 角度）
pub fn render_angle_plot(series: &AngleSeries, width: i32, height: i32) -> opencv::Result<Mat> {
    let mut canvas = Mat::new_rows_cols_with_default(height, width, CV_8UC3, white())?;
    let layout = PlotLayout::new(width, height, series);
    let origin = layout.origin();

    // 目盛りと補助線
    let mut tick = 0.0;
    while tick <= ANGLE_MAX {
        let y = layout.to_canvas(0, tick).y;
        imgproc::line(
            &mut canvas,
            Point::new(MARGIN_LEFT, y),
            Point::new(width - MARGIN_RIGHT, y),
            grid_gray(),
            1,
            imgproc::LINE_8,
            0,
        )?;
        put_label(&mut canvas, &format!("{}", tick as i32), Point::new(MARGIN_LEFT - 40, y + 5), 0.4)?;
        tick += ANGLE_TICK;
    }
    for step in 0..=4 {
        let frame = layout.max_frame * step / 4;
        let x = layout.to_canvas(frame, 0.0).x;
        put_label(&mut canvas, &frame.to_string(), Point::new(x - 10, origin.y + 18), 0.4)?;
    }

    // 軸
    imgproc::line(&mut canvas, origin, Point::new(width - MARGIN_RIGHT, origin.y), black(), 1, imgproc::LINE_8, 0)?;
    imgproc::line(&mut canvas, origin, Point::new(MARGIN_LEFT, MARGIN_TOP), black(), 1, imgproc::LINE_8, 0)?;

    put_label(&mut canvas, "Joint Angle", Point::new(width / 2 - 50, MARGIN_TOP - 15), 0.6)?;
    put_label(&mut canvas, "Frame", Point::new(width / 2 - 20, height - 10), 0.5)?;
    put_label(&mut canvas, "Angle (deg)", Point::new(5, MARGIN_TOP - 15), 0.45)?;

    let points: Vec<Point> = series
        .samples()
        .iter()
        .map(|s| layout.to_canvas(s.frame_index, s.angle_deg))
        .collect();

    match points.as_slice() {
        [] => {
            put_label(&mut canvas, "no pose detected", Point::new(width / 2 - 70, height / 2), 0.6)?;
        }
        [single] => {
            imgproc::circle(&mut canvas, *single, 3, line_blue(), -1, imgproc::LINE_8, 0)?;
        }
        _ => {
            for pair in points.windows(2) {
                imgproc::line(&mut canvas, pair[0], pair[1], line_blue(), 2, imgproc::LINE_AA, 0)?;
            }
        }
    }

    Ok(canvas)
}

/// グラフを PNG として保存
pub fn save_angle_plot<P: AsRef<Path>>(path: P, series: &AngleSeries, width: i32, height: i32) -> Result<()> {
    let path = path.as_ref();
    let canvas = render_angle_plot(series, width, height)?;
    let path_str = path
        .to_str()
        .with_context(|| format!("Non UTF-8 path: {}", path.display()))?;
    let written = imgcodecs::imwrite(path_str, &canvas, &Vector::new())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    if !written {
        anyhow::bail!("Failed to write {}", path.display());
    }
    Ok(())
}
