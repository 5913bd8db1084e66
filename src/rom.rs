//! 角度時系列と可動域 (ROM)

use serde::Serialize;

/// 1フレームの角度
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AngleSample {
    /// 元動画でのフレーム番号（0始まり）
    pub frame_index: usize,
    pub angle_deg: f64,
}

/// 検出できたフレームだけを並べた角度の系列
///
/// 検出なしのフレームは含まれないので、要素の位置とフレーム番号は一致しない。
/// フレーム番号は各サンプルが持つ。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AngleSeries {
    samples: Vec<AngleSample>,
}

impl AngleSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// フレーム番号は単調増加でなければならない
    pub fn push(&mut self, frame_index: usize, angle_deg: f64) {
        debug_assert!(angle_deg.is_finite());
        debug_assert!(self
            .samples
            .last()
            .map_or(true, |last| last.frame_index < frame_index));
        self.samples.push(AngleSample {
            frame_index,
            angle_deg,
        });
    }

    pub fn samples(&self) -> &[AngleSample] {
        &self.samples
    }

    pub fn angles(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.angle_deg).collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn rom(&self) -> f64 {
        rom(&self.angles())
    }

    pub fn summary(&self) -> Option<RomSummary> {
        RomSummary::from_series(self)
    }
}

impl FromIterator<(usize, f64)> for AngleSeries {
    fn from_iter<I: IntoIterator<Item = (usize, f64)>>(iter: I) -> Self {
        let mut series = AngleSeries::new();
        for (frame_index, angle_deg) in iter {
            series.push(frame_index, angle_deg);
        }
        series
    }
}

/// 最大可動域 = 最大角度 - 最小角度。空なら 0
pub fn rom(angles: &[f64]) -> f64 {
    let mut iter = angles.iter().copied();
    let Some(first) = iter.next() else {
        return 0.0;
    };
    let (min, max) = iter.fold((first, first), |(lo, hi), a| (lo.min(a), hi.max(a)));
    max - min
}

/// 可動域の内訳
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RomSummary {
    pub min_deg: f64,
    pub max_deg: f64,
    pub rom_deg: f64,
    /// 最大角度を記録したフレーム（同値なら最初）
    pub peak_frame: usize,
}

impl RomSummary {
    pub fn from_series(series: &AngleSeries) -> Option<Self> {
        let first = series.samples().first()?;
        let mut min = first.angle_deg;
        let mut peak = *first;
        for s in &series.samples()[1..] {
            min = min.min(s.angle_deg);
            if s.angle_deg > peak.angle_deg {
                peak = *s;
            }
        }
        Some(Self {
            min_deg: min,
            max_deg: peak.angle_deg,
            rom_deg: peak.angle_deg - min,
            peak_frame: peak.frame_index,
        })
    }
}
