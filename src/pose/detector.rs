use anyhow::Result;
use opencv::core::Mat;

use super::landmark::LandmarkSet;

/// 姿勢検出器の抽象
///
/// 入力は RGB の `Mat`。人物が見つからないフレームでは `Ok(None)` を返す。
/// `Err` は推論そのものが失敗した場合のみで、パイプラインはそこで中断する。
pub trait LandmarkDetector {
    fn detect(&mut self, image: &Mat) -> Result<Option<LandmarkSet>>;
}

impl<D: LandmarkDetector + ?Sized> LandmarkDetector for Box<D> {
    fn detect(&mut self, image: &Mat) -> Result<Option<LandmarkSet>> {
        (**self).detect(image)
    }
}
