use serde::{Deserialize, Serialize};

/// COCO / MoveNet の 17 ランドマーク
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(usize)]
pub enum LandmarkName {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl LandmarkName {
    pub const COUNT: usize = 17;

    pub const ALL: [LandmarkName; LandmarkName::COUNT] = [
        Self::Nose,
        Self::LeftEye,
        Self::RightEye,
        Self::LeftEar,
        Self::RightEar,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];

    /// 設定ファイル・ログ用の名前 (e.g. "RIGHT_SHOULDER")
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nose => "NOSE",
            Self::LeftEye => "LEFT_EYE",
            Self::RightEye => "RIGHT_EYE",
            Self::LeftEar => "LEFT_EAR",
            Self::RightEar => "RIGHT_EAR",
            Self::LeftShoulder => "LEFT_SHOULDER",
            Self::RightShoulder => "RIGHT_SHOULDER",
            Self::LeftElbow => "LEFT_ELBOW",
            Self::RightElbow => "RIGHT_ELBOW",
            Self::LeftWrist => "LEFT_WRIST",
            Self::RightWrist => "RIGHT_WRIST",
            Self::LeftHip => "LEFT_HIP",
            Self::RightHip => "RIGHT_HIP",
            Self::LeftKnee => "LEFT_KNEE",
            Self::RightKnee => "RIGHT_KNEE",
            Self::LeftAnkle => "LEFT_ANKLE",
            Self::RightAnkle => "RIGHT_ANKLE",
        }
    }
}

impl std::fmt::Display for LandmarkName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 単一ランドマーク
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    /// 正規化されたX座標 (0.0〜1.0)
    pub x: f32,
    /// 正規化されたY座標 (0.0〜1.0)
    pub y: f32,
    /// 信頼度スコア (0.0〜1.0)
    pub confidence: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    /// 信頼度が閾値以上か
    pub fn is_valid(&self, threshold: f32) -> bool {
        self.confidence >= threshold
    }

    /// ピクセル座標に変換（小数を保持）
    pub fn to_pixel(&self, width: i32, height: i32) -> (f64, f64) {
        (
            self.x as f64 * width as f64,
            self.y as f64 * height as f64,
        )
    }
}

/// 1フレーム分のランドマーク集合
///
/// 検出器が低信頼度として除外したランドマークは `None` になる。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandmarkSet {
    landmarks: [Option<Landmark>; LandmarkName::COUNT],
}

impl LandmarkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: LandmarkName, landmark: Landmark) -> Self {
        self.insert(name, landmark);
        self
    }

    pub fn insert(&mut self, name: LandmarkName, landmark: Landmark) {
        self.landmarks[name as usize] = Some(landmark);
    }

    pub fn get(&self, name: LandmarkName) -> Option<&Landmark> {
        self.landmarks[name as usize].as_ref()
    }

    pub fn contains(&self, name: LandmarkName) -> bool {
        self.landmarks[name as usize].is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LandmarkName, &Landmark)> {
        LandmarkName::ALL
            .iter()
            .zip(self.landmarks.iter())
            .filter_map(|(name, lm)| lm.as_ref().map(|lm| (*name, lm)))
    }

    pub fn len(&self) -> usize {
        self.landmarks.iter().filter(|lm| lm.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 含まれるランドマークの平均信頼度（空なら0）
    pub fn average_confidence(&self) -> f32 {
        let count = self.len();
        if count == 0 {
            return 0.0;
        }
        let sum: f32 = self.iter().map(|(_, lm)| lm.confidence).sum();
        sum / count as f32
    }
}

impl FromIterator<(LandmarkName, Landmark)> for LandmarkSet {
    fn from_iter<I: IntoIterator<Item = (LandmarkName, Landmark)>>(iter: I) -> Self {
        let mut set = LandmarkSet::new();
        for (name, landmark) in iter {
            set.insert(name, landmark);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_name_count() {
        assert_eq!(LandmarkName::COUNT, 17);
        for (i, name) in LandmarkName::ALL.iter().enumerate() {
            assert_eq!(*name as usize, i);
        }
    }

    #[test]
    fn test_landmark_name_serde() {
        #[derive(Deserialize)]
        struct Wrapper {
            name: LandmarkName,
        }
        let w: Wrapper = toml::from_str("name = \"RIGHT_SHOULDER\"").unwrap();
        assert_eq!(w.name, LandmarkName::RightShoulder);
        assert_eq!(w.name.to_string(), "RIGHT_SHOULDER");
    }

    #[test]
    fn test_landmark_to_pixel() {
        let lm = Landmark::new(0.5, 0.25, 1.0);
        let (px, py) = lm.to_pixel(640, 480);
        assert!((px - 320.0).abs() < 1e-9);
        assert!((py - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_landmark_is_valid() {
        let lm = Landmark::new(0.5, 0.5, 0.7);
        assert!(lm.is_valid(0.5));
        assert!(!lm.is_valid(0.8));
    }

    #[test]
    fn test_set_missing_landmark() {
        let set = LandmarkSet::new().with(LandmarkName::LeftHip, Landmark::new(0.4, 0.6, 0.9));
        assert!(set.contains(LandmarkName::LeftHip));
        assert!(set.get(LandmarkName::RightHip).is_none());
        assert_eq!(set.len(), 1);
        assert!(!set.is_empty());
    }

    #[test]
    fn test_set_average_confidence() {
        let set: LandmarkSet = [
            (LandmarkName::LeftShoulder, Landmark::new(0.0, 0.0, 0.4)),
            (LandmarkName::RightShoulder, Landmark::new(0.0, 0.0, 0.8)),
        ]
        .into_iter()
        .collect();
        assert!((set.average_confidence() - 0.6).abs() < 1e-6);
        assert_eq!(LandmarkSet::new().average_confidence(), 0.0);
    }
}
