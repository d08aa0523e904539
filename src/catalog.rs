//! Emotion labels and their display names

use std::fmt;
use std::str::FromStr;

/// The closed set of emotion categories the service reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmotionLabel {
    Joy,
    Sadness,
    Anger,
    Fear,
    Surprise,
    Disgust,
    Neutral,
}

impl EmotionLabel {
    pub const ALL: [EmotionLabel; 7] = [
        EmotionLabel::Joy,
        EmotionLabel::Sadness,
        EmotionLabel::Anger,
        EmotionLabel::Fear,
        EmotionLabel::Surprise,
        EmotionLabel::Disgust,
        EmotionLabel::Neutral,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EmotionLabel::Joy => "joy",
            EmotionLabel::Sadness => "sadness",
            EmotionLabel::Anger => "anger",
            EmotionLabel::Fear => "fear",
            EmotionLabel::Surprise => "surprise",
            EmotionLabel::Disgust => "disgust",
            EmotionLabel::Neutral => "neutral",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            EmotionLabel::Joy => "喜悦",
            EmotionLabel::Sadness => "悲伤",
            EmotionLabel::Anger => "愤怒",
            EmotionLabel::Fear => "恐惧",
            EmotionLabel::Surprise => "惊讶",
            EmotionLabel::Disgust => "厌恶",
            EmotionLabel::Neutral => "中性",
        }
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLabel(pub String);

impl fmt::Display for UnknownLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown emotion label '{}'", self.0)
    }
}

impl std::error::Error for UnknownLabel {}

impl FromStr for EmotionLabel {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "joy" => Ok(EmotionLabel::Joy),
            "sadness" => Ok(EmotionLabel::Sadness),
            "anger" => Ok(EmotionLabel::Anger),
            "fear" => Ok(EmotionLabel::Fear),
            "surprise" => Ok(EmotionLabel::Surprise),
            "disgust" => Ok(EmotionLabel::Disgust),
            "neutral" => Ok(EmotionLabel::Neutral),
            other => Err(UnknownLabel(other.to_string())),
        }
    }
}

/// Display name for a raw label, passing unknown labels through unchanged.
pub fn display_name(label: &str) -> &str {
    match label.parse::<EmotionLabel>() {
        Ok(known) => known.display_name(),
        Err(_) => label,
    }
}
