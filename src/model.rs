//! Wire types for the analysis/TTS service
//!
//! Field names follow the service's snake_case JSON. The camelCase spellings
//! are accepted as aliases so either form of the record decodes.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// One analysis response. All four sub-records are required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub emotion: EmotionAnalysis,
    pub intensity: Intensity,
    pub context: ContextAnalysis,
    pub voice: VoiceParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionAnalysis {
    #[serde(alias = "dominantEmotion")]
    pub dominant_emotion: String,
    pub confidence: f64,
    #[serde(alias = "sentimentScore")]
    pub sentiment_score: f64,
    #[serde(alias = "emotionScores")]
    pub emotion_scores: EmotionScores,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intensity {
    #[serde(rename = "intensity_level", alias = "level")]
    pub level: String,
    #[serde(rename = "intensity_score", alias = "score")]
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextAnalysis {
    #[serde(alias = "contextType")]
    pub context_type: String,
    #[serde(default)]
    pub keywords: Vec<Keyword>,
}

/// A context keyword. Rank is its position in [`ContextAnalysis::keywords`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    #[serde(alias = "word")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Keyword {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emotion: None,
            score: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceParams {
    pub pitch: f64,
    pub speed: f64,
    pub volume: f64,
    pub style: String,
}

/// Emotion label → score, in the order the service sent them.
///
/// Decoded through a map visitor rather than a `HashMap` so the document order
/// survives; the summary's tie-break depends on it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmotionScores(Vec<(String, f64)>);

impl EmotionScores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.0.iter().find(|(k, _)| k == label).map(|(_, v)| *v)
    }

    /// Insert or overwrite. Overwriting keeps the key's original position.
    pub fn insert(&mut self, label: impl Into<String>, score: f64) {
        let label = label.into();
        match self.0.iter_mut().find(|(k, _)| *k == label) {
            Some(entry) => entry.1 = score,
            None => self.0.push((label, score)),
        }
    }

    /// Entries sorted by score, highest first. Equal scores keep their original order.
    pub fn ranked(&self) -> Vec<(&str, f64)> {
        let mut ranked: Vec<_> = self.iter().collect();
        // sort_by is stable
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        ranked
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for EmotionScores {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut scores = Self::new();
        for (k, v) in iter {
            scores.insert(k, v);
        }
        scores
    }
}

impl Serialize for EmotionScores {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for EmotionScores {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ScoresVisitor;

        impl<'de> Visitor<'de> for ScoresVisitor {
            type Value = EmotionScores;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of emotion label to score")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut scores = EmotionScores::new();
                while let Some((label, score)) = access.next_entry::<String, f64>()? {
                    scores.insert(label, score);
                }
                Ok(scores)
            }
        }

        deserializer.deserialize_map(ScoresVisitor)
    }
}

/// Body of `POST /analyze`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub text: String,
}

/// Body of `POST /tts`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsRequest {
    pub text: String,
    #[serde(alias = "autoAnalyze", default = "default_true")]
    pub auto_analyze: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsResponse {
    #[serde(alias = "audioUrl")]
    pub audio_url: String,
}

/// One entry of `GET /voices`. Fields beyond the name are kept as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct VoicesResponse {
    #[serde(default)]
    pub voices: Vec<Voice>,
}

/// The analyze route answers either with the bare record or wrapped as
/// `{"success": true, "result": {...}}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum AnalyzeEnvelope {
    Wrapped { result: AnalysisResult },
    Bare(AnalysisResult),
}

impl AnalyzeEnvelope {
    pub fn into_result(self) -> AnalysisResult {
        match self {
            AnalyzeEnvelope::Wrapped { result } => result,
            AnalyzeEnvelope::Bare(result) => result,
        }
    }
}

/// Pull a user-facing message out of an error body.
///
/// Tries `message`, then a string `error`, then `error.message`.
pub fn error_message(body: &serde_json::Value) -> Option<String> {
    if let Some(msg) = body.get("message").and_then(|m| m.as_str()) {
        return Some(msg.to_string());
    }
    match body.get("error") {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(err) => err
            .get("message")
            .and_then(|m| m.as_str())
            .map(|s| s.to_string()),
        None => None,
    }
}
