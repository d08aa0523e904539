//! Client for the EmotionSpeak analysis/TTS service
//!
//! Routes:
//! - `POST /analyze` `{text}` → analysis record (bare or `{success, result}`)
//! - `POST /tts` `{text, auto_analyze}` → `{audio_url}`
//! - `GET /voices` → `{voices: [...]}`
//!
//! Failed calls carry a JSON body whose `message` is shown to the user as-is.

use crate::config::ServiceConfig;
use crate::model::{
    error_message, AnalysisResult, AnalyzeEnvelope, AnalyzeRequest, TtsRequest, TtsResponse, Voice,
    VoicesResponse,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const ANALYZE_FAILED: &str = "分析失败";
pub const TTS_FAILED: &str = "语音合成失败";
pub const VOICES_FAILED: &str = "获取语音列表失败";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status. `message` is already user-facing.
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Invalid response: {0}")]
    Decode(String),
}

impl ServiceError {
    /// Text to put in front of the user.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

/// The upstream service as the controller sees it.
#[allow(async_fn_in_trait)]
pub trait EmotionService {
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalysisResult>;

    async fn synthesize(&self, request: &TtsRequest) -> Result<TtsResponse>;

    async fn voices(&self) -> Result<Vec<Voice>>;

    /// Absolute form of a resource reference the service returned.
    fn resolve(&self, reference: &str) -> String {
        reference.to_string()
    }
}

/// `reqwest`-backed [`EmotionService`].
#[derive(Debug, Clone)]
pub struct HttpService {
    client: Client,
    base_url: String,
}

impl HttpService {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetch raw bytes, e.g. the synthesized audio.
    pub async fn download(&self, reference: &str) -> Result<Vec<u8>> {
        let url = self.resolve(reference);
        debug!(%url, "downloading");
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Status {
                status: status.as_u16(),
                message: format!("下载失败 ({})", status),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn post_json<B, T>(&self, path: &str, body: &B, fallback: &str) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        info!(%url, "POST");
        let response = self.client.post(&url).json(body).send().await?;
        read_json(response, fallback).await
    }
}

/// Decode a JSON response, mapping non-success statuses to their `message`.
async fn read_json<T: DeserializeOwned>(response: reqwest::Response, fallback: &str) -> Result<T> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .as_ref()
            .and_then(error_message)
            .unwrap_or_else(|| fallback.to_string());
        warn!(status = status.as_u16(), %message, "service call failed");
        return Err(ServiceError::Status {
            status: status.as_u16(),
            message,
        });
    }

    // straight from text: a `Value` round trip would sort object keys
    serde_json::from_str(&text).map_err(|e| ServiceError::Decode(e.to_string()))
}

impl EmotionService for HttpService {
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalysisResult> {
        let envelope: AnalyzeEnvelope = self.post_json("/analyze", request, ANALYZE_FAILED).await?;
        Ok(envelope.into_result())
    }

    async fn synthesize(&self, request: &TtsRequest) -> Result<TtsResponse> {
        self.post_json("/tts", request, TTS_FAILED).await
    }

    /// `/audio/x.mp3` → `<base_url>/audio/x.mp3`; absolute URLs pass through.
    fn resolve(&self, reference: &str) -> String {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            reference.to_string()
        } else if reference.starts_with('/') {
            self.url(reference)
        } else {
            format!("{}/{}", self.base_url, reference)
        }
    }

    async fn voices(&self) -> Result<Vec<Voice>> {
        let url = self.url("/voices");
        info!(%url, "GET");
        let response = self.client.get(&url).send().await?;
        let voices: VoicesResponse = read_json(response, VOICES_FAILED).await?;
        Ok(voices.voices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures;
    use std::io::Read;
    use std::thread::JoinHandle;
    use tiny_http::{Header, Response, Server};

    /// Serve one canned response on an ephemeral port. The handle yields the request body.
    fn one_shot(status: u16, body: &'static str) -> (String, JoinHandle<(String, String)>) {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let handle = std::thread::spawn(move || {
            let mut request = server.recv().unwrap();
            let mut received = String::new();
            request.as_reader().read_to_string(&mut received).unwrap();
            let path = request.url().to_string();
            let response = Response::from_string(body)
                .with_status_code(status)
                .with_header(Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap());
            request.respond(response).unwrap();
            (path, received)
        });
        (format!("http://{}", addr), handle)
    }

    fn service(base_url: String) -> HttpService {
        HttpService::new(&ServiceConfig {
            base_url,
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_analyze_bare_response() {
        let (base, handle) = one_shot(200, fixtures::HAPPY_JSON);
        let svc = service(base);
        let result = svc
            .analyze(&AnalyzeRequest {
                text: "I am so happy today!".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(result, fixtures::happy());
        let labels: Vec<_> = result.emotion.emotion_scores.iter().map(|(k, _)| k).collect();
        assert_eq!(labels, vec!["joy", "surprise", "neutral"]);

        let (path, body) = handle.join().unwrap();
        assert_eq!(path, "/analyze");
        assert_eq!(body, r#"{"text":"I am so happy today!"}"#);
    }

    #[tokio::test]
    async fn test_wrapped_response_keeps_score_order() {
        let (base, handle) = one_shot(
            200,
            r#"{"success": true, "result": {
                "emotion": {"dominant_emotion": "sadness", "confidence": 0.6, "sentiment_score": -0.4,
                            "emotion_scores": {"sadness": 0.6, "neutral": 0.2, "anger": 0.2}},
                "intensity": {"intensity_level": "medium", "intensity_score": 0.5},
                "context": {"context_type": "personal", "keywords": []},
                "voice": {"pitch": 0.9, "speed": 0.9, "volume": 0.8, "style": "sad"}
            }}"#,
        );
        let result = service(base)
            .analyze(&AnalyzeRequest { text: "x".to_string() })
            .await
            .unwrap();
        let ranked: Vec<_> = result.emotion.emotion_scores.ranked().into_iter().map(|(k, _)| k).collect();
        assert_eq!(ranked, vec!["sadness", "neutral", "anger"]);

        let pie = crate::chart::emotion_dataset(&result.emotion.emotion_scores);
        let names: Vec<_> = pie.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["悲伤", "中性", "愤怒"]);
        handle.join().unwrap();
    }

    #[tokio::test]
    async fn test_error_uses_message_field() {
        let (base, handle) = one_shot(500, r#"{"success": false, "message": "engine offline"}"#);
        let err = service(base)
            .synthesize(&TtsRequest {
                text: "hi".to_string(),
                auto_analyze: true,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Status { status: 500, .. }));
        assert_eq!(err.user_message(), "engine offline");
        let (path, body) = handle.join().unwrap();
        assert_eq!(path, "/tts");
        assert!(body.contains(r#""auto_analyze":true"#));
    }

    #[tokio::test]
    async fn test_error_without_message_falls_back() {
        let (base, handle) = one_shot(503, "Service Unavailable");
        let err = service(base)
            .analyze(&AnalyzeRequest { text: "x".to_string() })
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), ANALYZE_FAILED);
        handle.join().unwrap();
    }

    #[tokio::test]
    async fn test_success_with_bad_body_is_decode_error() {
        let (base, handle) = one_shot(200, r#"{"emotion": {}}"#);
        let err = service(base)
            .analyze(&AnalyzeRequest { text: "x".to_string() })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Decode(_)));
        handle.join().unwrap();
    }

    #[tokio::test]
    async fn test_voices() {
        let (base, handle) = one_shot(
            200,
            r#"{"success": true, "voices": [{"name": "zh-CN-XiaoxiaoNeural", "gender": "Female"}]}"#,
        );
        let voices = service(base).voices().await.unwrap();
        assert_eq!(voices.len(), 1);
        assert_eq!(voices[0].name, "zh-CN-XiaoxiaoNeural");
        assert_eq!(voices[0].extra["gender"], "Female");
        let (path, _) = handle.join().unwrap();
        assert_eq!(path, "/voices");
    }

    #[test]
    fn test_resolve_references() {
        let svc = service("http://127.0.0.1:5000/".to_string());
        assert_eq!(svc.base_url(), "http://127.0.0.1:5000");
        assert_eq!(svc.resolve("/audio/a.mp3"), "http://127.0.0.1:5000/audio/a.mp3");
        assert_eq!(svc.resolve("audio/a.mp3"), "http://127.0.0.1:5000/audio/a.mp3");
        assert_eq!(svc.resolve("https://cdn.example.com/a.mp3"), "https://cdn.example.com/a.mp3");
    }
}
