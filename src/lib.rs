//! EmotionSpeak - emotion analysis results, charts and speech
//!
//! Sends text to an EmotionSpeak analysis/TTS service and presents what comes
//! back: an HTML summary, an emotion pie chart and a keyword word cloud.
//!
//! # Layers
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `model` | Wire types for analysis records and service calls |
//! | `catalog` | Emotion label → display name |
//! | `chart` | Chart options and the widget host traits |
//! | `presenter` | `ResultPresenter`: summary + charts, widget lifecycle |
//! | `client` | `EmotionService` and its HTTP implementation |
//! | `controller` | User actions, error reporting, overlapping requests |
//! | `report` | Recording canvas and standalone HTML reports |
//! | `serve` | Local viewer server |
//!
//! # Quick Start
//!
//! ```no_run
//! use emotionspeak::{report, AnalyzeRequest, Config, EmotionService, HttpService};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! let service = HttpService::new(&config.service)?;
//!
//! let result = service
//!     .analyze(&AnalyzeRequest { text: "今天真开心".to_string() })
//!     .await?;
//! let rendered = report::render_snapshot(&result, &config.charts)?;
//! report::generate("report.html".as_ref(), "今天真开心", &rendered)?;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod chart;
pub mod client;
pub mod config;
pub mod controller;
pub mod model;
pub mod presenter;
pub mod report;
pub mod serve;
pub mod summary;

pub use catalog::EmotionLabel;
pub use chart::{ChartHost, ChartWidget, PieOption, PieWidget, RenderError, WordCloudOption};
pub use client::{EmotionService, HttpService, ServiceError};
pub use config::{ChartSettings, Config, ConfigError};
pub use controller::{Controller, Outcome, Page, UiError};
pub use model::{
    AnalysisResult, AnalyzeRequest, EmotionScores, Keyword, TtsRequest, TtsResponse, Voice,
};
pub use presenter::{DisplayRegion, ResultPresenter, Tab};
pub use report::Rendered;
