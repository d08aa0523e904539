//! Result presenter: summary, emotion pie and keyword word cloud
//!
//! The presenter owns both chart slots for the lifetime of a page view.
//!
//! | slot | lifecycle |
//! |------|-----------|
//! | emotions | Absent → create → Live, then `set_option` on every render |
//! | word cloud | Absent → create → Live → dispose → Absent → create → Live on every render |
//!
//! The word cloud library can't replace its dataset in place, so a re-render
//! always disposes the previous widget before creating the next one. At most
//! one live widget is bound to each container.

use crate::chart::{ChartHost, ChartWidget, PieOption, PieWidget, Result, WordCloudOption};
use crate::config::ChartSettings;
use crate::model::{AnalysisResult, EmotionScores, Keyword};
use crate::summary::summary_html;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Where the summary fragment goes.
pub trait DisplayRegion {
    /// Replace the region's content.
    fn set_html(&mut self, html: &str);

    /// Make the region visible.
    fn show(&mut self);
}

/// Chart tabs in the result view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Emotions,
    WordCloud,
}

impl Tab {
    pub fn as_str(self) -> &'static str {
        match self {
            Tab::Emotions => "emotions",
            Tab::WordCloud => "wordcloud",
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "emotions" => Ok(Tab::Emotions),
            "wordcloud" => Ok(Tab::WordCloud),
            other => Err(format!("unknown tab '{}'", other)),
        }
    }
}

pub struct ResultPresenter<H: ChartHost, D: DisplayRegion, R: Rng = StdRng> {
    host: H,
    display: D,
    settings: ChartSettings,
    rng: R,
    emotions_chart: Option<H::Pie>,
    wordcloud_chart: Option<H::Cloud>,
}

impl<H: ChartHost, D: DisplayRegion> ResultPresenter<H, D, StdRng> {
    pub fn new(host: H, display: D, settings: ChartSettings) -> Self {
        Self::with_rng(host, display, settings, StdRng::from_os_rng())
    }
}

impl<H: ChartHost, D: DisplayRegion, R: Rng> ResultPresenter<H, D, R> {
    /// Use a specific color source, e.g. a seeded RNG in tests.
    pub fn with_rng(host: H, display: D, settings: ChartSettings, rng: R) -> Self {
        Self {
            host,
            display,
            settings,
            rng,
            emotions_chart: None,
            wordcloud_chart: None,
        }
    }

    /// Render everything for one analysis: summary, emotion pie, word cloud.
    pub fn render(&mut self, result: &AnalysisResult) -> Result<()> {
        self.render_summary(result);
        self.render_emotion_chart(&result.emotion.emotion_scores)?;
        self.render_word_cloud(&result.context.keywords)
    }

    /// Write the summary into the display region, show it, and return the fragment.
    pub fn render_summary(&mut self, result: &AnalysisResult) -> String {
        let html = summary_html(result);
        self.display.set_html(&html);
        self.display.show();
        html
    }

    /// Create the pie on first use, then replace its option.
    pub fn render_emotion_chart(&mut self, scores: &EmotionScores) -> Result<()> {
        let option = PieOption::emotions(scores);
        let chart = match self.emotions_chart.take() {
            Some(chart) => chart,
            None => {
                debug!(container = %self.settings.emotions_container, "creating emotions chart");
                self.host.init_pie(&self.settings.emotions_container)?
            }
        };
        let chart = self.emotions_chart.insert(chart);
        chart.set_option(&option);
        Ok(())
    }

    /// Dispose any existing cloud, then build a fresh one from `keywords`.
    pub fn render_word_cloud(&mut self, keywords: &[Keyword]) -> Result<()> {
        if let Some(previous) = self.wordcloud_chart.take() {
            debug!(container = %self.settings.wordcloud_container, "disposing word cloud");
            previous.dispose();
        }

        let option = WordCloudOption::build(keywords, &self.settings, &mut self.rng);
        debug!(
            container = %self.settings.wordcloud_container,
            words = option.list.len(),
            "creating word cloud"
        );
        let cloud = self
            .host
            .init_word_cloud(&self.settings.wordcloud_container, &option)?;
        self.wordcloud_chart = Some(cloud);
        Ok(())
    }

    /// Re-layout every live chart. Absent charts are skipped.
    pub fn resize_all(&mut self) {
        if let Some(chart) = self.emotions_chart.as_mut() {
            chart.resize();
        }
        if let Some(cloud) = self.wordcloud_chart.as_mut() {
            cloud.resize();
        }
    }

    /// Re-layout only the chart shown on `tab`.
    pub fn resize(&mut self, tab: Tab) {
        match tab {
            Tab::Emotions => {
                if let Some(chart) = self.emotions_chart.as_mut() {
                    chart.resize();
                }
            }
            Tab::WordCloud => {
                if let Some(cloud) = self.wordcloud_chart.as_mut() {
                    cloud.resize();
                }
            }
        }
    }

    pub fn emotions_chart(&self) -> Option<&H::Pie> {
        self.emotions_chart.as_ref()
    }

    pub fn word_cloud(&self) -> Option<&H::Cloud> {
        self.wordcloud_chart.as_ref()
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn settings(&self) -> &ChartSettings {
        &self.settings
    }
}
