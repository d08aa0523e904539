//! Chart widget seams and the option sets handed to them
//!
//! The pie chart speaks ECharts' option format and the word cloud speaks
//! wordcloud2.js'. Both are plain serde types so any host (a browser bridge,
//! the HTML report, a test double) can forward them untouched.

use crate::catalog;
use crate::config::ChartSettings;
use crate::model::{EmotionScores, Keyword};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while creating or driving a chart widget.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Chart container '{0}' not found")]
    ContainerNotFound(String),

    #[error("Chart widget failed: {0}")]
    Widget(String),
}

pub type Result<T> = std::result::Result<T, RenderError>;

/// A live widget bound to one container.
pub trait ChartWidget {
    /// Recompute layout for the container's current size.
    fn resize(&mut self);

    /// Release the widget. Consumes the handle so it can't be touched afterwards.
    fn dispose(self)
    where
        Self: Sized;
}

/// A widget whose option set can be replaced in place.
pub trait PieWidget: ChartWidget {
    fn set_option(&mut self, option: &PieOption);
}

/// Creates widgets bound to named containers.
///
/// The word cloud takes its option at construction because the underlying
/// library can't swap datasets on a live instance.
pub trait ChartHost {
    type Pie: PieWidget;
    type Cloud: ChartWidget;

    fn init_pie(&mut self, container: &str) -> Result<Self::Pie>;

    fn init_word_cloud(&mut self, container: &str, option: &WordCloudOption) -> Result<Self::Cloud>;
}

// =============================================================================
// PIE OPTION (ECharts)
// =============================================================================

pub const PIE_TITLE: &str = "情感分布";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieDatum {
    pub name: String,
    /// Percentage with one decimal, e.g. `"80.0"`
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieOption {
    pub title: Title,
    pub tooltip: Tooltip,
    pub series: Vec<PieSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Title {
    pub text: String,
    pub left: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tooltip {
    pub trigger: String,
    pub formatter: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PieSeries {
    #[serde(rename = "type")]
    pub kind: String,
    pub radius: [String; 2],
    pub avoid_label_overlap: bool,
    pub item_style: ItemStyle,
    pub label: SeriesLabel,
    pub emphasis: Emphasis,
    pub label_line: Toggle,
    pub data: Vec<PieDatum>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemStyle {
    pub border_radius: u32,
    pub border_color: String,
    pub border_width: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesLabel {
    pub show: bool,
    pub position: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Emphasis {
    pub label: EmphasisLabel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmphasisLabel {
    pub show: bool,
    pub font_size: String,
    pub font_weight: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Toggle {
    pub show: bool,
}

/// Extra digits inspected when checking for an exact tie. A double that sits
/// exactly halfway at a few decimals has a short terminating expansion.
const TIE_DIGITS: usize = 96;

/// Fixed-point text with `decimals` places, like JavaScript's `toFixed`.
///
/// `{:.N}` rounds an exact tie to even (`6.25` → `"6.2"`); here an exact tie
/// rounds away from zero (`"6.3"`). Values that only look like ties in decimal
/// (`1.005` is stored just below) round down as usual.
pub fn to_fixed(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let sign = if value < 0.0 { "-" } else { "" };
    let magnitude = value.abs();
    let rounded = format!("{:.*}", decimals, magnitude);

    let wide = format!("{:.*}", decimals + TIE_DIGITS, magnitude);
    let (head, tail) = wide.split_at(wide.len() - TIE_DIGITS);
    let head = head.trim_end_matches('.');
    let is_tie = tail.starts_with('5') && tail[1..].bytes().all(|b| b == b'0');

    if is_tie && rounded == head {
        format!("{}{}", sign, round_up_last_digit(head))
    } else {
        format!("{}{}", sign, rounded)
    }
}

/// Add one unit in the last place of a plain decimal string, carrying left.
fn round_up_last_digit(digits: &str) -> String {
    let mut out: Vec<char> = digits.chars().collect();
    for c in out.iter_mut().rev() {
        match *c {
            '.' => continue,
            '9' => *c = '0',
            d => {
                *c = (d as u8 + 1) as char;
                return out.into_iter().collect();
            }
        }
    }
    std::iter::once('1').chain(out).collect()
}

/// Format a unit score as a percentage with `decimals` places. No clamping.
pub fn percent(score: f64, decimals: usize) -> String {
    to_fixed(score * 100.0, decimals)
}

impl PieOption {
    /// Ring chart of the emotion distribution.
    pub fn emotions(scores: &EmotionScores) -> Self {
        Self {
            title: Title {
                text: PIE_TITLE.to_string(),
                left: "center".to_string(),
            },
            tooltip: Tooltip {
                trigger: "item".to_string(),
                formatter: "{b}: {c}%".to_string(),
            },
            series: vec![PieSeries {
                kind: "pie".to_string(),
                radius: ["40%".to_string(), "70%".to_string()],
                avoid_label_overlap: false,
                item_style: ItemStyle {
                    border_radius: 10,
                    border_color: "#fff".to_string(),
                    border_width: 2,
                },
                label: SeriesLabel {
                    show: false,
                    position: "center".to_string(),
                },
                emphasis: Emphasis {
                    label: EmphasisLabel {
                        show: true,
                        font_size: "20".to_string(),
                        font_weight: "bold".to_string(),
                    },
                },
                label_line: Toggle { show: false },
                data: emotion_dataset(scores),
            }],
        }
    }

    pub fn data(&self) -> &[PieDatum] {
        self.series.first().map(|s| s.data.as_slice()).unwrap_or(&[])
    }
}

/// One datum per score, in input order, named through the label catalog.
pub fn emotion_dataset(scores: &EmotionScores) -> Vec<PieDatum> {
    scores
        .iter()
        .map(|(label, score)| PieDatum {
            name: catalog::display_name(label).to_string(),
            value: percent(score, 1),
        })
        .collect()
}

// =============================================================================
// WORD CLOUD OPTION (wordcloud2.js)
// =============================================================================

/// `[text, weight]` as wordcloud2.js expects list entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordEntry(pub String, pub u32);

impl WordEntry {
    pub fn text(&self) -> &str {
        &self.0
    }

    pub fn weight(&self) -> u32 {
        self.1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordCloudOption {
    pub list: Vec<WordEntry>,
    pub grid_size: u32,
    pub weight_factor: u32,
    pub font_family: String,
    /// `rgb(...)` per list entry, same index
    pub colors: Vec<String>,
}

/// Weight for the keyword at `rank` (0-based): 100, 95, 90, ... floored at 10.
pub fn keyword_weight(rank: usize) -> u32 {
    let weight = 100usize.saturating_sub(rank.saturating_mul(5)).max(10);
    weight as u32
}

/// A color with every channel drawn from [100, 200).
pub fn random_color<R: Rng + ?Sized>(rng: &mut R) -> String {
    let r: u8 = rng.random_range(100..200);
    let g: u8 = rng.random_range(100..200);
    let b: u8 = rng.random_range(100..200);
    format!("rgb({}, {}, {})", r, g, b)
}

impl WordCloudOption {
    pub fn build<R: Rng + ?Sized>(keywords: &[Keyword], settings: &ChartSettings, rng: &mut R) -> Self {
        let list: Vec<WordEntry> = keywords
            .iter()
            .enumerate()
            .map(|(rank, kw)| WordEntry(kw.text.clone(), keyword_weight(rank)))
            .collect();
        let colors = list.iter().map(|_| random_color(&mut *rng)).collect();

        Self {
            list,
            grid_size: settings.grid_size,
            weight_factor: settings.weight_factor,
            font_family: settings.font_family.clone(),
            colors,
        }
    }

    pub fn weights(&self) -> Vec<u32> {
        self.list.iter().map(WordEntry::weight).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}
