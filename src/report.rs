//! Standalone HTML report with ECharts and wordcloud2.js
//!
//! [`ReportCanvas`] is a [`ChartHost`] that records what each widget was told
//! instead of drawing it. The recorded options are then written into a page
//! that mounts them client-side.

use crate::chart::{ChartHost, ChartWidget, PieOption, PieWidget, Result, WordCloudOption};
use crate::config::ChartSettings;
use crate::model::AnalysisResult;
use crate::presenter::{DisplayRegion, ResultPresenter};
use crate::summary::escape_html;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::Path;

/// Pie widget that keeps its last option.
#[derive(Debug, Clone, Default)]
pub struct RecordedPie {
    container: String,
    option: Option<PieOption>,
    updates: u32,
    resizes: u32,
}

impl RecordedPie {
    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn option(&self) -> Option<&PieOption> {
        self.option.as_ref()
    }

    pub fn updates(&self) -> u32 {
        self.updates
    }

    pub fn resizes(&self) -> u32 {
        self.resizes
    }
}

impl ChartWidget for RecordedPie {
    fn resize(&mut self) {
        self.resizes += 1;
    }

    fn dispose(self) {}
}

impl PieWidget for RecordedPie {
    fn set_option(&mut self, option: &PieOption) {
        self.option = Some(option.clone());
        self.updates += 1;
    }
}

/// Word cloud widget holding the option it was built with.
#[derive(Debug, Clone)]
pub struct RecordedCloud {
    container: String,
    option: WordCloudOption,
    resizes: u32,
}

impl RecordedCloud {
    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn option(&self) -> &WordCloudOption {
        &self.option
    }

    pub fn resizes(&self) -> u32 {
        self.resizes
    }
}

impl ChartWidget for RecordedCloud {
    fn resize(&mut self) {
        self.resizes += 1;
    }

    fn dispose(self) {}
}

/// Hands out recording widgets and counts how many were created.
#[derive(Debug, Clone, Default)]
pub struct ReportCanvas {
    pies_created: u32,
    clouds_created: u32,
}

impl ReportCanvas {
    pub fn pies_created(&self) -> u32 {
        self.pies_created
    }

    pub fn clouds_created(&self) -> u32 {
        self.clouds_created
    }
}

impl ChartHost for ReportCanvas {
    type Pie = RecordedPie;
    type Cloud = RecordedCloud;

    fn init_pie(&mut self, container: &str) -> Result<RecordedPie> {
        self.pies_created += 1;
        Ok(RecordedPie {
            container: container.to_string(),
            ..RecordedPie::default()
        })
    }

    fn init_word_cloud(&mut self, container: &str, option: &WordCloudOption) -> Result<RecordedCloud> {
        self.clouds_created += 1;
        Ok(RecordedCloud {
            container: container.to_string(),
            option: option.clone(),
            resizes: 0,
        })
    }
}

/// In-memory display region.
#[derive(Debug, Clone, Default)]
pub struct HtmlBuffer {
    pub html: String,
    pub visible: bool,
    pub writes: u32,
}

impl DisplayRegion for HtmlBuffer {
    fn set_html(&mut self, html: &str) {
        self.html = html.to_string();
        self.writes += 1;
    }

    fn show(&mut self) {
        self.visible = true;
    }
}

/// Everything the presenter produced for one result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rendered {
    pub summary_html: String,
    pub emotion_chart: PieOption,
    pub word_cloud: WordCloudOption,
    pub emotions_container: String,
    pub wordcloud_container: String,
}

/// Run the presenter against a recording canvas and collect its output.
pub fn render_snapshot(result: &AnalysisResult, settings: &ChartSettings) -> Result<Rendered> {
    let mut presenter = ResultPresenter::new(ReportCanvas::default(), HtmlBuffer::default(), settings.clone());
    presenter.render(result)?;
    Ok(snapshot(&presenter))
}

/// Collect what a presenter has drawn so far. Charts not yet created come out empty.
pub fn snapshot<R: rand::Rng>(presenter: &ResultPresenter<ReportCanvas, HtmlBuffer, R>) -> Rendered {
    let settings = presenter.settings();
    let emotion_chart = presenter
        .emotions_chart()
        .and_then(RecordedPie::option)
        .cloned()
        .unwrap_or_else(|| PieOption::emotions(&Default::default()));
    let word_cloud = presenter
        .word_cloud()
        .map(|cloud| cloud.option().clone())
        .unwrap_or_else(|| WordCloudOption {
            list: vec![],
            grid_size: settings.grid_size,
            weight_factor: settings.weight_factor,
            font_family: settings.font_family.clone(),
            colors: vec![],
        });

    Rendered {
        summary_html: presenter.display().html.clone(),
        emotion_chart,
        word_cloud,
        emotions_container: settings.emotions_container.clone(),
        wordcloud_container: settings.wordcloud_container.clone(),
    }
}

/// JSON for embedding inside a `<script>` element.
fn script_json<T: Serialize>(value: &T) -> io::Result<String> {
    let json = serde_json::to_string(value)?;
    // keep "</script>" in data from closing the element
    Ok(json.replace("</", "<\\/"))
}

/// Write the full report page.
pub fn write<W: Write>(writer: &mut W, source_text: &str, rendered: &Rendered) -> io::Result<()> {
    let pie_json = script_json(&rendered.emotion_chart)?;
    let cloud_json = script_json(&rendered.word_cloud)?;
    let generated = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");

    write!(
        writer,
        r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>EmotionSpeak 情感分析报告</title>
    <script src="https://cdn.jsdelivr.net/npm/echarts@5/dist/echarts.min.js"></script>
    <script src="https://cdn.jsdelivr.net/npm/wordcloud@1.2.2/src/wordcloud2.js"></script>
    <style>
        :root {{
            --bg: #f5f5f7;
            --card: #ffffff;
            --border: #d2d2d7;
            --text: #1d1d1f;
            --dim: #86868b;
            --accent: #5856d6;
            --shadow: 0 2px 8px rgba(0,0,0,0.08), 0 1px 2px rgba(0,0,0,0.04);
        }}
        * {{ box-sizing: border-box; margin: 0; padding: 0; }}
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'PingFang SC', 'Microsoft YaHei', sans-serif;
            background: var(--bg);
            color: var(--text);
            line-height: 1.5;
        }}
        .container {{ max-width: 1100px; margin: 0 auto; padding: 3rem 2rem; }}
        .header {{ margin-bottom: 2rem; padding-bottom: 1rem; border-bottom: 1px solid var(--border); }}
        .logo {{ font-size: 2rem; font-weight: 700; color: var(--accent); }}
        .subtitle {{ color: var(--dim); font-size: 0.9rem; }}
        .source {{ background: var(--card); border-radius: 12px; padding: 1rem 1.25rem; margin-bottom: 1.5rem; box-shadow: var(--shadow); }}
        .card {{ background: var(--card); border-radius: 16px; padding: 1.5rem; margin-bottom: 1.5rem; box-shadow: var(--shadow); }}
        .card h3 {{ font-size: 1rem; margin-bottom: 0.75rem; }}
        .emotion-grid {{ display: grid; gap: 0.75rem; }}
        .emotion-label {{ display: flex; justify-content: space-between; font-size: 0.9rem; }}
        .emotion-progress {{ background: #eee; border-radius: 4px; height: 8px; overflow: hidden; }}
        .emotion-fill {{ background: var(--accent); height: 100%; }}
        .keyword-tag {{ display: inline-block; background: #eef; border-radius: 999px; padding: 0.1rem 0.7rem; margin: 0.2rem; font-size: 0.85rem; }}
        .charts {{ display: grid; grid-template-columns: 1fr 1fr; gap: 1.5rem; }}
        .chart {{ width: 100%; height: 360px; }}
    </style>
</head>
<body>
<div class="container">
    <div class="header">
        <div class="logo">EmotionSpeak</div>
        <div class="subtitle">生成时间 {generated}</div>
    </div>
    <div class="source">{source}</div>
    <div class="card" id="result-container">
{summary}
    </div>
    <div class="charts">
        <div class="card"><div class="chart" id="{pie_id}"></div></div>
        <div class="card"><canvas class="chart" id="{cloud_id}"></canvas></div>
    </div>
</div>
<script>
    const pieOption = {pie_json};
    const cloudOption = {cloud_json};

    const pie = echarts.init(document.getElementById('{pie_id}'));
    pie.setOption(pieOption);

    const colorByWord = {{}};
    cloudOption.list.forEach(([word], i) => {{ colorByWord[word] = cloudOption.colors[i]; }});
    WordCloud(document.getElementById('{cloud_id}'), {{
        list: cloudOption.list,
        gridSize: cloudOption.gridSize,
        weightFactor: cloudOption.weightFactor,
        fontFamily: cloudOption.fontFamily,
        color: (word) => colorByWord[word],
    }});

    window.addEventListener('resize', () => pie.resize());
</script>
</body>
</html>
"#,
        generated = generated,
        source = escape_html(source_text),
        summary = rendered.summary_html,
        pie_id = escape_html(&rendered.emotions_container),
        cloud_id = escape_html(&rendered.wordcloud_container),
        pie_json = pie_json,
        cloud_json = cloud_json,
    )?;

    Ok(())
}

/// Write the report to `path`, creating parent directories.
pub fn generate(path: &Path, source_text: &str, rendered: &Rendered) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut file = io::BufWriter::new(std::fs::File::create(path)?);
    write(&mut file, source_text, rendered)?;
    file.flush()
}
