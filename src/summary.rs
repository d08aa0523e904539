//! HTML summary of one analysis result

use crate::catalog;
use crate::chart::{percent, to_fixed};
use crate::model::AnalysisResult;

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Build the summary fragment: dominant emotion, ranked dimensions, intensity,
/// context keywords and voice parameters.
pub fn summary_html(result: &AnalysisResult) -> String {
    let AnalysisResult {
        emotion,
        intensity,
        context,
        voice,
    } = result;

    let mut html = String::new();

    html.push_str(&format!(
        r#"<div class="main-sentiment">
    <div class="dominant-emotion">
        <h3>主导情感: {}</h3>
        <div class="confidence-score">置信度: {}%</div>
        <div class="sentiment-score">情感得分: {}%</div>
    </div>
</div>
"#,
        escape_html(&catalog::display_name(&emotion.dominant_emotion)),
        percent(emotion.confidence, 1),
        percent(emotion.sentiment_score, 1),
    ));

    html.push_str(
        r#"<div class="emotion-dimensions">
    <h3>情感维度分析</h3>
    <div class="emotion-grid">
"#,
    );
    for (label, score) in emotion.emotion_scores.ranked() {
        html.push_str(&format!(
            r#"        <div class="emotion-item">
            <div class="emotion-label">
                <span>{}</span>
                <span>{}%</span>
            </div>
            <div class="emotion-progress">
                <div class="emotion-fill" style="width: {}%"></div>
            </div>
        </div>
"#,
            escape_html(&catalog::display_name(label)),
            percent(score, 1),
            score * 100.0,
        ));
    }
    html.push_str("    </div>\n</div>\n");

    html.push_str(&format!(
        r#"<div class="intensity-section">
    <h3>情感强度</h3>
    <div class="intensity-info">
        <p>强度级别: {}</p>
        <p>强度得分: {}%</p>
    </div>
</div>
"#,
        escape_html(&intensity.level),
        percent(intensity.score, 1),
    ));

    let tags: String = context
        .keywords
        .iter()
        .map(|kw| format!(r#"            <span class="keyword-tag">{}</span>"#, escape_html(&kw.text)) + "\n")
        .collect();
    html.push_str(&format!(
        r#"<div class="context-section">
    <h3>上下文分析</h3>
    <div class="context-info">
        <p>语境类型: {}</p>
        <div class="keyword-tags">
{}        </div>
    </div>
</div>
"#,
        escape_html(&context.context_type),
        tags,
    ));

    html.push_str(&format!(
        r#"<div class="voice-section">
    <h3>语音参数</h3>
    <div class="voice-params">
        <p>音调: {}</p>
        <p>语速: {}</p>
        <p>音量: {}</p>
        <p>风格: {}</p>
    </div>
</div>
"#,
        to_fixed(voice.pitch, 2),
        to_fixed(voice.speed, 2),
        to_fixed(voice.volume, 2),
        escape_html(&voice.style),
    ));

    html
}
