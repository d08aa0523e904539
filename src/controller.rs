//! Page controller: user actions → service calls → presenter
//!
//! Runs on a single UI thread. Handlers take `&self` so overlapping actions
//! (a double-clicked analyze button) can be in flight at once; each request
//! takes a ticket and only the newest one is applied.

use crate::chart::{ChartHost, Result as RenderResult};
use crate::client::EmotionService;
use crate::model::{AnalysisResult, AnalyzeRequest, TtsRequest};
use crate::presenter::{DisplayRegion, ResultPresenter, Tab};
use rand::rngs::StdRng;
use rand::Rng;
use std::cell::{Cell, Ref, RefCell};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const EMPTY_ANALYZE_TEXT: &str = "请输入要分析的文本";
pub const EMPTY_TTS_TEXT: &str = "请输入要合成语音的文本";
pub const NO_AUDIO_TO_DOWNLOAD: &str = "没有可下载的音频";
pub const NO_AUDIO_TO_SHARE: &str = "没有可分享的音频";
pub const SHARE_FAILED: &str = "分享失败";
pub const LINK_COPIED: &str = "音频链接已复制到剪贴板";
pub const CLIPBOARD_DENIED: &str = "无法访问剪贴板，请手动粘贴文本";

pub const AUDIO_FILE_NAME: &str = "emotion_speech.mp3";
pub const SHARE_TITLE: &str = "EmotionSpeak 语音";
pub const SHARE_TEXT: &str = "听听这段情感语音";

/// Everything that can go wrong in a handler. `Display` is the user-facing text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UiError {
    /// Bad input; no request was sent
    #[error("{0}")]
    Validation(String),

    /// The service answered with a failure
    #[error("{0}")]
    Service(String),

    /// Clipboard or share capability missing or denied
    #[error("{0}")]
    Integration(String),

    /// Download/share with no audio loaded
    #[error("{0}")]
    ResourceMissing(String),

    /// The result couldn't be drawn
    #[error("结果渲染失败: {0}")]
    Render(String),
}

/// Failure reported by a platform capability (clipboard, share sheet).
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct IntegrationError(pub String);

/// What happened to a response once it arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// A newer request of the same kind started first; this one was dropped.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareOutcome {
    Shared,
    CopiedLink,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub url: String,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePayload {
    pub title: String,
    pub text: String,
    pub url: String,
}

/// The page around the presenter: notifications, input field, audio element,
/// tabs, and the clipboard/share capabilities.
#[allow(async_fn_in_trait)]
pub trait Page {
    /// Blocking error notification.
    fn show_error(&self, message: &str);

    fn show_success(&self, message: &str);

    fn set_loading(&self, active: bool);

    fn set_input(&self, text: &str);

    fn focus_input(&self);

    fn activate_tab(&self, tab: Tab);

    /// Bind `url` to the audio element and start playback.
    fn play_audio(&self, url: &str);

    /// Save `download.url` locally as `download.file_name`.
    fn start_download(&self, download: &Download);

    async fn read_clipboard(&self) -> Result<String, IntegrationError>;

    async fn write_clipboard(&self, text: &str) -> Result<(), IntegrationError>;

    /// Whether a native share sheet exists.
    fn can_share(&self) -> bool;

    async fn share(&self, payload: &SharePayload) -> Result<(), IntegrationError>;
}

/// Keeps the loading indicator on while at least one guard is alive.
struct LoadingGuard<'a, P: Page> {
    page: &'a P,
    depth: &'a Cell<usize>,
}

impl<'a, P: Page> LoadingGuard<'a, P> {
    fn new(page: &'a P, depth: &'a Cell<usize>) -> Self {
        let previous = depth.get();
        depth.set(previous + 1);
        if previous == 0 {
            page.set_loading(true);
        }
        Self { page, depth }
    }
}

impl<P: Page> Drop for LoadingGuard<'_, P> {
    fn drop(&mut self) {
        let remaining = self.depth.get().saturating_sub(1);
        self.depth.set(remaining);
        if remaining == 0 {
            self.page.set_loading(false);
        }
    }
}

fn next_ticket(generation: &Cell<u64>) -> u64 {
    let ticket = generation.get() + 1;
    generation.set(ticket);
    ticket
}

fn require_text(input: &str, message: &str) -> Result<String, UiError> {
    let text = input.trim();
    if text.is_empty() {
        return Err(UiError::Validation(message.to_string()));
    }
    Ok(text.to_string())
}

pub struct Controller<S, P, H, D, R = StdRng>
where
    S: EmotionService,
    P: Page,
    H: ChartHost,
    D: DisplayRegion,
    R: Rng,
{
    service: S,
    page: P,
    presenter: RefCell<ResultPresenter<H, D, R>>,
    audio_url: RefCell<Option<String>>,
    analyze_generation: Cell<u64>,
    speech_generation: Cell<u64>,
    loading_depth: Cell<usize>,
}

impl<S, P, H, D, R> Controller<S, P, H, D, R>
where
    S: EmotionService,
    P: Page,
    H: ChartHost,
    D: DisplayRegion,
    R: Rng,
{
    pub fn new(service: S, page: P, presenter: ResultPresenter<H, D, R>) -> Self {
        Self {
            service,
            page,
            presenter: RefCell::new(presenter),
            audio_url: RefCell::new(None),
            analyze_generation: Cell::new(0),
            speech_generation: Cell::new(0),
            loading_depth: Cell::new(0),
        }
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn presenter(&self) -> Ref<'_, ResultPresenter<H, D, R>> {
        self.presenter.borrow()
    }

    /// Currently loaded audio, if any.
    pub fn audio_url(&self) -> Option<String> {
        self.audio_url.borrow().clone()
    }

    /// Show `err` to the user and hand it back.
    fn report<T>(&self, result: Result<T, UiError>) -> Result<T, UiError> {
        if let Err(err) = &result {
            self.page.show_error(&err.to_string());
        }
        result
    }

    /// Analyze `input` and render the result.
    pub async fn analyze(&self, input: &str) -> Result<Outcome, UiError> {
        let result = self.try_analyze(input).await;
        self.report(result)
    }

    async fn try_analyze(&self, input: &str) -> Result<Outcome, UiError> {
        let text = require_text(input, EMPTY_ANALYZE_TEXT)?;
        let ticket = next_ticket(&self.analyze_generation);
        let _loading = LoadingGuard::new(&self.page, &self.loading_depth);

        info!(ticket, chars = text.chars().count(), "analyze");
        let response = self.service.analyze(&AnalyzeRequest { text }).await;

        if ticket != self.analyze_generation.get() {
            warn!(ticket, latest = self.analyze_generation.get(), "discarding stale analysis");
            return Ok(Outcome::Stale);
        }

        let result = response.map_err(|e| UiError::Service(e.user_message()))?;
        self.render(&result)
            .map_err(|e| UiError::Render(e.to_string()))?;
        Ok(Outcome::Applied)
    }

    fn render(&self, result: &AnalysisResult) -> RenderResult<()> {
        self.presenter.borrow_mut().render(result)
    }

    /// Synthesize speech for `input`, load it and play it.
    pub async fn synthesize(&self, input: &str) -> Result<Outcome, UiError> {
        let result = self.try_synthesize(input).await;
        self.report(result)
    }

    async fn try_synthesize(&self, input: &str) -> Result<Outcome, UiError> {
        let text = require_text(input, EMPTY_TTS_TEXT)?;
        let ticket = next_ticket(&self.speech_generation);
        let _loading = LoadingGuard::new(&self.page, &self.loading_depth);

        info!(ticket, "synthesize");
        let response = self
            .service
            .synthesize(&TtsRequest {
                text,
                auto_analyze: true,
            })
            .await;

        if ticket != self.speech_generation.get() {
            warn!(ticket, latest = self.speech_generation.get(), "discarding stale speech");
            return Ok(Outcome::Stale);
        }

        let speech = response.map_err(|e| UiError::Service(e.user_message()))?;
        *self.audio_url.borrow_mut() = Some(speech.audio_url.clone());
        self.page.play_audio(&speech.audio_url);
        Ok(Outcome::Applied)
    }

    /// Save the loaded audio as `emotion_speech.mp3`.
    pub fn download_audio(&self) -> Result<Download, UiError> {
        let result = match self.audio_url() {
            Some(url) => {
                let download = Download {
                    url,
                    file_name: AUDIO_FILE_NAME.to_string(),
                };
                self.page.start_download(&download);
                Ok(download)
            }
            None => Err(UiError::ResourceMissing(NO_AUDIO_TO_DOWNLOAD.to_string())),
        };
        self.report(result)
    }

    /// Share the loaded audio, or copy its link when no share sheet exists.
    pub async fn share_audio(&self) -> Result<ShareOutcome, UiError> {
        let result = self.try_share().await;
        self.report(result)
    }

    async fn try_share(&self) -> Result<ShareOutcome, UiError> {
        let url = self
            .audio_url()
            .ok_or_else(|| UiError::ResourceMissing(NO_AUDIO_TO_SHARE.to_string()))?;

        if self.page.can_share() {
            let payload = SharePayload {
                title: SHARE_TITLE.to_string(),
                text: SHARE_TEXT.to_string(),
                url,
            };
            self.page.share(&payload).await.map_err(|e| {
                debug!(error = %e, "share failed");
                UiError::Integration(SHARE_FAILED.to_string())
            })?;
            Ok(ShareOutcome::Shared)
        } else {
            self.page.write_clipboard(&url).await.map_err(|e| {
                debug!(error = %e, "clipboard write failed");
                UiError::Integration(SHARE_FAILED.to_string())
            })?;
            self.page.show_success(LINK_COPIED);
            Ok(ShareOutcome::CopiedLink)
        }
    }

    /// Replace the input field with the clipboard text.
    pub async fn paste(&self) -> Result<String, UiError> {
        let result = match self.page.read_clipboard().await {
            Ok(text) => {
                self.page.set_input(&text);
                Ok(text)
            }
            Err(e) => {
                debug!(error = %e, "clipboard read failed");
                Err(UiError::Integration(CLIPBOARD_DENIED.to_string()))
            }
        };
        self.report(result)
    }

    pub fn clear(&self) {
        self.page.set_input("");
        self.page.focus_input();
    }

    /// Activate `tab` and re-layout its chart, which may have been laid out hidden.
    pub fn switch_tab(&self, tab: Tab) {
        self.page.activate_tab(tab);
        self.presenter.borrow_mut().resize(tab);
    }

    pub fn window_resized(&self) {
        self.presenter.borrow_mut().resize_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Result as ServiceResult, ServiceError};
    use crate::config::ChartSettings;
    use crate::model::{fixtures, TtsResponse, Voice};
    use crate::report::{HtmlBuffer, ReportCanvas};
    use rand::SeedableRng;
    use std::collections::VecDeque;
    use tokio::sync::oneshot;

    type Reply<T> = oneshot::Receiver<ServiceResult<T>>;

    #[derive(Default)]
    struct ScriptedService {
        analyses: RefCell<VecDeque<Reply<AnalysisResult>>>,
        speeches: RefCell<VecDeque<Reply<TtsResponse>>>,
        calls: Cell<usize>,
    }

    impl ScriptedService {
        fn queue_analysis(&self) -> oneshot::Sender<ServiceResult<AnalysisResult>> {
            let (tx, rx) = oneshot::channel();
            self.analyses.borrow_mut().push_back(rx);
            tx
        }

        fn queue_speech(&self) -> oneshot::Sender<ServiceResult<TtsResponse>> {
            let (tx, rx) = oneshot::channel();
            self.speeches.borrow_mut().push_back(rx);
            tx
        }
    }

    impl EmotionService for ScriptedService {
        async fn analyze(&self, _request: &AnalyzeRequest) -> ServiceResult<AnalysisResult> {
            self.calls.set(self.calls.get() + 1);
            let rx = self.analyses.borrow_mut().pop_front().expect("unexpected analyze call");
            rx.await.expect("reply dropped")
        }

        async fn synthesize(&self, _request: &TtsRequest) -> ServiceResult<TtsResponse> {
            self.calls.set(self.calls.get() + 1);
            let rx = self.speeches.borrow_mut().pop_front().expect("unexpected tts call");
            rx.await.expect("reply dropped")
        }

        async fn voices(&self) -> ServiceResult<Vec<Voice>> {
            Ok(vec![])
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Ev {
        Error(String),
        Success(String),
        Loading(bool),
        Input(String),
        Focus,
        Tab(Tab),
        Play(String),
        Download(Download),
        Share(SharePayload),
        Copy(String),
    }

    #[derive(Default)]
    struct FakePage {
        events: RefCell<Vec<Ev>>,
        clipboard: Option<String>,
        share_sheet: bool,
        share_fails: bool,
    }

    impl FakePage {
        fn events(&self) -> Vec<Ev> {
            self.events.borrow().clone()
        }

        fn errors(&self) -> Vec<String> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    Ev::Error(m) => Some(m),
                    _ => None,
                })
                .collect()
        }

        fn push(&self, ev: Ev) {
            self.events.borrow_mut().push(ev);
        }
    }

    impl Page for FakePage {
        fn show_error(&self, message: &str) {
            self.push(Ev::Error(message.to_string()));
        }

        fn show_success(&self, message: &str) {
            self.push(Ev::Success(message.to_string()));
        }

        fn set_loading(&self, active: bool) {
            self.push(Ev::Loading(active));
        }

        fn set_input(&self, text: &str) {
            self.push(Ev::Input(text.to_string()));
        }

        fn focus_input(&self) {
            self.push(Ev::Focus);
        }

        fn activate_tab(&self, tab: Tab) {
            self.push(Ev::Tab(tab));
        }

        fn play_audio(&self, url: &str) {
            self.push(Ev::Play(url.to_string()));
        }

        fn start_download(&self, download: &Download) {
            self.push(Ev::Download(download.clone()));
        }

        async fn read_clipboard(&self) -> Result<String, IntegrationError> {
            self.clipboard
                .clone()
                .ok_or_else(|| IntegrationError("NotAllowedError".to_string()))
        }

        async fn write_clipboard(&self, text: &str) -> Result<(), IntegrationError> {
            match &self.clipboard {
                Some(_) => {
                    self.push(Ev::Copy(text.to_string()));
                    Ok(())
                }
                None => Err(IntegrationError("NotAllowedError".to_string())),
            }
        }

        fn can_share(&self) -> bool {
            self.share_sheet
        }

        async fn share(&self, payload: &SharePayload) -> Result<(), IntegrationError> {
            if self.share_fails {
                return Err(IntegrationError("AbortError".to_string()));
            }
            self.push(Ev::Share(payload.clone()));
            Ok(())
        }
    }

    type TestController = Controller<ScriptedService, FakePage, ReportCanvas, HtmlBuffer>;

    fn controller(page: FakePage) -> TestController {
        let presenter = ResultPresenter::with_rng(
            ReportCanvas::default(),
            HtmlBuffer::default(),
            ChartSettings::default(),
            StdRng::seed_from_u64(3),
        );
        Controller::new(ScriptedService::default(), page, presenter)
    }

    fn sad() -> AnalysisResult {
        let mut result = fixtures::happy();
        result.emotion.dominant_emotion = "sadness".to_string();
        result
    }

    #[tokio::test]
    async fn test_analyze_renders_result() {
        let c = controller(FakePage::default());
        c.service().queue_analysis().send(Ok(fixtures::happy())).unwrap();

        let outcome = c.analyze("  I am so happy today!  ").await.unwrap();
        assert_eq!(outcome, Outcome::Applied);

        let presenter = c.presenter();
        assert!(presenter.display().visible);
        assert!(presenter.display().html.contains("主导情感: 喜悦"));
        let pie = presenter.emotions_chart().unwrap();
        assert_eq!(pie.option().unwrap().data().len(), 3);
        assert_eq!(presenter.word_cloud().unwrap().option().weights(), vec![100, 95]);
        assert_eq!(c.page().events(), vec![Ev::Loading(true), Ev::Loading(false)]);
    }

    #[tokio::test]
    async fn test_blank_input_is_rejected_without_request() {
        let c = controller(FakePage::default());
        let err = c.analyze("   \n\t").await.unwrap_err();
        assert_eq!(err, UiError::Validation(EMPTY_ANALYZE_TEXT.to_string()));
        assert_eq!(c.service().calls.get(), 0);
        assert_eq!(c.page().events(), vec![Ev::Error(EMPTY_ANALYZE_TEXT.to_string())]);

        let err = c.synthesize("").await.unwrap_err();
        assert_eq!(err.to_string(), EMPTY_TTS_TEXT);
        assert_eq!(c.service().calls.get(), 0);
    }

    #[tokio::test]
    async fn test_service_error_clears_loading_and_keeps_previous_render() {
        let c = controller(FakePage::default());
        c.service().queue_analysis().send(Ok(fixtures::happy())).unwrap();
        c.analyze("happy").await.unwrap();

        c.service()
            .queue_analysis()
            .send(Err(ServiceError::Status {
                status: 500,
                message: "engine offline".to_string(),
            }))
            .unwrap();
        let err = c.analyze("again").await.unwrap_err();
        assert_eq!(err, UiError::Service("engine offline".to_string()));

        let events = c.page().events();
        assert_eq!(events.last(), Some(&Ev::Error("engine offline".to_string())));
        assert!(events.contains(&Ev::Loading(false)));
        assert_eq!(events.iter().filter(|e| **e == Ev::Loading(false)).count(), 2);
        assert!(c.presenter().display().html.contains("喜悦"));
    }

    #[tokio::test]
    async fn test_overlapping_analyses_apply_only_the_latest() {
        let c = controller(FakePage::default());
        let first_tx = c.service().queue_analysis();
        let second_tx = c.service().queue_analysis();

        let (first, second, _) = tokio::join!(c.analyze("first"), c.analyze("second"), async {
            // answer out of order
            second_tx.send(Ok(sad())).unwrap();
            tokio::task::yield_now().await;
            first_tx.send(Ok(fixtures::happy())).unwrap();
        });

        assert_eq!(first.unwrap(), Outcome::Stale);
        assert_eq!(second.unwrap(), Outcome::Applied);
        let presenter = c.presenter();
        assert!(presenter.display().html.contains("主导情感: 悲伤"));
        assert_eq!(presenter.display().writes, 1);

        let loading: Vec<_> = c
            .page()
            .events()
            .into_iter()
            .filter(|e| matches!(e, Ev::Loading(_)))
            .collect();
        assert_eq!(loading, vec![Ev::Loading(true), Ev::Loading(false)]);
    }

    #[tokio::test]
    async fn test_stale_failure_is_not_reported() {
        let c = controller(FakePage::default());
        let first_tx = c.service().queue_analysis();
        let second_tx = c.service().queue_analysis();

        let (first, second, _) = tokio::join!(c.analyze("first"), c.analyze("second"), async {
            first_tx
                .send(Err(ServiceError::Decode("late garbage".to_string())))
                .unwrap();
            tokio::task::yield_now().await;
            second_tx.send(Ok(fixtures::happy())).unwrap();
        });

        assert_eq!(first.unwrap(), Outcome::Stale);
        assert_eq!(second.unwrap(), Outcome::Applied);
        assert!(c.page().errors().is_empty());
    }

    #[tokio::test]
    async fn test_synthesize_loads_and_plays() {
        let c = controller(FakePage::default());
        c.service()
            .queue_speech()
            .send(Ok(TtsResponse {
                audio_url: "/audio/out.mp3".to_string(),
            }))
            .unwrap();

        assert_eq!(c.synthesize("hello").await.unwrap(), Outcome::Applied);
        assert_eq!(c.audio_url().as_deref(), Some("/audio/out.mp3"));
        assert!(c.page().events().contains(&Ev::Play("/audio/out.mp3".to_string())));
    }

    #[tokio::test]
    async fn test_download_requires_audio() {
        let c = controller(FakePage::default());
        let err = c.download_audio().unwrap_err();
        assert_eq!(err, UiError::ResourceMissing(NO_AUDIO_TO_DOWNLOAD.to_string()));

        c.service()
            .queue_speech()
            .send(Ok(TtsResponse {
                audio_url: "/audio/out.mp3".to_string(),
            }))
            .unwrap();
        c.synthesize("hello").await.unwrap();
        let download = c.download_audio().unwrap();
        assert_eq!(download.file_name, "emotion_speech.mp3");
        assert_eq!(download.url, "/audio/out.mp3");
        assert!(c.page().events().contains(&Ev::Download(download)));
    }

    async fn with_audio(page: FakePage) -> TestController {
        let c = controller(page);
        c.service()
            .queue_speech()
            .send(Ok(TtsResponse {
                audio_url: "http://host/audio/a.mp3".to_string(),
            }))
            .unwrap();
        c.synthesize("hello").await.unwrap();
        c
    }

    #[tokio::test]
    async fn test_share_without_audio() {
        let c = controller(FakePage::default());
        let err = c.share_audio().await.unwrap_err();
        assert_eq!(err.to_string(), NO_AUDIO_TO_SHARE);
    }

    #[tokio::test]
    async fn test_share_uses_native_sheet() {
        let c = with_audio(FakePage {
            share_sheet: true,
            ..FakePage::default()
        })
        .await;
        assert_eq!(c.share_audio().await.unwrap(), ShareOutcome::Shared);
        assert!(c.page().events().contains(&Ev::Share(SharePayload {
            title: SHARE_TITLE.to_string(),
            text: SHARE_TEXT.to_string(),
            url: "http://host/audio/a.mp3".to_string(),
        })));
    }

    #[tokio::test]
    async fn test_share_falls_back_to_clipboard() {
        let c = with_audio(FakePage {
            clipboard: Some(String::new()),
            ..FakePage::default()
        })
        .await;
        assert_eq!(c.share_audio().await.unwrap(), ShareOutcome::CopiedLink);
        let events = c.page().events();
        assert!(events.contains(&Ev::Copy("http://host/audio/a.mp3".to_string())));
        assert_eq!(events.last(), Some(&Ev::Success(LINK_COPIED.to_string())));
    }

    #[tokio::test]
    async fn test_share_failures_report_share_failed() {
        let c = with_audio(FakePage {
            share_sheet: true,
            share_fails: true,
            ..FakePage::default()
        })
        .await;
        assert_eq!(
            c.share_audio().await.unwrap_err(),
            UiError::Integration(SHARE_FAILED.to_string())
        );

        // no share sheet and no clipboard
        let c = with_audio(FakePage::default()).await;
        assert_eq!(c.share_audio().await.unwrap_err().to_string(), SHARE_FAILED);
    }

    #[tokio::test]
    async fn test_paste() {
        let c = controller(FakePage {
            clipboard: Some("今天很开心".to_string()),
            ..FakePage::default()
        });
        assert_eq!(c.paste().await.unwrap(), "今天很开心");
        assert_eq!(c.page().events(), vec![Ev::Input("今天很开心".to_string())]);

        let c = controller(FakePage::default());
        let err = c.paste().await.unwrap_err();
        assert_eq!(err, UiError::Integration(CLIPBOARD_DENIED.to_string()));
        assert_eq!(c.page().errors(), vec![CLIPBOARD_DENIED.to_string()]);
    }

    #[test]
    fn test_clear_and_tabs() {
        let c = controller(FakePage::default());
        c.clear();
        c.switch_tab(Tab::WordCloud);
        c.window_resized();
        assert_eq!(
            c.page().events(),
            vec![Ev::Input(String::new()), Ev::Focus, Ev::Tab(Tab::WordCloud)]
        );
    }

    #[tokio::test]
    async fn test_tab_switch_resizes_its_chart() {
        let c = controller(FakePage::default());
        c.service().queue_analysis().send(Ok(fixtures::happy())).unwrap();
        c.analyze("happy").await.unwrap();

        c.switch_tab(Tab::Emotions);
        c.window_resized();
        let presenter = c.presenter();
        assert_eq!(presenter.emotions_chart().unwrap().resizes(), 2);
        assert_eq!(presenter.word_cloud().unwrap().resizes(), 1);
    }
}
