//! HTTP server for the result viewer
//!
//! `emotionspeak serve` → starts server, shows the viewer page, forwards
//! analyze/TTS calls upstream and answers with rendered presenter output.

use crate::client::{EmotionService, HttpService};
use crate::config::{ChartSettings, Config};
use crate::controller::{EMPTY_ANALYZE_TEXT, EMPTY_TTS_TEXT};
use crate::model::{AnalyzeRequest, TtsRequest};
use crate::report::render_snapshot;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use tiny_http::{Header, Method, Request, Response, Server};
use tokio::runtime::Runtime;
use tracing::{error, info};

#[derive(Serialize)]
struct ApiResponse<T> {
    ok: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AudioData {
    audio_url: String,
}

/// Viewer page; talks to `/api/analyze` and `/api/tts`.
const VIEWER_HTML: &str = include_str!("viewer.html");

/// A response ready to send.
#[derive(Debug)]
struct Reply {
    status: u16,
    body: String,
    content_type: &'static str,
}

impl Reply {
    fn json<T: Serialize>(status: u16, body: &ApiResponse<T>) -> Self {
        let body = serde_json::to_string(body)
            .unwrap_or_else(|e| format!(r#"{{"ok":false,"data":null,"error":"{}"}}"#, e));
        Self {
            status,
            body,
            content_type: "application/json",
        }
    }

    fn fail(status: u16, message: impl Into<String>) -> Self {
        Self::json(status, &ApiResponse::failure(message))
    }
}

struct ServeContext<S: EmotionService> {
    service: S,
    runtime: Runtime,
    charts: ChartSettings,
}

/// Start the viewer server
pub fn start(port: u16, config: Config) -> std::io::Result<()> {
    let service = HttpService::new(&config.service)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let ctx = ServeContext {
        service,
        runtime,
        charts: config.charts,
    };

    let addr = format!("127.0.0.1:{}", port);
    let server = Server::http(&addr)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    let url = format!("http://localhost:{}", port);

    eprintln!("\n{}", "EmotionSpeak".bold().green());
    eprintln!("   Viewer:   {}", url);
    eprintln!("   Upstream: {}", config.service.base_url);
    eprintln!("   Press Ctrl+C to stop\n");

    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, &ctx) {
            error!(error = %e, "failed to answer request");
        }
    }

    Ok(())
}

fn handle_request<S: EmotionService>(mut request: Request, ctx: &ServeContext<S>) -> std::io::Result<()> {
    let url = request.url().to_string();
    let path = url.split('?').next().unwrap_or("/").to_string();
    let method = request.method().clone();

    let mut body = String::new();
    if method == Method::Post {
        if let Err(e) = request.as_reader().read_to_string(&mut body) {
            return respond(request, Reply::fail(400, format!("Failed to read body: {}", e)));
        }
    }

    info!(%method, %path, "request");
    let reply = dispatch(ctx, &method, &path, &body);
    respond(request, reply)
}

fn respond(request: Request, reply: Reply) -> std::io::Result<()> {
    let header = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes())
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "bad content type"))?;
    let response = Response::from_string(reply.body)
        .with_status_code(reply.status)
        .with_header(header);
    request.respond(response)
}

fn dispatch<S: EmotionService>(ctx: &ServeContext<S>, method: &Method, path: &str, body: &str) -> Reply {
    match (method, path) {
        (&Method::Get, "/") | (&Method::Get, "/index.html") => Reply {
            status: 200,
            body: VIEWER_HTML.to_string(),
            content_type: "text/html; charset=utf-8",
        },

        (&Method::Post, "/api/analyze") => handle_analyze(ctx, body),

        (&Method::Post, "/api/tts") => handle_tts(ctx, body),

        _ => Reply {
            status: 404,
            body: "Not found".to_string(),
            content_type: "text/plain",
        },
    }
}

fn handle_analyze<S: EmotionService>(ctx: &ServeContext<S>, body: &str) -> Reply {
    let req: AnalyzeRequest = match serde_json::from_str(body) {
        Ok(r) => r,
        Err(e) => return Reply::fail(400, format!("Invalid JSON: {}", e)),
    };
    let text = req.text.trim();
    if text.is_empty() {
        return Reply::fail(400, EMPTY_ANALYZE_TEXT);
    }

    let request = AnalyzeRequest {
        text: text.to_string(),
    };
    let result = match ctx.runtime.block_on(ctx.service.analyze(&request)) {
        Ok(result) => result,
        Err(e) => return Reply::fail(502, e.user_message()),
    };

    match render_snapshot(&result, &ctx.charts) {
        Ok(rendered) => Reply::json(200, &ApiResponse::success(rendered)),
        Err(e) => Reply::fail(500, e.to_string()),
    }
}

fn handle_tts<S: EmotionService>(ctx: &ServeContext<S>, body: &str) -> Reply {
    let req: TtsRequest = match serde_json::from_str(body) {
        Ok(r) => r,
        Err(e) => return Reply::fail(400, format!("Invalid JSON: {}", e)),
    };
    let text = req.text.trim();
    if text.is_empty() {
        return Reply::fail(400, EMPTY_TTS_TEXT);
    }

    let request = TtsRequest {
        text: text.to_string(),
        auto_analyze: req.auto_analyze,
    };
    match ctx.runtime.block_on(ctx.service.synthesize(&request)) {
        Ok(speech) => Reply::json(
            200,
            &ApiResponse::success(AudioData {
                audio_url: ctx.service.resolve(&speech.audio_url),
            }),
        ),
        Err(e) => Reply::fail(502, e.user_message()),
    }
}
