use chrono::Local;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use emotionspeak::catalog;
use emotionspeak::chart::{percent, to_fixed};
use emotionspeak::controller::{EMPTY_ANALYZE_TEXT, EMPTY_TTS_TEXT};
use emotionspeak::{report, AnalysisResult, AnalyzeRequest, Config, EmotionService, HttpService, TtsRequest};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "emotionspeak")]
#[command(author, version, about = "Emotion analysis, charts and speech from an EmotionSpeak service")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze text and write an HTML report with charts
    Analyze {
        /// Text to analyze
        text: String,

        /// Output report file (default: emotionspeak-reports/emotion_report_<timestamp>.html)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the analysis record as JSON instead of writing a report
        #[arg(long)]
        json: bool,

        /// Service URL, overrides config and EMOTIONSPEAK_ENDPOINT
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Synthesize speech for text
    Speak {
        /// Text to speak
        text: String,

        /// Save the audio to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip emotion analysis and use neutral voice parameters
        #[arg(long)]
        no_analyze: bool,

        /// Service URL, overrides config and EMOTIONSPEAK_ENDPOINT
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// List voices the service offers
    Voices {
        /// Service URL, overrides config and EMOTIONSPEAK_ENDPOINT
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Start the local result viewer
    Serve {
        /// Port to listen on (default: from config, else 3001)
        #[arg(short, long)]
        port: Option<u16>,

        /// Service URL, overrides config and EMOTIONSPEAK_ENDPOINT
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Generate shell completions
    Completion {
        /// Shell to generate for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("EMOTIONSPEAK_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", "Error:".red().bold(), message);
    std::process::exit(1);
}

fn load_config(endpoint: Option<String>) -> Config {
    let config = match Config::load() {
        Ok(config) => config.with_endpoint(endpoint),
        Err(e) => fail(e),
    };
    if let Err(e) = config.validate() {
        fail(e);
    }
    config
}

fn runtime() -> tokio::runtime::Runtime {
    match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => fail(format!("Failed to start runtime: {}", e)),
    }
}

fn service(config: &Config) -> HttpService {
    match HttpService::new(&config.service) {
        Ok(svc) => svc,
        Err(e) => fail(e),
    }
}

fn main() {
    init_logging();
    let args = Args::parse();

    match args.command {
        Command::Analyze {
            text,
            output,
            json,
            endpoint,
        } => {
            let text = text.trim().to_string();
            if text.is_empty() {
                fail(EMPTY_ANALYZE_TEXT);
            }
            let config = load_config(endpoint);
            let svc = service(&config);

            let result = match runtime().block_on(svc.analyze(&AnalyzeRequest { text: text.clone() })) {
                Ok(result) => result,
                Err(e) => fail(e.user_message()),
            };

            if json {
                match serde_json::to_string_pretty(&result) {
                    Ok(out) => println!("{}", out),
                    Err(e) => fail(e),
                }
                return;
            }

            print_summary(&result);

            let rendered = match report::render_snapshot(&result, &config.charts) {
                Ok(rendered) => rendered,
                Err(e) => fail(e),
            };
            let path = output.unwrap_or_else(|| {
                let timestamp = Local::now().format("%Y%m%d_%H%M%S");
                PathBuf::from("emotionspeak-reports").join(format!("emotion_report_{}.html", timestamp))
            });
            if let Err(e) = report::generate(&path, &text, &rendered) {
                fail(format!("Failed to write report: {}", e));
            }
            eprintln!("{} {}", "Report:".green(), path.display());
        }

        Command::Speak {
            text,
            output,
            no_analyze,
            endpoint,
        } => {
            let text = text.trim().to_string();
            if text.is_empty() {
                fail(EMPTY_TTS_TEXT);
            }
            let config = load_config(endpoint);
            let svc = service(&config);
            let rt = runtime();

            let request = TtsRequest {
                text,
                auto_analyze: !no_analyze,
            };
            let speech = match rt.block_on(svc.synthesize(&request)) {
                Ok(speech) => speech,
                Err(e) => fail(e.user_message()),
            };
            let url = svc.resolve(&speech.audio_url);
            println!("{}", url);

            if let Some(path) = output {
                let bytes = match rt.block_on(svc.download(&speech.audio_url)) {
                    Ok(bytes) => bytes,
                    Err(e) => fail(e.user_message()),
                };
                if let Err(e) = std::fs::write(&path, bytes) {
                    fail(format!("Failed to write {}: {}", path.display(), e));
                }
                eprintln!("{} {}", "Saved:".green(), path.display());
            }
        }

        Command::Voices { endpoint } => {
            let config = load_config(endpoint);
            let svc = service(&config);
            let voices = match runtime().block_on(svc.voices()) {
                Ok(voices) => voices,
                Err(e) => fail(e.user_message()),
            };
            if voices.is_empty() {
                eprintln!("{}", "No voices available".dimmed());
            }
            for voice in voices {
                println!("{}", voice.name);
            }
        }

        Command::Serve { port, endpoint } => {
            let config = load_config(endpoint);
            let port = port.unwrap_or(config.serve.port);
            if let Err(e) = emotionspeak::serve::start(port, config) {
                fail(format!("Server error: {}", e));
            }
        }

        Command::Completion { shell } => {
            let mut cmd = Args::command();
            generate(shell, &mut cmd, "emotionspeak", &mut io::stdout());
        }
    }
}

fn print_summary(result: &AnalysisResult) {
    let emotion = &result.emotion;
    println!(
        "{} {}  ({} {}%)",
        "主导情感:".bold(),
        catalog::display_name(&emotion.dominant_emotion).cyan().bold(),
        "置信度",
        percent(emotion.confidence, 1)
    );
    for (label, score) in emotion.emotion_scores.ranked() {
        println!("  {:<8} {:>6}%", catalog::display_name(label), percent(score, 1));
    }
    println!(
        "{} {} ({}%)",
        "强度:".bold(),
        result.intensity.level,
        percent(result.intensity.score, 1)
    );
    if !result.context.keywords.is_empty() {
        let words: Vec<&str> = result.context.keywords.iter().map(|k| k.text.as_str()).collect();
        println!("{} {}", "关键词:".bold(), words.join(", "));
    }
    println!(
        "{} pitch {} / speed {} / volume {} / {}",
        "语音:".bold(),
        to_fixed(result.voice.pitch, 2),
        to_fixed(result.voice.speed, 2),
        to_fixed(result.voice.volume, 2),
        result.voice.style
    );
}
