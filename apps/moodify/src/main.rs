use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    config::{load_settings_from, normalize_api_base_url, DEFAULT_CONFIG_FILE},
    HttpEmotionBackend, Navigator, Notification, Orchestrator, SubmitOutcome,
};
use shared::domain::{Mode, Route};
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod devices;

use devices::{FileCamera, FileMicrophone};

#[derive(Parser, Debug)]
#[command(name = "moodify", about = "Send text, images or audio for emotion analysis")]
struct Args {
    /// Overrides the configured analysis backend.
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyse a piece of typed text.
    Text { text: String },
    /// Upload an existing file in the given mode.
    Upload {
        #[arg(long, value_enum)]
        mode: ModeArg,
        path: PathBuf,
    },
    /// Capture a still through the camera flow, reading frames from `frame`.
    Face {
        frame: PathBuf,
        /// Take one frame, retake, and confirm the second.
        #[arg(long)]
        retake: bool,
    },
    /// Record through the microphone flow, playing back `clip`.
    Speech { clip: PathBuf },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Text,
    Face,
    Speech,
}

impl From<ModeArg> for Mode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Text => Mode::Text,
            ModeArg::Face => Mode::Face,
            ModeArg::Speech => Mode::Speech,
        }
    }
}

struct PrintNavigator;

impl Navigator for PrintNavigator {
    fn navigate(&self, route: Route) {
        let Route::Results(state) = &route;
        match serde_json::to_string_pretty(state) {
            Ok(json) => println!("-> {}\n{json}", route.path()),
            Err(_) => println!("-> {} (emotion: {})", route.path(), state.emotion),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let args = Args::parse();

    let mut settings = load_settings_from(&args.config)?;
    if let Some(api_url) = &args.api_url {
        settings.api_base_url = normalize_api_base_url(api_url)?;
    }
    info!(api = %settings.api_base_url, "using analysis backend");

    let backend = Arc::new(HttpEmotionBackend::from_settings(&settings)?);
    let navigator = Arc::new(PrintNavigator);
    let orchestrator = match &args.command {
        Command::Face { frame, .. } => Orchestrator::new_with_dependencies(
            backend,
            navigator,
            Arc::new(FileCamera::new(frame.clone())),
            Arc::new(capture::MissingMicrophone),
        ),
        Command::Speech { clip } => Orchestrator::new_with_dependencies(
            backend,
            navigator,
            Arc::new(capture::MissingCamera),
            Arc::new(FileMicrophone::new(clip.clone())),
        ),
        _ => Orchestrator::new(backend, navigator),
    }
    .with_upload_limit(settings.max_upload_bytes);
    let mut notifications = orchestrator.subscribe_notifications();

    let outcome = run(&orchestrator, args.command).await;
    drain(&mut notifications);

    match outcome? {
        SubmitOutcome::Completed(report) => {
            println!("emotion: {}", report.emotion().unwrap_or("unknown"));
        }
        other => println!("submission not completed: {other:?}"),
    }
    Ok(())
}

async fn run(orchestrator: &Orchestrator, command: Command) -> Result<SubmitOutcome> {
    let outcome = match command {
        Command::Text { text } => {
            orchestrator.open_modal().await;
            orchestrator.edit_text(&text).await?;
            orchestrator.send_text().await?
        }
        Command::Upload { mode, path } => {
            orchestrator.set_mode(mode.into()).await;
            orchestrator.select_file_from_path(&path).await?;
            orchestrator.submit().await?
        }
        Command::Face { retake, .. } => {
            orchestrator.set_mode(Mode::Face).await;
            orchestrator.open_modal().await;
            orchestrator.capture_frame().await?;
            if retake {
                orchestrator.retake().await?;
                orchestrator.capture_frame().await?;
            }
            orchestrator.confirm_frame().await?
        }
        Command::Speech { .. } => {
            orchestrator.set_mode(Mode::Speech).await;
            orchestrator.open_modal().await;
            orchestrator.start_recording().await?;
            orchestrator.stop_recording().await?;
            orchestrator.upload_audio().await?
        }
    };
    Ok(outcome)
}

fn drain(notifications: &mut broadcast::Receiver<Notification>) {
    while let Ok(note) = notifications.try_recv() {
        let level = if note.is_error() { "error" } else { "ok" };
        println!(
            "[{level} {}] {}",
            note.raised_at.format("%H:%M:%S"),
            note.message
        );
    }
}
