//! Voxweave CLI - convert tagged transcripts into merged audio

use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use voxweave_core::{TextToSpeech, TtsConfig};

mod settings;

#[derive(Debug, Parser)]
#[command(
    name = "voxweave",
    about = "Convert speaker-tagged transcripts into a single audio track",
    version = env!("CARGO_PKG_VERSION")
)]
struct Args {
    /// Transcript file to convert, or "-" for stdin
    input: String,

    /// TTS provider: elevenlabs, openai, azureopenai, google, googlemulti
    #[arg(short, long, default_value = "elevenlabs")]
    provider: String,

    /// Output audio path; defaults to <audio dir>/<input stem>.wav
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Config file (TOML); defaults to the user config directory
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voxweave_cli=info,voxweave_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = settings::load(args.config.as_ref(), &args.provider)?;

    let text = read_input(&args.input)?;
    if text.trim().is_empty() {
        bail!("Transcript input is empty");
    }

    let output = args
        .output
        .unwrap_or_else(|| default_output(&config, &args.input));

    info!("Converting with provider '{}'", args.provider);
    let tts = TextToSpeech::new(&args.provider, config)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    spinner.set_message("Generating and merging audio...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    let result = tts
        .convert_to_speech(&text, None, Some(&output), true)
        .await;
    spinner.finish_and_clear();

    let (_, audio) = result.context("Conversion failed")?;

    println!("Audio written to {}", output.display());
    println!("Track length: {} ms", audio.duration_ms());
    Ok(())
}

fn read_input(input: &str) -> anyhow::Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read stdin")?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("Failed to read {}", input))
    }
}

fn default_output(config: &TtsConfig, input: &str) -> PathBuf {
    let stem = if input == "-" {
        "output".to_string()
    } else {
        PathBuf::from(input)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string())
    };
    config
        .output_directories
        .audio
        .join(format!("{}.{}", stem, config.audio_format.extension()))
}
