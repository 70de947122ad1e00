use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use voiceloop::config::{CoreConfig, default_config_path};
use voiceloop::playback::{PlaybackOrchestrator, PlaybackOutcome, RemoteSynthesizer};
use voiceloop::providers::{DeviceAudioSink, HttpSynthesizer, NullLocalSynthesizer};
use voiceloop::{answer_matches, normalize};

/// voiceloop - voice interaction core
#[derive(Parser)]
#[command(name = "voiceloop", version, about)]
struct Cli {
    /// Path to config file
    #[arg(short, long, env = "VOICELOOP_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Synthesize and play text
    Speak {
        /// Text to speak
        text: String,
        /// Language tag (e.g. "en-US")
        #[arg(short, long, default_value = "en")]
        language: String,
    },
    /// Print the normalized form of a transcript
    Normalize {
        /// Raw transcript text
        text: String,
        /// Collapse character runs of length >= 2 down to 1
        #[arg(long)]
        aggressive: bool,
    },
    /// Grade a spoken answer against an expected phrase
    Grade {
        /// What was heard
        spoken: String,
        /// What was expected
        expected: String,
    },
    /// Play a short synthesized test phrase through the speaker
    TestSpeaker,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,voiceloop=info",
        1 => "info,voiceloop=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = CoreConfig::load(&config_path)?;

    match cli.command {
        Command::Speak { text, language } => {
            let outcome = speak(&config, &text, &language).await?;
            tracing::info!(?outcome, "playback finished");
        }
        Command::Normalize { text, aggressive } => {
            println!("{}", normalize(&text, aggressive));
        }
        Command::Grade { spoken, expected } => {
            if answer_matches(&spoken, &expected) {
                println!("match");
            } else {
                println!("no match");
                std::process::exit(1);
            }
        }
        Command::TestSpeaker => {
            let outcome = speak(&config, "Voice output is working.", "en").await?;
            tracing::info!(?outcome, "speaker test finished");
        }
    }

    Ok(())
}

async fn speak(config: &CoreConfig, text: &str, language: &str) -> anyhow::Result<PlaybackOutcome> {
    let remote: Option<Arc<dyn RemoteSynthesizer>> =
        config.playback.api_key.as_ref().map(|key| {
            Arc::new(HttpSynthesizer::new(
                config.playback.remote_url.clone(),
                key.clone(),
                config.playback.remote_model.clone(),
            )) as Arc<dyn RemoteSynthesizer>
        });

    if remote.is_none() {
        tracing::warn!(
            "no {} set; only local synthesis is available",
            voiceloop::config::TTS_API_KEY_ENV
        );
    }

    let sink = Arc::new(DeviceAudioSink::new()?);
    let local = Arc::new(NullLocalSynthesizer::new());

    let mut orchestrator =
        PlaybackOrchestrator::new(remote, sink, local, config.playback.clone());

    Ok(orchestrator.speak(text, language).outcome().await)
}
