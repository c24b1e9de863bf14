//! seance: a projected talking face driven by conversation

mod io;

use anyhow::Context;
use seance_animation::{AnimationSynchronizer, FrameIndex, IdleLoop};
use seance_config::Settings;
use seance_core::{FrameSink, SampleRate, VoiceConfig};
use seance_llm::create_language_model;
use seance_pipeline::{
    create_speech_to_text, create_text_to_speech, ConversationOrchestrator, OrchestratorConfig,
    SpeechRenderer, UtteranceCapture,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SEANCE_CONFIG").ok())
        .map(PathBuf::from);

    let settings =
        Settings::load(config_path.as_deref()).context("failed to load configuration")?;
    init_tracing(&settings.system.log_level);
    info!(persona = %settings.persona.name, "seance starting");

    let sample_rate = sample_rate_from_hz(settings.audio.sample_rate_hz);

    // animation
    let frame_index = Arc::new(FrameIndex::load(&settings.animation.frame_index_path));
    let synchronizer = Arc::new(AnimationSynchronizer::new(IdleLoop::new(
        frame_index.idle_frames(),
    )));

    // boundaries
    let source = Arc::new(io::SilentMicrophone::new(
        sample_rate,
        settings.audio.frame_ms,
    ));
    let speaker = Arc::new(io::NullSpeaker::new());
    let stt = create_speech_to_text(&settings.speech);
    let tts = create_text_to_speech(sample_rate);
    let model = create_language_model(&settings.generator, &settings.persona).await;
    info!(model = model.model_name(), stt = stt.engine_name(), "backends selected");

    // pipeline
    let capture = Arc::new(UtteranceCapture::new(
        source,
        stt,
        settings.capture.clone(),
        sample_rate,
    ));
    let renderer = Arc::new(SpeechRenderer::new(
        tts,
        speaker,
        VoiceConfig {
            speed: settings.speech.speed,
            volume: settings.speech.volume,
        },
    ));
    let orchestrator = ConversationOrchestrator::new(
        capture,
        model,
        renderer,
        synchronizer.clone(),
        frame_index,
        OrchestratorConfig::from_settings(&settings),
    );

    // render loop at the projector cadence; the synchronizer answers every
    // tick no matter what the conversation is doing
    let frame_sink = io::LogFrameSink::new();
    let render_sync = synchronizer.clone();
    let tick = Duration::from_secs(1) / settings.animation.fps;
    let render = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            frame_sink.present(&render_sync.tick());
        }
    });

    let runner = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.run().await })
    };
    orchestrator.wake();

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("interrupt received, shutting down");

    orchestrator.shutdown();
    runner
        .await
        .context("orchestrator task panicked")?
        .context("orchestrator failed")?;
    render.abort();

    info!("goodbye");
    Ok(())
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn sample_rate_from_hz(hz: u32) -> SampleRate {
    match hz {
        8_000 => SampleRate::Hz8000,
        16_000 => SampleRate::Hz16000,
        22_050 => SampleRate::Hz22050,
        44_100 => SampleRate::Hz44100,
        48_000 => SampleRate::Hz48000,
        other => {
            warn!(hz = other, "unsupported sample rate, using 16 kHz");
            SampleRate::Hz16000
        },
    }
}
