//! The conversation orchestrator: top-level state machine for a session
//!
//! Owns the only mutable `ConversationState`. Slow work (recognition,
//! generation, synthesis) runs in spawned tasks tagged with the turn they
//! belong to; completions come back as events on an internal queue and are
//! discarded when the turn has moved on. The event handlers themselves only
//! perform fast transitions, so the rendering path is never blocked.

use crate::capture::UtteranceCapture;
use crate::renderer::{RenderedSpeech, SpeechRenderer};
use metrics::counter;
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use seance_animation::{AnimationSynchronizer, CueTrack, FrameIndex};
use seance_config::{GeneratorConfig, PersonaConfig, Settings};
use seance_core::{
    ConversationHistory, ConversationState, Error, FaultReason, GenerationError, LanguageModel,
    Result, Transcript, Utterance, UtteranceId,
};
use seance_llm::build_request;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// What the session does once the current utterance finishes playing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AfterSpeaking {
    /// Keep the session going: reopen the microphone
    Listen,
    /// End the session: back to the idle loop
    Idle,
}

/// Internal state-machine events. Every event produced by a spawned task
/// carries the turn it belongs to; stale turns are dropped on arrival.
#[derive(Debug)]
enum TurnEvent {
    Wake,
    TranscriptReady { turn: u64, transcript: Transcript },
    CaptureEmpty { turn: u64 },
    CaptureTimedOut { turn: u64 },
    CaptureFailed { turn: u64, message: String },
    ResponseReady { turn: u64, text: String },
    GenerationFailed { turn: u64, error: GenerationError },
    SpeechRendered {
        turn: u64,
        text: String,
        rendered: RenderedSpeech,
        after: AfterSpeaking,
    },
    SynthesisFailed { turn: u64, message: String },
    PlaybackFinished { turn: u64, after: AfterSpeaking },
    BargedIn { turn: u64 },
    CooldownElapsed,
    Shutdown,
}

impl TurnEvent {
    fn name(&self) -> &'static str {
        match self {
            TurnEvent::Wake => "wake",
            TurnEvent::TranscriptReady { .. } => "transcript_ready",
            TurnEvent::CaptureEmpty { .. } => "capture_empty",
            TurnEvent::CaptureTimedOut { .. } => "capture_timed_out",
            TurnEvent::CaptureFailed { .. } => "capture_failed",
            TurnEvent::ResponseReady { .. } => "response_ready",
            TurnEvent::GenerationFailed { .. } => "generation_failed",
            TurnEvent::SpeechRendered { .. } => "speech_rendered",
            TurnEvent::SynthesisFailed { .. } => "synthesis_failed",
            TurnEvent::PlaybackFinished { .. } => "playback_finished",
            TurnEvent::BargedIn { .. } => "barged_in",
            TurnEvent::CooldownElapsed => "cooldown_elapsed",
            TurnEvent::Shutdown => "shutdown",
        }
    }
}

/// Observer events published on the broadcast channel
#[derive(Debug, Clone)]
pub enum OrchestratorEvent {
    StateChanged { state: ConversationState },
    TranscriptCaptured { text: String, confidence: f32 },
    UtteranceStarted { utterance: Utterance },
    UtteranceFinished { utterance_id: UtteranceId },
    BargeIn { utterance_id: UtteranceId },
    Fault { reason: FaultReason },
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Time spent in the error state before auto-recovery to idle
    pub error_cooldown: Duration,
    /// Start listening immediately on `run` instead of waiting for `wake`
    pub continuous_listening: bool,
    /// Monitor for voice activity while speaking and cut playback short
    pub barge_in_enabled: bool,
    /// Talk-loop cadence for utterances without viseme data
    pub talk_frame_interval: Duration,
    /// End the session after this many completed turns (0 = unlimited)
    pub max_session_turns: usize,
    pub generator: GeneratorConfig,
    pub persona: PersonaConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            error_cooldown: Duration::from_millis(
                seance_config::constants::timing::ERROR_COOLDOWN_MS,
            ),
            continuous_listening: false,
            barge_in_enabled: true,
            talk_frame_interval: Duration::from_millis(
                seance_config::constants::animation::TALK_FRAME_INTERVAL_MS,
            ),
            max_session_turns: 0,
            generator: GeneratorConfig::default(),
            persona: PersonaConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_session_turns: settings.system.max_session_turns,
            generator: settings.generator.clone(),
            persona: settings.persona.clone(),
            talk_frame_interval: Duration::from_millis(settings.animation.talk_frame_interval_ms),
            ..Self::default()
        }
    }
}

struct SessionState {
    active: bool,
    turns_completed: usize,
    history: ConversationHistory,
}

pub struct ConversationOrchestrator {
    capture: Arc<UtteranceCapture>,
    generator: Arc<dyn LanguageModel>,
    renderer: Arc<SpeechRenderer>,
    synchronizer: Arc<AnimationSynchronizer>,
    frame_index: Arc<FrameIndex>,
    config: OrchestratorConfig,

    state: Mutex<ConversationState>,
    session: Mutex<SessionState>,
    current_turn: AtomicU64,
    next_utterance_id: AtomicU64,

    events_tx: mpsc::UnboundedSender<TurnEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<TurnEvent>>>,
    observers: broadcast::Sender<OrchestratorEvent>,

    // the audio source has one reader at a time: whichever of these two
    // tasks is alive owns it
    capture_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
    monitor_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl ConversationOrchestrator {
    pub fn new(
        capture: Arc<UtteranceCapture>,
        generator: Arc<dyn LanguageModel>,
        renderer: Arc<SpeechRenderer>,
        synchronizer: Arc<AnimationSynchronizer>,
        frame_index: Arc<FrameIndex>,
        config: OrchestratorConfig,
    ) -> Arc<Self> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (observers, _) = broadcast::channel(64);

        let history_turns = config.generator.history_turns;
        Arc::new(Self {
            capture,
            generator,
            renderer,
            synchronizer,
            frame_index,
            config,
            state: Mutex::new(ConversationState::Idle),
            session: Mutex::new(SessionState {
                active: false,
                turns_completed: 0,
                history: ConversationHistory::new(history_turns),
            }),
            current_turn: AtomicU64::new(0),
            next_utterance_id: AtomicU64::new(1),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
            observers,
            capture_task: Mutex::new(None),
            monitor_task: Mutex::new(None),
        })
    }

    /// Current conversation state (a clone; the orchestrator stays the
    /// only mutator)
    pub fn state(&self) -> ConversationState {
        self.state.lock().clone()
    }

    /// Subscribe to observer events
    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.observers.subscribe()
    }

    /// External wake condition: start a session if idle
    pub fn wake(&self) {
        self.post(TurnEvent::Wake);
    }

    /// Stop the event loop after the current event
    pub fn shutdown(&self) {
        self.post(TurnEvent::Shutdown);
    }

    /// Interrupt the in-flight utterance and return to listening.
    ///
    /// Playback halt and synchronizer disarm happen synchronously in the
    /// caller: once this returns, no render tick can select a stale cue.
    /// No-op outside of `Speaking`.
    pub fn barge_in(&self) {
        let utterance_id = {
            let mut state = self.state.lock();
            let Some(utterance_id) = state.speaking_utterance() else {
                return;
            };
            self.renderer.cancel();
            self.synchronizer.disarm();
            *state = ConversationState::Listening {
                since: Instant::now(),
            };
            utterance_id
        };
        self.stop_monitor();

        let turn = self.advance_turn();
        info!(utterance_id, "barge-in: utterance discarded");
        counter!("seance_barge_ins_total").increment(1);
        self.publish(OrchestratorEvent::BargeIn { utterance_id });
        self.publish_state();
        self.post(TurnEvent::BargedIn { turn });
    }

    /// Run the event loop until `shutdown`. Consumes the internal
    /// receiver; a second call returns an error.
    pub async fn run(self: &Arc<Self>) -> Result<()> {
        let mut events = self
            .events_rx
            .lock()
            .take()
            .ok_or_else(|| Error::Config("orchestrator is already running".into()))?;

        if self.config.continuous_listening {
            self.post(TurnEvent::Wake);
        }

        while let Some(event) = events.recv().await {
            debug!(event = event.name(), "orchestrator event");
            match event {
                TurnEvent::Wake => self.handle_wake(),
                TurnEvent::TranscriptReady { turn, transcript } => {
                    self.handle_transcript(turn, transcript)
                },
                TurnEvent::CaptureEmpty { turn } => self.handle_capture_empty(turn),
                TurnEvent::CaptureTimedOut { turn } => self.handle_capture_timeout(turn),
                TurnEvent::CaptureFailed { turn, message } => {
                    if self.is_current(turn) {
                        self.fault(FaultReason::Capture, &message);
                    }
                },
                TurnEvent::ResponseReady { turn, text } => self.handle_response(turn, text),
                TurnEvent::GenerationFailed { turn, error } => {
                    self.handle_generation_failure(turn, error)
                },
                TurnEvent::SpeechRendered {
                    turn,
                    text,
                    rendered,
                    after,
                } => self.handle_speech_rendered(turn, text, rendered, after),
                TurnEvent::SynthesisFailed { turn, message } => {
                    if self.is_current(turn) {
                        self.fault(FaultReason::Synthesis, &message);
                    }
                },
                TurnEvent::PlaybackFinished { turn, after } => {
                    self.handle_playback_finished(turn, after)
                },
                TurnEvent::BargedIn { turn } => {
                    if self.is_current(turn) {
                        self.spawn_capture(turn);
                    }
                },
                TurnEvent::CooldownElapsed => self.handle_cooldown_elapsed(),
                TurnEvent::Shutdown => break,
            }
        }

        self.stop_monitor();
        self.stop_capture_task();
        self.renderer.cancel();
        self.synchronizer.disarm();
        self.set_state(ConversationState::Idle);
        info!("orchestrator stopped");
        Ok(())
    }

    // -- event handlers ----------------------------------------------------

    fn handle_wake(self: &Arc<Self>) {
        if !self.state.lock().is_idle() {
            debug!("wake ignored outside idle");
            return;
        }
        {
            let mut session = self.session.lock();
            session.active = true;
            session.turns_completed = 0;
            session.history.clear();
        }
        let turn = self.advance_turn();
        info!(turn, "session started");
        counter!("seance_sessions_total").increment(1);

        match self.pick(&self.config.persona.greetings) {
            Some(greeting) => self.spawn_speak(turn, greeting, AfterSpeaking::Listen),
            None => self.enter_listening(turn),
        }
    }

    fn handle_transcript(self: &Arc<Self>, turn: u64, transcript: Transcript) {
        if !self.is_current(turn) || !matches!(self.state(), ConversationState::Listening { .. })
        {
            return;
        }
        info!(text = %transcript.text, confidence = transcript.confidence, "transcript captured");
        self.publish(OrchestratorEvent::TranscriptCaptured {
            text: transcript.text.clone(),
            confidence: transcript.confidence,
        });

        if self.config.persona.is_exit_phrase(&transcript.text) {
            info!("exit phrase heard, closing session");
            self.session.lock().active = false;
            self.set_state(ConversationState::Thinking {
                transcript: transcript.text,
            });
            match self.pick(&self.config.persona.farewells) {
                Some(farewell) => self.spawn_speak(turn, farewell, AfterSpeaking::Idle),
                None => self.set_state(ConversationState::Idle),
            }
            return;
        }

        let request = {
            let mut session = self.session.lock();
            let request = build_request(
                &self.config.persona,
                &self.config.generator,
                session.history.turns(),
                &transcript.text,
            );
            session.history.push_user(transcript.text.clone());
            request
        };
        self.set_state(ConversationState::Thinking {
            transcript: transcript.text,
        });

        let this = self.clone();
        tokio::spawn(async move {
            match this.generator.generate(request).await {
                Ok(text) => this.post(TurnEvent::ResponseReady { turn, text }),
                Err(error) => this.post(TurnEvent::GenerationFailed { turn, error }),
            }
        });
    }

    fn handle_capture_empty(self: &Arc<Self>, turn: u64) {
        if !self.is_current(turn) || !matches!(self.state(), ConversationState::Listening { .. })
        {
            return;
        }
        debug!("nothing intelligible heard, listening again");
        self.spawn_capture(turn);
    }

    fn handle_capture_timeout(&self, turn: u64) {
        if !self.is_current(turn) || !matches!(self.state(), ConversationState::Listening { .. })
        {
            return;
        }
        info!("silence timeout, session over");
        self.session.lock().active = false;
        self.set_state(ConversationState::Idle);
    }

    fn handle_response(self: &Arc<Self>, turn: u64, text: String) {
        if !self.is_current(turn) || !matches!(self.state(), ConversationState::Thinking { .. }) {
            return;
        }
        counter!("seance_turns_total").increment(1);

        let after = {
            let mut session = self.session.lock();
            session.history.push_assistant(text.clone());
            session.turns_completed += 1;
            if self.config.max_session_turns > 0
                && session.turns_completed >= self.config.max_session_turns
            {
                info!(
                    turns = session.turns_completed,
                    "session turn limit reached, this answer is the last"
                );
                session.active = false;
                AfterSpeaking::Idle
            } else {
                AfterSpeaking::Listen
            }
        };
        self.spawn_speak(turn, text, after);
    }

    fn handle_generation_failure(self: &Arc<Self>, turn: u64, error: GenerationError) {
        if !self.is_current(turn) || !matches!(self.state(), ConversationState::Thinking { .. }) {
            return;
        }
        warn!(%error, "response generation failed");

        if self.config.persona.speak_apology {
            if let Some(apology) = self.pick(&self.config.persona.fallback_phrases) {
                self.spawn_speak(turn, apology, AfterSpeaking::Listen);
                return;
            }
        }
        self.fault(FaultReason::Generation, &error.to_string());
    }

    fn handle_speech_rendered(
        self: &Arc<Self>,
        turn: u64,
        text: String,
        rendered: RenderedSpeech,
        after: AfterSpeaking,
    ) {
        if !self.is_current(turn) {
            // a barge-in or fault got here first; kill the playback this
            // render task started, and only that playback
            self.renderer.cancel_stale(&rendered.clock);
            return;
        }

        let utterance_id = self.next_utterance_id.fetch_add(1, Ordering::Relaxed);
        let transcript = match self.state() {
            ConversationState::Thinking { transcript } => transcript,
            _ => String::new(),
        };
        let utterance = Utterance {
            id: utterance_id,
            transcript,
            response_text: text,
            audio: rendered.track.clone(),
            visemes: rendered.visemes.clone(),
        };
        let duration = utterance.duration();

        let cues = CueTrack::build(
            &rendered.visemes,
            duration,
            &self.frame_index,
            self.config.talk_frame_interval,
        );
        // arm before publishing Speaking so no tick can observe the state
        // without its cues
        self.synchronizer.arm(utterance_id, cues, rendered.clock.clone());
        self.set_state(ConversationState::Speaking {
            utterance_id,
            started_at: Instant::now(),
        });
        self.publish(OrchestratorEvent::UtteranceStarted { utterance });

        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            this.post(TurnEvent::PlaybackFinished { turn, after });
        });

        if self.config.barge_in_enabled {
            let this = self.clone();
            let handle = tokio::spawn(async move {
                if this.capture.wait_for_voice().await.is_ok() && this.is_current(turn) {
                    this.barge_in();
                }
            });
            if let Some(old) = self.monitor_task.lock().replace(handle) {
                old.abort();
            }
        }
    }

    fn handle_playback_finished(self: &Arc<Self>, turn: u64, after: AfterSpeaking) {
        if !self.is_current(turn) {
            return;
        }
        let Some(utterance_id) = self.state().speaking_utterance() else {
            return;
        };

        // disarm strictly before the state change so a racing tick falls
        // back to the idle loop, never a dead cue
        self.stop_monitor();
        self.renderer.cancel();
        self.synchronizer.disarm();
        debug!(utterance_id, "playback finished");
        self.publish(OrchestratorEvent::UtteranceFinished { utterance_id });

        let next_turn = self.advance_turn();
        match after {
            AfterSpeaking::Listen if self.session.lock().active => {
                self.enter_listening(next_turn)
            },
            _ => {
                self.session.lock().active = false;
                self.set_state(ConversationState::Idle);
            },
        }
    }

    fn handle_cooldown_elapsed(&self) {
        if matches!(self.state(), ConversationState::Error { .. }) {
            info!("error cooldown elapsed, recovered to idle");
            self.set_state(ConversationState::Idle);
        }
    }

    // -- helpers -----------------------------------------------------------

    fn enter_listening(self: &Arc<Self>, turn: u64) {
        self.set_state(ConversationState::Listening {
            since: Instant::now(),
        });
        self.spawn_capture(turn);
    }

    fn stop_monitor(&self) {
        if let Some(handle) = self.monitor_task.lock().take() {
            handle.abort();
        }
    }

    fn stop_capture_task(&self) {
        if let Some(handle) = self.capture_task.lock().take() {
            handle.abort();
        }
    }

    fn spawn_capture(self: &Arc<Self>, turn: u64) {
        let this = self.clone();
        let handle = tokio::spawn(async move {
            match this.capture.capture_utterance().await {
                Ok(transcript) if !transcript.is_empty() => {
                    this.post(TurnEvent::TranscriptReady { turn, transcript })
                },
                Ok(_) => this.post(TurnEvent::CaptureEmpty { turn }),
                Err(Error::CaptureTimeout(_)) => this.post(TurnEvent::CaptureTimedOut { turn }),
                Err(err) => this.post(TurnEvent::CaptureFailed {
                    turn,
                    message: err.to_string(),
                }),
            }
        });
        if let Some(old) = self.capture_task.lock().replace(handle) {
            old.abort();
        }
    }

    fn spawn_speak(self: &Arc<Self>, turn: u64, text: String, after: AfterSpeaking) {
        let this = self.clone();
        tokio::spawn(async move {
            match this.renderer.begin_utterance(&text).await {
                Ok(rendered) => this.post(TurnEvent::SpeechRendered {
                    turn,
                    text,
                    rendered,
                    after,
                }),
                Err(err) => this.post(TurnEvent::SynthesisFailed {
                    turn,
                    message: err.to_string(),
                }),
            }
        });
    }

    fn fault(self: &Arc<Self>, reason: FaultReason, message: &str) {
        warn!(%reason, message, "fault, idling until recovery");
        counter!("seance_faults_total", "reason" => reason.to_string()).increment(1);

        self.stop_monitor();
        self.stop_capture_task();
        self.renderer.cancel();
        self.synchronizer.disarm();
        self.advance_turn();
        self.session.lock().active = false;
        // fault first, then the state change, so observers see the cause
        // before its transition
        self.publish(OrchestratorEvent::Fault { reason });
        self.set_state(ConversationState::Error { reason });

        let this = self.clone();
        let cooldown = self.config.error_cooldown;
        tokio::spawn(async move {
            tokio::time::sleep(cooldown).await;
            this.post(TurnEvent::CooldownElapsed);
        });
    }

    fn set_state(&self, next: ConversationState) {
        {
            let mut state = self.state.lock();
            if *state == next {
                return;
            }
            debug!(from = %state, to = %next, "state transition");
            *state = next;
        }
        self.publish_state();
    }

    fn publish_state(&self) {
        self.publish(OrchestratorEvent::StateChanged {
            state: self.state(),
        });
    }

    fn publish(&self, event: OrchestratorEvent) {
        // nobody listening is fine
        let _ = self.observers.send(event);
    }

    fn post(&self, event: TurnEvent) {
        let _ = self.events_tx.send(event);
    }

    fn is_current(&self, turn: u64) -> bool {
        self.current_turn.load(Ordering::Acquire) == turn
    }

    fn advance_turn(&self) -> u64 {
        self.current_turn.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn pick(&self, phrases: &[String]) -> Option<String> {
        phrases.choose(&mut rand::thread_rng()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_settings() {
        let mut settings = Settings::default();
        settings.system.max_session_turns = 5;
        settings.animation.talk_frame_interval_ms = 90;

        let config = OrchestratorConfig::from_settings(&settings);
        assert_eq!(config.max_session_turns, 5);
        assert_eq!(config.talk_frame_interval, Duration::from_millis(90));
        assert_eq!(
            config.error_cooldown,
            Duration::from_millis(seance_config::constants::timing::ERROR_COOLDOWN_MS)
        );
    }

    #[test]
    fn test_event_names() {
        assert_eq!(TurnEvent::Wake.name(), "wake");
        assert_eq!(TurnEvent::CooldownElapsed.name(), "cooldown_elapsed");
    }
}
