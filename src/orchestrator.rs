//! Assistant orchestrator: owns the state store, the skill registry, and the
//! two background loops.
//!
//! # Loops
//!
//! | Loop | Suspends on | On error |
//! |------|-------------|----------|
//! | perception | [`UtteranceSource::listen`], model call, speech | log, back off `perception_backoff_ms` |
//! | telemetry | interval timer, [`MetricsSampler::sample`] | log, back off `telemetry_backoff_secs` |
//!
//! Each loop runs one iteration at a time and exits when the shared
//! [`CancellationToken`] fires. Nothing raised inside an iteration stops
//! the loop.

use crate::config::AssistantConfig;
use crate::error::Result;
use crate::llm::{LanguageModel, OllamaClient, compose_prompt};
use crate::memory::StateStore;
use crate::skills::builtins::{SkillDeps, builtin_source};
use crate::skills::custom::CustomSkillSource;
use crate::skills::{SkillDispatcher, SkillRegistry, SkillSource};
use crate::speech::{ConsoleSpeaker, Intent, SpeechOutput, StdinListener, Utterance, UtteranceSource};
use crate::system_control::{OsSystemActions, SystemActions};
use crate::system_monitor::{MetricsSampler, SysinfoMonitor};
use crate::vision::{CommandCapture, ImageCapture};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Prompt sent during the `--check` smoke test.
pub const CHECK_PROMPT: &str = "Run a quick systems diagnostic summary.";
/// System prompt for the `--check` smoke test.
pub const CHECK_SYSTEM_PROMPT: &str = "You are Jarvis performing a startup check.";
/// Line spoken once the `--check` smoke test succeeds.
pub const CHECK_COMPLETE: &str = "Diagnostics complete. All subsystems nominal.";

/// External collaborators the orchestrator drives.
#[derive(Clone)]
pub struct Collaborators {
    pub listener: Arc<dyn UtteranceSource>,
    pub llm: Arc<dyn LanguageModel>,
    pub speech: Arc<dyn SpeechOutput>,
    pub metrics: Arc<dyn MetricsSampler>,
    pub capture: Arc<dyn ImageCapture>,
    pub system: Arc<dyn SystemActions>,
}

impl Collaborators {
    /// Production collaborators: stdin listener, Ollama, console speech,
    /// `sysinfo` metrics, command-line capture, and OS process control.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &AssistantConfig) -> Result<Self> {
        Ok(Self {
            listener: Arc::new(StdinListener::stdin(&config.wake)),
            llm: Arc::new(OllamaClient::new(&config.llm)?),
            speech: Arc::new(ConsoleSpeaker::new(config.persona.name.clone())),
            metrics: Arc::new(SysinfoMonitor::new()),
            capture: Arc::new(CommandCapture::new(&config.vision)),
            system: Arc::new(OsSystemActions),
        })
    }
}

enum Lifecycle {
    Idle,
    Running {
        cancel: CancellationToken,
        loops: Vec<JoinHandle<()>>,
    },
    Stopped,
}

struct Core {
    config: AssistantConfig,
    collaborators: Collaborators,
    store: Arc<StateStore>,
    registry: Arc<SkillRegistry>,
    dispatcher: SkillDispatcher,
    hydrated: AtomicBool,
}

/// The running assistant.
pub struct Assistant {
    core: Arc<Core>,
    lifecycle: Mutex<Lifecycle>,
}

impl Assistant {
    /// Wire the store, registry, and dispatcher. Nothing runs until
    /// [`Assistant::start`].
    #[must_use]
    pub fn new(config: AssistantConfig, collaborators: Collaborators) -> Self {
        let store = Arc::new(StateStore::new(&config.memory.state_file));
        let deps = SkillDeps {
            metrics: Arc::clone(&collaborators.metrics),
            system: Arc::clone(&collaborators.system),
            capture: Arc::clone(&collaborators.capture),
            system_config: config.system.clone(),
        };
        let registry = SkillRegistry::new(
            vec![
                Arc::new(builtin_source(deps)) as Arc<dyn SkillSource>,
                Arc::new(CustomSkillSource::new(&config.skills.custom_dir)),
            ],
            &config.skills.custom_dir,
        );
        let dispatcher = SkillDispatcher::new(Arc::clone(&registry), Arc::clone(&store));

        Self {
            core: Arc::new(Core {
                config,
                collaborators,
                store,
                registry,
                dispatcher,
                hydrated: AtomicBool::new(false),
            }),
            lifecycle: Mutex::new(Lifecycle::Idle),
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<StateStore> {
        &self.core.store
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<SkillRegistry> {
        &self.core.registry
    }

    pub async fn is_running(&self) -> bool {
        matches!(*self.lifecycle.lock().await, Lifecycle::Running { .. })
    }

    /// Hydrate state, load skills, and launch both loops. No-op if running.
    ///
    /// # Errors
    ///
    /// Returns an error if the state store or skill registry cannot load.
    pub async fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        if matches!(*lifecycle, Lifecycle::Running { .. }) {
            debug!("assistant already running");
            return Ok(());
        }

        info!("starting assistant");
        self.core.hydrate().await?;

        let cancel = CancellationToken::new();
        let loops = vec![
            tokio::spawn(perception_loop(Arc::clone(&self.core), cancel.clone())),
            tokio::spawn(telemetry_loop(Arc::clone(&self.core), cancel.clone())),
        ];
        *lifecycle = Lifecycle::Running { cancel, loops };
        Ok(())
    }

    /// Stop both loops, release collaborators, and flush state.
    ///
    /// Idempotent: only the first call after a start does any work.
    pub async fn shutdown(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            Lifecycle::Stopped => {
                debug!("assistant already stopped");
                return;
            }
            Lifecycle::Idle => {}
            Lifecycle::Running { cancel, loops } => {
                info!("shutting down assistant");
                cancel.cancel();
                for handle in loops {
                    if let Err(e) = handle.await {
                        warn!(error = %e, "background loop ended abnormally");
                    }
                }
            }
        }

        self.core.collaborators.speech.shutdown().await;
        self.core.collaborators.llm.shutdown().await;
        if self.core.hydrated.load(Ordering::SeqCst)
            && let Err(e) = self.core.store.flush().await
        {
            error!(error = %e, "final state flush failed");
        }
        info!("assistant stopped");
    }

    /// Treat the next heard input as addressed. Fire-and-forget.
    pub fn force_wake(&self) {
        self.core.collaborators.listener.force_wake();
    }

    /// Take a metrics sample in the background. Fire-and-forget.
    pub fn sample_metrics(&self) {
        let metrics = Arc::clone(&self.core.collaborators.metrics);
        tokio::spawn(async move {
            match metrics.sample().await {
                Ok(snapshot) => debug!(
                    cpu = snapshot.cpu_percent,
                    ram = snapshot.ram_percent,
                    "on-demand metrics sample"
                ),
                Err(e) => warn!(error = %e, "on-demand metrics sample failed"),
            }
        });
    }

    /// Non-interactive smoke test: load state and skills, make one model
    /// round trip, and speak a confirmation.
    ///
    /// # Errors
    ///
    /// Returns the first failure of any step.
    pub async fn run_check(&self) -> Result<()> {
        self.core.hydrate().await?;
        let summary = self
            .core
            .collaborators
            .llm
            .generate(CHECK_PROMPT, Some(CHECK_SYSTEM_PROMPT))
            .await?;
        debug!(summary, "diagnostic summary received");
        self.core.collaborators.speech.speak(CHECK_COMPLETE).await
    }

    /// Handle one utterance as the perception loop would, returning the
    /// spoken response.
    ///
    /// # Errors
    ///
    /// Returns an error if the model call, history append, or speech fails.
    pub async fn respond(&self, utterance: &Utterance) -> Result<String> {
        self.core.respond(utterance).await
    }

    /// System prompt for the conversational path.
    pub async fn system_prompt(&self) -> String {
        self.core.system_prompt().await
    }
}

impl Core {
    async fn hydrate(&self) -> Result<()> {
        self.store.load().await?;
        self.hydrated.store(true, Ordering::SeqCst);
        let count = self.registry.load_all().await?;
        info!(skills = count, "assistant hydrated");
        Ok(())
    }

    fn route(&self, utterance: &Utterance) -> Intent {
        match utterance.intent {
            Intent::Command => Intent::Command,
            Intent::Conversation if self.registry.find_word(&utterance.text).is_some() => {
                Intent::Command
            }
            Intent::Conversation => Intent::Conversation,
        }
    }

    async fn perceive_once(&self) -> Result<()> {
        if let Some(utterance) = self.collaborators.listener.listen().await? {
            self.respond(&utterance).await?;
        }
        Ok(())
    }

    async fn respond(&self, utterance: &Utterance) -> Result<String> {
        let text = utterance.text.trim();
        if text.is_empty() {
            return Ok(String::new());
        }

        let response = if let Some(action) = self.store.custom_command(text).await {
            debug!(text, action = %action, "expanding custom command");
            self.dispatcher.execute(&action).await
        } else {
            self.route_and_answer(utterance, text).await?
        };

        if !response.is_empty() {
            self.collaborators.speech.speak(&response).await?;
        }
        Ok(response)
    }

    async fn route_and_answer(&self, utterance: &Utterance, text: &str) -> Result<String> {
        Ok(match self.route(utterance) {
            Intent::Command => {
                debug!(text, "handling command");
                self.dispatcher.execute(text).await
            }
            Intent::Conversation => {
                debug!(text, "handling conversation");
                let system = self.system_prompt().await;
                let history = self
                    .store
                    .recent_conversation(self.config.llm.context_turns)
                    .await;
                let prompt = compose_prompt(&history, text, &self.config.persona.name);
                let reply = self
                    .collaborators
                    .llm
                    .generate(&prompt, Some(&system))
                    .await?;
                self.store.append_conversation(text, &reply).await?;
                reply
            }
        })
    }

    async fn system_prompt(&self) -> String {
        let profile = self.store.user_profile().await;
        let mut prompt = self.config.persona.prompt.clone();
        if let Some(name) = &profile.name {
            prompt.push_str(&format!(" The user's name is {name}."));
        }
        if !profile.preferences.is_empty() {
            let summary = profile
                .preferences
                .iter()
                .map(|(key, value)| format!("{key}: {value}"))
                .collect::<Vec<_>>()
                .join("; ");
            prompt.push_str(&format!(" User preferences: {summary}"));
        }
        prompt
    }
}

async fn perception_loop(core: Arc<Core>, cancel: CancellationToken) {
    let backoff = Duration::from_millis(core.config.loops.perception_backoff_ms);
    info!("perception loop started");
    loop {
        let result = tokio::select! {
            () = cancel.cancelled() => break,
            result = core.perceive_once() => result,
        };
        if let Err(e) = result {
            error!(error = %e, "perception iteration failed");
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(backoff) => {}
            }
        }
    }
    info!("perception loop stopped");
}

async fn telemetry_loop(core: Arc<Core>, cancel: CancellationToken) {
    let interval = Duration::from_secs(core.config.loops.telemetry_interval_secs);
    let backoff = Duration::from_secs(core.config.loops.telemetry_backoff_secs);
    info!("telemetry loop started");
    loop {
        let pause = tokio::select! {
            () = cancel.cancelled() => break,
            sampled = core.collaborators.metrics.sample() => match sampled {
                Ok(snapshot) => {
                    debug!(cpu = snapshot.cpu_percent, ram = snapshot.ram_percent, "metrics sampled");
                    interval
                }
                Err(e) => {
                    error!(error = %e, "metrics sample failed");
                    backoff
                }
            },
        };
        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(pause) => {}
        }
    }
    info!("telemetry loop stopped");
}
