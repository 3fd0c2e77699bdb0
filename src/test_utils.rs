//! Shared fakes for unit tests across the skill and orchestrator modules.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::config::SystemControlConfig;
use crate::error::{AssistantError, Result};
use crate::llm::LanguageModel;
use crate::memory::StateStore;
use crate::skills::builtins::SkillDeps;
use crate::speech::{SpeechOutput, Utterance, UtteranceSource};
use crate::system_control::{PowerAction, SystemActions};
use crate::system_monitor::{MetricsSampler, MetricsSnapshot};
use crate::vision::ImageCapture;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// A state store hydrated from a fresh file inside `dir`.
pub async fn loaded_store(dir: &tempfile::TempDir) -> StateStore {
    let store = StateStore::new(dir.path().join("memory.json"));
    store.load().await.expect("load state store");
    store
}

/// Records every system call instead of performing it.
#[derive(Default)]
pub struct RecordingSystem {
    pub calls: Mutex<Vec<String>>,
}

impl RecordingSystem {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl SystemActions for RecordingSystem {
    async fn power(&self, action: PowerAction) -> Result<()> {
        self.record(format!("power:{}", action.as_str()));
        Ok(())
    }

    async fn launch(&self, program: &Path) -> Result<()> {
        self.record(format!("launch:{}", program.display()));
        Ok(())
    }

    async fn close(&self, process_name: &str) -> Result<()> {
        self.record(format!("close:{process_name}"));
        Ok(())
    }

    async fn open_folder(&self, dir: &Path) -> Result<()> {
        self.record(format!("open:{}", dir.display()));
        Ok(())
    }
}

/// Metrics sampler returning a fixed reading.
pub struct FixedMetrics {
    pub snapshot: MetricsSnapshot,
    pub cached: bool,
}

#[async_trait]
impl MetricsSampler for FixedMetrics {
    async fn sample(&self) -> Result<MetricsSnapshot> {
        Ok(self.snapshot.clone())
    }

    async fn latest(&self) -> Option<MetricsSnapshot> {
        self.cached.then(|| self.snapshot.clone())
    }
}

/// Capture backend returning preset paths.
#[derive(Default)]
pub struct FakeCapture {
    pub screen: Option<PathBuf>,
    pub webcam: Option<PathBuf>,
}

#[async_trait]
impl ImageCapture for FakeCapture {
    async fn capture_screen(&self) -> Result<PathBuf> {
        self.screen
            .clone()
            .ok_or_else(|| AssistantError::Vision("no screen".to_owned()))
    }

    async fn capture_webcam(&self) -> Result<Option<PathBuf>> {
        Ok(self.webcam.clone())
    }
}

/// Skill dependencies wired to fakes, with handles kept for assertions.
pub struct FakeDeps {
    pub deps: SkillDeps,
    pub system: Arc<RecordingSystem>,
}

pub fn fake_deps() -> FakeDeps {
    let system = Arc::new(RecordingSystem::default());
    let deps = SkillDeps {
        metrics: Arc::new(FixedMetrics {
            snapshot: MetricsSnapshot {
                cpu_percent: 10.0,
                ram_percent: 20.0,
                battery_percent: None,
                sampled_at: chrono::Utc::now(),
            },
            cached: true,
        }),
        system: Arc::clone(&system) as Arc<dyn SystemActions>,
        capture: Arc::new(FakeCapture::default()),
        system_config: SystemControlConfig {
            applications: BTreeMap::new(),
            folders: BTreeMap::new(),
        },
    };
    FakeDeps { deps, system }
}

/// Utterance source fed from a channel; pends once the script runs dry.
pub struct ScriptedListener {
    tx: mpsc::UnboundedSender<Utterance>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Utterance>>,
    pub woken: AtomicBool,
}

impl Default for ScriptedListener {
    fn default() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: tokio::sync::Mutex::new(rx),
            woken: AtomicBool::new(false),
        }
    }
}

impl ScriptedListener {
    pub fn push(&self, utterance: Utterance) {
        self.tx.send(utterance).unwrap();
    }
}

#[async_trait]
impl UtteranceSource for ScriptedListener {
    async fn listen(&self) -> Result<Option<Utterance>> {
        // The sender lives in `self`, so `recv` never returns `None`.
        Ok(self.rx.lock().await.recv().await)
    }

    fn force_wake(&self) {
        self.woken.store(true, Ordering::SeqCst);
    }
}

/// Language model with a canned reply that records every call.
pub struct ScriptedModel {
    reply: String,
    fail_next: AtomicBool,
    prompts: Mutex<Vec<(String, Option<String>)>>,
    shutdowns: AtomicUsize,
}

impl ScriptedModel {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_owned(),
            fail_next: AtomicBool::new(false),
            prompts: Mutex::new(Vec::new()),
            shutdowns: AtomicUsize::new(0),
        }
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn prompts(&self) -> Vec<(String, Option<String>)> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String> {
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.to_owned(), system_prompt.map(str::to_owned)));
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(AssistantError::Llm("scripted failure".to_owned()));
        }
        Ok(self.reply.clone())
    }

    async fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

/// Speech output that keeps what it was asked to say.
#[derive(Default)]
pub struct RecordingSpeaker {
    spoken: Mutex<Vec<String>>,
    shutdowns: AtomicUsize,
}

impl RecordingSpeaker {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechOutput for RecordingSpeaker {
    async fn speak(&self, text: &str) -> Result<()> {
        self.spoken.lock().unwrap().push(text.to_owned());
        Ok(())
    }

    async fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

/// Metrics sampler that counts how often it is polled.
#[derive(Default)]
pub struct CountingMetrics {
    samples: AtomicUsize,
    failures: AtomicUsize,
    fail_next: AtomicBool,
}

impl CountingMetrics {
    pub fn samples(&self) -> usize {
        self.samples.load(Ordering::SeqCst)
    }

    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl MetricsSampler for CountingMetrics {
    async fn sample(&self) -> Result<MetricsSnapshot> {
        self.samples.fetch_add(1, Ordering::SeqCst);
        if self.fail_next.swap(false, Ordering::SeqCst) {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(AssistantError::Metrics("scripted failure".to_owned()));
        }
        Ok(MetricsSnapshot {
            cpu_percent: 12.0,
            ram_percent: 34.0,
            battery_percent: None,
            sampled_at: chrono::Utc::now(),
        })
    }

    async fn latest(&self) -> Option<MetricsSnapshot> {
        None
    }
}
