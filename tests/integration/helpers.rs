//! Shared fakes and harness for integration tests.

use async_trait::async_trait;
use jarvis::error::Result;
use jarvis::llm::LanguageModel;
use jarvis::speech::{SpeechOutput, Utterance, UtteranceSource};
use jarvis::system_control::{PowerAction, SystemActions};
use jarvis::system_monitor::{MetricsSampler, MetricsSnapshot};
use jarvis::vision::NoCapture;
use jarvis::{Assistant, AssistantConfig, Collaborators};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Utterance source driven by the test.
pub(crate) struct ChannelListener {
    tx: mpsc::UnboundedSender<Utterance>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Utterance>>,
}

impl ChannelListener {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: tokio::sync::Mutex::new(rx),
        }
    }

    pub(crate) fn say(&self, text: &str) {
        self.tx.send(Utterance::new(text, 1.0)).unwrap();
    }
}

#[async_trait]
impl UtteranceSource for ChannelListener {
    async fn listen(&self) -> Result<Option<Utterance>> {
        Ok(self.rx.lock().await.recv().await)
    }

    fn force_wake(&self) {}
}

/// Model that echoes the latest user line, or the whole prompt if none.
pub(crate) struct EchoModel {
    pub(crate) calls: AtomicUsize,
}

#[async_trait]
impl LanguageModel for EchoModel {
    async fn generate(&self, prompt: &str, _system_prompt: Option<&str>) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let latest = prompt
            .lines()
            .filter_map(|line| line.strip_prefix("User: "))
            .next_back()
            .unwrap_or(prompt);
        Ok(format!("You said: {latest}"))
    }
}

#[derive(Default)]
pub(crate) struct TranscriptSpeaker {
    lines: Mutex<Vec<String>>,
}

impl TranscriptSpeaker {
    pub(crate) fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechOutput for TranscriptSpeaker {
    async fn speak(&self, text: &str) -> Result<()> {
        self.lines.lock().unwrap().push(text.to_owned());
        Ok(())
    }

    async fn shutdown(&self) {}
}

#[derive(Default)]
pub(crate) struct PowerLog {
    actions: Mutex<Vec<String>>,
}

impl PowerLog {
    pub(crate) fn actions(&self) -> Vec<String> {
        self.actions.lock().unwrap().clone()
    }
}

#[async_trait]
impl SystemActions for PowerLog {
    async fn power(&self, action: PowerAction) -> Result<()> {
        self.actions.lock().unwrap().push(action.as_str().to_owned());
        Ok(())
    }

    async fn launch(&self, program: &Path) -> Result<()> {
        self.actions
            .lock()
            .unwrap()
            .push(format!("launch {}", program.display()));
        Ok(())
    }

    async fn close(&self, process_name: &str) -> Result<()> {
        self.actions
            .lock()
            .unwrap()
            .push(format!("close {process_name}"));
        Ok(())
    }

    async fn open_folder(&self, dir: &Path) -> Result<()> {
        self.actions
            .lock()
            .unwrap()
            .push(format!("open {}", dir.display()));
        Ok(())
    }
}

pub(crate) struct SteadyMetrics;

#[async_trait]
impl MetricsSampler for SteadyMetrics {
    async fn sample(&self) -> Result<MetricsSnapshot> {
        Ok(MetricsSnapshot {
            cpu_percent: 5.0,
            ram_percent: 40.0,
            battery_percent: None,
            sampled_at: chrono::Utc::now(),
        })
    }

    async fn latest(&self) -> Option<MetricsSnapshot> {
        None
    }
}

/// An assistant wired to fakes, rooted in a temp directory.
pub(crate) struct TestAssistant {
    pub(crate) dir: tempfile::TempDir,
    pub(crate) assistant: Assistant,
    pub(crate) listener: Arc<ChannelListener>,
    pub(crate) llm: Arc<EchoModel>,
    pub(crate) speech: Arc<TranscriptSpeaker>,
    pub(crate) power: Arc<PowerLog>,
}

pub(crate) fn test_config(root: &Path) -> AssistantConfig {
    let mut config = AssistantConfig::default();
    config.memory.state_file = root.join("memory.json");
    config.skills.custom_dir = root.join("skills");
    config.vision.capture_dir = root.join("captures");
    config.loops.perception_backoff_ms = 10;
    config.loops.telemetry_interval_secs = 3_600;
    config.logging.directory = None;
    config
}

pub(crate) fn test_assistant() -> TestAssistant {
    let dir = tempfile::tempdir().expect("create temp dir");
    test_assistant_in(dir)
}

pub(crate) fn test_assistant_in(dir: tempfile::TempDir) -> TestAssistant {
    let listener = Arc::new(ChannelListener::new());
    let llm = Arc::new(EchoModel {
        calls: AtomicUsize::new(0),
    });
    let speech = Arc::new(TranscriptSpeaker::default());
    let power = Arc::new(PowerLog::default());
    let collaborators = Collaborators {
        listener: Arc::clone(&listener) as Arc<dyn UtteranceSource>,
        llm: Arc::clone(&llm) as Arc<dyn LanguageModel>,
        speech: Arc::clone(&speech) as Arc<dyn SpeechOutput>,
        metrics: Arc::new(SteadyMetrics),
        capture: Arc::new(NoCapture),
        system: Arc::clone(&power) as Arc<dyn SystemActions>,
    };
    let assistant = Assistant::new(test_config(dir.path()), collaborators);
    TestAssistant {
        dir,
        assistant,
        listener,
        llm,
        speech,
        power,
    }
}

impl TestAssistant {
    /// Feed `text` through the perception path and return the response.
    pub(crate) async fn turn(&self, text: &str) -> String {
        self.assistant
            .respond(&Utterance::new(text, 1.0))
            .await
            .expect("turn should succeed")
    }

    /// Wait until `n` lines have been spoken.
    pub(crate) async fn wait_for_lines(&self, n: usize) -> Vec<String> {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let lines = self.speech.lines();
                if lines.len() >= n {
                    return lines;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("speech within timeout")
    }
}
