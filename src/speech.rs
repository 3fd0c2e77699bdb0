//! Speech collaborators: utterance sources, transcription, and spoken output.
//!
//! The perception loop consumes [`Utterance`]s from an [`UtteranceSource`]
//! and answers through a [`SpeechOutput`]. Two sources are provided: a
//! line-oriented text listener (stdin by default) and a listener that feeds
//! captured audio segments through a [`Transcriber`].

use crate::config::WakeConfig;
use crate::error::{AssistantError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

/// How an utterance should be routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Imperative; routed to the skill dispatcher.
    Command,
    /// Free-form; routed to the language model.
    Conversation,
}

/// A classified, addressed utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub confidence: f32,
    pub intent: Intent,
}

impl Utterance {
    /// Build an utterance, classifying its intent from the text.
    #[must_use]
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        let text = text.into();
        let intent = classify_intent(&text);
        Self {
            text,
            confidence,
            intent,
        }
    }
}

/// Result of transcribing one audio segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcription {
    /// Empty when no speech was detected.
    pub text: String,
    pub confidence: f32,
}

/// Speech-to-text engine.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, samples: &[f32]) -> Result<Transcription>;
}

/// Text-to-speech output.
#[async_trait]
pub trait SpeechOutput: Send + Sync {
    /// Speak `text`, returning once it has been delivered.
    async fn speak(&self, text: &str) -> Result<()>;

    /// Release the output device. Idempotent.
    async fn shutdown(&self);
}

/// Producer of addressed utterances.
#[async_trait]
pub trait UtteranceSource: Send + Sync {
    /// Wait for the next utterance. `Ok(None)` means nothing usable was heard.
    async fn listen(&self) -> Result<Option<Utterance>>;

    /// Treat the next input as addressed, bypassing the wake phrase.
    fn force_wake(&self);
}

const COMMAND_PREFIXES: &[&str] = &[
    "open ",
    "launch ",
    "start ",
    "close ",
    "shutdown",
    "restart",
    "monitor",
    "what's my cpu",
    "show me",
    "run ",
    "set ",
    "remember ",
];

/// Classify by leading keyword.
#[must_use]
pub fn classify_intent(text: &str) -> Intent {
    let lowered = text.trim_start().to_lowercase();
    if COMMAND_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
        Intent::Command
    } else {
        Intent::Conversation
    }
}

/// Gate that only admits input addressed to the assistant.
///
/// When enabled, a line containing the wake phrase is admitted with the
/// phrase and anything before it stripped. A bare wake phrase arms the gate
/// so that the following input is admitted.
#[derive(Debug)]
pub struct WakeGate {
    enabled: bool,
    phrase: String,
    armed: AtomicBool,
}

impl WakeGate {
    #[must_use]
    pub fn new(config: &WakeConfig) -> Self {
        Self {
            enabled: config.enabled,
            phrase: normalise(&config.phrase).to_ascii_lowercase(),
            armed: AtomicBool::new(false),
        }
    }

    /// A gate that admits everything.
    #[must_use]
    pub fn open() -> Self {
        Self::new(&WakeConfig {
            enabled: false,
            ..WakeConfig::default()
        })
    }

    pub fn force_wake(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Returns the addressed portion of `text`, or `None` if not addressed.
    pub fn admit(&self, text: &str) -> Option<String> {
        let text = normalise(text);
        if text.is_empty() {
            return None;
        }
        if !self.enabled || self.armed.swap(false, Ordering::SeqCst) {
            return Some(text);
        }

        let end = find_phrase(&text, &self.phrase)?;
        let rest = text[end..]
            .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, ',' | '.' | '!' | '?'))
            .to_owned();
        if rest.is_empty() {
            debug!("wake phrase heard");
            self.armed.store(true, Ordering::SeqCst);
            None
        } else {
            Some(rest)
        }
    }
}

fn normalise(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Byte offset just past the first word-bounded match of `phrase`.
fn find_phrase(text: &str, phrase: &str) -> Option<usize> {
    if phrase.is_empty() {
        return None;
    }
    let lowered = text.to_ascii_lowercase();
    let is_word = |c: Option<char>| c.is_some_and(char::is_alphanumeric);
    lowered.match_indices(phrase).find_map(|(start, m)| {
        let end = start + m.len();
        let before = lowered[..start].chars().next_back();
        let after = lowered[end..].chars().next();
        (!is_word(before) && !is_word(after)).then_some(end)
    })
}

/// Utterance source reading one utterance per line.
pub struct LineListener<R> {
    lines: Mutex<Lines<R>>,
    gate: WakeGate,
    closed: AtomicBool,
}

/// Line listener over the process's standard input.
pub type StdinListener = LineListener<BufReader<tokio::io::Stdin>>;

impl StdinListener {
    #[must_use]
    pub fn stdin(wake: &WakeConfig) -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), WakeGate::new(wake))
    }
}

impl<R: AsyncBufRead + Unpin + Send> LineListener<R> {
    #[must_use]
    pub fn new(reader: R, gate: WakeGate) -> Self {
        Self {
            lines: Mutex::new(reader.lines()),
            gate,
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> UtteranceSource for LineListener<R> {
    async fn listen(&self) -> Result<Option<Utterance>> {
        let line = self.lines.lock().await.next_line().await?;
        let Some(line) = line else {
            if !self.closed.swap(true, Ordering::SeqCst) {
                info!("input stream closed, waiting for shutdown");
            }
            return std::future::pending().await;
        };
        Ok(self.gate.admit(&line).map(|text| Utterance::new(text, 1.0)))
    }

    fn force_wake(&self) {
        self.gate.force_wake();
    }
}

/// Minimum RMS energy for a segment to be worth transcribing.
pub const SPEECH_ENERGY_THRESHOLD: f32 = 0.01;

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

/// Utterance source fed by captured audio segments.
pub struct TranscribingListener {
    segments: Mutex<mpsc::Receiver<Vec<f32>>>,
    transcriber: Arc<dyn Transcriber>,
    gate: WakeGate,
}

impl TranscribingListener {
    #[must_use]
    pub fn new(
        segments: mpsc::Receiver<Vec<f32>>,
        transcriber: Arc<dyn Transcriber>,
        gate: WakeGate,
    ) -> Self {
        Self {
            segments: Mutex::new(segments),
            transcriber,
            gate,
        }
    }
}

#[async_trait]
impl UtteranceSource for TranscribingListener {
    async fn listen(&self) -> Result<Option<Utterance>> {
        let segment = self.segments.lock().await.recv().await;
        let Some(samples) = segment else {
            warn!("audio segment channel closed");
            return std::future::pending().await;
        };

        if rms(&samples) < SPEECH_ENERGY_THRESHOLD {
            return Ok(None);
        }

        let transcription = self.transcriber.transcribe(&samples).await?;
        let text = transcription.text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        debug!(text, confidence = transcription.confidence, "transcribed");
        Ok(self
            .gate
            .admit(text)
            .map(|addressed| Utterance::new(addressed, transcription.confidence)))
    }

    fn force_wake(&self) {
        self.gate.force_wake();
    }
}

/// Speech output that prints each line to stdout.
pub struct ConsoleSpeaker {
    name: String,
    voice: Mutex<()>,
    closed: AtomicBool,
}

impl ConsoleSpeaker {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            voice: Mutex::new(()),
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl SpeechOutput for ConsoleSpeaker {
    async fn speak(&self, text: &str) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AssistantError::Speech("speech output is shut down".to_owned()));
        }
        let _voice = self.voice.lock().await;
        info!(text, "speaking response");
        println!("{}: {text}", self.name);
        Ok(())
    }

    async fn shutdown(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("speech output shut down");
        }
    }
}
