//! Spoken feedback for proximity warnings.
//!
//! A [`FeedbackDispatcher`] owns a bounded channel and a single worker
//! thread. Callers hand it warning messages without blocking; when the
//! channel is full the message is dropped. The worker drains the channel
//! down to the most recent message before speaking, so a slow speech
//! engine always voices the latest state of the scene rather than a
//! backlog of stale warnings.

use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Something that can voice a warning message.
pub trait SpeechEngine: Send {
    fn name(&self) -> &'static str;

    /// Voice the message. Blocking; only the dispatcher worker calls this.
    fn speak(&self, message: &str) -> Result<()>;
}

/// Speech engine that shells out to a text-to-speech command.
pub struct CommandSpeech {
    program: String,
}

impl CommandSpeech {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for CommandSpeech {
    fn default() -> Self {
        Self::new("espeak")
    }
}

impl SpeechEngine for CommandSpeech {
    fn name(&self) -> &'static str {
        "command"
    }

    fn speak(&self, message: &str) -> Result<()> {
        let status = Command::new(&self.program)
            .arg(message)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("failed to run speech command '{}'", self.program))?;
        if !status.success() {
            return Err(anyhow!(
                "speech command '{}' exited with {}",
                self.program,
                status
            ));
        }
        Ok(())
    }
}

/// Speech engine that discards everything. Used when feedback is disabled.
pub struct NullSpeech;

impl SpeechEngine for NullSpeech {
    fn name(&self) -> &'static str {
        "null"
    }

    fn speak(&self, _message: &str) -> Result<()> {
        Ok(())
    }
}

/// Speech engine that records messages for inspection in tests.
#[derive(Clone, Default)]
pub struct RecordingSpeech {
    spoken: Arc<Mutex<Vec<String>>>,
}

impl RecordingSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().expect("speech log lock poisoned").clone()
    }
}

impl SpeechEngine for RecordingSpeech {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn speak(&self, message: &str) -> Result<()> {
        self.spoken
            .lock()
            .expect("speech log lock poisoned")
            .push(message.to_string());
        Ok(())
    }
}

/// Bounded, latest-wins feedback queue with a single speaking worker.
pub struct FeedbackDispatcher {
    sender: Option<Sender<String>>,
    worker: Option<JoinHandle<()>>,
}

impl FeedbackDispatcher {
    /// Start the worker thread. `capacity` bounds the number of queued
    /// messages; it must be at least 1.
    pub fn start(engine: Box<dyn SpeechEngine>, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(anyhow!("feedback queue capacity must be at least 1"));
        }
        let (sender, receiver) = bounded::<String>(capacity);
        let worker = thread::Builder::new()
            .name("feedback".to_string())
            .spawn(move || worker_loop(engine, receiver))
            .context("failed to spawn feedback worker thread")?;
        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    /// Queue a message without blocking. When the queue is full the
    /// message is dropped; the worker will speak a fresher one anyway.
    pub fn dispatch(&self, message: &str) {
        let Some(sender) = self.sender.as_ref() else {
            return;
        };
        match sender.try_send(message.to_string()) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                log::debug!("feedback queue full, dropping: {}", dropped);
            }
            Err(TrySendError::Disconnected(_)) => {
                log::warn!("feedback worker gone, dropping message");
            }
        }
    }

    /// Stop accepting messages and wait for the worker to finish any
    /// in-flight speech.
    pub fn shutdown(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("feedback worker panicked");
            }
        }
    }
}

impl Drop for FeedbackDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(engine: Box<dyn SpeechEngine>, receiver: Receiver<String>) {
    log::debug!("feedback worker started (engine: {})", engine.name());
    while let Ok(message) = receiver.recv() {
        let (message, skipped) = drain_to_latest(&receiver, message);
        if skipped > 0 {
            log::debug!("skipped {} stale feedback messages", skipped);
        }
        if let Err(e) = engine.speak(&message) {
            log::warn!("speech failed: {:#}", e);
        }
    }
    log::debug!("feedback worker stopped");
}

/// Collapse queued messages down to the newest one, returning it along
/// with the number of stale messages discarded.
fn drain_to_latest(receiver: &Receiver<String>, mut latest: String) -> (String, usize) {
    let mut skipped = 0;
    while let Ok(newer) = receiver.try_recv() {
        latest = newer;
        skipped += 1;
    }
    (latest, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_to_latest_keeps_only_the_newest_message() {
        let (sender, receiver) = bounded::<String>(8);
        sender.send("first".to_string()).unwrap();
        sender.send("second".to_string()).unwrap();
        sender.send("third".to_string()).unwrap();

        let head = receiver.recv().unwrap();
        let (latest, skipped) = drain_to_latest(&receiver, head);
        assert_eq!(latest, "third");
        assert_eq!(skipped, 2);
    }

    #[test]
    fn drain_to_latest_passes_a_lone_message_through() {
        let (_sender, receiver) = bounded::<String>(8);
        let (latest, skipped) = drain_to_latest(&receiver, "only".to_string());
        assert_eq!(latest, "only");
        assert_eq!(skipped, 0);
    }

    #[test]
    fn dispatcher_speaks_queued_messages() {
        let engine = RecordingSpeech::new();
        let mut dispatcher = FeedbackDispatcher::start(Box::new(engine.clone()), 4).unwrap();
        dispatcher.dispatch("person very close, 0.80 meters");
        dispatcher.shutdown();

        assert_eq!(engine.spoken(), vec!["person very close, 0.80 meters"]);
    }

    #[test]
    fn dispatcher_never_blocks_when_full() {
        // A full queue must drop instead of stalling the caller.
        let (sender, _receiver) = bounded::<String>(1);
        sender.try_send("held".to_string()).unwrap();
        assert!(matches!(
            sender.try_send("overflow".to_string()),
            Err(TrySendError::Full(_))
        ));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(FeedbackDispatcher::start(Box::new(NullSpeech), 0).is_err());
    }
}
