//! Replay channel worker
//!
//! Plays a recorded telemetry stream (one JSON batch per line) into the dashboard
//! from a background thread. The mpsc channel is the only hand-off point between
//! that thread and the UI loop; outbound commands are collected for the report.

use dashboard_core::{ChannelHandle, DashboardError, Result};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Prefix the controller puts in front of JSON lines on its serial link
const JSON_PREFIX: &str = "json:";

/// Where the replayed stream comes from
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Stdin,
    File(PathBuf),
}

/// Event delivered from the worker thread to the UI loop
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    Message(String),
    Closed,
}

pub struct ReplayWorker {
    source: Source,
    interval: Duration,
    sender: Sender<WorkerEvent>,
    stop_flag: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    sent: Vec<String>,
}

impl ReplayWorker {
    /// Create the worker and the receiving end for the UI loop
    pub fn new(source: Source, interval: Duration) -> (Self, Receiver<WorkerEvent>) {
        let (sender, receiver) = mpsc::channel();
        let worker = Self {
            source,
            interval,
            sender,
            stop_flag: Arc::new(AtomicBool::new(false)),
            thread: None,
            sent: Vec::new(),
        };
        (worker, receiver)
    }

    /// Commands posted so far, in order
    pub fn sent(&self) -> &[String] {
        &self.sent
    }

    fn open(source: &Source) -> io::Result<Box<dyn BufRead + Send>> {
        match source {
            Source::Stdin => Ok(Box::new(BufReader::new(io::stdin()))),
            Source::File(path) => Ok(Box::new(BufReader::new(File::open(path)?))),
        }
    }
}

/// Reduce a raw stream line to the JSON text of a batch, `None` for lines to skip
pub fn batch_text(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix(JSON_PREFIX).unwrap_or(line).trim();
    if line.is_empty() {
        None
    } else {
        Some(line)
    }
}

fn replay(reader: Box<dyn BufRead + Send>, sender: &Sender<WorkerEvent>, stop: &AtomicBool, interval: Duration) {
    for (line_no, line) in reader.lines().enumerate() {
        if stop.load(Ordering::SeqCst) {
            log::debug!("Replay stopped at line {}", line_no + 1);
            return;
        }
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::error!("Failed to read telemetry stream at line {}: {}", line_no + 1, e);
                return;
            }
        };
        let Some(text) = batch_text(&line) else {
            continue;
        };
        if sender.send(WorkerEvent::Message(text.to_string())).is_err() {
            return;
        }
        if !interval.is_zero() {
            thread::sleep(interval);
        }
    }
}

impl ChannelHandle for ReplayWorker {
    fn start(&mut self) -> Result<()> {
        if self.thread.is_some() {
            return Ok(());
        }
        let reader = Self::open(&self.source)?;
        log::info!("Starting replay from {:?}", self.source);

        self.stop_flag.store(false, Ordering::SeqCst);
        let sender = self.sender.clone();
        let stop = Arc::clone(&self.stop_flag);
        let interval = self.interval;

        let handle = thread::Builder::new()
            .name("replay-worker".to_string())
            .spawn(move || {
                replay(reader, &sender, &stop, interval);
                // The receiver may already be gone during shutdown
                let _ = sender.send(WorkerEvent::Closed);
            })?;
        self.thread = Some(handle);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            // A thread blocked on stdin is left to exit with the process
            if handle.is_finished() && handle.join().is_err() {
                log::warn!("Replay worker panicked");
            }
        }
        Ok(())
    }

    fn post_message(&mut self, message: &str) -> Result<()> {
        if self.stop_flag.load(Ordering::SeqCst) {
            return Err(DashboardError::ChannelClosed);
        }
        log::info!("-> {}", message);
        self.sent.push(message.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_batch_text() {
        assert_eq!(batch_text(r#"{"soc": 1}"#), Some(r#"{"soc": 1}"#));
        assert_eq!(batch_text(r#"  json:{"soc": 1}  "#), Some(r#"{"soc": 1}"#));
        assert_eq!(batch_text("# recorded 2024-05-01"), None);
        assert_eq!(batch_text("   "), None);
        assert_eq!(batch_text("json:"), None);
    }

    #[test]
    fn test_replay_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# header").unwrap();
        writeln!(file, r#"{{"systemState": 1}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"json:{{"soc": 50}}"#).unwrap();

        let (mut worker, receiver) =
            ReplayWorker::new(Source::File(file.path().to_path_buf()), Duration::ZERO);
        worker.start().unwrap();

        let events: Vec<WorkerEvent> = receiver.iter().take(3).collect();
        assert_eq!(
            events,
            vec![
                WorkerEvent::Message(r#"{"systemState": 1}"#.to_string()),
                WorkerEvent::Message(r#"{"soc": 50}"#.to_string()),
                WorkerEvent::Closed,
            ]
        );
        worker.stop().unwrap();
    }

    #[test]
    fn test_missing_file_fails_to_start() {
        let (mut worker, _receiver) =
            ReplayWorker::new(Source::File(PathBuf::from("/nonexistent/stream.jsonl")), Duration::ZERO);
        assert!(worker.start().is_err());
    }

    #[test]
    fn test_post_after_stop_is_rejected() {
        let (mut worker, _receiver) = ReplayWorker::new(Source::Stdin, Duration::ZERO);
        worker.post_message("cruiseToggle").unwrap();
        worker.stop().unwrap();
        assert!(matches!(worker.post_message("stopCharge"), Err(DashboardError::ChannelClosed)));
        assert_eq!(worker.sent(), ["cruiseToggle".to_string()]);
    }
}
