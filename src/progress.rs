//! Progress events, the sinks that consume them, and cooperative cancellation.

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::info;

/// Position within a long-running step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub current: u64,
    pub total: u64,
    pub percentage: f64,
}

impl ProgressEvent {
    /// `percentage` is clamped to `[0, 100]`; an unknown total reports 0
    pub fn new(current: u64, total: u64) -> Self {
        let percentage = if total == 0 {
            0.0
        } else {
            (current as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
        };
        Self {
            current,
            total,
            percentage,
        }
    }
}

/// Which stage of the batch produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Colorize,
    PostProcess,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Colorize => "colorize",
            Phase::PostProcess => "postprocess",
        }
    }
}

/// Wire form of a progress report: `{"progress":{...},"phase":"..."}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressLine {
    pub progress: ProgressEvent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
}

impl ProgressLine {
    /// Parse one line of worker output, ignoring anything that is not a progress report
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if !line.starts_with('{') {
            return None;
        }
        serde_json::from_str(line).ok()
    }
}

/// Receiver for progress events
pub trait ProgressSink: Send + Sync {
    fn report(&self, phase: Phase, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(Phase, ProgressEvent) + Send + Sync,
{
    fn report(&self, phase: Phase, event: ProgressEvent) {
        self(phase, event)
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _phase: Phase, _event: ProgressEvent) {}
}

/// Prints every event as one JSON line
pub struct JsonProgressPrinter<W: Write + Send> {
    out: Mutex<W>,
}

impl JsonProgressPrinter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> JsonProgressPrinter<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> ProgressSink for JsonProgressPrinter<W> {
    fn report(&self, phase: Phase, event: ProgressEvent) {
        let line = ProgressLine {
            progress: event,
            phase: Some(phase),
        };
        let Ok(json) = serde_json::to_string(&line) else {
            return;
        };
        if let Ok(mut out) = self.out.lock() {
            let _ = writeln!(out, "{}", json);
            let _ = out.flush();
        }
    }
}

/// Logs progress at every tenth of the way
#[derive(Debug, Default)]
pub struct TracingProgress {
    last_decile: AtomicU64,
}

impl TracingProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressSink for TracingProgress {
    fn report(&self, phase: Phase, event: ProgressEvent) {
        let decile = (event.percentage / 10.0).floor() as u64;
        if event.current <= 1 {
            self.last_decile.store(0, Ordering::Relaxed);
        }
        if decile > self.last_decile.swap(decile, Ordering::Relaxed) {
            info!(
                "{}: {:.0}% ({}/{})",
                phase.as_str(),
                event.percentage,
                event.current,
                event.total
            );
        }
    }
}

/// Shared flag asking long-running work to stop at the next frame boundary
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage() {
        assert_eq!(ProgressEvent::new(5, 10).percentage, 50.0);
        assert_eq!(ProgressEvent::new(3, 0).percentage, 0.0);
        // estimated totals can be short
        assert_eq!(ProgressEvent::new(12, 10).percentage, 100.0);
    }

    #[test]
    fn test_parse_worker_line() {
        let line = r#"{"progress":{"current":3,"total":12,"percentage":25.0}}"#;
        let parsed = ProgressLine::parse(line).unwrap();
        assert_eq!(parsed.progress, ProgressEvent::new(3, 12));
        assert_eq!(parsed.phase, None);

        assert!(ProgressLine::parse("Rendering frame 3").is_none());
        assert!(ProgressLine::parse(r#"{"status":"ok"}"#).is_none());
    }

    #[test]
    fn test_json_printer_format() {
        let printer = JsonProgressPrinter::new(Vec::new());
        printer.report(Phase::PostProcess, ProgressEvent::new(1, 4));
        printer.report(Phase::Colorize, ProgressEvent::new(4, 4));

        let text = String::from_utf8(printer.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["phase"], "postprocess");
        assert_eq!(first["progress"]["current"], 1);
        assert_eq!(first["progress"]["total"], 4);
        assert_eq!(first["progress"]["percentage"], 25.0);

        let second = ProgressLine::parse(lines[1]).unwrap();
        assert_eq!(second.phase, Some(Phase::Colorize));
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_closure_sink() {
        let seen = Mutex::new(Vec::new());
        let sink = |phase: Phase, event: ProgressEvent| {
            seen.lock().unwrap().push((phase, event.current));
        };
        sink.report(Phase::Colorize, ProgressEvent::new(2, 3));
        assert_eq!(*seen.lock().unwrap(), vec![(Phase::Colorize, 2)]);
    }
}
