use std::io::{self, IsTerminal, Write};
use std::time::Duration;

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
    Warning,
    Info,
    Question,
}

impl Severity {
    fn icon(self) -> &'static str {
        match self {
            Severity::Success => "✔",
            Severity::Error => "✖",
            Severity::Warning => "!",
            Severity::Info => "i",
            Severity::Question => "?",
        }
    }

    fn color_code(self) -> &'static str {
        match self {
            Severity::Success => "32",
            Severity::Error => "31",
            Severity::Warning => "33",
            Severity::Info => "36",
            Severity::Question => "35",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub text: String,
    pub severity: Severity,
    pub timeout: Duration,
}

/// Fire-and-forget user notifications.
pub trait AlertSink {
    fn show_alert(&self, alert: &Alert);
}

#[derive(Debug, Clone)]
pub struct TerminalAlerts {
    color: bool,
}

impl TerminalAlerts {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn format(&self, alert: &Alert) -> String {
        let line = format!("{} {}: {}", alert.severity.icon(), alert.title, alert.text);
        if self.color && io::stderr().is_terminal() {
            format!("\x1b[{}m{line}\x1b[0m", alert.severity.color_code())
        } else {
            line
        }
    }
}

impl AlertSink for TerminalAlerts {
    fn show_alert(&self, alert: &Alert) {
        debug!(severity = ?alert.severity, timeout = ?alert.timeout, "showing alert");
        let _ = writeln!(io::stderr().lock(), "{}", self.format(alert));
    }
}
