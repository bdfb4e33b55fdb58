//! Audit logging for control-widget value changes.
//!
//! Every write the runtime performs lands in a session-scoped,
//! append-only file under `~/.medm`. Records are single pipe-delimited
//! lines; the value field escapes `|`, `\n` and `\r` so a record can
//! never tear across lines. A mutex serializes writers.
//!
//! The file is opened lazily on the first write so sessions that never
//! write leave no file behind.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local};

/// ISO-8601 without a zone suffix, matching the legacy log format.
const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
use tracing::warn;

/// One parsed audit record. The on-disk form is
/// `timestamp|user|widgetType|pvName|value|displayFile`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub timestamp: String,
    pub user: String,
    pub widget_type: String,
    pub pv_name: String,
    pub value: String,
    pub display_file: String,
}

impl AuditRecord {
    /// Parse a non-comment log line. Returns `None` for comment lines
    /// and structurally broken input.
    pub fn parse(line: &str) -> Option<Self> {
        if line.starts_with('#') {
            return None;
        }
        let fields = split_unescaped(line);
        if fields.len() != 6 {
            return None;
        }
        let mut fields = fields.into_iter();
        Some(Self {
            timestamp: fields.next()?,
            user: fields.next()?,
            widget_type: fields.next()?,
            pv_name: fields.next()?,
            value: unescape_value(&fields.next()?),
            display_file: fields.next()?,
        })
    }
}

fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '|' => out.push_str("\\|"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('|') => out.push('|'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Split on pipes that are not preceded by a backslash.
fn split_unescaped(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for ch in line.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' => {
                current.push(ch);
                escaped = true;
            }
            '|' => fields.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    fields.push(current);
    fields
}

struct LoggerInner {
    enabled: bool,
    file: Option<File>,
}

/// Session-scoped audit logger. Clone-free; share via `Arc`.
pub struct AuditLogger {
    inner: Mutex<LoggerInner>,
    root: PathBuf,
    user: String,
    session_start: DateTime<Local>,
    pid: u32,
}

impl AuditLogger {
    /// Logger writing under `~/.medm`. `enabled = false` (the
    /// `-nolog` path) turns every call into a no-op.
    pub fn new(enabled: bool) -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::with_root(enabled, home.join(".medm"))
    }

    /// Logger with an explicit root directory.
    pub fn with_root(enabled: bool, root: impl Into<PathBuf>) -> Self {
        Self {
            inner: Mutex::new(LoggerInner {
                enabled,
                file: None,
            }),
            root: root.into(),
            user: current_user(),
            session_start: Local::now(),
            pid: std::process::id(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.lock().expect("audit mutex poisoned").enabled
    }

    /// Path the session file has or will be given.
    pub fn log_file_path(&self) -> PathBuf {
        let stamp = self.session_start.format("%Y%m%d_%H%M%S");
        self.root
            .join(format!("audit_{}_{}.log", stamp, self.pid))
    }

    /// Append one write record. `display_file = None` records `-`.
    pub fn log_put(
        &self,
        pv_name: &str,
        value: &str,
        widget_type: &str,
        display_file: Option<&str>,
    ) {
        let mut inner = self.inner.lock().expect("audit mutex poisoned");
        if !inner.enabled {
            return;
        }
        if inner.file.is_none() {
            inner.file = self.open_session_file();
            if inner.file.is_none() {
                // Opening failed; disable so we warn only once.
                inner.enabled = false;
                return;
            }
        }

        let timestamp = Local::now().format(ISO_FORMAT).to_string();
        let display = display_file.filter(|name| !name.is_empty()).unwrap_or("-");
        let line = format!(
            "{}|{}|{}|{}|{}|{}\n",
            timestamp,
            self.user,
            widget_type,
            pv_name,
            escape_value(value),
            display
        );
        if let Some(file) = inner.file.as_mut() {
            if let Err(error) = file.write_all(line.as_bytes()).and_then(|_| file.flush()) {
                warn!(target: "audit", %error, "failed to append audit record");
            }
        }
    }

    /// Numeric convenience wrapper, shortest round-trip rendering.
    pub fn log_put_number(
        &self,
        pv_name: &str,
        value: f64,
        widget_type: &str,
        display_file: Option<&str>,
    ) {
        self.log_put(pv_name, &value.to_string(), widget_type, display_file);
    }

    fn open_session_file(&self) -> Option<File> {
        if let Err(error) = fs::create_dir_all(&self.root) {
            warn!(target: "audit", %error, dir = %self.root.display(),
                "failed to create audit directory");
            return None;
        }
        let path = self.log_file_path();
        let mut file = match OpenOptions::new().append(true).create(true).open(&path) {
            Ok(file) => file,
            Err(error) => {
                warn!(target: "audit", %error, path = %path.display(),
                    "failed to open audit log");
                return None;
            }
        };
        let header = format!(
            "# QtEDM Audit Log\n# Session started: {}\n# User: {}\n# Format: timestamp|user|widgetType|pvName|value|displayFile\n#\n",
            self.session_start.format(ISO_FORMAT),
            self.user
        );
        if let Err(error) = file.write_all(header.as_bytes()) {
            warn!(target: "audit", %error, "failed to write audit header");
            return None;
        }
        Some(file)
    }
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Read the audit root directory for viewers: all `audit_*.log` files,
/// newest first by name.
pub fn session_logs(root: &Path) -> Vec<PathBuf> {
    let mut logs: Vec<PathBuf> = fs::read_dir(root)
        .into_iter()
        .flatten()
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("audit_") && name.ends_with(".log"))
        })
        .collect();
    logs.sort();
    logs.reverse();
    logs
}
