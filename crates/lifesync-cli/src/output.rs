//! Terminal output
//!
//! Commands print through an [`OutputFormatter`] picked once from the
//! global `--json` flag. Human output goes to the terminal line by line;
//! JSON output only carries structured documents and outcomes.

use lifesync_sync::SyncStatus;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }

    pub fn is_json(self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

/// Kind of a one-line message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Error,
    Warning,
    Info,
}

impl Tone {
    /// Errors and warnings go to stderr
    fn is_diagnostic(self) -> bool {
        matches!(self, Tone::Error | Tone::Warning)
    }
}

/// Formats CLI output
pub trait OutputFormatter {
    fn message(&self, tone: Tone, text: &str);

    /// One `label  value` line
    fn field(&self, label: &str, value: &str);

    /// Sync status of one device or session
    fn sync_status(&self, label: &str, status: &SyncStatus);

    fn print_json(&self, value: &serde_json::Value);

    fn success(&self, text: &str) {
        self.message(Tone::Success, text);
    }

    fn error(&self, text: &str) {
        self.message(Tone::Error, text);
    }

    fn warn(&self, text: &str) {
        self.message(Tone::Warning, text);
    }

    fn info(&self, text: &str) {
        self.message(Tone::Info, text);
    }
}

// ============================================================================
// Human
// ============================================================================

/// Human-readable output with status glyphs and aligned fields
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn message(&self, tone: Tone, text: &str) {
        let line = render_message(tone, text);
        if tone.is_diagnostic() {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }

    fn field(&self, label: &str, value: &str) {
        println!("{}", render_field(label, value));
    }

    fn sync_status(&self, label: &str, status: &SyncStatus) {
        println!("{}", render_field(label, &render_status(status)));
    }

    fn print_json(&self, _value: &serde_json::Value) {}
}

fn render_message(tone: Tone, text: &str) -> String {
    match tone {
        Tone::Success => format!("\u{2713} {text}"),
        Tone::Error => format!("\u{2717} Error: {text}"),
        Tone::Warning => format!("\u{26a0} Warning: {text}"),
        Tone::Info => format!("  {text}"),
    }
}

fn render_field(label: &str, value: &str) -> String {
    format!("  {:<14} {value}", format!("{label}:"))
}

/// Short badge for a status: `synced v6 (alice)`, `offline v5 (alice): ...`
fn render_status(status: &SyncStatus) -> String {
    match status {
        SyncStatus::Idle => "idle (signed out)".to_string(),
        SyncStatus::Loading { identity } => format!("loading ({identity})"),
        SyncStatus::Synced { identity, version } => format!("synced v{version} ({identity})"),
        SyncStatus::Writing { identity, version } => format!("saving v{version} ({identity})"),
        SyncStatus::Offline {
            identity,
            version,
            last_error,
        } => format!("offline v{version} ({identity}): {last_error}"),
    }
}

// ============================================================================
// JSON
// ============================================================================

/// JSON output; informational lines and fields are dropped
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn message(&self, tone: Tone, text: &str) {
        let value = match tone {
            Tone::Success => serde_json::json!({"success": true, "message": text}),
            Tone::Error => serde_json::json!({"success": false, "error": text}),
            Tone::Warning => serde_json::json!({"level": "warning", "message": text}),
            Tone::Info => return,
        };
        if tone.is_diagnostic() {
            eprintln!("{value}");
        } else {
            println!("{value}");
        }
    }

    fn field(&self, _label: &str, _value: &str) {}

    fn sync_status(&self, label: &str, status: &SyncStatus) {
        println!("{}", serde_json::json!({ "label": label, "status": status }));
    }

    fn print_json(&self, value: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_default()
        );
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Human => Box::new(HumanFormatter),
    }
}
