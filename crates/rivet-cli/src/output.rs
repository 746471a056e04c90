use rivet_core::domain::Summary;
use rivet_sync::Direction;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn from_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Trait for formatting CLI output
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn print_json(&self, value: &serde_json::Value);
    fn summary(&self, direction: Direction, summary: &Summary);
}

/// Human-readable output with checkmarks and indentation
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {}", message);
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {}", message);
    }
    fn warn(&self, message: &str) {
        eprintln!("\u{26a0} Warning: {}", message);
    }
    fn info(&self, message: &str) {
        println!("  {}", message);
    }
    fn print_json(&self, _value: &serde_json::Value) {}

    fn summary(&self, direction: Direction, summary: &Summary) {
        if summary.is_clean() {
            self.success(&format!(
                "{direction} complete: {} files/folders in sync",
                summary.succeeded
            ));
        } else {
            self.error(&format!(
                "{direction} finished with {} failure(s)",
                summary.failed
            ));
        }
        self.info(&format!(
            "{} directories, {} files, {} transferred",
            summary.directories, summary.files, summary.transferred
        ));
        if summary.unsupported > 0 {
            self.warn(&format!(
                "{} item(s) left untouched (not exactly one file per item)",
                summary.unsupported
            ));
        }
        for failure in &summary.failures {
            self.info(&format!("{}: {}", failure.path, failure.reason));
        }
    }
}

/// JSON output, one document per command
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!(
            "{}",
            serde_json::json!({"success": true, "message": message})
        );
    }
    fn error(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"success": false, "error": message})
        );
    }
    fn warn(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"level": "warning", "message": message})
        );
    }
    fn info(&self, _message: &str) {}
    fn print_json(&self, value: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_default()
        );
    }

    fn summary(&self, direction: Direction, summary: &Summary) {
        self.print_json(&summary_json(direction, summary));
    }
}

pub fn summary_json(direction: Direction, summary: &Summary) -> serde_json::Value {
    serde_json::json!({
        "success": summary.is_clean(),
        "direction": direction.to_string(),
        "summary": summary,
    })
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Human => Box::new(HumanFormatter),
    }
}
