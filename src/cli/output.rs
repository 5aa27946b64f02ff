//! Colored output helpers for CLI
//!
//! Status lines and progress go to stderr so the report on stdout can be
//! redirected cleanly.

use crate::types::{AgentRole, ProgressEvent, RunOutcome};
use owo_colors::OwoColorize;

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// Print the Triad banner
    pub fn banner(&self) {
        if self.colored {
            eprintln!(
                "\n   {} {}\n",
                "TRIAD".bright_cyan().bold(),
                format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
            );
        } else {
            eprintln!("\n   TRIAD v{}\n", env!("CARGO_PKG_VERSION"));
        }
    }

    /// Print a success message with a checkmark
    pub fn success(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✓".green().bold(), message.green());
        } else {
            eprintln!("  [OK] {}", message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "•".blue(), message);
        } else {
            eprintln!("  [INFO] {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            eprintln!("  [WARN] {}", message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Print a file creation message
    pub fn created(&self, file_type: &str, path: &str) {
        if self.colored {
            eprintln!(
                "  {} {} {}",
                "✓".green().bold(),
                file_type.dimmed(),
                path.bright_white()
            );
        } else {
            eprintln!("  [CREATED] {} {}", file_type, path);
        }
    }

    /// Print a file skipped message
    pub fn skipped(&self, path: &str, reason: &str) {
        if self.colored {
            eprintln!(
                "  {} {} {}",
                "○".yellow(),
                path.dimmed(),
                format!("({})", reason).yellow()
            );
        } else {
            eprintln!("  [SKIPPED] {} ({})", path, reason);
        }
    }

    /// Print a header for a section
    pub fn header(&self, title: &str) {
        if self.colored {
            eprintln!("\n  {}", title.bright_white().bold().underline());
        } else {
            eprintln!("\n  === {} ===", title);
        }
    }

    /// Print a key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            eprintln!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            eprintln!("    {}: {}", key, value);
        }
    }

    /// Print a hint/tip message
    pub fn hint(&self, message: &str) {
        if self.colored {
            eprintln!("\n  {} {}", "💡".dimmed(), message.dimmed().italic());
        } else {
            eprintln!("\n  [TIP] {}", message);
        }
    }

    /// Print a command suggestion
    pub fn command(&self, cmd: &str) {
        if self.colored {
            eprintln!("     {}", format!("$ {}", cmd).bright_cyan());
        } else {
            eprintln!("     $ {}", cmd);
        }
    }

    /// Print a table header row
    pub fn table_header(&self, columns: &[&str]) {
        let header: String = columns
            .iter()
            .map(|c| format!("{:<18}", c))
            .collect::<Vec<_>>()
            .join(" ");
        if self.colored {
            println!("    {}", header.bright_white().bold());
            println!("    {}", "─".repeat(columns.len() * 19).dimmed());
        } else {
            println!("    {}", header);
            println!("    {}", "-".repeat(columns.len() * 19));
        }
    }

    /// Print a table row
    pub fn table_row(&self, values: &[&str]) {
        let row: String = values
            .iter()
            .map(|v| format!("{:<18}", v))
            .collect::<Vec<_>>()
            .join(" ");
        println!("    {}", row);
    }

    /// Print one progress event as a role-tagged line
    pub fn progress(&self, event: &ProgressEvent) {
        let time = event.timestamp.format("%H:%M:%S");
        let tag = format!("[{:<10}]", event.role.as_str());
        let extra = match (event.search_results(), event.source_document()) {
            (Some(results), _) => results
                .iter()
                .map(|r| format!("\n      - {} ({})", r.title, r.url))
                .collect::<String>(),
            (None, Some(finding)) => format!("\n      ({} cited sources)", finding.sources().len()),
            (None, None) => String::new(),
        };

        if self.colored {
            let tag = match event.role {
                AgentRole::Planner => tag.magenta().bold().to_string(),
                AgentRole::Researcher => tag.cyan().bold().to_string(),
                AgentRole::Writer => tag.green().bold().to_string(),
            };
            eprintln!(
                "  {} {} {}{}",
                time.dimmed(),
                tag,
                event.message,
                extra.dimmed()
            );
        } else {
            eprintln!("  {} {} {}{}", time, tag, event.message, extra);
        }
    }

    /// Print the terminal outcome summary
    pub fn outcome(&self, outcome: &RunOutcome) {
        match outcome {
            RunOutcome::Completed { report } => {
                self.success(&format!("Report complete ({} words)", word_count(report)))
            }
            RunOutcome::Stopped { reason } => self.warning(reason),
            RunOutcome::Failed { detail, .. } => self.error(detail),
        }
    }
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
