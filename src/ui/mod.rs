//! CLI output: colored status lines, resolution reports and progress bars.

pub use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::time::Duration;

use crate::models::{Attempt, BatchEntry, BatchReport, Resolution, StrategyReport};

/// Check if stdout is a terminal.
pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Icons for the resolution strategies.
pub fn strategy_icon(strategy: &str) -> &'static str {
    match strategy {
        "oa_service" => "📦",
        "pmc_search" => "📚",
        "doi_landing" => "🔗",
        _ => "📄",
    }
}

/// Status icons for different operations.
pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
        Status::Pending => "○",
        Status::Download => "↓",
        Status::Search => "🔍",
    }
}

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
    Pending,
    Download,
    Search,
}

/// Print a styled status message.
#[macro_export]
macro_rules! print_status {
    ($status:expr, $msg:expr) => {{
        use $crate::ui::{status_icon, OwoColorize, Status};
        let icon = status_icon($status);
        match $status {
            Status::Success => println!("{} {}", icon.green().bold(), $msg),
            Status::Error => println!("{} {}", icon.red().bold(), $msg),
            Status::Warning => println!("{} {}", icon.yellow().bold(), $msg),
            Status::Info => println!("{} {}", icon.cyan().bold(), $msg),
            Status::Pending => println!("{} {}", icon.white().dimmed(), $msg),
            Status::Download => println!("{} {}", icon.magenta(), $msg),
            Status::Search => println!("{} {}", icon.yellow(), $msg),
        }
    }};
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", format!("━━━ {} ━━━", title).bold().cyan());
}

/// One line per strategy outcome, with its candidates underneath.
pub fn print_reports(reports: &[StrategyReport]) {
    if reports.is_empty() {
        print_status!(Status::Pending, "no strategy accepts this identifier");
        return;
    }

    for report in reports {
        let icon = strategy_icon(&report.strategy);
        match &report.attempt {
            Attempt::Found { candidates } => {
                println!(
                    "{} {} {} candidate(s)",
                    icon,
                    report.strategy.green().bold(),
                    candidates.len()
                );
                for candidate in candidates {
                    println!(
                        "    {} {} {}",
                        status_icon(Status::Download).magenta(),
                        candidate.kind.to_string().yellow(),
                        candidate.url.as_str().dimmed()
                    );
                }
            }
            Attempt::NotFound { reason } => {
                println!("{} {} {}", icon, report.strategy.white().dimmed(), reason.dimmed())
            }
            Attempt::SoftFailure { reason } => println!(
                "{} {} {}",
                icon,
                report.strategy.yellow(),
                truncate_with_ellipsis(reason, 100)
            ),
        }
    }
}

/// Print the artifacts written by a resolution.
pub fn print_resolution(resolution: &Resolution) {
    for artifact in &resolution.artifacts {
        print_status!(
            Status::Success,
            format!(
                "{} ({}, {} via {})",
                artifact.path.display().to_string().bold(),
                format_file_size(artifact.bytes),
                artifact.kind,
                artifact.strategy.cyan()
            )
        );
    }
}

/// One line for a finished batch entry.
pub fn print_batch_entry(entry: &BatchEntry) {
    match &entry.error {
        None => {
            let files: Vec<String> = entry
                .artifacts
                .iter()
                .map(|a| a.path.display().to_string())
                .collect();
            print_status!(
                Status::Success,
                format!("{} → {}", entry.identifier.yellow(), files.join(", "))
            );
        }
        Some(error) => print_status!(
            Status::Error,
            format!("{} {}", entry.identifier.yellow(), error.dimmed())
        ),
    }
}

/// Totals line for a batch.
pub fn print_batch_summary(report: &BatchReport) {
    println!("{}", "─".repeat(60).dimmed());
    println!(
        "{} resolved, {} failed, {} total",
        report.successful.to_string().green().bold(),
        report.failed.to_string().red().bold(),
        report.len()
    );
}

/// Truncate text to fit within the specified width using unicode-aware truncation.
pub fn truncate_with_ellipsis(text: &str, max_width: usize) -> String {
    if max_width <= 3 {
        return "...".to_string();
    }

    let char_widths: Vec<(char, usize)> = text
        .chars()
        .map(|c| (c, unicode_width::UnicodeWidthChar::width(c).unwrap_or(1)))
        .collect();

    let total_width: usize = char_widths.iter().map(|(_, w)| *w).sum();

    if total_width <= max_width {
        return text.to_string();
    }

    let mut current_width = 0;
    let mut end_idx = 0;

    for (i, (_, w)) in char_widths.iter().enumerate() {
        if current_width + w > max_width - 3 {
            break;
        }
        current_width += w;
        end_idx = i + 1;
    }

    let truncated: String = char_widths[..end_idx].iter().map(|(c, _)| *c).collect();
    format!("{}...", truncated)
}

/// Get a human-readable file size.
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn style(template: &str) -> indicatif::ProgressStyle {
    indicatif::ProgressStyle::with_template(template)
        .unwrap_or_else(|_| indicatif::ProgressStyle::default_spinner())
}

/// Spinner or progress bar; hidden when stdout is not a terminal.
pub struct Spinner {
    pb: indicatif::ProgressBar,
}

impl Spinner {
    /// Create a new spinner with the given message.
    pub fn new(msg: &str) -> Self {
        let pb = if is_terminal() {
            indicatif::ProgressBar::new_spinner()
        } else {
            indicatif::ProgressBar::hidden()
        };
        pb.set_style(style("{spinner:.cyan} {msg}").tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "));
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self { pb }
    }

    /// Set the message.
    pub fn set_message(&self, msg: &str) {
        self.pb.set_message(msg.to_string());
    }

    /// Increment progress.
    pub fn inc(&self, delta: u64) {
        self.pb.inc(delta);
    }

    /// Print a line above the bar without disturbing it.
    pub fn println(&self, line: &str) {
        if self.pb.is_hidden() {
            println!("{}", line);
        } else {
            self.pb.println(line);
        }
    }

    /// Finish with success message.
    pub fn finish_with_success(&self, msg: &str) {
        self.pb.set_style(style("{spinner:.green} {msg}").tick_chars("✓✓"));
        self.pb.finish_with_message(msg.to_string());
    }

    /// Finish with error message.
    pub fn finish_with_error(&self, msg: &str) {
        self.pb.set_style(style("{spinner:.red} {msg}").tick_chars("✗✗"));
        self.pb.finish_with_message(msg.to_string());
    }

    /// Remove the spinner from the terminal.
    pub fn finish_and_clear(&self) {
        self.pb.finish_and_clear();
    }
}

/// Create a progress bar for batches.
pub fn create_progress_bar(len: u64, msg: &str) -> Spinner {
    let pb = if is_terminal() {
        indicatif::ProgressBar::new(len)
    } else {
        indicatif::ProgressBar::hidden()
    };
    pb.set_style(
        style("{msg}: {bar:40.cyan/blue} {pos}/{len} ({percent}%)").progress_chars("█▓▒░ "),
    );
    pb.set_message(msg.to_string());

    Spinner { pb }
}
