//! Terminal output for the url-probe CLI.
//!
//! Progress goes to stderr through an `indicatif` bar so the summary on
//! stdout stays readable when redirected. Styling uses the `console` crate.

use console::{pad_str, style, Alignment};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use url_probe_lib::{ProbeConfig, ProbeSummary, ProgressSink};

const BAR_TEMPLATE: &str = "{spinner:.cyan} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({per_sec})";
const BAR_CHARS: &str = "━╸━";

// ── Progress ─────────────────────────────────────────────────────────────────

/// Progress bar ticking once per completed probe.
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a bar of `total` steps on stderr, or a hidden one.
    pub fn new(total: usize, hidden: bool) -> Self {
        let bar = if hidden {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stderr());
            let bar_style = ProgressStyle::with_template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars(BAR_CHARS);
            bar.set_style(bar_style);
            bar
        };

        Self { bar }
    }

    /// Steps completed so far.
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Remove the bar from the terminal.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressSink for ProgressReporter {
    fn tick(&self) {
        self.bar.inc(1);
    }
}

// ── Header ───────────────────────────────────────────────────────────────────

/// Print a styled header at the start of a run.
pub fn print_header(url_count: usize, config: &ProbeConfig, output: &str) {
    println!(
        "{} {} {}",
        style("url-probe").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!(
            "- Probing {} URL{}",
            url_count,
            plural(url_count)
        ))
        .dim(),
    );

    let mut meta_parts = vec![
        format!("Workers: {}", config.workers),
        format!("Concurrency: {}", config.concurrency),
        format!("Timeout: {}ms", config.timeout.as_millis()),
        format!("Output: {}", output),
    ];
    if config.redirect_hint {
        meta_parts.push("Redirect hint: on".to_string());
    }

    println!("{}", style(meta_parts.join(" | ")).dim());
    println!();
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Print the totals of a finished run.
pub fn print_summary(summary: &ProbeSummary) {
    println!(
        "  {}",
        style("────────────────────────────────────────────────────").dim()
    );
    println!(
        "  {} URL{} in {:.1}s  {}  {}  {}  {}  {}  {}",
        style(summary.expected).bold(),
        plural(summary.expected),
        summary.elapsed.as_secs_f64(),
        style("|").dim(),
        style(format!("{} responded", summary.responded)).green(),
        style("|").dim(),
        style(format!("{} no response", summary.no_response)).red(),
        style("|").dim(),
        style(format!("peak {} in flight", summary.peak_in_flight)).cyan(),
    );

    if summary.redirect_hints > 0 {
        print_detail(
            "redirect hints",
            &style(summary.redirect_hints).yellow().to_string(),
        );
    }
    if summary.sink_failures > 0 {
        print_detail(
            "write failures",
            &style(summary.sink_failures).red().bold().to_string(),
        );
    }
}

fn print_detail(label: &str, value: &str) {
    println!(
        "  {} {} {}",
        style("•").dim(),
        pad_str(label, 16, Alignment::Left, None),
        value
    );
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_reporter_counts_ticks() {
        let reporter = ProgressReporter::new(3, true);
        reporter.tick();
        reporter.tick();
        assert_eq!(reporter.position(), 2);
        reporter.finish();
    }

    #[test]
    fn test_reporter_as_progress_sink() {
        let reporter = std::sync::Arc::new(ProgressReporter::new(1, true));
        let sink: std::sync::Arc<dyn ProgressSink> = reporter.clone();
        sink.tick();
        assert_eq!(reporter.position(), 1);
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural(0), "s");
        assert_eq!(plural(1), "");
        assert_eq!(plural(2), "s");
    }
}
