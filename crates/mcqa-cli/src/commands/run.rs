//! The `mcqa run` command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use mcqa_core::batch::{BatchDriver, BatchReport, ProgressReporter};
use mcqa_core::loader::load_csv;
use mcqa_core::model::{Outcome, QuestionFormat};
use mcqa_core::output::JsonDirSink;
use mcqa_providers::config::load_config_from;

pub struct RunArgs {
    pub input: PathBuf,
    pub format: QuestionFormat,
    pub output: Option<PathBuf>,
    pub no_randomize: bool,
    pub synthetic_count: Option<usize>,
    pub delay_ms: Option<u64>,
    pub config: Option<PathBuf>,
}

/// Console progress reporter.
struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn on_row_start(&self, index: usize, total: usize, query: &str) {
        eprintln!("  [{}/{total}] {query}", index + 1);
    }

    fn on_row_complete(&self, index: usize, outcome: &Outcome) {
        eprintln!(
            "  Done: row {} evaluation {:.2} ({} response(s))",
            index + 1,
            outcome.evaluation(),
            outcome.responses().len()
        );
    }

    fn on_row_error(&self, index: usize, error: &str) {
        eprintln!("  ERROR: row {}: {error}", index + 1);
    }

    fn on_batch_complete(&self, total: usize, failed: usize, elapsed: Duration) {
        eprintln!(
            "\nComplete: {}/{total} rows succeeded, {failed} failed ({:.1}s)",
            total - failed,
            elapsed.as_secs_f64()
        );
    }
}

pub async fn execute(args: RunArgs) -> Result<()> {
    let mut config = load_config_from(args.config.as_deref())?;
    if args.no_randomize {
        config.randomize_options = false;
    }
    if let Some(n) = args.synthetic_count {
        anyhow::ensure!(n >= 1, "synthetic count must be at least 1");
        config.synthetic_count = n;
    }
    if let Some(ms) = args.delay_ms {
        config.request_delay_ms = ms;
    }
    let output = args.output.unwrap_or_else(|| config.output_dir.clone());

    let rows = load_csv(&args.input)?;
    anyhow::ensure!(
        !rows.is_empty(),
        "no usable rows in {}",
        args.input.display()
    );

    let sink = Arc::new(JsonDirSink::new(&output));
    let orchestrator = super::build_orchestrator(&config, sink)?;
    let driver = BatchDriver::new(Arc::new(orchestrator), config.request_delay());

    eprintln!(
        "mcqa v{}: answering {} question(s) as {}",
        env!("CARGO_PKG_VERSION"),
        rows.len(),
        args.format
    );
    eprintln!();

    let report = driver.run(rows, args.format, &ConsoleReporter).await?;

    print_summary(&report);

    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H%M%S");
    let path = output.join(format!("report-{timestamp}.json"));
    report.save_json(&path)?;
    eprintln!("Results saved to: {}", path.display());

    Ok(())
}

fn print_summary(report: &BatchReport) {
    use comfy_table::{Cell, Table};

    let summary = report.summary();
    let mut table = Table::new();
    table.set_header(vec![
        "Format",
        "Rows",
        "Failed",
        "Responses",
        "Accuracy",
        "Mean evaluation",
        "Duration",
    ]);
    table.add_row(vec![
        Cell::new(report.question_format),
        Cell::new(report.rows_total),
        Cell::new(report.rows_failed),
        Cell::new(summary.count),
        Cell::new(format!("{:.1}%", summary.accuracy() * 100.0)),
        Cell::new(format!("{:.3}", report.evaluation)),
        Cell::new(format!("{}ms", report.duration_ms)),
    ]);

    eprintln!("\n{table}");
}
