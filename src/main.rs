use anyhow::Result;
use chrono::Local;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod calendar;
mod client;
mod config;
mod csv_source;
mod csv_writer;
mod engine;
mod errors;
mod models;
mod processor;
mod traits;

use calendar::CalendarSource;
use client::{HttpBackend, HttpEventFeed};
use config::{Cli, Settings, SourceChoice};
use csv_source::CsvSource;
use csv_writer::CSVWriter;
use engine::{Action, Engine, RunOutcome};

const NOTHING_OVERDUE: &str = "You have no overdue weeks. Congratulations!";

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_directives())))
        .init();

    let settings = Settings::resolve(cli)?;
    let backend = HttpBackend::new(
        settings.backend_url(),
        settings.credentials().clone(),
        settings.timeout(),
    )?;
    let mut engine = Engine::new(backend, CSVWriter::stdout(), settings.options());

    let outcome = match settings.source() {
        SourceChoice::ListOverdue => engine.run(Action::ListOverdue)?,
        SourceChoice::Csv(path) => {
            let source = CsvSource::new(path.clone());
            engine.run(Action::Reconcile(&source))?
        }
        SourceChoice::Calendar { url, pattern } => {
            let feed = HttpEventFeed::new(url, settings.credentials().clone(), settings.timeout())?;
            let source = CalendarSource::new(feed, pattern, Local::now().date_naive())?;
            engine.run(Action::Reconcile(&source))?
        }
    };

    match outcome {
        RunOutcome::NothingOverdue => println!("{NOTHING_OVERDUE}"),
        RunOutcome::Listed(_) => {}
        RunOutcome::Reconciled(report) => info!(
            matched = report.matched().len(),
            submitted = report.submitted().len(),
            without_data = report.unmatched().len(),
            stopped_early = report.stopped_early(),
            "reconciliation finished"
        ),
    }

    Ok(())
}
