use crate::{
    models::WeekKey,
    processor::{Reconciler, Report, RunOptions},
    traits::{CSVWrite, DataSource, OverdueResolver, Submitter},
};
use anyhow::Result;
use tracing::{debug, info};

pub const LISTING_HEADER: &str = "Overdue Dates";

pub enum Action<'a> {
    /// Print the overdue weeks and stop.
    ListOverdue,
    /// Match overdue weeks against this source and submit them.
    Reconcile(&'a dyn DataSource),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    NothingOverdue,
    Listed(Vec<WeekKey>),
    Reconciled(Report),
}

pub struct Engine<B, W> {
    backend: B,
    writer: W,
    options: RunOptions,
}

impl<B, W> Engine<B, W>
where
    B: OverdueResolver + Submitter,
    W: CSVWrite,
{
    pub fn new(backend: B, writer: W, options: RunOptions) -> Self {
        Self {
            backend,
            writer,
            options,
        }
    }

    pub fn run(&mut self, action: Action<'_>) -> Result<RunOutcome> {
        let overdue = self.backend.overdue_weeks()?;
        let Some(&oldest) = overdue.first() else {
            info!("no overdue weeks");
            return Ok(RunOutcome::NothingOverdue);
        };
        info!(count = overdue.len(), %oldest, "overdue weeks fetched");

        let source = match action {
            Action::ListOverdue => {
                let weeks: Vec<WeekKey> = overdue.into_iter().collect();
                self.list(&weeks)?;
                return Ok(RunOutcome::Listed(weeks));
            }
            Action::Reconcile(source) => source,
        };

        let weeks = source.weekly_hours(oldest)?;
        debug!(weeks = weeks.len(), "data source loaded");

        let report = Reconciler::new(&self.backend, self.options).reconcile(&overdue, &weeks)?;
        Ok(RunOutcome::Reconciled(report))
    }

    fn list(&mut self, weeks: &[WeekKey]) -> Result<()> {
        self.writer.write_record(&(LISTING_HEADER,))?;
        for week in weeks {
            self.writer.write_record(&(week.listing(),))?;
        }
        self.writer.flush()
    }
}
