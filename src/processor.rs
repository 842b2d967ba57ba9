use crate::{
    models::{DataMapping, OverdueSet, WeekKey, WeeklyRecord},
    traits::Submitter,
};
use anyhow::Result;
use getset::{CopyGetters, Getters};
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Match and log without submitting anything.
    pub dry_run: bool,
    /// Stop after the first overdue week that has a record.
    pub once: bool,
}

/// What a reconciliation pass did, in visiting order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Getters, CopyGetters)]
pub struct Report {
    #[getset(get = "pub")]
    matched: Vec<WeekKey>,
    #[getset(get = "pub")]
    submitted: Vec<WeekKey>,
    #[getset(get = "pub")]
    unmatched: Vec<WeekKey>,
    #[getset(get_copy = "pub")]
    stopped_early: bool,
}

pub struct Reconciler<'a, S> {
    submitter: &'a S,
    options: RunOptions,
    report: Report,
}

impl<'a, S: Submitter> Reconciler<'a, S> {
    pub fn new(submitter: &'a S, options: RunOptions) -> Self {
        Self {
            submitter,
            options,
            report: Report::default(),
        }
    }

    /// Walks the overdue weeks oldest first and submits those that have a record.
    ///
    /// # Arguments
    /// * `overdue` - Weeks the backend waits for.
    /// * `weeks` - Worked hours from the active data source.
    ///
    /// # Returns
    /// The report of the pass. The first submission failure aborts the pass.
    pub fn reconcile(mut self, overdue: &OverdueSet, weeks: &DataMapping) -> Result<Report> {
        for &week in overdue {
            info!(%week, "overdue week");
            let Some(hours) = weeks.get(&week) else {
                self.report.unmatched.push(week);
                continue;
            };

            self.apply(week, hours)?;

            if self.options.once {
                self.report.stopped_early = true;
                break;
            }
        }
        Ok(self.report)
    }

    fn apply(&mut self, week: WeekKey, hours: &WeeklyRecord) -> Result<()> {
        info!(%week, %hours, total = hours.total(), "found match");
        self.report.matched.push(week);

        if self.options.dry_run {
            return Ok(());
        }

        self.submitter.submit(week, hours)?;
        info!(%week, %hours, "successfully submitted week");
        self.report.submitted.push(week);
        Ok(())
    }
}
