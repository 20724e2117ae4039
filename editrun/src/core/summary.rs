//! Aggregate counts over a run's results.

use std::fmt;

use serde::Serialize;

use crate::core::types::{ExecutionResult, Outcome, Stage};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageTally {
    pub succeeded: usize,
    pub failed: usize,
}

impl StageTally {
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub edit: StageTally,
    pub run: StageTally,
    pub test: StageTally,
}

impl RunSummary {
    pub fn from_results<'a>(
        run_id: &str,
        results: impl IntoIterator<Item = &'a ExecutionResult>,
    ) -> Self {
        let mut summary = Self {
            run_id: run_id.to_string(),
            ..Self::default()
        };
        for result in results {
            let tally = match result.stage {
                Stage::Edit => &mut summary.edit,
                Stage::Run => &mut summary.run,
                Stage::Test => &mut summary.test,
            };
            match result.outcome {
                Outcome::Success => tally.succeeded += 1,
                Outcome::Failure => tally.failed += 1,
            }
        }
        summary
    }

    pub fn total_results(&self) -> usize {
        self.edit.attempted() + self.run.attempted() + self.test.attempted()
    }

    pub fn has_failures(&self) -> bool {
        self.edit.failed + self.run.failed + self.test.failed > 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run {}:", self.run_id)?;
        for (label, tally) in [("edit", self.edit), ("run", self.run), ("test", self.test)] {
            write!(f, " {label} {}/{}", tally.succeeded, tally.attempted())?;
        }
        Ok(())
    }
}
