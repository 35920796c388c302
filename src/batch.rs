use std::{
    collections::BTreeSet,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    thread,
};

use rayon::prelude::*;

use crate::{error::RunError, rewriter::FileOutcome};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub rewritten: usize,
    pub skipped: usize,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.rewritten + self.skipped
    }
}

/// Runs one task per file on a dedicated thread pool.
#[derive(Debug, Clone, Copy)]
pub struct BatchExecutor {
    workers: usize,
}

impl BatchExecutor {
    /// `None` sizes the pool to the available CPU parallelism.
    pub fn new(workers: Option<usize>) -> Self {
        let workers = workers
            .filter(|&n| n > 0)
            .unwrap_or_else(|| thread::available_parallelism().map_or(1, NonZeroUsize::get));
        Self { workers }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Blocks until every file has been handled. The first fatal error stops
    /// dispatch of the remaining files and is returned.
    pub fn run<F>(&self, files: &BTreeSet<PathBuf>, task: F) -> Result<BatchReport, RunError>
    where
        F: Fn(&Path) -> Result<FileOutcome, RunError> + Sync,
    {
        if files.is_empty() {
            return Ok(BatchReport::default());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("rewrite-{i}"))
            .build()?;

        let outcomes: Vec<FileOutcome> = pool.install(|| {
            files
                .par_iter()
                .map(|path| task(path.as_path()))
                .collect::<Result<Vec<_>, RunError>>()
        })?;

        Ok(outcomes
            .into_iter()
            .fold(BatchReport::default(), |mut report, outcome| {
                match outcome {
                    FileOutcome::Rewritten { .. } => report.rewritten += 1,
                    FileOutcome::Skipped => report.skipped += 1,
                }
                report
            }))
    }
}
