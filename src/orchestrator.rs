use std::path::PathBuf;

use crate::{
    batch::{BatchExecutor, BatchReport},
    color::Color,
    debug,
    error::RunError,
    info,
    locator::discover_images,
    logging::Logger,
    paths::TargetLayout,
    privileged::PrivilegedOps,
    registry::{self, RegistryScope, RegistryWriter},
    rewriter::{rewrite_image, write_legacy_background, FsImages},
};

/// Everything a run needs, fixed once the CLI and config are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub target: PathBuf,
    pub color: String,
    pub win7: bool,
    pub offline: bool,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub color: Color,
    pub discovered: usize,
    pub report: BatchReport,
    pub legacy_background: bool,
    pub scope: RegistryScope,
}

pub struct Orchestrator<'a> {
    ops: &'a dyn PrivilegedOps,
    registry: &'a dyn RegistryWriter,
    log: &'a Logger,
}

impl<'a> Orchestrator<'a> {
    pub fn new(ops: &'a dyn PrivilegedOps, registry: &'a dyn RegistryWriter, log: &'a Logger) -> Self {
        Self { ops, registry, log }
    }

    pub fn check_privileges(&self) -> Result<(), RunError> {
        if self.ops.is_elevated() {
            Ok(())
        } else {
            Err(RunError::NotElevated)
        }
    }

    /// Validates the target, rewrites every image, then patches the registry.
    /// Nothing is modified until the target and color are both accepted.
    pub fn run(&self, config: &RunConfig) -> Result<RunSummary, RunError> {
        let layout = TargetLayout::new(&config.target);
        if !layout.is_valid() {
            return Err(RunError::InvalidTarget(config.target.clone()));
        }

        let color = Color::parse(&config.color)?;
        debug!(self.log, "resolved {} to {}", config.color, color);

        let images = discover_images(&layout.image_dirs());
        info!(self.log, "found {} images under {}", images.len(), layout.root().display());

        let executor = BatchExecutor::new(config.workers);
        debug!(self.log, "rewriting with {} workers", executor.workers());
        let report = executor.run(&images, |path| {
            rewrite_image(self.ops, &FsImages, path, color, self.log)
        })?;
        if report.skipped > 0 {
            info!(self.log, "skipped {} of {} images", report.skipped, report.total());
        }

        if config.win7 {
            let file = layout.legacy_background_file();
            write_legacy_background(&layout.legacy_background_dir(), &file, color)?;
            debug!(self.log, "wrote legacy background {}", file.display());
        }

        info!(self.log, "images replaced successfully");

        let scope = RegistryScope::from_offline_flag(config.offline);
        registry::patch(
            self.registry,
            self.ops,
            scope,
            &layout.software_hive(),
            config.win7,
            self.log,
        )?;

        info!(self.log, "done");

        Ok(RunSummary {
            color,
            discovered: images.len(),
            report,
            legacy_background: config.win7,
            scope,
        })
    }
}
