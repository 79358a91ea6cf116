//! Discovery phase: fill a package's tagged source inventory

use super::{panic_message, RunContext};
use crate::error::{DependencyCycleError, PluginError};
use crate::package::{Package, SourceSink};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// One discovery plugin's run.
#[derive(Debug, Clone)]
pub struct DiscoveryRun {
    pub plugin: String,
    /// Paths newly recorded across all tags
    pub files_added: usize,
    pub elapsed: Duration,
    pub error: Option<PluginError>,
}

#[derive(Debug, Clone, Default)]
pub struct DiscoveryReport {
    /// Runs in execution order
    pub runs: Vec<DiscoveryRun>,
    /// Set when cancellation stopped the phase early
    pub interrupted: bool,
}

impl DiscoveryReport {
    pub fn failed(&self) -> impl Iterator<Item = &DiscoveryRun> {
        self.runs.iter().filter(|r| r.error.is_some())
    }
}

/// Run the enabled discovery plugins over `package` in dependency order.
///
/// A plugin that errors or panics is logged and recorded; whatever it added
/// before failing is kept and the remaining plugins still run.
pub fn run_discovery(
    package: &mut Package,
    ctx: &RunContext<'_>,
) -> Result<DiscoveryReport, DependencyCycleError> {
    let order = ctx.registry.discovery_order(&ctx.resolved.enabled_discovery)?;
    let mut report = DiscoveryReport::default();

    for plugin in order {
        if ctx.cancel.is_cancelled() {
            report.interrupted = true;
            break;
        }

        let name = plugin.name().to_string();
        let before = entry_count(package);
        let started = Instant::now();
        let result = {
            let descriptor = plugin.descriptor();
            let mut sink = SourceSink::new(package, &name, &descriptor.produces, ctx.exceptions);
            catch_unwind(AssertUnwindSafe(|| {
                plugin.scan(&mut sink, &ctx.resolved.level, ctx.exceptions)
            }))
            .unwrap_or_else(|panic| Err(PluginError::Execution(panic_message(panic))))
        };
        let elapsed = started.elapsed();
        let files_added = entry_count(package) - before;

        match &result {
            Ok(()) => debug!(plugin = %name, files_added, ?elapsed, "discovery plugin finished"),
            Err(e) => warn!(plugin = %name, error = %e, "discovery plugin failed"),
        }
        let run = DiscoveryRun {
            plugin: name,
            files_added,
            elapsed,
            error: result.err(),
        };
        ctx.observer.discovery_finished(&run);
        report.runs.push(run);
    }

    Ok(report)
}

fn entry_count(package: &Package) -> usize {
    package.tags().map(|tag| package.sources(tag).len()).sum()
}
