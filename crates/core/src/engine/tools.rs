//! Tool phase: run every enabled tool plugin against a discovered package

use super::{panic_message, RunContext};
use crate::error::PluginError;
use crate::issue::Issue;
use crate::package::Package;
use crate::plugin::{Invocation, ToolPlugin};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// What happened when one tool plugin was run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    /// The tool ran; the list may be empty
    Completed(Vec<Issue>),
    /// The executable is missing or could not be launched
    Unavailable(String),
    /// The tool ran but failed, or its output could not be understood
    Failed(String),
    TimedOut(Duration),
    Cancelled,
}

impl ToolOutcome {
    /// The tool's findings, or `None` when it did not complete.
    pub fn issues(&self) -> Option<&[Issue]> {
        match self {
            ToolOutcome::Completed(issues) => Some(issues),
            _ => None,
        }
    }

    pub fn completed(&self) -> bool {
        matches!(self, ToolOutcome::Completed(_))
    }
}

impl From<PluginError> for ToolOutcome {
    fn from(err: PluginError) -> Self {
        match err {
            PluginError::Unavailable(msg) => ToolOutcome::Unavailable(msg),
            PluginError::Timeout(limit) => ToolOutcome::TimedOut(limit),
            PluginError::Cancelled => ToolOutcome::Cancelled,
            other => ToolOutcome::Failed(other.to_string()),
        }
    }
}

impl fmt::Display for ToolOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolOutcome::Completed(issues) => write!(f, "{} issue(s)", issues.len()),
            ToolOutcome::Unavailable(msg) => write!(f, "unavailable: {}", msg),
            ToolOutcome::Failed(msg) => write!(f, "failed: {}", msg),
            ToolOutcome::TimedOut(limit) => write!(f, "timed out after {}s", limit.as_secs()),
            ToolOutcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRun {
    pub outcome: ToolOutcome,
    pub elapsed: Duration,
}

/// Per-tool results keyed by tool name.
///
/// Keys are ordered by name, so iteration never depends on which worker
/// finished first.
#[derive(Debug, Clone, Default)]
pub struct ToolResults {
    pub runs: BTreeMap<String, ToolRun>,
}

impl ToolResults {
    /// Tool name → findings, `None` for tools that did not complete.
    pub fn issue_map(&self) -> BTreeMap<String, Option<Vec<Issue>>> {
        self.runs
            .iter()
            .map(|(name, run)| (name.clone(), run.outcome.issues().map(<[Issue]>::to_vec)))
            .collect()
    }

    /// Tools that did not complete, with their outcome.
    pub fn not_run(&self) -> impl Iterator<Item = (&str, &ToolOutcome)> {
        self.runs
            .iter()
            .filter(|(_, run)| !run.outcome.completed())
            .map(|(name, run)| (name.as_str(), &run.outcome))
    }
}

/// Run every enabled tool over `package` on a worker pool of `ctx.jobs`
/// threads (0 = one per CPU).
pub fn run_tools(package: &Package, ctx: &RunContext<'_>) -> ToolResults {
    let tools: Vec<&dyn ToolPlugin> = ctx
        .resolved
        .enabled_tools
        .iter()
        .filter_map(|name| ctx.registry.tool(name))
        .map(|tool| &**tool)
        .collect();

    let run_all = || -> Vec<(String, ToolRun)> {
        tools
            .par_iter()
            .map(|tool| {
                let run = run_tool(*tool, package, ctx);
                ctx.observer.tool_finished(tool.name(), &run);
                (tool.name().to_string(), run)
            })
            .collect()
    };

    let runs = match ThreadPoolBuilder::new().num_threads(ctx.jobs).build() {
        Ok(pool) => pool.install(run_all),
        Err(e) => {
            warn!(error = %e, "could not build worker pool, using the global pool");
            run_all()
        }
    };

    ToolResults {
        runs: runs.into_iter().collect(),
    }
}

/// Default flags followed by the level flags the tool accepts.
///
/// A rejected flag written without `=value` also takes the bare token after
/// it, so `-f gcc` is dropped as a pair.
pub fn build_flags(tool: &dyn ToolPlugin, level_flags: &[String]) -> Vec<String> {
    let mut flags = tool.default_flags();
    let mut tokens = level_flags.iter().peekable();
    while let Some(flag) = tokens.next() {
        if tool.supports_flag(flag) {
            flags.push(flag.clone());
            continue;
        }
        debug!(tool = tool.name(), flag = %flag, "dropping unsupported flag");
        if !flag.contains('=') {
            if let Some(value) = tokens.next_if(|next| !next.starts_with('-')) {
                debug!(tool = tool.name(), value = %value, "dropping its value");
            }
        }
    }
    flags
}

fn run_tool(tool: &dyn ToolPlugin, package: &Package, ctx: &RunContext<'_>) -> ToolRun {
    let name = tool.name();
    let started = Instant::now();
    let requires = &tool.descriptor().requires;

    let outcome = if ctx.cancel.is_cancelled() {
        ToolOutcome::Cancelled
    } else if !requires.is_empty() && !requires.iter().any(|tag| package.has_sources(tag)) {
        debug!(tool = name, "no sources for tool, skipping");
        ToolOutcome::Completed(Vec::new())
    } else {
        let invocation = Invocation {
            level: &ctx.resolved.level,
            flags: build_flags(tool, ctx.resolved.flags_for(name)),
            timeout: ctx.run.timeout_for(name),
            cancel: ctx.cancel,
            cert_mapping: ctx.mappings.get(name),
        };
        match catch_unwind(AssertUnwindSafe(|| tool.scan(package, &invocation))) {
            Ok(Ok(issues)) => ToolOutcome::Completed(issues),
            Ok(Err(e)) => ToolOutcome::from(e),
            Err(panic) => ToolOutcome::Failed(panic_message(panic)),
        }
    };

    let elapsed = started.elapsed();
    match &outcome {
        ToolOutcome::Completed(issues) => {
            debug!(tool = name, issues = issues.len(), ?elapsed, "tool finished")
        }
        ToolOutcome::Cancelled => debug!(tool = name, "tool cancelled"),
        other => warn!(tool = name, outcome = %other, "tool could not run"),
    }
    ToolRun { outcome, elapsed }
}
