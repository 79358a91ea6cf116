//! Tests for the scan pipeline with in-process fake plugins

use lintmux_core::config::LintmuxConfig;
use lintmux_core::exceptions::ExceptionsFile;
use lintmux_core::{
    CancelToken, ConfigGraph, DiscoveryPlugin, Engine, Error, Exceptions, Invocation, Issue,
    Observer, Package, PackageReport, PluginDescriptor, PluginError, PluginRegistry, RunStatus,
    Severity, Silent, SourceSink, ToolOutcome, ToolPlugin, ToolRun,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

// ── Fake plugins ──

/// Records every `.txt` file under `txt_src`.
struct TextFiles {
    descriptor: PluginDescriptor,
}

impl DiscoveryPlugin for TextFiles {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn scan(
        &self,
        sink: &mut SourceSink<'_>,
        _level: &str,
        _exceptions: &Exceptions,
    ) -> Result<(), PluginError> {
        let found: Vec<PathBuf> = sink
            .package()
            .files()
            .iter()
            .filter(|p| p.extension().is_some_and(|e| e == "txt"))
            .cloned()
            .collect();
        sink.add("txt_src", found)?;
        Ok(())
    }
}

/// Always panics.
struct Exploding {
    descriptor: PluginDescriptor,
}

impl DiscoveryPlugin for Exploding {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn scan(
        &self,
        _sink: &mut SourceSink<'_>,
        _level: &str,
        _exceptions: &Exceptions,
    ) -> Result<(), PluginError> {
        panic!("discovery blew up");
    }
}

enum Behavior {
    /// One issue per line containing "FIXME" in each required file
    Report,
    Unavailable,
    Panic,
    /// Fails as if the external process hit its time limit
    Timeout,
}

struct FakeTool {
    descriptor: PluginDescriptor,
    behavior: Behavior,
}

impl FakeTool {
    fn new(name: &str, requires: &[&str], behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            descriptor: PluginDescriptor::tool(name, requires),
            behavior,
        })
    }
}

impl ToolPlugin for FakeTool {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn version(&self) -> Option<String> {
        None
    }

    fn scan(&self, package: &Package, invocation: &Invocation<'_>) -> Result<Vec<Issue>, PluginError> {
        match self.behavior {
            Behavior::Unavailable => Err(PluginError::Unavailable(format!(
                "{}: command not found",
                self.name()
            ))),
            Behavior::Panic => panic!("tool blew up"),
            Behavior::Timeout => Err(PluginError::Timeout(invocation.timeout)),
            Behavior::Report => {
                let mut issues = Vec::new();
                for tag in &self.descriptor.requires {
                    for file in package.sources(tag) {
                        let content = std::fs::read_to_string(file)
                            .map_err(|e| PluginError::Execution(e.to_string()))?;
                        for (idx, line) in content.lines().enumerate() {
                            if line.contains("FIXME") {
                                issues.push(Issue::new(
                                    file,
                                    idx + 1,
                                    self.name(),
                                    "fixme",
                                    Severity::new(4).unwrap(),
                                    format!("{} [{}]", line.trim(), invocation.level),
                                    invocation.cert_reference("fixme"),
                                ));
                            }
                        }
                    }
                }
                Ok(issues)
            }
        }
    }
}

fn registry() -> Arc<PluginRegistry> {
    let mut registry = PluginRegistry::new();
    registry
        .register_discovery(Arc::new(TextFiles {
            descriptor: PluginDescriptor::discovery("text", &["txt_src"], &[]),
        }))
        .unwrap();
    registry
        .register_discovery(Arc::new(Exploding {
            descriptor: PluginDescriptor::discovery("exploding", &["boom_src"], &[]),
        }))
        .unwrap();
    registry
        .register_tool(FakeTool::new("fixme", &["txt_src"], Behavior::Report))
        .unwrap();
    registry
        .register_tool(FakeTool::new("fixme-twin", &["txt_src"], Behavior::Report))
        .unwrap();
    registry
        .register_tool(FakeTool::new("missing", &["txt_src"], Behavior::Unavailable))
        .unwrap();
    registry
        .register_tool(FakeTool::new("panicky", &["txt_src"], Behavior::Panic))
        .unwrap();
    registry
        .register_tool(FakeTool::new("boom-tool", &["boom_src"], Behavior::Panic))
        .unwrap();
    registry
        .register_tool(FakeTool::new("slow", &["txt_src"], Behavior::Timeout))
        .unwrap();
    registry.validate().unwrap();
    Arc::new(registry)
}

const LEVELS: &str = r#"
[run]
default_level = "basic"
timeout_secs = 120

[run.timeouts]
slow = 7

[levels.basic]
enabled_plugins = ["text", "fixme"]

[levels.everything]
extends = "basic"
enabled_plugins = ["exploding", "fixme-twin", "missing", "panicky", "boom-tool"]

[levels.timed]
extends = "basic"
enabled_plugins = ["slow"]

[mappings.fixme]
fixme = "MSC01-X"
"#;

fn engine_with(exceptions: Exceptions) -> Engine {
    let config: LintmuxConfig = toml::from_str(LEVELS).unwrap();
    Engine::new(ConfigGraph::new(config).unwrap(), registry(), exceptions).with_jobs(2)
}

fn engine() -> Engine {
    engine_with(Exceptions::default())
}

fn exceptions(toml_str: &str) -> Exceptions {
    let file: ExceptionsFile = toml::from_str(toml_str).unwrap();
    Exceptions::compile(&file).unwrap()
}

fn package_dir(tmp: &TempDir, name: &str, files: &[(&str, &str)]) -> PathBuf {
    let dir = tmp.path().join(name);
    for (rel, contents) in files {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn open(dir: &Path) -> Package {
    Package::open(dir).unwrap()
}

// ── Single package ──

#[test]
fn test_default_level_scan() {
    let tmp = TempDir::new().unwrap();
    let dir = package_dir(
        &tmp,
        "notes",
        &[("a.txt", "ok\nFIXME later\n"), ("b.md", "FIXME not scanned\n")],
    );

    let report = engine().run_package(open(&dir), None, &Silent).unwrap();
    assert_eq!(report.level, "basic");
    assert!(!report.partial);
    assert_eq!(report.issues.len(), 1);

    let issue = &report.issues[0];
    assert_eq!(issue.line_number, 2);
    assert_eq!(issue.tool, "fixme");
    assert_eq!(issue.message, "FIXME later [basic]");
    assert_eq!(issue.cert_reference.as_deref(), Some("MSC01-X"));

    assert_eq!(report.discovery.runs.len(), 1);
    assert_eq!(report.discovery.runs[0].files_added, 1);
    assert_eq!(report.tools.runs.len(), 1);

    let summary = report.summary();
    assert_eq!(summary.total, 1);
    assert_eq!(summary.by_severity, [0, 0, 0, 1, 0]);
    assert_eq!(summary.status(), RunStatus::IssuesFound);
    assert!(!summary.incomplete());
}

#[test]
fn test_failures_are_isolated() {
    let tmp = TempDir::new().unwrap();
    let dir = package_dir(&tmp, "notes", &[("a.txt", "FIXME one\n")]);

    let report = engine()
        .run_package(open(&dir), Some("everything"), &Silent)
        .unwrap();

    // Both reporting tools ran; their issues differ by tool name so both stay.
    assert_eq!(report.issues.len(), 2);

    let runs = &report.tools.runs;
    assert!(matches!(runs["missing"].outcome, ToolOutcome::Unavailable(_)));
    match &runs["panicky"].outcome {
        ToolOutcome::Failed(msg) => assert!(msg.contains("tool blew up"), "{}", msg),
        other => panic!("unexpected outcome: {}", other),
    }
    // No files were ever tagged boom_src, so the tool is not invoked.
    assert_eq!(runs["boom-tool"].outcome, ToolOutcome::Completed(Vec::new()));

    let failed: Vec<&str> = report.discovery.failed().map(|r| r.plugin.as_str()).collect();
    assert_eq!(failed, vec!["exploding"]);

    let summary = report.summary();
    let not_run: Vec<&str> = summary.not_run.iter().map(|f| f.plugin.as_str()).collect();
    assert_eq!(not_run, vec!["missing", "panicky", "exploding"]);
    assert!(summary.not_run[0].reason.starts_with("unavailable"));
    assert!(summary.incomplete());
}

#[test]
fn test_exception_rules_applied() {
    let tmp = TempDir::new().unwrap();
    let dir = package_dir(
        &tmp,
        "notes",
        &[("keep.txt", "FIXME\n"), ("generated/skip.txt", "FIXME\n")],
    );

    let engine = engine_with(exceptions(
        r#"
[[suppress]]
file = "*/generated/*"
"#,
    ));
    let report = engine.run_package(open(&dir), None, &Silent).unwrap();
    assert_eq!(report.issues.len(), 1);
    assert!(report.issues[0].filename.ends_with("keep.txt"));
    assert_eq!(report.suppressed.len(), 1);
    assert_eq!(report.summary().suppressed, 1);
}

#[test]
fn test_excluded_paths_never_reach_tools() {
    let tmp = TempDir::new().unwrap();
    let dir = package_dir(
        &tmp,
        "notes",
        &[("a.txt", "FIXME\n"), ("vendor/b.txt", "FIXME\n")],
    );

    let engine = engine_with(exceptions(r#"exclude = ["*/vendor/*"]"#));
    let report = engine.run_package(open(&dir), None, &Silent).unwrap();
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.discovery.runs[0].files_added, 1);
}

#[test]
fn test_inline_nolint_through_pipeline() {
    let tmp = TempDir::new().unwrap();
    let dir = package_dir(&tmp, "notes", &[("a.txt", "FIXME ok  NOLINT\nFIXME real\n")]);

    let report = engine().run_package(open(&dir), None, &Silent).unwrap();
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].line_number, 2);
    assert_eq!(report.suppressed[0].reason, "inline NOLINT");
}

#[test]
fn test_unknown_level_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let dir = package_dir(&tmp, "notes", &[("a.txt", "x\n")]);
    let err = engine()
        .run_package(open(&dir), Some("nope"), &Silent)
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_cancelled_run_is_partial() {
    let tmp = TempDir::new().unwrap();
    let dir = package_dir(&tmp, "notes", &[("a.txt", "FIXME\n")]);

    let cancel = CancelToken::new();
    cancel.cancel();
    let engine = engine().with_cancel_token(cancel);
    let report = engine.run_package(open(&dir), None, &Silent).unwrap();

    assert!(report.partial);
    assert!(report.discovery.interrupted);
    assert!(report.issues.is_empty());
    assert_eq!(report.tools.runs["fixme"].outcome, ToolOutcome::Cancelled);
    assert!(report.summary().partial);
}

#[test]
fn test_timed_out_tool_contributes_nothing() {
    let tmp = TempDir::new().unwrap();
    let dir = package_dir(&tmp, "notes", &[("a.txt", "FIXME one\n")]);

    let report = engine()
        .run_package(open(&dir), Some("timed"), &Silent)
        .unwrap();

    // The per-plugin override reaches the invocation, not the run-wide default.
    assert_eq!(
        report.tools.runs["slow"].outcome,
        ToolOutcome::TimedOut(Duration::from_secs(7))
    );
    let issue_map = report.tools.issue_map();
    assert_eq!(issue_map["slow"], None);
    assert!(issue_map["fixme"].is_some());

    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].tool, "fixme");
    assert!(!report.partial);

    let summary = report.summary();
    assert_eq!(summary.not_run.len(), 1);
    assert_eq!(summary.not_run[0].plugin, "slow");
    assert_eq!(summary.not_run[0].reason, "timed out after 7s");
    assert!(summary.incomplete());
}

// ── Observer ──

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Observer for Recorder {
    fn package_started(&self, package: &Package, level: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("start {} {}", package.name, level));
    }

    fn tool_finished(&self, tool: &str, _run: &ToolRun) {
        self.events.lock().unwrap().push(format!("tool {}", tool));
    }

    fn package_finished(&self, report: &PackageReport) {
        self.events
            .lock()
            .unwrap()
            .push(format!("finish {}", report.package));
    }
}

#[test]
fn test_observer_sees_each_phase() {
    let tmp = TempDir::new().unwrap();
    let dir = package_dir(&tmp, "notes", &[("a.txt", "x\n")]);

    let recorder = Recorder::default();
    engine().run_package(open(&dir), None, &recorder).unwrap();
    let events = recorder.events.into_inner().unwrap();
    assert_eq!(events, vec!["start notes basic", "tool fixme", "finish notes"]);
}

// ── Workspace ──

#[test]
fn test_workspace_scan() {
    let tmp = TempDir::new().unwrap();
    package_dir(&tmp, "alpha", &[("package.json", "{}"), ("a.txt", "FIXME\n")]);
    package_dir(&tmp, "beta", &[("go.mod", "module beta\n"), ("b.txt", "FIXME\nFIXME\n")]);
    package_dir(&tmp, "vendored", &[("setup.py", ""), ("c.txt", "FIXME\n")]);
    package_dir(&tmp, "loose", &[("d.txt", "FIXME\n")]);

    let engine = engine_with(exceptions(r#"ignore_packages = ["vendored"]"#));
    let report = engine
        .run_workspace(tmp.path(), &[], None, &Silent)
        .unwrap();

    let names: Vec<&str> = report.packages.iter().map(|p| p.package.as_str()).collect();
    assert_eq!(names, vec!["alpha", "beta"]);
    assert_eq!(report.skipped, vec!["vendored"]);
    assert_eq!(report.packages[0].package_type.as_deref(), Some("npm"));

    let summary = report.summary();
    assert_eq!(summary.packages, 2);
    assert_eq!(summary.total, 3);
    assert!(summary.exceeds_threshold(4));
    assert!(!summary.exceeds_threshold(5));
    assert!(!summary.exceeds_threshold(0));
}

#[test]
fn test_workspace_only_filter() {
    let tmp = TempDir::new().unwrap();
    package_dir(&tmp, "alpha", &[("package.json", "{}")]);
    package_dir(&tmp, "beta", &[("go.mod", "module beta\n")]);

    let report = engine()
        .run_workspace(tmp.path(), &["beta".to_string()], None, &Silent)
        .unwrap();
    assert_eq!(report.packages.len(), 1);
    assert_eq!(report.packages[0].package, "beta");
}
