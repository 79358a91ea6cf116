//! Tests for tool output parsers and flag handling
//!
//! Parsers run on captured output, so none of the tools need to be installed.

use lintmux_core::config::ToolDecl;
use lintmux_core::engine::build_flags;
use lintmux_core::plugin::tool::{
    self, cppcheck, hadolint, pycodestyle, shellcheck, CommandTool, CppcheckTool, HadolintTool,
    PycodestyleTool, ShellcheckTool,
};
use lintmux_core::{CancelToken, ConfigError, Invocation, Severity, ToolPlugin};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ROOT: &str = "/ws/pkg";

fn root() -> &'static Path {
    Path::new(ROOT)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ── shellcheck ──

#[test]
fn test_shellcheck_json() {
    let output = r#"[
        {"file":"scripts/build.sh","line":3,"endLine":3,"column":6,"endColumn":8,
         "level":"info","code":2086,"message":"Double quote to prevent globbing and word splitting.","fix":null},
        {"file":"/abs/run.sh","line":7,"endLine":7,"column":1,"endColumn":5,
         "level":"error","code":1073,"message":"Couldn't parse this function.","fix":null},
        {"file":"scripts/x.sh","line":1,"level":"warning","message":"no code"}
    ]"#;
    let issues = shellcheck::parse_output(output, root()).unwrap();
    assert_eq!(issues.len(), 2);

    assert_eq!(issues[0].filename, PathBuf::from("/ws/pkg/scripts/build.sh"));
    assert_eq!(issues[0].line_number, 3);
    assert_eq!(issues[0].tool, "shellcheck");
    assert_eq!(issues[0].issue_type, "SC2086");
    assert_eq!(issues[0].severity, Severity::MIN);

    assert_eq!(issues[1].filename, PathBuf::from("/abs/run.sh"));
    assert_eq!(issues[1].severity, Severity::MAX);
    assert!(issues[1].cert_reference.is_none());
}

#[test]
fn test_shellcheck_empty_and_invalid_output() {
    assert!(shellcheck::parse_output("", root()).unwrap().is_empty());
    assert!(shellcheck::parse_output("[]", root()).unwrap().is_empty());
    assert!(shellcheck::parse_output("not json", root()).is_err());
}

#[test]
fn test_level_severity_mapping() {
    assert_eq!(tool::level_severity("style"), Severity::MIN);
    assert_eq!(tool::level_severity("INFO"), Severity::MIN);
    assert_eq!(tool::level_severity("warning"), Severity::MEDIUM);
    assert_eq!(tool::level_severity("error"), Severity::MAX);
    assert_eq!(tool::level_severity("something-else"), Severity::MEDIUM);
}

// ── pycodestyle ──

#[test]
fn test_pycodestyle_lines() {
    let output = "\
pkg/a.py:12: [E501] line too long (120 > 100 characters)
pkg/b.py:1: [W291] trailing whitespace
not a finding
pkg/c.py:x: [E1] bad line number
pkg/d.py:4: [, W605] invalid escape sequence
";
    let issues = pycodestyle::parse_output(output, root());
    assert_eq!(issues.len(), 3);
    assert_eq!(issues[0].filename, PathBuf::from("/ws/pkg/pkg/a.py"));
    assert_eq!(issues[0].issue_type, "E501");
    assert_eq!(issues[0].message, "line too long (120 > 100 characters)");
    assert_eq!(issues[0].severity, Severity::MAX);
    assert_eq!(issues[1].line_number, 1);
    assert_eq!(issues[2].issue_type, "W605");
}

// ── cppcheck ──

#[test]
fn test_cppcheck_template_lines() {
    let mut mapping = BTreeMap::new();
    mapping.insert("nullPointer".to_string(), "EXP34-C".to_string());

    let output = "\
Checking src/main.c ...
[*] progress line
[src/main.c:10]: (error nullPointer) Null pointer dereference: p
[src/main.c:3]: (style variableScope) The scope of the variable 'i' can be reduced.
[src/util.cpp:3]: (style variableScope) The scope of the variable 'i' can be reduced.
[src/util.cpp:1]: (information missingInclude) Include file not found.
[README.md:1]: (error syntaxError) syntax error
[include/util.h:8]: (warning uninitvar) Uninitialized variable: x
";
    let issues = cppcheck::parse_output(output, root(), Some(&mapping));
    assert_eq!(issues.len(), 3);

    assert_eq!(issues[0].filename, PathBuf::from("/ws/pkg/src/main.c"));
    assert_eq!(issues[0].line_number, 10);
    assert_eq!(issues[0].issue_type, "error/nullPointer");
    assert_eq!(issues[0].message, "Null pointer dereference: p");
    assert_eq!(issues[0].cert_reference.as_deref(), Some("EXP34-C"));

    assert_eq!(issues[1].issue_type, "style/variableScope");
    assert_eq!(issues[1].filename, PathBuf::from("/ws/pkg/src/util.cpp"));
    assert!(issues[1].cert_reference.is_none());

    assert_eq!(issues[2].issue_type, "warning/uninitvar");
    assert!(issues.iter().all(|i| i.severity == Severity::MAX));
}

#[test]
fn test_cppcheck_without_mapping() {
    let issues = cppcheck::parse_output(
        "[a.cc:2]: (error nullPointer) Null pointer dereference\n",
        root(),
        None,
    );
    assert_eq!(issues.len(), 1);
    assert!(issues[0].cert_reference.is_none());
}

// ── hadolint ──

#[test]
fn test_hadolint_json() {
    let output = r#"[
        {"code":"DL3006","column":1,"file":"Dockerfile","level":"warning","line":1,"message":"Always tag the version of an image explicitly"},
        {"code":"SC2086","column":1,"file":"docker/Dockerfile.dev","level":"info","line":4,"message":"Double quote to prevent globbing"},
        {"code":"DL3000","column":1,"file":"Dockerfile","level":"error","line":2,"message":"Use absolute WORKDIR"}
    ]"#;
    let issues = hadolint::parse_output(output, root()).unwrap();
    assert_eq!(issues.len(), 3);
    assert_eq!(issues[0].issue_type, "DL3006");
    assert_eq!(issues[0].severity.value(), 3);
    assert_eq!(issues[1].severity, Severity::MIN);
    assert_eq!(issues[1].filename, PathBuf::from("/ws/pkg/docker/Dockerfile.dev"));
    assert_eq!(issues[2].severity, Severity::MAX);
    assert_eq!(issues[2].tool, "hadolint");
}

// ── Declared command tools ──

fn decl(pattern: &str) -> ToolDecl {
    ToolDecl {
        name: "yamllint".to_string(),
        command: "yamllint".to_string(),
        args: strings(&["-f", "parsable"]),
        requires: strings(&["yaml_src"]),
        pattern: pattern.to_string(),
        severity: 2,
        ok_exit_codes: vec![0, 1],
        unsupported_flags: strings(&["--strict"]),
    }
}

const YAMLLINT_PATTERN: &str =
    r"^(?P<file>[^:]+):(?P<line>\d+):\d+: \[(?P<severity>\w+)\] (?P<message>.+) \((?P<type>[\w-]+)\)$";

#[test]
fn test_command_tool_parses_named_groups() {
    let tool = CommandTool::from_decl(&decl(YAMLLINT_PATTERN)).unwrap();
    let output = "\
ci.yml:3:1: [warning] missing document start \"---\" (document-start)
ci.yml:9:81: [error] line too long (92 > 80 characters) (line-length)
garbage
";
    let issues = tool.parse_output(output, root(), None);
    assert_eq!(issues.len(), 2);
    assert_eq!(issues[0].tool, "yamllint");
    assert_eq!(issues[0].issue_type, "document-start");
    assert_eq!(issues[0].severity.value(), 3);
    assert_eq!(issues[1].severity, Severity::MAX);
    assert_eq!(issues[1].message, "line too long (92 > 80 characters)");
    assert_eq!(issues[1].filename, PathBuf::from("/ws/pkg/ci.yml"));
}

#[test]
fn test_command_tool_default_and_numeric_severity() {
    let tool = CommandTool::from_decl(&decl(
        r"^(?P<file>[^:]+):(?P<line>\d+): (?P<type>\w+) (?P<message>.+)$",
    ))
    .unwrap();
    let issues = tool.parse_output("a.yml:1: W1 message\n", root(), None);
    assert_eq!(issues[0].severity.value(), 2);

    let numeric = CommandTool::from_decl(&decl(
        r"^(?P<file>[^:]+):(?P<line>\d+):(?P<severity>\d+): (?P<type>\w+) (?P<message>.+)$",
    ))
    .unwrap();
    let issues = numeric.parse_output("a.yml:1:9: W1 message\n", root(), None);
    assert_eq!(issues[0].severity, Severity::MAX);
}

#[test]
fn test_command_tool_cert_mapping() {
    let tool = CommandTool::from_decl(&decl(YAMLLINT_PATTERN)).unwrap();
    let mut mapping = BTreeMap::new();
    mapping.insert("truthy".to_string(), "MSC00-X".to_string());
    let cancel = CancelToken::new();
    let invocation = Invocation {
        level: "default",
        flags: Vec::new(),
        timeout: Duration::from_secs(5),
        cancel: &cancel,
        cert_mapping: Some(&mapping),
    };

    let issues = tool.parse_output(
        "x.yml:2:7: [warning] truthy value should be one of [false, true] (truthy)\n",
        root(),
        Some(&invocation),
    );
    assert_eq!(issues[0].cert_reference.as_deref(), Some("MSC00-X"));
}

#[test]
fn test_command_tool_declaration_errors() {
    let missing_group = CommandTool::from_decl(&decl(r"^(?P<file>.+):(?P<line>\d+): (?P<message>.+)$"));
    assert!(matches!(missing_group, Err(ConfigError::InvalidPlugin { .. })));

    let bad_regex = CommandTool::from_decl(&decl(r"(?P<file>"));
    assert!(matches!(bad_regex, Err(ConfigError::InvalidPattern { .. })));

    let mut no_requires = decl(YAMLLINT_PATTERN);
    no_requires.requires.clear();
    assert!(matches!(
        CommandTool::from_decl(&no_requires),
        Err(ConfigError::InvalidPlugin { .. })
    ));

    let mut bad_severity = decl(YAMLLINT_PATTERN);
    bad_severity.severity = 9;
    assert!(matches!(
        CommandTool::from_decl(&bad_severity),
        Err(ConfigError::InvalidPlugin { .. })
    ));
}

// ── Flags ──

#[test]
fn test_build_flags_drops_unsupported() {
    let shellcheck = ShellcheckTool::new();
    let flags = build_flags(
        &shellcheck,
        &strings(&["--severity=style", "-f", "gcc", "--format=tty", "--enable=all"]),
    );
    assert_eq!(
        flags,
        strings(&["-f", "json", "--severity=style", "--enable=all"])
    );
}

#[test]
fn test_build_flags_keeps_next_option_after_rejected_flag() {
    let shellcheck = ShellcheckTool::new();
    let flags = build_flags(
        &shellcheck,
        &strings(&["--format", "-x", "--format=gcc", "checkstyle", "-a"]),
    );
    // `--format=gcc` carries its own value, so `checkstyle` is not consumed.
    assert_eq!(flags, strings(&["-f", "json", "-x", "checkstyle", "-a"]));
}

#[test]
fn test_builtin_default_flags() {
    let pycodestyle = PycodestyleTool::new();
    assert!(pycodestyle.default_flags()[0].starts_with("--format="));
    assert!(!pycodestyle.supports_flag("--format=pylint"));
    assert!(pycodestyle.supports_flag("--max-line-length=79"));

    let cppcheck = CppcheckTool::new();
    assert!(cppcheck
        .default_flags()
        .iter()
        .any(|f| f.starts_with("--template=")));
    assert!(!cppcheck.supports_flag("--xml"));
    assert!(cppcheck.supports_flag("--enable=warning"));

    let hadolint = HadolintTool::new();
    assert_eq!(hadolint.default_flags(), strings(&["--format", "json"]));
    assert!(!hadolint.supports_flag("--no-fail"));
    assert_eq!(hadolint.binary(), "hadolint");
}

#[test]
fn test_command_tool_flags() {
    let tool = CommandTool::from_decl(&decl(YAMLLINT_PATTERN)).unwrap();
    let flags = build_flags(&tool, &strings(&["--strict", "--no-warnings"]));
    assert_eq!(flags, strings(&["-f", "parsable", "--no-warnings"]));
}
