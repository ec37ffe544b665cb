//! The evaluation engine: runs each fact's value acquisition in
//! dependency order, accumulates the fact store and reports results.
//!
//! Evaluation is single-threaded and deterministic. File reads,
//! directory enumeration and subprocess execution all block; there is
//! no timeout on subprocesses.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};

use tracing::debug;

use crate::fact::{
    AccessCheck, AccessSource, CommandSource, DirEntSource, Expression, Fact, FactList,
    FileSource, MatchTest, Parse, Severity, StringSource, ValueSource,
};
use crate::parse;
use crate::probe::{HostProbe, SystemProbe};
use crate::resolver::ResolveError;

const GREEN: &str = "\x1b[32m";
const BLUE: &str = "\x1b[34m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Fatal errors that abort evaluation.
///
/// Facts that merely miss their expected value are not errors; they are
/// counted and reported, and evaluation continues.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The fact list could not be ordered.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// A `builtin` fact uses a name the engine does not recognize.
    #[error("unknown built-in fact '{name}'")]
    UnknownBuiltIn {
        /// The unrecognized fact name.
        name: String,
    },

    /// A `string` source references a fact with no value. The resolver
    /// guarantees the reference is declared, so this occurs only when
    /// the referenced fact was skipped by its own filter.
    #[error("fact '{name}' is not present")]
    MissingFact {
        /// The absent fact.
        name: String,
    },

    /// A file or directory could not be read.
    #[error("cannot read {path}: {source}")]
    Read {
        /// The unreadable path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A command could not be launched.
    #[error("cannot launch command '{name}': {source}")]
    Spawn {
        /// The command name.
        name: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A command exited with a non-zero status.
    #[error("command '{name}' failed: {status}")]
    CommandFailed {
        /// The command name.
        name: String,
        /// The exit status.
        status: ExitStatus,
    },
}

/// What the engine writes to stdout while evaluating.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputMode {
    /// Trace every `Set fact 'name' = 'value'` as it happens.
    pub show_facts: bool,
    /// Emit the human-targeted `Checking ... PASS/FAIL` report lines.
    pub show_reports: bool,
}

/// Evaluates a fact list against the host, accumulating the fact store.
///
/// The store lives as long as the engine; one engine performs one
/// validation run.
pub struct Engine {
    facts: HashMap<String, String>,
    failures: u64,
    output: OutputMode,
    driver: Option<String>,
    probe: Box<dyn HostProbe>,
}

impl Engine {
    /// Creates an engine probing the host the process runs on. `driver`
    /// is the externally supplied hint for the `libvirt.driver`
    /// built-in.
    #[must_use]
    pub fn new(output: OutputMode, driver: Option<String>) -> Self {
        Self::with_probe(output, driver, Box::new(SystemProbe))
    }

    /// Creates an engine with a custom host probe.
    #[must_use]
    pub fn with_probe(
        output: OutputMode,
        driver: Option<String>,
        probe: Box<dyn HostProbe>,
    ) -> Self {
        Self {
            facts: HashMap::new(),
            failures: 0,
            output,
            driver,
            probe,
        }
    }

    /// Returns the value of a fact, if set.
    #[must_use]
    pub fn fact(&self, name: &str) -> Option<&str> {
        self.facts.get(name).map(String::as_str)
    }

    /// Returns the number of facts that missed their expected value.
    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Sorts the facts and evaluates them in order, returning the
    /// failure count (zero means every check passed).
    ///
    /// # Errors
    ///
    /// Returns an error if sorting fails or any fact hits a fatal
    /// condition; the store keeps whatever was set before the abort.
    pub fn validate(&mut self, mut facts: FactList) -> Result<u64, EngineError> {
        facts.sort()?;
        for fact in facts.facts() {
            self.validate_fact(fact)?;
        }
        Ok(self.failures)
    }

    /// Evaluates a boolean expression against the current store.
    /// A referenced fact that is absent evaluates to false.
    #[must_use]
    pub fn eval_expression(&self, expr: &Expression) -> bool {
        match expr {
            Expression::Any(children) => children.iter().any(|c| self.eval_expression(c)),
            Expression::All(children) => children.iter().all(|c| self.eval_expression(c)),
            Expression::Fact(leaf) => {
                let Some(value) = self.facts.get(leaf.name()) else {
                    return false;
                };
                match leaf.test() {
                    MatchTest::Exists => true,
                    MatchTest::Regex(regex) => regex.is_match(value),
                    MatchTest::Equals(expected) => value == expected,
                }
            }
        }
    }

    fn set_fact(&mut self, name: String, value: String) {
        if self.output.show_facts {
            println!("Set fact '{name}' = '{value}'");
        }
        self.facts.insert(name, value);
    }

    fn apply_parse(&mut self, parse: Option<&Parse>, context: &str, value: &str) {
        let mut sink = |name: String, value: String| self.set_fact(name, value);
        parse::apply(parse, context, value, &mut sink);
    }

    fn pass(&self, fact: &Fact) {
        if fact.report().is_none() {
            return;
        }
        if self.output.show_reports {
            println!("{GREEN}PASS{RESET}");
        }
    }

    fn fail(&mut self, fact: &Fact) {
        self.failures += 1;
        let Some(report) = fact.report() else {
            return;
        };
        if !self.output.show_reports {
            return;
        }
        let hint = fact
            .hint()
            .map(|h| format!(" ({h})"))
            .unwrap_or_default();
        match report.severity() {
            Severity::Note => println!("{BLUE}NOTE{RESET}{hint}"),
            Severity::Warn => println!("{YELLOW}WARN{RESET}{hint}"),
            Severity::Error => println!("{RED}FAIL{RESET}{hint}"),
        }
    }

    fn validate_fact(&mut self, fact: &Fact) -> Result<(), EngineError> {
        if let Some(filter) = fact.filter() {
            if !self.eval_expression(filter) {
                debug!("skipping fact '{}': filter not satisfied", fact.name());
                return Ok(());
            }
        }

        if self.output.show_reports {
            if let Some(report) = fact.report() {
                print!("Checking {}...", report.message());
                let _ = std::io::stdout().flush();
            }
        }

        match fact.value() {
            ValueSource::BuiltIn => self.set_value_builtin(fact),
            ValueSource::Bool(expr) => {
                self.set_value_bool(fact, expr);
                Ok(())
            }
            ValueSource::String(source) => self.set_value_string(fact, source),
            ValueSource::File(source) => self.set_value_file(fact, source),
            ValueSource::DirEnt(source) => self.set_value_dirent(fact, source),
            ValueSource::Access(source) => {
                self.set_value_access(fact, source);
                Ok(())
            }
            ValueSource::Command(source) => self.set_value_command(fact, source),
        }
    }

    fn set_value_builtin(&mut self, fact: &Fact) -> Result<(), EngineError> {
        match fact.name() {
            "os.kernel" => {
                let kernel = self.probe.kernel();
                self.set_fact(fact.name().to_string(), kernel);
            }
            "os.release" => {
                let release = self.probe.release();
                self.set_fact(fact.name().to_string(), release);
            }
            "os.version" => {
                let version = self.probe.version();
                self.set_fact(fact.name().to_string(), version);
            }
            "cpu.arch" => {
                let arch = self.probe.arch();
                self.set_fact(fact.name().to_string(), arch);
            }
            "libvirt.driver" => {
                if let Some(driver) = self.driver.clone() {
                    self.set_fact(format!("{}.{driver}", fact.name()), "true".to_string());
                } else {
                    let os = self.probe.os().to_string();
                    match os.as_str() {
                        "linux" => {
                            self.set_fact(format!("{}.qemu", fact.name()), "true".to_string());
                            self.set_fact(format!("{}.lxc", fact.name()), "true".to_string());
                            self.set_fact(
                                format!("{}.parallels", fact.name()),
                                "true".to_string(),
                            );
                        }
                        "freebsd" => {
                            self.set_fact(format!("{}.bhyve", fact.name()), "true".to_string());
                        }
                        _ => {}
                    }
                }
            }
            other => {
                return Err(EngineError::UnknownBuiltIn {
                    name: other.to_string(),
                })
            }
        }
        Ok(())
    }

    fn set_value_bool(&mut self, fact: &Fact, expr: &Expression) {
        let got = if self.eval_expression(expr) {
            "true"
        } else {
            "false"
        };
        let want = fact.report().map_or("true", |r| r.expected());
        self.set_fact(fact.name().to_string(), got.to_string());
        if got == want {
            self.pass(fact);
        } else {
            self.fail(fact);
        }
    }

    fn set_value_string(&mut self, fact: &Fact, source: &StringSource) -> Result<(), EngineError> {
        let value = self
            .facts
            .get(source.fact())
            .cloned()
            .ok_or_else(|| EngineError::MissingFact {
                name: source.fact().to_string(),
            })?;
        self.apply_parse(source.parse(), fact.name(), &value);
        Ok(())
    }

    fn set_value_file(&mut self, fact: &Fact, source: &FileSource) -> Result<(), EngineError> {
        let data = match std::fs::read(source.path()) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && source.ignore_missing() => {
                debug!("skipping fact '{}': {} is missing", fact.name(), source.path().display());
                return Ok(());
            }
            Err(e) => {
                return Err(EngineError::Read {
                    path: source.path().clone(),
                    source: e,
                })
            }
        };
        let value = String::from_utf8_lossy(&data);
        self.apply_parse(source.parse(), fact.name(), &value);
        Ok(())
    }

    fn set_value_dirent(&mut self, fact: &Fact, source: &DirEntSource) -> Result<(), EngineError> {
        let entries = match std::fs::read_dir(source.path()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && source.ignore_missing() => {
                debug!("skipping fact '{}': {} is missing", fact.name(), source.path().display());
                return Ok(());
            }
            Err(e) => {
                return Err(EngineError::Read {
                    path: source.path().clone(),
                    source: e,
                })
            }
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| EngineError::Read {
                path: source.path().clone(),
                source: e,
            })?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();

        for name in names {
            self.set_fact(format!("{}.{name}", fact.name()), "true".to_string());
        }
        Ok(())
    }

    fn set_value_access(&mut self, fact: &Fact, source: &AccessSource) {
        let path = source.path();
        let granted = match source.check() {
            AccessCheck::Exists => path.exists(),
            AccessCheck::Readable => std::fs::File::open(path).is_ok(),
            AccessCheck::Writable => std::fs::OpenOptions::new().write(true).open(path).is_ok(),
            AccessCheck::Executable => is_executable(path),
        };
        if granted {
            self.set_fact(fact.name().to_string(), "true".to_string());
            self.pass(fact);
        } else {
            self.set_fact(fact.name().to_string(), "false".to_string());
            self.fail(fact);
        }
    }

    fn set_value_command(&mut self, fact: &Fact, source: &CommandSource) -> Result<(), EngineError> {
        let output = Command::new(source.name())
            .args(source.args())
            .output()
            .map_err(|e| EngineError::Spawn {
                name: source.name().to_string(),
                source: e,
            })?;
        if !output.status.success() {
            return Err(EngineError::CommandFailed {
                name: source.name().to_string(),
                status: output.status,
            });
        }
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        self.apply_parse(source.parse(), fact.name(), &stdout);
        Ok(())
    }
}

#[cfg(unix)]
fn is_executable(path: &std::path::Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path).is_ok_and(|m| m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &std::path::Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::load_str;
    #[cfg(unix)]
    use std::io::Write as _;

    /// Probe with canned answers so tests are host-independent.
    struct FakeProbe {
        kernel: &'static str,
        os: &'static str,
    }

    impl FakeProbe {
        fn linux() -> Self {
            Self {
                kernel: "Linux",
                os: "linux",
            }
        }

        fn darwin() -> Self {
            Self {
                kernel: "Darwin",
                os: "macos",
            }
        }
    }

    impl HostProbe for FakeProbe {
        fn kernel(&self) -> String {
            self.kernel.to_string()
        }

        fn release(&self) -> String {
            "5.15.0-test".to_string()
        }

        fn version(&self) -> String {
            "#1 SMP test".to_string()
        }

        fn arch(&self) -> String {
            "x86_64".to_string()
        }

        fn os(&self) -> &str {
            self.os
        }
    }

    fn engine(probe: FakeProbe) -> Engine {
        Engine::with_probe(OutputMode::default(), None, Box::new(probe))
    }

    fn validate(engine: &mut Engine, doc: &str) -> Result<u64, EngineError> {
        engine.validate(load_str(doc).expect("document should load"))
    }

    // -- Built-ins --

    #[test]
    fn builtin_kernel_sets_fact_and_passes() {
        let mut engine = engine(FakeProbe::linux());
        let failed = validate(
            &mut engine,
            r"
facts:
  - name: os.kernel
    value: { builtin: {} }
",
        )
        .unwrap();

        assert_eq!(failed, 0);
        assert_eq!(engine.fact("os.kernel"), Some("Linux"));
    }

    #[test]
    fn builtin_driver_hint_sets_single_child() {
        let mut engine = Engine::with_probe(
            OutputMode::default(),
            Some("qemu".to_string()),
            Box::new(FakeProbe::linux()),
        );
        validate(
            &mut engine,
            r"
facts:
  - name: libvirt.driver
    value: { builtin: {} }
",
        )
        .unwrap();

        assert_eq!(engine.fact("libvirt.driver.qemu"), Some("true"));
        assert_eq!(engine.fact("libvirt.driver.lxc"), None);
    }

    #[test]
    fn builtin_driver_autodetects_on_linux() {
        let mut engine = engine(FakeProbe::linux());
        validate(
            &mut engine,
            r"
facts:
  - name: libvirt.driver
    value: { builtin: {} }
",
        )
        .unwrap();

        assert_eq!(engine.fact("libvirt.driver.qemu"), Some("true"));
        assert_eq!(engine.fact("libvirt.driver.lxc"), Some("true"));
        assert_eq!(engine.fact("libvirt.driver.parallels"), Some("true"));
    }

    #[test]
    fn builtin_unknown_name_is_fatal() {
        let mut engine = engine(FakeProbe::linux());
        let err = validate(
            &mut engine,
            r"
facts:
  - name: os.hostname
    value: { builtin: {} }
",
        )
        .unwrap_err();

        assert!(matches!(err, EngineError::UnknownBuiltIn { ref name } if name == "os.hostname"));
    }

    // -- Bool --

    #[test]
    fn bool_equality_passes() {
        let mut engine = engine(FakeProbe::linux());
        let failed = validate(
            &mut engine,
            r#"
facts:
  - name: os.kernel
    value: { builtin: {} }
  - name: os.is.linux
    report:
      message: running on Linux
      pass: "true"
    value:
      bool:
        fact: { name: os.kernel, value: Linux }
"#,
        )
        .unwrap();

        assert_eq!(failed, 0);
        assert_eq!(engine.fact("os.is.linux"), Some("true"));
    }

    #[test]
    fn bool_mismatch_counts_as_failure() {
        let mut engine = engine(FakeProbe::darwin());
        let failed = validate(
            &mut engine,
            r"
facts:
  - name: os.kernel
    value: { builtin: {} }
  - name: os.is.linux
    report:
      message: running on Linux
    value:
      bool:
        fact: { name: os.kernel, value: Linux }
",
        )
        .unwrap();

        assert_eq!(failed, 1);
        assert_eq!(engine.fact("os.is.linux"), Some("false"));
    }

    #[test]
    fn bool_pass_literal_inverts_expectation() {
        let mut engine = engine(FakeProbe::linux());
        let failed = validate(
            &mut engine,
            r#"
facts:
  - name: os.kernel
    value: { builtin: {} }
  - name: os.not.windows
    report:
      message: not on Windows
      pass: "false"
    value:
      bool:
        fact: { name: os.kernel, value: Windows_NT }
"#,
        )
        .unwrap();

        assert_eq!(failed, 0);
        assert_eq!(engine.fact("os.not.windows"), Some("false"));
    }

    #[test]
    fn note_severity_still_counts_as_failure() {
        let mut engine = engine(FakeProbe::darwin());
        let failed = validate(
            &mut engine,
            r"
facts:
  - name: os.kernel
    value: { builtin: {} }
  - name: os.is.linux
    report:
      message: running on Linux
      level: note
    value:
      bool:
        fact: { name: os.kernel, value: Linux }
",
        )
        .unwrap();

        assert_eq!(failed, 1);
    }

    #[test]
    fn bool_without_report_counts_failure_silently() {
        let mut engine = engine(FakeProbe::darwin());
        let failed = validate(
            &mut engine,
            r"
facts:
  - name: os.kernel
    value: { builtin: {} }
  - name: os.is.linux
    value:
      bool:
        fact: { name: os.kernel, value: Linux }
",
        )
        .unwrap();

        assert_eq!(failed, 1);
    }

    // -- Filters --

    #[test]
    fn filter_false_skips_silently() {
        let mut engine = engine(FakeProbe::darwin());
        let failed = validate(
            &mut engine,
            r"
facts:
  - name: os.kernel
    value: { builtin: {} }
  - name: cpu.vmx
    report:
      message: for VMX support
    filter:
      fact: { name: os.kernel, value: Linux }
    value:
      bool:
        fact: { name: os.kernel, match: exists }
",
        )
        .unwrap();

        assert_eq!(failed, 0);
        assert_eq!(engine.fact("cpu.vmx"), None);
    }

    #[test]
    fn filter_on_regex_match() {
        let mut engine = engine(FakeProbe::linux());
        validate(
            &mut engine,
            r"
facts:
  - name: os.kernel
    value: { builtin: {} }
  - name: os.unixlike
    filter:
      fact: { name: os.kernel, value: 'Linux|Darwin', match: regex }
    value:
      bool:
        fact: { name: os.kernel, match: exists }
",
        )
        .unwrap();

        assert_eq!(engine.fact("os.unixlike"), Some("true"));
    }

    // -- Expression shapes --

    #[test]
    fn empty_any_is_false_and_empty_all_is_true() {
        let engine = engine(FakeProbe::linux());
        assert!(!engine.eval_expression(&Expression::Any(Vec::new())));
        assert!(engine.eval_expression(&Expression::All(Vec::new())));
    }

    // -- String --

    #[test]
    fn string_reparses_referenced_fact() {
        let mut engine = engine(FakeProbe::linux());
        validate(
            &mut engine,
            r"
facts:
  - name: os.release
    value: { builtin: {} }
  - name: kernel.major
    value:
      string:
        fact: os.release
        parse:
          scalar:
            regex: '^(\d+)\.'
            match: 1
",
        )
        .unwrap();

        assert_eq!(engine.fact("kernel.major"), Some("5"));
    }

    #[test]
    fn string_referencing_skipped_fact_is_fatal() {
        let mut engine = engine(FakeProbe::linux());
        let err = validate(
            &mut engine,
            r"
facts:
  - name: src
    value:
      file:
        path: /nonexistent/host-validate-test
        ignoreMissing: true
  - name: derived
    value:
      string: { fact: src }
",
        )
        .unwrap_err();

        assert!(matches!(err, EngineError::MissingFact { ref name } if name == "src"));
    }

    // -- File --

    #[test]
    fn file_dict_parse_derives_keyed_facts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("example");
        std::fs::write(&path, "a=1\nb=2\n").unwrap();

        let mut engine = engine(FakeProbe::linux());
        let failed = validate(
            &mut engine,
            &format!(
                r"
facts:
  - name: ex
    value:
      file:
        path: {}
        parse:
          dict:
            separator: '\n'
            delimiter: '='
",
                path.display()
            ),
        )
        .unwrap();

        assert_eq!(failed, 0);
        assert_eq!(engine.fact("ex.a"), Some("1"));
        assert_eq!(engine.fact("ex.b"), Some("2"));
    }

    #[test]
    fn file_missing_without_ignore_is_fatal() {
        let mut engine = engine(FakeProbe::linux());
        let err = validate(
            &mut engine,
            r"
facts:
  - name: ex
    value:
      file:
        path: /nonexistent/host-validate-test
",
        )
        .unwrap_err();

        assert!(matches!(err, EngineError::Read { .. }));
    }

    // -- DirEnt --

    #[test]
    fn dirent_derives_one_fact_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("kvm"), "").unwrap();
        std::fs::write(dir.path().join("tun"), "").unwrap();

        let mut engine = engine(FakeProbe::linux());
        validate(
            &mut engine,
            &format!(
                r"
facts:
  - name: dev
    value:
      dirent:
        path: {}
",
                dir.path().display()
            ),
        )
        .unwrap();

        assert_eq!(engine.fact("dev.kvm"), Some("true"));
        assert_eq!(engine.fact("dev.tun"), Some("true"));
    }

    #[test]
    fn dirent_missing_with_ignore_skips() {
        let mut engine = engine(FakeProbe::linux());
        let failed = validate(
            &mut engine,
            r"
facts:
  - name: dev
    value:
      dirent:
        path: /nonexistent/host-validate-test
        ignoreMissing: true
",
        )
        .unwrap();

        assert_eq!(failed, 0);
        assert_eq!(engine.fact("dev"), None);
    }

    // -- Access --

    #[test]
    fn access_exists_passes_and_sets_true() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("present");
        std::fs::write(&path, "").unwrap();

        let mut engine = engine(FakeProbe::linux());
        let failed = validate(
            &mut engine,
            &format!(
                r"
facts:
  - name: dev.present
    report:
      message: if the device exists
    value:
      access:
        path: {}
        check: exists
",
                path.display()
            ),
        )
        .unwrap();

        assert_eq!(failed, 0);
        assert_eq!(engine.fact("dev.present"), Some("true"));
    }

    #[test]
    fn access_missing_fails_and_sets_false() {
        let mut engine = engine(FakeProbe::linux());
        let failed = validate(
            &mut engine,
            r"
facts:
  - name: dev.present
    report:
      message: if the device exists
    value:
      access:
        path: /nonexistent/host-validate-test
        check: exists
",
        )
        .unwrap();

        assert_eq!(failed, 1);
        assert_eq!(engine.fact("dev.present"), Some("false"));
    }

    #[cfg(unix)]
    #[test]
    fn access_executable_checks_mode_bits() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tool");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"#!/bin/sh\n").unwrap();
        drop(file);
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut engine = engine(FakeProbe::linux());
        let failed = validate(
            &mut engine,
            &format!(
                r"
facts:
  - name: tool.exec
    value:
      access:
        path: {}
        check: executable
",
                path.display()
            ),
        )
        .unwrap();

        assert_eq!(failed, 0);
        assert_eq!(engine.fact("tool.exec"), Some("true"));
    }

    // -- Command --

    #[test]
    fn command_stdout_is_parsed() {
        let mut engine = engine(FakeProbe::linux());
        validate(
            &mut engine,
            r"
facts:
  - name: greeting
    value:
      command:
        name: echo
        args: [hello, world]
        parse:
          whitespace: trim
          scalar: {}
",
        )
        .unwrap();

        assert_eq!(engine.fact("greeting"), Some("hello world"));
    }

    #[test]
    fn command_nonzero_exit_is_fatal() {
        let mut engine = engine(FakeProbe::linux());
        let err = validate(
            &mut engine,
            r"
facts:
  - name: broken
    value:
      command:
        name: 'false'
",
        )
        .unwrap_err();

        assert!(matches!(err, EngineError::CommandFailed { .. }));
    }

    #[test]
    fn command_missing_binary_is_fatal() {
        let mut engine = engine(FakeProbe::linux());
        let err = validate(
            &mut engine,
            r"
facts:
  - name: broken
    value:
      command:
        name: host-validate-no-such-binary
",
        )
        .unwrap_err();

        assert!(matches!(err, EngineError::Spawn { .. }));
    }

    // -- Ordering through the engine --

    #[test]
    fn cycle_aborts_validation() {
        let mut engine = engine(FakeProbe::linux());
        let err = validate(
            &mut engine,
            r"
facts:
  - name: a
    value:
      string: { fact: b }
  - name: b
    value:
      string: { fact: a }
",
        )
        .unwrap_err();

        assert!(matches!(err, EngineError::Resolve(ResolveError::Cycle { .. })));
    }

    #[test]
    fn facts_declared_out_of_order_still_evaluate() {
        let mut engine = engine(FakeProbe::linux());
        let failed = validate(
            &mut engine,
            r"
facts:
  - name: os.is.linux
    value:
      bool:
        fact: { name: os.kernel, value: Linux }
  - name: os.kernel
    value: { builtin: {} }
",
        )
        .unwrap();

        assert_eq!(failed, 0);
        assert_eq!(engine.fact("os.is.linux"), Some("true"));
    }
}
