//! Domain model for validation facts.
//!
//! This module contains no serde and no I/O. Rule documents are
//! deserialized into the DTO types in [`crate::document`] and converted
//! into these validated types by the loader; regexes are compiled and
//! separator escapes decoded before a value of this module ever exists.

use regex::Regex;
use std::fmt;
use std::path::PathBuf;

// ────────────────────────────────────────────
// Severity and reports
// ────────────────────────────────────────────

/// Severity attached to a fact report.
///
/// All three levels count as failures when a fact misses its expected
/// value; they differ only in how the report line is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Informational mismatch, rendered as `NOTE`.
    Note,
    /// Mismatch worth attention, rendered as `WARN`.
    Warn,
    /// Hard mismatch, rendered as `FAIL`.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Note => write!(f, "note"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A human-targeted report attached to a fact.
#[derive(Debug, Clone)]
pub struct Report {
    message: String,
    severity: Severity,
    pass: Option<String>,
}

impl Report {
    /// Creates a new report.
    #[must_use]
    pub fn new(message: String, severity: Severity, pass: Option<String>) -> Self {
        Self {
            message,
            severity,
            pass,
        }
    }

    /// Returns the report message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the report severity.
    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Returns the value the fact must hold for the report to read PASS.
    #[must_use]
    pub fn expected(&self) -> &str {
        self.pass.as_deref().unwrap_or("true")
    }
}

// ────────────────────────────────────────────
// Expressions
// ────────────────────────────────────────────

/// A boolean expression over the fact store.
#[derive(Debug, Clone)]
pub enum Expression {
    /// Disjunction: true if any child is true; false when empty.
    Any(Vec<Expression>),
    /// Conjunction: true if all children are true; true when empty.
    All(Vec<Expression>),
    /// Leaf comparison against a single fact.
    Fact(FactMatch),
}

/// A leaf expression comparing one fact's value.
#[derive(Debug, Clone)]
pub struct FactMatch {
    name: String,
    test: MatchTest,
}

impl FactMatch {
    /// Creates a new fact comparison.
    #[must_use]
    pub fn new(name: String, test: MatchTest) -> Self {
        Self { name, test }
    }

    /// Returns the name of the fact being examined.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the comparison applied to the fact's value.
    #[must_use]
    pub fn test(&self) -> &MatchTest {
        &self.test
    }
}

/// How a [`FactMatch`] compares the fact's value.
#[derive(Debug, Clone)]
pub enum MatchTest {
    /// Exact string equality against the given literal.
    Equals(String),
    /// Unanchored regex search over the value.
    Regex(Regex),
    /// The fact merely has to be present.
    Exists,
}

// ────────────────────────────────────────────
// Parse rules
// ────────────────────────────────────────────

/// A string-extraction rule applied to a raw value.
#[derive(Debug, Clone)]
pub struct Parse {
    trim: bool,
    rule: ParseRule,
}

impl Parse {
    /// Creates a new parse rule; `trim` strips surrounding whitespace
    /// before any other processing.
    #[must_use]
    pub fn new(trim: bool, rule: ParseRule) -> Self {
        Self { trim, rule }
    }

    /// Returns whether surrounding whitespace is stripped first.
    #[must_use]
    pub fn trim(&self) -> bool {
        self.trim
    }

    /// Returns the extraction rule.
    #[must_use]
    pub fn rule(&self) -> &ParseRule {
        &self.rule
    }
}

/// The four extraction shapes a parse rule can take.
#[derive(Debug, Clone)]
pub enum ParseRule {
    /// Extract a single value, optionally through a regex capture.
    Scalar(ScalarRule),
    /// Split into an ordered list; children named by original index.
    List(ListRule),
    /// Split into a set; children named by the element itself.
    Set(SetRule),
    /// Split into key/value pairs; children named by the key.
    Dict(DictRule),
}

/// Scalar extraction: optional regex with a capturing-group index.
#[derive(Debug, Clone)]
pub struct ScalarRule {
    regex: Option<Regex>,
    group: usize,
}

impl ScalarRule {
    /// Creates a new scalar rule. `group` 0 selects the full match.
    #[must_use]
    pub fn new(regex: Option<Regex>, group: usize) -> Self {
        Self { regex, group }
    }

    /// Returns the extraction regex, if any.
    #[must_use]
    pub fn regex(&self) -> Option<&Regex> {
        self.regex.as_ref()
    }

    /// Returns the capturing-group index.
    #[must_use]
    pub fn group(&self) -> usize {
        self.group
    }
}

/// List extraction: split, skip, bound, then recurse per element.
#[derive(Debug, Clone)]
pub struct ListRule {
    separator: String,
    skip_head: usize,
    skip_tail: usize,
    limit: usize,
    parse: Option<Box<Parse>>,
}

impl ListRule {
    /// Creates a new list rule. A `limit` of zero keeps every survivor.
    #[must_use]
    pub fn new(
        separator: String,
        skip_head: usize,
        skip_tail: usize,
        limit: usize,
        parse: Option<Box<Parse>>,
    ) -> Self {
        Self {
            separator,
            skip_head,
            skip_tail,
            limit,
            parse,
        }
    }

    /// Returns the decoded element separator.
    #[must_use]
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Returns how many leading elements are discarded.
    #[must_use]
    pub fn skip_head(&self) -> usize {
        self.skip_head
    }

    /// Returns how many trailing elements are discarded.
    #[must_use]
    pub fn skip_tail(&self) -> usize {
        self.skip_tail
    }

    /// Returns the upper bound on kept elements (zero = unbounded).
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Returns the nested per-element parse rule, if any.
    #[must_use]
    pub fn parse(&self) -> Option<&Parse> {
        self.parse.as_deref()
    }
}

/// Set extraction: split, skip, optional regex per element.
#[derive(Debug, Clone)]
pub struct SetRule {
    separator: String,
    skip_head: usize,
    skip_tail: usize,
    regex: Option<Regex>,
    group: usize,
}

impl SetRule {
    /// Creates a new set rule.
    #[must_use]
    pub fn new(
        separator: String,
        skip_head: usize,
        skip_tail: usize,
        regex: Option<Regex>,
        group: usize,
    ) -> Self {
        Self {
            separator,
            skip_head,
            skip_tail,
            regex,
            group,
        }
    }

    /// Returns the decoded element separator.
    #[must_use]
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Returns how many leading elements are discarded.
    #[must_use]
    pub fn skip_head(&self) -> usize {
        self.skip_head
    }

    /// Returns how many trailing elements are discarded.
    #[must_use]
    pub fn skip_tail(&self) -> usize {
        self.skip_tail
    }

    /// Returns the per-element extraction regex, if any.
    #[must_use]
    pub fn regex(&self) -> Option<&Regex> {
        self.regex.as_ref()
    }

    /// Returns the capturing-group index used with the regex.
    #[must_use]
    pub fn group(&self) -> usize {
        self.group
    }
}

/// Dict extraction: split into pairs, then split key from value.
#[derive(Debug, Clone)]
pub struct DictRule {
    separator: String,
    delimiter: String,
    parse: Option<Box<Parse>>,
}

impl DictRule {
    /// Creates a new dict rule.
    #[must_use]
    pub fn new(separator: String, delimiter: String, parse: Option<Box<Parse>>) -> Self {
        Self {
            separator,
            delimiter,
            parse,
        }
    }

    /// Returns the decoded pair separator.
    #[must_use]
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Returns the decoded key/value delimiter.
    #[must_use]
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Returns the nested per-value parse rule, if any.
    #[must_use]
    pub fn parse(&self) -> Option<&Parse> {
        self.parse.as_deref()
    }
}

// ────────────────────────────────────────────
// Value sources
// ────────────────────────────────────────────

/// Where a fact's value comes from. Exactly one source per fact.
#[derive(Debug, Clone)]
pub enum ValueSource {
    /// A value produced by hard-coded engine logic (uname probes,
    /// driver hint).
    BuiltIn,
    /// `"true"`/`"false"` from evaluating an expression.
    Bool(Expression),
    /// Re-parse of another fact's value.
    String(StringSource),
    /// Contents of a file on disk.
    File(FileSource),
    /// One derived `"true"` fact per directory entry.
    DirEnt(DirEntSource),
    /// `"true"`/`"false"` from a file access-permission check.
    Access(AccessSource),
    /// Captured stdout of a command.
    Command(CommandSource),
}

/// Re-parse of another fact's value.
#[derive(Debug, Clone)]
pub struct StringSource {
    fact: String,
    parse: Option<Parse>,
}

impl StringSource {
    /// Creates a new string source.
    #[must_use]
    pub fn new(fact: String, parse: Option<Parse>) -> Self {
        Self { fact, parse }
    }

    /// Returns the name of the referenced fact.
    #[must_use]
    pub fn fact(&self) -> &str {
        &self.fact
    }

    /// Returns the parse rule applied to the referenced value.
    #[must_use]
    pub fn parse(&self) -> Option<&Parse> {
        self.parse.as_ref()
    }
}

/// Whole-file read.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    parse: Option<Parse>,
    ignore_missing: bool,
}

impl FileSource {
    /// Creates a new file source.
    #[must_use]
    pub fn new(path: PathBuf, parse: Option<Parse>, ignore_missing: bool) -> Self {
        Self {
            path,
            parse,
            ignore_missing,
        }
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Returns the parse rule applied to the file contents.
    #[must_use]
    pub fn parse(&self) -> Option<&Parse> {
        self.parse.as_ref()
    }

    /// Returns whether a missing file silently skips the fact.
    #[must_use]
    pub fn ignore_missing(&self) -> bool {
        self.ignore_missing
    }
}

/// Directory enumeration.
#[derive(Debug, Clone)]
pub struct DirEntSource {
    path: PathBuf,
    ignore_missing: bool,
}

impl DirEntSource {
    /// Creates a new directory source.
    #[must_use]
    pub fn new(path: PathBuf, ignore_missing: bool) -> Self {
        Self {
            path,
            ignore_missing,
        }
    }

    /// Returns the directory path.
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Returns whether a missing directory silently skips the fact.
    #[must_use]
    pub fn ignore_missing(&self) -> bool {
        self.ignore_missing
    }
}

/// Access-permission check.
#[derive(Debug, Clone)]
pub struct AccessSource {
    path: PathBuf,
    check: AccessCheck,
}

impl AccessSource {
    /// Creates a new access source.
    #[must_use]
    pub fn new(path: PathBuf, check: AccessCheck) -> Self {
        Self { path, check }
    }

    /// Returns the path being checked.
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Returns the permission being checked.
    #[must_use]
    pub fn check(&self) -> AccessCheck {
        self.check
    }
}

/// The permission an [`AccessSource`] verifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessCheck {
    /// The path exists.
    Exists,
    /// The path can be opened for reading.
    Readable,
    /// The path can be opened for writing.
    Writable,
    /// The path carries an execute permission bit.
    Executable,
}

/// Command execution with stdout capture.
///
/// Execution is synchronous with no timeout and no stdin; a
/// long-running command blocks the engine.
#[derive(Debug, Clone)]
pub struct CommandSource {
    name: String,
    args: Vec<String>,
    parse: Option<Parse>,
}

impl CommandSource {
    /// Creates a new command source.
    #[must_use]
    pub fn new(name: String, args: Vec<String>, parse: Option<Parse>) -> Self {
        Self { name, args, parse }
    }

    /// Returns the binary name, unqualified names resolve via `$PATH`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the arguments passed verbatim.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns the parse rule applied to captured stdout.
    #[must_use]
    pub fn parse(&self) -> Option<&Parse> {
        self.parse.as_ref()
    }
}

// ────────────────────────────────────────────
// Facts
// ────────────────────────────────────────────

/// A single validation rule: how to obtain one piece of host
/// information and, optionally, how to report on it.
#[derive(Debug, Clone)]
pub struct Fact {
    name: String,
    report: Option<Report>,
    hint: Option<String>,
    filter: Option<Expression>,
    value: ValueSource,
}

impl Fact {
    /// Creates a new fact.
    #[must_use]
    pub fn new(
        name: String,
        report: Option<Report>,
        hint: Option<String>,
        filter: Option<Expression>,
        value: ValueSource,
    ) -> Self {
        Self {
            name,
            report,
            hint,
            filter,
            value,
        }
    }

    /// Returns the dot-delimited fact name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the attached report, if any.
    #[must_use]
    pub fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    /// Returns the hint shown after a failed report, if any.
    #[must_use]
    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    /// Returns the filter gating evaluation, if any.
    #[must_use]
    pub fn filter(&self) -> Option<&Expression> {
        self.filter.as_ref()
    }

    /// Returns the value source.
    #[must_use]
    pub fn value(&self) -> &ValueSource {
        &self.value
    }
}

/// An ordered list of facts, the unit of loading and evaluation.
#[derive(Debug, Clone, Default)]
pub struct FactList {
    facts: Vec<Fact>,
}

impl FactList {
    /// Creates a fact list from the given facts, preserving order.
    #[must_use]
    pub fn new(facts: Vec<Fact>) -> Self {
        Self { facts }
    }

    /// Returns the facts in their current order.
    #[must_use]
    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }

    /// Returns the number of facts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    /// Returns true if the list holds no facts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Concatenates multiple lists into one, preserving order.
    #[must_use]
    pub fn merge(lists: Vec<FactList>) -> FactList {
        let facts = lists.into_iter().flat_map(|l| l.facts).collect();
        FactList::new(facts)
    }

    /// Reorders the facts so every fact follows the facts it
    /// references. See [`crate::resolver`] for the full contract.
    ///
    /// # Errors
    ///
    /// Returns an error on name-prefix collisions, unresolved
    /// references, or dependency cycles.
    pub fn sort(&mut self) -> Result<(), crate::resolver::ResolveError> {
        crate::resolver::sort(&mut self.facts)
    }
}
