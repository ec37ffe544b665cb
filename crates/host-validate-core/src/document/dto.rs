//! YAML deserialization types (DTO layer).
//!
//! These types exist solely for serde deserialization of rule
//! documents. They are converted to the domain model in
//! [`crate::fact`] via the loader, which is where all validation
//! happens — here every union is a bag of optional fields.

use serde::Deserialize;

/// Raw YAML representation of a rule document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FactListDto {
    /// The facts, in document order.
    #[serde(default)]
    pub facts: Vec<FactDto>,
}

/// YAML representation of a single fact.
#[derive(Debug, Clone, Deserialize)]
pub struct FactDto {
    /// Dot-delimited fact name.
    pub name: String,
    /// Optional human-targeted report.
    #[serde(default)]
    pub report: Option<ReportDto>,
    /// Optional hint appended to failed reports.
    #[serde(default)]
    pub hint: Option<HintDto>,
    /// Optional gating expression.
    #[serde(default)]
    pub filter: Option<ExpressionDto>,
    /// The value source (exactly one variant must be set).
    pub value: ValueDto,
}

/// YAML representation of a report.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportDto {
    /// Freeform message shown while checking.
    pub message: String,
    /// Severity: `note`, `warn` or `error` (default).
    #[serde(default)]
    pub level: Option<String>,
    /// Expected-pass literal (default `"true"`).
    #[serde(default)]
    pub pass: Option<String>,
}

/// YAML representation of a hint.
#[derive(Debug, Clone, Deserialize)]
pub struct HintDto {
    /// Freeform message shown in parentheses after a failure.
    pub message: String,
}

/// YAML representation of an expression node.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpressionDto {
    /// Disjunction branch.
    #[serde(default)]
    pub any: Option<CompoundDto>,
    /// Conjunction branch.
    #[serde(default)]
    pub all: Option<CompoundDto>,
    /// Leaf branch.
    #[serde(default)]
    pub fact: Option<FactMatchDto>,
}

/// YAML representation of a compound expression body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompoundDto {
    /// Ordered child expressions.
    #[serde(default)]
    pub expressions: Vec<ExpressionDto>,
}

/// YAML representation of a leaf fact comparison.
#[derive(Debug, Clone, Deserialize)]
pub struct FactMatchDto {
    /// Name of the fact to examine.
    pub name: String,
    /// Comparison literal or regex pattern, depending on `match`.
    #[serde(default)]
    pub value: Option<String>,
    /// Match mode: `regex`, `exists`, or absent for equality.
    #[serde(default, rename = "match")]
    pub match_mode: Option<String>,
}

/// YAML representation of a value source.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValueDto {
    /// Built-in probe marker (`builtin: {}`).
    #[serde(default)]
    pub builtin: Option<BuiltInDto>,
    /// Boolean expression source.
    #[serde(default, rename = "bool")]
    pub bool_expr: Option<ExpressionDto>,
    /// Re-parse of another fact.
    #[serde(default)]
    pub string: Option<StringDto>,
    /// File contents source.
    #[serde(default)]
    pub file: Option<FileDto>,
    /// Directory enumeration source.
    #[serde(default)]
    pub dirent: Option<DirEntDto>,
    /// Access-permission source.
    #[serde(default)]
    pub access: Option<AccessDto>,
    /// Command stdout source.
    #[serde(default)]
    pub command: Option<CommandDto>,
}

/// Marker for the built-in value source; carries no fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuiltInDto {}

/// YAML representation of a string (fact re-parse) source.
#[derive(Debug, Clone, Deserialize)]
pub struct StringDto {
    /// Name of the referenced fact.
    pub fact: String,
    /// Optional parse rule.
    #[serde(default)]
    pub parse: Option<ParseDto>,
}

/// YAML representation of a file source.
#[derive(Debug, Clone, Deserialize)]
pub struct FileDto {
    /// Fully qualified file path.
    pub path: String,
    /// Optional parse rule.
    #[serde(default)]
    pub parse: Option<ParseDto>,
    /// Skip silently when the file is missing.
    #[serde(default, rename = "ignoreMissing")]
    pub ignore_missing: bool,
}

/// YAML representation of a dirent source.
#[derive(Debug, Clone, Deserialize)]
pub struct DirEntDto {
    /// Fully qualified directory path.
    pub path: String,
    /// Skip silently when the directory is missing.
    #[serde(default, rename = "ignoreMissing")]
    pub ignore_missing: bool,
}

/// YAML representation of an access source.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessDto {
    /// Fully qualified path to check.
    pub path: String,
    /// Check: `exists`, `readable`, `writable` or `executable`.
    pub check: String,
}

/// YAML representation of a command source.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandDto {
    /// Binary name, resolved against `$PATH` when unqualified.
    pub name: String,
    /// Arguments passed verbatim.
    #[serde(default)]
    pub args: Vec<String>,
    /// Optional parse rule for stdout.
    #[serde(default)]
    pub parse: Option<ParseDto>,
}

/// YAML representation of a parse rule.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParseDto {
    /// Whitespace handling: `trim` or absent.
    #[serde(default)]
    pub whitespace: Option<String>,
    /// Scalar extraction branch.
    #[serde(default)]
    pub scalar: Option<ScalarDto>,
    /// List extraction branch.
    #[serde(default)]
    pub list: Option<ListDto>,
    /// Set extraction branch.
    #[serde(default)]
    pub set: Option<SetDto>,
    /// Dict extraction branch.
    #[serde(default)]
    pub dict: Option<DictDto>,
}

/// YAML representation of a scalar parse rule.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScalarDto {
    /// Extraction regex; the value passes through unchanged if absent.
    #[serde(default)]
    pub regex: Option<String>,
    /// Capturing-group index (0 = full match).
    #[serde(default, rename = "match")]
    pub group: u32,
}

/// YAML representation of a list parse rule.
#[derive(Debug, Clone, Deserialize)]
pub struct ListDto {
    /// Element separator, C-style escapes supported.
    pub separator: String,
    /// Leading elements to discard.
    #[serde(default, rename = "skiphead")]
    pub skip_head: u32,
    /// Trailing elements to discard.
    #[serde(default, rename = "skiptail")]
    pub skip_tail: u32,
    /// Upper bound on kept elements (0 = unbounded).
    #[serde(default)]
    pub limit: u32,
    /// Nested per-element parse rule.
    #[serde(default)]
    pub parse: Option<Box<ParseDto>>,
}

/// YAML representation of a set parse rule.
#[derive(Debug, Clone, Deserialize)]
pub struct SetDto {
    /// Element separator, C-style escapes supported.
    pub separator: String,
    /// Leading elements to discard.
    #[serde(default, rename = "skiphead")]
    pub skip_head: u32,
    /// Trailing elements to discard.
    #[serde(default, rename = "skiptail")]
    pub skip_tail: u32,
    /// Optional per-element extraction regex.
    #[serde(default)]
    pub regex: Option<String>,
    /// Capturing-group index used with `regex`.
    #[serde(default, rename = "match")]
    pub group: u32,
}

/// YAML representation of a dict parse rule.
#[derive(Debug, Clone, Deserialize)]
pub struct DictDto {
    /// Pair separator, C-style escapes supported.
    pub separator: String,
    /// Key/value delimiter, C-style escapes supported.
    pub delimiter: String,
    /// Nested per-value parse rule.
    #[serde(default)]
    pub parse: Option<Box<ParseDto>>,
}
