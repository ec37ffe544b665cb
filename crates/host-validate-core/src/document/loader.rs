//! DTO → domain conversion with validation.
//!
//! The loader is the single place where malformed rule documents are
//! rejected: value-source and parse-kind exclusivity, the closed
//! severity/match/whitespace/check vocabularies, regex compilation and
//! separator escape decoding all happen here, so the domain model only
//! ever holds well-formed rules.

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

use super::dto::{
    AccessDto, CommandDto, DictDto, ExpressionDto, FactDto, FactListDto, FactMatchDto, FileDto,
    ListDto, ParseDto, ScalarDto, SetDto, StringDto,
};
use crate::fact::{
    AccessCheck, AccessSource, CommandSource, DictRule, DirEntSource, Expression, Fact, FactList,
    FactMatch, FileSource, ListRule, MatchTest, Parse, ParseRule, Report, ScalarRule, Severity,
    SetRule, StringSource, ValueSource,
};

/// Errors raised while loading a rule document.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The document file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// Path of the unreadable document.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The document is not valid YAML for the schema.
    #[error("cannot parse rule document: {message}")]
    Yaml {
        /// The deserializer's message, including the location.
        message: String,
    },

    /// A fact's `value` has zero or more than one source set.
    #[error("fact '{name}': exactly one value source must be set")]
    ValueSource {
        /// The offending fact.
        name: String,
    },

    /// A parse rule has zero or more than one of scalar/list/set/dict.
    #[error("{context}: exactly one of scalar, list, set or dict must be set")]
    ParseKind {
        /// Where the rule appears (e.g. `fact 'ex' value.file.parse`).
        context: String,
    },

    /// An expression node has zero or more than one branch set.
    #[error("{context}: expected exactly one of any, all or fact")]
    Expression {
        /// Where the node appears.
        context: String,
    },

    /// Unknown report severity.
    #[error("{context}: unknown severity `{value}`, expected: note, warn, error")]
    UnknownSeverity {
        /// Where the severity appears.
        context: String,
        /// The invalid value.
        value: String,
    },

    /// Unknown expression match mode.
    #[error("{context}: unknown match mode `{value}`, expected: regex, exists")]
    UnknownMatch {
        /// Where the mode appears.
        context: String,
        /// The invalid value.
        value: String,
    },

    /// Unknown whitespace handling mode.
    #[error("{context}: unknown whitespace mode `{value}`, expected: trim")]
    UnknownWhitespace {
        /// Where the mode appears.
        context: String,
        /// The invalid value.
        value: String,
    },

    /// Unknown access check.
    #[error(
        "{context}: unknown access check `{value}`, expected: exists, readable, writable, executable"
    )]
    UnknownCheck {
        /// Where the check appears.
        context: String,
        /// The invalid value.
        value: String,
    },

    /// A regex in the document failed to compile.
    #[error("{context}: invalid regex: {source}")]
    Regex {
        /// Where the regex appears.
        context: String,
        /// The compile error.
        source: regex::Error,
    },

    /// A separator or delimiter carries an unknown escape sequence.
    #[error("{context}: unknown escape '\\{escape}'")]
    UnknownEscape {
        /// Where the separator appears.
        context: String,
        /// The character following the backslash.
        escape: char,
    },

    /// A separator or delimiter decoded to the empty string.
    #[error("{context}: separator must not be empty")]
    EmptySeparator {
        /// Where the separator appears.
        context: String,
    },
}

/// Loads a rule document from a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation.
pub fn load_file(path: &Path) -> Result<FactList, LoadError> {
    let doc = std::fs::read_to_string(path).map_err(|e| LoadError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let facts = load_str(&doc)?;
    debug!("loaded {} facts from {}", facts.len(), path.display());
    Ok(facts)
}

/// Loads a rule document from a string.
///
/// # Errors
///
/// Returns an error if the document fails deserialization or validation.
pub fn load_str(doc: &str) -> Result<FactList, LoadError> {
    let dto: FactListDto = serde_yaml::from_str(doc).map_err(|e| LoadError::Yaml {
        message: e.to_string(),
    })?;
    load(dto)
}

/// Converts a deserialized document into the validated domain model.
///
/// # Errors
///
/// Returns the first validation error encountered, in document order.
pub fn load(dto: FactListDto) -> Result<FactList, LoadError> {
    let facts = dto
        .facts
        .into_iter()
        .map(convert_fact)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(FactList::new(facts))
}

fn convert_fact(dto: FactDto) -> Result<Fact, LoadError> {
    let ctx = format!("fact '{}'", dto.name);

    let report = dto
        .report
        .map(|r| {
            let severity = match r.level.as_deref() {
                None => Severity::Error,
                Some(level) => parse_severity(level, &format!("{ctx} report"))?,
            };
            Ok(Report::new(r.message, severity, r.pass))
        })
        .transpose()?;

    let hint = dto.hint.map(|h| h.message);

    let filter = dto
        .filter
        .map(|f| convert_expression(f, &format!("{ctx} filter")))
        .transpose()?;

    let value = convert_value(dto.value, &dto.name, &ctx)?;

    Ok(Fact::new(dto.name, report, hint, filter, value))
}

fn convert_value(
    dto: super::dto::ValueDto,
    name: &str,
    ctx: &str,
) -> Result<ValueSource, LoadError> {
    let set = usize::from(dto.builtin.is_some())
        + usize::from(dto.bool_expr.is_some())
        + usize::from(dto.string.is_some())
        + usize::from(dto.file.is_some())
        + usize::from(dto.dirent.is_some())
        + usize::from(dto.access.is_some())
        + usize::from(dto.command.is_some());
    if set != 1 {
        return Err(LoadError::ValueSource {
            name: name.to_string(),
        });
    }

    if dto.builtin.is_some() {
        Ok(ValueSource::BuiltIn)
    } else if let Some(expr) = dto.bool_expr {
        Ok(ValueSource::Bool(convert_expression(
            expr,
            &format!("{ctx} value.bool"),
        )?))
    } else if let Some(s) = dto.string {
        Ok(ValueSource::String(convert_string(s, ctx)?))
    } else if let Some(f) = dto.file {
        Ok(ValueSource::File(convert_file(f, ctx)?))
    } else if let Some(d) = dto.dirent {
        Ok(ValueSource::DirEnt(convert_dirent(d)))
    } else if let Some(a) = dto.access {
        Ok(ValueSource::Access(convert_access(a, ctx)?))
    } else if let Some(c) = dto.command {
        Ok(ValueSource::Command(convert_command(c, ctx)?))
    } else {
        unreachable!("exactly one source verified above")
    }
}

fn convert_string(dto: StringDto, ctx: &str) -> Result<StringSource, LoadError> {
    let parse = dto
        .parse
        .map(|p| convert_parse(p, &format!("{ctx} value.string.parse")))
        .transpose()?;
    Ok(StringSource::new(dto.fact, parse))
}

fn convert_file(dto: FileDto, ctx: &str) -> Result<FileSource, LoadError> {
    let parse = dto
        .parse
        .map(|p| convert_parse(p, &format!("{ctx} value.file.parse")))
        .transpose()?;
    Ok(FileSource::new(
        PathBuf::from(dto.path),
        parse,
        dto.ignore_missing,
    ))
}

fn convert_dirent(dto: super::dto::DirEntDto) -> DirEntSource {
    DirEntSource::new(PathBuf::from(dto.path), dto.ignore_missing)
}

fn convert_access(dto: AccessDto, ctx: &str) -> Result<AccessSource, LoadError> {
    let check = match dto.check.as_str() {
        "exists" => AccessCheck::Exists,
        "readable" => AccessCheck::Readable,
        "writable" => AccessCheck::Writable,
        "executable" => AccessCheck::Executable,
        other => {
            return Err(LoadError::UnknownCheck {
                context: format!("{ctx} value.access"),
                value: other.to_string(),
            })
        }
    };
    Ok(AccessSource::new(PathBuf::from(dto.path), check))
}

fn convert_command(dto: CommandDto, ctx: &str) -> Result<CommandSource, LoadError> {
    let parse = dto
        .parse
        .map(|p| convert_parse(p, &format!("{ctx} value.command.parse")))
        .transpose()?;
    Ok(CommandSource::new(dto.name, dto.args, parse))
}

fn convert_expression(dto: ExpressionDto, ctx: &str) -> Result<Expression, LoadError> {
    let set = usize::from(dto.any.is_some())
        + usize::from(dto.all.is_some())
        + usize::from(dto.fact.is_some());
    if set != 1 {
        return Err(LoadError::Expression {
            context: ctx.to_string(),
        });
    }

    if let Some(compound) = dto.any {
        let children = compound
            .expressions
            .into_iter()
            .map(|e| convert_expression(e, ctx))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Expression::Any(children))
    } else if let Some(compound) = dto.all {
        let children = compound
            .expressions
            .into_iter()
            .map(|e| convert_expression(e, ctx))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Expression::All(children))
    } else if let Some(leaf) = dto.fact {
        Ok(Expression::Fact(convert_fact_match(leaf, ctx)?))
    } else {
        unreachable!("exactly one branch verified above")
    }
}

fn convert_fact_match(dto: FactMatchDto, ctx: &str) -> Result<FactMatch, LoadError> {
    let test = match dto.match_mode.as_deref() {
        None => MatchTest::Equals(dto.value.unwrap_or_default()),
        Some("exists") => MatchTest::Exists,
        Some("regex") => {
            let pattern = dto.value.unwrap_or_default();
            MatchTest::Regex(compile_regex(&pattern, ctx)?)
        }
        Some(other) => {
            return Err(LoadError::UnknownMatch {
                context: ctx.to_string(),
                value: other.to_string(),
            })
        }
    };
    Ok(FactMatch::new(dto.name, test))
}

fn convert_parse(dto: ParseDto, ctx: &str) -> Result<Parse, LoadError> {
    let trim = match dto.whitespace.as_deref() {
        None => false,
        Some("trim") => true,
        Some(other) => {
            return Err(LoadError::UnknownWhitespace {
                context: ctx.to_string(),
                value: other.to_string(),
            })
        }
    };

    let set = usize::from(dto.scalar.is_some())
        + usize::from(dto.list.is_some())
        + usize::from(dto.set.is_some())
        + usize::from(dto.dict.is_some());
    if set != 1 {
        return Err(LoadError::ParseKind {
            context: ctx.to_string(),
        });
    }

    let rule = if let Some(s) = dto.scalar {
        ParseRule::Scalar(convert_scalar(s, ctx)?)
    } else if let Some(l) = dto.list {
        ParseRule::List(convert_list(l, ctx)?)
    } else if let Some(s) = dto.set {
        ParseRule::Set(convert_set(s, ctx)?)
    } else if let Some(d) = dto.dict {
        ParseRule::Dict(convert_dict(d, ctx)?)
    } else {
        unreachable!("exactly one kind verified above")
    };

    Ok(Parse::new(trim, rule))
}

fn convert_scalar(dto: ScalarDto, ctx: &str) -> Result<ScalarRule, LoadError> {
    let regex = dto
        .regex
        .as_deref()
        .map(|r| compile_regex(r, ctx))
        .transpose()?;
    Ok(ScalarRule::new(regex, dto.group as usize))
}

fn convert_list(dto: ListDto, ctx: &str) -> Result<ListRule, LoadError> {
    let separator = unescape(&dto.separator, ctx)?;
    let parse = dto
        .parse
        .map(|p| convert_parse(*p, ctx))
        .transpose()?
        .map(Box::new);
    Ok(ListRule::new(
        separator,
        dto.skip_head as usize,
        dto.skip_tail as usize,
        dto.limit as usize,
        parse,
    ))
}

fn convert_set(dto: SetDto, ctx: &str) -> Result<SetRule, LoadError> {
    let separator = unescape(&dto.separator, ctx)?;
    let regex = dto
        .regex
        .as_deref()
        .map(|r| compile_regex(r, ctx))
        .transpose()?;
    Ok(SetRule::new(
        separator,
        dto.skip_head as usize,
        dto.skip_tail as usize,
        regex,
        dto.group as usize,
    ))
}

fn convert_dict(dto: DictDto, ctx: &str) -> Result<DictRule, LoadError> {
    let separator = unescape(&dto.separator, ctx)?;
    let delimiter = unescape(&dto.delimiter, ctx)?;
    let parse = dto
        .parse
        .map(|p| convert_parse(*p, ctx))
        .transpose()?
        .map(Box::new);
    Ok(DictRule::new(separator, delimiter, parse))
}

fn parse_severity(value: &str, ctx: &str) -> Result<Severity, LoadError> {
    match value {
        "note" => Ok(Severity::Note),
        "warn" => Ok(Severity::Warn),
        "error" => Ok(Severity::Error),
        other => Err(LoadError::UnknownSeverity {
            context: ctx.to_string(),
            value: other.to_string(),
        }),
    }
}

fn compile_regex(pattern: &str, ctx: &str) -> Result<Regex, LoadError> {
    Regex::new(pattern).map_err(|e| LoadError::Regex {
        context: ctx.to_string(),
        source: e,
    })
}

/// Decodes C-style escapes in a separator or delimiter.
fn unescape(value: &str, ctx: &str) -> Result<String, LoadError> {
    let mut decoded = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            decoded.push(c);
            continue;
        }
        match chars.next() {
            Some('a') => decoded.push('\x07'),
            Some('b') => decoded.push('\x08'),
            Some('e') => decoded.push('\x1b'),
            Some('f') => decoded.push('\x0c'),
            Some('n') => decoded.push('\n'),
            Some('r') => decoded.push('\r'),
            Some('t') => decoded.push('\t'),
            Some('v') => decoded.push('\x0b'),
            Some('\\') => decoded.push('\\'),
            Some('0') => decoded.push('\0'),
            Some(other) => {
                return Err(LoadError::UnknownEscape {
                    context: ctx.to_string(),
                    escape: other,
                })
            }
            None => {
                return Err(LoadError::UnknownEscape {
                    context: ctx.to_string(),
                    escape: '\\',
                })
            }
        }
    }
    if decoded.is_empty() {
        return Err(LoadError::EmptySeparator {
            context: ctx.to_string(),
        });
    }
    Ok(decoded)
}
