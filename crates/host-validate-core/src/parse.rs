//! Parser combinators for deriving facts from raw string values.
//!
//! A parse rule is a small tree interpreter: applied to a raw value
//! under a *context* name, it emits derived facts whose names extend
//! the context with dot-separated suffixes. Emission goes through a
//! sink closure so the combinators stay independent of the fact store.

use regex::Regex;

use crate::fact::{Parse, ParseRule};

/// Applies a parse rule to `value` under `context`, emitting each
/// derived `(name, value)` pair through `out`. With no rule, the raw
/// value is emitted at the context name unchanged.
pub fn apply<F>(parse: Option<&Parse>, context: &str, value: &str, out: &mut F)
where
    F: FnMut(String, String),
{
    let Some(parse) = parse else {
        out(context.to_string(), value.to_string());
        return;
    };

    let value = if parse.trim() { value.trim() } else { value };

    match parse.rule() {
        ParseRule::Scalar(rule) => {
            let extracted = match rule.regex() {
                None => value.to_string(),
                Some(regex) => capture(regex, rule.group(), value),
            };
            out(context.to_string(), extracted);
        }
        ParseRule::List(rule) => {
            if value.is_empty() {
                return;
            }
            let elements: Vec<&str> = value.split(rule.separator()).collect();
            let mut kept = 0;
            for (i, element) in elements.iter().enumerate() {
                if i < rule.skip_head() {
                    continue;
                }
                if i >= elements.len().saturating_sub(rule.skip_tail()) {
                    continue;
                }
                apply(rule.parse(), &format!("{context}.{i}"), element, out);
                kept += 1;
                if rule.limit() != 0 && kept >= rule.limit() {
                    break;
                }
            }
        }
        ParseRule::Set(rule) => {
            if value.is_empty() {
                return;
            }
            let elements: Vec<&str> = value.split(rule.separator()).collect();
            for (i, element) in elements.iter().enumerate() {
                if i < rule.skip_head() {
                    continue;
                }
                if i >= elements.len().saturating_sub(rule.skip_tail()) {
                    continue;
                }
                let element = match rule.regex() {
                    None => (*element).to_string(),
                    Some(regex) => capture(regex, rule.group(), element),
                };
                out(format!("{context}.{element}"), "true".to_string());
            }
        }
        ParseRule::Dict(rule) => {
            for pair in value.split(rule.separator()) {
                let mut halves = pair.splitn(2, rule.delimiter());
                let (Some(key), Some(rest)) = (halves.next(), halves.next()) else {
                    continue;
                };
                let subcontext = format!("{context}.{}", key.trim());
                apply(rule.parse(), &subcontext, rest, out);
            }
        }
    }
}

/// Extracts the selected capturing group, or the empty string when the
/// regex does not match or the group is absent.
fn capture(regex: &Regex, group: usize, value: &str) -> String {
    regex
        .captures(value)
        .and_then(|caps| caps.get(group))
        .map_or_else(String::new, |m| m.as_str().to_string())
}
