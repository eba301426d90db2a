// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! QoS Expression Parser
//!
//! Converts one textual policy expression into a [`PolicyValue`].
//!
//! # Supported Syntax
//!
//! ```text
//! expression ::= [ "Policy." ] name [ ws arguments ]
//! name       ::= Family | Family "." Variant | Variant
//! arguments  ::= argument { delimiter argument }
//! argument   ::= scalar | sequence | duration | expression   (nested only)
//! sequence   ::= "[" [ string { delimiter string } ] "]"
//! duration   ::= integer | "infinity" | unit "=" integer { ";" unit "=" integer }
//! ```
//!
//! The grammar of each policy comes from [`crate::catalog::CATALOG`]:
//! flag policies take nothing, payload policies take the raw remainder
//! verbatim, every other grammar walks the field schema in order.
//!
//! # Example
//!
//! ```
//! use hdds_qos_lang::expression::{parse_expression, ParseOptions};
//!
//! let value = parse_expression("History.KeepLast 10", &ParseOptions::default())?;
//! assert_eq!(value.field("depth").and_then(|v| v.as_int()), Some(10));
//! # Ok::<(), hdds_qos_lang::QosError>(())
//! ```

use crate::catalog::{self, FieldSpec, FieldType, Grammar, PolicyDescriptor, DURATION_INFINITE};
use crate::error::{QosError, Result};
use crate::value::{FieldValue, PolicyValue};

/// Argument delimiter used when none is configured.
pub const DEFAULT_DELIMITER: char = ',';

/// Separator between `unit=N` parts of a duration.
const DURATION_PART_SEPARATOR: char = ';';

const DURATION_UNITS_HINT: &str =
    "duration unit (weeks, days, hours, minutes, seconds, milliseconds, microseconds, nanoseconds)";

const NANOS_PER_MICRO: i64 = 1_000;
const NANOS_PER_MILLI: i64 = 1_000_000;
const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Parser settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Separator between flat arguments and sequence elements.
    pub delimiter: char,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

impl ParseOptions {
    pub fn with_delimiter(delimiter: char) -> Self {
        Self { delimiter }
    }
}

/// Whether `c` can serve as an argument delimiter.
///
/// Characters with a meaning of their own in the grammar are refused.
pub fn is_valid_delimiter(c: char) -> bool {
    !(c.is_whitespace() || "[]=;\"'".contains(c))
}

/// Parse one policy expression.
pub fn parse_expression(text: &str, options: &ParseOptions) -> Result<PolicyValue> {
    let text = text.trim_start();
    if text.trim().is_empty() {
        return Err(QosError::EmptyExpression);
    }

    let (name, rest) = split_name(text);
    let descriptor = catalog::lookup(name)?;

    let values = match descriptor.grammar {
        Grammar::Flag => {
            let rest = rest.trim();
            if !rest.is_empty() {
                return Err(QosError::TrailingArguments {
                    scope: descriptor.scope.to_string(),
                    rest: rest.to_string(),
                });
            }
            Vec::new()
        }
        Grammar::Payload => vec![FieldValue::Bytes(rest.as_bytes().to_vec())],
        Grammar::Flat | Grammar::Sequence | Grammar::Nested | Grammar::BooleanPair => {
            let normalized = normalize(rest, options.delimiter);
            parse_fields(descriptor, &normalized, options)?
        }
    };

    let value = PolicyValue::from_parts(descriptor, values);
    tracing::debug!("Parsed QoS expression '{}' -> {}", text.trim(), value);
    Ok(value)
}

/// Split the leading policy name from its argument text.
fn split_name(text: &str) -> (&str, &str) {
    match text.find(char::is_whitespace) {
        Some(idx) => (&text[..idx], text[idx..].trim_start()),
        None => (text, ""),
    }
}

/// Canonicalize argument spacing.
///
/// Whitespace runs collapse to one space; whitespace next to the delimiter,
/// `;`, `=`, after `[` or before `]` disappears. Quoted text is kept as is.
/// Applying the function twice gives the same result as applying it once.
pub fn normalize(args: &str, delimiter: char) -> String {
    let is_tight = |c: char| c == delimiter || c == ';' || c == '=';
    let mut out = String::with_capacity(args.len());
    let mut quote: Option<char> = None;
    let mut pending_space = false;

    for ch in args.chars() {
        if let Some(q) = quote {
            out.push(ch);
            if ch == q {
                quote = None;
            }
            continue;
        }
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            if let Some(last) = out.chars().last() {
                if !is_tight(last) && !is_tight(ch) && last != '[' && ch != ']' {
                    out.push(' ');
                }
            }
            pending_space = false;
        }
        if ch == '"' || ch == '\'' {
            quote = Some(ch);
        }
        out.push(ch);
    }
    out
}

/// Split on the delimiter at bracket depth zero, outside quotes.
fn split_arguments(args: &str, delimiter: char) -> Vec<&str> {
    if args.trim().is_empty() {
        return Vec::new();
    }

    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (idx, ch) in args.char_indices() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            c if c == delimiter && depth == 0 => {
                parts.push(args[start..idx].trim());
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(args[start..].trim());
    parts
}

/// Walk the field schema, consuming arguments in order.
fn parse_fields(
    descriptor: &'static PolicyDescriptor,
    normalized: &str,
    options: &ParseOptions,
) -> Result<Vec<FieldValue>> {
    let args = split_arguments(normalized, options.delimiter);
    let total = descriptor.fields.len();

    // Nested policies may span several arguments; their count is checked below.
    if descriptor.grammar != Grammar::Nested
        && (args.len() > total || args.len() < descriptor.required_arity())
    {
        return Err(arity_error(descriptor, args.len()));
    }

    let mut values = Vec::with_capacity(total);
    let mut idx = 0;
    for spec in descriptor.fields {
        if let FieldType::Policy(family) = spec.ty {
            let rest = &args[idx.min(args.len())..];
            let (value, used) = parse_sub_policy(spec, family, rest, options)?;
            values.push(value);
            idx += used;
            continue;
        }
        match args.get(idx) {
            Some(raw) => {
                values.push(convert(spec, raw, options)?);
                idx += 1;
            }
            None => match spec.default {
                Some(default) => values.push(default.into()),
                None => return Err(arity_error(descriptor, args.len())),
            },
        }
    }

    if idx < args.len() {
        return Err(arity_error(descriptor, args.len()));
    }
    Ok(values)
}

fn arity_error(descriptor: &PolicyDescriptor, got: usize) -> QosError {
    let expected = if got > descriptor.fields.len() {
        descriptor.fields.len()
    } else {
        descriptor.required_arity()
    };
    QosError::Arity {
        scope: descriptor.scope.to_string(),
        expected,
        got,
    }
}

/// Parse an embedded policy of `family` from the head of `args`.
///
/// The first argument carries the sub-policy name and its first argument
/// (`History.KeepLast 20`); a sub-policy with more fields continues over
/// the following arguments. Returns the value and the arguments consumed.
fn parse_sub_policy(
    spec: &FieldSpec,
    family: &str,
    args: &[&str],
    options: &ParseOptions,
) -> Result<(FieldValue, usize)> {
    let invalid = |context: String| QosError::InvalidSubPolicy { context };

    let head = args
        .first()
        .filter(|a| !a.is_empty())
        .ok_or_else(|| invalid(format!("{}: missing {} policy", spec.name, family)))?;

    let (name, _) = split_name(head);
    let sub = catalog::lookup(name).map_err(|e| invalid(format!("{}: {}", spec.name, e)))?;
    if sub.family != family {
        return Err(invalid(format!(
            "{}: expected a {} policy, got {}",
            spec.name, family, sub.scope
        )));
    }

    let span = sub.fields.len().max(1);
    if span > args.len() {
        return Err(invalid(format!(
            "{}: {} needs {} argument(s)",
            spec.name,
            sub.scope,
            sub.fields.len()
        )));
    }

    let text = args[..span].join(&options.delimiter.to_string());
    let value = parse_expression(&text, options)
        .map_err(|e| invalid(format!("{}: {}", spec.name, e)))?;
    Ok((FieldValue::Policy(Box::new(value)), span))
}

/// Convert one raw argument to the declared field type.
fn convert(spec: &FieldSpec, raw: &str, options: &ParseOptions) -> Result<FieldValue> {
    let mismatch = || QosError::TypeConversion {
        field: spec.name.to_string(),
        raw: raw.to_string(),
        expected: spec.ty.label().to_string(),
    };

    match spec.ty {
        FieldType::Int => raw.parse().map(FieldValue::Int).map_err(|_| mismatch()),
        FieldType::Float => raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(FieldValue::Float)
            .ok_or_else(mismatch),
        FieldType::Bool => parse_bool(raw).map(FieldValue::Bool),
        FieldType::Str => parse_string(raw).map(FieldValue::Str).ok_or_else(mismatch),
        FieldType::Bytes => parse_string(raw)
            .map(|s| FieldValue::Bytes(s.into_bytes()))
            .ok_or_else(mismatch),
        FieldType::Duration => parse_duration(spec.name, raw).map(FieldValue::Duration),
        FieldType::StrSequence => parse_sequence(raw, options.delimiter)
            .map(FieldValue::Sequence)
            .ok_or_else(mismatch),
        FieldType::Policy(_) => Err(mismatch()),
    }
}

/// Strip one level of matching quotes.
///
/// Bare text may not contain quotes, quoted text may not contain its own
/// quote character, and bare empty text is rejected. Every accepted string
/// therefore renders back to text the splitter reads the same way.
fn parse_string(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    for quote in ['"', '\''] {
        if let Some(inner) = raw.strip_prefix(quote).and_then(|s| s.strip_suffix(quote)) {
            return (!inner.contains(quote)).then(|| inner.to_string());
        }
    }
    (!raw.contains(|c: char| c == '"' || c == '\'')).then(|| raw.to_string())
}

/// Parse `[a, b, c]`; `[]` is the empty sequence.
fn parse_sequence(raw: &str, delimiter: char) -> Option<Vec<String>> {
    let inner = raw.strip_prefix('[')?.strip_suffix(']')?;
    split_arguments(inner, delimiter)
        .into_iter()
        .map(parse_string)
        .collect()
}

/// Parse a boolean literal (case-insensitive).
pub fn parse_bool(token: &str) -> Result<bool> {
    match token.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "on" | "1" => Ok(true),
        "false" | "f" | "no" | "n" | "off" | "0" => Ok(false),
        _ => Err(QosError::InvalidBoolean {
            token: token.to_string(),
        }),
    }
}

fn duration_unit_scale(unit: &str) -> Option<i64> {
    let scale = match unit.to_ascii_lowercase().as_str() {
        "weeks" | "week" => 7 * 24 * 3600 * NANOS_PER_SECOND,
        "days" | "day" => 24 * 3600 * NANOS_PER_SECOND,
        "hours" | "hour" => 3600 * NANOS_PER_SECOND,
        "minutes" | "minute" => 60 * NANOS_PER_SECOND,
        "seconds" | "second" => NANOS_PER_SECOND,
        "milliseconds" | "millisecond" => NANOS_PER_MILLI,
        "microseconds" | "microsecond" => NANOS_PER_MICRO,
        "nanoseconds" | "nanosecond" => 1,
        _ => return None,
    };
    Some(scale)
}

/// Parse a duration into nanoseconds.
///
/// Accepts a bare non-negative integer (nanoseconds), `infinity`, or
/// `unit=N` parts separated by `;` which are summed. Sums that overflow
/// saturate to [`DURATION_INFINITE`].
pub fn parse_duration(field: &str, raw: &str) -> Result<i64> {
    let mismatch = |raw: &str, expected: &str| QosError::TypeConversion {
        field: field.to_string(),
        raw: raw.to_string(),
        expected: expected.to_string(),
    };
    let text = raw.trim();

    if matches!(
        text.to_ascii_lowercase().as_str(),
        "infinity" | "infinite" | "inf"
    ) {
        return Ok(DURATION_INFINITE);
    }
    if let Ok(ns) = text.parse::<i64>() {
        return if ns < 0 {
            Err(mismatch(raw, "duration"))
        } else {
            Ok(ns)
        };
    }
    if !text.contains('=') {
        return Err(mismatch(raw, "duration"));
    }

    let mut total: i64 = 0;
    for part in text.split(DURATION_PART_SEPARATOR).filter(|p| !p.is_empty()) {
        let (unit, count) = part.split_once('=').ok_or_else(|| mismatch(raw, "duration"))?;
        let scale = duration_unit_scale(unit.trim()).ok_or_else(|| {
            mismatch(
                unit.trim(),
                DURATION_UNITS_HINT,
            )
        })?;
        let count: i64 = count
            .trim()
            .parse()
            .ok()
            .filter(|n| *n >= 0)
            .ok_or_else(|| mismatch(raw, "duration"))?;
        total = total.saturating_add(count.saturating_mul(scale));
    }
    Ok(total)
}

/// Regroup shell-split tokens into whole expressions.
///
/// `["History.KeepLast", "10", "Durability.TransientLocal"]` becomes
/// `["History.KeepLast 10", "Durability.TransientLocal"]`. A token opens a
/// new expression only when its first word is a full scope or a family
/// name ([`catalog::is_explicit_name`]), the previous token did not end with
/// the delimiter, no `[` is still open and the current expression is not a
/// payload. Bare variant names stay arguments of the current expression.
pub fn group_tokens<S: AsRef<str>>(tokens: &[S], options: &ParseOptions) -> Vec<String> {
    let mut groups: Vec<String> = Vec::new();
    let mut continues = false;
    let mut in_payload = false;
    let mut depth: i64 = 0;

    for token in tokens {
        let token = token.as_ref().trim();
        if token.is_empty() {
            continue;
        }
        let (first_word, _) = split_name(token);
        let opens = !continues && !in_payload && catalog::is_explicit_name(first_word);

        match groups.last_mut().filter(|_| !opens) {
            Some(current) => {
                current.push(' ');
                current.push_str(token);
            }
            None => {
                groups.push(token.to_string());
                in_payload = catalog::lookup(first_word)
                    .is_ok_and(|d| d.grammar == Grammar::Payload);
                depth = 0;
            }
        }

        depth += token.matches('[').count() as i64 - token.matches(']').count() as i64;
        continues = depth > 0 || token.ends_with(options.delimiter);
    }
    groups
}

/// Regroup several token lists, one per `-q` occurrence.
///
/// Each list starts a fresh expression, so a payload or a bare variant name
/// never leaks into the next occurrence.
pub fn group_occurrences<S: AsRef<str>>(
    occurrences: &[Vec<S>],
    options: &ParseOptions,
) -> Vec<String> {
    occurrences
        .iter()
        .flat_map(|tokens| group_tokens(tokens, options))
        .collect()
}
