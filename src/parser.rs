// Field-by-field parser for five-field cron expressions with the Vixie and
// Quartz extensions (L, LW, nW, d#k, dL, aliases, @-macros).

use crate::error::CronError;
use crate::expr::{ClauseSet, CronExpr, Field, FieldMatcher, NthWeekday, Step};

/// Predefined `@`-macros and their expansions.
const MACROS: &[(&str, &str)] = &[
    ("@yearly", "0 0 1 1 *"),
    ("@annually", "0 0 1 1 *"),
    ("@monthly", "0 0 1 * *"),
    ("@weekly", "0 0 ? * 0"),
    ("@daily", "0 0 * * *"),
    ("@midnight", "0 0 * * *"),
    ("@hourly", "0 * * * *"),
    ("@minutely", "* * * * *"),
];

/// Parse a cron expression into its normalized form.
///
/// Success is all-or-nothing: the first syntactic failure aborts the parse
/// and no partial expression is returned.
pub fn parse(input: &str) -> Result<CronExpr, CronError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CronError::empty(input));
    }

    if trimmed.starts_with('@') {
        let expansion = MACROS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(trimmed))
            .map(|(_, expansion)| *expansion)
            .ok_or_else(|| CronError::unknown_macro(input, trimmed))?;
        // Diagnostics and Display keep echoing the macro, not its expansion.
        return Ok(parse(expansion)?.with_pattern(input));
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    if tokens.len() < 4 || tokens.len() > 5 {
        return Err(CronError::field_count(input, tokens.len()));
    }

    let minute = parse_field(input, Field::Minute, tokens[0])?;
    let hour = parse_field(input, Field::Hour, tokens[1])?;
    let day_of_month = parse_field(input, Field::DayOfMonth, tokens[2])?;
    let month = parse_field(input, Field::Month, tokens[3])?;
    // The four-field form leaves day_of_week unconstrained.
    let day_of_week = match tokens.get(4) {
        Some(token) => parse_field(input, Field::DayOfWeek, token)?,
        None => FieldMatcher::Any,
    };

    Ok(CronExpr::new(
        minute,
        hour,
        day_of_month,
        month,
        day_of_week,
        input,
    ))
}

fn parse_field(input: &str, field: Field, token: &str) -> Result<FieldMatcher, CronError> {
    if token == "*" {
        return Ok(FieldMatcher::Any);
    }
    if token == "?" {
        if matches!(field, Field::DayOfMonth | Field::DayOfWeek) {
            return Ok(FieldMatcher::Omit);
        }
        return Err(CronError::misplaced_extension(input, field, token));
    }

    let lowered = token.to_lowercase();
    let rewritten = if field == Field::DayOfWeek {
        substitute_weekday_aliases(&lowered)
    } else {
        lowered
    };

    let mut clauses = ClauseSet::default();
    for part in rewritten.split(',') {
        parse_clause(input, field, part, &mut clauses)?;
    }
    Ok(FieldMatcher::Clauses(clauses))
}

/// Replace whole alias words (`sun`..`sat`) with their numeric values, so
/// forms like `mon-fri` and `sat,sun` lex as numbers downstream.
fn substitute_weekday_aliases(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    let mut word = String::new();
    for ch in token.chars() {
        if ch.is_ascii_alphabetic() {
            word.push(ch);
            continue;
        }
        flush_alias_word(&mut out, &word);
        word.clear();
        out.push(ch);
    }
    flush_alias_word(&mut out, &word);
    out
}

fn flush_alias_word(out: &mut String, word: &str) {
    if word.is_empty() {
        return;
    }
    match Field::DayOfWeek.alias_value(word) {
        Some(value) => out.push_str(&value.to_string()),
        None => out.push_str(word),
    }
}

fn parse_clause(
    input: &str,
    field: Field,
    part: &str,
    clauses: &mut ClauseSet,
) -> Result<(), CronError> {
    match field {
        Field::DayOfMonth => {
            if part == "l" {
                clauses.last_day = true;
                return Ok(());
            }
            if part == "lw" {
                clauses.last_weekday = true;
                return Ok(());
            }
            if let Some(day) = strip_numeric_suffix(part, 'w') {
                let day = parse_value(input, field, day)?;
                clauses.nearest_weekdays.push(day);
                return Ok(());
            }
        }
        Field::DayOfWeek => {
            if let Some(day) = part.strip_suffix('l') {
                if !day.is_empty() {
                    let weekday = parse_value(input, field, day)?;
                    clauses.last_weekdays.push(weekday);
                    return Ok(());
                }
            }
            if let Some((day, nth)) = part.split_once('#') {
                let weekday = parse_value(input, field, day)?;
                let nth: u32 = nth
                    .parse()
                    .map_err(|_| CronError::bad_token(input, field, part))?;
                if !(1..=5).contains(&nth) {
                    return Err(CronError::out_of_range(input, field, nth));
                }
                clauses.nth_weekdays.push(NthWeekday {
                    weekday,
                    nth: nth as u8,
                });
                return Ok(());
            }
        }
        _ => {}
    }

    reject_misplaced(input, field, part)?;

    if part.contains('/') {
        return parse_step(input, field, part, clauses);
    }
    if part.contains('-') {
        return parse_range(input, field, part, clauses);
    }
    let value = parse_value(input, field, part)?;
    clauses.push_value(value);
    Ok(())
}

/// Extensions used in a field that does not support them.
fn reject_misplaced(input: &str, field: Field, part: &str) -> Result<(), CronError> {
    let misplaced = match field {
        Field::DayOfMonth => part.contains('#') || strip_numeric_suffix(part, 'l').is_some(),
        Field::DayOfWeek => part == "l" || part == "lw" || strip_numeric_suffix(part, 'w').is_some(),
        _ => {
            part.contains('#')
                || part == "l"
                || part == "lw"
                || strip_numeric_suffix(part, 'l').is_some()
                || strip_numeric_suffix(part, 'w').is_some()
        }
    };
    if misplaced {
        return Err(CronError::misplaced_extension(input, field, part));
    }
    Ok(())
}

/// `<head>/<step>`: a `*` or missing upper bound spans to the field's step
/// maximum (7 for day_of_week, so `*/1` enumerates through Sunday twice).
fn parse_step(
    input: &str,
    field: Field,
    part: &str,
    clauses: &mut ClauseSet,
) -> Result<(), CronError> {
    let (head, step) = match part.split_once('/') {
        Some(split) => split,
        None => return Err(CronError::bad_token(input, field, part)),
    };
    let step: u8 = step
        .parse()
        .map_err(|_| CronError::bad_token(input, field, part))?;

    let (from, to) = if head == "*" {
        (field.min(), field.step_max())
    } else if let Some((from, to)) = head.split_once('-') {
        (
            parse_bound(input, field, from)?,
            parse_bound(input, field, to)?,
        )
    } else {
        (parse_bound(input, field, head)?, field.step_max())
    };

    clauses.steps.push(Step { from, to, step });
    Ok(())
}

fn parse_range(
    input: &str,
    field: Field,
    part: &str,
    clauses: &mut ClauseSet,
) -> Result<(), CronError> {
    let (from, to) = match part.split_once('-') {
        Some(split) => split,
        None => return Err(CronError::bad_token(input, field, part)),
    };
    let from = parse_bound(input, field, from)?;
    let to = parse_bound(input, field, to)?;
    if from > to {
        return Err(CronError::bad_token(input, field, part));
    }
    clauses.push_range(from, to);
    Ok(())
}

/// A single value: alias substitution, integer parse, day_of_week `7 -> 0`
/// normalization, range check.
fn parse_value(input: &str, field: Field, token: &str) -> Result<u8, CronError> {
    if let Some(value) = field.alias_value(token) {
        return Ok(value);
    }
    let value: u32 = token
        .parse()
        .map_err(|_| CronError::bad_token(input, field, token))?;
    if field == Field::DayOfWeek && value == 7 {
        return Ok(0);
    }
    if value < u32::from(field.min()) || value > u32::from(field.max()) {
        return Err(CronError::out_of_range(input, field, value));
    }
    Ok(value as u8)
}

/// Range and step endpoints: like `parse_value`, but day_of_week keeps a
/// literal `7` as written — the engine treats 0 and 7 as Sunday.
fn parse_bound(input: &str, field: Field, token: &str) -> Result<u8, CronError> {
    if let Some(value) = field.alias_value(token) {
        return Ok(value);
    }
    let value: u32 = token
        .parse()
        .map_err(|_| CronError::bad_token(input, field, token))?;
    if value < u32::from(field.min()) || value > u32::from(field.step_max()) {
        return Err(CronError::out_of_range(input, field, value));
    }
    Ok(value as u8)
}

fn strip_numeric_suffix(part: &str, suffix: char) -> Option<&str> {
    part.strip_suffix(suffix)
        .filter(|head| !head.is_empty() && head.bytes().all(|b| b.is_ascii_digit()))
}
