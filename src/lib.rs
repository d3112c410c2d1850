//! cronex — cron expression parsing and timezone-aware occurrence search.
//!
//! Parses five-field cron expressions (four-field input defaults
//! day-of-week to `*`), including the `L`, `LW`, `nW`, `d#k`, and `dL`
//! extensions, month/weekday names, and the `@`-macros, into a normalized
//! form, then enumerates the future instants at which an expression fires
//! in any IANA timezone.
//!
//! # Examples
//!
//! ```
//! use cronex::CronExpr;
//!
//! let expr = CronExpr::parse("0 9 * * 1-5").unwrap();
//! let now: jiff::Zoned = "2024-01-01T00:00:00+00:00[UTC]".parse().unwrap();
//! let next = expr.next_from(&now).unwrap();
//! assert_eq!(next.to_string(), "2024-01-01T09:00:00+00:00[UTC]");
//! ```

pub mod error;
pub mod eval;
pub mod expr;
pub mod parser;

pub use error::CronError;
pub use eval::{Occurrences, SearchOptions};
pub use expr::{ClauseSet, CronExpr, Field, FieldMatcher, NthWeekday, Step};

use jiff::Zoned;
#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

// --- CronExpr convenience methods ---

impl CronExpr {
    /// Parse a cron expression string.
    ///
    /// # Examples
    ///
    /// ```
    /// use cronex::CronExpr;
    ///
    /// let expr = CronExpr::parse("*/15 9-17 * * MON-FRI").unwrap();
    /// assert_eq!(expr.to_string(), "*/15 9-17 * * MON-FRI");
    ///
    /// // Macros expand to their five-field form
    /// let expr = CronExpr::parse("@hourly").unwrap();
    /// assert_eq!(expr.pattern(), "@hourly");
    /// ```
    pub fn parse(input: &str) -> Result<Self, CronError> {
        parser::parse(input)
    }

    /// Check whether `zdt` is a firing minute for this expression, with
    /// every field extracted in the timezone `zdt` carries.
    ///
    /// # Examples
    ///
    /// ```
    /// use cronex::CronExpr;
    ///
    /// let expr = CronExpr::parse("*/15 9-17 * * 1-5").unwrap();
    ///
    /// let during: jiff::Zoned = "2024-01-02T09:30:00+00:00[UTC]".parse().unwrap();
    /// assert!(expr.matches(&during));
    ///
    /// let after_hours: jiff::Zoned = "2024-01-02T18:30:00+00:00[UTC]".parse().unwrap();
    /// assert!(!expr.matches(&after_hours));
    /// ```
    pub fn matches(&self, zdt: &Zoned) -> bool {
        eval::matches(self, zdt)
    }

    /// Run a bounded forward search and collect the firing instants.
    ///
    /// Emits at most `match_count` instants at or after the (truncated)
    /// start, in ascending order. Budget exhaustion yields a truncated,
    /// possibly empty, sequence. The only error is an unresolvable
    /// timezone name in the options.
    ///
    /// # Examples
    ///
    /// ```
    /// use cronex::{CronExpr, SearchOptions};
    ///
    /// let expr = CronExpr::parse("0 0 L * *").unwrap();
    /// let start: jiff::Zoned = "2024-01-01T00:00:00+00:00[UTC]".parse().unwrap();
    /// let options = SearchOptions::new().with_start(start).with_match_count(3);
    ///
    /// let fires = expr.next(&options).unwrap();
    /// assert_eq!(fires[1].to_string(), "2024-02-29T00:00:00+00:00[UTC]");
    /// ```
    pub fn next(&self, options: &SearchOptions) -> Result<Vec<Zoned>, CronError> {
        eval::next(self, options)
    }

    /// Compute the first firing instant strictly after `now`, in `now`'s
    /// own timezone. Returns `None` when the bounded search finds nothing.
    ///
    /// # Examples
    ///
    /// ```
    /// use cronex::CronExpr;
    ///
    /// let expr = CronExpr::parse("@monthly").unwrap();
    /// let now: jiff::Zoned = "2024-01-15T08:00:00+00:00[UTC]".parse().unwrap();
    /// let next = expr.next_from(&now).unwrap();
    /// assert_eq!(next.to_string(), "2024-02-01T00:00:00+00:00[UTC]");
    /// ```
    pub fn next_from(&self, now: &Zoned) -> Option<Zoned> {
        eval::next_from(self, now)
    }

    /// Returns a lazy iterator of firing instants strictly after `from`.
    ///
    /// The iterator is unbounded for repeating expressions (it will
    /// iterate forever unless limited) and ends when the internal scan
    /// bound finds no further match.
    ///
    /// # Examples
    ///
    /// ```
    /// use cronex::CronExpr;
    ///
    /// let expr = CronExpr::parse("0 12 * * *").unwrap();
    /// let from: jiff::Zoned = "2024-01-01T00:00:00+00:00[UTC]".parse().unwrap();
    ///
    /// let noons: Vec<_> = expr.occurrences(&from).take(3).collect();
    /// assert_eq!(noons.len(), 3);
    /// assert_eq!(noons[0].to_string(), "2024-01-01T12:00:00+00:00[UTC]");
    /// ```
    pub fn occurrences(&self, from: &Zoned) -> Occurrences<'_> {
        Occurrences::new(self, from.clone())
    }

    /// Check if an input string is a valid cron expression.
    ///
    /// # Examples
    ///
    /// ```
    /// use cronex::CronExpr;
    ///
    /// assert!(CronExpr::validate("0 9 * * 1-5"));
    /// assert!(!CronExpr::validate("not a cron expression"));
    /// ```
    pub fn validate(input: &str) -> bool {
        Self::parse(input).is_ok()
    }
}

impl FromStr for CronExpr {
    type Err = CronError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Serialization produces a structured JSON object keyed by field name,
/// with each matcher rendered as `"any"`, `"omit"`, or an object listing
/// its populated clause groups — designed for inspection, logging, and
/// debugging.
///
/// **Note:** Serialization and deserialization are intentionally
/// asymmetric. `Serialize` produces the structured object while
/// `Deserialize` expects a cron expression string (e.g. `"0 9 * * 1-5"`),
/// so `serde_json::from_str(serde_json::to_string(&expr))` will **not**
/// round-trip. The structured form is for inspection; the string form is
/// what configuration files and APIs carry.
#[cfg(feature = "serde")]
impl Serialize for CronExpr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("pattern", self.pattern())?;
        for field in Field::ALL {
            map.serialize_entry(field.name(), &matcher_to_json(self.field(field)))?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
fn matcher_to_json(matcher: &FieldMatcher) -> serde_json::Value {
    use serde_json::json;

    let clauses = match matcher {
        FieldMatcher::Any => return json!("any"),
        FieldMatcher::Omit => return json!("omit"),
        FieldMatcher::Clauses(clauses) => clauses,
    };

    let mut obj = serde_json::Map::new();
    if !clauses.values.is_empty() {
        obj.insert("values".into(), json!(clauses.values));
    }
    if !clauses.ranges.is_empty() {
        let ranges: Vec<_> = clauses
            .ranges
            .iter()
            .map(|&(from, to)| json!({ "from": from, "to": to }))
            .collect();
        obj.insert("ranges".into(), json!(ranges));
    }
    if !clauses.steps.is_empty() {
        let steps: Vec<_> = clauses
            .steps
            .iter()
            .map(|step| json!({ "from": step.from, "to": step.to, "step": step.step }))
            .collect();
        obj.insert("steps".into(), json!(steps));
    }
    if clauses.last_day {
        obj.insert("last_day".into(), json!(true));
    }
    if clauses.last_weekday {
        obj.insert("last_weekday".into(), json!(true));
    }
    if !clauses.nearest_weekdays.is_empty() {
        obj.insert("nearest_weekdays".into(), json!(clauses.nearest_weekdays));
    }
    if !clauses.nth_weekdays.is_empty() {
        let nths: Vec<_> = clauses
            .nth_weekdays
            .iter()
            .map(|nth| json!({ "weekday": nth.weekday, "nth": nth.nth }))
            .collect();
        obj.insert("nth_weekdays".into(), json!(nths));
    }
    if !clauses.last_weekdays.is_empty() {
        obj.insert("last_weekdays".into(), json!(clauses.last_weekdays));
    }
    serde_json::Value::Object(obj)
}

/// Deserialization expects a cron expression string, **not** the
/// structured JSON produced by `Serialize`. See the note on
/// [`Serialize`](#impl-Serialize-for-CronExpr) for details.
#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for CronExpr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        CronExpr::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;

    #[test]
    fn serializes_to_structured_json() {
        let expr = CronExpr::parse("*/15 9 L * ?").unwrap();
        let value = serde_json::to_value(&expr).unwrap();
        assert_eq!(value["pattern"], "*/15 9 L * ?");
        assert_eq!(value["minute"]["steps"][0]["step"], 15);
        assert_eq!(value["hour"]["values"][0], 9);
        assert_eq!(value["day_of_month"]["last_day"], true);
        assert_eq!(value["month"], "any");
        assert_eq!(value["day_of_week"], "omit");
    }

    #[test]
    fn deserializes_from_expression_string() {
        let expr: CronExpr = serde_json::from_str("\"0 9 * * 1-5\"").unwrap();
        assert_eq!(expr.pattern(), "0 9 * * 1-5");
    }

    #[test]
    fn deserialize_rejects_invalid_expressions() {
        assert!(serde_json::from_str::<CronExpr>("\"61 * * * *\"").is_err());
    }
}
