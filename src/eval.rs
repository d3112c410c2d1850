use std::fmt;

use jiff::civil::{Date, Time};
use jiff::tz::TimeZone;
use jiff::{Span, Zoned};

use crate::error::CronError;
use crate::expr::{CronExpr, Field, FieldMatcher};

/// Default number of matches emitted by a search.
pub(crate) const DEFAULT_MATCH_COUNT: usize = 2;

/// Default bound on advance steps per search.
pub(crate) const DEFAULT_MAX_LOOP_COUNT: usize = 1000;

/// Bound on the day-by-day scan inside a single advance step. Four years of
/// days covers the sparsest valid expression (Feb 29).
const MAX_DAY_SCAN: u32 = 4 * 366;

/// Options for a forward search.
pub struct SearchOptions {
    /// IANA timezone name used for all field extraction. `None` means UTC.
    pub timezone: Option<String>,
    /// Inclusive lower bound, truncated to whole-minute precision. `None`
    /// means the current wall-clock instant.
    pub start_at: Option<Zoned>,
    /// Maximum number of instants to emit.
    pub match_count: usize,
    /// Upper bound on advance-step iterations, protecting against
    /// expressions that never (or almost never) fire.
    pub max_loop_count: usize,
    /// Optional filter; rejected instants do not count against
    /// `match_count` but still consume the loop budget.
    pub match_validator: Option<Box<dyn Fn(&Zoned) -> bool>>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            timezone: None,
            start_at: None,
            match_count: DEFAULT_MATCH_COUNT,
            max_loop_count: DEFAULT_MAX_LOOP_COUNT,
            match_validator: None,
        }
    }
}

impl fmt::Debug for SearchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchOptions")
            .field("timezone", &self.timezone)
            .field("start_at", &self.start_at)
            .field("match_count", &self.match_count)
            .field("max_loop_count", &self.max_loop_count)
            .field("match_validator", &self.match_validator.is_some())
            .finish()
    }
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    pub fn with_start(mut self, start_at: Zoned) -> Self {
        self.start_at = Some(start_at);
        self
    }

    pub fn with_match_count(mut self, match_count: usize) -> Self {
        self.match_count = match_count;
        self
    }

    pub fn with_max_loop_count(mut self, max_loop_count: usize) -> Self {
        self.max_loop_count = max_loop_count;
        self
    }

    pub fn with_validator(mut self, validator: impl Fn(&Zoned) -> bool + 'static) -> Self {
        self.match_validator = Some(Box::new(validator));
        self
    }
}

/// Resolve the search timezone, defaulting to UTC.
fn resolve_tz(tz: &Option<String>) -> Result<TimeZone, CronError> {
    match tz {
        Some(name) => TimeZone::get(name)
            .map_err(|e| CronError::eval(format!("invalid timezone '{name}': {e}"))),
        None => Ok(TimeZone::UTC),
    }
}

/// Check whether `zdt` is a firing minute for `expr`, with every field
/// extracted in the timezone `zdt` carries.
pub fn matches(expr: &CronExpr, zdt: &Zoned) -> bool {
    let date = zdt.date();
    field_accepts(&expr.minute, zdt.time().minute() as u8)
        && field_accepts(&expr.hour, zdt.time().hour() as u8)
        && field_accepts(&expr.month, date.month() as u8)
        && day_matches(expr, date)
}

fn field_accepts(matcher: &FieldMatcher, v: u8) -> bool {
    match matcher {
        FieldMatcher::Any | FieldMatcher::Omit => true,
        FieldMatcher::Clauses(clauses) => clauses.accepts(v),
    }
}

/// The Vixie day rule: when both day fields are constrained, either one
/// matching satisfies the day condition. A `?` excludes its field from the
/// disjunction, which is the whole reason it is distinct from `*`.
fn day_matches(expr: &CronExpr, date: Date) -> bool {
    match (
        expr.day_of_month.is_unrestricted(),
        expr.day_of_week.is_unrestricted(),
    ) {
        (true, true) => true,
        (false, true) => day_of_month_matches(&expr.day_of_month, date),
        (true, false) => day_of_week_matches(&expr.day_of_week, date),
        (false, false) => {
            day_of_month_matches(&expr.day_of_month, date)
                || day_of_week_matches(&expr.day_of_week, date)
        }
    }
}

fn day_of_month_matches(matcher: &FieldMatcher, date: Date) -> bool {
    let clauses = match matcher {
        FieldMatcher::Any | FieldMatcher::Omit => return true,
        FieldMatcher::Clauses(clauses) => clauses,
    };
    let day = date.day() as u8;
    if clauses.accepts(day) {
        return true;
    }
    if clauses.last_day && day == date.days_in_month() as u8 {
        return true;
    }
    if clauses.last_weekday && day == last_weekday_of_month(date) {
        return true;
    }
    clauses
        .nearest_weekdays
        .iter()
        .any(|&target| day == nearest_weekday(date, target))
}

fn day_of_week_matches(matcher: &FieldMatcher, date: Date) -> bool {
    let clauses = match matcher {
        FieldMatcher::Any | FieldMatcher::Omit => return true,
        FieldMatcher::Clauses(clauses) => clauses,
    };
    let dow = date.weekday().to_sunday_zero_offset() as u8;
    // Sunday answers to both 0 and 7.
    if clauses.accepts(dow) || (dow == 0 && clauses.accepts(7)) {
        return true;
    }
    let day = date.day() as u8;
    if clauses
        .nth_weekdays
        .iter()
        .any(|nth| nth.weekday == dow && (day - 1) / 7 + 1 == nth.nth)
    {
        return true;
    }
    clauses
        .last_weekdays
        .iter()
        .any(|&weekday| weekday == dow && day + 7 > date.days_in_month() as u8)
}

/// Weekday (Sunday-zero) of a given day number within `date`'s month.
fn weekday_of(date: Date, day: u8) -> u8 {
    let first_dow = date.first_of_month().weekday().to_sunday_zero_offset() as u8;
    (first_dow + day - 1) % 7
}

/// Day number of the last Mon-Fri of `date`'s month.
fn last_weekday_of_month(date: Date) -> u8 {
    let mut day = date.days_in_month() as u8;
    loop {
        match weekday_of(date, day) {
            1..=5 => return day,
            _ => day -= 1,
        }
    }
}

/// Resolve an `nW` target within `date`'s month: the closest Mon-Fri to day
/// `target`, never crossing a month boundary.
fn nearest_weekday(date: Date, target: u8) -> u8 {
    let last = date.days_in_month() as u8;
    let candidate = target.clamp(1, last);
    match weekday_of(date, candidate) {
        1..=5 => candidate,
        // Sunday: roll forward to Monday unless that leaves the month
        0 => {
            if candidate == last {
                candidate - 2
            } else {
                candidate + 1
            }
        }
        // Saturday: roll back to Friday unless that leaves the month
        _ => {
            if candidate == 1 {
                candidate + 2
            } else {
                candidate - 1
            }
        }
    }
}

/// Smallest accepted value in `[min, max]`, treating `*`/`?` as `min`.
/// `None` means the matcher accepts nothing (all-zero steps).
fn first_value(matcher: &FieldMatcher, min: u8, max: u8) -> Option<u8> {
    match matcher {
        FieldMatcher::Any | FieldMatcher::Omit => Some(min),
        FieldMatcher::Clauses(clauses) => (min..=max).find(|&v| clauses.accepts(v)),
    }
}

/// Smallest accepted value strictly greater than `current`. Only meaningful
/// for matchers built from values, ranges, and steps; the date-shaped
/// clauses go through the day iteration instead.
fn next_value(matcher: &FieldMatcher, current: u8, max: u8) -> Option<u8> {
    match matcher {
        FieldMatcher::Any | FieldMatcher::Omit => (current < max).then(|| current + 1),
        FieldMatcher::Clauses(clauses) => (current + 1..=max).find(|&v| clauses.accepts(v)),
    }
}

/// Build a zoned instant at a wall-clock position, resolving DST gaps and
/// folds with jiff's compatible strategy.
fn zoned_at(date: Date, hour: u8, minute: u8, tz: &TimeZone) -> Option<Zoned> {
    let time = Time::new(hour as i8, minute as i8, 0, 0).ok()?;
    date.to_datetime(time).to_zoned(tz.clone()).ok()
}

fn truncate_to_minute(zdt: &Zoned) -> Option<Zoned> {
    zdt.with().second(0).subsec_nanosecond(0).build().ok()
}

/// Earliest instant strictly after `cursor` that could match `expr`,
/// guaranteed to skip no true match. Returns `None` when the bounded day
/// scan finds no plausible day.
fn advance(expr: &CronExpr, cursor: &Zoned) -> Option<Zoned> {
    let stepped = next_plausible(expr, cursor)?;
    // Around a DST fold a larger civil time can map to an earlier instant;
    // fall back to the minute step so the cursor always moves forward.
    if stepped > *cursor {
        Some(stepped)
    } else {
        cursor.checked_add(Span::new().minutes(1)).ok()
    }
}

fn next_plausible(expr: &CronExpr, cursor: &Zoned) -> Option<Zoned> {
    // Every minute fires: `* * * * *` and its `?` variants.
    if expr.minute.is_unrestricted()
        && expr.hour.is_unrestricted()
        && expr.month.is_unrestricted()
        && expr.day_of_month.is_unrestricted()
        && expr.day_of_week.is_unrestricted()
    {
        return cursor.checked_add(Span::new().minutes(1)).ok();
    }

    let tz = cursor.time_zone();
    let date = cursor.date();

    // The cursor's day already matches: move within the minute and hour
    // matchers, carrying minute wraps into the hour.
    if field_accepts(&expr.month, date.month() as u8) && day_matches(expr, date) {
        if field_accepts(&expr.hour, cursor.time().hour() as u8) {
            if let Some(minute) =
                next_value(&expr.minute, cursor.time().minute() as u8, Field::Minute.max())
            {
                return zoned_at(date, cursor.time().hour() as u8, minute, tz);
            }
        }
        if let Some(hour) = next_value(&expr.hour, cursor.time().hour() as u8, Field::Hour.max()) {
            let minute = first_value(&expr.minute, 0, Field::Minute.max())?;
            return zoned_at(date, hour, minute, tz);
        }
    }

    // Day iteration: scan forward for the next accepting date, skipping
    // whole months that cannot match.
    let first_hour = first_value(&expr.hour, 0, Field::Hour.max())?;
    let first_minute = first_value(&expr.minute, 0, Field::Minute.max())?;
    let mut day = date.tomorrow().ok()?;
    let mut scanned = 0u32;
    while scanned < MAX_DAY_SCAN {
        if !field_accepts(&expr.month, day.month() as u8) {
            day = next_month_start(day)?;
            scanned += 1;
            continue;
        }
        // With day_of_week unconstrained and a plain day_of_month matcher,
        // jump straight to the smallest day that could match.
        if expr.day_of_week.is_unrestricted() {
            if let FieldMatcher::Clauses(clauses) = &expr.day_of_month {
                if clauses.is_simple() {
                    let min_day = first_value(&expr.day_of_month, 1, Field::DayOfMonth.max())?;
                    if (day.day() as u8) < min_day {
                        if min_day <= day.days_in_month() as u8 {
                            day = Date::new(day.year(), day.month(), min_day as i8).ok()?;
                        } else {
                            day = next_month_start(day)?;
                            scanned += 1;
                            continue;
                        }
                    }
                }
            }
        }
        if day_matches(expr, day) {
            return zoned_at(day, first_hour, first_minute, tz);
        }
        day = day.tomorrow().ok()?;
        scanned += 1;
    }
    None
}

fn next_month_start(date: Date) -> Option<Date> {
    date.last_of_month().tomorrow().ok()
}

/// Run the bounded forward search of `expr` under `options`.
///
/// Emits at most `match_count` instants, each at or after the truncated
/// start, in ascending order. Budget exhaustion yields a truncated
/// (possibly empty) sequence rather than an error.
pub fn next(expr: &CronExpr, options: &SearchOptions) -> Result<Vec<Zoned>, CronError> {
    let tz = resolve_tz(&options.timezone)?;
    let start = match &options.start_at {
        Some(at) => at.with_time_zone(tz),
        None => Zoned::now().with_time_zone(tz),
    };
    let mut cursor = truncate_to_minute(&start)
        .ok_or_else(|| CronError::eval("cannot truncate start instant to minute precision"))?;

    let mut found = Vec::with_capacity(options.match_count.min(64));
    for _ in 0..options.max_loop_count {
        if found.len() >= options.match_count {
            break;
        }
        if matches(expr, &cursor)
            && options
                .match_validator
                .as_ref()
                .map_or(true, |accept| accept(&cursor))
        {
            found.push(cursor.clone());
            if found.len() >= options.match_count {
                break;
            }
        }
        match advance(expr, &cursor) {
            Some(next) => cursor = next,
            None => break,
        }
    }
    Ok(found)
}

/// First firing instant strictly after `now`, in `now`'s own timezone.
pub fn next_from(expr: &CronExpr, now: &Zoned) -> Option<Zoned> {
    let truncated = truncate_to_minute(now)?;
    let mut cursor = advance(expr, &truncated)?;
    for _ in 0..DEFAULT_MAX_LOOP_COUNT {
        if matches(expr, &cursor) {
            return Some(cursor);
        }
        cursor = advance(expr, &cursor)?;
    }
    None
}

/// Lazy iterator over the firing instants of an expression, strictly after
/// the starting instant. Ends when the bounded scan finds no further match.
pub struct Occurrences<'a> {
    expr: &'a CronExpr,
    cursor: Option<Zoned>,
}

impl<'a> Occurrences<'a> {
    pub(crate) fn new(expr: &'a CronExpr, from: Zoned) -> Self {
        Self {
            expr,
            cursor: truncate_to_minute(&from),
        }
    }
}

impl Iterator for Occurrences<'_> {
    type Item = Zoned;

    fn next(&mut self) -> Option<Self::Item> {
        let mut cursor = self.cursor.take()?;
        for _ in 0..DEFAULT_MAX_LOOP_COUNT {
            cursor = advance(self.expr, &cursor)?;
            if matches(self.expr, &cursor) {
                self.cursor = Some(cursor.clone());
                return Some(cursor);
            }
        }
        None
    }
}
