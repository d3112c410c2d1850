//! Property tests over randomly generated expressions and start instants:
//! every emitted instant matches, sequences ascend strictly, restarting at
//! an emitted instant re-emits it, and no minute between two consecutive
//! matches fires.

use cronex::{CronExpr, SearchOptions};
use jiff::{Span, Zoned};
use proptest::prelude::*;

fn join(values: Vec<u8>) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// A field built from values, ranges, and steps within `min..=max`.
fn arb_simple_field(min: u8, max: u8) -> impl Strategy<Value = String> {
    prop_oneof![
        Just("*".to_string()),
        (min..=max).prop_map(|v| v.to_string()),
        (min..=max, min..=max).prop_map(|(a, b)| format!("{}-{}", a.min(b), a.max(b))),
        (min..=max, 1u8..=10).prop_map(|(from, step)| format!("{from}/{step}")),
        prop::collection::vec(min..=max, 1..4).prop_map(join),
    ]
}

/// Day-of-month capped at 28 so every month can fire.
fn arb_day_of_month() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("*".to_string()),
        Just("?".to_string()),
        (1u8..=28).prop_map(|v| v.to_string()),
        (1u8..=28, 1u8..=28).prop_map(|(a, b)| format!("{}-{}", a.min(b), a.max(b))),
    ]
}

fn arb_day_of_week() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("*".to_string()),
        Just("?".to_string()),
        (0u8..=6).prop_map(|v| v.to_string()),
        (0u8..=6, 0u8..=6).prop_map(|(a, b)| format!("{}-{}", a.min(b), a.max(b))),
    ]
}

fn arb_expr() -> impl Strategy<Value = String> {
    (
        arb_simple_field(0, 59),
        arb_simple_field(0, 23),
        arb_day_of_month(),
        arb_simple_field(1, 12),
        arb_day_of_week(),
    )
        .prop_map(|(minute, hour, dom, month, dow)| format!("{minute} {hour} {dom} {month} {dow}"))
}

fn arb_start() -> impl Strategy<Value = Zoned> {
    (0i64..730, 0i64..1440).prop_map(|(days, minutes)| {
        let base: Zoned = "2024-01-01T00:00:00+00:00[UTC]".parse().unwrap();
        base.checked_add(Span::new().days(days).minutes(minutes))
            .unwrap()
    })
}

fn minutes_between(a: &Zoned, b: &Zoned) -> i64 {
    (b.timestamp().as_second() - a.timestamp().as_second()) / 60
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn generated_expressions_parse(pattern in arb_expr()) {
        prop_assert!(CronExpr::validate(&pattern), "failed to parse {pattern}");
    }

    #[test]
    fn emitted_instants_match_and_ascend(pattern in arb_expr(), start in arb_start()) {
        let expr = CronExpr::parse(&pattern).unwrap();
        let options = SearchOptions::new().with_start(start).with_match_count(4);
        let fires = expr.next(&options).unwrap();
        for fire in &fires {
            prop_assert!(expr.matches(fire), "{pattern} emitted non-match {fire}");
        }
        for pair in fires.windows(2) {
            prop_assert!(pair[0] < pair[1], "{pattern} emitted out of order");
        }
    }

    #[test]
    fn restarting_at_a_match_reemits_it(pattern in arb_expr(), start in arb_start()) {
        let expr = CronExpr::parse(&pattern).unwrap();
        let options = SearchOptions::new().with_start(start).with_match_count(3);
        for fire in expr.next(&options).unwrap() {
            let restarted = SearchOptions::new()
                .with_start(fire.clone())
                .with_match_count(1);
            let again = expr.next(&restarted).unwrap();
            prop_assert_eq!(again.first(), Some(&fire), "{} lost a match on restart", pattern);
        }
    }

    #[test]
    fn no_minute_between_consecutive_matches_fires(pattern in arb_expr(), start in arb_start()) {
        let expr = CronExpr::parse(&pattern).unwrap();
        let options = SearchOptions::new().with_start(start).with_match_count(3);
        let fires = expr.next(&options).unwrap();
        for pair in fires.windows(2) {
            // Exhaustively probing month-long gaps is too slow; bound the walk
            if minutes_between(&pair[0], &pair[1]) > 3 * 24 * 60 {
                continue;
            }
            let mut probe = pair[0].checked_add(Span::new().minutes(1)).unwrap();
            while probe < pair[1] {
                prop_assert!(
                    !expr.matches(&probe),
                    "{pattern} skipped a match at {probe}"
                );
                probe = probe.checked_add(Span::new().minutes(1)).unwrap();
            }
        }
    }

    #[test]
    fn occurrences_agree_with_next(pattern in arb_expr(), start in arb_start()) {
        let expr = CronExpr::parse(&pattern).unwrap();
        // `next` is inclusive of its start and `occurrences` is strictly
        // after; starting `next` one minute later lines the two up.
        let after = start.checked_add(Span::new().minutes(1)).unwrap();
        let options = SearchOptions::new().with_start(after).with_match_count(3);
        let from_next = expr.next(&options).unwrap();
        let from_iter: Vec<_> = expr.occurrences(&start).take(from_next.len()).collect();
        prop_assert_eq!(&from_iter[..], &from_next[..]);
    }
}
