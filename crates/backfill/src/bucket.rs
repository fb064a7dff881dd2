//! Calendar-aligned time buckets.
//!
//! Buckets are half-open `[start, end)` windows starting at midnight: one day, one
//! week starting Monday, or one whole calendar month.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use nagini_jobs::FlowParams;

const DATE_FORMAT: &str = "%Y-%m-%d";
const MONTH_FORMAT: &str = "%Y-%m";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Daily,
    Weekly,
    Monthly,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Daily => "daily",
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
        }
    }

    /// Start of the bucket following the one starting at `start`.
    pub fn next(&self, start: NaiveDate) -> Option<NaiveDate> {
        match self {
            Granularity::Daily => start.checked_add_days(Days::new(1)),
            Granularity::Weekly => start.checked_add_days(Days::new(7)),
            Granularity::Monthly => start.checked_add_months(Months::new(1)),
        }
    }

    /// Start of the bucket `count` buckets before the one starting at `start`.
    pub fn back(&self, start: NaiveDate, count: u32) -> Option<NaiveDate> {
        match self {
            Granularity::Daily => start.checked_sub_days(Days::new(u64::from(count))),
            Granularity::Weekly => start.checked_sub_days(Days::new(7 * u64::from(count))),
            Granularity::Monthly => start.checked_sub_months(Months::new(count)),
        }
    }

    /// Start of the bucket containing `date`.
    pub fn align(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Granularity::Daily => Some(date),
            Granularity::Weekly => date.checked_sub_days(Days::new(u64::from(
                date.weekday().num_days_from_monday(),
            ))),
            Granularity::Monthly => date.with_day(1),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown granularity {0:?} (expected daily, weekly or monthly)")]
pub struct ParseGranularityError(String);

impl FromStr for Granularity {
    type Err = ParseGranularityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "day" => Ok(Granularity::Daily),
            "weekly" | "week" => Ok(Granularity::Weekly),
            "monthly" | "month" => Ok(Granularity::Monthly),
            _ => Err(ParseGranularityError(s.to_string())),
        }
    }
}

/// A half-open calendar window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeBucket {
    pub granularity: Granularity,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimeBucket {
    /// The bucket starting at `start`, which must already be aligned.
    pub fn starting_at(granularity: Granularity, start: NaiveDate) -> Option<Self> {
        Some(Self {
            granularity,
            start,
            end: granularity.next(start)?,
        })
    }

    /// Flow parameters identifying this bucket.
    ///
    /// Daily: `day`. Weekly: `week`, `start`, `end`. Monthly: `month`.
    pub fn params(&self) -> FlowParams {
        let mut params = FlowParams::new();
        match self.granularity {
            Granularity::Daily => {
                params.insert("day".into(), self.start.format(DATE_FORMAT).to_string());
            }
            Granularity::Weekly => {
                let start = self.start.format(DATE_FORMAT).to_string();
                params.insert("week".into(), start.clone());
                params.insert("start".into(), start);
                params.insert("end".into(), self.end.format(DATE_FORMAT).to_string());
            }
            Granularity::Monthly => {
                params.insert("month".into(), self.start.format(MONTH_FORMAT).to_string());
            }
        }
        params
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Start of the most recent bucket that ended on or before `today`.
///
/// Daily: yesterday. Weekly: the Monday before this week's Monday. Monthly: the
/// first day of the previous month.
pub fn last_completed_start(granularity: Granularity, today: NaiveDate) -> Option<NaiveDate> {
    let current = granularity.align(today)?;
    granularity.back(current, 1)
}

/// The `max(check_interval, 1)` most recently completed buckets, oldest first.
///
/// Buckets are contiguous. The walk stops at the start of chrono's date range.
pub fn buckets(granularity: Granularity, check_interval: u32, today: NaiveDate) -> Vec<TimeBucket> {
    let Some(last) = last_completed_start(granularity, today) else {
        return Vec::new();
    };
    let count = check_interval.max(1) as usize;

    let mut starts: Vec<NaiveDate> =
        std::iter::successors(Some(last), |start| granularity.back(*start, 1))
            .take(count)
            .collect();
    starts.reverse();

    starts
        .into_iter()
        .filter_map(|start| TimeBucket::starting_at(granularity, start))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Weekday;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bounds(buckets: &[TimeBucket]) -> Vec<(NaiveDate, NaiveDate)> {
        buckets.iter().map(|b| (b.start, b.end)).collect()
    }

    #[test]
    fn monthly_two_buckets_mid_june() {
        let got = buckets(Granularity::Monthly, 2, date(2023, 6, 15));
        assert_eq!(
            bounds(&got),
            vec![
                (date(2023, 4, 1), date(2023, 5, 1)),
                (date(2023, 5, 1), date(2023, 6, 1)),
            ]
        );
    }

    #[test]
    fn monthly_buckets_span_whole_months() {
        let got = buckets(Granularity::Monthly, 3, date(2024, 3, 31));
        assert_eq!(
            bounds(&got),
            vec![
                (date(2023, 12, 1), date(2024, 1, 1)),
                (date(2024, 1, 1), date(2024, 2, 1)),
                (date(2024, 2, 1), date(2024, 3, 1)),
            ]
        );
    }

    #[test]
    fn weekly_buckets_start_on_monday() {
        // 2023-06-15 is a Thursday; this week's Monday is 2023-06-12.
        let got = buckets(Granularity::Weekly, 2, date(2023, 6, 15));
        assert_eq!(
            bounds(&got),
            vec![
                (date(2023, 5, 29), date(2023, 6, 5)),
                (date(2023, 6, 5), date(2023, 6, 12)),
            ]
        );

        // On a Monday the current week has not completed yet.
        let got = buckets(Granularity::Weekly, 1, date(2023, 6, 12));
        assert_eq!(bounds(&got), vec![(date(2023, 6, 5), date(2023, 6, 12))]);
    }

    #[test]
    fn daily_buckets_end_today() {
        let got = buckets(Granularity::Daily, 3, date(2023, 3, 2));
        assert_eq!(
            bounds(&got),
            vec![
                (date(2023, 2, 27), date(2023, 2, 28)),
                (date(2023, 2, 28), date(2023, 3, 1)),
                (date(2023, 3, 1), date(2023, 3, 2)),
            ]
        );
    }

    #[test]
    fn zero_interval_checks_a_single_bucket() {
        let got = buckets(Granularity::Monthly, 0, date(2023, 6, 15));
        assert_eq!(bounds(&got), vec![(date(2023, 5, 1), date(2023, 6, 1))]);
    }

    #[test]
    fn lookback_stops_at_the_start_of_the_date_range() {
        let got = buckets(Granularity::Monthly, u32::MAX, NaiveDate::MIN);
        assert!(got.is_empty());

        let got = buckets(Granularity::Daily, u32::MAX, date(-262_000, 1, 3));
        assert!(!got.is_empty());
        assert!(got.len() < 1_000_000);
    }

    #[test]
    fn bucket_params_per_granularity() {
        let day = TimeBucket::starting_at(Granularity::Daily, date(2023, 6, 14)).unwrap();
        assert_eq!(day.params().get("day").map(String::as_str), Some("2023-06-14"));
        assert_eq!(day.params().len(), 1);

        let week = TimeBucket::starting_at(Granularity::Weekly, date(2023, 6, 5)).unwrap();
        let params = week.params();
        assert_eq!(params.get("week").map(String::as_str), Some("2023-06-05"));
        assert_eq!(params.get("start").map(String::as_str), Some("2023-06-05"));
        assert_eq!(params.get("end").map(String::as_str), Some("2023-06-12"));

        let month = TimeBucket::starting_at(Granularity::Monthly, date(2023, 5, 1)).unwrap();
        assert_eq!(month.params().get("month").map(String::as_str), Some("2023-05"));
    }

    #[test]
    fn granularity_parses_and_serializes() {
        assert_eq!("Monthly".parse::<Granularity>(), Ok(Granularity::Monthly));
        assert_eq!("week".parse::<Granularity>(), Ok(Granularity::Weekly));
        assert!("hourly".parse::<Granularity>().is_err());
        assert_eq!(
            serde_json::to_value(Granularity::Daily).unwrap(),
            serde_json::json!("daily")
        );
    }

    fn granularity() -> impl Strategy<Value = Granularity> {
        prop_oneof![
            Just(Granularity::Daily),
            Just(Granularity::Weekly),
            Just(Granularity::Monthly),
        ]
    }

    fn any_day() -> impl Strategy<Value = NaiveDate> {
        // 1990-01-01 .. roughly 2080
        (0u64..33_000).prop_map(|offset| {
            date(1990, 1, 1)
                .checked_add_days(Days::new(offset))
                .unwrap()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

        #[test]
        fn window_count_is_interval_or_one(
            g in granularity(),
            interval in 0u32..60,
            today in any_day(),
        ) {
            let got = buckets(g, interval, today);
            prop_assert_eq!(got.len() as u32, interval.max(1));
        }

        #[test]
        fn buckets_are_contiguous_and_chronological(
            g in granularity(),
            interval in 0u32..60,
            today in any_day(),
        ) {
            let got = buckets(g, interval, today);
            for pair in got.windows(2) {
                prop_assert!(pair[0].start < pair[1].start);
                prop_assert_eq!(pair[0].end, pair[1].start);
            }
            for bucket in &got {
                prop_assert!(bucket.start < bucket.end);
            }
        }

        #[test]
        fn buckets_are_aligned_and_completed(
            g in granularity(),
            interval in 0u32..60,
            today in any_day(),
        ) {
            let got = buckets(g, interval, today);
            for bucket in &got {
                match g {
                    Granularity::Daily => {}
                    Granularity::Weekly => {
                        prop_assert_eq!(bucket.start.weekday(), Weekday::Mon);
                        prop_assert_eq!((bucket.end - bucket.start).num_days(), 7);
                    }
                    Granularity::Monthly => {
                        prop_assert_eq!(bucket.start.day(), 1);
                        prop_assert_eq!(bucket.end.day(), 1);
                    }
                }
            }

            // The newest bucket ends exactly where the current, incomplete bucket starts.
            let newest = got.last().unwrap();
            prop_assert!(newest.end <= today);
            prop_assert_eq!(Some(newest.end), g.align(today));
        }
    }
}
