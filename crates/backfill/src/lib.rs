//! Calendar-bucketed backfill checks.
//!
//! [`IntervalChecker`] walks the most recently completed day, week or month
//! buckets and triggers a flow for every bucket whose destination data is
//! missing while its source data is present. [`DataChecker`] is the single-shot
//! variant without buckets.

pub mod bucket;
pub mod checker;
pub mod clock;
pub mod interval;

pub use bucket::{Granularity, ParseGranularityError, TimeBucket, buckets, last_completed_start};
pub use checker::{CheckProbe, DataChecker, DataProbe, SourceWithoutDestination};
pub use clock::{Clock, FixedClock, SystemClock};
pub use interval::{
    BackfillProbe, BucketDecision, BucketOutcome, IntervalChecker, IntervalCheckerConfig,
    checker_definition,
};
