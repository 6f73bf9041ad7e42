//! Temporal Splitter
//!
//! Splits each user's event history chronologically into train,
//! validation and test partitions so that evaluation never sees the
//! future of its own training data.

use std::collections::HashMap;

use shopmind_core::error::{Result, ShopmindError};
use shopmind_core::models::Event;

const RATIO_TOLERANCE: f32 = 1e-6;

/// Train/validation/test fractions. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitRatios {
    pub train: f32,
    pub val: f32,
    pub test: f32,
}

impl SplitRatios {
    /// Ratios that do not sum to 1.0 (within tolerance) are a
    /// configuration mistake and are rejected, never coerced.
    pub fn new(train: f32, val: f32, test: f32) -> Result<Self> {
        let sum = train + val + test;
        if (sum - 1.0).abs() > RATIO_TOLERANCE {
            return Err(ShopmindError::Configuration(format!(
                "split ratios must sum to 1.0, got {sum}"
            )));
        }
        if train < 0.0 || val < 0.0 || test < 0.0 {
            return Err(ShopmindError::Configuration(
                "split ratios must be non-negative".to_string(),
            ));
        }
        Ok(Self { train, val, test })
    }
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            train: 0.6,
            val: 0.2,
            test: 0.2,
        }
    }
}

#[derive(Debug, Default)]
pub struct TemporalSplit {
    pub train: Vec<Event>,
    pub val: Vec<Event>,
    pub test: Vec<Event>,
}

/// Split events per user in chronological order.
///
/// With `n` events for a user, train takes indices up to
/// `floor(n * train)` and validation up to the cumulative boundary
/// `floor(n * (train + val))`; the remainder is test. The cumulative
/// boundary matters: computing the validation size independently as
/// `floor(n * val)` would leak events into test whenever the products
/// do not land on integer boundaries. No event is dropped or
/// duplicated; users with too few events simply end up with empty
/// partitions.
pub fn split_time_based(events: Vec<Event>, ratios: &SplitRatios) -> TemporalSplit {
    let mut per_user: HashMap<i64, Vec<Event>> = HashMap::new();
    for event in events {
        per_user.entry(event.user_id).or_default().push(event);
    }

    let mut split = TemporalSplit::default();
    for (_, mut history) in per_user {
        history.sort_by_key(|e| e.created_at);
        let n = history.len();
        let train_end = (n as f32 * ratios.train).floor() as usize;
        let val_end = (n as f32 * (ratios.train + ratios.val)).floor() as usize;

        for (i, event) in history.into_iter().enumerate() {
            if i < train_end {
                split.train.push(event);
            } else if i < val_end {
                split.val.push(event);
            } else {
                split.test.push(event);
            }
        }
    }
    split
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use shopmind_core::models::EventType;

    fn event(user_id: i64, product_id: i64, secs: i64) -> Event {
        Event {
            user_id,
            product_id,
            event_type: EventType::View,
            created_at: Utc.timestamp_opt(secs, 0).unwrap(),
        }
    }

    #[test]
    fn ratios_must_sum_to_one() {
        assert!(SplitRatios::new(0.6, 0.2, 0.2).is_ok());
        assert!(matches!(
            SplitRatios::new(0.6, 0.2, 0.3),
            Err(ShopmindError::Configuration(_))
        ));
    }

    #[test]
    fn five_events_at_default_ratios_split_three_one_one() {
        let events: Vec<Event> = (0..5).map(|i| event(1, 10 + i, i)).collect();
        let split = split_time_based(events, &SplitRatios::default());
        assert_eq!(split.train.len(), 3);
        assert_eq!(split.val.len(), 1);
        assert_eq!(split.test.len(), 1);
        // Chronological: earliest events train, latest test.
        assert_eq!(split.train[0].product_id, 10);
        assert_eq!(split.val[0].product_id, 13);
        assert_eq!(split.test[0].product_id, 14);
    }

    #[test]
    fn validation_boundary_is_cumulative() {
        // n=5 at (0.5, 0.3, 0.2): boundaries floor(2.5)=2 and
        // floor(4.0)=4, so 2/2/1. Sizing validation independently as
        // floor(5*0.3)=1 would wrongly push an event into test.
        let events: Vec<Event> = (0..5).map(|i| event(1, 10 + i, i)).collect();
        let ratios = SplitRatios::new(0.5, 0.3, 0.2).unwrap();
        let split = split_time_based(events, &ratios);
        assert_eq!(split.train.len(), 2);
        assert_eq!(split.val.len(), 2);
        assert_eq!(split.test.len(), 1);
    }

    #[test]
    fn no_event_is_dropped_or_duplicated() {
        let mut events = Vec::new();
        for user in 1..=4 {
            for i in 0..user {
                events.push(event(user, i, i));
            }
        }
        let total = events.len();
        let split = split_time_based(events, &SplitRatios::default());
        assert_eq!(split.train.len() + split.val.len() + split.test.len(), total);
    }

    #[test]
    fn single_event_user_goes_entirely_to_test() {
        let split = split_time_based(vec![event(1, 10, 0)], &SplitRatios::default());
        assert!(split.train.is_empty());
        assert!(split.val.is_empty());
        assert_eq!(split.test.len(), 1);
    }
}
