// 📊 Usage Aggregator - Per-email visit summaries from the booking log
//
// Only counted statuses (confirmed, attended) contribute. Each summary is
// built once and exposed read-only.

use crate::entities::BookingEvent;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// POLICY + RESULT TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationPolicy {
    /// Count events whose date is missing/unparseable (they never affect recency)
    pub count_undated_events: bool,
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        AggregationPolicy {
            count_undated_events: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub count: u64,
    pub last_date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationStats {
    pub total_events: usize,
    pub counted_events: usize,
    pub excluded_by_status: usize,
    pub undated_counted: usize,
    pub undated_dropped: usize,
    pub unkeyed_events: usize,
}

// ============================================================================
// USAGE AGGREGATOR
// ============================================================================

pub struct UsageAggregator {
    summaries: HashMap<String, UsageSummary>,
    stats: AggregationStats,
}

impl UsageAggregator {
    pub fn from_events(events: &[BookingEvent]) -> Self {
        Self::with_policy(events, &AggregationPolicy::default())
    }

    pub fn with_policy(events: &[BookingEvent], policy: &AggregationPolicy) -> Self {
        let mut summaries: HashMap<String, UsageSummary> = HashMap::new();
        let mut stats = AggregationStats {
            total_events: events.len(),
            ..AggregationStats::default()
        };

        for event in events {
            if !event.is_counted() {
                stats.excluded_by_status += 1;
                continue;
            }

            // An event with no email can never be reached through a link
            if event.email.is_empty() {
                stats.unkeyed_events += 1;
                continue;
            }

            if event.date.is_none() {
                if !policy.count_undated_events {
                    stats.undated_dropped += 1;
                    continue;
                }
                stats.undated_counted += 1;
            }

            let summary = summaries
                .entry(event.email.clone())
                .or_insert(UsageSummary {
                    count: 0,
                    last_date: None,
                });
            summary.count += 1;
            summary.last_date = later(summary.last_date, event.date);
            stats.counted_events += 1;
        }

        UsageAggregator { summaries, stats }
    }

    pub fn summary_for(&self, email: &str) -> Option<&UsageSummary> {
        self.summaries.get(email)
    }

    /// Number of distinct emails with at least one counted event
    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }

    pub fn stats(&self) -> &AggregationStats {
        &self.stats
    }
}

/// Max of two optional timestamps, skipping absent values
pub fn later(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>) -> Option<NaiveDateTime> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn create_test_event(id: &str, email: &str, status: &str, date: &str) -> BookingEvent {
        BookingEvent::new(id, email, status, date)
    }

    #[test]
    fn test_counts_and_last_date() {
        let events = vec![
            create_test_event("1", "x1@ghost.club", "confirmed", "2024-04-01"),
            create_test_event("2", "x1@ghost.club", "attended", "2024-05-01"),
            create_test_event("3", "jane@real.com", "attended", "2024-06-01"),
        ];
        let agg = UsageAggregator::from_events(&events);

        let x1 = agg.summary_for("x1@ghost.club").unwrap();
        assert_eq!(x1.count, 2);
        assert_eq!(x1.last_date, Some(day(2024, 5, 1)));

        let jane = agg.summary_for("jane@real.com").unwrap();
        assert_eq!(jane.count, 1);
        assert_eq!(agg.len(), 2);
    }

    #[test]
    fn test_excluded_statuses_are_ignored() {
        let events = vec![
            create_test_event("1", "a@x.com", "cancelled", "2024-09-01"),
            create_test_event("2", "a@x.com", "no_show", "2024-09-02"),
            create_test_event("3", "b@x.com", "cancelled", "2024-09-03"),
            create_test_event("4", "a@x.com", "attended", "2024-01-01"),
        ];
        let agg = UsageAggregator::from_events(&events);

        let a = agg.summary_for("a@x.com").unwrap();
        assert_eq!(a.count, 1);
        assert_eq!(a.last_date, Some(day(2024, 1, 1)));
        assert!(agg.summary_for("b@x.com").is_none());
        assert_eq!(agg.stats().excluded_by_status, 3);
    }

    #[test]
    fn test_earlier_event_never_changes_last_date() {
        let mut events = vec![create_test_event("1", "a@x.com", "attended", "2024-06-01")];
        let before = *UsageAggregator::from_events(&events)
            .summary_for("a@x.com")
            .unwrap();

        events.push(create_test_event("2", "a@x.com", "confirmed", "2023-01-01"));
        let after = *UsageAggregator::from_events(&events)
            .summary_for("a@x.com")
            .unwrap();

        assert_eq!(after.count, before.count + 1);
        assert_eq!(after.last_date, before.last_date);
    }

    #[test]
    fn test_undated_events_counted_but_not_dated() {
        let events = vec![
            create_test_event("1", "a@x.com", "attended", "garbage"),
            create_test_event("2", "a@x.com", "attended", ""),
        ];
        let agg = UsageAggregator::from_events(&events);
        let a = agg.summary_for("a@x.com").unwrap();
        assert_eq!(a.count, 2);
        assert_eq!(a.last_date, None);
        assert_eq!(agg.stats().undated_counted, 2);
    }

    #[test]
    fn test_undated_events_dropped_when_policy_says_so() {
        let events = vec![
            create_test_event("1", "a@x.com", "attended", "garbage"),
            create_test_event("2", "a@x.com", "attended", "2024-02-02"),
        ];
        let policy = AggregationPolicy {
            count_undated_events: false,
        };
        let agg = UsageAggregator::with_policy(&events, &policy);
        assert_eq!(agg.summary_for("a@x.com").unwrap().count, 1);
        assert_eq!(agg.stats().undated_dropped, 1);
    }

    #[test]
    fn test_events_without_email_are_unkeyed() {
        let events = vec![create_test_event("1", "  ", "attended", "2024-02-02")];
        let agg = UsageAggregator::from_events(&events);
        assert!(agg.is_empty());
        assert_eq!(agg.stats().unkeyed_events, 1);
    }

    #[test]
    fn test_later_skips_absent_values() {
        assert_eq!(later(None, None), None);
        assert_eq!(later(Some(day(2024, 1, 1)), None), Some(day(2024, 1, 1)));
        assert_eq!(later(None, Some(day(2024, 1, 1))), Some(day(2024, 1, 1)));
        assert_eq!(
            later(Some(day(2024, 1, 1)), Some(day(2023, 1, 1))),
            Some(day(2024, 1, 1))
        );
    }
}
