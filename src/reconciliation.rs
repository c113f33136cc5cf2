// ⚖️ Reconciliation Engine - Fold usage summaries into one profile per member
//
// Following the formula:
//   total_visits = Σ count(e)        for every linked email e (absent → 0)
//   last_visit   = max last_date(e)  skipping absent summaries and None dates
//
// Sum and max are both commutative, so the order of linked emails never
// changes the result.

use crate::entities::MemberRecord;
use crate::linker::{LinkedIdentity, LinkedProfile, MatchProvenance};
use crate::usage::{later, UsageAggregator};
use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

// ============================================================================
// CONSOLIDATED PROFILE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidatedProfile {
    pub member: MemberRecord,
    pub links: Vec<LinkedIdentity>,
    pub total_visits: u64,
    pub last_visit: Option<NaiveDateTime>,
}

impl ConsolidatedProfile {
    pub fn linked_emails(&self) -> impl Iterator<Item = &str> {
        self.links.iter().map(|l| l.email.as_str())
    }

    pub fn ghost_link_count(&self) -> usize {
        self.links.iter().filter(|l| l.is_ghost).count()
    }

    pub fn count_by(&self, provenance: MatchProvenance) -> usize {
        self.links.iter().filter(|l| l.provenance == provenance).count()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} ({}): {} linked, {} visits, last {}",
            self.member.display_name(),
            self.member.id,
            self.links.len(),
            self.total_visits,
            self.last_visit
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "never".to_string())
        )
    }
}

// ============================================================================
// RECONCILIATION ENGINE
// ============================================================================

pub struct ReconciliationEngine<'a> {
    usage: &'a UsageAggregator,
}

impl<'a> ReconciliationEngine<'a> {
    pub fn new(usage: &'a UsageAggregator) -> Self {
        ReconciliationEngine { usage }
    }

    /// Reconcile one linked profile against the usage summaries
    ///
    /// Example:
    /// ```
    /// use member_linkage::{
    ///     BookingEvent, IdentityIndex, Linker, MemberRecord, ReconciliationEngine,
    ///     UsageAggregator,
    /// };
    ///
    /// let usage = UsageAggregator::from_events(&[
    ///     BookingEvent::new("1", "jane@real.com", "attended", "2024-06-01"),
    /// ]);
    /// let index = IdentityIndex::build(Vec::new());
    /// let member = MemberRecord::from_client_name("1", "Jane Doe", "jane@real.com", "", "", "");
    ///
    /// let profile = ReconciliationEngine::new(&usage).reconcile(Linker::new(&index).link(&member));
    /// assert_eq!(profile.total_visits, 0); // no external account, nothing linked
    /// ```
    pub fn reconcile(&self, linked: LinkedProfile) -> ConsolidatedProfile {
        let (total_visits, last_visit) = self.fold(linked.linked_emails());

        ConsolidatedProfile {
            member: linked.member,
            links: linked.links,
            total_visits,
            last_visit,
        }
    }

    /// Reconcile every profile, keeping input order
    pub fn reconcile_all(
        &self,
        linked: Vec<LinkedProfile>,
        parallel: bool,
    ) -> Vec<ConsolidatedProfile> {
        if parallel {
            linked.into_par_iter().map(|p| self.reconcile(p)).collect()
        } else {
            linked.into_iter().map(|p| self.reconcile(p)).collect()
        }
    }

    /// Sum of counts + latest date over a set of emails
    pub fn fold<'e, I>(&self, emails: I) -> (u64, Option<NaiveDateTime>)
    where
        I: IntoIterator<Item = &'e str>,
    {
        emails
            .into_iter()
            .filter_map(|e| self.usage.summary_for(e))
            .fold((0, None), |(total, last), s| {
                (total + s.count, later(last, s.last_date))
            })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{BookingEvent, ExternalAccount, GhostPolicy};
    use crate::identity_index::IdentityIndex;
    use crate::linker::Linker;
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn create_test_event(email: &str, status: &str, date: &str) -> BookingEvent {
        BookingEvent::new("b", email, status, date)
    }

    fn jane_doe_fixture() -> (IdentityIndex, Vec<BookingEvent>, MemberRecord) {
        let policy = GhostPolicy::default();
        let index = IdentityIndex::build(vec![
            ExternalAccount::new("x1@ghost.club", "Jane", "Doe", &policy),
            ExternalAccount::new("jane@real.com", "John", "Smith", &policy),
        ]);
        let events = vec![
            create_test_event("x1@ghost.club", "confirmed", "2024-03-10"),
            create_test_event("x1@ghost.club", "attended", "2024-05-01"),
            create_test_event("jane@real.com", "attended", "2024-06-01"),
        ];
        let member =
            MemberRecord::from_client_name("1001", "Jane Doe", "jane@real.com", "", "", "");
        (index, events, member)
    }

    #[test]
    fn test_jane_doe_scenario() {
        let (index, events, member) = jane_doe_fixture();
        let usage = UsageAggregator::from_events(&events);
        let profile = ReconciliationEngine::new(&usage).reconcile(Linker::new(&index).link(&member));

        let mut linked: Vec<&str> = profile.linked_emails().collect();
        linked.sort();
        assert_eq!(linked, vec!["jane@real.com", "x1@ghost.club"]);
        assert_eq!(profile.count_by(MatchProvenance::NameMatch), 1);
        assert_eq!(profile.count_by(MatchProvenance::EmailMatch), 1);
        assert_eq!(profile.total_visits, 3);
        assert_eq!(profile.last_visit, Some(day(2024, 6, 1)));
    }

    #[test]
    fn test_additional_confirmed_booking_adds_exactly_one() {
        let (index, mut events, member) = jane_doe_fixture();
        let linked = Linker::new(&index).link(&member);

        let before = ReconciliationEngine::new(&UsageAggregator::from_events(&events))
            .reconcile(linked.clone())
            .total_visits;
        events.push(create_test_event("x1@ghost.club", "confirmed", "2022-01-01"));
        let after = ReconciliationEngine::new(&UsageAggregator::from_events(&events))
            .reconcile(linked)
            .total_visits;

        assert_eq!(after, before + 1);
    }

    #[test]
    fn test_cancelled_booking_contributes_nothing() {
        let (index, mut events, member) = jane_doe_fixture();
        events.push(create_test_event("jane@real.com", "cancelled", "2025-01-01"));
        let usage = UsageAggregator::from_events(&events);
        let profile = ReconciliationEngine::new(&usage).reconcile(Linker::new(&index).link(&member));

        assert_eq!(profile.total_visits, 3);
        assert_eq!(profile.last_visit, Some(day(2024, 6, 1)));
    }

    #[test]
    fn test_no_match_yields_zero_and_none() {
        let (index, events, _) = jane_doe_fixture();
        let usage = UsageAggregator::from_events(&events);
        let stranger = MemberRecord::from_client_name("2", "Zed Zee", "zed@x.com", "", "", "");
        let profile =
            ReconciliationEngine::new(&usage).reconcile(Linker::new(&index).link(&stranger));

        assert_eq!(profile.linked_emails().count(), 0);
        assert_eq!(profile.total_visits, 0);
        assert_eq!(profile.last_visit, None);
        assert_eq!(profile.summary(), "Zed Zee (2): 0 linked, 0 visits, last never");
    }

    #[test]
    fn test_fold_is_order_independent() {
        let events = vec![
            create_test_event("a@x.com", "attended", "2024-01-01"),
            create_test_event("b@x.com", "attended", "2024-03-01"),
            create_test_event("b@x.com", "attended", "not a date"),
            create_test_event("c@x.com", "attended", ""),
        ];
        let usage = UsageAggregator::from_events(&events);
        let engine = ReconciliationEngine::new(&usage);

        let forward = engine.fold(["a@x.com", "b@x.com", "c@x.com", "missing@x.com"]);
        let backward = engine.fold(["missing@x.com", "c@x.com", "b@x.com", "a@x.com"]);

        assert_eq!(forward, backward);
        assert_eq!(forward, (4, Some(day(2024, 3, 1))));
    }

    #[test]
    fn test_linked_emails_without_dates_give_none() {
        let events = vec![create_test_event("a@x.com", "attended", "")];
        let usage = UsageAggregator::from_events(&events);
        let (total, last) = ReconciliationEngine::new(&usage).fold(["a@x.com"]);
        assert_eq!(total, 1);
        assert_eq!(last, None);
    }
}
