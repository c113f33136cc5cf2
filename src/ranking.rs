// 🏁 Ranker - Order consolidated profiles by usage

use crate::reconciliation::ConsolidatedProfile;
use std::cmp::Reverse;

/// Stable sort by total visits, descending
///
/// `sort_by_key` is stable, so members with equal visits keep the order the
/// reconciler produced them in.
pub fn rank_profiles(mut profiles: Vec<ConsolidatedProfile>) -> Vec<ConsolidatedProfile> {
    profiles.sort_by_key(|p| Reverse(p.total_visits));
    profiles
}
