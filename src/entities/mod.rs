// Entity Models - the three input tables as typed, immutable values
//
// Each entity is normalized exactly once, at construction:
// - MemberRecord: membership system (source of truth)
// - ExternalAccount: usage-tracking system (secondary, often anonymized)
// - BookingEvent: event log, only ever consumed in aggregate

pub mod member;
pub mod account;
pub mod booking;

pub use member::MemberRecord;
pub use account::{ExternalAccount, GhostPolicy};
pub use booking::{BookingEvent, BookingStatus};
