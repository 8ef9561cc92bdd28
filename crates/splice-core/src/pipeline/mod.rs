//! Channel plumbing between ingestion and the canonicalization engine.
//!
//! Announcements from the two chains arrive on independently paced
//! channels. [`merge`] fans them into one stream; [`debounce`] collapses a
//! burst of merged events into a single deferred handler call so the
//! engine runs one batch pass per burst instead of one per announcement.

mod debounce;
mod merge;

pub use debounce::debounce;
pub use merge::merge;
