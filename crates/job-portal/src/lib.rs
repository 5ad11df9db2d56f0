//! Subscription ledger for the job portal.
//!
//! Candidates and recruiters buy time-boxed access by purchasing packages. Each purchase is
//! recorded as a recharge entry, extends the account's subscription window, and freezes the
//! package terms that applied at the time.

pub mod config;
pub mod error;
pub mod subscriptions;
pub mod telemetry;
