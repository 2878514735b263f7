//! Usage metering domain
//!
//! Plans, metered features, their durable counters and the admission policy.

mod feature;
mod gate;
mod repository;

pub use feature::{CounterKey, Feature, Plan, QuotaLimits};
pub use gate::{QuotaDecision, QuotaDenial, QuotaGate, UsageLeft};
pub use repository::{complete_snapshot, CompareAndSwap, QuotaStore, UsageCounter, UsageSnapshot};

#[cfg(test)]
pub use repository::MockQuotaStore;
