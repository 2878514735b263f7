//! Application services orchestrating the domain

mod creation_service;
mod feature_service;
mod quota_service;
mod usage_service;

pub use creation_service::CreationService;
pub use feature_service::{
    FeatureConfig, FeatureOutcome, FeatureProviders, FeatureResult, FeatureService,
};
pub use quota_service::{Admission, Enforcement, QuotaService, Reservation};
pub use usage_service::{UsageReport, UsageService};
