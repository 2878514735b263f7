//! Shared handler state

use std::sync::Arc;

use crate::domain::IdentityProvider;
use crate::infrastructure::services::{CreationService, FeatureService, UsageService};

#[derive(Debug, Clone)]
pub struct AppState {
    pub features: Arc<FeatureService>,
    pub creations: Arc<CreationService>,
    pub usage: Arc<UsageService>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub fn new(
        features: Arc<FeatureService>,
        creations: Arc<CreationService>,
        usage: Arc<UsageService>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            features,
            creations,
            usage,
            identity,
        }
    }
}
