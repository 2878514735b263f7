//! Quota admission policy

use serde::{Serialize, Serializer};

use super::{Feature, Plan, QuotaLimits};

/// Why a request was not admitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaDenial {
    pub feature: Feature,
    pub limit: u32,
    pub used: u32,
    pub message: String,
}

/// Result of applying the policy to a counter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaDecision {
    Allowed,
    Denied(QuotaDenial),
}

impl QuotaDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Remaining free invocations reported back to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageLeft {
    Remaining(u32),
    Unlimited,
}

impl UsageLeft {
    pub fn after(limit: u32, used: u32) -> Self {
        Self::Remaining(limit.saturating_sub(used))
    }
}

impl Serialize for UsageLeft {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Remaining(n) => serializer.serialize_u32(*n),
            Self::Unlimited => serializer.serialize_str("unlimited"),
        }
    }
}

/// Stateless policy: premium is always admitted, free is admitted below the limit
#[derive(Debug, Clone, Default)]
pub struct QuotaGate {
    limits: QuotaLimits,
}

impl QuotaGate {
    pub fn new(limits: QuotaLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &QuotaLimits {
        &self.limits
    }

    pub fn limit_for(&self, feature: Feature) -> u32 {
        self.limits.limit_for(feature)
    }

    pub fn check(&self, plan: Plan, feature: Feature, count: u32) -> QuotaDecision {
        if plan.is_premium() {
            return QuotaDecision::Allowed;
        }

        let limit = self.limit_for(feature);

        if count < limit {
            QuotaDecision::Allowed
        } else {
            QuotaDecision::Denied(QuotaDenial {
                feature,
                limit,
                used: count,
                message: feature.limit_message(limit),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_user_allowed_below_limit() {
        let gate = QuotaGate::default();
        assert!(gate.check(Plan::Free, Feature::Image, 0).is_allowed());
        assert!(gate.check(Plan::Free, Feature::Image, 4).is_allowed());
    }

    #[test]
    fn test_free_user_denied_at_limit() {
        let gate = QuotaGate::default();

        match gate.check(Plan::Free, Feature::BackgroundRemoval, 5) {
            QuotaDecision::Denied(denial) => {
                assert_eq!(denial.limit, 5);
                assert_eq!(denial.used, 5);
                assert!(denial.message.contains("Upgrade"));
            }
            QuotaDecision::Allowed => panic!("expected denial"),
        }

        assert!(!gate.check(Plan::Free, Feature::Article, 11).is_allowed());
    }

    #[test]
    fn test_premium_never_denied() {
        let gate = QuotaGate::default();

        for feature in Feature::ALL {
            assert!(gate.check(Plan::Premium, feature, u32::MAX).is_allowed());
        }
    }

    #[test]
    fn test_zero_limit_denies_everything_free() {
        let limits = QuotaLimits {
            resume_review: 0,
            ..QuotaLimits::default()
        };
        let gate = QuotaGate::new(limits);
        assert!(!gate.check(Plan::Free, Feature::ResumeReview, 0).is_allowed());
    }

    #[test]
    fn test_usage_left_serialization() {
        assert_eq!(serde_json::to_value(UsageLeft::Remaining(3)).unwrap(), 3);
        assert_eq!(
            serde_json::to_value(UsageLeft::Unlimited).unwrap(),
            "unlimited"
        );
        assert_eq!(UsageLeft::after(5, 7), UsageLeft::Remaining(0));
    }
}
