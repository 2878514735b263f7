use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Subscription tier resolved by the identity provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Premium,
}

impl Plan {
    pub fn is_premium(&self) -> bool {
        matches!(self, Self::Premium)
    }
}

impl FromStr for Plan {
    type Err = ();

    /// Accepts bare names and identity-provider scoped names (`u:premium`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.rsplit(':').next().unwrap_or(s).trim();

        match name.to_ascii_lowercase().as_str() {
            "premium" => Ok(Self::Premium),
            "free" | "free_user" => Ok(Self::Free),
            _ => Err(()),
        }
    }
}

/// A metered capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Article,
    BlogTitle,
    Image,
    BackgroundRemoval,
    ObjectRemoval,
    ResumeReview,
}

impl Feature {
    pub const ALL: [Feature; 6] = [
        Feature::Article,
        Feature::BlogTitle,
        Feature::Image,
        Feature::BackgroundRemoval,
        Feature::ObjectRemoval,
        Feature::ResumeReview,
    ];

    /// Durable counter this feature consumes.
    ///
    /// Article, blog title and image generation draw from the same `free_usage` counter.
    pub fn counter_key(&self) -> CounterKey {
        match self {
            Self::Article | Self::BlogTitle | Self::Image => CounterKey::FreeUsage,
            Self::BackgroundRemoval => CounterKey::BgRemovalUsage,
            Self::ObjectRemoval => CounterKey::ObjRemovalUsage,
            Self::ResumeReview => CounterKey::ResumeReviewUsage,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Article => "article",
            Self::BlogTitle => "blog_title",
            Self::Image => "image",
            Self::BackgroundRemoval => "background_removal",
            Self::ObjectRemoval => "object_removal",
            Self::ResumeReview => "resume_review",
        }
    }

    /// Noun used in user-facing limit messages
    fn noun_plural(&self) -> &'static str {
        match self {
            Self::Article => "articles",
            Self::BlogTitle => "blog titles",
            Self::Image => "images",
            Self::BackgroundRemoval => "background removals",
            Self::ObjectRemoval => "object removals",
            Self::ResumeReview => "resume reviews",
        }
    }

    pub(crate) fn limit_message(&self, limit: u32) -> String {
        match self {
            Self::Article | Self::BlogTitle => {
                "Limit reached. Upgrade to continue.".to_string()
            }
            Self::Image => format!(
                "You've reached your free limit of {} {}. Upgrade to premium for unlimited image generation.",
                limit,
                self.noun_plural()
            ),
            _ => format!(
                "You've reached your free limit of {} {}. Upgrade to premium for unlimited usage.",
                limit,
                self.noun_plural()
            ),
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of a durable per-user counter held by the quota store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterKey {
    FreeUsage,
    BgRemovalUsage,
    ObjRemovalUsage,
    ResumeReviewUsage,
}

impl CounterKey {
    pub const ALL: [CounterKey; 4] = [
        CounterKey::FreeUsage,
        CounterKey::BgRemovalUsage,
        CounterKey::ObjRemovalUsage,
        CounterKey::ResumeReviewUsage,
    ];

    /// Storage name, shared by every quota store backend
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FreeUsage => "free_usage",
            Self::BgRemovalUsage => "bg_removal_usage",
            Self::ObjRemovalUsage => "obj_removal_usage",
            Self::ResumeReviewUsage => "resume_review_usage",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

impl fmt::Display for CounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-plan limits per feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaLimits {
    #[serde(default = "default_text_limit")]
    pub article: u32,
    #[serde(default = "default_text_limit")]
    pub blog_title: u32,
    #[serde(default = "default_media_limit")]
    pub image: u32,
    #[serde(default = "default_media_limit")]
    pub background_removal: u32,
    #[serde(default = "default_media_limit")]
    pub object_removal: u32,
    #[serde(default = "default_text_limit")]
    pub resume_review: u32,
}

fn default_text_limit() -> u32 {
    10
}

fn default_media_limit() -> u32 {
    5
}

impl Default for QuotaLimits {
    fn default() -> Self {
        Self {
            article: default_text_limit(),
            blog_title: default_text_limit(),
            image: default_media_limit(),
            background_removal: default_media_limit(),
            object_removal: default_media_limit(),
            resume_review: default_text_limit(),
        }
    }
}

impl QuotaLimits {
    pub fn limit_for(&self, feature: Feature) -> u32 {
        match feature {
            Feature::Article => self.article,
            Feature::BlogTitle => self.blog_title,
            Feature::Image => self.image,
            Feature::BackgroundRemoval => self.background_removal,
            Feature::ObjectRemoval => self.object_removal,
            Feature::ResumeReview => self.resume_review,
        }
    }
}
