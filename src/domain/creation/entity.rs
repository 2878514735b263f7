//! Generation history records

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::identity::UserId;
use crate::domain::DomainError;

/// Identifier of a stored creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CreationId(i64);

impl CreationId {
    pub fn new(id: i64) -> Result<Self, DomainError> {
        if id <= 0 {
            return Err(DomainError::validation("Creation ID must be positive"));
        }
        Ok(Self(id))
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for CreationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Clients send the id either as a JSON number or as a numeric string
impl<'de> Deserialize<'de> for CreationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Text(String),
        }

        let id = match Raw::deserialize(deserializer)? {
            Raw::Number(n) => n,
            Raw::Text(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| serde::de::Error::custom("creation id must be numeric"))?,
        };

        CreationId::new(id).map_err(serde::de::Error::custom)
    }
}

/// What was generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CreationType {
    Article,
    BlogTitle,
    Image,
    ResumeReview,
}

impl CreationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Article => "article",
            Self::BlogTitle => "blog-title",
            Self::Image => "image",
            Self::ResumeReview => "resume-review",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "article" => Some(Self::Article),
            "blog-title" => Some(Self::BlogTitle),
            "image" => Some(Self::Image),
            "resume-review" => Some(Self::ResumeReview),
            _ => None,
        }
    }
}

impl fmt::Display for CreationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of toggling a like
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeToggle {
    Liked,
    Unliked,
}

impl LikeToggle {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Liked => "Creation Liked",
            Self::Unliked => "Creation unliked",
        }
    }
}

/// Fields of a creation before the store assigns identity and timestamps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCreation {
    pub user_id: UserId,
    pub prompt: String,
    pub content: String,
    pub kind: CreationType,
    pub publish: bool,
}

impl NewCreation {
    pub fn new(
        user_id: UserId,
        kind: CreationType,
        prompt: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            prompt: prompt.into(),
            content: content.into(),
            kind,
            publish: false,
        }
    }

    pub fn published(mut self, publish: bool) -> Self {
        self.publish = publish;
        self
    }
}

/// A stored generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creation {
    pub id: CreationId,
    pub user_id: UserId,
    pub prompt: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: CreationType,
    pub publish: bool,
    pub likes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Creation {
    pub fn from_new(id: CreationId, new: NewCreation, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: new.user_id,
            prompt: new.prompt,
            content: new.content,
            kind: new.kind,
            publish: new.publish,
            likes: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_liked_by(&self, user: &UserId) -> bool {
        self.likes.iter().any(|u| u == user.as_str())
    }

    /// Flip `user`'s membership in `likes`, keeping each user at most once
    pub fn toggle_like(&mut self, user: &UserId) -> LikeToggle {
        let before = self.likes.len();
        self.likes.retain(|u| u != user.as_str());
        self.updated_at = Utc::now();

        if self.likes.len() < before {
            LikeToggle::Unliked
        } else {
            self.likes.push(user.as_str().to_string());
            LikeToggle::Liked
        }
    }
}
