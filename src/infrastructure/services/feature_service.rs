//! Feature service - metered AI features
//!
//! Every feature runs the same sequence: validate input, admit against the quota,
//! call the provider(s), persist the creation, commit the usage. Failures after
//! admission release the reserved slot; provider side effects are not undone.
//! A failed usage commit fails the invocation even though the creation was stored.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};

use super::quota_service::{Admission, QuotaService};
use crate::domain::{
    with_retry, AuthenticatedUser, CreationId, CreationRepository, CreationType,
    DocumentExtractor, DomainError, Feature, ImageEffect, ImageGenerator, LlmProvider, LlmRequest,
    MediaStore, NewCreation, ProviderError, QuotaDenial, RetryPolicy, UploadedFile, UsageLeft,
};
use crate::infrastructure::observability::{record_provider_call, record_transient_failure};

/// A single word: letters in any script, digits, `_`, `-` or `'`
static OBJECT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}\p{N}_'-]+$").expect("object pattern is valid"));

const MB: usize = 1024 * 1024;

/// Models and limits for the metered features
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureConfig {
    #[serde(default = "default_article_model")]
    pub article_model: String,
    #[serde(default = "default_flash_model")]
    pub blog_title_model: String,
    #[serde(default = "default_flash_model")]
    pub resume_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_blog_title_max_tokens")]
    pub blog_title_max_tokens: u32,
    #[serde(default = "default_resume_max_tokens")]
    pub resume_max_tokens: u32,
    #[serde(default = "default_max_article_length")]
    pub max_article_length: u32,
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
    #[serde(default = "default_max_resume_bytes")]
    pub max_resume_bytes: usize,
}

fn default_article_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_flash_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_blog_title_max_tokens() -> u32 {
    100
}

fn default_resume_max_tokens() -> u32 {
    1000
}

fn default_max_article_length() -> u32 {
    4096
}

fn default_max_image_bytes() -> usize {
    10 * MB
}

fn default_max_resume_bytes() -> usize {
    5 * MB
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            article_model: default_article_model(),
            blog_title_model: default_flash_model(),
            resume_model: default_flash_model(),
            temperature: default_temperature(),
            blog_title_max_tokens: default_blog_title_max_tokens(),
            resume_max_tokens: default_resume_max_tokens(),
            max_article_length: default_max_article_length(),
            max_image_bytes: default_max_image_bytes(),
            max_resume_bytes: default_max_resume_bytes(),
        }
    }
}

/// A completed feature invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureResult {
    pub creation_id: CreationId,
    pub content: String,
    pub usage_left: UsageLeft,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureOutcome {
    Completed(FeatureResult),
    Denied(QuotaDenial),
}

/// Provider clients the features depend on
#[derive(Debug, Clone)]
pub struct FeatureProviders {
    pub llm: Arc<dyn LlmProvider>,
    pub images: Arc<dyn ImageGenerator>,
    pub media: Arc<dyn MediaStore>,
    pub documents: Arc<dyn DocumentExtractor>,
}

#[derive(Debug)]
pub struct FeatureService {
    quota: Arc<QuotaService>,
    providers: FeatureProviders,
    creations: Arc<dyn CreationRepository>,
    retry: RetryPolicy,
    config: FeatureConfig,
}

impl FeatureService {
    pub fn new(
        quota: Arc<QuotaService>,
        providers: FeatureProviders,
        creations: Arc<dyn CreationRepository>,
    ) -> Self {
        Self {
            quota,
            providers,
            creations,
            retry: RetryPolicy::default(),
            config: FeatureConfig::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_config(mut self, config: FeatureConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn generate_article(
        &self,
        user: &AuthenticatedUser,
        prompt: &str,
        length: u32,
    ) -> Result<FeatureOutcome, DomainError> {
        let prompt = require_text(prompt, "Prompt")?;
        if length == 0 || length > self.config.max_article_length {
            return Err(DomainError::validation(format!(
                "Length must be between 1 and {}",
                self.config.max_article_length
            )));
        }

        self.execute(user, Feature::Article, || async move {
            let request = LlmRequest::builder()
                .user(prompt)
                .temperature(self.config.temperature)
                .max_tokens(length)
                .build();
            let content = self
                .complete("generate_article", &self.config.article_model, request)
                .await?;

            Ok(NewCreation::new(user.user_id.clone(), CreationType::Article, prompt, content))
        })
        .await
    }

    pub async fn generate_blog_title(
        &self,
        user: &AuthenticatedUser,
        prompt: &str,
    ) -> Result<FeatureOutcome, DomainError> {
        let prompt = require_text(prompt, "Prompt")?;

        self.execute(user, Feature::BlogTitle, || async move {
            let request = LlmRequest::builder()
                .user(prompt)
                .temperature(self.config.temperature)
                .max_tokens(self.config.blog_title_max_tokens)
                .build();
            let content = self
                .complete("generate_blog_title", &self.config.blog_title_model, request)
                .await?;

            Ok(NewCreation::new(user.user_id.clone(), CreationType::BlogTitle, prompt, content))
        })
        .await
    }

    pub async fn generate_image(
        &self,
        user: &AuthenticatedUser,
        prompt: &str,
        publish: bool,
    ) -> Result<FeatureOutcome, DomainError> {
        let prompt = require_text(prompt, "Prompt")?;

        self.execute(user, Feature::Image, || async move {
            let images = &self.providers.images;
            let png = observe(images.provider_name(), images.generate(prompt)).await?;

            let media = &self.providers.media;
            let stored = observe(
                media.provider_name(),
                media.upload(UploadedFile::new("generated.png", "image/png", png)),
            )
            .await?;

            Ok(
                NewCreation::new(user.user_id.clone(), CreationType::Image, prompt, stored.secure_url)
                    .published(publish),
            )
        })
        .await
    }

    pub async fn remove_background(
        &self,
        user: &AuthenticatedUser,
        image: UploadedFile,
    ) -> Result<FeatureOutcome, DomainError> {
        self.require_image(&image)?;

        self.execute(user, Feature::BackgroundRemoval, || async move {
            let url = self.apply_effect(image, ImageEffect::BackgroundRemoval).await?;
            Ok(NewCreation::new(
                user.user_id.clone(),
                CreationType::Image,
                "Remove background from the image",
                url,
            ))
        })
        .await
    }

    pub async fn remove_object(
        &self,
        user: &AuthenticatedUser,
        image: UploadedFile,
        object: &str,
    ) -> Result<FeatureOutcome, DomainError> {
        let object = object.trim();
        if !OBJECT_NAME.is_match(object) {
            return Err(DomainError::validation(
                "Please enter a single object name without spaces",
            ));
        }
        self.require_image(&image)?;

        self.execute(user, Feature::ObjectRemoval, || async move {
            let effect = ImageEffect::ObjectRemoval {
                object: object.to_string(),
            };
            let url = self.apply_effect(image, effect).await?;
            Ok(NewCreation::new(
                user.user_id.clone(),
                CreationType::Image,
                format!("Remove {} from the image", object),
                url,
            ))
        })
        .await
    }

    pub async fn review_resume(
        &self,
        user: &AuthenticatedUser,
        resume: UploadedFile,
    ) -> Result<FeatureOutcome, DomainError> {
        if !resume.is_pdf() {
            return Err(DomainError::validation("Resume must be a PDF file"));
        }
        if resume.size() == 0 {
            return Err(DomainError::validation("Resume file is empty"));
        }
        if resume.size() > self.config.max_resume_bytes {
            return Err(DomainError::validation(format!(
                "Resume file size exceeds allowed size ({}MB).",
                self.config.max_resume_bytes / MB
            )));
        }

        let text = self.providers.documents.extract_text(resume.data).await?;

        self.execute(user, Feature::ResumeReview, || async move {
            let request = LlmRequest::builder()
                .user(format!(
                    "Review the following resume and provide constructive feedback on its strengths, weaknesses, and areas for improvement. Resume content:\n\n{}",
                    text
                ))
                .temperature(self.config.temperature)
                .max_tokens(self.config.resume_max_tokens)
                .build();
            let content = self
                .complete("review_resume", &self.config.resume_model, request)
                .await?;

            Ok(NewCreation::new(
                user.user_id.clone(),
                CreationType::ResumeReview,
                "Review the uploaded Resume",
                content,
            ))
        })
        .await
    }

    /// Admit, run `work`, persist its creation and commit the usage
    async fn execute<F, Fut>(
        &self,
        user: &AuthenticatedUser,
        feature: Feature,
        work: F,
    ) -> Result<FeatureOutcome, DomainError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<NewCreation, DomainError>>,
    {
        let reservation = match self.quota.admit(user, feature).await? {
            Admission::Granted(reservation) => reservation,
            Admission::Denied(denial) => return Ok(FeatureOutcome::Denied(denial)),
        };

        let persisted = match work().await {
            Ok(new_creation) => self.creations.insert(new_creation).await,
            Err(e) => Err(e),
        };

        let creation = match persisted {
            Ok(creation) => creation,
            Err(e) => {
                warn!(user_id = %user.user_id, feature = %feature, error = %e, "Feature failed");
                if let Err(release_err) = self.quota.release(reservation).await {
                    warn!(feature = %feature, error = %release_err, "Failed to release quota slot");
                }
                return Err(e);
            }
        };

        let usage_left = self.quota.commit(reservation).await.map_err(|e| {
            warn!(
                user_id = %user.user_id,
                feature = %feature,
                creation_id = %creation.id,
                error = %e,
                "Failed to record usage"
            );
            e
        })?;

        info!(
            user_id = %user.user_id,
            feature = %feature,
            creation_id = %creation.id,
            "Feature completed"
        );

        Ok(FeatureOutcome::Completed(FeatureResult {
            creation_id: creation.id,
            content: creation.content,
            usage_left,
        }))
    }

    async fn complete(
        &self,
        operation: &str,
        model: &str,
        request: LlmRequest,
    ) -> Result<String, DomainError> {
        let llm = &self.providers.llm;

        let response = with_retry(&self.retry, operation, || {
            let request = request.clone();
            async move {
                let result = observe(llm.provider_name(), llm.chat(model, request)).await;
                if let Err(e) = &result {
                    if e.is_transient() {
                        record_transient_failure(operation, e.kind);
                    }
                }
                result
            }
        })
        .await?;

        Ok(response.content)
    }

    async fn apply_effect(&self, image: UploadedFile, effect: ImageEffect) -> Result<String, DomainError> {
        let media = &self.providers.media;
        let stored = observe(media.provider_name(), media.upload(image)).await?;
        Ok(media.transformed_url(&stored.public_id, &effect))
    }

    fn require_image(&self, image: &UploadedFile) -> Result<(), DomainError> {
        if !image.is_image() {
            return Err(DomainError::validation("Uploaded file must be an image"));
        }
        if image.size() == 0 {
            return Err(DomainError::validation("Uploaded image is empty"));
        }
        if image.size() > self.config.max_image_bytes {
            return Err(DomainError::validation(format!(
                "Image exceeds allowed size ({}MB).",
                self.config.max_image_bytes / MB
            )));
        }
        Ok(())
    }
}

fn require_text<'a>(value: &'a str, field: &str) -> Result<&'a str, DomainError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::validation(format!("{} is required", field)));
    }
    Ok(value)
}

/// Time a provider call and record its outcome
async fn observe<T, Fut>(provider: &str, call: Fut) -> Result<T, ProviderError>
where
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let started = Instant::now();
    let result = call.await;
    record_provider_call(
        provider,
        started.elapsed(),
        result.as_ref().err().map(|e| e.kind),
    );
    result
}
