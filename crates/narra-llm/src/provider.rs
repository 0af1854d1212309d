//! The provider seam: request/response types and the backend trait the
//! gateway drives. `HttpBackend` dispatches to the real providers by
//! model family; tests plug in a scripted backend instead.

use std::time::Duration;

use narra_core::catalog::ModelFamily;
use narra_core::errors::LlmError;
use narra_core::models::tokens::CallUsage;

use crate::{google, openai};

/// A single text-generation request.
#[derive(Debug, Clone)]
pub struct TextRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub model: String,
    pub temperature: f64,
    /// When "application/json", JSON output mode is requested.
    pub response_mime_type: Option<String>,
    pub max_output_tokens: Option<u32>,
    /// Per-call attempt override; the gateway's configured retry count
    /// applies when absent.
    pub retries: Option<u32>,
    pub timeout: Duration,
}

impl TextRequest {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            model: model.into(),
            temperature: 0.0,
            response_mime_type: None,
            max_output_tokens: None,
            retries: None,
            timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextResponse {
    pub text: String,
    pub usage: CallUsage,
}

/// An inline binary part for multimodal requests (PDF bytes for the
/// critique path).
#[derive(Debug, Clone)]
pub struct MultimodalPart {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// An image-generation request.
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub prompt: String,
    pub model: String,
    pub aspect_ratio: String,
    pub image_size: Option<String>,
    pub timeout: Duration,
}

/// What the gateway needs from a provider. One implementation speaks the
/// real HTTP APIs; tests use a scripted mock.
pub trait ModelBackend: Send + Sync {
    fn generate_text(&self, req: &TextRequest) -> Result<TextResponse, LlmError>;

    fn generate_multimodal(
        &self,
        req: &TextRequest,
        parts: &[MultimodalPart],
    ) -> Result<TextResponse, LlmError>;

    fn generate_image(&self, req: &ImageRequest) -> Result<Vec<u8>, LlmError>;
}

/// Production backend: routes to Google or OpenAI by model family.
pub struct HttpBackend {
    google_api_key: Option<String>,
    openai_api_key: Option<String>,
}

impl HttpBackend {
    pub fn new(google_api_key: Option<String>, openai_api_key: Option<String>) -> Self {
        Self {
            google_api_key,
            openai_api_key,
        }
    }

    /// Keys from the conventional environment variables.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var("GOOGLE_API_KEY").ok(),
            std::env::var("OPENAI_API_KEY").ok(),
        )
    }

    fn google_key(&self) -> Result<&str, LlmError> {
        self.google_api_key
            .as_deref()
            .ok_or_else(|| LlmError::MissingApiKey {
                provider: "google".to_string(),
            })
    }

    fn openai_key(&self) -> Result<&str, LlmError> {
        self.openai_api_key
            .as_deref()
            .ok_or_else(|| LlmError::MissingApiKey {
                provider: "openai".to_string(),
            })
    }
}

impl ModelBackend for HttpBackend {
    fn generate_text(&self, req: &TextRequest) -> Result<TextResponse, LlmError> {
        match ModelFamily::of(&req.model) {
            ModelFamily::Google => google::generate_text(self.google_key()?, req, &[]),
            ModelFamily::OpenAi => openai::generate_text(self.openai_key()?, req),
        }
    }

    fn generate_multimodal(
        &self,
        req: &TextRequest,
        parts: &[MultimodalPart],
    ) -> Result<TextResponse, LlmError> {
        match ModelFamily::of(&req.model) {
            ModelFamily::Google => google::generate_text(self.google_key()?, req, parts),
            // OpenAI has no native PDF input; the gateway's capability map
            // routes those calls through text extraction instead.
            ModelFamily::OpenAi => Err(LlmError::Decode(format!(
                "model {} does not accept inline binary parts",
                req.model
            ))),
        }
    }

    fn generate_image(&self, req: &ImageRequest) -> Result<Vec<u8>, LlmError> {
        match ModelFamily::of(&req.model) {
            ModelFamily::Google => google::generate_image(self.google_key()?, req),
            ModelFamily::OpenAi => Err(LlmError::Decode(format!(
                "image generation is not wired for model {}",
                req.model
            ))),
        }
    }
}
