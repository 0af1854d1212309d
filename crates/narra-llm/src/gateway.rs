//! The gateway: normalization, temperature policy, retry with a
//! family-local fallback model, and token accounting.

use std::sync::Arc;

use narra_core::catalog::{self, ModelFamily};
use narra_core::config::LlmConfig;
use narra_core::errors::LlmError;

use crate::provider::{
    HttpBackend, ImageRequest, ModelBackend, MultimodalPart, TextRequest, TextResponse,
};

pub struct LlmGateway {
    backend: Arc<dyn ModelBackend>,
    config: LlmConfig,
}

impl LlmGateway {
    pub fn new(backend: Arc<dyn ModelBackend>, config: LlmConfig) -> Self {
        Self { backend, config }
    }

    /// Production gateway with keys from the environment.
    pub fn from_env(config: LlmConfig) -> Self {
        Self::new(Arc::new(HttpBackend::from_env()), config)
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Whether the model's provider accepts PDF bytes directly.
    pub fn accepts_pdf(&self, model: &str) -> bool {
        ModelFamily::of(model).accepts_pdf()
    }

    /// Text generation with retries. The first attempt runs the
    /// normalized requested model; subsequent attempts switch to the
    /// family-local fallback when one is configured. Temperature and the
    /// rest of the request are unchanged across attempts.
    pub fn generate_text(&self, req: &TextRequest) -> Result<TextResponse, LlmError> {
        self.with_retries(req, |attempt_req| self.backend.generate_text(attempt_req))
    }

    /// Multimodal generation (Google path). Same retry policy as text.
    pub fn generate_multimodal(
        &self,
        req: &TextRequest,
        parts: &[MultimodalPart],
    ) -> Result<TextResponse, LlmError> {
        self.with_retries(req, |attempt_req| {
            self.backend.generate_multimodal(attempt_req, parts)
        })
    }

    /// Image generation. Retries stay on the requested model; the cover
    /// pipeline owns the primary/fallback model choice.
    pub fn generate_image(&self, req: &ImageRequest) -> Result<Vec<u8>, LlmError> {
        let attempts = self.config.max_retries.max(1);
        let mut last_error = String::new();
        for attempt in 0..attempts {
            match self.backend.generate_image(req) {
                Ok(bytes) => return Ok(bytes),
                Err(err) => {
                    tracing::warn!(
                        model = %req.model,
                        attempt = attempt + 1,
                        error = %err,
                        "image generation attempt failed"
                    );
                    last_error = err.to_string();
                }
            }
        }
        Err(LlmError::Exhausted {
            model: req.model.clone(),
            last_error,
        })
    }

    /// See `extract_text_from_pdf`, re-exported here so callers only
    /// touch the gateway.
    pub fn extract_text_from_pdf(
        &self,
        pdf_bytes: &[u8],
        max_chars: Option<usize>,
    ) -> Result<String, LlmError> {
        crate::pdf_text::extract_text_from_pdf(pdf_bytes, max_chars)
    }

    /// Temperature for an agent/model pair (explicit override, else the
    /// model-version rule).
    pub fn temperature_for(&self, agent_name: &str, model_name: &str) -> f64 {
        self.config.temperature_for(agent_name, model_name)
    }

    fn with_retries(
        &self,
        req: &TextRequest,
        call: impl Fn(&TextRequest) -> Result<TextResponse, LlmError>,
    ) -> Result<TextResponse, LlmError> {
        let primary = catalog::normalize_model(&req.model);
        let fallback = self
            .config
            .fallback_for(&primary)
            .map(str::to_string)
            .filter(|f| ModelFamily::of(f) == ModelFamily::of(&primary));

        let attempts = req.retries.unwrap_or(self.config.max_retries).max(1);
        let mut last_error = String::new();
        let mut last_model = primary.clone();

        for attempt in 0..attempts {
            let model = if attempt == 0 {
                primary.clone()
            } else {
                fallback.clone().unwrap_or_else(|| primary.clone())
            };
            let attempt_req = TextRequest {
                model: model.clone(),
                ..req.clone()
            };
            match call(&attempt_req) {
                Ok(response) => return Ok(response),
                Err(err) => {
                    tracing::warn!(
                        model = %model,
                        attempt = attempt + 1,
                        error = %err,
                        "LLM attempt failed"
                    );
                    last_error = err.to_string();
                    last_model = model;
                }
            }
        }

        Err(LlmError::Exhausted {
            model: last_model,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBackend;

    fn gateway(mock: MockBackend) -> LlmGateway {
        LlmGateway::new(Arc::new(mock), LlmConfig::default())
    }

    #[test]
    fn first_success_wins() {
        let mock = MockBackend::new();
        mock.push_text("ciao");
        let gw = gateway(mock);
        let out = gw
            .generate_text(&TextRequest::new("sys", "user", "gemini-3-pro"))
            .unwrap();
        assert_eq!(out.text, "ciao");
        // The gateway normalizes the alias before calling the backend.
        assert_eq!(out.usage.model, "gemini-3-pro-preview");
    }

    #[test]
    fn retry_switches_to_the_family_fallback() {
        let mock = MockBackend::new();
        mock.push_failure("overloaded");
        mock.push_text("recovered");
        let calls = mock.calls.clone();
        let gw = gateway(mock);

        let out = gw
            .generate_text(&TextRequest::new("sys", "user", "gemini-3-pro-preview"))
            .unwrap();
        assert_eq!(out.text, "recovered");

        let recorded = calls.lock().unwrap();
        assert_eq!(recorded[0].model, "gemini-3-pro-preview");
        assert_eq!(recorded[1].model, "gemini-3-flash-preview");
    }

    #[test]
    fn exhaustion_carries_the_last_model_and_error() {
        let mock = MockBackend::new();
        mock.push_failure("boom 1");
        mock.push_failure("boom 2");
        mock.push_failure("boom 3");
        let gw = gateway(mock);

        let err = gw
            .generate_text(&TextRequest::new("sys", "user", "gemini-3-pro"))
            .unwrap_err();
        match err {
            LlmError::Exhausted { model, last_error } => {
                assert_eq!(model, "gemini-3-flash-preview");
                assert!(last_error.contains("boom 3"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn pdf_capability_map() {
        let gw = gateway(MockBackend::new());
        assert!(gw.accepts_pdf("gemini-3-pro-preview"));
        assert!(!gw.accepts_pdf("gpt-5.2-pro"));
    }
}
