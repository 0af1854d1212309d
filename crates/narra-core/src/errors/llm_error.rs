//! LLM gateway errors.

/// Errors raised by the LLM gateway and its provider backends.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM call failed for model {model}: {last_error}")]
    Exhausted { model: String, last_error: String },

    #[error("provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("no API key configured for provider {provider}")]
    MissingApiKey { provider: String },

    #[error("response carried no usable content for model {model}")]
    EmptyResponse { model: String },

    #[error("no image data found in response parts")]
    NoImageData,

    #[error("PDF text extraction failed: {0}")]
    PdfExtraction(String),

    #[error("malformed provider response: {0}")]
    Decode(String),
}
