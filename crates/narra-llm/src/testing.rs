//! Scripted backend for tests: queued replies, failure injection, and a
//! full record of every request the gateway issued.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use narra_core::errors::LlmError;
use narra_core::models::tokens::CallUsage;

use crate::provider::{ImageRequest, ModelBackend, MultimodalPart, TextRequest, TextResponse};

/// One recorded request, kept for assertions (e.g. the autoregressive
/// contract checks the chapter prompts verbatim).
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system_prompt: String,
    pub user_prompt: String,
    pub model: String,
    pub temperature: f64,
    pub part_mime_types: Vec<String>,
}

enum Reply {
    Text(String),
    Failure(String),
}

/// A deterministic [`ModelBackend`]: text/multimodal calls pop from one
/// queue, image calls from another. An empty queue yields a default
/// reply so long scripted flows stay short.
pub struct MockBackend {
    replies: Mutex<VecDeque<Reply>>,
    image_replies: Mutex<VecDeque<Result<Vec<u8>, String>>>,
    pub calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            image_replies: Mutex::new(VecDeque::new()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn push_text(&self, text: impl Into<String>) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Reply::Text(text.into()));
    }

    pub fn push_failure(&self, message: impl Into<String>) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Reply::Failure(message.into()));
    }

    pub fn push_image(&self, bytes: Vec<u8>) {
        self.image_replies.lock().unwrap().push_back(Ok(bytes));
    }

    pub fn push_image_failure(&self, message: impl Into<String>) {
        self.image_replies
            .lock()
            .unwrap()
            .push_back(Err(message.into()));
    }

    fn record(&self, req: &TextRequest, parts: &[MultimodalPart]) {
        self.calls.lock().unwrap().push(RecordedCall {
            system_prompt: req.system_prompt.clone(),
            user_prompt: req.user_prompt.clone(),
            model: req.model.clone(),
            temperature: req.temperature,
            part_mime_types: parts.iter().map(|p| p.mime_type.clone()).collect(),
        });
    }

    fn pop_text(&self, req: &TextRequest) -> Result<TextResponse, LlmError> {
        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Text(text)) => Ok(response(text, req)),
            Some(Reply::Failure(message)) => Err(LlmError::Transport(message)),
            None => Ok(response("testo generato".to_string(), req)),
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelBackend for MockBackend {
    fn generate_text(&self, req: &TextRequest) -> Result<TextResponse, LlmError> {
        self.record(req, &[]);
        self.pop_text(req)
    }

    fn generate_multimodal(
        &self,
        req: &TextRequest,
        parts: &[MultimodalPart],
    ) -> Result<TextResponse, LlmError> {
        self.record(req, parts);
        self.pop_text(req)
    }

    fn generate_image(&self, _req: &ImageRequest) -> Result<Vec<u8>, LlmError> {
        match self.image_replies.lock().unwrap().pop_front() {
            Some(Ok(bytes)) => Ok(bytes),
            Some(Err(message)) => Err(LlmError::Transport(message)),
            None => Ok(vec![0x89, b'P', b'N', b'G']),
        }
    }
}

/// Builds a minimal one-page PDF containing `text`, for tests that
/// exercise the rendering/critique boundary without a real renderer.
pub fn sample_pdf(text: &str) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 24.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().expect("content stream encodes"),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("pdf serializes");
    bytes
}

fn response(text: String, req: &TextRequest) -> TextResponse {
    // Rough token accounting so cost paths see non-zero numbers.
    let usage = CallUsage {
        input_tokens: ((req.system_prompt.len() + req.user_prompt.len()) / 4) as u64,
        output_tokens: (text.len() / 4).max(1) as u64,
        model: req.model.clone(),
    };
    TextResponse { text, usage }
}
