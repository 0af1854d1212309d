pub mod blob_error;
pub mod llm_error;
pub mod narra_error;
pub mod store_error;

pub use blob_error::BlobError;
pub use llm_error::LlmError;
pub use narra_error::{NarraError, NarraResult};
pub use store_error::{StoreError, StoreResult};
