use crate::config::ConfigError;
use pdfmask_engine::EngineError;

#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("document error: {0}")]
    Engine(#[from] EngineError),

    #[error("no document is loaded")]
    NoDocument,

    #[error("page {page_number} is out of range (document has {page_count} pages)")]
    PageOutOfRange { page_number: u32, page_count: u32 },

    #[error("no mask with id {0}")]
    UnknownMask(u64),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, ViewerError>;
