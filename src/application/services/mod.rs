mod document;

pub use document::{DocumentService, SearchConfig, STORE_FAILED_MESSAGE};
