pub mod entities;
pub mod errors;
pub mod metadata;
pub mod ports;

pub use entities::*;
pub use errors::{DomainError, Result};
