pub mod error;
pub mod service;

pub use error::EngineError;
pub use service::{Clock, DoneOutcome, TaskService, DEFAULT_LIST_LIMIT};
