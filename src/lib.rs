pub mod config;
pub mod engine;
pub mod error;
pub mod output;
pub mod service;
pub mod source;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
