pub mod config;
pub mod engine;
pub mod evaluator;
pub mod executor;
pub mod harness;


pub use config::LanguageConfigManager;
pub use engine::{EngineError, ProcessEngine};
pub use executor::Validator;
