pub mod config;
pub mod exercise;
pub mod progress;
pub mod redis;
pub mod types;
