pub mod engine;
pub mod error;
mod projection;
