//! The extraction pipeline: classify, locate, match, retry, post-process.

pub mod classify;
pub mod engine;
pub mod locate;
pub mod matcher;
pub mod postprocess;
pub mod retry;

pub use engine::Engine;
