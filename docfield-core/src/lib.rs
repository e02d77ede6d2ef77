pub mod analysis;
pub mod config;
pub mod consts;
pub mod error;
pub mod inference;
pub mod layout;
pub mod parse;
pub mod template;
pub mod text;

// Re-export commonly used types
pub use config::EngineConfig;
pub use error::DocfieldError;
pub use inference::OcrEngine;
pub use layout::{ExtractionRecord, ExtractionResult, RotationTokens, Status, Token};
pub use parse::Engine;
pub use template::{Template, TemplateSet};
