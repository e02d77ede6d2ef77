use snafu::prelude::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DocfieldError {
    #[snafu(display("Read `{}` error: {}", path, source))]
    IoRead {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Decode json `{}` error: {}", path, source))]
    Json {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Image `{}` error: {}", path, source))]
    ImageOpen {
        source: image::ImageError,
        path: String,
    },
    #[snafu(display("Invalid pattern `{}`: {}", pattern, source))]
    Pattern {
        source: regex::Error,
        pattern: String,
    },
    #[snafu(display("Template `{}` is invalid: {}", template, message))]
    InvalidTemplate { template: String, message: String },
    #[snafu(display("Environment `{}` Not Found, error {}", name, source))]
    EnvNotFound {
        source: std::env::VarError,
        name: String,
    },
    #[snafu(display("Engine config error: {}", message))]
    Config { message: String },
    #[snafu(display("Ocr `{}` error: {}", stage, message))]
    Ocr { stage: String, message: String },
}
