use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Parser;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use docfield_core::{
    config::EngineConfig,
    error::{DocfieldError, IoReadSnafu, JsonSnafu},
    layout::{ExtractionRecord, RotationTokens, Token},
    parse::Engine,
    template::TemplateSet,
};

#[derive(Parser)]
#[command(name = "extract")]
#[command(about = "Extract document fields from OCR output")]
struct Args {
    #[arg(required = true, help = "OCR JSON files: a token array or a list of {angle, tokens}")]
    inputs: Vec<PathBuf>,

    #[arg(short, long, help = "Directory of JSON templates loaded after the built-ins")]
    templates: Option<PathBuf>,

    #[arg(short, long, help = "Engine configuration JSON file")]
    config: Option<PathBuf>,

    #[arg(long, help = "Pretty-print each record")]
    pretty: bool,
}

/// OCR output as written by upstream tools.
#[derive(Deserialize)]
#[serde(untagged)]
enum OcrInput {
    Tokens(Vec<Token>),
    Rotations(Vec<RotationTokens>),
}

impl From<OcrInput> for Vec<RotationTokens> {
    fn from(input: OcrInput) -> Self {
        match input {
            OcrInput::Tokens(tokens) => vec![RotationTokens::new(0, tokens)],
            OcrInput::Rotations(rotations) => rotations,
        }
    }
}

#[derive(Serialize)]
struct Output<'a> {
    file: &'a str,
    #[serde(flatten)]
    record: ExtractionRecord,
}

fn load_input(path: &PathBuf) -> Result<Vec<RotationTokens>, DocfieldError> {
    let path_name = path.display().to_string();
    let content = fs::read_to_string(path).context(IoReadSnafu { path: &path_name })?;
    let input: OcrInput = serde_json::from_str(&content).context(JsonSnafu { path: &path_name })?;
    Ok(input.into())
}

fn build_engine(args: &Args) -> Result<Engine, DocfieldError> {
    let templates = match &args.templates {
        Some(dir) => {
            let mut set = TemplateSet::builtin()?;
            set.load_dir(dir)?;
            set
        }
        None => TemplateSet::from_env()?,
    };

    let config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };

    Engine::new(templates, config)
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let engine = build_engine(&args)?;
    info!("Processing {} files.", args.inputs.len());

    let loaded: Vec<(String, Vec<RotationTokens>)> = args
        .inputs
        .par_iter()
        .filter_map(|path| match load_input(path) {
            Ok(rotations) => Some((path.display().to_string(), rotations)),
            Err(e) => {
                error!("Skipping input: {}", e);
                None
            }
        })
        .collect();

    let (files, documents): (Vec<String>, Vec<Vec<RotationTokens>>) = loaded.into_iter().unzip();
    let results = engine.extract_batch_tokens(&documents);

    for (file, result) in files.iter().zip(&results) {
        let output = Output {
            file,
            record: engine.record(result),
        };
        let line = if args.pretty {
            serde_json::to_string_pretty(&output)?
        } else {
            serde_json::to_string(&output)?
        };
        println!("{line}");
    }

    info!("Done, {} records written.", results.len());
    Ok(())
}
