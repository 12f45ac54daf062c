//! Command line and environment configuration

use crate::http_generator::GeneratorConfig;
use crate::types::GenerationParams;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "mdsearch", version, about = "Ask questions over a folder of markdown notes")]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive question loop (default)
    Ask {
        /// Also print an answer generated without retrieved context
        #[arg(long)]
        direct: bool,
    },
    /// Serve the search API over HTTP
    Serve {
        #[arg(long, env = "MDSEARCH_PORT", default_value_t = 8081)]
        port: u16,
    },
}

#[derive(Debug, Clone, clap::Args)]
pub struct Settings {
    /// Base URL of the text-generation-inference server
    #[arg(long, env = "TGI_URL", default_value = "http://127.0.0.1:8080")]
    pub tgi_url: String,

    /// Directory scanned recursively for *.md files
    #[arg(long, env = "MDSEARCH_DOCS_DIR", default_value = ".")]
    pub docs_dir: PathBuf,

    /// Per-request timeout for generation calls
    #[arg(long, env = "MDSEARCH_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Tracing filter, e.g. `info` or `mdsearch=debug`
    #[arg(long = "log", env = "RUST_LOG", default_value = "info")]
    pub log_filter: String,

    #[arg(long, default_value_t = 1500)]
    pub max_tokens: u32,

    #[arg(long, default_value_t = 0.0)]
    pub temperature: f32,

    #[arg(long, default_value_t = 0.95)]
    pub top_p: f32,

    #[arg(long, default_value_t = 1.0)]
    pub repetition_penalty: f32,

    /// Rename directories and markdown files with unsafe characters first
    #[arg(long)]
    pub sanitize: bool,

    /// Start without checking that the inference server answers
    #[arg(long)]
    pub skip_probe: bool,
}

impl Settings {
    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            base_url: self.tgi_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
            repetition_penalty: self.repetition_penalty,
        }
    }
}
