//! mdsearch CLI: interactive question loop or HTTP server

use clap::Parser;
use mdsearch::config::{Cli, Command, Settings};
use mdsearch::{
    ingest, server, telemetry, BpeTokenizer, DocumentStore, LexicalRetriever, ParamOverrides,
    SearchEngine, SearchResult, TgiGenerator,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, warn};

const CONTEXT_PREVIEW_CHARS: usize = 500;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing(&cli.settings.log_filter)?;

    println!("mdsearch {}", env!("CARGO_PKG_VERSION"));

    let engine = match build_engine(&cli.settings).await {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            error!("Fatal error during initialization: {:?}", e);
            eprintln!("Fatal Error: {}", e);
            eprintln!("Check the documents directory and that the inference server is running.");
            std::process::exit(1);
        }
    };

    match cli.command.unwrap_or(Command::Ask { direct: false }) {
        Command::Ask { direct } => run_loop(&engine, direct).await?,
        Command::Serve { port } => server::run_server(engine, port).await?,
    }

    Ok(())
}

async fn build_engine(settings: &Settings) -> anyhow::Result<SearchEngine> {
    if settings.sanitize {
        println!("Cleaning filenames...");
        ingest::sanitize_directory(&settings.docs_dir)?;
    }

    println!("Reading MD files from {}...", settings.docs_dir.display());
    let documents = ingest::read_markdown_files(&settings.docs_dir)?;
    println!("Found {} documents", documents.len());

    let generator = TgiGenerator::with_config(settings.generator_config())?;
    if settings.skip_probe {
        println!("Skipping LLM connection test");
    } else {
        println!("Testing LLM connection at {}...", generator.base_url());
        if !generator.probe().await {
            anyhow::bail!(
                "Failed to get response from LLM at {}. Please check the connection and server status.",
                generator.base_url()
            );
        }
        println!("LLM connection test successful!");
    }

    let engine = SearchEngine::new(
        Arc::new(DocumentStore::new(documents)),
        LexicalRetriever::default(),
        Arc::new(generator),
        Arc::new(BpeTokenizer::cl100k()?),
    )
    .with_params(settings.generation_params());

    Ok(engine)
}

async fn run_loop(engine: &SearchEngine, direct: bool) -> anyhow::Result<()> {
    println!("\nInitialization complete. Ready for queries!");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout
            .write_all(b"\nEnter your question (or 'quit' to exit): ")
            .await?;
        stdout.flush().await?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!("\nExiting due to user interrupt...");
                break;
            }
        };

        let Some(query) = line else { break };
        let query = query.trim();
        if query.eq_ignore_ascii_case("quit") {
            break;
        }
        if query.is_empty() {
            println!("Please enter a valid query.");
            continue;
        }

        debug!("Starting search for query: {}", query);
        println!("\nGenerating response...");

        if direct {
            println!("\nDirect LLM response:");
            match engine.direct(query, &ParamOverrides::default()).await {
                Some(answer) => println!("{}\n", answer),
                None => println!("No direct response generated."),
            }
        }

        let result = engine.search(query).await;
        print_result(&result);
    }

    println!("\nThank you for using mdsearch!");
    Ok(())
}

fn print_result(result: &SearchResult) {
    if result.success {
        println!("\nRAG Response:\n{}", result.response_text);
    } else {
        warn!("Search did not produce an answer");
        println!("\n{}", result.response_text);
    }

    if !result.context_text.is_empty() {
        let preview = mdsearch::context_builder::truncate_chars(&result.context_text, CONTEXT_PREVIEW_CHARS);
        println!("\nContext Used:\n{}...", preview);
        println!("\n(Context truncated for display)");
    }

    println!("\nSearch Metrics:");
    for (name, value) in result.metrics.entries() {
        println!("{}: {}", name, value);
    }
}
