use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use json_translator::config::Config;
use json_translator::counter::TranslationCounter;
use json_translator::document::{parse_document, TranslationRequest};
use json_translator::languages::{self, Language};
use json_translator::store::{MemoryStore, ResultStore};
use json_translator::translate::create_translator;
use json_translator::{server, ProgressEvent, TranslationPipeline};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "json-translator")]
#[command(version, about = "Translate flat JSON key-value files with machine translation")]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Use the mock translator instead of the real API
        #[arg(long)]
        mock: bool,
    },
    /// Translate a file locally and write the result next to it
    Translate {
        /// Input JSON file
        input: PathBuf,

        /// Target language display name (see `languages`)
        #[arg(short, long)]
        language: String,

        /// Output file (defaults to TranslationFile_<LANG>.json beside the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Use the mock translator instead of the real API
        #[arg(long)]
        mock: bool,
    },
    /// List supported target languages
    Languages,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase())),
        )
        .with_target(false)
        .compact()
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Config::load_from(Some(path))
        }
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let mut config = load_config(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
        mock: false,
    }) {
        Command::Serve { host, port, mock } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            let translator = create_translator(&config, mock)?;
            info!("Translator: {}", translator.name());
            server::serve(&config, translator).await?;
        }
        Command::Translate {
            input,
            language,
            output,
            mock,
        } => {
            translate_file(&config, &input, &language, output, mock, cli.verbose).await?;
        }
        Command::Languages => {
            for name in languages::names() {
                let language = Language::from_name(name)?;
                println!("{:<20} {}", name, language.code);
            }
        }
    }

    Ok(())
}

async fn translate_file(
    config: &Config,
    input: &Path,
    language: &str,
    output: Option<PathBuf>,
    mock: bool,
    verbose: bool,
) -> Result<()> {
    let start = Instant::now();
    let language = Language::from_name(language)?;

    let bytes = tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let document = parse_document(&bytes, config.max_upload_bytes)?;
    let total = document.len();

    let store = Arc::new(MemoryStore::new());
    let pipeline = Arc::new(TranslationPipeline::new(
        create_translator(config, mock)?,
        store.clone(),
        Arc::new(TranslationCounter::in_memory()),
        config.pipeline(),
    ));

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let mut events = Box::pin(pipeline.stream(TranslationRequest::new(document, language)));
    let mut file_id = None;

    while let Some(event) = events.next().await {
        match event {
            ProgressEvent::Percentage { value } => pb.set_position(u64::from(value)),
            ProgressEvent::Complete { file_id: id, .. } => file_id = Some(id),
            ProgressEvent::Failed { message } => {
                pb.abandon_with_message("failed");
                anyhow::bail!("{}", message);
            }
            ProgressEvent::Warning { message } | ProgressEvent::Error { message } => {
                pb.println(message)
            }
            ProgressEvent::Info { message }
            | ProgressEvent::Success { message }
            | ProgressEvent::Progress { message } => {
                if verbose {
                    pb.println(message);
                }
            }
        }
    }

    let file_id = file_id.context("Translation ended without a result")?;
    let artifact = store
        .get(&file_id)
        .await?
        .context("Translated document missing from store")?;
    store.mark_consumed(&file_id).await?;

    let output = output.unwrap_or_else(|| input.with_file_name(artifact.file_name()));
    tokio::fs::write(&output, artifact.to_pretty_json()?)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;
    pb.finish_with_message("done");

    println!();
    println!("  {}", style("Translation complete").green().bold());
    println!("  Output:    {}", output.display());
    println!("  Entries:   {}", total);
    println!("  Language:  {}", language);
    println!("  Time:      {:.2}s", start.elapsed().as_secs_f64());
    println!();

    Ok(())
}
