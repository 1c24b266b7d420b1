//! ftm-translate command line
//!
//! Translates plain texts, JSON-lines entity streams and media transcripts
//! with the locally installed argos or apertium engines.

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ftm_translate::cli::{Args, Commands};
use ftm_translate::config::Config;
use ftm_translate::io;
use ftm_translate::transcribe::Transcriber;
use ftm_translate::translate::Dispatcher;
use ftm_translate::workflow::{translate_entities, TranslationOptions};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(args.config.as_deref())?;

    if args.settings {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let Some(command) = args.command else {
        anyhow::bail!("No command given, see --help");
    };

    let _guard = setup_logging(args.verbose, &config.log_dir())?;

    match command {
        Commands::Text { input, output, source, target, engine } => {
            let source = source
                .or_else(|| config.translate.source_language.clone())
                .context("A source language is required (-s or FTMTR_SOURCE_LANGUAGE)")?;
            let dispatcher = Dispatcher::new(&config)?;

            let text = io::read_text(&input).await?;
            let result = dispatcher
                .translate(&text, &source, target.as_deref(), engine.as_deref())
                .await?;
            if let Some(result) = result {
                io::write_text(&output, &result).await?;
            }
        }

        Commands::Entities { input, output, source, target, engine, dehydrate } => {
            let dispatcher = Dispatcher::new(&config)?;
            let options = TranslationOptions {
                source_language: source.or_else(|| config.translate.source_language.clone()),
                target_language: target,
                engine,
            };

            let reader = io::open_reader(&input).await?;
            let mut writer = io::open_writer(&output).await?;
            let entities = translate_entities(&dispatcher, io::entity_stream(reader), &options);
            futures::pin_mut!(entities);

            let mut count = 0usize;
            while let Some(entity) = entities.next().await {
                let entity = if dehydrate { entity.dehydrate() } else { entity };
                io::write_entity(&mut writer, &entity).await?;
                count += 1;
            }
            writer.flush().await?;
            info!("Wrote {} entities", count);
        }

        Commands::Transcribe { input, output, language, translate, source, target, engine } => {
            let transcriber = Transcriber::new(&config);
            let transcript = transcriber.transcribe(&input, language.as_deref()).await?;

            let text = if translate {
                let source = source
                    .or(language)
                    .or_else(|| config.translate.source_language.clone())
                    .context("Translating a transcript needs a source language (-s or -l)")?;
                let dispatcher = Dispatcher::new(&config)?;
                dispatcher
                    .translate(&transcript, &source, target.as_deref(), engine.as_deref())
                    .await?
            } else {
                Some(transcript)
            };

            if let Some(text) = text {
                io::write_text(&output, &text).await?;
            }
        }
    }

    Ok(())
}

/// Console logging on stderr plus a daily rolling file under `log_dir`.
/// The returned guard flushes the file writer when dropped.
fn setup_logging(verbose: bool, log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = rolling::daily(log_dir, "ftm-translate.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("ftm-translate.log").display()
    );

    Ok(guard)
}
