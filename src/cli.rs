use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::io::STDIO;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Print the effective settings as TOML and exit
    #[arg(long)]
    pub settings: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Translate a plain text
    Text {
        /// Input file, `-` for stdin
        #[arg(short, long, default_value = STDIO)]
        input: String,

        /// Output file, `-` for stdout
        #[arg(short, long, default_value = STDIO)]
        output: String,

        /// Source language (ISO 639-1)
        #[arg(short, long)]
        source: Option<String>,

        /// Target language (ISO 639-1)
        #[arg(short, long)]
        target: Option<String>,

        /// Translation engine: argos or apertium
        #[arg(short, long)]
        engine: Option<String>,
    },

    /// Translate a JSON-lines stream of FollowTheMoney entities
    Entities {
        /// Input file, `-` for stdin
        #[arg(short, long, default_value = STDIO)]
        input: String,

        /// Output file, `-` for stdout
        #[arg(short, long, default_value = STDIO)]
        output: String,

        /// Source language; defaults to each entity's detected language
        #[arg(short, long)]
        source: Option<String>,

        /// Target language (ISO 639-1)
        #[arg(short, long)]
        target: Option<String>,

        /// Translation engine: argos or apertium
        #[arg(short, long)]
        engine: Option<String>,

        /// Only emit id, schema and translation properties
        #[arg(long)]
        dehydrate: bool,
    },

    /// Transcribe an audio or video file
    Transcribe {
        /// Input media file
        #[arg(short, long)]
        input: PathBuf,

        /// Output transcript file, `-` for stdout
        #[arg(short, long, default_value = STDIO)]
        output: String,

        /// Spoken language hint
        #[arg(short, long)]
        language: Option<String>,

        /// Translate the transcript
        #[arg(long)]
        translate: bool,

        /// Source language for translation; defaults to the language hint
        #[arg(short, long)]
        source: Option<String>,

        /// Target language (ISO 639-1)
        #[arg(short, long)]
        target: Option<String>,

        /// Translation engine: argos or apertium
        #[arg(short, long)]
        engine: Option<String>,
    },
}
