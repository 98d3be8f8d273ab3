use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ytinsight::pipeline::Strategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TranscriptFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum InsightFormat {
    Text,
    Json,
    /// Markdown how-to guide (how-to videos only)
    Guide,
}

#[derive(Parser)]
#[command(
    name = "ytinsight",
    about = "YouTube transcript scraper and video insight generator",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Show extraction method and metadata
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Fetch the caption transcript of a video
    Transcript {
        /// YouTube video URL or video ID (reads from stdin if omitted)
        url: Option<String>,

        /// Output format: text (default), json
        #[arg(short, long, value_enum, default_value_t = TranscriptFormat::Text)]
        format: TranscriptFormat,

        /// Write output to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Summarize a video and extract how-to steps via Gemini
    Insight {
        /// YouTube video URL or video ID (reads from stdin if omitted)
        url: Option<String>,

        /// Output format: text (default), json, guide
        #[arg(short, long, value_enum, default_value_t = InsightFormat::Text)]
        format: InsightFormat,

        /// Write output to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Strategy ranking; repeat to add fallbacks (default: transcript, search)
        #[arg(short, long = "strategy", value_enum)]
        strategies: Vec<Strategy>,

        /// Gemini model
        #[arg(long)]
        model: Option<String>,
    },

    /// Serve the HTTP API
    Serve {
        /// Address to listen on (default: 127.0.0.1:3000)
        #[arg(short, long)]
        listen: Option<String>,
    },
}
