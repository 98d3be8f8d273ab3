use std::io::{self, BufRead};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use eyre::{Result, WrapErr, bail};
use log::{debug, info, warn};

mod cli;

use cli::{Cli, Command, InsightFormat, TranscriptFormat};
use ytinsight::config::{self, Config};
use ytinsight::gemini::GeminiClient;
use ytinsight::insight::InsightGenerator;
use ytinsight::pipeline::{Pipeline, Strategy};
use ytinsight::server::{self, AppState};
use ytinsight::youtube::{TranscriptProvider, YouTubeScraper};

fn setup_logging() -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("ytinsight.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytinsight")
        .join("logs")
}

fn build_after_help() -> String {
    let key_line = match config::API_KEY_VARS.iter().find(|var| config::env_lookup(var).is_some()) {
        Some(var) => format!("  \x1b[32m✅\x1b[0m Gemini key  ({var})"),
        None => format!(
            "  \x1b[31m❌\x1b[0m Gemini key  (not set — export {} for insights)",
            config::API_KEY_VARS.join(" or ")
        ),
    };

    format!(
        "\nCREDENTIALS:\n{key_line}\n\nConfig is read from: {}\nLogs are written to: {}",
        config::config_path().display(),
        log_dir().join("ytinsight.log").display()
    )
}

/// URL from the argument, or one per non-empty stdin line
fn collect_inputs(url: Option<String>) -> Result<Vec<String>> {
    let inputs = match url {
        Some(url) => vec![url],
        None => io::stdin().lock().lines().collect::<Result<Vec<_>, _>>()?,
    };

    let inputs: Vec<String> = inputs
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if inputs.is_empty() {
        bail!("no URL or video ID provided\n\nUsage: ytinsight <COMMAND> <URL>\n       echo <URL> | ytinsight <COMMAND>");
    }
    Ok(inputs)
}

fn emit(rendered: &str, output: Option<&Path>, verbose: bool) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, rendered)?;
            if verbose {
                eprintln!("Output written to: {}", path.display());
            }
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn invalid_input(input: &str) -> eyre::Report {
    eyre::eyre!(
        "could not extract video ID from: {input}\n\nSupported formats:\n  https://www.youtube.com/watch?v=ID\n  https://youtu.be/ID\n  https://www.youtube.com/embed/ID\n  https://www.youtube.com/shorts/ID\n  <11-character video ID>"
    )
}

fn build_pipeline(
    config: &Config,
    client: &reqwest::Client,
    transcripts: Arc<dyn TranscriptProvider>,
    strategies: Vec<Strategy>,
    model: Option<&str>,
) -> ytinsight::Result<Pipeline> {
    let settings = config.gemini_settings(model, config::env_lookup)?;
    let gemini = GeminiClient::new(client.clone(), settings)?;
    debug!("Using Gemini model {}", gemini.model());
    Ok(Pipeline::new(transcripts, InsightGenerator::new(Arc::new(gemini)), strategies))
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let after_help = build_after_help();
    let cmd = <Cli as clap::CommandFactory>::command().after_help(after_help);
    let matches = cmd.get_matches();
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;

    // Load config file (non-fatal if missing/invalid)
    let config = Config::load().unwrap_or_else(|e| {
        warn!("Ignoring config file: {e}");
        Config::default()
    });

    if cli.verbose {
        let config_path = config::config_path();
        if config_path.exists() {
            eprintln!("Config: {}", config_path.display());
        }
    }

    let client = reqwest::Client::builder().timeout(config.timeout()).build()?;
    let scraper: Arc<dyn TranscriptProvider> = Arc::new(YouTubeScraper::new(client.clone()));

    match cli.command {
        Command::Transcript { url, format, output } => {
            for input in collect_inputs(url)? {
                let video_id = ytinsight::extract_video_id(&input).ok_or_else(|| invalid_input(&input))?;
                let record = scraper
                    .fetch(&video_id)
                    .await
                    .wrap_err_with(|| format!("transcript extraction failed for {video_id}"))?;

                if cli.verbose {
                    eprintln!(
                        "Video: {} ({})\nLanguage: {}\nCharacters: {}",
                        record.title,
                        record.video_id,
                        record.language,
                        record.text.len(),
                    );
                }

                let rendered = match format {
                    TranscriptFormat::Text => ytinsight::output::render_transcript(&record),
                    TranscriptFormat::Json => ytinsight::output::render_transcript_json(&record),
                };
                emit(&rendered, output.as_deref(), cli.verbose)?;
            }
        }
        Command::Insight {
            url,
            format,
            output,
            strategies,
            model,
        } => {
            let inputs = collect_inputs(url)?;
            let strategies = if strategies.is_empty() {
                config.strategies()
            } else {
                strategies
            };
            // Fails before any network call when the credential is missing
            let pipeline = build_pipeline(&config, &client, scraper, strategies, model.as_deref())?;

            for input in inputs {
                if ytinsight::extract_video_id(&input).is_none() {
                    return Err(invalid_input(&input));
                }
                if cli.verbose {
                    let ranking: Vec<String> = pipeline.strategies().iter().map(ToString::to_string).collect();
                    eprintln!("Strategies: {}", ranking.join(" → "));
                }

                let insight = pipeline.run(&input).await?;

                if cli.verbose {
                    eprintln!(
                        "Video: {}\nHow-to: {}\nSources: {}",
                        insight.title,
                        insight.is_how_to,
                        insight.source_urls.len()
                    );
                }

                let rendered = match format {
                    InsightFormat::Text => ytinsight::output::render_text(&insight),
                    InsightFormat::Json => ytinsight::output::render_json(&insight),
                    InsightFormat::Guide => match ytinsight::output::render_guide(&insight) {
                        Some(guide) => guide,
                        None => {
                            eprintln!("\"{}\" is not a how-to video; printing summary instead", insight.title);
                            ytinsight::output::render_text(&insight)
                        }
                    },
                };
                emit(&rendered, output.as_deref(), cli.verbose)?;
            }
        }
        Command::Serve { listen } => {
            let listen = listen.as_deref().unwrap_or(config.listen());
            let addr: SocketAddr = listen
                .parse()
                .wrap_err_with(|| format!("invalid listen address: {listen}"))?;

            let insights = match build_pipeline(&config, &client, scraper.clone(), config.strategies(), None) {
                Ok(pipeline) => Some(Arc::new(pipeline)),
                Err(e) => {
                    warn!("Insight endpoint disabled: {e}");
                    eprintln!("Insight endpoint disabled: {e}");
                    None
                }
            };

            let state = AppState {
                transcripts: scraper,
                insights,
            };
            server::serve(addr, state).await?;
        }
    }

    Ok(())
}
