use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use cover_compositor::{
    composition::{CompositionRequest, Compositor, TextOverlaySpec},
    config::Config,
    generation::{AspectRatio, CoverGenerator, GeminiCritic, StabilityProvider},
    session::{CoverSession, SessionState},
    CompositorError,
};

#[derive(Parser)]
#[command(
    name = "cover-compositor",
    version,
    about = "Generate AI book cover art and composite text onto it",
    long_about = "Cover-Compositor generates candidate book cover artwork from a description, optionally has a vision model critique each candidate, and composites titles, credits and logos onto the chosen cover."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file (optional)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Generate candidate covers from a book description
    Generate {
        /// Book description
        #[arg(required_unless_present = "description_file")]
        description: Option<String>,

        /// Read the description from a file instead
        #[arg(short = 'f', long, conflicts_with = "description")]
        description_file: Option<PathBuf>,

        /// Aspect ratio (1:1, 9:16, 16:9, 4:3, 3:4)
        #[arg(short, long)]
        aspect: Option<AspectRatio>,

        /// Number of candidates
        #[arg(short = 'n', long)]
        count: Option<u32>,

        /// Skip the critique pass
        #[arg(long)]
        no_critique: bool,
    },

    /// Composite text and image overlays onto a cover
    Compose {
        /// Base cover image (PNG or JPEG)
        base: PathBuf,

        /// Overlay request file (TOML or JSON)
        #[arg(short, long)]
        request: Option<PathBuf>,

        /// Add a title with the default style
        #[arg(short, long)]
        title: Option<String>,

        /// Output image path (.png, .jpg or .jpeg)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Walk through generation, selection and overlays interactively
    Session,

    /// Write the default configuration to a file
    InitConfig {
        #[arg(default_value = "cover-compositor.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    info!("Starting Cover-Compositor v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path)?
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    };
    config.validate()?;

    let outcome = match cli.command {
        Command::Generate { description, description_file, aspect, count, no_critique } => {
            run_generate(&config, description, description_file, aspect, count, no_critique).await
        }
        Command::Compose { base, request, title, output } => run_compose(&config, base, request, title, output).await,
        Command::Session => run_session(&config).await,
        Command::InitConfig { path, force } => run_init_config(&config, &path, force),
    };

    if let Err(e) = &outcome {
        if let Some(compositor_error) = e.downcast_ref::<CompositorError>() {
            error!("{}", compositor_error.user_message());
        }
    }
    outcome
}

/// Build the generator from configuration
///
/// A critic that cannot be configured is skipped with a warning; the
/// critique pass is optional.
fn build_generator(config: &Config, critique: bool) -> Result<CoverGenerator> {
    let provider = StabilityProvider::from_config(&config.generation)?;
    let mut generator = CoverGenerator::new(Arc::new(provider));

    if critique && config.critique.enabled {
        match GeminiCritic::from_config(&config.critique) {
            Ok(critic) => generator = generator.with_critic(Arc::new(critic)),
            Err(e) => warn!("Critique pass disabled: {}", e),
        }
    }
    Ok(generator)
}

async fn run_generate(
    config: &Config,
    description: Option<String>,
    description_file: Option<PathBuf>,
    aspect: Option<AspectRatio>,
    count: Option<u32>,
    no_critique: bool,
) -> Result<()> {
    let description = match (description, description_file) {
        (Some(text), _) => text,
        (None, Some(path)) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read description from {:?}", path))?,
        (None, None) => anyhow::bail!("A description or --description-file is required"),
    };

    let generator = build_generator(config, !no_critique)?;
    let mut session = CoverSession::new(config.session.clone());
    let candidates = session
        .generate(
            &generator,
            &description,
            aspect.unwrap_or(config.generation.aspect_ratio),
            count.unwrap_or(config.generation.count),
        )
        .await?;

    for (index, candidate) in candidates.iter().enumerate() {
        let note = if candidate.touched_up { " (touched up)" } else { "" };
        println!("{}: {}{}", index + 1, candidate.path.display(), note);
    }
    Ok(())
}

async fn run_compose(
    config: &Config,
    base: PathBuf,
    request_path: Option<PathBuf>,
    title: Option<String>,
    output: PathBuf,
) -> Result<()> {
    let mut request = match &request_path {
        Some(path) => CompositionRequest::from_file(path)?,
        None => CompositionRequest::new(),
    };
    if let Some(title) = title {
        request = request.text(TextOverlaySpec::new(title));
    }

    let compositor = Compositor::new(config.compositor.clone());
    let composition = tokio::task::spawn_blocking(move || compositor.compose(&base, &request, &output))
        .await
        .context("Composition task panicked")??;

    for warning in &composition.warnings {
        warn!("{}", warning);
    }
    println!("{}", composition.output_path.display());
    Ok(())
}

fn run_init_config(config: &Config, path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{:?} already exists (use --force to overwrite)", path);
    }
    config.save_to_file(path)?;
    info!("Configuration written to {:?}", path);
    Ok(())
}

/// Print a failed step for the interactive session
fn report(error: &CompositorError) {
    println!("{}", error.user_message());
    if error.is_recoverable() {
        println!("This looks temporary; the same step can be tried again.");
    }
}

async fn prompt(lines: &mut Lines<BufReader<Stdin>>, message: &str) -> Result<Option<String>> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(message.as_bytes()).await?;
    stdout.flush().await?;
    Ok(lines.next_line().await?.map(|line| line.trim().to_string()))
}

/// Terminal front-end over [`CoverSession`]
async fn run_session(config: &Config) -> Result<()> {
    let generator = build_generator(config, true)?;
    let compositor = Compositor::new(config.compositor.clone());
    let mut session = CoverSession::new(config.session.clone());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    info!("📚 Session {} started", session.id());

    loop {
        match session.state() {
            SessionState::AwaitingDescription => {
                let Some(description) = prompt(&mut lines, "\nBook description (empty to quit): ").await? else {
                    break;
                };
                if description.is_empty() {
                    break;
                }
                let generated = session
                    .generate(&generator, &description, config.generation.aspect_ratio, config.generation.count)
                    .await;
                if let Err(e) = generated {
                    report(&e);
                }
            }
            SessionState::CandidatesReady { candidates, .. } => {
                println!();
                for (index, candidate) in candidates.iter().enumerate() {
                    println!("  [{}] {}", index + 1, candidate.path.display());
                }
                let Some(answer) = prompt(&mut lines, "Pick a cover, 'r' to regenerate, 'q' to quit: ").await? else {
                    break;
                };
                match answer.as_str() {
                    "q" => break,
                    "r" => session.regenerate()?,
                    choice => match choice.parse::<usize>() {
                        Ok(number) if number > 0 => {
                            if let Err(e) = session.select(number - 1) {
                                report(&e);
                            }
                        }
                        _ => println!("Please enter a candidate number"),
                    },
                }
            }
            SessionState::OverlayReady { .. } | SessionState::Composed { .. } => {
                if let Some(image) = session.current_image() {
                    println!("\nCurrent cover: {}", image.display());
                }
                let Some(answer) = prompt(
                    &mut lines,
                    "Overlay request file, 'title <text>', 'n' for a new cover, 'q' to quit: ",
                )
                .await?
                else {
                    break;
                };

                let request = match answer.as_str() {
                    "q" => break,
                    "n" => {
                        session.reset();
                        continue;
                    }
                    _ => match answer.strip_prefix("title ") {
                        Some(title) => Ok(CompositionRequest::new().text(TextOverlaySpec::new(title))),
                        None => CompositionRequest::from_file(&answer),
                    },
                };

                let composed = request.and_then(|request| {
                    tokio::task::block_in_place(|| session.compose(&compositor, &request).map(Path::to_path_buf))
                });
                match composed {
                    Ok(output) => {
                        for warning in session.warnings() {
                            println!("  ⚠️  {}", warning);
                        }
                        println!("Saved {}", output.display());
                    }
                    Err(e) => report(&e),
                }
            }
        }
    }

    info!("Session {} finished", session.id());
    Ok(())
}
