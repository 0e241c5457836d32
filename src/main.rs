use anyhow::{bail, Context, Result};
use clap::Parser;
use context_bundler::app::{Engine, EngineEvent, GenerateRequest};
use context_bundler::config::{settings, AppConfig};
use context_bundler::core::OutputFormat;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Bundle selected files into one Markdown or XML document for LLM context.",
    after_help = "EXAMPLES:\n  context-bundler . src Cargo.toml\n  context-bundler ~/proj -f xml -o /tmp/ctx.xml --ignore 'target;*.lock'"
)]
struct Cli {
    /// Workspace root; display paths are relative to it (default: the last root used).
    #[arg(value_name = "ROOT")]
    root: Option<PathBuf>,

    /// Files or directories to select, relative to ROOT (default: ROOT itself).
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    #[arg(short = 'f', long, help = "Set and save the output format (markdown or xml).", value_name = "FORMAT")]
    format: Option<OutputFormat>,

    #[arg(short = 'o', long, help = "Write the document to this file.", value_name = "FILE")]
    output: Option<PathBuf>,

    #[arg(
        long,
        help = "Ignore rules separated by ';' (replaces and saves the configured rules).",
        value_name = "RULES"
    )]
    ignore: Option<String>,

    #[arg(long, help = "Label files by base name instead of their path relative to ROOT.")]
    base_names: bool,

    #[arg(long, help = "Collapse runs of blank lines in file contents.")]
    compress: bool,

    #[arg(long, help = "Neither load nor save the configuration; use defaults.")]
    no_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = if cli.no_config {
        AppConfig::default()
    } else {
        AppConfig::load().unwrap_or_else(|e| {
            tracing::warn!("Using default config: {:#}", e);
            AppConfig::default()
        })
    };

    let root = resolve_root(cli.root.as_deref(), &config)?;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let mut engine = Engine::new(config, event_tx).context("Failed to start engine")?;
    if !cli.no_config {
        match settings::get_config_directory() {
            Some(dir) => engine = engine.with_settings_dir(dir),
            None => tracing::warn!("No config directory on this platform; settings are not saved"),
        }
    }

    if let Some(rules) = &cli.ignore {
        engine.set_ignore_text(rules);
    }
    if let Some(format) = cli.format {
        engine.set_output_format(format);
    }
    engine.navigate(&root)?;

    let targets: Vec<PathBuf> = if cli.paths.is_empty() {
        vec![root.clone()]
    } else {
        cli.paths.iter().map(|p| root.join(p)).collect()
    };
    for target in &targets {
        if !target.exists() {
            bail!("{} does not exist", target.display());
        }
        // Overlapping arguments must not deselect what an earlier one selected.
        if engine.is_selected(target) {
            continue;
        }
        engine.toggle(target, true);
        engine.wait_idle().await;
    }

    let mut request = GenerateRequest::from_config(engine.config());
    if let Some(output) = &cli.output {
        let (dir, name) = split_output(output)?;
        request.output_dir = dir;
        request.output_name = name;
    }
    request.relative = request.relative && !cli.base_names;
    request.compress = request.compress || cli.compress;

    let planned = engine.generate(request);
    engine.wait_idle().await;

    let mut written = None;
    while let Ok(event) = event_rx.try_recv() {
        match event {
            EngineEvent::GenerationFinished(Ok(path)) => written = Some(path),
            EngineEvent::GenerationFinished(Err(message)) => bail!(message),
            EngineEvent::TaskFailed(message) => tracing::warn!("{}", message),
            EngineEvent::Notice(message) => tracing::info!("{}", message),
            EngineEvent::SelectionChanged(update) => {
                tracing::debug!("Selection now holds {} files", update.selected_files)
            }
            EngineEvent::DirectoryListed { .. } => {}
        }
    }

    match (planned, written) {
        (Some(_), Some(path)) => {
            println!("{}", path.display());
            Ok(())
        }
        (None, _) => bail!("Nothing to bundle under {}", root.display()),
        (Some(path), None) => bail!("Generation of {} did not finish", path.display()),
    }
}

/// The explicit ROOT, else the directory used last time.
fn resolve_root(explicit: Option<&Path>, config: &AppConfig) -> Result<PathBuf> {
    let root = explicit
        .or(config.last_directory.as_deref())
        .context("No ROOT given and no previous root saved")?;
    root.canonicalize()
        .with_context(|| format!("Cannot open workspace root {}", root.display()))
}

/// Splits `-o` into the output directory and file name.
fn split_output(output: &Path) -> Result<(PathBuf, String)> {
    let name = output
        .file_name()
        .with_context(|| format!("{} is not a file path", output.display()))?
        .to_string_lossy()
        .into_owned();
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, name))
}
