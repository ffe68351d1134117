//! pipe-repl: interactive front end for a line-oriented evaluator.

use std::{fs::File, io, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use pipe_repl::{plain::run_plain, BackendSource, Config, Repl, ReplLoop};

/// Read lines, evaluate them with an external backend, show classified results
#[derive(Parser, Debug)]
#[command(name = "pipe-repl", version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Prompt shown before the input line
    #[arg(long, value_name = "TEXT")]
    prompt: Option<String>,

    /// Visible transcript rows
    #[arg(long, value_name = "ROWS")]
    height: Option<u16>,

    /// Give up on an evaluation after this many milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Wait for a banner line from the backend before accepting input
    #[arg(long)]
    handshake: bool,

    /// Line-oriented mode on stdin/stdout instead of the full-screen terminal
    #[arg(long)]
    plain: bool,

    /// Write logs to this file
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Backend program and its arguments
    #[arg(
        value_name = "BACKEND",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    backend: Vec<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => Config::default(),
    };
    apply_overrides(&mut config, &args);

    let source = config
        .backend
        .source()
        .context("No backend program: pass one after the options or set [backend] program")?;
    log::info!("starting pipe-repl v{}", env!("CARGO_PKG_VERSION"));

    let source: Arc<dyn BackendSource> = Arc::new(source);
    let mut repl_loop = ReplLoop::start(source).with_builtins(config.builtins);

    if args.plain {
        let stdin = io::stdin();
        run_plain(stdin.lock(), io::stdout().lock(), &mut repl_loop, &config.prompt)?;
    } else {
        let mut repl = Repl::from_config(&config)?;
        repl.run_fullscreen(repl_loop)
            .context("Terminal session failed")?;
    }

    Ok(())
}

fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(prompt) = &args.prompt {
        config.prompt = prompt.clone();
    }
    if args.height.is_some() {
        config.height = args.height;
    }
    if let Some((program, rest)) = args.backend.split_first() {
        config.backend.program = Some(program.clone());
        config.backend.args = rest.to_vec();
    }
    if args.timeout_ms.is_some() {
        config.backend.timeout_ms = args.timeout_ms;
    }
    if args.handshake {
        config.backend.handshake = true;
    }
}

/// The full-screen UI owns the tty, so logs only go somewhere when asked for.
fn init_logging(args: &Args) -> Result<()> {
    let default_filter = match (&args.log_file, args.plain) {
        (Some(_), _) => "info",
        (None, true) => "warn",
        (None, false) => "off",
    };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter));
    if let Some(path) = &args.log_file {
        let file = File::create(path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}
