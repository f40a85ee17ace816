use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

use wfl::parser::{ParserConfig, DEFAULT_MAX_DEPTH};
use wfl::{Evaluator, Registry};

#[derive(Parser)]
#[command(name = "wfl")]
#[command(about = "Run a WFL workflow", long_about = None)]
struct Cli {
    /// Workflow file to run. Reads stdin when omitted.
    file: Option<PathBuf>,

    /// Print the parsed actions as JSON instead of running them
    #[arg(long)]
    dump: bool,

    /// Deepest `{ ... }` nesting accepted
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Log dispatches (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> wfl::Result<()> {
    let config = ParserConfig {
        max_depth: cli.max_depth,
    };

    let actions = match &cli.file {
        Some(path) => wfl::loader::load_file_with(path, &config).await?,
        None => {
            let mut source = String::new();
            tokio::io::stdin()
                .read_to_string(&mut source)
                .await
                .map_err(|source| wfl::Error::Io {
                    path: PathBuf::from("<stdin>"),
                    source,
                })?;
            wfl::parse_with(&source, &config)?
        }
    };

    if cli.dump {
        println!("{}", serde_json::to_string_pretty(&actions)?);
        return Ok(());
    }

    Evaluator::new(Registry::with_builtins()).run(&actions).await?;
    Ok(())
}
