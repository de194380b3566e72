//! Print the name of the largest plain file in a directory.
//!
//! ```bash
//! largest /var/log
//! RUST_LOG=stagefan=debug largest --no-cancel ~/Downloads
//! ```

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing_subscriber::{fmt, EnvFilter};

use stagefan::{largest_file, FanOut, TokioFs};

#[derive(Debug, Parser)]
#[command(name = "largest", version, about = "Find the largest plain file in a directory")]
struct Args {
    /// Directory to inspect (not recursive)
    dir: PathBuf,

    /// Fetch metadata inside the current task instead of spawning onto the runtime
    #[arg(long)]
    local: bool,

    /// Let in-flight metadata requests finish after the first failure
    #[arg(long)]
    no_cancel: bool,
}

/// Library log filter used when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "stagefan=error";

fn init_logging() {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

async fn run(args: Args) -> anyhow::Result<String> {
    let provider = Arc::new(TokioFs);
    let dir = args.dir.clone();

    let name = if args.local {
        let fan_out = FanOut::local().cancel_on_failure(!args.no_cancel);
        largest_file(provider, fan_out, args.dir).await
    } else {
        let fan_out = FanOut::new(|fut: BoxFuture<'static, ()>| tokio::spawn(fut).map(|_| ()))
            .cancel_on_failure(!args.no_cancel);
        largest_file(provider, fan_out, args.dir).await
    };

    name.with_context(|| format!("cannot find the largest file in {}", dir.display()))
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    match run(args).await {
        Ok(name) => {
            println!("{name}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
