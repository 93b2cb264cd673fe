//! dap-tap - captures Debug Adapter Protocol output into a workspace log file.
//!
//! The binary plays the debugging host for a [`SessionOutputLogger`]: it owns
//! the workspace folder list and turns every DAP stream into one debugging
//! session.

use anyhow::Context;
use clap::{Parser, Subcommand};
use dap_output_tap::dap::session::{forward_requests, Session};
use dap_output_tap::dap::tracer::FileTracer;
use dap_output_tap::tap::{Config, Placement, SessionOutputLogger, WorkspaceFolders};
use log::{info, warn};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::net::TcpListener;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Workspace folder (may be repeated, the first one is used).
    /// Defaults to the current directory.
    #[clap(long, global = true)]
    workspace: Vec<PathBuf>,

    /// Log file placement: `root` or `subdirectory`. Overrides the config file.
    #[clap(long, global = true)]
    placement: Option<Placement>,

    /// TOML file with log location settings.
    #[clap(long, global = true, env = "DAP_TAP_CONFIG")]
    config: Option<PathBuf>,

    /// Optional log file for diagnostics (no output to stdout).
    #[clap(long, global = true)]
    log_file: Option<PathBuf>,

    /// Trace DAP traffic into the log file.
    /// Requires --log-file.
    #[clap(long, global = true)]
    trace_dap: bool,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Read adapter messages from stdin, one stream is one session.
    Record,
    /// Accept adapter message streams over TCP, one client == one session.
    Listen {
        /// Address to listen on.
        #[clap(long, default_value = "127.0.0.1:4712")]
        listen: String,

        /// Exit after the first session ends (single-client mode).
        #[clap(long)]
        oneshot: bool,
    },
    /// Run a debug adapter over stdio and capture its output events.
    Proxy {
        /// Adapter command line.
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        adapter: Vec<String>,
    },
}

fn init_logging(log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let mut builder = env_logger::Builder::from_default_env();
    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(placement) = args.placement {
        config.placement = placement;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_ref())?;

    let config = load_config(&args).context("invalid configuration")?;
    let folders = if args.workspace.is_empty() {
        vec![std::env::current_dir().context("resolve current directory")?]
    } else {
        args.workspace.clone()
    };
    let host = Arc::new(WorkspaceFolders::new(folders));
    let logger = Arc::new(SessionOutputLogger::new(host, config));
    // directory creation is awaited again by the first session if still running
    let _ = logger.activate();

    let tracer = match (&args.log_file, args.trace_dap) {
        (Some(path), true) => Some(FileTracer::new(path)?),
        (None, true) => {
            warn!(target: "dap", "--trace-dap requires --log-file; tracing disabled");
            None
        }
        _ => None,
    };

    match args.command {
        Command::Record => {
            let session = Session::start(&logger, tracer).await;
            session.record(BufReader::new(tokio::io::stdin())).await?;
        }
        Command::Listen { listen, oneshot } => {
            serve(&logger, &listen, oneshot, tracer).await?;
        }
        Command::Proxy { adapter } => {
            let code = proxy(&logger, &adapter, tracer).await?;
            logger.deactivate();
            // stdin reader may still be blocked on the client, don't wait for it
            std::process::exit(code);
        }
    }

    logger.deactivate();
    Ok(())
}

const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(50);
const ACCEPT_RETRY_MAX_DELAY: Duration = Duration::from_secs(2);

/// Pause before the next `accept` after `failures` consecutive failures.
fn accept_backoff(failures: u32) -> Duration {
    ACCEPT_RETRY_DELAY
        .saturating_mul(1 << failures.saturating_sub(1).min(6))
        .min(ACCEPT_RETRY_MAX_DELAY)
}

async fn serve(
    logger: &Arc<SessionOutputLogger>,
    listen: &str,
    oneshot: bool,
    tracer: Option<FileTracer>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("bind {listen}"))?;
    info!(target: "dap", "dap-tap listening on {}", listener.local_addr()?);

    // Sessions are served sequentially, the log file belongs to the latest one.
    let mut failures = 0u32;
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(v) => {
                failures = 0;
                v
            }
            Err(err) => {
                // e.g. EMFILE keeps failing until some descriptor is released
                failures = failures.saturating_add(1);
                let delay = accept_backoff(failures);
                warn!(target: "dap", "accept failed: {err:#}, retry in {delay:?}");
                tokio::time::sleep(delay).await;
                continue;
            }
        };
        info!(target: "dap", "adapter stream connected: {peer}");

        let session = Session::start(logger, tracer.clone()).await;
        if let Err(err) = session.record(BufReader::new(stream)).await {
            warn!(target: "dap", "session ended with error: {err:#}");
        }

        if oneshot {
            break;
        }
    }
    Ok(())
}

/// Run the adapter as a child process and sit between it and the client.
///
/// Return adapter exit code.
async fn proxy(
    logger: &Arc<SessionOutputLogger>,
    adapter: &[String],
    tracer: Option<FileTracer>,
) -> anyhow::Result<i32> {
    let (program, adapter_args) = adapter
        .split_first()
        .context("adapter command is empty")?;
    let mut child = tokio::process::Command::new(program)
        .args(adapter_args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("spawn debug adapter `{program}`"))?;
    info!(target: "dap", "debug adapter `{program}` started");

    let mut adapter_stdin = child.stdin.take().context("adapter stdin")?;
    let adapter_stdout = child.stdout.take().context("adapter stdout")?;

    let requests_tracer = tracer.clone();
    let requests = tokio::spawn(async move {
        let client = BufReader::new(tokio::io::stdin());
        if let Err(err) = forward_requests(client, &mut adapter_stdin, requests_tracer).await {
            warn!(target: "dap", "client stream: {err:#}");
        }
    });

    let session = Session::start(logger, tracer).await;
    let mut client = tokio::io::stdout();
    let relayed = session
        .relay(BufReader::new(adapter_stdout), &mut client)
        .await;
    requests.abort();

    let status = child.wait().await.context("wait for debug adapter")?;
    relayed.context("adapter stream")?;
    info!(target: "dap", "debug adapter exited: {status}");
    Ok(status.code().unwrap_or(1))
}
