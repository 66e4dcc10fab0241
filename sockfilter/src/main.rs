#![forbid(unsafe_code)]

use clap::Parser;
use sockfilter_lib::config::{load_from_path, validate};
use sockfilter_lib::telemetry::init_tracing;
use sockfilter_lib::{
    run, Config, InterfaceId, LinuxKernel, ProgramImage, Result, ShutdownSignal, SockFilterError,
};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Attach a compiled socket filter to a raw socket on a network interface"
)]
struct Cli {
    /// Network interface to monitor: a name such as `eth0`, or a numeric index.
    /// An all-digit value is matched against interface names first, then used as an index.
    #[arg(value_name = "IFACE")]
    iface: String,

    /// Path to configuration TOML file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Compiled BPF object to load (overrides `[program] path`)
    #[arg(long, value_name = "PATH", env = "SOCKFILTER_PROGRAM")]
    program: Option<PathBuf>,

    /// Socket filter program name inside the object (overrides `[program] name`)
    #[arg(long, value_name = "NAME", env = "SOCKFILTER_PROGRAM_NAME")]
    program_name: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let cfg = match load_config(&cli) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("sockfilter: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = init_tracing(&cfg.logging) {
        eprintln!("sockfilter: {err}");
        std::process::exit(1);
    }

    match attach_until_signal(&cli.iface, &cfg).await {
        Ok(()) => info!("clean shutdown"),
        Err(err) => {
            error!(%err, "sockfilter setup failed");
            std::process::exit(1);
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut cfg = match &cli.config {
        Some(path) => load_from_path(path)?,
        None => Config::default(),
    };
    cfg.apply_overrides(cli.program.clone(), cli.program_name.clone());
    validate(&cfg)?;
    Ok(cfg)
}

async fn attach_until_signal(iface: &str, cfg: &Config) -> Result<()> {
    let interface = InterfaceId::parse(iface)?;
    // Read lazily by `run`, after the interface resolves.
    let image = ProgramImage::from_path(&cfg.program.path, cfg.program.name.clone());
    info!(program = %cfg.program.path.display(), %interface, "starting sockfilter");

    let shutdown = ShutdownSignal::install().map_err(SockFilterError::Signal)?;
    run(&LinuxKernel, &interface, &image, shutdown.recv()).await
}
