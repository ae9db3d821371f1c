use std::path::PathBuf;

use clap::Parser;
use latency_guard::{
    config::Config,
    logging,
    monitor::{IntervalTicker, Monitor},
    monitors::{PingProber, ScriptRemediator, SystemStats},
    registry::JsonFileStore,
    util::get_log_level,
};
use tracing::{info, trace};

#[derive(Debug, Clone, Parser)]
#[command(about = "Periodic latency and throughput monitor")]
struct Args {
    /// Config file (LatencyThreshold, CheckInterval, ...)
    #[arg(short, long, default_value = "Config/config.json")]
    config: PathBuf,

    /// Server registry, rewritten after every cycle
    #[arg(short, long, default_value = "Config/servers.json")]
    servers: PathBuf,

    /// Also append log lines to this file
    #[arg(short, long)]
    log_file: Option<PathBuf>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

fn init(args: &Args) -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init(get_log_level(), args.log_file.as_deref())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init(&args)?;
    trace!("started with args: {args:?}");

    let config = Config::load_or_default(&args.config);
    let interval = config.interval();
    let prober = PingProber::new(config.probe_count, config.probe_timeout());
    let remediator = ScriptRemediator::new(&config.remediation_script);

    let mut monitor = Monitor::start(
        config,
        Box::new(JsonFileStore::new(&args.servers)),
        Box::new(prober),
        Box::new(SystemStats::new()),
        Box::new(remediator),
    )
    .await;

    if args.once {
        monitor.run_cycle().await;
        return Ok(());
    }

    let mut ticker = IntervalTicker::new(interval);
    tokio::select! {
        _ = monitor.run(&mut ticker) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("received interrupt, stopping network monitor");
        }
    }

    Ok(())
}
