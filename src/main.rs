use clap::{Arg, ArgAction, Command};
use colored::*;
use std::path::Path;
use std::process;
use tokio_util::sync::CancellationToken;

use devscope::{
    config::{ConfigFile, ServerConfig},
    output::{render_snapshot, OutputFormat},
    server,
    utils::Logger,
    PortSpec, ScanConfig, ScanEngine,
};

fn build_cli() -> Command {
    Command::new("devscope")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Discover local development servers and stream them to a dashboard")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Load configuration from a TOML file (default: ~/.devscope.toml)"),
        )
        .arg(
            Arg::new("ports")
                .short('p')
                .long("ports")
                .value_name("PORTS")
                .help("Ports to watch, e.g. 3000-3010,4200,5173-5176"),
        )
        .arg(
            Arg::new("bind")
                .short('b')
                .long("bind")
                .value_name("ADDR")
                .help("Address the dashboard server listens on"),
        )
        .arg(
            Arg::new("interval")
                .long("interval")
                .value_name("MS")
                .help("Milliseconds between scans while observers are connected")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("scan-host")
                .long("scan-host")
                .value_name("HOST")
                .help("Host to probe, e.g. host.docker.internal when running in a container"),
        )
        .arg(
            Arg::new("once")
                .long("once")
                .help("Run a single scan, print it and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("With --once, print JSON instead of a table")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue),
        )
}

fn load_config(path: Option<&String>) -> anyhow::Result<ConfigFile> {
    match path {
        Some(path) => Ok(ConfigFile::from_toml_file(Path::new(path))?),
        None => Ok(ConfigFile::load_default()),
    }
}

fn apply_overrides(matches: &clap::ArgMatches, mut file: ConfigFile) -> (ScanConfig, ServerConfig) {
    if let Some(ports) = matches.get_one::<String>("ports") {
        file.scan.ports = PortSpec::parse_list(ports);
    }
    if let Some(&interval) = matches.get_one::<u64>("interval") {
        file.scan.scan_interval = interval;
    }
    if let Some(host) = matches.get_one::<String>("scan-host") {
        file.scan.scan_host = host.clone();
    }
    if let Some(bind) = matches.get_one::<String>("bind") {
        file.server.bind_address = bind.clone();
    }
    (file.scan, file.server)
}

async fn run(matches: clap::ArgMatches) -> anyhow::Result<()> {
    let file = load_config(matches.get_one::<String>("config"))?;
    let (scan_config, server_config) = apply_overrides(&matches, file);
    scan_config.validate()?;

    if matches.get_flag("once") {
        let format = if matches.get_flag("json") {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        };

        let engine = ScanEngine::new(scan_config)?;
        let snapshot = engine.run_scan().await;
        println!("{}", render_snapshot(&snapshot, format)?);
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("Shutting down");
                shutdown.cancel();
            }
        });
    }

    server::serve(scan_config, server_config, shutdown).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();

    let level = if matches.get_flag("verbose") {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    Logger::init(level);

    if let Err(e) = run(matches).await {
        eprintln!("{} {}", "[!]".bright_red(), e);
        process::exit(1);
    }
}
