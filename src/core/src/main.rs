use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use tarpit_watch::configuration::config::Config;
use tarpit_watch::container_management::labeler::StaticLabeler;
use tarpit_watch::controller::controller_handler::Controller;
use tarpit_watch::error_handling::types::ControllerError;
use tarpit_watch::network::conntrack_source::ConntrackSource;
use tarpit_watch::network::port_source::StaticPortSource;
use tarpit_watch::storage::file_storage::FileStorage;

#[derive(Parser)]
#[command(name = "tarpit-watch")]
#[command(version)]
#[command(about = "Tracks inbound TCP sessions on honeypot ports and keeps a history of the longest ones")]
struct Args {
    /// TOML configuration file; all defaults when omitted
    #[arg(env = "TARPIT_WATCH_CONFIG")]
    config_file: Option<PathBuf>,
}

fn build_controller(config: Config) -> Result<Controller, ControllerError> {
    let storage = FileStorage::from_config(&config.storage)?;
    let labeler = StaticLabeler::from_mappings(&config.containers);
    let ports = StaticPortSource::from_spec(config.watch_ports.as_deref());
    Controller::new(config, Box::new(storage), Box::new(labeler), Box::new(ports))
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .init();

    let args = Args::parse();

    let config = match &args.config_file {
        Some(path) => {
            info!("Importing configuration from {}", path.display());
            Config::from_file(path).unwrap_or_else(|e| {
                error!("Unable to import configuration from file: {}", e);
                std::process::exit(1);
            })
        }
        None => {
            info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    let mut source = ConntrackSource::new(config.conntrack.program.clone(), config.conntrack_timeout());

    let mut controller = build_controller(config).unwrap_or_else(|e| {
        error!("Unable to create a controller instance: {}, exiting...", e);
        std::process::exit(1);
    });

    let result = tokio::spawn(async move {
        info!("Spawning the controller");
        if let Err(e) = controller.run(&mut source).await {
            error!("Error occured in the controller process: {}, exiting...", e);
            std::process::exit(1);
        }
    });

    if let Err(e) = result.await {
        error!("Error joining at the end of execution: {}", e);
        std::process::exit(1);
    }
}
