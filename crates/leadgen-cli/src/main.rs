use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;
use std::sync::Arc;

use leadgen_classifiers::config::ModelType;
use leadgen_classifiers::data_handling::{DatasetVariant, LeadRecord};
use leadgen_cli::config::ServiceConfig;
use leadgen_cli::scoring::gateway::ScoringGateway;
use leadgen_cli::scoring::registry::{ModelRegistry, ModelSlot};
use leadgen_cli::server;

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("LEADGEN_LOG", "error,leadgen=info"))
        .init();

    let config_arg = Arg::new("config")
        .short('c')
        .long("config")
        .help("Path to a JSON service configuration file")
        .value_parser(clap::value_parser!(PathBuf))
        .value_hint(ValueHint::FilePath);

    let data_dir_arg = Arg::new("data_dir")
        .short('d')
        .long("data-dir")
        .help("Directory holding datasets and model artifacts. Overrides the configuration file.")
        .value_parser(clap::value_parser!(PathBuf))
        .value_hint(ValueHint::DirPath);

    let matches = Command::new("leadgen")
        .version(clap::crate_version!())
        .about("LeadGenius lead scoring service")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("serve")
                .about("Run the HTTP scoring API")
                .arg(config_arg.clone())
                .arg(data_dir_arg.clone())
                .arg(
                    Arg::new("port")
                        .short('p')
                        .long("port")
                        .help("Port to listen on. Overrides the configuration file and PORT.")
                        .value_parser(clap::value_parser!(u16)),
                ),
        )
        .subcommand(
            Command::new("train")
                .about("Train a model and print its evaluation metrics")
                .arg(config_arg.clone())
                .arg(data_dir_arg.clone())
                .arg(
                    Arg::new("dataset")
                        .long("dataset")
                        .help("Dataset variant to train on")
                        .value_parser(["bank", "lead_scoring"])
                        .default_value("bank"),
                )
                .arg(
                    Arg::new("model")
                        .short('m')
                        .long("model")
                        .help("Model family to train")
                        .value_parser(["random_forest", "transformer"])
                        .default_value("random_forest"),
                ),
        )
        .subcommand(
            Command::new("score")
                .about("Score a single lead given as a JSON object")
                .arg(
                    Arg::new("lead")
                        .help("Path to a JSON file holding the lead record")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(config_arg.clone())
                .arg(data_dir_arg.clone()),
        )
        .subcommand(
            Command::new("init")
                .about("Load or train every model so the service starts warm")
                .arg(config_arg)
                .arg(data_dir_arg),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("serve", sub_m)) => handle_serve(sub_m),
        Some(("train", sub_m)) => handle_train(sub_m),
        Some(("score", sub_m)) => handle_score(sub_m),
        Some(("init", sub_m)) => handle_init(sub_m),
        _ => unreachable!(),
    }
}

fn load_config(matches: &ArgMatches) -> Result<ServiceConfig> {
    let mut config = ServiceConfig::load(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
    if let Some(data_dir) = matches.get_one::<PathBuf>("data_dir") {
        config.data_dir = data_dir.clone();
    }
    log::debug!("Service configuration: {:?}", config);
    Ok(config)
}

fn registry_for(config: &ServiceConfig) -> Arc<ModelRegistry> {
    Arc::new(ModelRegistry::new(
        config.store(),
        config.forest.clone(),
        config.attention.clone(),
    ))
}

fn handle_serve(matches: &ArgMatches) -> Result<()> {
    let mut config = load_config(matches)?;
    if let Some(port) = matches.get_one::<u16>("port") {
        config.port = *port;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(server::serve(config))
}

fn handle_train(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    let variant = matches
        .get_one::<String>("dataset")
        .map(|s| DatasetVariant::from_selector(s))
        .unwrap_or(DatasetVariant::Bank);
    let model = matches
        .get_one::<String>("model")
        .map(|s| ModelType::from_selector(s))
        .unwrap_or_default();
    let slot = ModelSlot::for_request(variant, model);

    log::info!("Training {} from {}", slot, config.data_dir.display());
    let metrics = registry_for(&config).retrain(slot)?;
    println!("{}", serde_json::to_string_pretty(&metrics)?);
    Ok(())
}

fn handle_score(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    let lead_path: &PathBuf = matches
        .get_one("lead")
        .context("A lead file is required")?;
    let contents = std::fs::read_to_string(lead_path)
        .with_context(|| format!("Failed to read lead file: {}", lead_path.display()))?;
    let lead: LeadRecord = serde_json::from_str(&contents)
        .with_context(|| format!("Lead file is not a JSON object: {}", lead_path.display()))?;

    let gateway = ScoringGateway::new(registry_for(&config));
    let result = gateway.score(lead);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn handle_init(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    let registry = registry_for(&config);
    let outcomes = registry.warm_up();
    let total = outcomes.len();
    let mut failures = 0;
    for (slot, outcome) in outcomes {
        match outcome {
            Ok(()) => log::info!("{} ready", slot),
            Err(e) => {
                failures += 1;
                log::error!("{} unavailable: {:#}", slot, e);
            }
        }
    }
    if failures > 0 {
        log::warn!("{} of {} models could not be initialized", failures, total);
    }
    Ok(())
}
