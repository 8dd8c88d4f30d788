use clap::{Arg, Command};
use std::process;
use tcg_catalog_rs::collector::QuerySpec;
use tcg_catalog_rs::config::PipelineConfig;
use tcg_catalog_rs::driver::Driver;

/// The fixed list of marketplace search queries the Collector issues every
/// run. Keyword choice mirrors the card families exercised in this crate's
/// own end-to-end tests; operators wanting different coverage edit this
/// list and rebuild.
fn default_queries() -> Vec<QuerySpec> {
    [
        ("pikachu v", false),
        ("pikachu v", true),
        ("charizard ex", false),
        ("charizard ex", true),
        ("meloetta", false),
        ("mew", false),
        ("mew", true),
    ]
    .into_iter()
    .map(|(keyword, graded_only)| QuerySpec {
        keyword: keyword.to_string(),
        graded_only,
    })
    .collect()
}

#[derive(Debug, Clone)]
struct CliOverrides {
    properties_path: Option<String>,
    strict_catalog: bool,
    skip_catalog: bool,
}

fn parse_args() -> CliOverrides {
    let matches = Command::new("tcg-catalog")
        .version("0.1.0")
        .about("Builds the unified trading-card catalog and aggregates sold-listing prices")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("Path to a properties-file config override")
                .value_name("PATH")
                .num_args(1),
        )
        .arg(
            Arg::new("strict-catalog")
                .long("strict-catalog")
                .help("Fail the run if the built catalog fails validation")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("skip-catalog")
                .long("skip-catalog")
                .help("Reuse the persisted catalog instead of rebuilding it")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    CliOverrides {
        properties_path: matches.get_one::<String>("config").cloned(),
        strict_catalog: matches.get_flag("strict-catalog"),
        skip_catalog: matches.get_flag("skip-catalog"),
    }
}

fn load_config(overrides: &CliOverrides) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    let properties_path = overrides
        .properties_path
        .clone()
        .map(std::path::PathBuf::from)
        .unwrap_or_else(PipelineConfig::default_properties_path);

    let mut config = PipelineConfig::load(&properties_path)?;
    if overrides.strict_catalog {
        config.strict_catalog = true;
    }
    if overrides.skip_catalog {
        config.skip_catalog = true;
    }
    Ok(config)
}

async fn dispatcher(config: PipelineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let driver = Driver::new(config, default_queries());
    driver.run(chrono::Utc::now()).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let overrides = parse_args();
    let config = match load_config(&overrides) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("could not load configuration: {error}");
            process::exit(1);
        }
    };

    log::info!("starting catalog/price pipeline run");

    match dispatcher(config).await {
        Ok(()) => {
            log::info!("run finished successfully");
        }
        Err(error) => {
            eprintln!("run failed: {error}");
            process::exit(1);
        }
    }
}
