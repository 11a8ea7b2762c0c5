use od_mapf::config::{Cli, Config};
use od_mapf::map::Map;
use od_mapf::scenario::Scenario;
use od_mapf::search::{OdSearch, SearchStatus};
use od_mapf::world::WorldState;

use anyhow::Context;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    let cli = Cli::parse();

    let config = if let Some(config_file) = cli.config.as_ref() {
        let config_str = std::fs::read_to_string(config_file)?;
        Config::from_yaml_str(&config_str)
            .with_context(|| format!("error with config file: {config_file}"))?
    } else {
        info!("No config file specified, using default config");
        Config::default()
    }
    .override_from_command_line(&cli)?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let map = match &config.map_path {
        Some(path) => Map::from_file(path)?,
        None => Map::random_connected(
            config.width,
            config.height,
            config.obstacle_probability,
            &mut rng,
        ),
    };
    let scenario = match &config.scenario_path {
        Some(path) => Scenario::load_from_yaml(path)?,
        None => Scenario::generate_agents_randomly(&map, config.num_agents, &mut rng)?,
    };
    scenario.validate(&map)?;
    info!("Map:\n{map}");

    let root = WorldState::new(&map, &scenario.agents).context("invalid initial world")?;
    info!("Initial state:\n{root}");

    let mut search = OdSearch::new(root, config.search_options());
    let status = search
        .run()
        .context("search stopped on a broken grid invariant")?;
    search.stats().print();

    match status {
        SearchStatus::GoalFound(goal) => {
            info!("GOAL FOUND");
            if config.show_steps {
                for state in search.timesteps(goal) {
                    println!("\n{state}");
                }
            }

            info!("total steps: {}", search.state(goal).steps_so_far());

            if let Some(solution) = search.solution()? {
                if !solution.verify(&map, &scenario.agents) {
                    error!("solution failed verification");
                }
                if let Some(path) = &config.output_path {
                    let json = serde_json::to_string_pretty(&solution)?;
                    std::fs::write(path, json)
                        .with_context(|| format!("failed to write solution to {path}"))?;
                    info!("solution written to {path}");
                }
            }
        }
        SearchStatus::Exhausted => info!("GOAL NOT FOUND: search space exhausted"),
        SearchStatus::LimitReached => warn!(
            "GOAL NOT FOUND: expansion limit {:?} reached",
            config.max_expansions
        ),
        SearchStatus::NotStarted | SearchStatus::Searching => unreachable!(),
    }

    Ok(())
}
