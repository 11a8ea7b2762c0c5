use anyhow::anyhow;
use clap::Parser;
use serde::Deserialize;

use crate::search::SearchOptions;
use crate::world::CollisionRule;

#[derive(Parser, Debug)]
#[command(
    name = "OD MAPF",
    about = "Operator Decomposition search for cooperative multi-agent pathfinding.",
    version = "0.1"
)]
pub struct Cli {
    #[arg(long, help = "Path to a YAML config file")]
    pub config: Option<String>,

    #[arg(long, help = "Path to a MovingAI .map file; a random map is generated otherwise")]
    pub map_path: Option<String>,

    #[arg(long, help = "Width of the random map")]
    pub width: Option<usize>,

    #[arg(long, help = "Height of the random map")]
    pub height: Option<usize>,

    #[arg(long, help = "Obstacle probability of the random map")]
    pub obstacle_probability: Option<f64>,

    #[arg(long, help = "Path to a YAML agent list; random agents are generated otherwise")]
    pub scenario_path: Option<String>,

    #[arg(long, help = "Number of random agents")]
    pub num_agents: Option<usize>,

    #[arg(long, help = "Seed for the random number generator")]
    pub seed: Option<u64>,

    #[arg(long, value_enum, help = "Which simultaneous moves count as collisions")]
    pub collision_rule: Option<CollisionRule>,

    #[arg(
        long,
        help = "Always expand fully-assigned states instead of checking the closed set",
        default_value_t = false
    )]
    pub no_commit_dedup: bool,

    #[arg(long, help = "Give up after this many expansions")]
    pub max_expansions: Option<usize>,

    #[arg(long, help = "Write the solution as JSON to this path")]
    pub output_path: Option<String>,

    #[arg(long, help = "Print every committed timestep", default_value_t = false)]
    pub show_steps: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub map_path: Option<String>,
    pub width: usize,
    pub height: usize,
    pub obstacle_probability: f64,
    pub scenario_path: Option<String>,
    pub num_agents: usize,
    pub seed: u64,
    pub collision_rule: CollisionRule,
    pub dedup_commit_states: bool,
    pub max_expansions: Option<usize>,
    pub output_path: Option<String>,
    pub show_steps: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            map_path: None,
            width: 8,
            height: 8,
            obstacle_probability: 0.2,
            scenario_path: None,
            num_agents: 3,
            seed: 0,
            collision_rule: CollisionRule::SwapOnly,
            dedup_commit_states: true,
            max_expansions: Some(500_000),
            output_path: None,
            show_steps: false,
        }
    }
}

impl Config {
    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn override_from_command_line(mut self, cli: &Cli) -> anyhow::Result<Self> {
        if let Some(map_path) = &cli.map_path {
            self.map_path = Some(map_path.clone());
        }
        if let Some(width) = cli.width {
            self.width = width;
        }
        if let Some(height) = cli.height {
            self.height = height;
        }
        if let Some(probability) = cli.obstacle_probability {
            self.obstacle_probability = probability;
        }
        if let Some(scenario_path) = &cli.scenario_path {
            self.scenario_path = Some(scenario_path.clone());
        }
        if let Some(num_agents) = cli.num_agents {
            self.num_agents = num_agents;
        }
        if let Some(seed) = cli.seed {
            self.seed = seed;
        }
        if let Some(rule) = cli.collision_rule {
            self.collision_rule = rule;
        }
        if cli.no_commit_dedup {
            self.dedup_commit_states = false;
        }
        if let Some(limit) = cli.max_expansions {
            self.max_expansions = Some(limit);
        }
        if let Some(output_path) = &cli.output_path {
            self.output_path = Some(output_path.clone());
        }
        if cli.show_steps {
            self.show_steps = true;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..1.0).contains(&self.obstacle_probability) {
            return Err(anyhow!(
                "Obstacle probability must be in [0, 1), got {}",
                self.obstacle_probability
            ));
        }
        if self.map_path.is_none() && (self.width == 0 || self.height == 0) {
            return Err(anyhow!(
                "Random map needs a positive size, got {}x{}",
                self.width,
                self.height
            ));
        }
        if self.scenario_path.is_none() && self.num_agents == 0 {
            return Err(anyhow!("Number of agents must be positive"));
        }
        if self.max_expansions == Some(0) {
            return Err(anyhow!("Expansion limit must be positive"));
        }
        Ok(())
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            collision_rule: self.collision_rule,
            dedup_commit_states: self.dedup_commit_states,
            max_expansions: self.max_expansions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_fills_defaults() {
        let config = Config::from_yaml_str(
            "map_path: map_file/test/small.map\ncollision_rule: no-crossing\nmax_expansions: 10\n",
        )
        .unwrap();
        assert_eq!(config.map_path.as_deref(), Some("map_file/test/small.map"));
        assert_eq!(config.collision_rule, CollisionRule::NoCrossing);
        assert_eq!(config.max_expansions, Some(10));
        assert_eq!(config.num_agents, 3);
        assert!(config.dedup_commit_states);
    }

    #[test]
    fn test_command_line_wins() {
        let cli = Cli::parse_from([
            "od_mapf",
            "--num-agents",
            "5",
            "--seed",
            "9",
            "--collision-rule",
            "no-crossing",
            "--no-commit-dedup",
        ]);
        let config = Config::default().override_from_command_line(&cli).unwrap();
        assert_eq!(config.num_agents, 5);
        assert_eq!(config.seed, 9);
        assert_eq!(config.collision_rule, CollisionRule::NoCrossing);
        assert!(!config.search_options().dedup_commit_states);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = Config {
            obstacle_probability: 1.0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            max_expansions: Some(0),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let cli = Cli::parse_from(["od_mapf", "--width", "0"]);
        assert!(Config::default().override_from_command_line(&cli).is_err());
    }
}
