use anyhow::{bail, Context, Result};
use rand::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufReader, Write};
use tracing::info;

use crate::common::Agent;
use crate::map::Map;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub agents: Vec<Agent>,
}

impl Scenario {
    pub fn load_from_yaml(path: &str) -> Result<Scenario> {
        let file = File::open(path).with_context(|| format!("failed to open scenario {path}"))?;
        let reader = BufReader::new(file);
        let agents: Vec<Agent> = serde_yaml::from_reader(reader)
            .with_context(|| format!("failed to parse scenario {path}"))?;
        Ok(Scenario { agents })
    }

    pub fn from_yaml_str(content: &str) -> Result<Scenario> {
        let agents: Vec<Agent> = serde_yaml::from_str(content)?;
        Ok(Scenario { agents })
    }

    /// Picks distinct starts and distinct goals on open cells, each goal
    /// reachable from its own start.
    pub fn generate_agents_randomly<R: Rng + ?Sized>(
        map: &Map,
        num_agents: usize,
        rng: &mut R,
    ) -> Result<Scenario> {
        let mut starts = map.passable_cells();
        if starts.len() < num_agents {
            bail!(
                "map has {} open cells, not enough for {num_agents} agents",
                starts.len()
            );
        }
        starts.shuffle(rng);

        let mut used_goals = HashSet::new();
        let mut agents = Vec::with_capacity(num_agents);
        for (id, &start) in starts.iter().take(num_agents).enumerate() {
            let mut candidates: Vec<_> = map
                .passable_cells()
                .into_iter()
                .filter(|goal| !used_goals.contains(goal) && map.reachable(start, *goal))
                .collect();
            candidates.shuffle(rng);

            let Some(&goal) = candidates.first() else {
                bail!("no free goal reachable from {start:?} for agent {id}");
            };
            used_goals.insert(goal);
            agents.push(Agent::new(id, start, goal));
        }

        info!("Generate scen: {agents:?}");
        Ok(Scenario { agents })
    }

    pub fn validate(&self, map: &Map) -> Result<()> {
        let mut ids = HashSet::new();
        let mut starts = HashSet::new();
        let mut goals = HashSet::new();

        for agent in &self.agents {
            if !agent.verify(map) {
                bail!("agent {} has a start or goal off the open map", agent.id);
            }
            if !ids.insert(agent.id) {
                bail!("duplicate agent id {}", agent.id);
            }
            if !starts.insert(agent.start) {
                bail!("agents share start {:?}", agent.start);
            }
            if !goals.insert(agent.goal) {
                bail!("agents share goal {:?}", agent.goal);
            }
        }
        Ok(())
    }

    pub fn write_agents_to_yaml(&self, path: &str) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = io::BufWriter::new(file);
        let yaml_data = serde_yaml::to_string(&self.agents)?;
        writer.write_all(yaml_data.as_bytes())?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_read_scenario() {
        let scenario = Scenario::load_from_yaml("map_file/test/small.yaml").unwrap();
        let answer = [
            Agent::new(0, (0, 0), (5, 3)),
            Agent::new(1, (5, 0), (0, 3)),
            Agent::new(2, (0, 2), (4, 0)),
        ];
        assert_eq!(scenario.agents, answer);

        let map = Map::from_file("map_file/test/small.map").unwrap();
        assert!(scenario.validate(&map).is_ok());
    }

    #[test]
    fn test_validate_rejects_shared_goal() {
        let map = Map::open(3, 3);
        let scenario = Scenario::from_yaml_str(
            "- {id: 0, start: [0, 0], goal: [2, 2]}\n- {id: 1, start: [1, 0], goal: [2, 2]}\n",
        )
        .unwrap();
        assert!(scenario.validate(&map).is_err());
    }

    #[test]
    fn test_random_agents_respect_walls() {
        let map = Map::from_file("map_file/test/test.map").unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let scenario = Scenario::generate_agents_randomly(&map, 4, &mut rng).unwrap();

        assert_eq!(scenario.agents.len(), 4);
        assert!(scenario.validate(&map).is_ok());
        for agent in &scenario.agents {
            assert!(map.reachable(agent.start, agent.goal));
        }
    }

    #[test]
    fn test_write_agents_to_yaml() {
        let scenario = Scenario {
            agents: vec![Agent::new(0, (1, 2), (3, 0)), Agent::new(1, (0, 0), (2, 2))],
        };
        let path = std::env::temp_dir().join("od_mapf_agents.yaml");
        let path = path.to_str().unwrap();
        scenario.write_agents_to_yaml(path).unwrap();
        assert_eq!(Scenario::load_from_yaml(path).unwrap(), scenario);
    }

    #[test]
    fn test_random_agents_need_room() {
        let map = Map::open(2, 1);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(Scenario::generate_agents_randomly(&map, 3, &mut rng).is_err());
    }
}
