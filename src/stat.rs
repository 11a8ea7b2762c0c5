use tracing::info;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stats {
    pub costs: usize,
    pub time_us: usize,
    pub expanded_nodes: usize,
    pub generated_nodes: usize,
    pub duplicates_skipped: usize,
    pub hash_collisions: usize,
    pub max_frontier: usize,
}

impl Stats {
    pub fn print(&self) {
        info!(
            "Cost {:?} Time(microseconds) {:?} Expanded nodes: {:?} Generated nodes: {:?} Duplicates skipped: {:?} Hash collisions: {:?} Peak frontier: {:?}",
            self.costs,
            self.time_us,
            self.expanded_nodes,
            self.generated_nodes,
            self.duplicates_skipped,
            self.hash_collisions,
            self.max_frontier
        );
    }
}
