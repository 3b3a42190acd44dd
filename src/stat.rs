use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub steps: usize,
    pub expanded_nodes: usize,
    pub max_open_size: usize,
    pub time_us: u64,
}

impl Stats {
    pub fn print(&self) {
        info!(
            "Steps {:?} Time(microseconds) {:?} Expanded nodes number: {:?} Max open list size {:?}",
            self.steps, self.time_us, self.expanded_nodes, self.max_open_size
        );
    }
}
