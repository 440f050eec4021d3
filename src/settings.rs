//! Search limits for [`crate::pathfind::PathFinder`].

/// Bounds of one search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchSettings {
    /// Node expansions allowed before the search gives up, scaled by `depth_multiplier`.
    pub max_visited_nodes: usize,
    /// Nodes farther than this from the start aren't expanded, and no path may be longer.
    pub max_range: f32,
    /// Manhattan distance at which a target counts as reached.
    pub accuracy: i32,
    pub depth_multiplier: f32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettingsBuilder::new().build()
    }
}

/// Builder for [`SearchSettings`]. Invalid values panic.
#[derive(Clone, Copy, Debug)]
pub struct SearchSettingsBuilder {
    settings: SearchSettings,
}

impl Default for SearchSettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchSettingsBuilder {
    /// Visited node budget for each block of follow range.
    pub const NODES_PER_BLOCK: usize = 16;

    /// Settings for a follow range of 16 blocks.
    pub fn new() -> Self {
        SearchSettingsBuilder {
            settings: SearchSettings {
                max_visited_nodes: 16 * Self::NODES_PER_BLOCK,
                max_range: 16.0,
                accuracy: 0,
                depth_multiplier: 1.0,
            },
        }
    }

    /// Sets the range and derives the visited node budget from it.
    /// Must be positive.
    pub fn follow_range(mut self, range: f32) -> Self {
        if range <= 0.0 || !range.is_finite() {
            panic!("Follow range must be positive");
        }

        self.settings.max_range = range;
        self.settings.max_visited_nodes = (range * Self::NODES_PER_BLOCK as f32).floor() as usize;
        self
    }

    /// Overrides the visited node budget. Must be at least 1.
    pub fn max_visited_nodes(mut self, max_visited_nodes: usize) -> Self {
        if max_visited_nodes < 1 {
            panic!("Max visited nodes must be at least 1");
        }

        self.settings.max_visited_nodes = max_visited_nodes;
        self
    }

    /// Must not be negative.
    pub fn accuracy(mut self, accuracy: i32) -> Self {
        if accuracy < 0 {
            panic!("Accuracy can't be negative");
        }

        self.settings.accuracy = accuracy;
        self
    }

    /// Scales the visited node budget. Must be positive.
    pub fn depth_multiplier(mut self, depth_multiplier: f32) -> Self {
        if depth_multiplier <= 0.0 || !depth_multiplier.is_finite() {
            panic!("Depth multiplier must be positive");
        }

        self.settings.depth_multiplier = depth_multiplier;
        self
    }

    pub fn build(self) -> SearchSettings {
        self.settings
    }
}

impl SearchSettings {
    /// Expansion budget after applying the depth multiplier.
    pub fn visit_budget(&self) -> usize {
        (self.max_visited_nodes as f32 * self.depth_multiplier) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = SearchSettings::default();
        assert_eq!(settings.max_visited_nodes, 256);
        assert_eq!(settings.max_range, 16.0);
        assert_eq!(settings.visit_budget(), 256);
    }

    #[test]
    fn test_follow_range() {
        let settings = SearchSettingsBuilder::new()
            .follow_range(32.0)
            .depth_multiplier(0.5)
            .accuracy(1)
            .build();
        assert_eq!(settings.max_visited_nodes, 512);
        assert_eq!(settings.visit_budget(), 256);
        assert_eq!(settings.accuracy, 1);
    }

    #[test]
    #[should_panic(expected = "Follow range must be positive")]
    fn test_invalid_range() {
        SearchSettingsBuilder::new().follow_range(0.0);
    }

    #[test]
    #[should_panic(expected = "Max visited nodes must be at least 1")]
    fn test_invalid_budget() {
        SearchSettingsBuilder::new().max_visited_nodes(0);
    }
}
