use crate::ContainerSnapshot;

const PLAYERS_ONLINE_MARKER: &str = "players online:";

/// Extract player names from the server console's `list` output.
///
/// Expects a line of the form `There are 2 of a max of 20 players online: alex, steve`.
/// A missing marker, an empty list, or a literal `0` all mean nobody is online.
pub fn parse_player_list(output: &str) -> Vec<String> {
    let Some(start) = output.find(PLAYERS_ONLINE_MARKER) else {
        return Vec::new();
    };

    let rest = &output[start + PLAYERS_ONLINE_MARKER.len()..];
    let line = rest.lines().next().unwrap_or("").trim();
    if line.is_empty() || line == "0" {
        return Vec::new();
    }

    line.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Fleet-wide counters for presence displays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FleetSummary {
    pub running: usize,
    pub occupancy: u32,
}

impl FleetSummary {
    pub fn from_snapshots<'a>(snapshots: impl IntoIterator<Item = &'a ContainerSnapshot>) -> Self {
        snapshots
            .into_iter()
            .filter(|s| s.is_running())
            .fold(Self::default(), |acc, s| Self {
                running: acc.running + 1,
                occupancy: acc.occupancy.saturating_add(s.occupancy()),
            })
    }

    pub fn is_idle(&self) -> bool {
        self.running == 0
    }

    pub fn headline(&self) -> String {
        if self.occupancy > 0 {
            format!("{} playing", self.occupancy)
        } else if self.running > 0 {
            format!("0 playing | {} servers running", self.running)
        } else {
            "idle".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ContainerStatus;

    #[test]
    fn test_parse_names() {
        let output = "There are 2 of a max of 20 players online: alex, steve\n";
        assert_eq!(parse_player_list(output), vec!["alex", "steve"]);
    }

    #[test]
    fn test_parse_empty_list() {
        assert!(parse_player_list("There are 0 of a max of 20 players online: ").is_empty());
        assert!(parse_player_list("players online: 0").is_empty());
    }

    #[test]
    fn test_parse_without_marker() {
        assert!(parse_player_list("Unknown command").is_empty());
        assert!(parse_player_list("").is_empty());
    }

    #[test]
    fn test_parse_ignores_following_lines() {
        let output = "players online: alex\nsome trailing log line";
        assert_eq!(parse_player_list(output), vec!["alex"]);
    }

    #[test]
    fn test_summary_counts_running_only() {
        let snapshots = vec![
            ContainerSnapshot::new("a", "1", ContainerStatus::Running, "", 3),
            ContainerSnapshot::new("b", "2", ContainerStatus::Running, "", 0),
            ContainerSnapshot::new("c", "3", ContainerStatus::Stopped, "", 0),
            ContainerSnapshot::new("d", "4", ContainerStatus::Starting, "starting", 0),
        ];
        let summary = FleetSummary::from_snapshots(&snapshots);
        assert_eq!(summary.running, 2);
        assert_eq!(summary.occupancy, 3);
        assert_eq!(summary.headline(), "3 playing");
    }

    #[test]
    fn test_summary_occupancy_saturates() {
        let snapshots = vec![
            ContainerSnapshot::new("a", "1", ContainerStatus::Running, "", u32::MAX),
            ContainerSnapshot::new("b", "2", ContainerStatus::Running, "", u32::MAX - 1),
        ];
        let summary = FleetSummary::from_snapshots(&snapshots);
        assert_eq!(summary.running, 2);
        assert_eq!(summary.occupancy, u32::MAX);
    }

    #[test]
    fn test_summary_headlines() {
        let running = FleetSummary {
            running: 2,
            occupancy: 0,
        };
        assert_eq!(running.headline(), "0 playing | 2 servers running");

        let idle = FleetSummary::default();
        assert!(idle.is_idle());
        assert_eq!(idle.headline(), "idle");
    }
}
