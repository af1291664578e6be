use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Quantity the player wants per action click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Increment {
    Fixed(u64),
    Max,
}

/// The increment ladder walked by [`Increment::next`].
pub const INCREMENT_LADDER: [Increment; 6] = [
    Increment::Fixed(1),
    Increment::Fixed(5),
    Increment::Fixed(10),
    Increment::Fixed(25),
    Increment::Fixed(100),
    Increment::Max,
];

impl Default for Increment {
    fn default() -> Self {
        Increment::Fixed(1)
    }
}

impl Increment {
    /// The next rung of the ladder, wrapping from `Max` back to 1. An
    /// off-ladder fixed value moves to the first rung above it.
    pub fn next(self) -> Self {
        match self {
            Increment::Max => INCREMENT_LADDER[0],
            Increment::Fixed(n) => INCREMENT_LADDER
                .iter()
                .copied()
                .find(|rung| match rung {
                    Increment::Fixed(m) => *m > n,
                    Increment::Max => true,
                })
                .unwrap_or(Increment::Max),
        }
    }
}

/// Player-facing configuration, persisted with the save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndustryConfigs {
    #[serde(default)]
    pub increment: Increment,
    /// Resource box expansion state, keyed by resource name.
    #[serde(default)]
    pub expanded: BTreeMap<String, bool>,
}

/// Host settings. Not persisted with the save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndustrySettings {
    /// Run a catch-up tick for time spent away when restoring a save.
    pub offline_progress: bool,
    /// Upper bound on simulated offline time.
    pub max_offline: Duration,
}

impl Default for IndustrySettings {
    fn default() -> Self {
        Self {
            offline_progress: true,
            max_offline: Duration::from_secs(24 * 60 * 60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladder_cycles() {
        let mut inc = Increment::default();
        let mut seen = vec![inc];
        for _ in 0..6 {
            inc = inc.next();
            seen.push(inc);
        }
        assert_eq!(
            seen,
            vec![
                Increment::Fixed(1),
                Increment::Fixed(5),
                Increment::Fixed(10),
                Increment::Fixed(25),
                Increment::Fixed(100),
                Increment::Max,
                Increment::Fixed(1),
            ]
        );
    }

    #[test]
    fn off_ladder_value_moves_up() {
        assert_eq!(Increment::Fixed(7).next(), Increment::Fixed(10));
        assert_eq!(Increment::Fixed(500).next(), Increment::Max);
        assert_eq!(Increment::Fixed(0).next(), Increment::Fixed(1));
    }

    #[test]
    fn default_settings() {
        let settings = IndustrySettings::default();
        assert!(settings.offline_progress);
        assert_eq!(settings.max_offline, Duration::from_secs(86_400));
    }
}
