//! Policy for live instances found by `start`.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// What `start` does when a live instance of a service is already present.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RunningPolicy {
    /// Stop the live instance and launch a fresh one.
    #[default]
    Replace,
    /// Leave a ready instance alone and report it as already running.
    Keep,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_policies() {
        assert_eq!("keep".parse::<RunningPolicy>().ok(), Some(RunningPolicy::Keep));
        assert_eq!(
            "Replace".parse::<RunningPolicy>().ok(),
            Some(RunningPolicy::Replace)
        );
        assert!("restart".parse::<RunningPolicy>().is_err());
    }
}
