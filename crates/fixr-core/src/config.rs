//! Run parameters for the negotiation arena.
//!
//! The defaults reproduce the shipped animation: 12 agents, 55 rounds spread
//! over 100 seconds, a cap of 50 offers, and a 3 second pause on the final
//! reveal before the result is handed over.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ArenaError, Result};
use crate::model::AGENT_NAMES;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ArenaConfig {
    /// Number of agents entering the arena (at most one per roster name).
    pub agent_count: usize,
    pub total_rounds: u32,
    /// Wall-clock budget for all rounds; each round waits `total / rounds`.
    pub total_duration_ms: u64,
    /// Cumulative per-agent offers after which no further round starts.
    pub max_offers: u32,
    pub min_agents_per_round: usize,
    pub max_agents_per_round: usize,
    /// Pause between the final block and the completed result.
    pub reveal_delay_ms: u64,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            agent_count: AGENT_NAMES.len(),
            total_rounds: 55,
            total_duration_ms: 100_000,
            max_offers: 50,
            min_agents_per_round: 3,
            max_agents_per_round: 5,
            reveal_delay_ms: 3_000,
        }
    }
}

impl ArenaConfig {
    /// Parse a JSON config. Missing keys fall back to the defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.agent_count == 0 || self.agent_count > AGENT_NAMES.len() {
            return Err(ArenaError::InvalidInput(format!(
                "agent count must be between 1 and {}, got {}",
                AGENT_NAMES.len(),
                self.agent_count
            )));
        }
        if self.total_rounds == 0 {
            return Err(ArenaError::InvalidInput(
                "total rounds must be positive".into(),
            ));
        }
        if self.max_offers == 0 {
            return Err(ArenaError::InvalidInput(
                "offer cap must be positive".into(),
            ));
        }
        if self.min_agents_per_round == 0 || self.min_agents_per_round > self.max_agents_per_round
        {
            return Err(ArenaError::InvalidInput(format!(
                "agents per round must satisfy 1 <= min <= max, got {}..={}",
                self.min_agents_per_round, self.max_agents_per_round
            )));
        }
        Ok(())
    }

    /// Suspension between two rounds (≈1818 ms with the defaults).
    pub fn round_delay(&self) -> Duration {
        Duration::from_millis(self.total_duration_ms) / self.total_rounds.max(1)
    }

    pub fn reveal_delay(&self) -> Duration {
        Duration::from_millis(self.reveal_delay_ms)
    }

    /// Same run shape with every delay divided by `speed`.
    pub fn scaled(&self, speed: f64) -> Result<Self> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(ArenaError::InvalidInput(format!(
                "speed must be a positive number, got {speed}"
            )));
        }
        let scale = |ms: u64| (ms as f64 / speed).round() as u64;
        Ok(Self {
            total_duration_ms: scale(self.total_duration_ms),
            reveal_delay_ms: scale(self.reveal_delay_ms),
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_delay() {
        let config = ArenaConfig::default();
        assert_eq!(config.round_delay().as_millis(), 1818);
        assert_eq!(config.reveal_delay(), Duration::from_secs(3));
        config.validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ArenaConfig::from_json(r#"{ "totalRounds": 10, "maxOffers": 20 }"#).unwrap();
        assert_eq!(config.total_rounds, 10);
        assert_eq!(config.max_offers, 20);
        assert_eq!(config.agent_count, 12);
        assert_eq!(config.total_duration_ms, 100_000);
    }

    #[test]
    fn too_many_agents_rejected() {
        let config = ArenaConfig {
            agent_count: 13,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ArenaError::InvalidInput(_))
        ));
    }

    #[test]
    fn inverted_round_bounds_rejected() {
        let err = ArenaConfig::from_json(r#"{ "minAgentsPerRound": 6 }"#).unwrap_err();
        assert!(err.to_string().contains("agents per round"));
    }

    #[test]
    fn malformed_json_is_config_error() {
        assert!(matches!(
            ArenaConfig::from_json("{ totalRounds: }"),
            Err(ArenaError::Config(_))
        ));
    }

    #[test]
    fn scaled_divides_delays() {
        let fast = ArenaConfig::default().scaled(10.0).unwrap();
        assert_eq!(fast.total_duration_ms, 10_000);
        assert_eq!(fast.reveal_delay_ms, 300);
        assert_eq!(fast.total_rounds, 55);
        assert!(ArenaConfig::default().scaled(0.0).is_err());
        assert!(ArenaConfig::default().scaled(f64::NAN).is_err());
    }
}
