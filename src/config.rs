use crate::errors::{EngineError, EngineResult};

/// Engine configuration consumed, not owned, by the analytics core.
/// Callers typically load this once at startup and pass pieces of it
/// (initial capital, fallback rate) into the pure functions.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Starting capital for the equity curve.
    pub initial_capital: f64,
    /// Risk-free rate used when the caller has no live snapshot rate.
    pub risk_free_rate: f64,
    /// Default zoom fraction for the payoff curve sampler, in [0, 1].
    pub curve_zoom: f64,
}

impl EngineConfig {
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();

        let initial_capital = env_var_or("INITIAL_CAPITAL", "10000")
            .parse::<f64>()
            .map_err(|e| EngineError::Config(format!("INITIAL_CAPITAL: {e}")))?;

        let risk_free_rate = env_var_or("RISK_FREE_RATE", "0.0261")
            .parse::<f64>()
            .map_err(|e| EngineError::Config(format!("RISK_FREE_RATE: {e}")))?;

        let curve_zoom = env_var_or("CURVE_ZOOM", "0.5")
            .parse::<f64>()
            .map_err(|e| EngineError::Config(format!("CURVE_ZOOM: {e}")))?;

        if !(0.0..=1.0).contains(&curve_zoom) {
            return Err(EngineError::Config(format!(
                "CURVE_ZOOM must be in [0, 1], got {curve_zoom}"
            )));
        }

        tracing::info!(initial_capital, risk_free_rate, curve_zoom, "engine config loaded");

        Ok(Self {
            initial_capital,
            risk_free_rate,
            curve_zoom,
        })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            risk_free_rate: 0.0261,
            curve_zoom: 0.5,
        }
    }
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = EngineConfig::default();
        assert!(cfg.initial_capital > 0.0);
        assert!((0.0..=1.0).contains(&cfg.curve_zoom));
    }
}
