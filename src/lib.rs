//! Pure option portfolio analytics: closed-form European pricing,
//! Greeks, realized/unrealized P&L aggregation, payoff-curve sampling,
//! and equity/drawdown statistics over closed trades.
//!
//! The engine is stateless and side-effect free. Callers supply
//! immutable snapshots (market data, structures, an explicit "as-of"
//! instant -- the engine never reads a clock) and consume plain value
//! objects back. Fetching data, persisting records, and rendering are
//! the calling layer's concerns.

pub mod analytics;
pub mod config;
pub mod curve;
pub mod errors;
pub mod greeks;
pub mod pricing;
pub mod types;
pub mod valuation;

pub use analytics::{equity_curve, key_metrics, EquityPoint, KeyMetrics};
pub use config::EngineConfig;
pub use curve::{sample_curve, CurvePoint};
pub use errors::{EngineError, EngineResult};
pub use greeks::{portfolio_greeks, structure_greeks, GreeksTotals};
pub use pricing::{year_fraction, BlackScholes, Greeks, OptionQuote, DAYS_PER_YEAR};
pub use types::{Leg, MarketSnapshot, OptionSide, PointMultiplier, Structure, StructureStatus};
pub use valuation::{
    leg_price, value_leg, value_portfolio, value_structure, LegValuation, PnlBucket,
    PortfolioValuation, StructureValuation,
};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use smallvec::smallvec;
    use uuid::Uuid;

    // The engine defines no wire format, but every boundary record must
    // round-trip through the caller's serialization without losing a
    // field.
    #[test]
    fn test_structure_round_trips_through_json() {
        let structure = Structure {
            id: Uuid::new_v4(),
            label: "Iron Condor #4".to_string(),
            legs: smallvec![Leg {
                id: Uuid::new_v4(),
                side: OptionSide::Put,
                strike: 24_000.0,
                expiry: NaiveDate::from_ymd_opt(2026, 3, 26).unwrap(),
                quantity: -2,
                trade_price: 141.35,
                implied_volatility: 0.1525,
                opening_commission: 1.25,
                closing_commission: 1.25,
                closing_price: Some(98.6),
                closed_at: NaiveDate::from_ymd_opt(2026, 3, 10),
                enabled: true,
            }],
            multiplier: PointMultiplier::TwentyFive,
            status: StructureStatus::Closed,
            realized_pnl: Some(2_131.25),
            closed_at: NaiveDate::from_ymd_opt(2026, 3, 10),
        };

        let json = serde_json::to_string(&structure).unwrap();
        let back: Structure = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, structure.id);
        assert_eq!(back.status, structure.status);
        assert_eq!(back.multiplier, structure.multiplier);
        assert_eq!(back.legs.len(), 1);
        assert_eq!(back.legs[0].quantity, -2);
        assert!((back.legs[0].trade_price - 141.35).abs() < 1e-12);
        assert_eq!(back.realized_pnl, structure.realized_pnl);
        assert_eq!(back.legs[0].closed_at, structure.legs[0].closed_at);
    }

    #[test]
    fn test_snapshot_round_trips() {
        let snap = MarketSnapshot {
            spot: 24_512.35,
            risk_free_rate: 0.0261,
            volatility_proxy: 0.1431,
        };
        let json = serde_json::to_string(&snap).unwrap();
        let back: MarketSnapshot = serde_json::from_str(&json).unwrap();
        assert!((back.spot - snap.spot).abs() < 1e-12);
        assert!((back.volatility_proxy - snap.volatility_proxy).abs() < 1e-12);
    }
}
