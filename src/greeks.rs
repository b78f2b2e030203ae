use crate::errors::EngineResult;
use crate::pricing::{BlackScholes, Greeks};
use crate::types::{MarketSnapshot, Structure};
use crate::valuation::value_leg;
use chrono::{DateTime, Utc};

/// Net sensitivities summed over open, enabled legs. Delta and gamma
/// are in points; theta and vega are reported both in points and, as
/// `theta_value`/`vega_value`, scaled by the point multiplier into
/// currency.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct GreeksTotals {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
    pub theta_value: f64,
    pub vega_value: f64,
}

impl GreeksTotals {
    /// Fold in one leg's position-scaled Greeks.
    #[inline]
    pub fn accumulate(&mut self, scaled: Greeks, multiplier: f64) {
        self.delta += scaled.delta;
        self.gamma += scaled.gamma;
        self.theta += scaled.theta;
        self.vega += scaled.vega;
        self.theta_value += scaled.theta * multiplier;
        self.vega_value += scaled.vega * multiplier;
    }

    #[inline]
    pub fn merge(&mut self, other: &Self) {
        self.delta += other.delta;
        self.gamma += other.gamma;
        self.theta += other.theta;
        self.vega += other.vega;
        self.theta_value += other.theta_value;
        self.vega_value += other.vega_value;
    }
}

/// Net Greeks for one structure. Closed legs contribute zero -- a
/// closed position carries no forward risk -- and disabled legs are
/// skipped entirely.
pub fn structure_greeks(
    kernel: &BlackScholes,
    structure: &Structure,
    snapshot: &MarketSnapshot,
    as_of: DateTime<Utc>,
    vol_override: Option<f64>,
) -> EngineResult<GreeksTotals> {
    let multiplier = structure.multiplier.value();
    let mut totals = GreeksTotals::default();
    for leg in structure.enabled_legs().filter(|l| !l.is_closed()) {
        let lv = value_leg(kernel, leg, snapshot, as_of, multiplier, vol_override)?;
        totals.accumulate(lv.greeks, multiplier);
    }
    Ok(totals)
}

/// Net Greeks across every Active structure in the portfolio. Closed
/// structures are bypassed outright.
pub fn portfolio_greeks(
    kernel: &BlackScholes,
    structures: &[Structure],
    snapshot: &MarketSnapshot,
    as_of: DateTime<Utc>,
    vol_override: Option<f64>,
) -> EngineResult<GreeksTotals> {
    let mut totals = GreeksTotals::default();
    for structure in structures.iter().filter(|s| !s.is_closed()) {
        let sg = structure_greeks(kernel, structure, snapshot, as_of, vol_override)?;
        totals.merge(&sg);
    }
    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Leg, OptionSide, PointMultiplier, StructureStatus};
    use chrono::{NaiveDate, TimeZone};
    use smallvec::smallvec;
    use uuid::Uuid;

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 24, 0, 0, 0).unwrap()
    }

    fn snapshot() -> MarketSnapshot {
        MarketSnapshot {
            spot: 24_500.0,
            risk_free_rate: 0.0261,
            volatility_proxy: 0.0,
        }
    }

    fn leg(side: OptionSide, strike: f64, quantity: i32) -> Leg {
        Leg {
            id: Uuid::new_v4(),
            side,
            strike,
            expiry: NaiveDate::from_ymd_opt(2026, 3, 26).unwrap(),
            quantity,
            trade_price: 150.0,
            implied_volatility: 0.15,
            opening_commission: 1.0,
            closing_commission: 1.0,
            closing_price: None,
            closed_at: None,
            enabled: true,
        }
    }

    fn structure(legs: smallvec::SmallVec<[Leg; 4]>) -> Structure {
        Structure {
            id: Uuid::new_v4(),
            label: "Condor #3".to_string(),
            legs,
            multiplier: PointMultiplier::TwentyFive,
            status: StructureStatus::Active,
            realized_pnl: None,
            closed_at: None,
        }
    }

    #[test]
    fn test_short_straddle_has_negative_gamma_positive_theta() {
        let kernel = BlackScholes::new();
        let s = structure(smallvec![
            leg(OptionSide::Call, 24_500.0, -1),
            leg(OptionSide::Put, 24_500.0, -1),
        ]);
        let g = structure_greeks(&kernel, &s, &snapshot(), as_of(), None).unwrap();
        assert!(g.gamma < 0.0, "short straddle gamma {} should be negative", g.gamma);
        assert!(g.theta > 0.0, "short straddle theta {} should be positive", g.theta);
        assert!(g.vega < 0.0, "short straddle vega {} should be negative", g.vega);
        // ATM call and put deltas nearly cancel when short both
        assert!(g.delta.abs() < 0.2, "short straddle delta {} should be small", g.delta);
        assert!((g.theta_value - g.theta * 25.0).abs() < 1e-12);
        assert!((g.vega_value - g.vega * 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_closed_legs_carry_no_forward_risk() {
        let kernel = BlackScholes::new();
        let mut frozen = leg(OptionSide::Call, 24_500.0, 2);
        frozen.closing_price = Some(210.0);
        let open = leg(OptionSide::Call, 24_500.0, 2);
        let with_frozen = structure(smallvec![frozen, open.clone()]);
        let only_open = structure(smallvec![open]);

        let a = structure_greeks(&kernel, &with_frozen, &snapshot(), as_of(), None).unwrap();
        let b = structure_greeks(&kernel, &only_open, &snapshot(), as_of(), None).unwrap();
        assert!((a.delta - b.delta).abs() < 1e-12);
        assert!((a.vega - b.vega).abs() < 1e-12);
    }

    #[test]
    fn test_portfolio_skips_closed_structures() {
        let kernel = BlackScholes::new();
        let open = structure(smallvec![leg(OptionSide::Put, 24_000.0, -2)]);
        let mut done_leg = leg(OptionSide::Call, 25_000.0, 1);
        done_leg.closing_price = Some(90.0);
        let done = structure(smallvec![done_leg])
            .close(NaiveDate::from_ymd_opt(2026, 2, 20).unwrap())
            .unwrap();

        let all = [open.clone(), done];
        let g = portfolio_greeks(&kernel, &all, &snapshot(), as_of(), None).unwrap();
        let open_only = structure_greeks(&kernel, &open, &snapshot(), as_of(), None).unwrap();
        assert!((g.delta - open_only.delta).abs() < 1e-12);
        assert!((g.theta_value - open_only.theta_value).abs() < 1e-12);
    }
}
