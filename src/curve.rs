use crate::errors::EngineResult;
use crate::pricing::{year_fraction, BlackScholes};
use crate::types::{Leg, MarketSnapshot, OptionSide, Structure};
use chrono::{DateTime, NaiveTime, Utc};

/// Evenly spaced base samples across the padded price domain.
pub const CURVE_SAMPLES: usize = 150;

/// Samples closer than this are collapsed to avoid redundant evaluation.
pub const MIN_POINT_SPACING: f64 = 0.1;

/// Offset of the injected kink-sharpening points around each strike.
const KINK_OFFSET: f64 = 0.5;

/// Floor on the strike spread, as a fraction of spot, so a single-strike
/// structure still gets a usable domain.
const MIN_SPREAD_FRACTION: f64 = 0.01;

/// One sampled point of the payoff chart.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct CurvePoint {
    /// Hypothetical underlying price.
    pub price: f64,
    /// Net P&L if the underlying sat here at the earliest leg expiry.
    pub expiry_pnl: f64,
    /// Net P&L after `elapsed_fraction` of the time toward that expiry
    /// has decayed away.
    pub simulated_pnl: f64,
}

/// Sample the payoff profile of a structure across a dense, non-uniform
/// price grid: ~150 base points plus critical points at the spot and at
/// each strike +/- 0.5 to sharpen the kinks, sorted ascending and
/// collapsed below `MIN_POINT_SPACING`.
///
/// `zoom` in [0, 1] widens the padding from 10% of the strike spread up
/// to max(5x spread, 30% of spot). `elapsed_fraction` in [0, 1] drives
/// the time-decay simulation toward the earliest leg expiry.
///
/// A structure with no enabled legs yields an empty sequence. A Closed
/// structure yields a flat line at its frozen realized P&L: there is
/// nothing left to simulate.
pub fn sample_curve(
    kernel: &BlackScholes,
    structure: &Structure,
    snapshot: &MarketSnapshot,
    as_of: DateTime<Utc>,
    zoom: f64,
    elapsed_fraction: f64,
) -> EngineResult<Vec<CurvePoint>> {
    let legs: Vec<&Leg> = structure.enabled_legs().collect();
    if legs.is_empty() {
        tracing::debug!(structure = %structure.label, "no enabled legs, empty curve");
        return Ok(Vec::new());
    }

    let prices = price_grid(&legs, snapshot.spot, zoom);

    if structure.is_closed() {
        let frozen = structure.realized_pnl.unwrap_or(0.0);
        return Ok(prices
            .into_iter()
            .map(|price| CurvePoint {
                price,
                expiry_pnl: frozen,
                simulated_pnl: frozen,
            })
            .collect());
    }

    let multiplier = structure.multiplier.value();
    // Earliest expiry anchors both the expiry payoff and the simulation.
    // enabled_legs() is non-empty here, so the minimum exists.
    let horizon = legs.iter().map(|l| l.expiry).min().unwrap_or_default();
    let horizon_instant = horizon.and_time(NaiveTime::MIN).and_utc();
    let span_years = year_fraction(as_of, horizon).max(0.0);
    let elapsed_years = elapsed_fraction.clamp(0.0, 1.0) * span_years;

    let mut points = Vec::with_capacity(prices.len());
    for price in prices {
        let mut expiry_pnl = 0.0;
        let mut simulated_pnl = 0.0;
        for leg in &legs {
            if let Some(close_price) = leg.closing_price.filter(|p| *p != 0.0) {
                // Frozen contribution, constant across the grid
                let net = (close_price - leg.trade_price) * f64::from(leg.quantity) * multiplier
                    - leg.commissions();
                expiry_pnl += net;
                simulated_pnl += net;
                continue;
            }
            // At the horizon: legs expiring then are worth intrinsic
            // (residual time 0), later legs keep their remaining life.
            let residual = year_fraction(horizon_instant, leg.expiry);
            expiry_pnl += leg_net_pnl(kernel, leg, price, residual, snapshot.risk_free_rate, multiplier)?;

            let decayed = year_fraction(as_of, leg.expiry) - elapsed_years;
            simulated_pnl += leg_net_pnl(kernel, leg, price, decayed, snapshot.risk_free_rate, multiplier)?;
        }
        points.push(CurvePoint {
            price,
            expiry_pnl,
            simulated_pnl,
        });
    }
    Ok(points)
}

/// Net P&L of one open leg with the underlying pinned at `price`.
fn leg_net_pnl(
    kernel: &BlackScholes,
    leg: &Leg,
    price: f64,
    t_years: f64,
    rate: f64,
    multiplier: f64,
) -> EngineResult<f64> {
    let quote = kernel.quote(price, leg.strike, t_years, rate, leg.implied_volatility)?;
    let value = match leg.side {
        OptionSide::Call => quote.call,
        OptionSide::Put => quote.put,
    };
    Ok((value - leg.trade_price) * f64::from(leg.quantity) * multiplier - leg.commissions())
}

/// Strictly increasing price grid over the padded strike/spot extent,
/// dense near the strikes.
fn price_grid(legs: &[&Leg], spot: f64, zoom: f64) -> Vec<f64> {
    let mut lo = spot;
    let mut hi = spot;
    for leg in legs {
        lo = lo.min(leg.strike);
        hi = hi.max(leg.strike);
    }
    let spread = (hi - lo).max(MIN_SPREAD_FRACTION * spot);

    let zoom = zoom.clamp(0.0, 1.0);
    let pad_near = 0.10 * spread;
    let pad_far = (5.0 * spread).max(0.30 * spot);
    let padding = pad_near + (pad_far - pad_near) * zoom;

    let start = lo - padding;
    let end = hi + padding;
    let step = (end - start) / (CURVE_SAMPLES - 1) as f64;

    let mut raw = Vec::with_capacity(CURVE_SAMPLES + legs.len() * 3 + 1);
    for i in 0..CURVE_SAMPLES {
        raw.push(start + step * i as f64);
    }
    // Critical points: spot and each strike +/- KINK_OFFSET
    raw.push(spot);
    for leg in legs {
        raw.push(leg.strike - KINK_OFFSET);
        raw.push(leg.strike);
        raw.push(leg.strike + KINK_OFFSET);
    }

    raw.retain(|p| *p > 0.0 && *p >= start && *p <= end);
    raw.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut grid = Vec::with_capacity(raw.len());
    for p in raw {
        match grid.last() {
            Some(last) if p - last < MIN_POINT_SPACING => {}
            _ => grid.push(p),
        }
    }
    grid
}
