use crate::errors::EngineResult;
use crate::greeks::GreeksTotals;
use crate::pricing::{year_fraction, BlackScholes, Greeks, OptionQuote};
use crate::types::{Leg, MarketSnapshot, OptionSide, Structure};
use chrono::{DateTime, Utc};
use uuid::Uuid;

// ── Derived records ──

/// Mark-to-model view of one leg. Greeks are position-scaled (times
/// signed quantity) and zero for closed legs, which carry no forward
/// risk.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LegValuation {
    pub leg_id: Uuid,
    pub current_price: f64,
    pub points_pnl: f64,
    pub gross_pnl: f64,
    pub commissions: f64,
    pub net_pnl: f64,
    pub greeks: Greeks,
    pub closed: bool,
}

/// Gross / commissions / net P&L in currency.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct PnlBucket {
    pub gross: f64,
    pub commissions: f64,
    pub net: f64,
}

impl PnlBucket {
    #[inline]
    fn absorb(&mut self, leg: &LegValuation) {
        self.gross += leg.gross_pnl;
        self.commissions += leg.commissions;
        self.net += leg.net_pnl;
    }
}

/// Per-structure aggregate, partitioned into realized (closed legs) and
/// unrealized (open legs) buckets.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StructureValuation {
    pub structure_id: Uuid,
    /// Point-denominated P&L summed over enabled legs, always
    /// recomputed from the legs even when the structure is Closed.
    pub total_points: f64,
    pub realized: PnlBucket,
    pub unrealized: PnlBucket,
    pub gross_pnl: f64,
    pub commissions: f64,
    /// For a Closed structure this is the frozen `realized_pnl`, which
    /// is authoritative; otherwise the sum over enabled legs.
    pub net_pnl: f64,
    pub greeks: GreeksTotals,
    pub legs: Vec<LegValuation>,
}

/// Portfolio-wide rollup across structures.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct PortfolioValuation {
    pub realized: PnlBucket,
    pub unrealized: PnlBucket,
    pub net_pnl: f64,
    pub greeks: GreeksTotals,
    pub structures: Vec<StructureValuation>,
}

// ── Position Valuator ──

/// Current price of a single leg, in points.
///
/// Closed legs return their frozen closing price and never reach the
/// kernel. Open legs are priced with the leg's stored implied
/// volatility unless `vol_override` is supplied and non-zero, in which
/// case the override replaces it for this valuation only; the stored
/// record is never touched.
pub fn leg_price(
    kernel: &BlackScholes,
    leg: &Leg,
    snapshot: &MarketSnapshot,
    as_of: DateTime<Utc>,
    vol_override: Option<f64>,
) -> EngineResult<f64> {
    if let Some(frozen) = frozen_price(leg) {
        return Ok(frozen);
    }
    let quote = quote_leg(kernel, leg, snapshot, as_of, vol_override)?;
    Ok(side_price(&quote, leg.side))
}

#[inline]
fn frozen_price(leg: &Leg) -> Option<f64> {
    leg.closing_price.filter(|p| *p != 0.0)
}

fn quote_leg(
    kernel: &BlackScholes,
    leg: &Leg,
    snapshot: &MarketSnapshot,
    as_of: DateTime<Utc>,
    vol_override: Option<f64>,
) -> EngineResult<OptionQuote> {
    let sigma = match vol_override {
        Some(v) if v > 0.0 => v,
        _ => leg.implied_volatility,
    };
    let t = year_fraction(as_of, leg.expiry);
    kernel.quote(snapshot.spot, leg.strike, t, snapshot.risk_free_rate, sigma)
}

#[inline]
fn side_price(quote: &OptionQuote, side: OptionSide) -> f64 {
    match side {
        OptionSide::Call => quote.call,
        OptionSide::Put => quote.put,
    }
}

#[inline]
fn side_greeks(quote: &OptionQuote, side: OptionSide) -> Greeks {
    match side {
        OptionSide::Call => quote.call_greeks,
        OptionSide::Put => quote.put_greeks,
    }
}

// ── PnL Aggregator ──

/// Value one leg: price, P&L in points and currency, position Greeks.
/// `quantity` carries the sign, so `diff * quantity` is correct for
/// long and short alike.
pub fn value_leg(
    kernel: &BlackScholes,
    leg: &Leg,
    snapshot: &MarketSnapshot,
    as_of: DateTime<Utc>,
    multiplier: f64,
    vol_override: Option<f64>,
) -> EngineResult<LegValuation> {
    let qty = f64::from(leg.quantity);
    let (current_price, greeks) = if let Some(frozen) = frozen_price(leg) {
        (frozen, Greeks::default())
    } else {
        let quote = quote_leg(kernel, leg, snapshot, as_of, vol_override)?;
        let g = side_greeks(&quote, leg.side);
        (
            side_price(&quote, leg.side),
            Greeks {
                delta: g.delta * qty,
                gamma: g.gamma * qty,
                theta: g.theta * qty,
                vega: g.vega * qty,
            },
        )
    };

    let points_pnl = (current_price - leg.trade_price) * qty;
    let gross_pnl = points_pnl * multiplier;
    let commissions = leg.commissions();

    Ok(LegValuation {
        leg_id: leg.id,
        current_price,
        points_pnl,
        gross_pnl,
        commissions,
        net_pnl: gross_pnl - commissions,
        greeks,
        closed: leg.is_closed(),
    })
}

/// Value every enabled leg of a structure and roll the results up.
/// Disabled legs contribute nothing. A Closed structure reports its
/// frozen `realized_pnl` as the authoritative total while still
/// recomputing `total_points` for display.
pub fn value_structure(
    kernel: &BlackScholes,
    structure: &Structure,
    snapshot: &MarketSnapshot,
    as_of: DateTime<Utc>,
    vol_override: Option<f64>,
) -> EngineResult<StructureValuation> {
    let multiplier = structure.multiplier.value();
    let mut legs = Vec::with_capacity(structure.legs.len());
    let mut realized = PnlBucket::default();
    let mut unrealized = PnlBucket::default();
    let mut greeks = GreeksTotals::default();
    let mut total_points = 0.0;

    for leg in structure.enabled_legs() {
        let lv = value_leg(kernel, leg, snapshot, as_of, multiplier, vol_override)?;
        total_points += lv.points_pnl;
        if lv.closed {
            realized.absorb(&lv);
        } else {
            unrealized.absorb(&lv);
            greeks.accumulate(lv.greeks, multiplier);
        }
        legs.push(lv);
    }

    let gross_pnl = realized.gross + unrealized.gross;
    let commissions = realized.commissions + unrealized.commissions;
    let net_pnl = match (structure.is_closed(), structure.realized_pnl) {
        (true, Some(frozen)) => frozen,
        _ => realized.net + unrealized.net,
    };

    Ok(StructureValuation {
        structure_id: structure.id,
        total_points,
        realized,
        unrealized,
        gross_pnl,
        commissions,
        net_pnl,
        greeks,
        legs,
    })
}

/// Roll up a whole portfolio. Closed structures land entirely in the
/// realized bucket at their frozen P&L; Greeks come from open legs of
/// Active structures only.
pub fn value_portfolio(
    kernel: &BlackScholes,
    structures: &[Structure],
    snapshot: &MarketSnapshot,
    as_of: DateTime<Utc>,
    vol_override: Option<f64>,
) -> EngineResult<PortfolioValuation> {
    let mut out = PortfolioValuation::default();
    for structure in structures {
        let sv = value_structure(kernel, structure, snapshot, as_of, vol_override)?;
        if structure.is_closed() {
            out.realized.gross += sv.gross_pnl;
            out.realized.commissions += sv.commissions;
            out.realized.net += sv.net_pnl;
        } else {
            out.realized.gross += sv.realized.gross;
            out.realized.commissions += sv.realized.commissions;
            out.realized.net += sv.realized.net;
            out.unrealized.gross += sv.unrealized.gross;
            out.unrealized.commissions += sv.unrealized.commissions;
            out.unrealized.net += sv.unrealized.net;
            out.greeks.merge(&sv.greeks);
        }
        out.structures.push(sv);
    }
    out.net_pnl = out.realized.net + out.unrealized.net;
    Ok(out)
}
