use crate::errors::{EngineError, EngineResult};
use chrono::NaiveDate;
use smallvec::SmallVec;
use uuid::Uuid;

// ── Market Snapshot ──

/// Immutable market inputs for one evaluation. Supplied per call; the
/// engine never reads a clock or a feed itself.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct MarketSnapshot {
    /// Underlying price, > 0.
    pub spot: f64,
    /// Annualized risk-free rate as a decimal (e.g. 0.0261).
    pub risk_free_rate: f64,
    /// Annualized volatility proxy as a decimal. 0.0 means "unknown":
    /// valuation falls back to each leg's stored implied volatility.
    pub volatility_proxy: f64,
}

impl MarketSnapshot {
    /// The volatility override to hand the valuator, when the proxy is
    /// known.
    #[inline]
    pub fn vol_override(&self) -> Option<f64> {
        (self.volatility_proxy > 0.0).then_some(self.volatility_proxy)
    }
}

// ── Option Side ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OptionSide {
    Call,
    Put,
}

impl std::fmt::Display for OptionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "call"),
            Self::Put => write!(f, "put"),
        }
    }
}

// ── Point Multiplier ──

/// Monetary value of one underlying point. Fixed enumeration; maps
/// point-denominated P&L to currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PointMultiplier {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "25")]
    TwentyFive,
}

impl PointMultiplier {
    #[inline]
    pub fn value(self) -> f64 {
        match self {
            Self::One => 1.0,
            Self::Five => 5.0,
            Self::TwentyFive => 25.0,
        }
    }
}

// ── Leg ──

/// One option position within a structure. Value object: edits construct
/// a new Leg, the engine only ever consumes read-only snapshots.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Leg {
    pub id: Uuid,
    pub side: OptionSide,
    /// Strike price, > 0.
    pub strike: f64,
    pub expiry: NaiveDate,
    /// Signed contract count: positive = long, negative = short.
    pub quantity: i32,
    /// Cost basis in points.
    pub trade_price: f64,
    /// Leg-specific annualized implied volatility, > 0.
    pub implied_volatility: f64,
    /// Per-contract commissions in currency, >= 0.
    pub opening_commission: f64,
    pub closing_commission: f64,
    /// Non-zero value freezes the leg: it never reaches the pricing
    /// kernel again.
    pub closing_price: Option<f64>,
    pub closed_at: Option<NaiveDate>,
    /// Disabled legs are excluded from every aggregate but kept in the
    /// record.
    pub enabled: bool,
}

impl Leg {
    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self.closing_price, Some(p) if p != 0.0)
    }

    /// Total commissions for this leg in currency.
    #[inline]
    pub fn commissions(&self) -> f64 {
        (self.opening_commission + self.closing_commission) * f64::from(self.quantity.abs())
    }
}

// ── Structure ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructureStatus {
    Active,
    Closed,
}

impl std::fmt::Display for StructureStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// A named basket of legs with a shared point multiplier.
/// Once Closed, `realized_pnl` is authoritative and the pricing kernel
/// is bypassed for portfolio-level totals.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Structure {
    pub id: Uuid,
    pub label: String,
    pub legs: SmallVec<[Leg; 4]>,
    pub multiplier: PointMultiplier,
    pub status: StructureStatus,
    /// Frozen total net P&L, present only while Closed.
    pub realized_pnl: Option<f64>,
    pub closed_at: Option<NaiveDate>,
}

impl Structure {
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.status == StructureStatus::Closed
    }

    /// Enabled legs only; every aggregate iterates through here.
    #[inline]
    pub fn enabled_legs(&self) -> impl Iterator<Item = &Leg> {
        self.legs.iter().filter(|l| l.enabled)
    }

    /// Trailing integer suffix of the label ("Condor #12" -> 12).
    /// Used for chronological ordering when every closed structure
    /// carries one.
    pub fn serial(&self) -> Option<u64> {
        let digits = self
            .label
            .trim_end()
            .chars()
            .rev()
            .take_while(char::is_ascii_digit)
            .collect::<Vec<_>>();
        if digits.is_empty() {
            return None;
        }
        digits.iter().rev().collect::<String>().parse().ok()
    }

    /// Latest closing date among the legs, else the structure's own.
    pub fn effective_close_date(&self) -> Option<NaiveDate> {
        self.legs
            .iter()
            .filter_map(|l| l.closed_at)
            .max()
            .or(self.closed_at)
    }

    /// Close the structure, freezing the realized P&L computed from the
    /// legs' closing prices. Every enabled leg must carry a non-zero
    /// closing price.
    pub fn close(mut self, closed_on: NaiveDate) -> EngineResult<Self> {
        let mut realized = 0.0;
        for leg in self.legs.iter().filter(|l| l.enabled) {
            let Some(close_price) = leg.closing_price.filter(|p| *p != 0.0) else {
                return Err(EngineError::NotCloseable(format!(
                    "leg {} has no closing price",
                    leg.id
                )));
            };
            let points = (close_price - leg.trade_price) * f64::from(leg.quantity);
            realized += points * self.multiplier.value() - leg.commissions();
        }
        self.status = StructureStatus::Closed;
        self.realized_pnl = Some(realized);
        self.closed_at = Some(closed_on);
        Ok(self)
    }

    /// Reopen a closed structure. The only reversible transition: clears
    /// the frozen P&L and the closing date, leaving the legs untouched.
    pub fn reopen(mut self) -> Self {
        self.status = StructureStatus::Active;
        self.realized_pnl = None;
        self.closed_at = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn leg(quantity: i32, trade: f64, close: Option<f64>) -> Leg {
        Leg {
            id: Uuid::new_v4(),
            side: OptionSide::Call,
            strike: 24_500.0,
            expiry: NaiveDate::from_ymd_opt(2026, 3, 26).unwrap(),
            quantity,
            trade_price: trade,
            implied_volatility: 0.15,
            opening_commission: 2.0,
            closing_commission: 2.0,
            closing_price: close,
            closed_at: None,
            enabled: true,
        }
    }

    fn structure(label: &str, legs: SmallVec<[Leg; 4]>) -> Structure {
        Structure {
            id: Uuid::new_v4(),
            label: label.to_string(),
            legs,
            multiplier: PointMultiplier::Five,
            status: StructureStatus::Active,
            realized_pnl: None,
            closed_at: None,
        }
    }

    #[test]
    fn test_serial_parsing() {
        let s = structure("Iron Condor #12", smallvec![]);
        assert_eq!(s.serial(), Some(12));
        let s = structure("Strangle 7 ", smallvec![]);
        assert_eq!(s.serial(), Some(7));
        let s = structure("No number here", smallvec![]);
        assert_eq!(s.serial(), None);
    }

    #[test]
    fn test_close_requires_closing_prices() {
        let s = structure("T1", smallvec![leg(1, 100.0, None)]);
        assert!(s.close(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()).is_err());
    }

    #[test]
    fn test_close_and_reopen() {
        let s = structure("T1", smallvec![leg(-2, 100.0, Some(80.0))]);
        let closed = s.close(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()).unwrap();
        assert_eq!(closed.status, StructureStatus::Closed);
        // Short 2 @ 100, bought back @ 80: (80-100)*-2 = 40 points,
        // 40*5 = 200 currency, minus (2+2)*2 = 8 commissions.
        let pnl = closed.realized_pnl.unwrap();
        assert!((pnl - 192.0).abs() < 1e-9, "realized pnl {pnl} != 192");

        let reopened = closed.reopen();
        assert_eq!(reopened.status, StructureStatus::Active);
        assert!(reopened.realized_pnl.is_none());
        assert!(reopened.closed_at.is_none());
    }

    #[test]
    fn test_zero_closing_price_is_open() {
        let l = leg(1, 100.0, Some(0.0));
        assert!(!l.is_closed(), "zero closing price must not freeze the leg");
    }
}
