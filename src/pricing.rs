use crate::errors::{EngineError, EngineResult};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

/// Day-count basis used everywhere time becomes a year fraction.
/// One basis for the whole engine; mixing bases across call sites is a
/// defect.
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Below one calendar day of remaining life the closed-form model is
/// bypassed and options are worth intrinsic value.
pub const EXPIRY_EPSILON_YEARS: f64 = 1.0 / DAYS_PER_YEAR;

const SECONDS_PER_YEAR: f64 = DAYS_PER_YEAR * 24.0 * 3600.0;

/// First/second-order sensitivities of an option price.
/// Theta is value decay per calendar day; vega is per one-point change
/// in volatility (raw per-unit vega / 100).
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
}

/// Call and put valued off one shared (d1, d2) evaluation.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct OptionQuote {
    pub call: f64,
    pub put: f64,
    pub call_greeks: Greeks,
    pub put_greeks: Greeks,
}

/// Closed-form European option pricing under the constant-volatility
/// lognormal model.
///
///   d1 = (ln(S/K) + (r + sigma^2/2)*T) / (sigma * sqrt(T))
///   d2 = d1 - sigma * sqrt(T)
///   call = S*Phi(d1) - K*e^(-rT)*Phi(d2)
///   put  = call - S + K*e^(-rT)
///
/// Pure: deterministic output from the five scalar inputs.
pub struct BlackScholes {
    /// Standard normal distribution (created once, reused)
    normal: Normal,
}

impl BlackScholes {
    pub fn new() -> Self {
        // Normal::new(0, 1) only fails if std_dev <= 0; this is safe.
        let normal = Normal::new(0.0, 1.0).unwrap_or_else(|_| {
            tracing::error!("failed to create standard normal -- using fallback");
            Normal::standard()
        });
        Self { normal }
    }

    /// Price both sides and their Greeks.
    ///
    /// Fails fast on non-positive or non-finite spot/strike and on
    /// non-finite time/rate/volatility: NaN never leaks out silently.
    /// Degenerate-but-valid inputs fall back instead:
    /// `t_years <= EXPIRY_EPSILON_YEARS` or `sigma <= 0` yields intrinsic
    /// value with zero Greeks, except delta which is the step function
    /// 1 (call, spot > strike) / -1 (put, spot < strike) / 0 otherwise.
    /// That discontinuity at expiry is inherent to the model and is
    /// reproduced exactly, not smoothed.
    pub fn quote(
        &self,
        spot: f64,
        strike: f64,
        t_years: f64,
        rate: f64,
        sigma: f64,
    ) -> EngineResult<OptionQuote> {
        if !spot.is_finite() || spot <= 0.0 {
            return Err(EngineError::InvalidSpot(spot));
        }
        if !strike.is_finite() || strike <= 0.0 {
            return Err(EngineError::InvalidStrike(strike));
        }
        if !t_years.is_finite() {
            return Err(EngineError::InvalidTime(t_years));
        }
        if !rate.is_finite() {
            return Err(EngineError::InvalidRate(rate));
        }
        if !sigma.is_finite() {
            return Err(EngineError::InvalidVolatility(sigma));
        }

        if t_years <= EXPIRY_EPSILON_YEARS || sigma <= 0.0 {
            return Ok(Self::intrinsic_quote(spot, strike));
        }

        let sqrt_t = t_years.sqrt();
        let d1 = ((spot / strike).ln() + (rate + 0.5 * sigma * sigma) * t_years)
            / (sigma * sqrt_t);
        let d2 = d1 - sigma * sqrt_t;

        let nd1 = self.normal.cdf(d1);
        let nd2 = self.normal.cdf(d2);
        let pdf_d1 = self.normal.pdf(d1);
        let discount = (-rate * t_years).exp();

        let call = (spot * nd1 - strike * discount * nd2).max(0.0);
        let put = (call - spot + strike * discount).max(0.0);

        // Shared second-order terms
        let gamma = pdf_d1 / (spot * sigma * sqrt_t);
        let vega = spot * pdf_d1 * sqrt_t / 100.0;
        let decay = -spot * pdf_d1 * sigma / (2.0 * sqrt_t);

        let call_greeks = Greeks {
            delta: nd1,
            gamma,
            theta: (decay - rate * strike * discount * nd2) / DAYS_PER_YEAR,
            vega,
        };
        let put_greeks = Greeks {
            delta: nd1 - 1.0,
            gamma,
            theta: (decay + rate * strike * discount * self.normal.cdf(-d2)) / DAYS_PER_YEAR,
            vega,
        };

        Ok(OptionQuote {
            call,
            put,
            call_greeks,
            put_greeks,
        })
    }

    /// Expiry regime: intrinsic value, step-function delta, no other risk.
    fn intrinsic_quote(spot: f64, strike: f64) -> OptionQuote {
        let call_delta = if spot > strike { 1.0 } else { 0.0 };
        let put_delta = if spot < strike { -1.0 } else { 0.0 };
        OptionQuote {
            call: (spot - strike).max(0.0),
            put: (strike - spot).max(0.0),
            call_greeks: Greeks {
                delta: call_delta,
                ..Greeks::default()
            },
            put_greeks: Greeks {
                delta: put_delta,
                ..Greeks::default()
            },
        }
    }
}

impl Default for BlackScholes {
    fn default() -> Self {
        Self::new()
    }
}

/// Year fraction from an injected "as-of" instant to an expiry date
/// (midnight UTC), on the engine-wide 365.25 basis. Negative once the
/// date has passed; the kernel maps that to the intrinsic regime.
#[inline]
pub fn year_fraction(as_of: DateTime<Utc>, expiry: NaiveDate) -> f64 {
    let expiry_instant = expiry.and_time(NaiveTime::MIN).and_utc();
    (expiry_instant - as_of).num_seconds() as f64 / SECONDS_PER_YEAR
}
