/// Domain-specific error types for the analytics engine.
/// The engine is pure: every error propagates synchronously to the caller,
/// which decides whether to retry with corrected input or surface a message.
/// Degenerate-but-valid inputs (zero volatility, expired legs, empty leg
/// lists) are handled by explicit fallbacks and never reach this enum.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid spot price: {0} (must be finite and > 0)")]
    InvalidSpot(f64),

    #[error("invalid strike: {0} (must be finite and > 0)")]
    InvalidStrike(f64),

    #[error("invalid time to expiry: {0} (must be finite)")]
    InvalidTime(f64),

    #[error("invalid volatility: {0} (must be finite)")]
    InvalidVolatility(f64),

    #[error("invalid rate: {0} (must be finite)")]
    InvalidRate(f64),

    #[error("structure not closeable: {0}")]
    NotCloseable(String),

    #[error("config error: {0}")]
    Config(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
