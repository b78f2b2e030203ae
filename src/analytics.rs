use crate::types::Structure;

/// One step of the realized-equity series. `drawdown` is the shortfall
/// below the highest equity seen so far (starting capital included),
/// always <= 0.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EquityPoint {
    pub sequence: usize,
    pub label: String,
    pub equity: f64,
    pub drawdown: f64,
}

/// Summary statistics over closed structures.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct KeyMetrics {
    pub trades: usize,
    pub winners: usize,
    pub losers: usize,
    pub win_rate: f64,
    /// Gross profit / |gross loss|. Infinite when there are profits but
    /// no losses; 0 when there are no profits at all.
    pub profit_factor: f64,
    pub avg_win: f64,
    /// Mean of the losing P&Ls, <= 0.
    pub avg_loss: f64,
    /// Minimum drawdown value across the equity series, <= 0.
    /// 0 when the series has fewer than two points.
    pub max_drawdown: f64,
    pub net_pnl: f64,
}

/// Closed structures in their chronological order: by the trailing
/// serial number in the label when every one carries it, else by
/// effective closing date. The sort is stable, so ties keep input
/// order and the derived series stays deterministic.
fn closed_in_order(structures: &[Structure]) -> Vec<&Structure> {
    let mut closed: Vec<&Structure> = structures.iter().filter(|s| s.is_closed()).collect();
    if closed.iter().all(|s| s.serial().is_some()) {
        closed.sort_by_key(|s| s.serial());
    } else {
        closed.sort_by_key(|s| s.effective_close_date());
    }
    closed
}

/// Accumulate realized P&L into an equity series, starting from the
/// configured capital. Emits a synthetic starting point followed by one
/// point per closed structure.
pub fn equity_curve(structures: &[Structure], initial_capital: f64) -> Vec<EquityPoint> {
    let ordered = closed_in_order(structures);

    let mut points = Vec::with_capacity(ordered.len() + 1);
    points.push(EquityPoint {
        sequence: 0,
        label: "Start".to_string(),
        equity: initial_capital,
        drawdown: 0.0,
    });

    let mut equity = initial_capital;
    let mut peak = initial_capital;
    for (i, structure) in ordered.iter().enumerate() {
        equity += structure.realized_pnl.unwrap_or(0.0);
        peak = peak.max(equity);
        points.push(EquityPoint {
            sequence: i + 1,
            label: structure.label.clone(),
            equity,
            drawdown: equity - peak,
        });
    }
    points
}

/// Trade statistics over the same ordered series.
pub fn key_metrics(structures: &[Structure], initial_capital: f64) -> KeyMetrics {
    let ordered = closed_in_order(structures);

    let mut winners = 0;
    let mut losers = 0;
    let mut gross_profit = 0.0;
    let mut gross_loss = 0.0;
    let mut loss_sum = 0.0;
    let mut net_pnl = 0.0;
    for structure in &ordered {
        let pnl = structure.realized_pnl.unwrap_or(0.0);
        net_pnl += pnl;
        if pnl > 0.0 {
            winners += 1;
            gross_profit += pnl;
        } else if pnl < 0.0 {
            losers += 1;
            gross_loss += pnl.abs();
            loss_sum += pnl;
        }
    }

    let trades = ordered.len();
    let win_rate = if trades == 0 {
        0.0
    } else {
        winners as f64 / trades as f64
    };
    let profit_factor = if gross_loss == 0.0 {
        if gross_profit > 0.0 {
            f64::INFINITY
        } else {
            0.0
        }
    } else {
        gross_profit / gross_loss
    };
    let avg_win = if winners == 0 {
        0.0
    } else {
        gross_profit / winners as f64
    };
    let avg_loss = if losers == 0 {
        0.0
    } else {
        loss_sum / losers as f64
    };

    let curve = equity_curve(structures, initial_capital);
    let max_drawdown = if curve.len() < 2 {
        0.0
    } else {
        curve.iter().map(|p| p.drawdown).fold(0.0, f64::min)
    };

    KeyMetrics {
        trades,
        winners,
        losers,
        win_rate,
        profit_factor,
        avg_win,
        avg_loss,
        max_drawdown,
        net_pnl,
    }
}
