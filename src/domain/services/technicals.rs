//! Technical indicators over a daily close series.
//!
//! Computed per ticker: SMA 50/200, RSI 14 (Wilder smoothing), MACD
//! (12, 26, 9) and Bollinger Bands (20, 2σ), plus derived trend and
//! signal labels for the LLM prompt.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

const SMA_SHORT: usize = 50;
const SMA_LONG: usize = 200;
const RSI_PERIOD: usize = 14;
const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;
const BB_WINDOW: usize = 20;
const BB_STD: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Uptrend,
    Downtrend,
    Sideways,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Uptrend => write!(f, "uptrend"),
            Trend::Downtrend => write!(f, "downtrend"),
            Trend::Sideways => write!(f, "sideways"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsiSignal {
    Overbought,
    Oversold,
    Neutral,
}

impl fmt::Display for RsiSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RsiSignal::Overbought => write!(f, "overbought"),
            RsiSignal::Oversold => write!(f, "oversold"),
            RsiSignal::Neutral => write!(f, "neutral"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MacdSignal {
    Bullish,
    Bearish,
    Neutral,
}

impl fmt::Display for MacdSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MacdSignal::Bullish => write!(f, "bullish"),
            MacdSignal::Bearish => write!(f, "bearish"),
            MacdSignal::Neutral => write!(f, "neutral"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicalSnapshot {
    pub ticker: String,

    // Price context
    pub close: f64,
    pub prev_close: f64,
    pub week_ago_close: f64,
    pub month_ago_close: f64,
    pub year_ago_close: f64,

    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,

    pub rsi: Option<f64>,

    pub macd_line: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_hist: Option<f64>,

    pub bb_upper: Option<f64>,
    pub bb_mid: Option<f64>,
    pub bb_lower: Option<f64>,
    /// Position within the bands: 0 = at lower, 1 = at upper.
    pub bb_pct_b: Option<f64>,

    pub trend: Trend,
    pub rsi_signal: RsiSignal,
    pub macd_label: MacdSignal,
}

impl TechnicalSnapshot {
    pub fn pct_change(&self, past_close: f64) -> f64 {
        if past_close == 0.0 {
            return 0.0;
        }
        (self.close - past_close) / past_close * 100.0
    }

    pub fn change_1d(&self) -> f64 {
        self.pct_change(self.prev_close)
    }

    pub fn change_1w(&self) -> f64 {
        self.pct_change(self.week_ago_close)
    }

    pub fn change_1m(&self) -> f64 {
        self.pct_change(self.month_ago_close)
    }

    pub fn change_1y(&self) -> f64 {
        self.pct_change(self.year_ago_close)
    }

    /// One-paragraph text summary suitable for LLM context.
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("{} closed at ${:.2}.", self.ticker, self.close),
            format!(
                "Performance: 1d {:+.1}%  1w {:+.1}%  1m {:+.1}%  1y {:+.1}%.",
                self.change_1d(),
                self.change_1w(),
                self.change_1m(),
                self.change_1y()
            ),
        ];
        if let (Some(sma50), Some(sma200)) = (self.sma_50, self.sma_200) {
            let rel50 = (self.close - sma50) / sma50 * 100.0;
            let rel200 = (self.close - sma200) / sma200 * 100.0;
            lines.push(format!(
                "Moving averages: SMA50=${:.2} ({:+.1}%), SMA200=${:.2} ({:+.1}%). Trend: {}.",
                sma50, rel50, sma200, rel200, self.trend
            ));
        }
        if let Some(rsi) = self.rsi {
            lines.push(format!("RSI(14)={:.1} ({}).", rsi, self.rsi_signal));
        }
        if let (Some(line), Some(signal), Some(hist)) =
            (self.macd_line, self.macd_signal, self.macd_hist)
        {
            lines.push(format!(
                "MACD: line={:.3}, signal={:.3}, hist={:.3} ({}).",
                line, signal, hist, self.macd_label
            ));
        }
        if let (Some(upper), Some(mid), Some(lower), Some(pct_b)) =
            (self.bb_upper, self.bb_mid, self.bb_lower, self.bb_pct_b)
        {
            lines.push(format!(
                "Bollinger Bands: upper=${:.2}, mid=${:.2}, lower=${:.2}, %B={:.2}.",
                upper, mid, lower, pct_b
            ));
        }
        lines.join(" ")
    }
}

// ── Indicator helpers ────────────────────────────────────────────────────

pub fn sma(close: &[f64], window: usize) -> Option<f64> {
    if close.len() < window || window == 0 {
        return None;
    }
    let tail = &close[close.len() - window..];
    Some(tail.iter().sum::<f64>() / window as f64)
}

/// Wilder RSI. Gains/losses are smoothed with an adjusted exponential
/// mean (alpha = 1/period, weights normalized over the observed window).
/// Returns None when the series is too short or when no losses have
/// occurred in the window (the ratio is undefined there).
pub fn rsi(close: &[f64], period: usize) -> Option<f64> {
    if period == 0 || close.len() < period + 1 {
        return None;
    }

    let alpha = 1.0 / period as f64;
    let decay = 1.0 - alpha;

    let mut gain_num = 0.0;
    let mut loss_num = 0.0;
    let mut den = 0.0;
    for pair in close.windows(2) {
        let delta = pair[1] - pair[0];
        gain_num = delta.max(0.0) + decay * gain_num;
        loss_num = (-delta).max(0.0) + decay * loss_num;
        den = 1.0 + decay * den;
    }

    let avg_gain = gain_num / den;
    let avg_loss = loss_num / den;
    if avg_loss == 0.0 {
        return None;
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

fn ema_series(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev = 0.0;
    for (i, &v) in values.iter().enumerate() {
        prev = if i == 0 { v } else { alpha * v + (1.0 - alpha) * prev };
        out.push(prev);
    }
    out
}

/// MACD line, signal line and histogram at the last bar.
pub fn macd(close: &[f64], fast: usize, slow: usize, signal: usize) -> Option<(f64, f64, f64)> {
    if close.len() < slow + signal {
        return None;
    }
    let ema_fast = ema_series(close, fast);
    let ema_slow = ema_series(close, slow);
    let macd_line: Vec<f64> = ema_fast
        .iter()
        .zip(ema_slow.iter())
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema_series(&macd_line, signal);

    let line = *macd_line.last()?;
    let sig = *signal_line.last()?;
    Some((line, sig, line - sig))
}

/// Bollinger upper/mid/lower bands and %B at the last bar. The band
/// width uses the sample standard deviation over the window.
pub fn bollinger(close: &[f64], window: usize, num_std: f64) -> Option<(f64, f64, f64, f64)> {
    if close.len() < window || window < 2 {
        return None;
    }
    let tail = &close[close.len() - window..];
    let mid = tail.iter().sum::<f64>() / window as f64;
    let variance =
        tail.iter().map(|v| (v - mid) * (v - mid)).sum::<f64>() / (window as f64 - 1.0);
    let std = variance.sqrt();

    let upper = mid + num_std * std;
    let lower = mid - num_std * std;
    let c = *close.last()?;
    let pct_b = if upper - lower != 0.0 {
        (c - lower) / (upper - lower)
    } else {
        0.5
    };
    Some((upper, mid, lower, pct_b))
}

/// close[len - n] when available, else the first close.
fn nth_back(close: &[f64], n: usize) -> f64 {
    if close.len() >= n {
        close[close.len() - n]
    } else {
        close[0]
    }
}

// ── Main entry point ─────────────────────────────────────────────────────

/// Compute a TechnicalSnapshot per ticker from daily close series.
/// Tickers with an empty series are skipped.
pub fn compute(history: &HashMap<String, Vec<f64>>) -> HashMap<String, TechnicalSnapshot> {
    let mut result = HashMap::new();

    for (ticker, close) in history {
        let Some(&last) = close.last() else {
            continue;
        };

        let sma50 = sma(close, SMA_SHORT);
        let sma200 = sma(close, SMA_LONG);
        let rsi_val = rsi(close, RSI_PERIOD);
        let macd_vals = macd(close, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
        let bb = bollinger(close, BB_WINDOW, BB_STD);

        let trend = match (sma50, sma200) {
            (Some(s50), Some(s200)) if last > s50 && s50 > s200 => Trend::Uptrend,
            (Some(s50), Some(s200)) if last < s50 && s50 < s200 => Trend::Downtrend,
            _ => Trend::Sideways,
        };

        let rsi_signal = match rsi_val {
            Some(v) if v >= 70.0 => RsiSignal::Overbought,
            Some(v) if v <= 30.0 => RsiSignal::Oversold,
            Some(_) => RsiSignal::Neutral,
            None => RsiSignal::Neutral,
        };

        let macd_label = match macd_vals {
            Some((line, sig, _)) if line > sig => MacdSignal::Bullish,
            Some(_) => MacdSignal::Bearish,
            None => MacdSignal::Neutral,
        };

        result.insert(
            ticker.clone(),
            TechnicalSnapshot {
                ticker: ticker.clone(),
                close: last,
                prev_close: nth_back(close, 2),
                week_ago_close: nth_back(close, 6),
                month_ago_close: nth_back(close, 22),
                year_ago_close: nth_back(close, 252),
                sma_50: sma50,
                sma_200: sma200,
                rsi: rsi_val,
                macd_line: macd_vals.map(|(l, _, _)| l),
                macd_signal: macd_vals.map(|(_, s, _)| s),
                macd_hist: macd_vals.map(|(_, _, h)| h),
                bb_upper: bb.map(|(u, _, _, _)| u),
                bb_mid: bb.map(|(_, m, _, _)| m),
                bb_lower: bb.map(|(_, _, l, _)| l),
                bb_pct_b: bb.map(|(_, _, _, p)| p),
                trend,
                rsi_signal,
                macd_label,
            },
        );
    }

    result
}
