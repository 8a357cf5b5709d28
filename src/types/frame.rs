use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::Range;

use super::Candle;
use crate::error::{AgentError, Result};

/// OHLCV column names as they appear in history files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Column {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl Column {
    pub const ALL: [Column; 5] = [Column::Open, Column::High, Column::Low, Column::Close, Column::Volume];

    pub fn as_str(&self) -> &'static str {
        match self {
            Column::Open => "open",
            Column::High => "high",
            Column::Low => "low",
            Column::Close => "close",
            Column::Volume => "volume",
        }
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single row of a history file. Only `close` is mandatory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    pub close: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl Bar {
    pub fn ohlcv(open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp: None,
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close,
            volume: Some(volume),
        }
    }

    fn get(&self, column: Column) -> Option<f64> {
        match column {
            Column::Open => self.open,
            Column::High => self.high,
            Column::Low => self.low,
            Column::Close => Some(self.close),
            Column::Volume => self.volume,
        }
    }
}

/// Column-oriented OHLCV history, oldest row first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OhlcvFrame {
    len: usize,
    timestamps: Option<Vec<DateTime<Utc>>>,
    open: Option<Vec<f64>>,
    high: Option<Vec<f64>>,
    low: Option<Vec<f64>>,
    close: Option<Vec<f64>>,
    volume: Option<Vec<f64>>,
}

impl OhlcvFrame {
    pub fn from_close(close: Vec<f64>) -> Self {
        Self {
            len: close.len(),
            close: Some(close),
            ..Self::default()
        }
    }

    pub fn from_ohlcv(
        open: Vec<f64>,
        high: Vec<f64>,
        low: Vec<f64>,
        close: Vec<f64>,
        volume: Vec<f64>,
    ) -> Result<Self> {
        Self::from_close(close)
            .with_column(Column::Open, open)?
            .with_column(Column::High, high)?
            .with_column(Column::Low, low)?
            .with_column(Column::Volume, volume)
    }

    /// Builds a frame from rows. A column is present when every row carries it.
    pub fn from_bars(bars: &[Bar]) -> Result<Self> {
        let mut frame = Self::from_close(bars.iter().map(|b| b.close).collect());

        for column in [Column::Open, Column::High, Column::Low, Column::Volume] {
            let values: Vec<Option<f64>> = bars.iter().map(|b| b.get(column)).collect();
            if values.iter().all(Option::is_none) {
                continue;
            }
            if let Some(row) = values.iter().position(Option::is_none) {
                return Err(AgentError::IncompleteColumn { column, row });
            }
            frame = frame.with_column(column, values.into_iter().flatten().collect())?;
        }

        if bars.iter().all(|b| b.timestamp.is_some()) && !bars.is_empty() {
            frame.timestamps = Some(bars.iter().filter_map(|b| b.timestamp).collect());
        }

        Ok(frame)
    }

    pub fn with_column(mut self, column: Column, values: Vec<f64>) -> Result<Self> {
        if values.len() != self.len {
            return Err(AgentError::LengthMismatch {
                column,
                expected: self.len,
                got: values.len(),
            });
        }
        *self.slot(column) = Some(values);
        Ok(self)
    }

    fn slot(&mut self, column: Column) -> &mut Option<Vec<f64>> {
        match column {
            Column::Open => &mut self.open,
            Column::High => &mut self.high,
            Column::Low => &mut self.low,
            Column::Close => &mut self.close,
            Column::Volume => &mut self.volume,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn has(&self, column: Column) -> bool {
        self.column(column).is_some()
    }

    pub fn column(&self, column: Column) -> Option<&[f64]> {
        match column {
            Column::Open => self.open.as_deref(),
            Column::High => self.high.as_deref(),
            Column::Low => self.low.as_deref(),
            Column::Close => self.close.as_deref(),
            Column::Volume => self.volume.as_deref(),
        }
    }

    /// Column lookup that reports which indicator needed it.
    pub fn require(&self, column: Column, indicator: &str) -> Result<&[f64]> {
        self.column(column).ok_or_else(|| AgentError::MissingColumn {
            indicator: indicator.to_string(),
            column,
        })
    }

    pub fn timestamps(&self) -> Option<&[DateTime<Utc>]> {
        self.timestamps.as_deref()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.close.as_ref().and_then(|c| c.last().copied())
    }

    /// OHLC rows for candlestick geometry.
    pub fn candles(&self, indicator: &str) -> Result<Vec<Candle>> {
        let open = self.require(Column::Open, indicator)?;
        let high = self.require(Column::High, indicator)?;
        let low = self.require(Column::Low, indicator)?;
        let close = self.require(Column::Close, indicator)?;
        Ok((0..self.len)
            .map(|i| Candle::new(open[i], high[i], low[i], close[i]))
            .collect())
    }

    /// Copy of the rows in `range` (clamped to the frame).
    pub fn slice(&self, range: Range<usize>) -> Self {
        let end = range.end.min(self.len);
        let start = range.start.min(end);
        let cut = |v: &Option<Vec<f64>>| v.as_ref().map(|v| v[start..end].to_vec());
        Self {
            len: end - start,
            timestamps: self.timestamps.as_ref().map(|t| t[start..end].to_vec()),
            open: cut(&self.open),
            high: cut(&self.high),
            low: cut(&self.low),
            close: cut(&self.close),
            volume: cut(&self.volume),
        }
    }

    pub fn last_n(&self, n: usize) -> Self {
        self.slice(self.len.saturating_sub(n)..self.len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bars_partial_columns() {
        let bars = vec![
            Bar { timestamp: None, open: None, high: Some(2.0), low: None, close: 1.5, volume: None },
            Bar { timestamp: None, open: None, high: Some(2.5), low: None, close: 2.0, volume: None },
        ];
        let frame = OhlcvFrame::from_bars(&bars).unwrap();
        assert_eq!(frame.len(), 2);
        assert!(frame.has(Column::High));
        assert!(!frame.has(Column::Open));
        assert_eq!(frame.last_close(), Some(2.0));
    }

    #[test]
    fn test_from_bars_rejects_gaps() {
        let bars = vec![
            Bar::ohlcv(1.0, 2.0, 0.5, 1.5, 10.0),
            Bar { volume: None, ..Bar::ohlcv(1.5, 2.0, 1.0, 1.8, 0.0) },
        ];
        let err = OhlcvFrame::from_bars(&bars).unwrap_err();
        assert!(matches!(err, AgentError::IncompleteColumn { column: Column::Volume, row: 1 }));
    }

    #[test]
    fn test_length_mismatch() {
        let err = OhlcvFrame::from_close(vec![1.0, 2.0])
            .with_column(Column::Volume, vec![1.0])
            .unwrap_err();
        assert!(matches!(err, AgentError::LengthMismatch { expected: 2, got: 1, .. }));
    }

    #[test]
    fn test_require_reports_indicator() {
        let frame = OhlcvFrame::from_close(vec![1.0]);
        let err = frame.require(Column::Volume, "OBV").unwrap_err();
        assert_eq!(err.to_string(), "OBV: history is missing required column 'volume'");
    }

    #[test]
    fn test_slice_and_last_n() {
        let frame = OhlcvFrame::from_close(vec![1.0, 2.0, 3.0, 4.0]);
        let tail = frame.last_n(2);
        assert_eq!(tail.column(Column::Close), Some(&[3.0, 4.0][..]));
        assert_eq!(frame.slice(1..10).len(), 3);
    }

    #[test]
    fn test_bar_json() {
        let bar: Bar = serde_json::from_str(r#"{"close": 10.5, "volume": 100}"#).unwrap();
        assert_eq!(bar.close, 10.5);
        assert_eq!(bar.volume, Some(100.0));
        assert!(bar.open.is_none());
    }
}
