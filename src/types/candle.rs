use serde::{Deserialize, Serialize};

/// One OHLC bar, used by the candlestick geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    pub fn new(open: f64, high: f64, low: f64, close: f64) -> Self {
        Self { open, high, low, close }
    }

    pub fn body_size(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.close.max(self.open)
    }

    pub fn lower_wick(&self) -> f64 {
        self.close.min(self.open) - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Body / range, `None` for a zero-range bar.
    pub fn body_ratio(&self) -> Option<f64> {
        let range = self.range();
        if range > 0.0 {
            Some(self.body_size() / range)
        } else {
            None
        }
    }

    /// Body no more than 10% of a non-zero range
    pub fn is_doji(&self) -> bool {
        self.body_ratio().map_or(false, |r| r <= 0.1)
    }

    /// Body at least `fraction` of the range
    pub fn is_long(&self, fraction: f64) -> bool {
        self.body_size() >= fraction * self.range()
    }

    pub fn midpoint(&self) -> f64 {
        (self.open + self.close) / 2.0
    }

    pub fn ohlc4(&self) -> f64 {
        (self.open + self.high + self.low + self.close) / 4.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candle_geometry() {
        let c = Candle::new(10.0, 12.0, 9.0, 11.0);
        assert_eq!(c.body_size(), 1.0);
        assert_eq!(c.range(), 3.0);
        assert_eq!(c.upper_wick(), 1.0);
        assert_eq!(c.lower_wick(), 1.0);
        assert!(c.is_bullish());
        assert!(!c.is_bearish());
        assert_eq!(c.ohlc4(), 10.5);
    }

    #[test]
    fn test_doji_requires_range() {
        let flat = Candle::new(10.0, 10.0, 10.0, 10.0);
        assert!(!flat.is_doji());
        assert!(flat.body_ratio().is_none());

        let doji = Candle::new(10.0, 11.0, 9.0, 10.1);
        assert!(doji.is_doji());
    }
}
