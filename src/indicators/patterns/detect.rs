use super::Pattern;
use crate::types::Candle;

/// Look-back view over a candle slice ending at one bar. `at(0)` is the
/// evaluated bar, `at(k)` the bar `k` steps earlier.
#[derive(Debug, Clone, Copy)]
pub struct Bars<'a> {
    candles: &'a [Candle],
    end: usize,
}

impl<'a> Bars<'a> {
    pub fn new(candles: &'a [Candle], end: usize) -> Self {
        Self { candles, end }
    }

    pub fn at(&self, k: usize) -> &'a Candle {
        &self.candles[self.end - k]
    }
}

/// Inclusive range test that is false when the bounds are reversed.
fn between(x: f64, lo: f64, hi: f64) -> bool {
    lo <= x && x <= hi
}

fn ratio_at_most(c: &Candle, limit: f64) -> bool {
    c.body_ratio().map_or(false, |r| r <= limit)
}

fn strictly_long(c: &Candle, fraction: f64) -> bool {
    c.body_size() > c.range() * fraction
}

fn small(c: &Candle, fraction: f64) -> bool {
    c.body_size() <= c.range() * fraction
}

fn hammer_shape(c: &Candle) -> bool {
    let body = c.body_size();
    ratio_at_most(c, 0.4) && c.upper_wick() <= body * 0.25 && c.lower_wick() >= body * 2.0
}

fn inverted_hammer_shape(c: &Candle) -> bool {
    let body = c.body_size();
    ratio_at_most(c, 0.4) && c.upper_wick() >= body * 2.0 && c.lower_wick() <= body * 0.25
}

/// Shaven body: both shadows within a tenth of a non-empty body.
fn marubozu(c: &Candle) -> bool {
    let body = c.body_size();
    body > 0.0 && c.upper_wick() <= body * 0.1 && c.lower_wick() <= body * 0.1
}

/// Body strictly inside the previous candle's body.
fn body_inside(inner: &Candle, outer: &Candle) -> bool {
    let lo = outer.open.min(outer.close);
    let hi = outer.open.max(outer.close);
    let within = |x: f64| lo < x && x < hi;
    within(inner.open) && within(inner.close)
}

fn three_soldiers(b: &Bars) -> bool {
    let (c2, c1, c0) = (b.at(2), b.at(1), b.at(0));
    c2.is_bullish()
        && c1.is_bullish()
        && c0.is_bullish()
        && between(c1.open, c2.open, c2.close)
        && between(c0.open, c1.open, c1.close)
        && c1.close > c2.close
        && c0.close > c1.close
}

fn kicking(b: &Bars) -> bool {
    let (c1, c0) = (b.at(1), b.at(0));
    if !(marubozu(c1) && marubozu(c0)) {
        return false;
    }
    (c1.is_bearish() && c0.is_bullish() && c0.open > c1.high)
        || (c1.is_bullish() && c0.is_bearish() && c0.open < c1.low)
}

impl Pattern {
    /// Whether the pattern completes on the last bar of `b`. `typical_range`
    /// is the median bar range so far, the tolerance unit for "equal" prices.
    pub fn detect(&self, b: &Bars, typical_range: f64) -> bool {
        let tick = typical_range * 0.01;
        let c0 = b.at(0);
        match self {
            Pattern::TwoCrows => {
                let (c2, c1) = (b.at(2), b.at(1));
                c2.is_bullish()
                    && c1.is_bearish()
                    && c0.is_bearish()
                    && c1.open > c2.close
                    && c1.close > c2.close
                    && c0.open > c1.open
                    && c0.close < c2.close
                    && c0.close > c2.open
            }
            Pattern::ThreeBlackCrows => {
                let (c2, c1) = (b.at(2), b.at(1));
                c2.is_bearish()
                    && c1.is_bearish()
                    && c0.is_bearish()
                    && c1.open < c2.open
                    && c0.open < c1.open
                    && c1.close < c2.close
                    && c0.close < c1.close
            }
            Pattern::ThreeInside => {
                let (c2, c1) = (b.at(2), b.at(1));
                let inside = between(c1.close, c2.open, c2.close) || between(c1.close, c2.close, c2.open);
                let reversal = (c2.is_bullish() && c0.is_bearish()) || (c2.is_bearish() && c0.is_bullish());
                c1.body_size() < c2.body_size() * 0.6 && inside && reversal
            }
            Pattern::ThreeLineStrike => {
                let (c3, c2, c1) = (b.at(3), b.at(2), b.at(1));
                let bull = c3.is_bullish()
                    && c2.is_bullish()
                    && c1.is_bullish()
                    && c2.close > c3.close
                    && c1.close > c2.close
                    && c0.is_bearish()
                    && c0.open > c1.close
                    && c0.close < c3.open;
                let bear = c3.is_bearish()
                    && c2.is_bearish()
                    && c1.is_bearish()
                    && c2.close < c3.close
                    && c1.close < c2.close
                    && c0.is_bullish()
                    && c0.open < c1.close
                    && c0.close > c3.open;
                bull || bear
            }
            Pattern::ThreeOutside => {
                let (c2, c1) = (b.at(2), b.at(1));
                let bull = c2.is_bearish()
                    && c1.is_bullish()
                    && c1.open < c2.close
                    && c1.close > c2.open
                    && c0.close > c1.close;
                let bear = c2.is_bullish()
                    && c1.is_bearish()
                    && c1.open > c2.close
                    && c1.close < c2.open
                    && c0.close < c1.close;
                bull || bear
            }
            Pattern::ThreeStarsInSouth => {
                let (c2, c1) = (b.at(2), b.at(1));
                c2.is_bearish()
                    && c1.is_bearish()
                    && c0.is_bearish()
                    && c1.high < c2.high
                    && c0.high < c1.high
                    && c1.low < c2.low
                    && c0.low < c1.low
                    && c1.body_size() <= c2.body_size() * 0.6
                    && c1.open < c2.low
                    && between(c0.open, c1.low, c1.high)
                    && c0.close > c1.close
            }
            Pattern::ThreeWhiteSoldiers => three_soldiers(b),
            Pattern::AbandonedBaby => {
                let (c2, c1) = (b.at(2), b.at(1));
                if !c1.is_doji() {
                    return false;
                }
                let bull = c2.is_bearish()
                    && c1.high < c2.low
                    && c0.is_bullish()
                    && c0.open > c1.close
                    && c0.close > c2.midpoint();
                let bear = c2.is_bullish()
                    && c1.low > c2.high
                    && c0.is_bearish()
                    && c0.open < c1.close
                    && c0.close < c2.midpoint();
                bull || bear
            }
            Pattern::AdvanceBlock => {
                let (c2, c1) = (b.at(2), b.at(1));
                three_soldiers(b)
                    && c2.body_size() > c1.body_size()
                    && c1.body_size() > c0.body_size()
                    && c2.high - c2.close < c1.high - c1.close
                    && c1.high - c1.close < c0.high - c0.close
            }
            Pattern::BeltHold => {
                c0.is_long(0.6)
                    && ((c0.open == c0.low && c0.is_bullish()) || (c0.open == c0.high && c0.is_bearish()))
            }
            Pattern::Breakaway => {
                let (c4, c3, c2, c1) = (b.at(4), b.at(3), b.at(2), b.at(1));
                let bull = c4.is_bearish()
                    && c3.low < c4.low
                    && c2.low < c3.low
                    && c1.low < c2.low
                    && c0.is_bullish()
                    && c0.close > c4.open;
                let bear = c4.is_bullish()
                    && c3.high > c4.high
                    && c2.high > c3.high
                    && c1.high > c2.high
                    && c0.is_bearish()
                    && c0.close < c4.open;
                bull || bear
            }
            Pattern::ClosingMarubozu => {
                c0.is_long(0.7)
                    && ((c0.close == c0.high && c0.is_bullish()) || (c0.close == c0.low && c0.is_bearish()))
            }
            Pattern::ConcealBabySwallow => {
                let (c3, c2, c1) = (b.at(3), b.at(2), b.at(1));
                [c3, c2, c1, c0].iter().all(|c| c.is_bearish())
                    && c2.open < c3.low
                    && c1.open < c2.low
                    && c1.open == c1.high
                    && c0.open == c0.high
                    && c0.close > c1.close
            }
            Pattern::Counterattack => {
                let c1 = b.at(1);
                let opposite = (c0.is_bullish() && c1.is_bearish()) || (c0.is_bearish() && c1.is_bullish());
                opposite
                    && (c0.open - c1.close).abs() > c1.body_size() * 0.3
                    && (c0.close - c1.close).abs() <= c1.range() * 0.05
            }
            Pattern::DarkCloudCover => {
                let c1 = b.at(1);
                c1.is_bullish()
                    && strictly_long(c1, 0.6)
                    && c0.is_bearish()
                    && c0.open > c1.high
                    && c0.close < c1.midpoint()
                    && c0.close > c1.open
            }
            Pattern::Doji => c0.is_doji(),
            Pattern::DojiStar => {
                let c1 = b.at(1);
                c0.is_doji() && strictly_long(c1, 0.5) && (c0.low > c1.high || c0.high < c1.low)
            }
            Pattern::DragonflyDoji => {
                let range = c0.range();
                c0.is_doji() && c0.high - c0.close <= range * 0.05 && c0.open - c0.low >= c0.body_size() * 2.0
            }
            Pattern::Engulfing => {
                let c1 = b.at(1);
                let bull = c1.is_bearish() && c0.is_bullish() && c0.open < c1.close && c0.close > c1.open;
                let bear = c1.is_bullish() && c0.is_bearish() && c0.open > c1.close && c0.close < c1.open;
                bull || bear
            }
            Pattern::EveningDojiStar => {
                let (c2, c1) = (b.at(2), b.at(1));
                c1.is_doji()
                    && c2.is_bullish()
                    && c1.low > c2.high
                    && c0.is_bearish()
                    && c0.close < c2.midpoint()
            }
            Pattern::EveningStar => {
                let (c2, c1) = (b.at(2), b.at(1));
                c2.is_bullish()
                    && c1.body_size() <= c2.body_size() * 0.5
                    && c1.open > c2.high
                    && c0.is_bearish()
                    && c0.close < c2.midpoint()
            }
            Pattern::GapSideSideWhite => {
                let (c2, c1) = (b.at(2), b.at(1));
                let bodies = c0.body_size().max(c1.body_size());
                c1.is_bullish()
                    && c0.is_bullish()
                    && c1.open > c2.high
                    && (c0.open - c1.open).abs() <= tick
                    && (c0.body_size() - c1.body_size()).abs() <= bodies * 0.1
            }
            Pattern::GravestoneDoji => {
                let range = c0.range();
                c0.is_doji() && c0.open - c0.low <= range * 0.05 && c0.high - c0.close >= range * 0.7
            }
            Pattern::Hammer => hammer_shape(c0),
            Pattern::HangingMan => hammer_shape(c0) && c0.close / b.at(3).close - 1.0 > 0.0,
            Pattern::Harami => {
                let c1 = b.at(1);
                let opposite = (c1.is_bullish() && c0.is_bearish()) || (c1.is_bearish() && c0.is_bullish());
                opposite && body_inside(c0, c1)
            }
            Pattern::HaramiCross => c0.is_doji() && body_inside(c0, b.at(1)),
            Pattern::HighWave => {
                let body = c0.body_size();
                ratio_at_most(c0, 0.2) && c0.upper_wick() >= body * 1.5 && c0.lower_wick() >= body * 1.5
            }
            Pattern::Hikkake => {
                let (c3, c2, c1) = (b.at(3), b.at(2), b.at(1));
                let inside = c2.high < c3.high && c2.low > c3.low;
                let breakout = c1.high > c2.high || c1.low < c2.low;
                inside && breakout && between(c0.close, c2.low, c2.high)
            }
            Pattern::HikkakeMod => {
                let (c4, c3, c2) = (b.at(4), b.at(3), b.at(2));
                let inside = c3.high < c4.high && c3.low > c4.low;
                let breakout = c2.high > c3.high || c2.low < c3.low;
                let confirm = c0.high > c2.high || c0.low < c2.low;
                inside && breakout && confirm
            }
            Pattern::HomingPigeon => {
                let c1 = b.at(1);
                c1.is_bearish() && c0.is_bearish() && c0.open <= c1.open && c0.close >= c1.close
            }
            Pattern::IdenticalThreeCrows => {
                let (c2, c1) = (b.at(2), b.at(1));
                c2.is_bearish()
                    && c1.is_bearish()
                    && c0.is_bearish()
                    && (c1.open - c2.close).abs() <= tick
                    && (c0.open - c1.close).abs() <= tick
                    && c1.close < c2.close
                    && c0.close < c1.close
            }
            Pattern::InNeck => {
                let c1 = b.at(1);
                c1.is_bearish()
                    && c0.is_bullish()
                    && c0.open < c1.low
                    && between(c0.close, c1.low, c1.low + c1.body_size() * 0.25)
                    && c0.close < c1.open
            }
            Pattern::InvertedHammer => inverted_hammer_shape(c0) && c0.close / b.at(3).close - 1.0 < 0.0,
            Pattern::Kicking | Pattern::KickingByLength => kicking(b),
            Pattern::LadderBottom => {
                let (c4, c3, c2, c1) = (b.at(4), b.at(3), b.at(2), b.at(1));
                let falling = [c4, c3, c2].iter().all(|c| c.is_bearish() && strictly_long(c, 0.6));
                falling
                    && c3.low < c4.low
                    && c2.low < c3.low
                    && c3.high < c4.high
                    && c2.high < c3.high
                    && c1.is_bearish()
                    && small(c1, 0.3)
                    && c1.high < c2.low
                    && c0.is_bullish()
                    && c0.close > c1.high
            }
            Pattern::LongLeggedDoji => {
                let range = c0.range();
                c0.is_doji() && c0.upper_wick() >= range * 0.4 && c0.lower_wick() >= range * 0.4
            }
            Pattern::Marubozu => {
                c0.body_ratio().map_or(false, |r| r >= 0.7)
                    && ((c0.open == c0.low && c0.close == c0.high && c0.is_bullish())
                        || (c0.open == c0.high && c0.close == c0.low && c0.is_bearish()))
            }
            Pattern::MatchingLow => {
                let c1 = b.at(1);
                c1.is_bearish() && c0.is_bearish() && (c0.low - c1.low).abs() <= typical_range * 0.05
            }
            Pattern::MatHold => {
                let (c4, c3, c2, c1) = (b.at(4), b.at(3), b.at(2), b.at(1));
                strictly_long(c4, 0.6)
                    && c4.is_bullish()
                    && c3.open > c4.high
                    && small(c3, 0.4)
                    && c3.close < c4.close
                    && small(c2, 0.4)
                    && small(c1, 0.4)
                    && c2.close > c3.close
                    && c1.close > c2.close
                    && c1.close > c4.close
                    && c2.close > c4.close
                    && strictly_long(c0, 0.6)
                    && c0.is_bullish()
                    && c0.close > c4.high
            }
            Pattern::MorningDojiStar => {
                let (c2, c1) = (b.at(2), b.at(1));
                c1.is_doji()
                    && c2.is_bearish()
                    && c1.high < c2.low
                    && c0.is_bullish()
                    && c0.close > c2.midpoint()
            }
            Pattern::MorningStar => {
                let (c2, c1) = (b.at(2), b.at(1));
                c2.is_long(0.6)
                    && c2.is_bearish()
                    && small(c1, 0.5)
                    && c1.high < c2.low
                    && c0.is_long(0.6)
                    && c0.is_bullish()
                    && c0.close > c2.midpoint()
            }
            Pattern::OnNeck => {
                let c1 = b.at(1);
                c1.is_bearish()
                    && c1.is_long(0.6)
                    && c0.is_bullish()
                    && c0.open < c1.low
                    && (c0.close - c1.low).abs() <= tick
            }
            Pattern::Piercing => {
                let c1 = b.at(1);
                c1.is_bearish()
                    && c1.is_long(0.6)
                    && c0.is_bullish()
                    && c0.open < c1.low
                    && c0.close > c1.midpoint()
                    && c0.close < c1.open
            }
            Pattern::RickshawMan => {
                let range = c0.range();
                let mid = (c0.high + c0.low) / 2.0;
                c0.is_doji()
                    && c0.upper_wick() >= range * 0.4
                    && c0.lower_wick() >= range * 0.4
                    && (c0.open - mid).abs() <= range * 0.1
            }
            Pattern::RiseFallThreeMethods => {
                let (c4, c3, c2, c1) = (b.at(4), b.at(3), b.at(2), b.at(1));
                let frame = c4.is_long(0.6) && small(c3, 0.4) && small(c2, 0.4) && small(c1, 0.4) && c0.is_long(0.6);
                let bull = c4.is_bullish()
                    && c3.close < c4.close
                    && c2.close < c3.close
                    && c1.close < c2.close
                    && c3.open > c4.open
                    && c2.open > c4.open
                    && c1.open > c4.open
                    && c0.is_bullish()
                    && c0.close > c4.high;
                let bear = c4.is_bearish()
                    && c3.close > c4.close
                    && c2.close > c3.close
                    && c1.close > c2.close
                    && c3.open < c4.open
                    && c2.open < c4.open
                    && c1.open < c4.open
                    && c0.is_bearish()
                    && c0.close < c4.low;
                frame && (bull || bear)
            }
            Pattern::SeparatingLines => {
                let c1 = b.at(1);
                let same_colour = (c1.is_bullish() && c0.is_bullish()) || (c1.is_bearish() && c0.is_bearish());
                c1.is_long(0.6) && c0.is_long(0.6) && same_colour && (c0.open - c1.open).abs() <= tick
            }
            Pattern::ShortLine => {
                let range = c0.range();
                range > 0.0
                    && c0.body_size() / range <= 0.25
                    && c0.upper_wick() / range <= 0.25
                    && c0.lower_wick() / range <= 0.25
            }
            Pattern::SpinningTop => {
                let body = c0.body_size();
                c0.body_ratio().map_or(false, |r| (0.1..=0.4).contains(&r))
                    && c0.upper_wick() >= body
                    && c0.lower_wick() >= body
            }
            Pattern::StalledPattern => {
                let (c2, c1) = (b.at(2), b.at(1));
                c2.is_bullish()
                    && c2.is_long(0.5)
                    && c1.is_bullish()
                    && c1.is_long(0.5)
                    && c1.close > c2.close
                    && c1.open > c2.open
                    && c1.body_size() < c2.body_size()
                    && c0.is_bullish()
                    && small(c0, 0.3)
                    && c0.open > c1.close
            }
            Pattern::StickSandwich => {
                let (c2, c1) = (b.at(2), b.at(1));
                c2.is_bearish()
                    && c2.is_long(0.5)
                    && c1.is_bullish()
                    && c0.is_bearish()
                    && (c0.close - c2.close).abs() <= tick
            }
            Pattern::TasukiGap => {
                let (c2, c1) = (b.at(2), b.at(1));
                let bull = c2.is_bullish()
                    && c1.is_bullish()
                    && c1.open > c2.high
                    && c0.is_bearish()
                    && c0.open < c1.close
                    && c0.open > c2.open
                    && c0.close > c2.high;
                let bear = c2.is_bearish()
                    && c1.is_bearish()
                    && c1.open < c2.low
                    && c0.is_bullish()
                    && c0.open > c1.close
                    && c0.open < c2.open
                    && c0.close < c2.low;
                bull || bear
            }
            Pattern::Thrusting => {
                let c1 = b.at(1);
                c1.is_bearish()
                    && c1.is_long(0.6)
                    && c0.is_bullish()
                    && c0.open < c1.low
                    && between(c0.close, c1.close, c1.open)
                    && c0.close < c1.midpoint()
            }
            Pattern::Tristar => {
                let (c2, c1) = (b.at(2), b.at(1));
                let dojis = c2.is_doji() && c1.is_doji() && c0.is_doji();
                let stepping_down = c2.low > c1.high && c1.low > c0.high;
                let stepping_up = c2.high < c1.low && c1.high < c0.low;
                dojis && (stepping_down || stepping_up)
            }
            Pattern::UniqueThreeRiver => {
                let (c2, c1) = (b.at(2), b.at(1));
                let body1 = c1.body_size();
                let river_hammer = ratio_at_most(c1, 0.3)
                    && c1.lower_wick() >= body1 * 2.0
                    && c1.upper_wick() <= body1 * 0.2;
                c2.is_bearish()
                    && c2.is_long(0.6)
                    && river_hammer
                    && c1.open < c2.low
                    && c0.is_bearish()
                    && small(c0, 0.4)
                    && c0.open > c1.open
                    && c0.close > c1.close
                    && c0.close < c2.close
            }
            Pattern::UpsideGapTwoCrows => {
                let (c2, c1) = (b.at(2), b.at(1));
                c2.is_bullish()
                    && c1.open > c2.high
                    && c1.is_bearish()
                    && c0.is_bearish()
                    && c0.open > c1.open
                    && c0.close < c1.close
                    && c0.close > c2.close
            }
            Pattern::XSideGapThreeMethods => {
                let (c3, c2, c1) = (b.at(3), b.at(2), b.at(1));
                let bull = c3.is_bullish()
                    && c2.is_bullish()
                    && c2.open > c3.high
                    && c1.is_bearish()
                    && c0.is_bearish()
                    && c1.low > c3.high
                    && c0.low > c3.high
                    && c0.close > c1.low;
                let bear = c3.is_bearish()
                    && c2.is_bearish()
                    && c2.open < c3.low
                    && c1.is_bullish()
                    && c0.is_bullish()
                    && c1.high < c3.low
                    && c0.high < c3.low
                    && c0.close < c1.high;
                bull || bear
            }
        }
    }
}
