//! Candlestick pattern agents. Every pattern yields the same two features:
//! a 0/1 flag for the pattern completing on the previous bar, and the
//! three-bar rate of change of the close.

mod detect;

pub use detect::Bars;

use serde::{Deserialize, Serialize};

use super::series::{self, NAN};
use super::{Family, Indicator};
use crate::error::Result;
use crate::types::{Candle, Column, OhlcvFrame};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pattern {
    TwoCrows,
    ThreeBlackCrows,
    ThreeInside,
    ThreeLineStrike,
    ThreeOutside,
    ThreeStarsInSouth,
    ThreeWhiteSoldiers,
    AbandonedBaby,
    AdvanceBlock,
    BeltHold,
    Breakaway,
    ClosingMarubozu,
    ConcealBabySwallow,
    Counterattack,
    DarkCloudCover,
    Doji,
    DojiStar,
    DragonflyDoji,
    Engulfing,
    EveningDojiStar,
    EveningStar,
    GapSideSideWhite,
    GravestoneDoji,
    Hammer,
    HangingMan,
    Harami,
    HaramiCross,
    HighWave,
    Hikkake,
    HikkakeMod,
    HomingPigeon,
    IdenticalThreeCrows,
    InNeck,
    InvertedHammer,
    Kicking,
    KickingByLength,
    LadderBottom,
    LongLeggedDoji,
    Marubozu,
    MatchingLow,
    MatHold,
    MorningDojiStar,
    MorningStar,
    OnNeck,
    Piercing,
    RickshawMan,
    RiseFallThreeMethods,
    SeparatingLines,
    ShortLine,
    SpinningTop,
    StalledPattern,
    StickSandwich,
    TasukiGap,
    Thrusting,
    Tristar,
    UniqueThreeRiver,
    UpsideGapTwoCrows,
    XSideGapThreeMethods,
}

impl Pattern {
    pub const ALL: [Pattern; 58] = [
        Pattern::TwoCrows,
        Pattern::ThreeBlackCrows,
        Pattern::ThreeInside,
        Pattern::ThreeLineStrike,
        Pattern::ThreeOutside,
        Pattern::ThreeStarsInSouth,
        Pattern::ThreeWhiteSoldiers,
        Pattern::AbandonedBaby,
        Pattern::AdvanceBlock,
        Pattern::BeltHold,
        Pattern::Breakaway,
        Pattern::ClosingMarubozu,
        Pattern::ConcealBabySwallow,
        Pattern::Counterattack,
        Pattern::DarkCloudCover,
        Pattern::Doji,
        Pattern::DojiStar,
        Pattern::DragonflyDoji,
        Pattern::Engulfing,
        Pattern::EveningDojiStar,
        Pattern::EveningStar,
        Pattern::GapSideSideWhite,
        Pattern::GravestoneDoji,
        Pattern::Hammer,
        Pattern::HangingMan,
        Pattern::Harami,
        Pattern::HaramiCross,
        Pattern::HighWave,
        Pattern::Hikkake,
        Pattern::HikkakeMod,
        Pattern::HomingPigeon,
        Pattern::IdenticalThreeCrows,
        Pattern::InNeck,
        Pattern::InvertedHammer,
        Pattern::Kicking,
        Pattern::KickingByLength,
        Pattern::LadderBottom,
        Pattern::LongLeggedDoji,
        Pattern::Marubozu,
        Pattern::MatchingLow,
        Pattern::MatHold,
        Pattern::MorningDojiStar,
        Pattern::MorningStar,
        Pattern::OnNeck,
        Pattern::Piercing,
        Pattern::RickshawMan,
        Pattern::RiseFallThreeMethods,
        Pattern::SeparatingLines,
        Pattern::ShortLine,
        Pattern::SpinningTop,
        Pattern::StalledPattern,
        Pattern::StickSandwich,
        Pattern::TasukiGap,
        Pattern::Thrusting,
        Pattern::Tristar,
        Pattern::UniqueThreeRiver,
        Pattern::UpsideGapTwoCrows,
        Pattern::XSideGapThreeMethods,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Pattern::TwoCrows => "CDL2CROWS",
            Pattern::ThreeBlackCrows => "CDL3BLACKCROWS",
            Pattern::ThreeInside => "CDL3INSIDE",
            Pattern::ThreeLineStrike => "CDL3LINESTRIKE",
            Pattern::ThreeOutside => "CDL3OUTSIDE",
            Pattern::ThreeStarsInSouth => "CDL3STARSINSOUTH",
            Pattern::ThreeWhiteSoldiers => "CDL3WHITESOLDIERS",
            Pattern::AbandonedBaby => "CDLABANDONEDBABY",
            Pattern::AdvanceBlock => "CDLADVANCEBLOCK",
            Pattern::BeltHold => "CDLBELTHOLD",
            Pattern::Breakaway => "CDLBREAKAWAY",
            Pattern::ClosingMarubozu => "CDLCLOSINGMARUBOZU",
            Pattern::ConcealBabySwallow => "CDLCONCEALBABYSWALL",
            Pattern::Counterattack => "CDLCOUNTERATTACK",
            Pattern::DarkCloudCover => "CDLDARKCLOUDCOVER",
            Pattern::Doji => "CDLDOJI",
            Pattern::DojiStar => "CDLDOJISTAR",
            Pattern::DragonflyDoji => "CDLDRAGONFLYDOJI",
            Pattern::Engulfing => "CDLENGULFING",
            Pattern::EveningDojiStar => "CDLEVENINGDOJISTAR",
            Pattern::EveningStar => "CDLEVENINGSTAR",
            Pattern::GapSideSideWhite => "CDLGAPSIDESIDEWHITE",
            Pattern::GravestoneDoji => "CDLGRAVESTONEDOJI",
            Pattern::Hammer => "CDLHAMMER",
            Pattern::HangingMan => "CDLHANGINGMAN",
            Pattern::Harami => "CDLHARAMI",
            Pattern::HaramiCross => "CDLHARAMICROSS",
            Pattern::HighWave => "CDLHIGHWAVE",
            Pattern::Hikkake => "CDLHIKKAKE",
            Pattern::HikkakeMod => "CDLHIKKAKEMOD",
            Pattern::HomingPigeon => "CDLHOMINGPIGEON",
            Pattern::IdenticalThreeCrows => "CDLIDENTICAL3CROWS",
            Pattern::InNeck => "CDLINNECK",
            Pattern::InvertedHammer => "CDLINVERTEDHAMMER",
            Pattern::Kicking => "CDLKICKING",
            Pattern::KickingByLength => "CDLKICKINGBYLENGTH",
            Pattern::LadderBottom => "CDLLADDERBOTTOM",
            Pattern::LongLeggedDoji => "CDLLONGLEGGEDDOJI",
            Pattern::Marubozu => "CDLMARUBOZU",
            Pattern::MatchingLow => "CDLMATCHINGLOW",
            Pattern::MatHold => "CDLMATHOLD",
            Pattern::MorningDojiStar => "CDLMORNINGDOJISTAR",
            Pattern::MorningStar => "CDLMORNINGSTAR",
            Pattern::OnNeck => "CDLONNECK",
            Pattern::Piercing => "CDLPIERCING",
            Pattern::RickshawMan => "CDLRICKSHAWMAN",
            Pattern::RiseFallThreeMethods => "CDLRISEFALL3METHODS",
            Pattern::SeparatingLines => "CDLSEPARATINGLINES",
            Pattern::ShortLine => "CDLSHORTLINE",
            Pattern::SpinningTop => "CDLSPINNINGTOP",
            Pattern::StalledPattern => "CDLSTALLEDPATTERN",
            Pattern::StickSandwich => "CDLSTICKSANDWICH",
            Pattern::TasukiGap => "CDLTASUKIGAP",
            Pattern::Thrusting => "CDLTHRUSTING",
            Pattern::Tristar => "CDLTRISTAR",
            Pattern::UniqueThreeRiver => "CDLUNIQUE3RIVER",
            Pattern::UpsideGapTwoCrows => "CDLUPSIDEGAP2CROWS",
            Pattern::XSideGapThreeMethods => "CDLXSIDEGAP3METHODS",
        }
    }

    /// Candles the pattern looks at, the evaluated bar included.
    pub fn bars(&self) -> usize {
        use Pattern::*;
        match self {
            BeltHold | ClosingMarubozu | Doji | DragonflyDoji | GravestoneDoji | Hammer
            | HighWave | LongLeggedDoji | Marubozu | RickshawMan | ShortLine | SpinningTop => 1,
            Counterattack | DarkCloudCover | DojiStar | Engulfing | Harami | HaramiCross
            | HomingPigeon | InNeck | Kicking | KickingByLength | MatchingLow | OnNeck
            | Piercing | SeparatingLines | Thrusting => 2,
            TwoCrows | ThreeBlackCrows | ThreeInside | ThreeOutside | ThreeStarsInSouth
            | ThreeWhiteSoldiers | AbandonedBaby | AdvanceBlock | EveningDojiStar | EveningStar
            | GapSideSideWhite | IdenticalThreeCrows | MorningDojiStar | MorningStar
            | StalledPattern | StickSandwich | TasukiGap | Tristar | UniqueThreeRiver
            | UpsideGapTwoCrows => 3,
            // the two trend-qualified hammers compare against the close three bars back
            ThreeLineStrike | ConcealBabySwallow | Hikkake | XSideGapThreeMethods | HangingMan
            | InvertedHammer => 4,
            Breakaway | HikkakeMod | LadderBottom | MatHold | RiseFallThreeMethods => 5,
        }
    }

    /// Feature rows required before the classifier is trained. Rarer
    /// patterns ask for more history.
    pub fn min_rows(&self) -> usize {
        use Pattern::*;
        match self {
            Doji | DragonflyDoji | Engulfing | GravestoneDoji | Hammer | HangingMan | Harami
            | HaramiCross | HighWave | InvertedHammer | Marubozu | RickshawMan | ShortLine
            | SpinningTop => 30,
            TwoCrows | ThreeBlackCrows | ThreeInside | ThreeWhiteSoldiers | BeltHold
            | ClosingMarubozu | Counterattack | DojiStar | GapSideSideWhite | HomingPigeon
            | InNeck | LongLeggedDoji | MatchingLow | OnNeck | SeparatingLines => 40,
            ThreeLineStrike | ThreeOutside | DarkCloudCover | IdenticalThreeCrows | Kicking
            | KickingByLength | Piercing | Thrusting => 50,
            ThreeStarsInSouth | AbandonedBaby | AdvanceBlock | EveningDojiStar | EveningStar
            | Hikkake | MorningDojiStar | MorningStar | StickSandwich | UpsideGapTwoCrows => 60,
            HikkakeMod => 70,
            StalledPattern | TasukiGap | XSideGapThreeMethods => 80,
            Tristar => 90,
            Breakaway | UniqueThreeRiver => 100,
            ConcealBabySwallow | LadderBottom => 120,
            MatHold | RiseFallThreeMethods => 150,
        }
    }

    /// Whether the pattern completes on each bar. Bars without enough
    /// history never match.
    pub fn scan(&self, candles: &[Candle]) -> Vec<bool> {
        let ranges: Vec<f64> = candles.iter().map(|c| c.range()).collect();
        let medians = expanding_median(&ranges);
        (0..candles.len())
            .map(|t| {
                if t + 1 < self.bars() {
                    return false;
                }
                self.detect(&Bars::new(candles, t), medians[t])
            })
            .collect()
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Median of every value up to and including each position. NaN inputs
/// are skipped.
fn expanding_median(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = Vec::with_capacity(values.len());
    values
        .iter()
        .map(|&v| {
            if !v.is_nan() {
                let at = sorted.partition_point(|&x| x < v);
                sorted.insert(at, v);
            }
            let n = sorted.len();
            match n {
                0 => NAN,
                _ if n % 2 == 1 => sorted[n / 2],
                _ => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0,
            }
        })
        .collect()
}

/// Adapts a [`Pattern`] to the [`Indicator`] interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternIndicator {
    pattern: Pattern,
}

impl PatternIndicator {
    pub fn new(pattern: Pattern) -> Self {
        Self { pattern }
    }

    pub fn pattern(&self) -> Pattern {
        self.pattern
    }
}

impl Indicator for PatternIndicator {
    fn name(&self) -> &'static str {
        self.pattern.name()
    }

    fn family(&self) -> Family {
        Family::Pattern
    }

    fn columns(&self) -> &'static [Column] {
        &[Column::Open, Column::High, Column::Low, Column::Close]
    }

    fn feature_names(&self) -> &'static [&'static str] {
        &["flag", "roc_3"]
    }

    fn warmup(&self) -> usize {
        self.pattern.bars().max(3)
    }

    fn min_rows(&self) -> usize {
        self.pattern.min_rows()
    }

    fn compute(&self, data: &OhlcvFrame) -> Result<Vec<Vec<f64>>> {
        let candles = data.candles(self.name())?;
        let close = data.require(Column::Close, self.name())?;
        let hits = self.pattern.scan(&candles);

        // The flag at t reports the bar ending at t - 1.
        let bars = self.pattern.bars();
        let flag = (0..hits.len())
            .map(|t| {
                if t < bars {
                    NAN
                } else if hits[t - 1] {
                    1.0
                } else {
                    0.0
                }
            })
            .collect();
        Ok(vec![flag, series::pct_change(close, 3)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_pattern_names_unique() {
        let names: HashSet<_> = Pattern::ALL.iter().map(|p| p.name()).collect();
        assert_eq!(names.len(), 58);
        assert!(Pattern::ALL.iter().all(|p| p.name().starts_with("CDL")));
    }

    #[test]
    fn test_expanding_median() {
        let out = expanding_median(&[3.0, 1.0, NAN, 2.0, 10.0]);
        assert_eq!(out, vec![3.0, 2.0, 2.0, 2.0, 2.5]);
    }

    #[test]
    fn test_flag_is_shifted_one_bar() {
        // bar 4 is an exact doji
        let open = vec![10.0; 7];
        let close = vec![11.0, 11.0, 11.0, 11.0, 10.0, 11.0, 11.0];
        let high = vec![11.5; 7];
        let low = vec![9.5; 7];
        let frame = OhlcvFrame::from_ohlcv(open, high, low, close, vec![1.0; 7]).unwrap();
        let doji = PatternIndicator::new(Pattern::Doji);
        let cols = doji.compute(&frame).unwrap();
        assert!(cols[0][0].is_nan());
        assert_eq!(cols[0][4], 0.0);
        assert_eq!(cols[0][5], 1.0);
        assert_eq!(cols[0][6], 0.0);
    }

    #[test]
    fn test_scan_respects_history() {
        let candles = vec![
            Candle::new(12.0, 12.2, 9.8, 10.0),
            Candle::new(9.5, 13.0, 9.4, 12.5),
        ];
        let hits = Pattern::Engulfing.scan(&candles);
        assert_eq!(hits, vec![false, true]);
        // two-crows needs three candles
        assert_eq!(Pattern::TwoCrows.scan(&candles), vec![false, false]);
    }

    #[test]
    fn test_pattern_warmup_covers_roc() {
        assert_eq!(PatternIndicator::new(Pattern::Doji).warmup(), 3);
        assert_eq!(PatternIndicator::new(Pattern::MatHold).warmup(), 5);
    }
}
