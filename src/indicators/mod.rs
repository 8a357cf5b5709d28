pub mod classic;
pub mod cycle;
pub mod momentum;
pub mod overlap;
pub mod patterns;
pub mod series;
pub mod statistic;
pub mod volatility;
pub mod volume;

pub use classic::*;
pub use cycle::*;
pub use momentum::*;
pub use overlap::*;
pub use patterns::*;
pub use statistic::*;
pub use volatility::*;
pub use volume::*;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{Column, OhlcvFrame};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    Overlap,
    Momentum,
    Cycle,
    PriceTransform,
    Statistic,
    Volatility,
    Volume,
    Pattern,
    Trend,
    MoneyFlow,
    Risk,
    PriceDerived,
    Rule,
}

impl Family {
    pub fn as_str(&self) -> &'static str {
        match self {
            Family::Overlap => "overlap",
            Family::Momentum => "momentum",
            Family::Cycle => "cycle",
            Family::PriceTransform => "price_transform",
            Family::Statistic => "statistic",
            Family::Volatility => "volatility",
            Family::Volume => "volume",
            Family::Pattern => "pattern",
            Family::Trend => "trend",
            Family::MoneyFlow => "money_flow",
            Family::Risk => "risk",
            Family::PriceDerived => "price_derived",
            Family::Rule => "rule",
        }
    }
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Family {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "overlap" => Ok(Family::Overlap),
            "momentum" => Ok(Family::Momentum),
            "cycle" => Ok(Family::Cycle),
            "price_transform" => Ok(Family::PriceTransform),
            "statistic" => Ok(Family::Statistic),
            "volatility" => Ok(Family::Volatility),
            "volume" => Ok(Family::Volume),
            "pattern" => Ok(Family::Pattern),
            "trend" => Ok(Family::Trend),
            "money_flow" => Ok(Family::MoneyFlow),
            "risk" => Ok(Family::Risk),
            "price_derived" => Ok(Family::PriceDerived),
            "rule" => Ok(Family::Rule),
            other => Err(format!("unknown family '{}'", other)),
        }
    }
}

/// A pure feature transform over OHLCV history.
///
/// `compute` returns one column per feature name, each as long as the input,
/// with NaN wherever the value is undefined. Rows before `warmup` are never
/// used.
pub trait Indicator: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;
    fn family(&self) -> Family;
    fn columns(&self) -> &'static [Column];
    fn feature_names(&self) -> &'static [&'static str];
    /// Leading rows that cannot hold a defined feature row.
    fn warmup(&self) -> usize;
    /// Feature rows required before a classifier is trained.
    fn min_rows(&self) -> usize;
    fn compute(&self, data: &OhlcvFrame) -> Result<Vec<Vec<f64>>>;
}

/// `(close - line) / line`
pub fn divergence(close: &[f64], line: &[f64]) -> Vec<f64> {
    series::zip_map(close, line, |c, x| (c - x) / x)
}

/// Every indicator agent with its default parameters.
pub fn all_indicators() -> Vec<Box<dyn Indicator>> {
    let mut out: Vec<Box<dyn Indicator>> = Vec::new();
    out.extend(Overlap::all().into_iter().map(|i| Box::new(i) as Box<dyn Indicator>));
    out.extend(Momentum::all().into_iter().map(|i| Box::new(i) as Box<dyn Indicator>));
    out.extend(Cycle::all().into_iter().map(|i| Box::new(i) as Box<dyn Indicator>));
    out.extend(Statistic::all().into_iter().map(|i| Box::new(i) as Box<dyn Indicator>));
    out.extend(Volatility::all().into_iter().map(|i| Box::new(i) as Box<dyn Indicator>));
    out.push(Box::new(AvgPrice));
    out.extend(VolumeFlow::all().into_iter().map(|i| Box::new(i) as Box<dyn Indicator>));
    out.extend(Pattern::ALL.iter().map(|&p| Box::new(PatternIndicator::new(p)) as Box<dyn Indicator>));
    out.extend(Classic::all().into_iter().map(|i| Box::new(i) as Box<dyn Indicator>));
    out
}

/// Case-insensitive lookup by indicator name.
pub fn find_indicator(name: &str) -> Option<Box<dyn Indicator>> {
    all_indicators()
        .into_iter()
        .find(|i| i.name().eq_ignore_ascii_case(name))
}
