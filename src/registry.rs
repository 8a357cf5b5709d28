//! Catalogue of every agent the crate ships, with the holding horizon (in
//! days) each one is tuned for.

use serde::{Deserialize, Serialize};

use crate::agents::cusum::CUSUM_TREND;
use crate::agents::{CusumOptions, CusumTrendAgent, IndicatorAgent, SignalAgent};
use crate::config::Settings;
use crate::error::{AgentError, Result};
use crate::indicators::{all_indicators, find_indicator, Family, Indicator};
use crate::ml::SolverOptions;
use crate::types::Column;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub family: Family,
    pub ideal_period: u32,
    pub columns: Vec<Column>,
    pub features: Vec<String>,
    pub min_rows: usize,
}

impl CatalogEntry {
    fn from_indicator(indicator: &dyn Indicator) -> Self {
        Self {
            name: indicator.name().to_string(),
            family: indicator.family(),
            ideal_period: ideal_period(indicator.name()).unwrap_or(1),
            columns: indicator.columns().to_vec(),
            features: indicator.feature_names().iter().map(|s| s.to_string()).collect(),
            min_rows: indicator.min_rows(),
        }
    }
}

pub fn catalog() -> Vec<CatalogEntry> {
    let mut entries: Vec<CatalogEntry> = all_indicators()
        .iter()
        .map(|i| CatalogEntry::from_indicator(i.as_ref()))
        .collect();
    entries.push(CatalogEntry {
        name: CUSUM_TREND.to_string(),
        family: Family::Rule,
        ideal_period: 1,
        columns: vec![Column::Close],
        features: Vec::new(),
        min_rows: CusumOptions::default().min_rows,
    });
    entries
}

/// Builds an agent with default solver and CUSUM settings.
pub fn build_agent(name: &str) -> Result<Box<dyn SignalAgent>> {
    build_agent_with(name, &SolverOptions::default(), &CusumOptions::default())
}

pub fn build_agent_from_settings(name: &str, settings: &Settings) -> Result<Box<dyn SignalAgent>> {
    build_agent_with(name, &settings.classifier, &settings.cusum)
}

/// Names match case-insensitively, with or without an `_Agent` suffix.
pub fn build_agent_with(
    name: &str,
    solver: &SolverOptions,
    cusum: &CusumOptions,
) -> Result<Box<dyn SignalAgent>> {
    let key = normalise_name(name);
    if key.eq_ignore_ascii_case(CUSUM_TREND) {
        return Ok(Box::new(CusumTrendAgent::new(*cusum)));
    }
    let indicator = find_indicator(key).ok_or_else(|| AgentError::UnknownAgent {
        name: name.to_string(),
    })?;
    Ok(Box::new(IndicatorAgent::new(indicator).with_options(*solver)))
}

/// Strips surrounding whitespace and an `_Agent` suffix.
pub fn normalise_name(name: &str) -> &str {
    let name = name.trim();
    let cut = name.len().saturating_sub("_agent".len());
    match name.get(cut..) {
        Some(suffix) if suffix.eq_ignore_ascii_case("_agent") => &name[..cut],
        _ => name,
    }
}

pub fn ideal_period(name: &str) -> Option<u32> {
    let period = match name {
        // Overlap studies
        "BBANDS" => 20,
        "DEMA" | "EMA" | "MA" | "TEMA" | "TRIMA" | "WMA" => 21,
        "HT_TRENDLINE" | "MAVP" => 7,
        "KAMA" => 20,
        "MAMA" | "SAR" => 1,
        "MIDPOINT" => 14,
        "T3" => 5,

        // Momentum
        "ADX" | "ADXR" | "AROON" | "AROONOSC" | "CMO" | "DX" | "MINUS_DI" | "MINUS_DM" | "PLUS_DM" => 14,
        "STOCH" | "STOCHF" | "STOCHRSI" | "WILLR" => 14,
        "APO" | "MACD" | "MACDEXT" | "MACDFIX" | "PPO" => 12,
        "BOP" | "SAREXT" => 1,
        "CCI" => 20,
        "MFI" | "ROC" | "RSI" => 40,
        "MOM" | "ROCP" | "ROCR" => 10,
        "TRIX" => 45,
        "ULTOSC" => 28,

        // Cycle
        "HT_DCPERIOD" | "HT_DCPHASE" | "HT_PHASOR" | "HT_SINE" | "HT_TRENDMODE" => 7,

        // Price transform, statistics, volatility, volume
        "AVGPRICE" | "TRANGE" | "AD" => 1,
        "BETA" | "CORREL" | "OBV" => 21,
        "LINEARREG" | "TSF" => 30,
        "LINEARREG_ANGLE" | "LINEARREG_INTERCEPT" | "LINEARREG_SLOPE" => 14,
        "STDDEV" | "VAR" => 20,
        "ATR" | "NATR" => 14,
        "ADOSC" => 3,

        // Candlestick patterns
        "CDLBELTHOLD" | "CDLCLOSINGMARUBOZU" | "CDLDOJI" | "CDLDRAGONFLYDOJI" | "CDLGRAVESTONEDOJI"
        | "CDLHAMMER" | "CDLHANGINGMAN" | "CDLHIGHWAVE" | "CDLINVERTEDHAMMER" | "CDLLONGLEGGEDDOJI"
        | "CDLMARUBOZU" | "CDLRICKSHAWMAN" | "CDLSHORTLINE" | "CDLSPINNINGTOP" => 1,
        "CDL2CROWS" | "CDLCOUNTERATTACK" | "CDLDARKCLOUDCOVER" | "CDLDOJISTAR" | "CDLENGULFING"
        | "CDLHARAMI" | "CDLHARAMICROSS" | "CDLHOMINGPIGEON" | "CDLINNECK" | "CDLKICKING"
        | "CDLKICKINGBYLENGTH" | "CDLMATCHINGLOW" | "CDLONNECK" | "CDLPIERCING" | "CDLSEPARATINGLINES"
        | "CDLTHRUSTING" => 2,
        "CDL3BLACKCROWS" | "CDL3INSIDE" | "CDL3OUTSIDE" | "CDL3STARSINSOUTH" | "CDL3WHITESOLDIERS"
        | "CDLABANDONEDBABY" | "CDLADVANCEBLOCK" | "CDLEVENINGDOJISTAR" | "CDLEVENINGSTAR"
        | "CDLGAPSIDESIDEWHITE" | "CDLHIKKAKE" | "CDLHIKKAKEMOD" | "CDLIDENTICAL3CROWS"
        | "CDLMORNINGDOJISTAR" | "CDLMORNINGSTAR" | "CDLSTALLEDPATTERN" | "CDLSTICKSANDWICH"
        | "CDLTASUKIGAP" | "CDLTRISTAR" | "CDLUNIQUE3RIVER" | "CDLUPSIDEGAP2CROWS" => 3,
        "CDL3LINESTRIKE" | "CDLCONCEALBABYSWALL" => 4,
        "CDLBREAKAWAY" | "CDLLADDERBOTTOM" | "CDLMATHOLD" | "CDLRISEFALL3METHODS" | "CDLXSIDEGAP3METHODS" => 5,

        // Second collection
        "AWESOME_OSCILLATOR" => 34,
        "PPO_CLASSIC" | "PVO" => 12,
        "ROC_CLASSIC" | "RSI_CLASSIC" | "MFI_CLASSIC" | "EOM" | "FORCE_INDEX" | "VORTEX" | "ULCER_INDEX" => 40,
        "STOCH_OSC" | "STOCH_RSI_CLASSIC" => 14,
        "ULTIMATE_OSC" => 28,
        "TSI" => 25,
        "ADI" | "VPT" => 1,
        "CMF" | "CCI_CLASSIC" | "DPO" | "DONCHIAN_CHANNEL" | "KELTNER_CHANNEL" | "DAILY_LOG_RETURN" => 55,
        "NVI" => 252,
        "OBV_CLASSIC" | "CUMULATIVE_RETURN" => 21,
        "VWAP" => 75,
        "AROON_CLASSIC" | "MASS_INDEX" => 65,
        "ICHIMOKU" => 120,
        "KST" | "STC" => 19,
        "TRIX_CLASSIC" => 45,

        "CUSUM_TREND" => 1,
        _ => return None,
    };
    Some(period)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_covers_every_agent() {
        let entries = catalog();
        assert_eq!(entries.len(), 155);
        let names: HashSet<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names.len(), entries.len());
        assert!(names.contains("CUSUM_TREND"));
    }

    #[test]
    fn test_every_agent_has_an_ideal_period() {
        for entry in catalog() {
            assert!(ideal_period(&entry.name).is_some(), "{} has no ideal period", entry.name);
        }
        assert_eq!(ideal_period("CCI"), Some(20));
        assert_eq!(ideal_period("CCI_CLASSIC"), Some(55));
        assert_eq!(ideal_period("NVI"), Some(252));
        assert_eq!(ideal_period("CDLHANGINGMAN"), Some(1));
        assert_eq!(ideal_period("CDLBREAKAWAY"), Some(5));
        assert_eq!(ideal_period("NOPE"), None);
    }

    #[test]
    fn test_build_agent_accepts_suffix_and_case() {
        assert_eq!(build_agent("rsi").unwrap().name(), "RSI");
        assert_eq!(build_agent("RSI_Agent").unwrap().name(), "RSI");
        assert_eq!(build_agent("cdldoji_agent").unwrap().name(), "CDLDOJI");
        assert_eq!(build_agent("Cusum_Trend_Agent").unwrap().name(), "CUSUM_TREND");
        assert_eq!(build_agent("Vortex_Agent").unwrap().name(), "VORTEX");
        assert_eq!(build_agent("rsi_classic").unwrap().name(), "RSI_CLASSIC");
    }

    #[test]
    fn test_second_collection_families() {
        let family = |name: &str| catalog().into_iter().find(|e| e.name == name).map(|e| e.family);
        assert_eq!(family("ICHIMOKU"), Some(Family::Trend));
        assert_eq!(family("VWAP"), Some(Family::MoneyFlow));
        assert_eq!(family("ULCER_INDEX"), Some(Family::Risk));
        assert_eq!(family("DAILY_LOG_RETURN"), Some(Family::PriceDerived));
        assert_eq!(family("TSI"), Some(Family::Momentum));
    }

    #[test]
    fn test_build_agent_rejects_unknown_names() {
        let err = build_agent("NOT_AN_AGENT").err().unwrap();
        assert!(matches!(err, AgentError::UnknownAgent { .. }));
        assert!(build_agent("_Agent").is_err());
    }

    #[test]
    fn test_fresh_agents_are_unfitted_except_rules() {
        assert!(!build_agent("EMA").unwrap().is_fitted());
        assert!(build_agent("CUSUM_TREND").unwrap().is_fitted());
    }

    #[test]
    fn test_catalog_entry_serializes() {
        let entry = catalog().into_iter().find(|e| e.name == "SAR").unwrap();
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"family\":\"overlap\""));
        assert!(json.contains("\"high\""));
    }
}
