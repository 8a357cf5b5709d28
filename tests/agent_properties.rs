use ta_direction_agents::agents::SignalAgent;
use ta_direction_agents::error::AgentError;
use ta_direction_agents::indicators::{all_indicators, Family, Indicator, Overlap, PatternIndicator, Statistic};
use ta_direction_agents::ml::{FeatureFrame, LogisticModel};
use ta_direction_agents::registry::{build_agent, catalog};
use ta_direction_agents::types::{Bar, OhlcvFrame};
use ta_direction_agents::IndicatorAgent;

/// Deterministic noisy OHLCV walk with strictly positive ranges and volume.
fn synthetic_bars(n: usize, seed: u64) -> Vec<Bar> {
    let mut state = seed;
    let mut next = move || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((state >> 11) as f64) / ((1u64 << 53) as f64)
    };

    let mut bars = Vec::with_capacity(n);
    let mut prev_close = 100.0;
    for _ in 0..n {
        let open = prev_close * (1.0 + 0.006 * (next() - 0.5));
        let close = open * (1.0 + 0.02 * (next() - 0.5) + 0.0003);
        let high = open.max(close) * (1.0 + 0.004 * next() + 0.0005);
        let low = open.min(close) * (1.0 - 0.004 * next() - 0.0005);
        let volume = 1_000.0 + 800.0 * next();
        bars.push(Bar::ohlcv(open, high, low, close, volume));
        prev_close = close;
    }
    bars
}

fn history(n: usize) -> OhlcvFrame {
    OhlcvFrame::from_bars(&synthetic_bars(n, 7)).unwrap()
}

#[test]
fn test_feature_frames_drop_exactly_the_warmup() {
    for seed in 1..=10 {
        for n in [90, 157, 300] {
            let data = OhlcvFrame::from_bars(&synthetic_bars(n, seed)).unwrap();
            for indicator in all_indicators() {
                if data.len() <= indicator.warmup() {
                    continue;
                }
                let features = FeatureFrame::extract(indicator.as_ref(), &data).unwrap();
                assert_eq!(
                    features.len(),
                    data.len() - indicator.warmup(),
                    "{} kept {} of {} rows (seed {})",
                    indicator.name(),
                    features.len(),
                    n,
                    seed
                );
                assert!(
                    features.rows().iter().all(|v| v.is_finite()),
                    "{} produced a non-finite feature",
                    indicator.name()
                );
            }
        }
    }
}

#[test]
fn test_stoch_rsi_keeps_its_warmup_after_an_opening_rally() {
    // strictly rising start: no losses for the first 20 bars
    let mut bars = synthetic_bars(200, 5);
    for (i, bar) in bars.iter_mut().take(20).enumerate() {
        let px = 100.0 + i as f64;
        *bar = Bar::ohlcv(px - 0.2, px + 0.5, px - 0.5, px, 1_000.0);
    }
    let data = OhlcvFrame::from_bars(&bars).unwrap();
    for name in ["STOCHRSI", "STOCH_RSI_CLASSIC", "RSI_CLASSIC"] {
        let indicator = ta_direction_agents::indicators::find_indicator(name).unwrap();
        let features = FeatureFrame::extract(indicator.as_ref(), &data).unwrap();
        assert_eq!(features.start(), indicator.warmup(), "{}", name);
    }
}

#[test]
fn test_every_agent_scores_within_bounds_and_repeats() {
    let data = history(320);
    let price = data.last_close().unwrap();
    for entry in catalog() {
        let mut agent = build_agent(&entry.name).unwrap();
        agent
            .fit(&data)
            .unwrap_or_else(|e| panic!("{} failed to fit: {}", entry.name, e));
        let first = agent.predict(price, &data).unwrap();
        let second = agent.predict(price, &data).unwrap();
        assert!((-1.0..=1.0).contains(&first), "{} scored {}", entry.name, first);
        assert_eq!(first, second, "{} is not idempotent", entry.name);
    }
}

#[test]
fn test_independent_instances_agree() {
    let data = history(250);
    let price = data.last_close().unwrap();
    for name in ["RSI", "MACD", "BBANDS", "HT_SINE", "OBV", "CDLENGULFING", "ICHIMOKU", "NVI", "CUSUM_TREND"] {
        let mut a = build_agent(name).unwrap();
        let mut b = build_agent(name).unwrap();
        a.fit(&data).unwrap();
        b.fit(&data).unwrap();
        let (sa, sb) = (a.predict(price, &data).unwrap(), b.predict(price, &data).unwrap());
        assert!((sa - sb).abs() < 1e-12, "{}: {} vs {}", name, sa, sb);
    }
}

#[test]
fn test_even_odds_score_zero() {
    let json = r#"{
        "feature_names": ["a", "b"],
        "coefficients": [0.0, 0.0],
        "intercept": 0.0,
        "feature_means": [0.0, 0.0],
        "feature_stds": [1.0, 1.0]
    }"#;
    let model = LogisticModel::load_from_json(json).unwrap();
    let row = ndarray::arr1(&[3.0, -2.0]);
    assert_eq!(model.probability(row.view()), 0.5);
    assert_eq!(model.score(row.view()), 0.0);
}

#[test]
fn test_pattern_flags_ignore_the_current_bar() {
    let mut bars = synthetic_bars(200, 11);
    let patterns: Vec<Box<dyn Indicator>> = all_indicators()
        .into_iter()
        .filter(|i| i.family() == Family::Pattern)
        .collect();
    assert_eq!(patterns.len(), 58);

    let before = OhlcvFrame::from_bars(&bars).unwrap();
    // A wild final bar must not move its own flag.
    let last = bars.len() - 1;
    bars[last] = Bar::ohlcv(50.0, 300.0, 10.0, 250.0, 1e6);
    let after = OhlcvFrame::from_bars(&bars).unwrap();

    for pattern in &patterns {
        let a = pattern.compute(&before).unwrap();
        let b = pattern.compute(&after).unwrap();
        let (fa, fb) = (a[0][last], b[0][last]);
        assert!(
            fa == fb || (fa.is_nan() && fb.is_nan()),
            "{} flag changed with same-bar data",
            pattern.name()
        );
    }
}

#[test]
fn test_pattern_flag_is_previous_detection() {
    let bars = synthetic_bars(120, 3);
    let data = OhlcvFrame::from_bars(&bars).unwrap();
    let doji = PatternIndicator::new(ta_direction_agents::indicators::Pattern::Doji);
    let flags = &doji.compute(&data).unwrap()[0];
    assert!(flags[0].is_nan());
    assert!(flags[1..].iter().all(|&f| f == 0.0 || f == 1.0));
}

#[test]
fn test_short_history_is_rejected_on_both_paths() {
    let data = history(20);
    let mut agent = IndicatorAgent::new(Box::new(Statistic::LinearReg { period: 30 }));
    assert!(matches!(
        agent.fit(&data),
        Err(AgentError::InsufficientHistory { got: 20, .. })
    ));
    assert!(matches!(
        agent.predict(100.0, &data),
        Err(AgentError::InsufficientHistory { got: 20, .. })
    ));

    let mut cusum = build_agent("CUSUM_TREND").unwrap();
    cusum.fit(&history(3)).unwrap();
    assert!(matches!(
        cusum.predict(100.0, &history(3)),
        Err(AgentError::InsufficientHistory { .. })
    ));
}

#[test]
fn test_unfitted_agent_reports_short_history_past_warmup() {
    let data = history(34);
    let agent = IndicatorAgent::new(Box::new(Statistic::LinearReg { period: 30 }));
    assert!(data.len() > agent.indicator().warmup());
    assert!(matches!(
        agent.predict(100.0, &data),
        Err(AgentError::InsufficientHistory { got: 34, .. })
    ));
}

#[test]
fn test_flat_market_is_degenerate_for_range_indicators() {
    let bars: Vec<Bar> = (0..300).map(|_| Bar::ohlcv(20.0, 20.0, 20.0, 20.0, 500.0)).collect();
    let data = OhlcvFrame::from_bars(&bars).unwrap();
    for name in ["WILLR", "STOCH_OSC", "DONCHIAN_CHANNEL"] {
        let mut agent = build_agent(name).unwrap();
        let err = agent.fit(&data).unwrap_err();
        assert!(matches!(err, AgentError::Degenerate { .. }), "{}: {}", name, err);
    }
}

#[test]
fn test_rising_series_has_positive_ma_divergence() {
    let close: Vec<f64> = (1..=200).map(|i| i as f64).collect();
    let data = OhlcvFrame::from_close(close.clone());
    let ma = Overlap::Ma { period: 20 };

    let features = FeatureFrame::extract(&ma, &data).unwrap();
    for (i, row) in features.rows().outer_iter().enumerate() {
        let t = features.start() + i;
        let sma: f64 = close[t + 1 - 20..=t].iter().sum::<f64>() / 20.0;
        let expected = (close[t] - sma) / sma;
        assert!((row[0] - expected).abs() < 1e-12, "row {}", t);
        assert!(row[0] > 0.0);
    }

    let mut agent = IndicatorAgent::new(Box::new(ma));
    let report = agent.fit(&data).unwrap();
    assert_eq!(report.downs_in_data, 0);
    let score = agent.predict(200.0, &data).unwrap();
    assert!(score > 0.0 && score <= 1.0);
}
