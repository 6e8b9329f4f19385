//! Integration tests for the scoring engine

use ruster_score::core::{eoa, holders, permission};
use ruster_score::models::types::{
    AnalyzerResult, DataSourceTag, RiskLevel, RiskTag, ScoreMode, ScoreResult, TokenHolder,
};
use ruster_score::utils::constants::{
    EOA_MAX_SCORE, HOLDER_MAX_SCORE, PERMISSION_MAX_SCORE, UNKNOWN_PERCENTAGE,
};

fn holder(address: &str, balance: f64, percentage: f64) -> TokenHolder {
    TokenHolder {
        address: address.to_string(),
        balance: format!("{}", balance),
        balance_formatted: balance,
        percentage,
        rank: 0,
        is_contract: false,
    }
}

// ============================================
// Scenario A: one address holds 100%
// ============================================

#[test]
fn test_scenario_a_single_whale() {
    let holders = vec![holder("0xwhale", 1_000_000.0, 100.0)];
    let p = holders::top10_percentage(&holders);

    assert_eq!(p, 100.0);
    assert_eq!(holders::calculate_score(p), 3.0);
    assert_eq!(holders::risk_level(p), RiskLevel::ExtremeRisk);
    assert_eq!(
        RiskTag::for_holder(holders::risk_level(p)),
        Some(RiskTag::ExtremeConcentration)
    );
}

// ============================================
// Scenario B: 500 unique EOAs in a 1-hour window
// ============================================

#[test]
fn test_scenario_b_high_activity() {
    let normalized = 500.0 / 1.0;
    assert_eq!(eoa::calculate_score(normalized), 40.0);
    assert_eq!(eoa::risk_level(normalized), RiskLevel::LowRisk);
}

// ============================================
// Scenario C: ownerless, clean, non-proxy contract
// ============================================

#[test]
fn test_scenario_c_safest_contract() {
    let owner = permission::OwnerCheck {
        has_owner: false,
        owner_address: None,
        is_renounced: false,
        is_multisig: false,
        check_failed: false,
    };
    let selectors = permission::SelectorCheck {
        matches: vec![],
        check_failed: false,
    };
    let proxy = permission::ProxyCheck {
        is_proxy: false,
        implementation: None,
        admin: None,
        check_failed: false,
    };

    let (score, _) = permission::score_checks(&owner, &selectors, &proxy);
    assert_eq!(score, 30.0);
    assert_eq!(permission::risk_level(score), RiskLevel::LowRisk);
}

// ============================================
// Scenario D: one dimension exhausts its sources
// ============================================

#[test]
fn test_scenario_d_degraded_dimension_keeps_siblings() {
    // The fast provider rate-limited every retry for EOA; the siblings
    // completed normally. The aggregate still assembles, the dead dimension
    // contributes zero and is tagged as an error source.
    let degraded = AnalyzerResult::degraded(EOA_MAX_SCORE, "Rate limited (HTTP 429)");
    assert_eq!(degraded.data_source, DataSourceTag::Error);
    assert_eq!(degraded.score, 0.0);

    let holder_result = AnalyzerResult::new(
        25.0,
        HOLDER_MAX_SCORE,
        RiskLevel::MediumRisk,
        DataSourceTag::Fast,
        serde_json::json!({}),
    );
    let permission_result = AnalyzerResult::new(
        30.0,
        PERMISSION_MAX_SCORE,
        RiskLevel::LowRisk,
        DataSourceTag::Deep,
        serde_json::json!({}),
    );

    let result = ScoreResult::assemble(
        "0xtoken".to_string(),
        ScoreMode::Fast,
        None,
        degraded,
        holder_result,
        permission_result,
    );

    assert_eq!(result.total_score, 55.0);
    assert_eq!(result.data_sources.eoa, DataSourceTag::Error);
    assert_eq!(result.data_sources.holder, DataSourceTag::Fast);
    // Unknown dimension emits no tag; the siblings still do
    assert_eq!(
        result.risk_tags,
        vec![RiskTag::Concentrated, RiskTag::SafeContract]
    );
}

// ============================================
// Scenario E: total 68 lands in the medium band
// ============================================

#[test]
fn test_scenario_e_total_68_is_medium() {
    let result = ScoreResult::assemble(
        "0xtoken".to_string(),
        ScoreMode::Auto,
        None,
        AnalyzerResult::new(
            30.0,
            EOA_MAX_SCORE,
            RiskLevel::MediumRisk,
            DataSourceTag::Fast,
            serde_json::json!({}),
        ),
        AnalyzerResult::new(
            20.0,
            HOLDER_MAX_SCORE,
            RiskLevel::MediumRisk,
            DataSourceTag::Fast,
            serde_json::json!({}),
        ),
        AnalyzerResult::new(
            18.0,
            PERMISSION_MAX_SCORE,
            RiskLevel::MediumRisk,
            DataSourceTag::Deep,
            serde_json::json!({}),
        ),
    );

    assert_eq!(result.total_score, 68.0);
    assert_eq!(result.risk_level, RiskLevel::MediumRisk);
}

// ============================================
// Cross-dimension properties
// ============================================

#[test]
fn test_total_always_in_bounds() {
    // Even with every dimension reporting past its max before clamping,
    // the assembled total stays within [0, 100]
    let maxed = ScoreResult::assemble(
        "0xtoken".to_string(),
        ScoreMode::Deep,
        None,
        AnalyzerResult::new(
            999.0,
            EOA_MAX_SCORE,
            RiskLevel::LowRisk,
            DataSourceTag::Deep,
            serde_json::json!({}),
        ),
        AnalyzerResult::new(
            999.0,
            HOLDER_MAX_SCORE,
            RiskLevel::LowRisk,
            DataSourceTag::Deep,
            serde_json::json!({}),
        ),
        AnalyzerResult::new(
            999.0,
            PERMISSION_MAX_SCORE,
            RiskLevel::LowRisk,
            DataSourceTag::Deep,
            serde_json::json!({}),
        ),
    );
    assert_eq!(maxed.total_score, 100.0);
    assert_eq!(maxed.risk_level, RiskLevel::LowRisk);
}

#[test]
fn test_holder_score_monotone_nonincreasing_in_concentration() {
    let mut prev = f64::INFINITY;
    for p in 0..=100 {
        let score = holders::calculate_score(p as f64);
        assert!(score <= prev, "score increased at p={}", p);
        assert!((3.0..=30.0).contains(&score));
        prev = score;
    }
}

#[test]
fn test_eoa_score_continuity_at_boundaries() {
    // High-risk formula at exactly 50 equals the medium-band start
    let below = eoa::calculate_score(49.999_999);
    let at = eoa::calculate_score(50.0);
    assert!((at - below).abs() < 1e-3);
    assert_eq!(at, 20.0);

    // Medium formula reaches exactly 40 at the 300 boundary
    let near = eoa::calculate_score(299.999_999);
    assert!((eoa::calculate_score(300.0) - near).abs() < 1e-3);
    assert_eq!(eoa::calculate_score(300.0), 40.0);
    assert_eq!(eoa::calculate_score(100_000.0), 40.0);
}

#[test]
fn test_unknown_percentages_with_zero_supply_recompute_to_zero() {
    let unknowns = vec![
        holder("0xaaa", 10.0, UNKNOWN_PERCENTAGE),
        holder("0xbbb", 5.0, UNKNOWN_PERCENTAGE),
    ];

    let rebuilt = holders::recompute_percentages(unknowns, Some(0.0));
    for h in &rebuilt {
        assert_eq!(h.percentage, 0.0);
        assert!(h.percentage.is_finite());
    }
    assert_eq!(holders::top10_percentage(&rebuilt), 0.0);
}

#[test]
fn test_top10_percentage_always_in_range() {
    let cases: Vec<Vec<TokenHolder>> = vec![
        vec![],
        vec![holder("0xa", 1.0, 150.0)], // over-reported by provider
        (0..25)
            .map(|i| holder(&format!("0x{:02}", i), (25 - i) as f64, 4.0))
            .collect(),
    ];

    for holders_list in cases {
        let p = holders::top10_percentage(&holders_list);
        assert!((0.0..=100.0).contains(&p), "p={} out of range", p);
    }
}
