//! Contract Permission Analyzer (30 points)
//!
//! Detects whether the contract owner retains the technical ability to rug
//! (mint, retune taxes, pause, blacklist, upgrade). Always reads chain state
//! directly - indexers do not expose permission data, so this dimension has
//! no fast path.
//!
//! Three independent checks, combined additively then clamped to [0, 30]:
//! 1. Owner (up to 20): no owner()/renounced -> 20, owner is a contract
//!    (multisig/DAO heuristic) -> 15, externally-controlled owner -> 0
//! 2. Dangerous selectors (up to 10): 0 matches -> 10, 1-2 -> 5, 3+ -> 0
//! 3. EIP-1967 proxy admin: live admin -> -5 penalty (floored at 0);
//!    renounced admin or non-proxy -> no penalty
//!
//! A check that cannot be executed (transport failure) contributes nothing
//! and leaves a note; only the genuine absence of owner() is treated as
//! evidence of safety.

use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::models::types::{AnalyzerResult, DataSourceTag, RiskLevel};
use crate::providers::{ChainScanner, Probe};
use crate::utils::constants::{
    is_zero_address, DangerousSelector, DANGEROUS_SELECTORS, EIP1967_ADMIN_SLOT,
    EIP1967_IMPLEMENTATION_SLOT, PERMISSION_MAX_SCORE,
};

/// Outcome of the owner check
#[derive(Debug, Clone)]
pub struct OwnerCheck {
    pub has_owner: bool,
    pub owner_address: Option<String>,
    pub is_renounced: bool,
    pub is_multisig: bool,
    /// The probe itself failed; nothing above is meaningful
    pub check_failed: bool,
}

/// Outcome of the dangerous-selector scan
#[derive(Debug, Clone)]
pub struct SelectorCheck {
    pub matches: Vec<&'static DangerousSelector>,
    pub check_failed: bool,
}

/// Outcome of the proxy check
#[derive(Debug, Clone)]
pub struct ProxyCheck {
    pub is_proxy: bool,
    pub implementation: Option<String>,
    pub admin: Option<String>,
    pub check_failed: bool,
}

/// Contract permission analyzer (deep path only)
pub struct PermissionAnalyzer {
    scanner: Arc<ChainScanner>,
}

impl PermissionAnalyzer {
    pub fn new(scanner: Arc<ChainScanner>) -> Self {
        Self { scanner }
    }

    /// Full permission analysis. Individual check failures degrade that
    /// check only; this method never returns an error.
    pub async fn analyze(&self, token_address: &str) -> AnalyzerResult {
        info!("🔐 Analyzing contract permissions: {}", token_address);

        let owner = self.check_owner(token_address).await;
        let selectors = self.check_dangerous_selectors(token_address).await;
        let proxy = self.check_proxy(token_address).await;

        // Chain completely unreachable: report a degraded dimension rather
        // than a confident-looking zero
        if owner.check_failed && selectors.check_failed && proxy.check_failed {
            warn!("⚠️ All permission checks failed for {}", token_address);
            return AnalyzerResult::degraded(
                PERMISSION_MAX_SCORE,
                "All permission checks failed (chain unreachable)",
            );
        }

        let (score, risk_summary) = score_checks(&owner, &selectors, &proxy);
        let risk_level = risk_level(score);

        info!(
            "🔐 Permission score {:.0}/{} ({})",
            score,
            PERMISSION_MAX_SCORE,
            risk_level.as_str()
        );

        let metrics = json!({
            "has_owner": owner.has_owner,
            "owner_address": owner.owner_address,
            "is_renounced": owner.is_renounced,
            "is_multisig": owner.is_multisig,
            "dangerous_functions": selectors
                .matches
                .iter()
                .map(|s| json!({
                    "category": s.category,
                    "signature": s.signature,
                    "selector": format!("0x{}", s.selector_hex),
                }))
                .collect::<Vec<_>>(),
            "is_proxy": proxy.is_proxy,
            "implementation": proxy.implementation,
            "proxy_admin": proxy.admin,
            "risk_summary": risk_summary,
        });

        AnalyzerResult::new(
            score,
            PERMISSION_MAX_SCORE,
            risk_level,
            DataSourceTag::Deep,
            metrics,
        )
    }

    /// Owner check via the tri-state probe
    async fn check_owner(&self, token_address: &str) -> OwnerCheck {
        match self.scanner.probe_owner(token_address).await {
            Probe::Absent => OwnerCheck {
                has_owner: false,
                owner_address: None,
                is_renounced: false,
                is_multisig: false,
                check_failed: false,
            },
            Probe::Present(addr) if is_zero_address(&addr) => OwnerCheck {
                has_owner: true,
                owner_address: Some(addr),
                is_renounced: true,
                is_multisig: false,
                check_failed: false,
            },
            Probe::Present(addr) => {
                let is_multisig = self.scanner.is_contract(&addr).await.unwrap_or(false);
                OwnerCheck {
                    has_owner: true,
                    owner_address: Some(addr),
                    is_renounced: false,
                    is_multisig,
                    check_failed: false,
                }
            }
            Probe::Failed(_) => OwnerCheck {
                has_owner: false,
                owner_address: None,
                is_renounced: false,
                is_multisig: false,
                check_failed: true,
            },
        }
    }

    /// Scan deployed bytecode for known dangerous 4-byte selectors
    async fn check_dangerous_selectors(&self, token_address: &str) -> SelectorCheck {
        let bytecode = match self.scanner.bytecode(token_address).await {
            Ok(code) => code,
            Err(e) => {
                warn!("⚠️ Bytecode fetch failed: {}", e);
                return SelectorCheck {
                    matches: vec![],
                    check_failed: true,
                };
            }
        };

        let matches = scan_bytecode(&bytecode);
        SelectorCheck {
            matches,
            check_failed: false,
        }
    }

    /// EIP-1967 proxy detection via the standardized storage slots
    async fn check_proxy(&self, token_address: &str) -> ProxyCheck {
        let implementation = match self
            .scanner
            .read_slot_address(token_address, EIP1967_IMPLEMENTATION_SLOT)
            .await
        {
            Ok(slot) => slot,
            Err(e) => {
                warn!("⚠️ Proxy slot read failed: {}", e);
                return ProxyCheck {
                    is_proxy: false,
                    implementation: None,
                    admin: None,
                    check_failed: true,
                };
            }
        };

        let admin = self
            .scanner
            .read_slot_address(token_address, EIP1967_ADMIN_SLOT)
            .await
            .unwrap_or(None);

        ProxyCheck {
            is_proxy: implementation.is_some(),
            implementation,
            admin,
            check_failed: false,
        }
    }
}

/// Match dangerous selectors against bytecode hex. Empty bytecode (not a
/// deployed contract) trivially matches nothing.
pub fn scan_bytecode(bytecode: &str) -> Vec<&'static DangerousSelector> {
    let code = bytecode.trim_start_matches("0x").to_lowercase();
    if code.is_empty() {
        return vec![];
    }

    DANGEROUS_SELECTORS
        .iter()
        .filter(|sel| code.contains(&sel.selector_hex))
        .collect()
}

/// Combine the three checks into the dimension score plus a human-readable
/// summary in display order
pub fn score_checks(
    owner: &OwnerCheck,
    selectors: &SelectorCheck,
    proxy: &ProxyCheck,
) -> (f64, Vec<String>) {
    let mut score: f64 = 0.0;
    let mut summary = Vec::new();

    // 1. Owner check (20 points)
    if owner.check_failed {
        summary.push("[?] Owner check unavailable".to_string());
    } else if !owner.has_owner {
        score += 20.0;
        summary.push("[OK] No owner function".to_string());
    } else if owner.is_renounced {
        score += 20.0;
        summary.push("[OK] Owner renounced".to_string());
    } else if owner.is_multisig {
        score += 15.0;
        summary.push("[!] Owner is multisig/DAO".to_string());
    } else {
        summary.push("[X] Owner still has control".to_string());
    }

    // 2. Dangerous-function check (10 points)
    if selectors.check_failed {
        summary.push("[?] Bytecode scan unavailable".to_string());
    } else {
        let count = selectors.matches.len();
        if count == 0 {
            score += 10.0;
            summary.push("[OK] No dangerous functions".to_string());
        } else if count <= 2 {
            score += 5.0;
            summary.push(format!("[!] {} dangerous function(s) found", count));
        } else {
            summary.push(format!("[X] {} dangerous functions found", count));
        }
    }

    // 3. Proxy adjustment (penalty, not additive)
    if proxy.check_failed {
        summary.push("[?] Proxy check unavailable".to_string());
    } else if proxy.is_proxy {
        match &proxy.admin {
            Some(_) => {
                score = (score - 5.0).max(0.0);
                summary.push("[X] Upgradeable proxy with live admin".to_string());
            }
            None => summary.push("[OK] Proxy admin renounced".to_string()),
        }
    } else {
        summary.push("[OK] Not a proxy contract".to_string());
    }

    (score.clamp(0.0, PERMISSION_MAX_SCORE), summary)
}

/// Risk bands on the permission score
pub fn risk_level(score: f64) -> RiskLevel {
    if score >= 25.0 {
        RiskLevel::LowRisk
    } else if score >= 15.0 {
        RiskLevel::MediumRisk
    } else {
        RiskLevel::HighRisk
    }
}
