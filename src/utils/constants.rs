//! Constants Module - Single Source of Truth
//!
//! CEO Directive: Semua konstanta, selector, dan konfigurasi default yang
//! digunakan di seluruh aplikasi HARUS didefinisikan di sini.
//! Tidak ada hardcoded values di modul lain!

use alloy_primitives::keccak256;

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application name
pub const APP_NAME: &str = "RusterScore";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent for HTTP requests
pub const USER_AGENT: &str = "RusterScore/1.0.0";

// ============================================
// SCORING WEIGHTS
// ============================================

/// Max score for the unique-EOA activity dimension
pub const EOA_MAX_SCORE: f64 = 40.0;

/// Max score for the holder concentration dimension
pub const HOLDER_MAX_SCORE: f64 = 30.0;

/// Max score for the contract permission dimension
pub const PERMISSION_MAX_SCORE: f64 = 30.0;

/// Number of top holders summed for the concentration metric
pub const TOP_HOLDER_COUNT: usize = 10;

/// Sentinel for "provider did not report an ownership percentage"
pub const UNKNOWN_PERCENTAGE: f64 = -1.0;

// ============================================
// NETWORK / RETRY DEFAULTS
// ============================================

/// Default timeout for HTTP/RPC requests (seconds)
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 30;

/// Default cache TTL for fetched provider data (seconds)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// TTL for contract/EOA classification entries. The classification is
/// immutable for a given address, so this only bounds memory.
pub const CLASSIFICATION_TTL_SECS: u64 = 86_400;

/// Default retry count (3 retries = 4 total attempts)
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Base retry delay in milliseconds (delay = base * attempt number)
pub const DEFAULT_RETRY_BASE_MS: u64 = 1000;

/// Jitter percentage for retry delay (prevent thundering herd)
pub const RETRY_JITTER_PERCENT: u64 = 20;

// ============================================
// PAGINATION / SCAN DEFAULTS
// ============================================

/// Maximum page size accepted by the indexed provider
pub const MAX_PAGE_SIZE: u32 = 100;

/// Default record limit for fast-mode activity analysis
pub const DEFAULT_ACTIVITY_LIMIT: usize = 1000;

/// Default eth_getLogs batch size in blocks
pub const DEFAULT_LOG_BATCH_BLOCKS: u64 = 1000;

/// Below this batch size a failing sub-range is skipped instead of halved
pub const MIN_LOG_BATCH_BLOCKS: u64 = 100;

/// Deep-mode fallback range for holder scans (blocks back from head)
pub const DEFAULT_HOLDER_FALLBACK_BLOCKS: u64 = 50_000;

/// Deep-mode fallback range for activity scans (blocks back from head)
pub const DEFAULT_ACTIVITY_FALLBACK_BLOCKS: u64 = 10_000;

// ============================================
// CHAIN CONSTANTS
// ============================================

/// The zero address denotes mint/burn in Transfer events, never a participant
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// keccak256("Transfer(address,address,uint256)")
pub const TRANSFER_EVENT_TOPIC: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

/// owner() selector
pub const SELECTOR_OWNER: &str = "0x8da5cb5b";

/// totalSupply() selector
pub const SELECTOR_TOTAL_SUPPLY: &str = "0x18160ddd";

/// decimals() selector
pub const SELECTOR_DECIMALS: &str = "0x313ce567";

/// EIP-1967 implementation slot
pub const EIP1967_IMPLEMENTATION_SLOT: &str =
    "0x360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc";

/// EIP-1967 admin slot (holds the address allowed to upgrade the proxy)
pub const EIP1967_ADMIN_SLOT: &str =
    "0xb53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103";

// ============================================
// DANGEROUS FUNCTION SELECTORS
// ============================================

/// Signatures of functions an owner can abuse (rug-pull surface).
/// Grouped by category; selectors are derived below at startup.
pub const DANGEROUS_FUNCTION_SIGNATURES: &[(&str, &str)] = &[
    ("mint", "mint(address,uint256)"),
    ("mint", "mint(uint256)"),
    ("burn", "burn(address,uint256)"),
    ("burn", "burn(uint256)"),
    ("set_tax", "setTaxFee(uint256)"),
    ("set_tax", "setTax(uint256)"),
    ("set_tax", "setFee(uint256)"),
    ("set_max_tx", "setMaxTxAmount(uint256)"),
    ("set_max_tx", "setMaxTransaction(uint256)"),
    ("upgrade", "upgradeTo(address)"),
    ("upgrade", "upgradeToAndCall(address,bytes)"),
    ("pause", "pause()"),
    ("pause", "unpause()"),
    ("blacklist", "blacklist(address)"),
    ("blacklist", "addToBlacklist(address)"),
    ("blacklist", "setBlacklist(address,bool)"),
    ("set_router", "setRouter(address)"),
    ("set_router", "setDexRouter(address)"),
];

/// A dangerous 4-byte selector with its category and source signature
#[derive(Debug, Clone)]
pub struct DangerousSelector {
    pub category: &'static str,
    pub signature: &'static str,
    /// 8 lowercase hex chars, no 0x prefix (for bytecode substring search)
    pub selector_hex: String,
}

lazy_static::lazy_static! {
    /// Selector table derived once from the signature list
    pub static ref DANGEROUS_SELECTORS: Vec<DangerousSelector> = {
        DANGEROUS_FUNCTION_SIGNATURES
            .iter()
            .map(|(category, signature)| {
                let hash = keccak256(signature.as_bytes());
                DangerousSelector {
                    category,
                    signature,
                    selector_hex: hex::encode(&hash[..4]),
                }
            })
            .collect()
    };
}

/// Check if an address string is the zero address (case-insensitive)
#[inline]
pub fn is_zero_address(address: &str) -> bool {
    address.eq_ignore_ascii_case(ZERO_ADDRESS)
}
