//! Centralized Error Handling Module
//!
//! CEO Directive: Setiap kegagalan harus memiliki kode error yang unik.
//! Ini memudahkan debugging dan monitoring di production.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - NET_xxx: Network/transport errors (retryable)
//! - RATE_xxx: Rate limiting (retryable, tracked separately for observability)
//! - PROVIDER_xxx: Structured provider failures (trigger fast->deep fallback)
//! - INPUT_xxx: Validation errors (fail fast, never retried)
//! - DATA_xxx: Partial-data conditions (non-fatal, degrade the score)
//! - CFG_xxx: Configuration errors

use std::fmt;

/// Application-wide error type
/// CEO Directive: All errors must flow through this type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    /// Retryable = network trouble or rate limiting
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    /// Rate limits are retryable but must stay distinguishable from
    /// generic network failures all the way up the stack
    pub fn is_rate_limit(&self) -> bool {
        matches!(self.code, ErrorCode::RateLimited)
    }

    /// Structured provider failures switch the analyzer from fast to deep
    /// mode instead of retrying
    pub fn triggers_fallback(&self) -> bool {
        self.code.triggers_fallback()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        // Source errors are not Clone; code + message carry everything the
        // retry/fallback machinery needs
        Self::new(self.code, self.message.clone())
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // Network Errors (retryable)
    // ============================================
    /// Request could not be sent or connection dropped
    NetworkFailure,
    /// Request timed out
    NetworkTimeout,

    // ============================================
    // Rate Limiting (retryable, distinct signal)
    // ============================================
    /// HTTP 429 or provider-specific throttle code
    RateLimited,

    // ============================================
    // Provider Errors (trigger mode fallback)
    // ============================================
    /// Indexed provider returned a non-zero application code
    ProviderError,
    /// Provider response could not be parsed
    ProviderInvalidResponse,
    /// JSON-RPC node returned an error object
    RpcError,
    /// RPC rejected an oversized block range (handled by batch halving)
    RpcRangeTooLarge,
    /// eth_call reverted; for feature probes this means "function absent",
    /// which is informative rather than a failure
    RpcExecutionReverted,

    // ============================================
    // Validation Errors (fail fast)
    // ============================================
    /// Malformed token address
    InvalidTokenAddress,

    // ============================================
    // Partial-Data Conditions (non-fatal)
    // ============================================
    /// Analyzer completed but found no holders
    NoHoldersFound,
    /// All configured data sources failed for one dimension
    SourceUnavailable,

    // ============================================
    // Configuration Errors
    // ============================================
    /// Missing environment variable
    ConfigMissingEnv,
    /// Missing API key for the indexed provider
    ConfigMissingApiKey,

    // ============================================
    // Generic
    // ============================================
    /// Unknown error
    Unknown,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            // Network
            Self::NetworkFailure => "NET_FAILURE",
            Self::NetworkTimeout => "NET_TIMEOUT",

            // Rate limiting
            Self::RateLimited => "RATE_LIMITED",

            // Provider
            Self::ProviderError => "PROVIDER_ERROR",
            Self::ProviderInvalidResponse => "PROVIDER_INVALID_RESPONSE",
            Self::RpcError => "RPC_ERROR",
            Self::RpcRangeTooLarge => "RPC_RANGE_TOO_LARGE",
            Self::RpcExecutionReverted => "RPC_EXECUTION_REVERTED",

            // Validation
            Self::InvalidTokenAddress => "INPUT_INVALID_ADDRESS",

            // Partial data
            Self::NoHoldersFound => "DATA_NO_HOLDERS",
            Self::SourceUnavailable => "DATA_SOURCE_UNAVAILABLE",

            // Configuration
            Self::ConfigMissingEnv => "CFG_MISSING_ENV",
            Self::ConfigMissingApiKey => "CFG_MISSING_API_KEY",

            // Generic
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Get HTTP status code for API responses
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidTokenAddress => 400,
            Self::ConfigMissingApiKey => 401,
            Self::RateLimited => 429,
            Self::SourceUnavailable => 503,
            _ => 500,
        }
    }

    /// Check if error is retryable (network + rate limit only; provider
    /// application errors are NOT retried, they trigger fallback instead)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkFailure | Self::NetworkTimeout | Self::RateLimited
        )
    }

    /// Check if error should switch the analyzer from fast to deep mode
    pub fn triggers_fallback(&self) -> bool {
        matches!(self, Self::ProviderError | Self::ProviderInvalidResponse)
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    /// Network failure (connection refused, DNS, dropped socket)
    pub fn network(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NetworkFailure, msg)
    }

    /// Request timeout
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NetworkTimeout, msg)
    }

    /// Rate limited (HTTP 429 or provider throttle code)
    pub fn rate_limited() -> Self {
        Self::new(ErrorCode::RateLimited, "Rate limited (HTTP 429)")
    }

    /// Indexed provider returned a structured failure code
    pub fn provider(code: i64, msg: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ProviderError,
            format!("Provider error [{}]: {}", code, msg.into()),
        )
    }

    /// JSON-RPC node returned an error object
    pub fn rpc(code: i64, msg: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::RpcError,
            format!("RPC error [{}]: {}", code, msg.into()),
        )
    }

    /// Oversized eth_getLogs range
    pub fn range_too_large(from_block: u64, to_block: u64) -> Self {
        Self::new(
            ErrorCode::RpcRangeTooLarge,
            format!("Block range too large: {} -> {}", from_block, to_block),
        )
    }

    /// Malformed token address
    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidTokenAddress, msg)
    }

    /// No holders found for the token
    pub fn no_holders() -> Self {
        Self::new(ErrorCode::NoHoldersFound, "No holders found")
    }

    /// Every data source for one dimension failed
    pub fn source_unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::SourceUnavailable, msg)
    }

    /// Missing API key
    pub fn missing_api_key(key_name: &str) -> Self {
        Self::new(
            ErrorCode::ConfigMissingApiKey,
            format!("Missing API key: {}", key_name),
        )
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ErrorCode::NetworkTimeout, "Request timeout")
        } else if err.is_connect() {
            Self::new(ErrorCode::NetworkFailure, "Connection failed")
        } else {
            Self::with_source(ErrorCode::NetworkFailure, "Request failed", err)
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::ProviderInvalidResponse, "JSON parse error", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = AppError::timeout("Connection timed out");
        assert_eq!(err.code, ErrorCode::NetworkTimeout);
        assert_eq!(err.code_str(), "NET_TIMEOUT");
    }

    #[test]
    fn test_retryable() {
        assert!(ErrorCode::NetworkTimeout.is_retryable());
        assert!(ErrorCode::RateLimited.is_retryable());
        assert!(!ErrorCode::ProviderError.is_retryable());
        assert!(!ErrorCode::InvalidTokenAddress.is_retryable());
    }

    #[test]
    fn test_fallback_trigger() {
        // Application errors fall back to deep mode; rate limits retry fast
        assert!(ErrorCode::ProviderError.triggers_fallback());
        assert!(!ErrorCode::RateLimited.triggers_fallback());
        assert!(!ErrorCode::NetworkFailure.triggers_fallback());
    }

    #[test]
    fn test_http_status() {
        assert_eq!(ErrorCode::InvalidTokenAddress.http_status(), 400);
        assert_eq!(ErrorCode::RateLimited.http_status(), 429);
        assert_eq!(ErrorCode::RpcError.http_status(), 500);
    }

    #[test]
    fn test_rate_limit_stays_distinguishable() {
        let err = AppError::rate_limited();
        assert!(err.is_retryable());
        assert!(err.is_rate_limit());
        let net = AppError::network("socket closed");
        assert!(net.is_retryable());
        assert!(!net.is_rate_limit());
    }
}
