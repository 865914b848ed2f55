//! Bearer token verification configuration.

use serde::{Deserialize, Serialize};

/// Settings for verifying identity-provider bearer tokens.
///
/// DeviceGate never issues tokens; it only verifies tokens minted by the
/// external identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret shared with the identity provider.
    pub jwt_secret: String,
    /// Expected `iss` claim.
    #[serde(default = "default_issuer")]
    pub issuer: String,
    /// Expected `aud` claim.
    #[serde(default = "default_audience")]
    pub audience: String,
    /// Clock-skew leeway in seconds for `exp`/`iat` validation.
    #[serde(default = "default_leeway")]
    pub leeway_seconds: u64,
}

fn default_issuer() -> String {
    "https://identity.devicegate.local/".to_string()
}

fn default_audience() -> String {
    "devicegate-api".to_string()
}

fn default_leeway() -> u64 {
    60
}
