use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::HeaderMap;
use serde::Deserialize;

/// Header set by App Service authentication for signed-in users
pub const CLIENT_PRINCIPAL_HEADER: &str = "x-ms-client-principal";

/// Display name used when no principal is present
pub const DEFAULT_USERNAME: &str = "You";

/// Signed-in user as reported by the hosting platform
///
/// The header value is base64-encoded JSON carrying a list of
/// `{typ, val}` claims.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientPrincipal {
    #[serde(default)]
    claims: Vec<Claim>,
}

#[derive(Debug, Clone, Deserialize)]
struct Claim {
    typ: String,
    val: String,
}

impl ClientPrincipal {
    /// Decode the principal from request headers
    ///
    /// Returns `None` when the header is absent or cannot be decoded.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let raw = headers.get(CLIENT_PRINCIPAL_HEADER)?.to_str().ok()?;
        let decoded = STANDARD.decode(raw.trim()).ok()?;
        serde_json::from_slice(&decoded).ok()
    }

    /// Look up a claim value by type; later claims win over earlier ones
    pub fn claim(&self, typ: &str) -> Option<&str> {
        self.claims
            .iter()
            .rev()
            .find(|claim| claim.typ == typ)
            .map(|claim| claim.val.as_str())
    }

    /// Resolve the display name for the request, falling back to `default`
    pub fn username(headers: &HeaderMap, default: &str) -> String {
        Self::from_headers(headers)
            .and_then(|principal| principal.claim("name").map(str::to_owned))
            .unwrap_or_else(|| default.to_owned())
    }
}
