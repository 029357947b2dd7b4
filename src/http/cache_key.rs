//! Cache key derivation for API responses.

use serde_json::json;
use sha2::{Digest, Sha256};

use super::types::{Method, Params};

/// Logical key prefix shared by every cached response.
pub const CACHE_NAMESPACE: &str = "api_cache:";

/// Scope used when no credential is set.
pub const ANONYMOUS_SCOPE: &str = "anonymous";

/// Short fingerprint of the active credential.
///
/// Responses cached under one token are never served under another.
pub fn credential_scope(token: Option<&str>) -> String {
  match token {
    Some(token) => hex::encode(&Sha256::digest(token.as_bytes())[..8]),
    None => ANONYMOUS_SCOPE.to_string(),
  }
}

/// Key for the `method` response to `path` with `params`, within a credential scope.
///
/// Shape: `api_cache:<scope>:<sha256 hex>` for GET and
/// `api_cache:<scope>:<METHOD>:<sha256 hex>` for everything else, so an
/// opted-in HEAD or POST never answers a later GET.
pub fn cache_key(scope: &str, method: Method, path: &str, params: &Params) -> String {
  // Params are a BTreeMap, so insertion order never changes the key
  let input = json!([normalize_path(path), params]).to_string();

  // SHA256 hash for stable, fixed-length keys
  let digest = Sha256::digest(input.as_bytes());
  match method {
    Method::Get => format!("{}{}:{}", CACHE_NAMESPACE, scope, hex::encode(digest)),
    other => format!(
      "{}{}:{}:{}",
      CACHE_NAMESPACE,
      scope,
      other.as_str(),
      hex::encode(digest)
    ),
  }
}

/// Trim whitespace and surrounding slashes so `/vehicles/` and `vehicles` match.
fn normalize_path(path: &str) -> &str {
  path.trim().trim_matches('/')
}
