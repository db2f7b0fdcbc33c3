//! Internal-key check for the agent's loopback-only HTTP surface
//! (spec §6). Same shape as the observer's own `check_internal_key`.

use axum::http::HeaderMap;
use entity_types::error::ApiError;

pub fn check_internal_key(headers: &HeaderMap, expected: &str) -> Result<(), ApiError> {
    let provided = headers
        .get("X-Internal-Key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if provided == expected {
        Ok(())
    } else {
        Err(ApiError::Auth("missing or invalid internal key".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn matching_key_is_accepted() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Internal-Key", HeaderValue::from_static("secret"));
        assert!(check_internal_key(&headers, "secret").is_ok());
    }

    #[test]
    fn missing_key_is_rejected() {
        let headers = HeaderMap::new();
        assert!(check_internal_key(&headers, "secret").is_err());
    }

    #[test]
    fn mismatched_key_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Internal-Key", HeaderValue::from_static("wrong"));
        assert!(check_internal_key(&headers, "secret").is_err());
    }
}
