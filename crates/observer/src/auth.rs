//! Authentication and fingerprinting primitives shared by every HTTP
//! handler: the internal-key check admin endpoints and votes don't use,
//! the admin bearer-token-or-CIDR check, and the salted voter
//! fingerprint derivation (spec §6, §9).

use axum::http::HeaderMap;
use entity_types::error::ApiError;
use entity_types::ids::VoterFingerprint;
use ipnet::IpNet;
use sha2::{Digest, Sha256};
use std::net::IpAddr;
use std::str::FromStr;

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

/// Admin endpoints accept either a matching bearer token or a request
/// whose effective peer address falls inside the configured local
/// network.
pub fn check_admin(
    headers: &HeaderMap,
    peer: IpAddr,
    admin_token: &str,
    local_network_cidr: &str,
) -> Result<(), ApiError> {
    if let Some(auth) = headers.get(axum::http::header::AUTHORIZATION) {
        if let Ok(s) = auth.to_str() {
            if let Some(token) = s.strip_prefix("Bearer ") {
                if token == admin_token {
                    return Ok(());
                }
            }
        }
    }

    if let Ok(net) = IpNet::from_str(local_network_cidr) {
        if net.contains(&peer) {
            return Ok(());
        }
    }

    Err(ApiError::Auth(
        "admin endpoint requires a bearer token or local-network origin".into(),
    ))
}

/// Resolves the address to fingerprint: the forwarded address, but only
/// when the direct TCP peer is itself a trusted proxy. Otherwise the
/// direct peer is used, which also collapses the rate limit behind an
/// untrusted proxy — the accepted tradeoff spec'd for this boundary.
pub fn effective_remote_addr(
    headers: &HeaderMap,
    direct_peer: IpAddr,
    trusted_proxy_cidr: &str,
) -> IpAddr {
    let trusted = IpNet::from_str(trusted_proxy_cidr)
        .map(|net| net.contains(&direct_peer))
        .unwrap_or(false);

    if !trusted {
        return direct_peer;
    }

    headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim())
        .and_then(|s| IpAddr::from_str(s).ok())
        .unwrap_or(direct_peer)
}

pub fn fingerprint(ip_salt: &str, addr: IpAddr) -> VoterFingerprint {
    let mut hasher = Sha256::new();
    hasher.update(ip_salt.as_bytes());
    hasher.update(addr.to_string().as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    VoterFingerprint(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn fingerprint_is_deterministic_and_salt_sensitive() {
        let addr: IpAddr = "203.0.113.5".parse().unwrap();
        let a = fingerprint("salt-a", addr);
        let b = fingerprint("salt-a", addr);
        let c = fingerprint("salt-b", addr);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn admin_check_accepts_matching_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer secret"),
        );
        let peer: IpAddr = "8.8.8.8".parse().unwrap();
        assert!(check_admin(&headers, peer, "secret", "192.168.0.0/24").is_ok());
    }

    #[test]
    fn admin_check_accepts_local_network_origin_without_token() {
        let headers = HeaderMap::new();
        let peer: IpAddr = "192.168.0.42".parse().unwrap();
        assert!(check_admin(&headers, peer, "secret", "192.168.0.0/24").is_ok());
    }

    #[test]
    fn admin_check_rejects_remote_peer_without_token() {
        let headers = HeaderMap::new();
        let peer: IpAddr = "8.8.8.8".parse().unwrap();
        assert!(check_admin(&headers, peer, "secret", "192.168.0.0/24").is_err());
    }

    #[test]
    fn forwarded_for_ignored_from_untrusted_peer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Forwarded-For",
            HeaderValue::from_static("203.0.113.9"),
        );
        let direct: IpAddr = "8.8.8.8".parse().unwrap();
        let resolved = effective_remote_addr(&headers, direct, "127.0.0.1/32");
        assert_eq!(resolved, direct);
    }

    #[test]
    fn forwarded_for_honored_from_trusted_proxy() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Forwarded-For",
            HeaderValue::from_static("203.0.113.9"),
        );
        let direct: IpAddr = "127.0.0.1".parse().unwrap();
        let resolved = effective_remote_addr(&headers, direct, "127.0.0.1/32");
        assert_eq!(resolved, "203.0.113.9".parse::<IpAddr>().unwrap());
    }
}
