//! Caller identity at the HTTP boundary.
//!
//! Authentication itself happens upstream (JWT validation lives in the
//! gateway). depot only extracts the identity that gateway forwards.

use axum::http::HeaderMap;
use axum::http::header::HeaderName;
use std::net::{IpAddr, SocketAddr};

use crate::delivery::Caller;

/// Why a request carries no usable identity.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing authenticated user header '{0}'")]
    MissingIdentity(String),

    #[error("header '{0}' is not valid")]
    InvalidHeader(String),
}

/// Turns request metadata into a [`Caller`].
pub trait Authenticator: Send + Sync + 'static {
    /// # Errors
    ///
    /// Returns [`AuthError`] when no identity can be established.
    fn authenticate(&self, headers: &HeaderMap, peer: SocketAddr) -> Result<Caller, AuthError>;
}

/// Trusts identity headers set by an authenticating reverse proxy.
#[derive(Debug, Clone)]
pub struct TrustedHeaderAuth {
    user_header: HeaderName,
    trust_forwarded_for: bool,
}

impl TrustedHeaderAuth {
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidHeader`] if `user_header` is not a valid
    /// header name.
    pub fn new(user_header: &str, trust_forwarded_for: bool) -> Result<Self, AuthError> {
        let user_header = HeaderName::from_bytes(user_header.as_bytes())
            .map_err(|_| AuthError::InvalidHeader(user_header.to_string()))?;
        Ok(Self {
            user_header,
            trust_forwarded_for,
        })
    }

    fn client_ip(&self, headers: &HeaderMap, peer: SocketAddr) -> IpAddr {
        if self.trust_forwarded_for
            && let Some(ip) = headers
                .get("x-forwarded-for")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.split(',').next())
                .and_then(|first| first.trim().parse().ok())
        {
            return ip;
        }
        peer.ip()
    }
}

impl Authenticator for TrustedHeaderAuth {
    fn authenticate(&self, headers: &HeaderMap, peer: SocketAddr) -> Result<Caller, AuthError> {
        let name = self.user_header.as_str();
        let user_id = headers
            .get(&self.user_header)
            .ok_or_else(|| AuthError::MissingIdentity(name.to_string()))?
            .to_str()
            .map_err(|_| AuthError::InvalidHeader(name.to_string()))?
            .trim();

        if user_id.is_empty() {
            return Err(AuthError::MissingIdentity(name.to_string()));
        }

        Ok(Caller {
            user_id: user_id.to_string(),
            ip: self.client_ip(headers, peer),
        })
    }
}
