use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{HeaderName, AUTHORIZATION};
use axum::http::request::Parts;
use axum::http::HeaderMap;

use specreg_registry::{CustomerId, Registry};

use crate::error::{ServerError, ServerResult};
use crate::handler::run_blocking;
use crate::router::AppState;

/// Resolves the customer a request acts for.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, headers: &HeaderMap) -> ServerResult<CustomerId>;
}

/// Authenticates `Authorization: Bearer <public_key>:<secret_key>` against
/// the registry's stored credentials.
pub struct CredentialAuth {
    registry: Arc<Registry>,
}

impl CredentialAuth {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }
}

/// Split a bearer token into `(public_key, secret_key)`.
fn parse_bearer(headers: &HeaderMap) -> ServerResult<(String, String)> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ServerError::Unauthorized("missing authorization header".into()))?
        .to_str()
        .map_err(|_| ServerError::Unauthorized("authorization header is not ASCII".into()))?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| ServerError::Unauthorized("expected a bearer token".into()))?;
    let (public_key, secret_key) = token
        .trim()
        .split_once(':')
        .ok_or_else(|| ServerError::Unauthorized("expected <public_key>:<secret_key>".into()))?;
    Ok((public_key.to_string(), secret_key.to_string()))
}

#[async_trait]
impl AuthProvider for CredentialAuth {
    async fn authenticate(&self, headers: &HeaderMap) -> ServerResult<CustomerId> {
        let (public_key, secret_key) = parse_bearer(headers)?;
        let registry = self.registry.clone();
        run_blocking(move || registry.authenticate(&public_key, &secret_key))
            .await?
            .ok_or_else(|| ServerError::Unauthorized("unknown public key or wrong secret".into()))
    }
}

/// Trusts an identity header set by an upstream gateway.
pub struct TrustedHeaderAuth {
    header: HeaderName,
}

impl TrustedHeaderAuth {
    pub fn new(header: &str) -> ServerResult<Self> {
        let header = HeaderName::from_bytes(header.as_bytes())
            .map_err(|e| ServerError::Config(format!("invalid trusted header {header:?}: {e}")))?;
        Ok(Self { header })
    }
}

#[async_trait]
impl AuthProvider for TrustedHeaderAuth {
    async fn authenticate(&self, headers: &HeaderMap) -> ServerResult<CustomerId> {
        let value = headers
            .get(&self.header)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ServerError::Unauthorized(format!("missing {} header", self.header)))?;
        CustomerId::new(value.trim()).map_err(|e| ServerError::Unauthorized(e.to_string()))
    }
}

/// The authenticated customer of the current request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller(pub CustomerId);

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> ServerResult<Self> {
        let sub = state.auth.authenticate(&parts.headers).await?;
        tracing::debug!(%sub, "request authenticated");
        Ok(Self(sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use specreg_registry::CredentialId;

    fn headers(name: &'static str, value: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(name, HeaderValue::from_str(value).unwrap());
        map
    }

    #[test]
    fn bearer_parsing() {
        let (pk, sk) = parse_bearer(&headers("authorization", "Bearer pk_1:sk_2")).unwrap();
        assert_eq!((pk.as_str(), sk.as_str()), ("pk_1", "sk_2"));

        assert!(parse_bearer(&HeaderMap::new()).is_err());
        assert!(parse_bearer(&headers("authorization", "Basic abc")).is_err());
        assert!(parse_bearer(&headers("authorization", "Bearer no-colon")).is_err());
    }

    #[tokio::test]
    async fn credential_auth_accepts_issued_key() {
        let registry = Arc::new(Registry::in_memory(100u64));
        let sub = CustomerId::new("alice").unwrap();
        let issued = registry
            .issue_credential(&sub, &CredentialId::new("ci").unwrap())
            .unwrap();
        let auth = CredentialAuth::new(registry);

        let token = format!("Bearer {}:{}", issued.record.public_key, issued.secret_key);
        assert_eq!(auth.authenticate(&headers("authorization", &token)).await.unwrap(), sub);

        let wrong = format!("Bearer {}:sk_wrong", issued.record.public_key);
        let err = auth.authenticate(&headers("authorization", &wrong)).await.unwrap_err();
        assert!(matches!(err, ServerError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn trusted_header_auth() {
        let auth = TrustedHeaderAuth::new("x-sub").unwrap();
        let sub = auth.authenticate(&headers("x-sub", "bob")).await.unwrap();
        assert_eq!(sub.as_str(), "bob");
        assert!(auth.authenticate(&HeaderMap::new()).await.is_err());
        assert!(auth.authenticate(&headers("x-sub", "  ")).await.is_err());
    }

    #[test]
    fn invalid_trusted_header_name_is_a_config_error() {
        assert!(matches!(
            TrustedHeaderAuth::new("bad header"),
            Err(ServerError::Config(_))
        ));
    }
}
