use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;

use specreg_registry::{
    CredentialId, CredentialInfo, IssuedCredential, Language, RegistryResult, SpecId, SpecSummary,
    SpecVersion,
};

use crate::auth::Caller;
use crate::error::{ServerError, ServerResult};
use crate::router::AppState;

/// Header carrying the declared source language of an uploaded spec.
pub const LANGUAGE_HEADER: HeaderName = HeaderName::from_static("x-language");

/// Header carrying the resolved version on latest-version reads.
pub const VERSION_HEADER: HeaderName = HeaderName::from_static("x-spec-version");

const JSON_CONTENT: &str = "application/json";

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecSummaryResponse {
    pub spec_id: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub model_count: u64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<SpecSummary> for SpecSummaryResponse {
    fn from(s: SpecSummary) -> Self {
        Self {
            spec_id: s.spec_id.into(),
            version: s.version.into(),
            title: s.title,
            description: s.description,
            model_count: s.model_count,
            created_at: s.created_at.to_rfc3339(),
            updated_at: s.updated_at.to_rfc3339(),
        }
    }
}

/// A credential as listed. Neither the secret nor its hash is exposed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialResponse {
    pub id: String,
    pub public_key: String,
    pub created_at: String,
}

impl From<CredentialInfo> for CredentialResponse {
    fn from(c: CredentialInfo) -> Self {
        Self {
            id: c.id.into(),
            public_key: c.public_key,
            created_at: c.created_at.to_rfc3339(),
        }
    }
}

/// A newly issued credential. The only response that carries the secret.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedCredentialResponse {
    pub id: String,
    pub public_key: String,
    pub secret_key: String,
    pub created_at: String,
}

impl From<IssuedCredential> for IssuedCredentialResponse {
    fn from(issued: IssuedCredential) -> Self {
        let listed = CredentialResponse::from(issued.record);
        Self {
            id: listed.id,
            public_key: listed.public_key,
            secret_key: issued.secret_key,
            created_at: listed.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Run a registry call on the blocking pool.
pub(crate) async fn run_blocking<T, F>(f: F) -> ServerResult<T>
where
    F: FnOnce() -> RegistryResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ServerError::Internal(format!("blocking task failed: {e}")))?
        .map_err(ServerError::from)
}

fn spec_id(raw: String) -> ServerResult<SpecId> {
    SpecId::new(raw).map_err(|e| ServerError::BadRequest(e.to_string()))
}

fn spec_version(raw: String) -> ServerResult<SpecVersion> {
    SpecVersion::new(raw).map_err(|e| ServerError::BadRequest(e.to_string()))
}

fn credential_id(raw: String) -> ServerResult<CredentialId> {
    CredentialId::new(raw).map_err(|e| ServerError::BadRequest(e.to_string()))
}

/// Declared language of an upload. JSON when the header is absent.
fn language(headers: &HeaderMap) -> ServerResult<Language> {
    match headers.get(LANGUAGE_HEADER) {
        None => Ok(Language::Json),
        Some(value) => value
            .to_str()
            .map_err(|_| ServerError::BadRequest("X-LANGUAGE header is not ASCII".into()))?
            .parse()
            .map_err(|e: specreg_types::TypeError| ServerError::BadRequest(e.to_string())),
    }
}

fn json_document(body: String) -> Response {
    ([(CONTENT_TYPE, JSON_CONTENT)], body).into_response()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Health check handler.
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "name": "specreg",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn list_specs(
    State(state): State<AppState>,
    Caller(sub): Caller,
) -> ServerResult<Json<Vec<SpecSummaryResponse>>> {
    let registry = state.registry.clone();
    let specs = run_blocking(move || registry.list_specs(&sub)).await?;
    Ok(Json(specs.into_iter().map(Into::into).collect()))
}

pub async fn delete_all_specs(
    State(state): State<AppState>,
    Caller(sub): Caller,
) -> ServerResult<StatusCode> {
    let registry = state.registry.clone();
    run_blocking(move || registry.delete_all_specs(&sub)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_latest(
    State(state): State<AppState>,
    Caller(sub): Caller,
    Path(raw_spec_id): Path<String>,
) -> ServerResult<Response> {
    let spec_id = spec_id(raw_spec_id)?;
    let registry = state.registry.clone();
    let (version, body) = run_blocking(move || registry.get_latest(&sub, &spec_id)).await?;
    Ok((
        [(VERSION_HEADER, version.to_string())],
        json_document(body),
    )
        .into_response())
}

pub async fn delete_spec(
    State(state): State<AppState>,
    Caller(sub): Caller,
    Path(raw_spec_id): Path<String>,
) -> ServerResult<StatusCode> {
    let spec_id = spec_id(raw_spec_id)?;
    let registry = state.registry.clone();
    run_blocking(move || registry.delete_spec(&sub, &spec_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_versions(
    State(state): State<AppState>,
    Caller(sub): Caller,
    Path(raw_spec_id): Path<String>,
) -> ServerResult<Json<Vec<SpecSummaryResponse>>> {
    let spec_id = spec_id(raw_spec_id)?;
    let registry = state.registry.clone();
    let versions = run_blocking(move || registry.list_versions(&sub, &spec_id)).await?;
    Ok(Json(versions.into_iter().map(Into::into).collect()))
}

pub async fn get_version(
    State(state): State<AppState>,
    Caller(sub): Caller,
    Path((raw_spec_id, raw_version)): Path<(String, String)>,
) -> ServerResult<Response> {
    let spec_id = spec_id(raw_spec_id)?;
    let version = spec_version(raw_version)?;
    let registry = state.registry.clone();
    let body = run_blocking(move || registry.get_version(&sub, &spec_id, &version)).await?;
    Ok(json_document(body))
}

pub async fn put_version(
    State(state): State<AppState>,
    Caller(sub): Caller,
    Path((raw_spec_id, raw_version)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> ServerResult<StatusCode> {
    let spec_id = spec_id(raw_spec_id)?;
    let version = spec_version(raw_version)?;
    let language = language(&headers)?;
    let registry = state.registry.clone();
    run_blocking(move || registry.put_version(&sub, &spec_id, &version, &body, language)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_credentials(
    State(state): State<AppState>,
    Caller(sub): Caller,
) -> ServerResult<Json<Vec<CredentialResponse>>> {
    let registry = state.registry.clone();
    let creds = run_blocking(move || registry.list_credentials(&sub)).await?;
    Ok(Json(creds.into_iter().map(Into::into).collect()))
}

pub async fn delete_all_credentials(
    State(state): State<AppState>,
    Caller(sub): Caller,
) -> ServerResult<StatusCode> {
    let registry = state.registry.clone();
    run_blocking(move || registry.delete_all_credentials(&sub)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_credential(
    State(state): State<AppState>,
    Caller(sub): Caller,
    Path(raw_id): Path<String>,
) -> ServerResult<Json<CredentialResponse>> {
    let id = credential_id(raw_id)?;
    let registry = state.registry.clone();
    let cred = run_blocking(move || registry.get_credential(&sub, &id)).await?;
    Ok(Json(cred.into()))
}

/// Issue a credential, rotating the keys if the id already exists.
pub async fn put_credential(
    State(state): State<AppState>,
    Caller(sub): Caller,
    Path(raw_id): Path<String>,
) -> ServerResult<Json<IssuedCredentialResponse>> {
    let id = credential_id(raw_id)?;
    let registry = state.registry.clone();
    let issued = run_blocking(move || registry.issue_credential(&sub, &id)).await?;
    Ok(Json(issued.into()))
}

pub async fn delete_credential(
    State(state): State<AppState>,
    Caller(sub): Caller,
    Path(raw_id): Path<String>,
) -> ServerResult<StatusCode> {
    let id = credential_id(raw_id)?;
    let registry = state.registry.clone();
    run_blocking(move || registry.delete_credential(&sub, &id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn language_defaults_to_json() {
        assert_eq!(language(&HeaderMap::new()).unwrap(), Language::Json);
    }

    #[test]
    fn language_header_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(LANGUAGE_HEADER, HeaderValue::from_static("yaml"));
        assert_eq!(language(&headers).unwrap(), Language::Yaml);

        headers.insert(LANGUAGE_HEADER, HeaderValue::from_static("toml"));
        assert!(matches!(language(&headers), Err(ServerError::BadRequest(_))));
    }

    #[test]
    fn invalid_path_segments_are_bad_requests() {
        assert!(matches!(spec_id("a b".into()), Err(ServerError::BadRequest(_))));
        assert!(matches!(spec_version("..".into()), Err(ServerError::BadRequest(_))));
        assert!(matches!(credential_id(String::new()), Err(ServerError::BadRequest(_))));
    }
}
