//! Control4 account and director REST gateway.
//!
//! Concrete implementation of the [`SessionFactory`] / [`DeviceSession`]
//! seams. Login is a two-step handshake:
//!
//! 1. Exchange the account credential for an account-level bearer token
//!    against the cloud account API.
//! 2. Look up the account's controller, then request a bearer token scoped to
//!    that controller's director.
//!
//! Device operations then talk HTTPS to the director on the home LAN. The
//! director serves a self-signed certificate, so its HTTP client accepts
//! invalid certs; the account API client does not.
//!
//! Token expiry shows up as HTTP 401 from the director and is mapped to
//! [`SessionError::SessionExpired`] so the session manager's single-retry
//! policy can take over.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

use shade_core::BlindId;

use crate::application::session::{DeviceSession, SessionError, SessionFactory};
use crate::domain::BridgeConfig;

const ACCOUNT_AUTH_URL: &str = "https://apis.control4.com/authentication/v1/rest";
const ACCOUNT_CONTROLLERS_URL: &str = "https://apis.control4.com/account/v3/rest/accounts";

/// Application key identifying third-party integrations to the account API
/// (the same public key the pyControl4 ecosystem uses).
const APPLICATION_KEY: &str = "78f6791373d61bea49fdb9fb8897f1f3af193f11";

// ── Gateway (SessionFactory) ──────────────────────────────────────────────────

/// Logs in to the Control4 cloud account and mints director sessions.
pub struct DirectorGateway {
    account_user: String,
    account_password: String,
    director_base: String,
    /// Client for the cloud account API (normal certificate validation).
    account_http: reqwest::Client,
    /// Client for the LAN director, which serves a self-signed certificate.
    director_http: reqwest::Client,
}

impl DirectorGateway {
    /// Builds the gateway and its HTTP clients from the bridge configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if either HTTP client cannot be constructed.
    pub fn new(config: &BridgeConfig) -> anyhow::Result<Self> {
        let account_http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build account API HTTP client")?;

        let director_http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .danger_accept_invalid_certs(true)
            .build()
            .context("failed to build director HTTP client")?;

        Ok(Self {
            account_user: config.account_user.clone(),
            account_password: config.account_password.clone(),
            director_base: format!("https://{}", config.director_host),
            account_http,
            director_http,
        })
    }

    /// Step 1: exchange the account credential for an account bearer token.
    async fn account_bearer_token(&self) -> Result<String, SessionError> {
        let body = json!({
            "clientInfo": {
                "device": {
                    "deviceName": "shade-bridge",
                    "deviceUUID": "0000000000000000",
                    "make": "shade-bridge",
                    "model": "shade-bridge",
                    "os": "Linux",
                    "osVersion": "1.0",
                },
                "userInfo": {
                    "applicationKey": APPLICATION_KEY,
                    "userName": self.account_user,
                    "password": self.account_password,
                },
            }
        });

        let response = self
            .account_http
            .post(ACCOUNT_AUTH_URL)
            .json(&body)
            .send()
            .await
            .map_err(downstream)?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(SessionError::BadCredentials);
        }
        let payload: Value = require_success(response).await?.json().await.map_err(downstream)?;

        token_of(&payload)
            .map(str::to_string)
            .ok_or_else(|| SessionError::Downstream("account token missing from response".to_string()))
    }

    /// Step 2a: look up the controller common name for this account.
    async fn controller_common_name(&self, account_token: &str) -> Result<String, SessionError> {
        let response = self
            .account_http
            .get(ACCOUNT_CONTROLLERS_URL)
            .bearer_auth(account_token)
            .send()
            .await
            .map_err(downstream)?;

        let payload: Value = require_success(response).await?.json().await.map_err(downstream)?;

        controller_name_of(&payload)
            .map(str::to_string)
            .ok_or_else(|| {
                SessionError::Downstream("controller common name missing from account".to_string())
            })
    }

    /// Step 2b: mint a bearer token scoped to that controller's director.
    async fn director_bearer_token(
        &self,
        account_token: &str,
        controller: &str,
    ) -> Result<(String, u64), SessionError> {
        let body = json!({
            "serviceInfo": {
                "commonName": controller,
                "services": "director",
            }
        });

        let response = self
            .account_http
            .post(format!("{ACCOUNT_AUTH_URL}/authorization"))
            .bearer_auth(account_token)
            .json(&body)
            .send()
            .await
            .map_err(downstream)?;

        let payload: Value = require_success(response).await?.json().await.map_err(downstream)?;

        let token = token_of(&payload)
            .map(str::to_string)
            .ok_or_else(|| SessionError::Downstream("director token missing from response".to_string()))?;
        let valid_seconds = payload
            .pointer("/authToken/validSeconds")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        Ok((token, valid_seconds))
    }
}

#[async_trait]
impl SessionFactory for DirectorGateway {
    async fn login(&self) -> Result<Arc<dyn DeviceSession>, SessionError> {
        let account_token = self.account_bearer_token().await?;
        let controller = self.controller_common_name(&account_token).await?;
        let (token, valid_seconds) = self
            .director_bearer_token(&account_token, &controller)
            .await?;

        info!("logged in to director, token expires in {valid_seconds}s");
        Ok(Arc::new(DirectorSession {
            http: self.director_http.clone(),
            base: self.director_base.clone(),
            token,
        }))
    }
}

// ── Director session (DeviceSession) ──────────────────────────────────────────

/// One authenticated handle to the LAN director. Immutable; replaced, not
/// refreshed, when its token expires.
struct DirectorSession {
    http: reqwest::Client,
    base: String,
    token: String,
}

impl DirectorSession {
    async fn get_json(&self, url: String, varnames: &str) -> Result<Value, SessionError> {
        let response = self
            .http
            .get(url)
            .query(&[("varnames", varnames)])
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(downstream)?;

        map_director_status(response).await?.json().await.map_err(downstream)
    }
}

#[async_trait]
impl DeviceSession for DirectorSession {
    async fn variable(&self, blind: BlindId, name: &str) -> Result<Value, SessionError> {
        let payload = self
            .get_json(format!("{}/api/v1/items/{blind}/variables", self.base), name)
            .await?;
        debug!("blind {blind} variable {name}: {payload}");
        Ok(variable_value(payload))
    }

    async fn command(
        &self,
        blind: BlindId,
        command: &str,
        params: Value,
    ) -> Result<(), SessionError> {
        let body = json!({
            "async": true,
            "command": command,
            "tParams": params,
        });

        let response = self
            .http
            .post(format!("{}/api/v1/items/{blind}/commands", self.base))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(downstream)?;

        map_director_status(response).await?;
        Ok(())
    }

    async fn all_item_variables(&self, varnames: &str) -> Result<Value, SessionError> {
        self.get_json(format!("{}/api/v1/items/variables", self.base), varnames)
            .await
    }
}

// ── Response mapping helpers ──────────────────────────────────────────────────

fn downstream(e: reqwest::Error) -> SessionError {
    SessionError::Downstream(e.to_string())
}

/// Non-success account API responses become downstream errors with the status
/// attached (401 is handled by callers where it means something specific).
async fn require_success(response: reqwest::Response) -> Result<reqwest::Response, SessionError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(SessionError::Downstream(format!(
            "account API returned {status}"
        )))
    }
}

/// Director 401 means the bearer token expired; everything else non-success
/// is an ordinary downstream failure.
async fn map_director_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, SessionError> {
    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        Err(SessionError::SessionExpired)
    } else if status.is_success() {
        Ok(response)
    } else {
        Err(SessionError::Downstream(format!(
            "director returned {status}"
        )))
    }
}

/// Pulls the bearer token out of an account API auth response.
fn token_of(payload: &Value) -> Option<&str> {
    payload.pointer("/authToken/token").and_then(Value::as_str)
}

/// Pulls the controller common name out of the account listing, which nests
/// it differently across account API versions.
fn controller_name_of(payload: &Value) -> Option<&str> {
    payload
        .pointer("/account/controllerCommonName")
        .or_else(|| payload.pointer("/account/0/controllerCommonName"))
        .or_else(|| payload.get("controllerCommonName"))
        .and_then(Value::as_str)
}

/// The director answers single-variable queries with a one-element list of
/// `{.., "value": ..}` records; unwrap to the bare value.
fn variable_value(payload: Value) -> Value {
    match &payload {
        Value::Array(items) => items
            .first()
            .and_then(|item| item.get("value"))
            .cloned()
            .unwrap_or(payload),
        Value::Object(map) => map.get("value").cloned().unwrap_or(payload),
        _ => payload,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
