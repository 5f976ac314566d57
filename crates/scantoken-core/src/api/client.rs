//! Hub client for the login and scan ID exchange endpoints.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ApiError;
use crate::auth::{Credentials, Negotiator};

/// Login endpoint, relative to the Hub base URL
const LOGIN_PATH: &str = "/v2/users/login";

/// Scan ID exchange endpoint, relative to the Hub base URL
const SCAN_ID_PATH: &str = "/v2/scan/provider/id";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct ScanIdResponse {
    id: String,
}

/// Hub session obtained from a login; only meaningful to `HubClient`.
#[derive(Clone)]
pub struct HubSession {
    token: String,
}

impl std::fmt::Debug for HubSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubSession").finish_non_exhaustive()
    }
}

/// Blocking Hub API client.
#[derive(Clone)]
pub struct HubClient {
    client: Client,
    base_url: String,
}

impl HubClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Log in with a username and password or personal access token
    pub fn login(&self, credentials: &Credentials) -> Result<HubSession> {
        let url = format!("{}{}", self.base_url, LOGIN_PATH);
        debug!(username = %credentials.username, "Logging in to Hub");

        let response = self
            .client
            .post(&url)
            .json(&LoginRequest {
                username: &credentials.username,
                password: &credentials.secret,
            })
            .send()
            .map_err(ApiError::from)
            .context("Failed to send login request")?;

        let login: LoginResponse = Self::check_response(response)?
            .json()
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
            .context("Failed to parse login response")?;

        if login.token.is_empty() {
            return Err(ApiError::InvalidResponse("empty session token".to_string()).into());
        }
        Ok(HubSession { token: login.token })
    }

    /// Exchange a Hub session for a scan ID token
    pub fn get_scan_id(&self, session: &HubSession) -> Result<String> {
        let url = format!("{}{}", self.base_url, SCAN_ID_PATH);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&session.token)
            .send()
            .map_err(ApiError::from)
            .context("Failed to send scan id request")?;

        let scan_id: ScanIdResponse = Self::check_response(response)?
            .json()
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
            .context("Failed to parse scan id response")?;

        if scan_id.id.is_empty() {
            return Err(ApiError::InvalidResponse("empty scan id".to_string()).into());
        }
        Ok(scan_id.id)
    }

    /// Check if response is successful, returning an error with body if not.
    fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }
}

impl Negotiator for HubClient {
    type Session = HubSession;

    fn login(&self, credentials: &Credentials) -> Result<HubSession> {
        HubClient::login(self, credentials)
    }

    fn scan_id(&self, session: &HubSession) -> Result<String> {
        self.get_scan_id(session)
    }
}
