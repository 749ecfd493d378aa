// =============================================================================
// GOOGLE SHEETS CLIENT WITH SERVICE ACCOUNT AUTHENTICATION
// =============================================================================
//
// Thin client over the Sheets v4 values API. The roster store on top of
// this works in whole ranges; this layer only knows about cells.
//
// **Setup:**
//
// 1. Create a service account in Google Cloud Console and enable the
//    Google Sheets API for the project.
// 2. Create a JSON key for the service account.
// 3. Share the spreadsheet with the service account email
//    (name@project.iam.gserviceaccount.com) as an Editor.
// 4. Set environment variables:
//    - `GOOGLE_SERVICE_ACCOUNT_KEY` - Path to the JSON key file
//      OR
//    - `GOOGLE_SERVICE_ACCOUNT_JSON` - The JSON content directly
//    - `SPREADSHEET_ID` - The spreadsheet ID or its full URL

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::RwLock;

const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Retry budget for transient API failures.
const MAX_ATTEMPTS: u32 = 4;
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Sheets API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Sheets API quota exhausted, try again later")]
    QuotaExhausted,

    #[error("Malformed sheet data: {0}")]
    Malformed(String),
}

// =============================================================================
// SERVICE ACCOUNT AUTHENTICATION
// =============================================================================

/// Service account credentials from the JSON key file.
#[derive(Debug, Clone, Deserialize)]
struct ServiceAccountCredentials {
    /// The service account email (used as issuer in JWT).
    client_email: String,

    /// The private key in PEM format.
    private_key: String,

    /// The token URI (where to exchange JWT for access token).
    token_uri: String,
}

/// JWT claims for Google OAuth2.
#[derive(Debug, Serialize)]
struct JwtClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[allow(dead_code)]
    expires_in: u64,
}

struct CachedToken {
    token: String,
    expires_at: SystemTime,
}

/// Authenticator that handles OAuth2 with service account credentials.
pub struct ServiceAccountAuth {
    credentials: ServiceAccountCredentials,
    client: Client,
    cached_token: Arc<RwLock<Option<CachedToken>>>,
}

impl ServiceAccountAuth {
    /// Creates a new authenticator from a JSON key file path.
    pub async fn from_file(path: &str) -> Result<Self, SheetError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SheetError::Auth(format!("Cannot read key file '{}': {}", path, e)))?;
        Self::from_json(&content)
    }

    /// Creates a new authenticator from JSON content.
    pub fn from_json(json: &str) -> Result<Self, SheetError> {
        let credentials: ServiceAccountCredentials = serde_json::from_str(json)
            .map_err(|e| SheetError::Auth(format!("Invalid service account JSON: {}", e)))?;
        Ok(Self {
            credentials,
            client: Client::new(),
            cached_token: Arc::new(RwLock::new(None)),
        })
    }

    /// Creates from environment variables.
    pub async fn from_env() -> Result<Self, SheetError> {
        if let Ok(path) = std::env::var("GOOGLE_SERVICE_ACCOUNT_KEY") {
            return Self::from_file(&path).await;
        }

        if let Ok(json) = std::env::var("GOOGLE_SERVICE_ACCOUNT_JSON") {
            return Self::from_json(&json);
        }

        Err(SheetError::Auth(
            "Neither GOOGLE_SERVICE_ACCOUNT_KEY nor GOOGLE_SERVICE_ACCOUNT_JSON is set."
                .to_string(),
        ))
    }

    /// Gets a valid access token, refreshing if necessary.
    pub async fn get_access_token(&self) -> Result<String, SheetError> {
        // Check if we have a valid cached token
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at > SystemTime::now() + Duration::from_secs(60) {
                    return Ok(token.token.clone());
                }
            }
        }

        let new_token = self.fetch_new_token().await?;

        {
            let mut cached = self.cached_token.write().await;
            *cached = Some(CachedToken {
                token: new_token.clone(),
                expires_at: SystemTime::now() + Duration::from_secs(55 * 60),
            });
        }

        Ok(new_token)
    }

    /// Fetches a new access token from Google.
    async fn fetch_new_token(&self) -> Result<String, SheetError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| SheetError::Auth(e.to_string()))?
            .as_secs();

        let claims = JwtClaims {
            iss: self.credentials.client_email.clone(),
            scope: SHEETS_SCOPE.to_string(),
            aud: self.credentials.token_uri.clone(),
            iat: now,
            exp: now + 3600,
        };

        let header = Header::new(Algorithm::RS256);
        let key = EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())
            .map_err(|e| SheetError::Auth(format!("Invalid private key: {}", e)))?;
        let jwt = encode(&header, &claims, &key)
            .map_err(|e| SheetError::Auth(format!("Failed to sign JWT: {}", e)))?;

        let response = self
            .client
            .post(&self.credentials.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", &jwt),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await?;
            return Err(SheetError::Auth(format!(
                "Token exchange failed ({}): {}",
                status, text
            )));
        }

        let token_response: TokenResponse = response.json().await?;
        Ok(token_response.access_token)
    }
}

// =============================================================================
// SHEETS API RESPONSE STRUCTURES
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

// =============================================================================
// SHEETS CLIENT
// =============================================================================

/// Client for one spreadsheet, addressed by A1 ranges.
pub struct SheetsClient {
    client: Client,
    auth: ServiceAccountAuth,
    spreadsheet_id: String,
}

impl SheetsClient {
    pub fn new(auth: ServiceAccountAuth, spreadsheet_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            auth,
            spreadsheet_id: spreadsheet_id.into(),
        }
    }

    /// Reads a range. Cells come back as display strings; missing
    /// trailing cells in a row are simply absent.
    pub async fn get_range(&self, range: &str) -> Result<Vec<Vec<String>>, SheetError> {
        let url = format!(
            "{}/{}/values/{}",
            API_BASE,
            self.spreadsheet_id,
            urlencode(range)
        );

        let body = self
            .request_with_retry(|token| self.client.get(&url).bearer_auth(token))
            .await?;

        let value_range: ValueRange = serde_json::from_str(&body)
            .map_err(|e| SheetError::Malformed(format!("Bad values response: {}", e)))?;

        Ok(value_range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(json_cell_to_string).collect())
            .collect())
    }

    /// Overwrites a range with raw (unparsed) values.
    pub async fn update_range(
        &self,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<(), SheetError> {
        let url = format!(
            "{}/{}/values/{}?valueInputOption=RAW",
            API_BASE,
            self.spreadsheet_id,
            urlencode(range)
        );
        let payload = serde_json::json!({ "values": values });

        self.request_with_retry(|token| self.client.put(&url).bearer_auth(token).json(&payload))
            .await?;
        Ok(())
    }

    /// Appends rows after the last data row of the range's table.
    pub async fn append_rows(
        &self,
        range: &str,
        rows: Vec<Vec<String>>,
    ) -> Result<(), SheetError> {
        let url = format!(
            "{}/{}/values/{}:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
            API_BASE,
            self.spreadsheet_id,
            urlencode(range)
        );
        let payload = serde_json::json!({ "values": rows });

        self.request_with_retry(|token| self.client.post(&url).bearer_auth(token).json(&payload))
            .await?;
        Ok(())
    }

    /// Clears all values in a range, leaving formatting intact.
    pub async fn clear_range(&self, range: &str) -> Result<(), SheetError> {
        let url = format!(
            "{}/{}/values/{}:clear",
            API_BASE,
            self.spreadsheet_id,
            urlencode(range)
        );

        self.request_with_retry(|token| {
            self.client
                .post(&url)
                .bearer_auth(token)
                .json(&serde_json::json!({}))
        })
        .await?;
        Ok(())
    }

    /// Runs a request, retrying transient failures with exponential
    /// backoff. The builder closure is called once per attempt so the
    /// request body can be rebuilt.
    async fn request_with_retry<F>(&self, build: F) -> Result<String, SheetError>
    where
        F: Fn(&str) -> reqwest::RequestBuilder,
    {
        let mut backoff = INITIAL_BACKOFF;
        let mut last_error = SheetError::QuotaExhausted;

        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }

            let token = self.auth.get_access_token().await?;
            let response = match build(&token).send().await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!("Sheets request failed (attempt {}): {}", attempt + 1, e);
                    last_error = SheetError::Http(e);
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                return Ok(response.text().await?);
            }

            let message = response.text().await.unwrap_or_default();
            if is_retryable(status) {
                tracing::warn!(
                    "Sheets API returned {} (attempt {}), backing off",
                    status,
                    attempt + 1
                );
                last_error = if status == StatusCode::TOO_MANY_REQUESTS {
                    SheetError::QuotaExhausted
                } else {
                    SheetError::Api {
                        status: status.as_u16(),
                        message,
                    }
                };
                continue;
            }

            return Err(SheetError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Err(last_error)
    }
}

fn is_retryable(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
    )
}

/// The values API returns numbers and bools for untyped cells.
fn json_cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Minimal percent-encoding for A1 ranges in URL paths (`!` and `:` are
/// fine, spaces and quotes in sheet names are not).
fn urlencode(range: &str) -> String {
    range
        .chars()
        .flat_map(|c| match c {
            ' ' => "%20".chars().collect::<Vec<_>>(),
            '\'' => "%27".chars().collect(),
            c => vec![c],
        })
        .collect()
}

/// Accepts a bare spreadsheet ID or a full spreadsheet URL.
pub fn extract_spreadsheet_id(url_or_id: &str) -> Option<String> {
    if url_or_id.contains("docs.google.com") {
        if let Some(start) = url_or_id.find("/spreadsheets/d/") {
            let after_d = &url_or_id[start + 16..];
            let end = after_d
                .find(|c| c == '/' || c == '?' || c == '#')
                .unwrap_or(after_d.len());
            let id = &after_d[..end];
            if !id.is_empty() {
                return Some(id.to_string());
            }
        }
        None
    } else if !url_or_id.contains('/') && !url_or_id.contains(' ') && !url_or_id.is_empty() {
        Some(url_or_id.to_string())
    } else {
        None
    }
}
