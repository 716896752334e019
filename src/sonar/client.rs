use log::{debug, info};
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::auth::{Credentials, ServerAuth, Token};
use crate::dataset::ComplexityMeasurement;
use crate::error::{HarvestError, Result};

const SESSION_COOKIE: &str = "JWT-SESSION";

/// Client for the analysis server's web API.
pub struct SonarClient {
    client: Client,
    base_url: Url,
    auth: ServerAuth,
}

#[derive(Debug, Deserialize)]
struct MeasuresResponse {
    component: MeasuredComponent,
}

#[derive(Debug, Deserialize)]
struct MeasuredComponent {
    #[serde(default)]
    measures: Vec<Measure>,
}

#[derive(Debug, Deserialize)]
struct Measure {
    value: Option<String>,
}

fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(concat!("revharvest/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| HarvestError::Config(format!("Failed to create HTTP client: {e}")))
}

// Trailing slash so that `join` appends below a context path like `/sonar`.
fn parse_base_url(base_url: &str) -> Result<Url> {
    let normalized = format!("{}/", base_url.trim_end_matches('/'));
    Url::parse(&normalized).map_err(|e| HarvestError::Config(format!("Invalid server URL: {e}")))
}

/// Pulls the session token out of a `Set-Cookie` header value.
///
/// `JWT-SESSION=abc123; Path=/` yields `abc123`; any other cookie yields `None`.
pub fn extract_session_cookie(header: &str) -> Option<String> {
    let pair = header.split(';').next()?.trim();
    let (name, value) = pair.split_once('=')?;
    (name.trim() == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
}

impl SonarClient {
    pub fn new(base_url: &str, auth: ServerAuth) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            base_url: parse_base_url(base_url)?,
            auth,
        })
    }

    /// Posts credentials to the login endpoint and returns the session token.
    pub async fn login(base_url: &str, credentials: &Credentials) -> Result<Token> {
        let url = parse_base_url(base_url)?
            .join("api/authentication/login")
            .map_err(|e| HarvestError::Config(format!("Invalid login URL: {e}")))?;

        info!("Logging in to {} as {}", url.origin().ascii_serialization(), credentials.username);

        let response = build_client()?
            .post(url)
            .form(&[
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Auth(format!(
                "login rejected with status {}",
                status.as_u16()
            )));
        }

        response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(extract_session_cookie)
            .map(Token::from)
            .ok_or_else(|| HarvestError::Auth(format!("no {SESSION_COOKIE} cookie in login response")))
    }

    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            ServerAuth::Bearer(token) => request.bearer_auth(token.as_str()),
            ServerAuth::Session(session) => {
                request.header(COOKIE, format!("{SESSION_COOKIE}={}", session.as_str()))
            }
        }
    }

    fn measures_url(&self, project_key: &str) -> Result<Url> {
        let mut url = self
            .base_url
            .join("api/measures/component")
            .map_err(|e| HarvestError::Config(format!("Invalid measures URL: {e}")))?;

        url.query_pairs_mut()
            .append_pair("additionalFields", "period,metrics")
            .append_pair("component", project_key)
            .append_pair("metricKeys", "complexity");

        Ok(url)
    }

    /// Queries the `complexity` measure of `project_key`.
    ///
    /// Anything but `200 OK` is an error, as is a body without a measure value.
    pub async fn fetch_complexity(&self, project_key: &str) -> Result<ComplexityMeasurement> {
        let url = self.measures_url(project_key)?;
        debug!("GET {url}");

        let response = self.auth_request(self.client.get(url)).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(HarvestError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: MeasuresResponse = serde_json::from_str(&response.text().await?)?;
        let value = body
            .component
            .measures
            .into_iter()
            .next()
            .and_then(|measure| measure.value)
            .ok_or_else(|| HarvestError::MissingMeasure(project_key.to_string()))?;

        let complexity = value.parse::<f64>().map_err(|_| {
            HarvestError::MissingMeasure(format!("{project_key} (unparsable value '{value}')"))
        })?;

        Ok(ComplexityMeasurement { complexity })
    }
}
