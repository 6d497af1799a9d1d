//! OAuth 2.0 authorization-code flow with PKCE for Google APIs.
//!
//! The flow binds a loopback listener, sends the user's browser to Google's
//! consent page with a SHA-256 code challenge, waits for the redirect carrying
//! the authorization code, and exchanges code plus verifier for tokens.
//! A random `state` value is checked on the way back.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};

use super::config::OAuthCredentials;
use super::tokens::TokenInfo;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Random bytes behind the PKCE code verifier, before base64 encoding.
const CODE_VERIFIER_LENGTH: usize = 32;
const STATE_LENGTH: usize = 16;

/// How long the user has to finish the consent screen.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

const CALLBACK_PATH: &str = "/callback";

const SUCCESS_PAGE: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n\
    <html><body><h1>no-more-lateness is authorized</h1>\
    <p>You can close this window and return to the terminal.</p></body></html>";

const FAILURE_PAGE: &str = "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\n\r\n\
    <html><body><h1>Authorization failed</h1>\
    <p>You can close this window.</p></body></html>";

/// OAuth client for obtaining and refreshing Google tokens.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    http_client: reqwest::Client,
}

impl OAuthClient {
    pub fn new(credentials: OAuthCredentials, timeout: Duration) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::internal("failed to create HTTP client").with_source(e))?;

        Ok(Self {
            credentials,
            http_client,
        })
    }

    /// Runs the interactive consent flow and returns fresh tokens.
    ///
    /// The authorization URL is opened in the default browser and also
    /// printed to stderr for terminals where no browser can be launched.
    pub async fn authorize(
        &self,
        scopes: &[String],
        port_range: (u16, u16),
    ) -> ProviderResult<TokenInfo> {
        let pkce = PkceFlow::new();

        let (listener, port) = bind_loopback(port_range)?;
        let redirect_uri = format!("http://127.0.0.1:{}{}", port, CALLBACK_PATH);
        let auth_url = pkce.build_auth_url(&self.credentials.client_id, &redirect_uri, scopes);

        info!("starting OAuth flow");
        eprintln!("Open this URL in your browser to authorize no-more-lateness:\n\n{}\n", auth_url);
        if let Err(e) = open::that(&auth_url) {
            warn!(error = %e, "failed to open browser");
        }

        let callback = wait_for_callback(listener)?;
        if callback.state.as_deref() != Some(pkce.state.as_str()) {
            return Err(ProviderError::authentication(
                "OAuth state mismatch, authorization aborted",
            ));
        }

        info!("received authorization code");
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", callback.code.as_str()),
            ("code_verifier", pkce.verifier.as_str()),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri.as_str()),
        ];
        let response = self.post_token_request(&params, "token exchange").await?;

        info!("obtained tokens");
        Ok(TokenInfo::new(
            response.access_token,
            response.refresh_token,
            response.expires_in,
            scopes.to_vec(),
        ))
    }

    /// Exchanges a refresh token for a new access token and its lifetime.
    pub async fn refresh_token(&self, refresh_token: &str) -> ProviderResult<(String, Option<i64>)> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        let response = self.post_token_request(&params, "token refresh").await?;

        info!("refreshed access token");
        Ok((response.access_token, response.expires_in))
    }

    async fn post_token_request(
        &self,
        params: &[(&str, &str)],
        what: &str,
    ) -> ProviderResult<TokenResponse> {
        let response = self
            .http_client
            .post(GOOGLE_TOKEN_URL)
            .form(params)
            .send()
            .await
            .map_err(|e| ProviderError::network(format!("{} request failed: {}", what, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(token_endpoint_error(what, status.as_u16(), &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| ProviderError::invalid_response(format!("invalid token response: {}", e)))
    }
}

/// Error body of the token endpoint (RFC 6749, section 5.2).
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

fn token_endpoint_error(what: &str, status: u16, body: &str) -> ProviderError {
    match serde_json::from_str::<TokenErrorResponse>(body) {
        Ok(response) if response.error == "invalid_grant" => ProviderError::authentication(format!(
            "{} rejected, the grant was revoked or has expired: run 'no-more-lateness auth google --force'",
            what
        )),
        Ok(response) => {
            let detail = response
                .error_description
                .map(|d| format!(" ({})", d))
                .unwrap_or_default();
            ProviderError::authentication(format!("{} failed: {}{}", what, response.error, detail))
        }
        Err(_) => ProviderError::authentication(format!(
            "{} failed with HTTP {}: {}",
            what,
            status,
            body.trim()
        )),
    }
}

/// Binds the first free port of `port_range` on 127.0.0.1.
fn bind_loopback(port_range: (u16, u16)) -> ProviderResult<(TcpListener, u16)> {
    (port_range.0..=port_range.1)
        .find_map(|port| {
            TcpListener::bind(("127.0.0.1", port))
                .ok()
                .map(|listener| (listener, port))
        })
        .inspect(|(_, port)| debug!(port, "bound loopback listener"))
        .ok_or_else(|| {
            ProviderError::configuration(format!(
                "no available port in range {}-{}",
                port_range.0, port_range.1
            ))
        })
}

/// Waits for the browser redirect, giving up after [`CALLBACK_TIMEOUT`].
fn wait_for_callback(listener: TcpListener) -> ProviderResult<Callback> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    if let Some(result) = answer_callback(stream) {
                        let _ = tx.send(result);
                        return;
                    }
                }
                Err(e) => warn!(error = %e, "failed to accept connection"),
            }
        }
    });

    match rx.recv_timeout(CALLBACK_TIMEOUT) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            Err(ProviderError::authentication("timed out waiting for the OAuth callback"))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(ProviderError::internal("callback listener stopped"))
        }
    }
}

/// Reads one request, answers the browser and returns the outcome.
///
/// Returns `None` for requests that are not the callback (favicon etc.).
fn answer_callback(mut stream: TcpStream) -> Option<ProviderResult<Callback>> {
    let mut request_line = String::new();
    BufReader::new(&stream).read_line(&mut request_line).ok()?;

    let result = parse_callback(&request_line)?;
    let page = if result.is_ok() { SUCCESS_PAGE } else { FAILURE_PAGE };
    let _ = stream.write_all(page.as_bytes());
    let _ = stream.flush();
    Some(result)
}

/// Parameters of a successful redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Callback {
    code: String,
    state: Option<String>,
}

/// Parses `GET /callback?code=...&state=... HTTP/1.1`.
fn parse_callback(request_line: &str) -> Option<ProviderResult<Callback>> {
    let mut parts = request_line.split_whitespace();
    if parts.next()? != "GET" {
        return None;
    }
    let target = parts.next()?;
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    if path != CALLBACK_PATH {
        return None;
    }

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in query.split('&').filter_map(|pair| pair.split_once('=')) {
        let value = urlencoding::decode(value)
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| value.to_string());
        match key {
            "code" => code = Some(value),
            "state" => state = Some(value),
            "error" => error = Some(value),
            _ => {}
        }
    }

    let result = match (error, code) {
        (Some(error), _) => Err(ProviderError::authentication(format!(
            "authorization denied: {}",
            error
        ))),
        (None, Some(code)) => Ok(Callback { code, state }),
        (None, None) => Err(ProviderError::authentication(
            "missing authorization code in callback",
        )),
    };
    Some(result)
}

/// PKCE verifier, challenge and CSRF state (RFC 7636).
#[derive(Debug)]
pub struct PkceFlow {
    pub verifier: String,
    /// SHA-256 of the verifier, base64url encoded.
    pub challenge: String,
    pub state: String,
}

impl PkceFlow {
    pub fn new() -> Self {
        let verifier = random_token(CODE_VERIFIER_LENGTH);
        let challenge = compute_challenge(&verifier);
        Self {
            verifier,
            challenge,
            state: random_token(STATE_LENGTH),
        }
    }

    /// Builds the Google consent URL for offline (refreshable) access.
    pub fn build_auth_url(&self, client_id: &str, redirect_uri: &str, scopes: &[String]) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&\
            code_challenge={}&code_challenge_method=S256&state={}&\
            access_type=offline&prompt=consent",
            GOOGLE_AUTH_URL,
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scopes.join(" ")),
            urlencoding::encode(&self.challenge),
            urlencoding::encode(&self.state),
        )
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}

fn compute_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Response from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    mod pkce {
        use super::*;

        #[test]
        fn verifier_length() {
            // 32 bytes base64url without padding
            assert_eq!(PkceFlow::new().verifier.len(), 43);
        }

        #[test]
        fn challenge_matches_rfc_example() {
            // RFC 7636 appendix B
            assert_eq!(
                compute_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
                "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
            );
        }

        #[test]
        fn flows_are_random() {
            let a = PkceFlow::new();
            let b = PkceFlow::new();
            assert_ne!(a.challenge, b.challenge);
            assert_ne!(a.state, b.state);
        }

        #[test]
        fn auth_url_format() {
            let flow = PkceFlow::new();
            let url = flow.build_auth_url(
                "test-client.apps.googleusercontent.com",
                "http://127.0.0.1:8080/callback",
                &["https://www.googleapis.com/auth/calendar.readonly".to_string()],
            );

            assert!(url.starts_with(GOOGLE_AUTH_URL));
            assert!(url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A8080%2Fcallback"));
            assert!(url.contains("code_challenge_method=S256"));
            assert!(url.contains(&format!("state={}", flow.state)));
            assert!(url.contains("access_type=offline"));
        }
    }

    mod callback {
        use super::*;

        #[test]
        fn code_and_state() {
            let result = parse_callback("GET /callback?state=abc&code=4%2F0AX HTTP/1.1\r\n");
            assert_eq!(
                result.unwrap().unwrap(),
                Callback {
                    code: "4/0AX".to_string(),
                    state: Some("abc".to_string())
                }
            );
        }

        #[test]
        fn denied() {
            let result = parse_callback("GET /callback?error=access_denied HTTP/1.1");
            let err = result.unwrap().unwrap_err();
            assert!(err.message().contains("access_denied"));
        }

        #[test]
        fn missing_code() {
            let result = parse_callback("GET /callback?state=abc HTTP/1.1");
            assert!(result.unwrap().is_err());
        }

        #[test]
        fn other_requests_are_ignored() {
            assert!(parse_callback("GET /favicon.ico HTTP/1.1").is_none());
            assert!(parse_callback("POST /callback?code=x HTTP/1.1").is_none());
            assert!(parse_callback("").is_none());
        }
    }

    mod token_errors {
        use super::*;

        #[test]
        fn revoked_grant_asks_for_reauth() {
            let err = token_endpoint_error(
                "token refresh",
                400,
                r#"{"error": "invalid_grant", "error_description": "Token has been expired or revoked."}"#,
            );
            assert!(err.message().contains("auth google --force"));
        }

        #[test]
        fn other_oauth_errors_keep_description() {
            let err = token_endpoint_error(
                "token exchange",
                401,
                r#"{"error": "invalid_client", "error_description": "Unauthorized"}"#,
            );
            assert_eq!(err.message(), "token exchange failed: invalid_client (Unauthorized)");
        }

        #[test]
        fn non_json_body() {
            let err = token_endpoint_error("token refresh", 502, "Bad Gateway\n");
            assert_eq!(err.message(), "token refresh failed with HTTP 502: Bad Gateway");
        }
    }

    #[test]
    fn bind_reports_exhausted_range() {
        let held = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let port = held.local_addr().unwrap().port();
        let err = bind_loopback((port, port)).unwrap_err();
        assert!(err.message().contains("no available port"));
        drop(held);
    }
}
