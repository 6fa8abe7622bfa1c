use std::{
    path::Path,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use {
    jsonwebtoken::{Algorithm, EncodingKey, Header},
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    tracing::debug,
};

use crate::error::{Context, Error, Result};

/// Full read/write access to the files the service account can see.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Assertion lifetime; Google rejects anything above one hour.
const ASSERTION_TTL_SECS: u64 = 3600;

/// Authorization for Drive API calls, derived from a long-lived credential.
///
/// Treated as short-lived: nothing caches it between uploads.
#[derive(Clone)]
pub struct ServiceHandle {
    access_token: Secret<String>,
    expires_in: Option<u64>,
}

impl ServiceHandle {
    #[must_use]
    pub fn new(access_token: Secret<String>, expires_in: Option<u64>) -> Self {
        Self {
            access_token,
            expires_in,
        }
    }

    pub(crate) fn bearer(&self) -> &str {
        self.access_token.expose_secret()
    }

    #[must_use]
    pub fn expires_in(&self) -> Option<u64> {
        self.expires_in
    }
}

impl std::fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("access_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Source of Drive authorization.
///
/// Implementations may block on network I/O.
pub trait CredentialProvider: Send + Sync {
    fn authorize(&self) -> Result<ServiceHandle>;
}

/// The parts of a Google service-account JSON key the token exchange needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: Secret<String>,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".into()
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    pub fn from_json(raw: &str) -> Result<Self> {
        let key: Self = serde_json::from_str(raw).context("invalid service account key")?;
        if key.client_email.trim().is_empty() {
            return Err(Error::message("service account key has no client_email"));
        }
        Ok(key)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read service account key {}", path.display()))?;
        Self::from_json(&raw)
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Two-legged OAuth for service accounts: a signed RS256 assertion is
/// exchanged at the key's `token_uri` for an access token.
pub struct ServiceAccountCredentials {
    key: ServiceAccountKey,
    timeout: Duration,
}

impl ServiceAccountCredentials {
    #[must_use]
    pub fn new(key: ServiceAccountKey, timeout: Duration) -> Self {
        Self { key, timeout }
    }

    #[must_use]
    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    fn signed_assertion(&self) -> Result<String> {
        let iat = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: DRIVE_SCOPE,
            aud: &self.key.token_uri,
            iat,
            exp: iat + ASSERTION_TTL_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        let signing_key = EncodingKey::from_rsa_pem(self.key.private_key.expose_secret().as_bytes())?;
        Ok(jsonwebtoken::encode(&header, &claims, &signing_key)?)
    }
}

impl CredentialProvider for ServiceAccountCredentials {
    fn authorize(&self) -> Result<ServiceHandle> {
        let assertion = self.signed_assertion()?;

        // Blocking clients own an internal runtime; build and drop them on the
        // calling (blocking) thread.
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?;
        let response = client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)])
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api {
                operation: "token exchange",
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        let token: TokenResponse = response.json()?;
        debug!(
            client_email = %self.key.client_email,
            expires_in = ?token.expires_in,
            "obtained drive access token"
        );
        Ok(ServiceHandle::new(
            Secret::new(token.access_token),
            token.expires_in,
        ))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use {
        axum::{Form, Json, Router, extract::State, http::StatusCode, routing::post},
        jsonwebtoken::{DecodingKey, Validation},
        serde_json::json,
        std::collections::HashMap,
    };

    use super::*;

    const FIXTURE: &str = include_str!("../tests/fixtures/service_account.json");

    #[derive(Debug, Deserialize)]
    struct Claims {
        iss: String,
        scope: String,
        aud: String,
        iat: u64,
        exp: u64,
    }

    type Captured = Arc<Mutex<Vec<HashMap<String, String>>>>;

    async fn token_handler(
        State(captured): State<Captured>,
        Form(form): Form<HashMap<String, String>>,
    ) -> (StatusCode, Json<serde_json::Value>) {
        captured.lock().expect("lock captured").push(form);
        (
            StatusCode::OK,
            Json(json!({
                "access_token": "ya29.test-token",
                "expires_in": 3599,
                "token_type": "Bearer"
            })),
        )
    }

    async fn start_token_server(status_ok: bool) -> (String, Captured) {
        let captured: Captured = Arc::default();
        let app = if status_ok {
            Router::new()
                .route("/token", post(token_handler))
                .with_state(Arc::clone(&captured))
        } else {
            Router::new().route(
                "/token",
                post(|| async { (StatusCode::BAD_REQUEST, "invalid_grant") }),
            )
        };
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind token server");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve token api");
        });
        (format!("http://{addr}/token"), captured)
    }

    #[test]
    fn parses_fixture_key() {
        let key = ServiceAccountKey::from_json(FIXTURE).unwrap();
        assert_eq!(
            key.client_email,
            "relay@drivebot-test.iam.gserviceaccount.com"
        );
        assert_eq!(key.private_key_id.as_deref(), Some("test-key-1"));
        assert!(!format!("{key:?}").contains("PRIVATE KEY"));
    }

    #[test]
    fn rejects_key_without_client_email() {
        let err = ServiceAccountKey::from_json(r#"{"client_email": "", "private_key": "x"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("client_email"));
    }

    #[test]
    fn missing_key_file_names_the_path() {
        let err = ServiceAccountKey::from_file(Path::new("/nonexistent/creds.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/creds.json"), "{err}");
    }

    #[test]
    fn assertion_is_signed_with_key_id_and_scope() {
        let key = ServiceAccountKey::from_json(FIXTURE).unwrap();
        let creds = ServiceAccountCredentials::new(key, Duration::from_secs(5));
        let jwt = creds.signed_assertion().unwrap();

        let header = jsonwebtoken::decode_header(&jwt).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(header.kid.as_deref(), Some("test-key-1"));

        let mut validation = Validation::new(Algorithm::RS256);
        validation.insecure_disable_signature_validation();
        validation.set_audience(&["https://oauth2.googleapis.com/token"]);
        let claims =
            jsonwebtoken::decode::<Claims>(&jwt, &DecodingKey::from_secret(&[]), &validation)
                .unwrap()
                .claims;
        assert_eq!(claims.iss, "relay@drivebot-test.iam.gserviceaccount.com");
        assert_eq!(claims.scope, DRIVE_SCOPE);
        assert_eq!(claims.aud, "https://oauth2.googleapis.com/token");
        assert_eq!(claims.exp - claims.iat, ASSERTION_TTL_SECS);
    }

    #[tokio::test]
    async fn exchanges_assertion_for_access_token() {
        let (token_uri, captured) = start_token_server(true).await;
        let mut key = ServiceAccountKey::from_json(FIXTURE).unwrap();
        key.token_uri = token_uri;
        let creds = ServiceAccountCredentials::new(key, Duration::from_secs(5));

        let handle = tokio::task::spawn_blocking(move || creds.authorize())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(handle.bearer(), "ya29.test-token");
        assert_eq!(handle.expires_in(), Some(3599));

        let forms = captured.lock().unwrap();
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0]["grant_type"], JWT_BEARER_GRANT);
        assert_eq!(forms[0]["assertion"].split('.').count(), 3);
    }

    #[tokio::test]
    async fn rejected_exchange_is_an_api_error() {
        let (token_uri, _captured) = start_token_server(false).await;
        let mut key = ServiceAccountKey::from_json(FIXTURE).unwrap();
        key.token_uri = token_uri;
        let creds = ServiceAccountCredentials::new(key, Duration::from_secs(5));

        let err = tokio::task::spawn_blocking(move || creds.authorize())
            .await
            .unwrap()
            .unwrap_err();
        match err {
            Error::Api { status, body, .. } => {
                assert_eq!(status, 400);
                assert_eq!(body, "invalid_grant");
            },
            other => panic!("expected api error, got {other:?}"),
        }
    }
}
