// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MoveIt

//! Campus SSO (CAS / LemonLDAP portal) delegate.
//!
//! ## Protocol
//!
//! 1. `POST <cas>/` with form body `user=<username>&password=<password>`.
//!    The body is always parsed as JSON: the portal labels failure responses
//!    `application/javascript`, so the content type is never consulted.
//!    `result == 0`, a missing/non-numeric `result` or an unparseable body
//!    means the credentials were rejected.
//! 2. A successful answer must set the `lemonldap` session cookie.
//! 3. `POST <cas>/session/my/global` with that cookie returns the profile
//!    `{numero, mail, prenom, nom}`.
//!
//! Transport errors, timeouts, 5xx answers on step 1 and any failure of step 3
//! are reported as `ServiceUnavailable`, never as rejected credentials.
//!
//! The HTTP client has no cookie jar and does not follow redirects: the
//! session cookie is read from the portal's direct answer, forwarded
//! explicitly and never outlives one login.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, COOKIE};
use reqwest::redirect::Policy;
use reqwest::{Client, Response};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use url::Url;

use super::error::AuthError;
use crate::config::CasConfig;
use crate::storage::UserId;

/// Name of the session cookie handed out by the portal.
pub const SESSION_COOKIE_NAME: &str = "lemonldap";

/// Profile endpoint, relative to the portal root.
const PROFILE_PATH: &str = "session/my/global";

/// Verified campus identity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExternalIdentity {
    /// Campus number; becomes the local user id
    #[serde(deserialize_with = "numeric_id")]
    pub numero: UserId,
    #[serde(rename = "mail")]
    pub email: String,
    #[serde(rename = "prenom")]
    pub first_name: String,
    #[serde(rename = "nom")]
    pub last_name: String,
}

/// Cookie taken from the login answer, only used for the profile call.
struct SessionCookie {
    name: String,
    value: String,
}

impl SessionCookie {
    fn header_value(&self) -> Result<HeaderValue, AuthError> {
        HeaderValue::from_str(&format!("{}={}", self.name, self.value))
            .map_err(|_| AuthError::SessionCookieMissing)
    }
}

/// Client for the campus SSO portal.
///
/// Built once at startup and shared through `AppState`.
#[derive(Debug, Clone)]
pub struct CasClient {
    login_url: Url,
    profile_url: Url,
    http: Client,
}

impl CasClient {
    pub fn new(config: &CasConfig) -> Result<Self, AuthError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .timeout(config.timeout)
            .redirect(Policy::none())
            .default_headers(headers)
            .build()
            .map_err(|e| AuthError::InternalError(format!("failed to build CAS client: {e}")))?;

        let login_url = root_url(&config.base_url);
        let profile_url = login_url
            .join(PROFILE_PATH)
            .map_err(|e| AuthError::InternalError(format!("invalid CAS profile URL: {e}")))?;

        Ok(Self {
            login_url,
            profile_url,
            http,
        })
    }

    pub fn login_url(&self) -> &Url {
        &self.login_url
    }

    /// Verify campus credentials and fetch the matching identity.
    ///
    /// Fails with exactly one of `AuthFailed`, `SessionCookieMissing` or
    /// `ServiceUnavailable`.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<ExternalIdentity, AuthError> {
        let cookie = self.open_session(username, password).await?;
        self.fetch_identity(&cookie).await
    }

    async fn open_session(&self, username: &str, password: &str) -> Result<SessionCookie, AuthError> {
        let response = self
            .http
            .post(self.login_url.clone())
            .form(&[("user", username), ("password", password)])
            .send()
            .await
            .map_err(|e| AuthError::ServiceUnavailable(format!("login request failed: {e}")))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(AuthError::ServiceUnavailable(format!(
                "login request returned {status}"
            )));
        }

        let cookie = session_cookie(&response);
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::ServiceUnavailable(format!("login response unreadable: {e}")))?;

        if !login_accepted(&body) {
            return Err(AuthError::AuthFailed);
        }

        cookie.ok_or(AuthError::SessionCookieMissing)
    }

    async fn fetch_identity(&self, cookie: &SessionCookie) -> Result<ExternalIdentity, AuthError> {
        let response = self
            .http
            .post(self.profile_url.clone())
            .header(COOKIE, cookie.header_value()?)
            .send()
            .await
            .map_err(|e| AuthError::ServiceUnavailable(format!("profile request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::ServiceUnavailable(format!(
                "profile request returned {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AuthError::ServiceUnavailable(format!("profile response unreadable: {e}")))?;

        serde_json::from_str(&body)
            .map_err(|e| AuthError::ServiceUnavailable(format!("profile response invalid: {e}")))
    }
}

/// Portal root with a trailing slash, so relative joins stay under it.
fn root_url(base: &Url) -> Url {
    let mut url = base.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    url
}

fn session_cookie(response: &Response) -> Option<SessionCookie> {
    response
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE_NAME && !c.value().is_empty())
        .map(|c| SessionCookie {
            name: c.name().to_string(),
            value: c.value().to_string(),
        })
}

/// Whether the login answer reports success (`result` present and non-zero).
fn login_accepted(body: &str) -> bool {
    let Ok(parsed) = serde_json::from_str::<Value>(body) else {
        return false;
    };
    match parsed.get("result") {
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => s.trim().parse::<i64>().is_ok_and(|v| v != 0),
        _ => false,
    }
}

/// Accept the campus number as a JSON number or a numeric string.
fn numeric_id<'de, D>(deserializer: D) -> Result<UserId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(UserId),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid numero `{s}`"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(base: &str, timeout: Duration) -> CasClient {
        CasClient::new(&CasConfig {
            base_url: Url::parse(base).unwrap(),
            timeout,
        })
        .unwrap()
    }

    async fn mount_login(server: &MockServer, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(response)
            .mount(server)
            .await;
    }

    async fn mount_profile(server: &MockServer, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/session/my/global"))
            .and(header("cookie", "lemonldap=abc"))
            .respond_with(response)
            .mount(server)
            .await;
    }

    fn accepted_login() -> ResponseTemplate {
        ResponseTemplate::new(200)
            .insert_header("set-cookie", "lemonldap=abc; Path=/; HttpOnly")
            .set_body_raw(r#"{"result":1}"#, "application/json")
    }

    fn profile() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(
            r#"{"numero":12345,"mail":"a@b.fr","prenom":"A","nom":"B"}"#,
            "application/json",
        )
    }

    #[tokio::test]
    async fn successful_exchange_returns_identity() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_string_contains("user=12345"))
            .and(body_string_contains("password=correct"))
            .respond_with(accepted_login())
            .mount(&server)
            .await;
        mount_profile(&server, profile()).await;

        let identity = client_for(&server.uri(), Duration::from_secs(5))
            .authenticate("12345", "correct")
            .await
            .unwrap();

        assert_eq!(
            identity,
            ExternalIdentity {
                numero: 12345,
                email: "a@b.fr".to_string(),
                first_name: "A".to_string(),
                last_name: "B".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn result_zero_is_auth_failed() {
        let server = MockServer::start().await;
        mount_login(
            &server,
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "lemonldap=abc")
                .set_body_raw(r#"{"result":0,"error":"5"}"#, "application/javascript"),
        )
        .await;

        let err = client_for(&server.uri(), Duration::from_secs(5))
            .authenticate("12345", "wrong")
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::AuthFailed);
    }

    #[tokio::test]
    async fn non_json_body_is_auth_failed() {
        let server = MockServer::start().await;
        mount_login(
            &server,
            ResponseTemplate::new(200).set_body_raw("<html>Bad login</html>", "application/javascript"),
        )
        .await;

        let err = client_for(&server.uri(), Duration::from_secs(5))
            .authenticate("12345", "wrong")
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::AuthFailed);
    }

    #[tokio::test]
    async fn mislabelled_success_is_still_parsed() {
        let server = MockServer::start().await;
        mount_login(
            &server,
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "lemonldap=abc")
                .set_body_raw(r#"{"result":1}"#, "text/html"),
        )
        .await;
        mount_profile(&server, profile()).await;

        let identity = client_for(&server.uri(), Duration::from_secs(5))
            .authenticate("12345", "correct")
            .await
            .unwrap();
        assert_eq!(identity.numero, 12345);
    }

    #[tokio::test]
    async fn missing_cookie_is_reported_distinctly() {
        let server = MockServer::start().await;
        mount_login(
            &server,
            ResponseTemplate::new(200).set_body_raw(r#"{"result":1}"#, "application/json"),
        )
        .await;

        let err = client_for(&server.uri(), Duration::from_secs(5))
            .authenticate("12345", "correct")
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::SessionCookieMissing);
    }

    #[tokio::test]
    async fn profile_error_is_service_unavailable() {
        let server = MockServer::start().await;
        mount_login(&server, accepted_login()).await;
        mount_profile(&server, ResponseTemplate::new(502)).await;

        let err = client_for(&server.uri(), Duration::from_secs(5))
            .authenticate("12345", "correct")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn invalid_profile_is_service_unavailable() {
        let server = MockServer::start().await;
        mount_login(&server, accepted_login()).await;
        mount_profile(
            &server,
            ResponseTemplate::new(200).set_body_raw(r#"{"mail":"a@b.fr"}"#, "application/json"),
        )
        .await;

        let err = client_for(&server.uri(), Duration::from_secs(5))
            .authenticate("12345", "correct")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn login_redirect_is_not_followed() {
        let server = MockServer::start().await;
        mount_login(
            &server,
            ResponseTemplate::new(302)
                .insert_header("location", format!("{}/portal", server.uri()))
                .insert_header("set-cookie", "lemonldap=abc; Path=/"),
        )
        .await;
        Mock::given(method("POST"))
            .and(path("/portal"))
            .respond_with(accepted_login())
            .expect(0)
            .mount(&server)
            .await;
        mount_profile(&server, profile()).await;

        let err = client_for(&server.uri(), Duration::from_secs(5))
            .authenticate("12345", "correct")
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::AuthFailed);
    }

    #[tokio::test]
    async fn login_server_error_is_service_unavailable() {
        let server = MockServer::start().await;
        mount_login(&server, ResponseTemplate::new(503)).await;

        let err = client_for(&server.uri(), Duration::from_secs(5))
            .authenticate("12345", "correct")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn timeout_is_service_unavailable() {
        let server = MockServer::start().await;
        mount_login(
            &server,
            accepted_login().set_delay(Duration::from_millis(500)),
        )
        .await;

        let err = client_for(&server.uri(), Duration::from_millis(50))
            .authenticate("12345", "correct")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn unreachable_portal_is_service_unavailable() {
        let err = client_for("http://127.0.0.1:1", Duration::from_secs(2))
            .authenticate("12345", "correct")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ServiceUnavailable(_)));
    }

    #[test]
    fn login_accepted_reads_result_field() {
        assert!(login_accepted(r#"{"result":1}"#));
        assert!(login_accepted(r#"{"result":"1"}"#));
        assert!(!login_accepted(r#"{"result":0}"#));
        assert!(!login_accepted(r#"{"result":"0"}"#));
        assert!(!login_accepted(r#"{"error":1}"#));
        assert!(!login_accepted(r#"{"result":null}"#));
        assert!(!login_accepted(""));
        assert!(!login_accepted("not json"));
    }

    #[test]
    fn numero_accepts_numeric_strings() {
        let identity: ExternalIdentity =
            serde_json::from_str(r#"{"numero":"12345","mail":"a@b.fr","prenom":"A","nom":"B"}"#)
                .unwrap();
        assert_eq!(identity.numero, 12345);

        let err = serde_json::from_str::<ExternalIdentity>(
            r#"{"numero":"abc","mail":"a@b.fr","prenom":"A","nom":"B"}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn urls_are_rooted_at_the_portal() {
        let client = client_for("https://sso.example.fr/portal", Duration::from_secs(1));
        assert_eq!(client.login_url().as_str(), "https://sso.example.fr/portal/");
        assert_eq!(
            client.profile_url.as_str(),
            "https://sso.example.fr/portal/session/my/global"
        );
    }
}
