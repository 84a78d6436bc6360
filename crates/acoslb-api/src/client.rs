// AXAPI HTTP client
//
// Wraps `reqwest::Client` with version-aware URL construction, session
// token placement, and response envelope unwrapping. Session management
// (authenticate / close / system information) lives in `session.rs` as
// inherent methods to keep this module focused on transport mechanics.

use std::fmt;
use std::sync::{PoisonError, RwLock};

use secrecy::SecretString;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::version::AxapiVersion;

/// AXAPI reports failures as `{"response": {"status": "fail", "err": {...}}}`,
/// often with HTTP 200.
#[derive(Deserialize)]
pub(crate) struct Envelope {
    pub(crate) response: Option<EnvelopeResponse>,
}

#[derive(Deserialize)]
pub(crate) struct EnvelopeResponse {
    pub(crate) status: Option<String>,
    pub(crate) err: Option<EnvelopeError>,
}

#[derive(Deserialize)]
pub(crate) struct EnvelopeError {
    pub(crate) code: Option<i64>,
    pub(crate) msg: Option<String>,
}

impl Envelope {
    /// Extract the envelope from an arbitrary JSON body, if it has one.
    pub(crate) fn from_value(value: &Value) -> Option<Self> {
        Self::deserialize(value).ok()
    }

    /// `true` when the envelope carries an `"OK"` status.
    pub(crate) fn is_ok(&self) -> bool {
        self.response
            .as_ref()
            .and_then(|r| r.status.as_deref())
            .is_some_and(|s| s.eq_ignore_ascii_case("ok"))
    }

    /// Convert a `"fail"` envelope into an error.
    fn into_error(self) -> Option<Error> {
        let response = self.response?;
        let failed = response
            .status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("fail"));
        if !failed {
            return None;
        }
        let (code, msg) = response
            .err
            .map(|e| (e.code, e.msg))
            .unwrap_or_default();
        Some(Error::Axapi {
            message: msg.unwrap_or_else(|| "request failed".into()),
            code,
        })
    }
}

/// HTTP client for one ACOS appliance.
///
/// Holds the credentials so the session can be (re-)established lazily,
/// and the current session token once it has been.
pub struct AcosClient {
    http: reqwest::Client,
    base_url: Url,
    version: AxapiVersion,
    username: String,
    password: SecretString,
    /// v2.1 `session_id` or v3.0 auth signature.
    session: RwLock<Option<String>>,
}

impl fmt::Debug for AcosClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcosClient")
            .field("base_url", &self.base_url.as_str())
            .field("version", &self.version)
            .field("username", &self.username)
            .field("has_session", &self.has_session())
            .finish_non_exhaustive()
    }
}

impl AcosClient {
    /// Create a client for the appliance at `base_url`
    /// (e.g. `https://10.10.100.20:8443`). No network I/O happens here.
    pub fn new(
        base_url: Url,
        version: AxapiVersion,
        username: impl Into<String>,
        password: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, version, username, password))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        version: AxapiVersion,
        username: impl Into<String>,
        password: SecretString,
    ) -> Self {
        Self {
            http,
            base_url,
            version,
            username: username.into(),
            password,
            session: RwLock::new(None),
        }
    }

    /// The appliance base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The AXAPI version this client speaks.
    pub fn version(&self) -> AxapiVersion {
        self.version
    }

    pub(crate) fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &SecretString {
        &self.password
    }

    // ── Session token ────────────────────────────────────────────────

    /// The current session token, if a session has been established.
    pub fn session_id(&self) -> Option<String> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether a session token is currently held.
    pub fn has_session(&self) -> bool {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub(crate) fn set_session(&self, token: Option<String>) {
        trace!(present = token.is_some(), "session token updated");
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a v2.1 method URL:
    /// `{base}/services/rest/V2.1/?format=json&method={method}[&session_id=..]`
    pub(crate) fn method_url(&self, method: &str, session_id: Option<&str>) -> Result<Url, Error> {
        let mut url = self.base_url.join(AxapiVersion::V21.login_path())?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("format", "json");
            query.append_pair("method", method);
            if let Some(id) = session_id {
                query.append_pair("session_id", id);
            }
        }
        Ok(url)
    }

    /// Build a v3.0 resource URL: `{base}{path}`.
    pub(crate) fn resource_url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    /// Attach the v3.0 `Authorization: A10 <signature>` header when a
    /// session exists. v2.1 carries the token in the query string instead.
    fn apply_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match (self.version, self.session_id()) {
            (AxapiVersion::V30, Some(signature)) => {
                builder.header("Authorization", format!("A10 {signature}"))
            }
            _ => builder,
        }
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and unwrap the response envelope.
    pub(crate) async fn get_json(&self, url: Url) -> Result<Value, Error> {
        debug!("GET {}", redact(&url));

        let resp = self.apply_auth(self.http.get(url)).send().await?;
        parse_response(resp).await
    }

    /// Send a POST request with JSON body and unwrap the response envelope.
    pub(crate) async fn post_json(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<Value, Error> {
        debug!("POST {}", redact(&url));

        let resp = self
            .apply_auth(self.http.post(url).json(body))
            .send()
            .await?;
        parse_response(resp).await
    }

    /// Send a POST request and return the decoded body without
    /// interpreting the envelope. Used where the caller wants the status
    /// itself (session close).
    pub(crate) async fn post_raw(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<(reqwest::StatusCode, Value), Error> {
        debug!("POST {}", redact(&url));

        let resp = self
            .apply_auth(self.http.post(url).json(body))
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await?;
        let value = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok((status, value))
    }
}

/// Parse an AXAPI response, returning the JSON body on success or an
/// error for HTTP failures and `"fail"` envelopes.
async fn parse_response(resp: reqwest::Response) -> Result<Value, Error> {
    let status = resp.status();

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Authentication {
            message: format!("HTTP {status}: {}", preview(&body)),
        });
    }

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Axapi {
            message: format!("HTTP {status}: {}", preview(&body)),
            code: None,
        });
    }

    let body = resp.text().await?;
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }

    let value: Value = serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(&body)),
        body: body.clone(),
    })?;

    if let Some(err) = Envelope::from_value(&value).and_then(Envelope::into_error) {
        return Err(err);
    }

    Ok(value)
}

fn preview(body: &str) -> &str {
    let end = body
        .char_indices()
        .nth(200)
        .map_or(body.len(), |(idx, _)| idx);
    &body[..end]
}

/// Strip the session token from a URL before it reaches the logs.
fn redact(url: &Url) -> String {
    let mut shown = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "session_id" { "***".into() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    if !pairs.is_empty() {
        shown.query_pairs_mut().clear().extend_pairs(pairs);
    }
    shown.to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(version: AxapiVersion) -> AcosClient {
        AcosClient::with_client(
            reqwest::Client::new(),
            Url::parse("https://10.0.0.1:8443").unwrap(),
            version,
            "admin",
            SecretString::from("a10".to_string()),
        )
    }

    #[test]
    fn method_url_carries_format_method_and_session() {
        let c = client(AxapiVersion::V21);
        let url = c.method_url("session.close", Some("abc")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://10.0.0.1:8443/services/rest/V2.1/?format=json&method=session.close&session_id=abc"
        );
    }

    #[test]
    fn redact_hides_session_id() {
        let c = client(AxapiVersion::V21);
        let url = c.method_url("system.information.get", Some("secret")).unwrap();
        let shown = redact(&url);
        assert!(!shown.contains("secret"));
        assert!(shown.contains("session_id=***"));
    }

    #[test]
    fn fail_envelope_becomes_axapi_error() {
        let body = json!({
            "response": { "status": "fail", "err": { "code": 1009, "msg": "Invalid session ID" } }
        });
        let err = Envelope::from_value(&body).and_then(Envelope::into_error);
        match err {
            Some(Error::Axapi { message, code }) => {
                assert_eq!(message, "Invalid session ID");
                assert_eq!(code, Some(1009));
            }
            other => panic!("expected Axapi error, got: {other:?}"),
        }
    }

    #[test]
    fn ok_envelope_is_not_an_error() {
        let body = json!({ "response": { "status": "OK" } });
        let envelope = Envelope::from_value(&body).unwrap();
        assert!(envelope.is_ok());
        assert!(envelope.into_error().is_none());
    }

    #[test]
    fn debug_does_not_leak_session() {
        let c = client(AxapiVersion::V30);
        c.set_session(Some("sig-123".into()));
        let shown = format!("{c:?}");
        assert!(!shown.contains("sig-123"));
        assert!(shown.contains("has_session: true"));
    }
}
