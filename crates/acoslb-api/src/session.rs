// AXAPI session lifecycle
//
// Authenticate, close, and the one read-only call the session cache needs
// (system information). v2.1 hands back a `session_id` that travels in the
// query string; v3.0 hands back a signature that travels in the
// `Authorization` header. Either way the token is stored on the client.

use secrecy::ExposeSecret;
use serde_json::{Value, json};
use tracing::debug;

use crate::client::{AcosClient, Envelope};
use crate::error::Error;
use crate::version::AxapiVersion;

/// Outcome of a session close request.
///
/// The appliance answers `{"response": {"status": "OK"}}` when the session
/// was torn down; anything else leaves it alive on the appliance side.
#[derive(Debug, Clone, PartialEq)]
pub struct CloseStatus {
    pub ok: bool,
    pub body: Value,
}

impl CloseStatus {
    /// Status for a client that never held a session.
    fn nothing_to_close() -> Self {
        Self {
            ok: true,
            body: Value::Null,
        }
    }
}

impl AcosClient {
    /// Authenticate with the appliance and store the session token.
    ///
    /// - v2.1: `POST /services/rest/V2.1/?format=json&method=authenticate`
    /// - v3.0: `POST /axapi/v3/auth`
    pub async fn authenticate(&self) -> Result<String, Error> {
        let token = match self.version() {
            AxapiVersion::V21 => {
                let url = self.method_url("authenticate", None)?;
                let body = json!({
                    "username": self.username(),
                    "password": self.password().expose_secret(),
                });
                let resp = self.post_json(url, &body).await?;
                resp.get("session_id")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
            }
            AxapiVersion::V30 => {
                let url = self.resource_url(AxapiVersion::V30.login_path())?;
                let body = json!({
                    "credentials": {
                        "username": self.username(),
                        "password": self.password().expose_secret(),
                    }
                });
                let resp = self.post_json(url, &body).await?;
                resp.pointer("/authresponse/signature")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
            }
        };

        let token = token.ok_or_else(|| Error::Authentication {
            message: "appliance returned no session token".into(),
        })?;

        self.set_session(Some(token.clone()));
        debug!(version = %self.version(), "authenticated");
        Ok(token)
    }

    /// Make sure a session exists, authenticating if none is held.
    ///
    /// This is the "session alive" probe: it succeeds once the client
    /// carries a token the appliance issued.
    pub async fn ensure_session(&self) -> Result<(), Error> {
        if self.has_session() {
            return Ok(());
        }
        self.authenticate().await.map(|_| ())
    }

    /// Terminate the current session.
    ///
    /// - v2.1: `POST ...?method=session.close&session_id=..`
    /// - v3.0: `POST /axapi/v3/logoff`
    ///
    /// Transport failures are errors; a reachable appliance that refuses
    /// to close reports `ok: false`. The token is dropped only on success.
    pub async fn close_session(&self) -> Result<CloseStatus, Error> {
        let Some(session_id) = self.session_id() else {
            return Ok(CloseStatus::nothing_to_close());
        };

        let (status, body) = match self.version() {
            AxapiVersion::V21 => {
                let url = self.method_url("session.close", Some(&session_id))?;
                self.post_raw(url, &json!({ "session_id": session_id }))
                    .await?
            }
            AxapiVersion::V30 => {
                let url = self.resource_url(AxapiVersion::V30.logout_path())?;
                self.post_raw(url, &json!({})).await?
            }
        };

        let ok = status.is_success() && Envelope::from_value(&body)
            .as_ref()
            .is_some_and(Envelope::is_ok);
        if ok {
            self.set_session(None);
            debug!("session closed");
        } else {
            debug!(%status, "session close not acknowledged");
        }

        Ok(CloseStatus { ok, body })
    }

    /// Fetch the appliance's system information block.
    ///
    /// - v2.1: `GET ...?method=system.information.get&session_id=..`
    /// - v3.0: `GET /axapi/v3/version/oper`
    pub async fn system_information(&self) -> Result<Value, Error> {
        let session_id = self.session_id().ok_or(Error::NoSession)?;

        match self.version() {
            AxapiVersion::V21 => {
                let url = self.method_url("system.information.get", Some(&session_id))?;
                self.get_json(url).await
            }
            AxapiVersion::V30 => {
                let url = self.resource_url(AxapiVersion::V30.information_path())?;
                self.get_json(url).await
            }
        }
    }
}
