use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::{json, Value};
use sha1::Sha1;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::models::{PlayerStatus, VolumeState};

use super::{DeviceClient, DeviceError};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

type HmacSha1 = Hmac<Sha1>;

const AUTH_HEADER: &str = "X-Fbx-App-Auth";
const PLAYER_PERMISSION: &str = "player";

#[derive(Debug, Clone)]
pub struct FreeboxConfig {
    /// API root, e.g. `https://mafreebox.freebox.fr:443/api/v4`
    pub base_url: String,
    pub app_id: String,
    pub app_token: String,
    pub accept_invalid_certs: bool,
    /// Player to drive; the first one the box reports when unset
    pub player_id: Option<i64>,
    pub request_timeout: Duration,
}

impl FreeboxConfig {
    pub fn base_url_for(host: &str, port: u16) -> String {
        let scheme = if port == 80 { "http" } else { "https" };
        format!("{scheme}://{host}:{port}/api/v4")
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    msg: String,
    missing_right: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginChallenge {
    challenge: String,
}

#[derive(Debug, Deserialize)]
struct SessionGrant {
    session_token: String,
    permissions: Option<serde_json::Map<String, Value>>,
}

/// Client for the Freebox OS player API, authenticated with an app token.
pub struct FreeboxClient {
    http: Client,
    config: FreeboxConfig,
    session: Mutex<Option<String>>,
    player_id: i64,
}

impl FreeboxClient {
    /// Logs in, checks the player-control permission and resolves the player.
    pub async fn connect(config: FreeboxConfig) -> Result<Self, DeviceError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        let mut client = Self {
            http,
            config,
            session: Mutex::new(None),
            player_id: 0,
        };

        let token = client.open_session().await?;
        *client.session.get_mut() = Some(token);

        client.player_id = match client.config.player_id {
            Some(id) => id,
            None => client.discover_player().await?,
        };
        log_info!("connected to player {} at {}", client.player_id, client.config.base_url);

        Ok(client)
    }

    pub fn player_id(&self) -> i64 {
        self.player_id
    }

    async fn open_session(&self) -> Result<String, DeviceError> {
        let challenge: LoginChallenge = parse(self.call(Method::GET, "/login/", None, None).await?)?;

        let body = json!({
            "app_id": self.config.app_id,
            "password": sign_challenge(&self.config.app_token, &challenge.challenge)?,
        });
        let grant: SessionGrant = match self
            .call(Method::POST, "/login/session/", None, Some(body))
            .await
        {
            Ok(result) => parse(result)?,
            Err(DeviceError::Api { code, message }) => {
                return Err(DeviceError::Auth(format!("{code}: {message}")))
            }
            Err(err) => return Err(err),
        };

        match &grant.permissions {
            Some(permissions) => {
                let allowed = permissions
                    .get(PLAYER_PERMISSION)
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                if !allowed {
                    return Err(DeviceError::PermissionDenied(PLAYER_PERMISSION.into()));
                }
            }
            None => log_warn!("device did not report session permissions, continuing"),
        }

        Ok(grant.session_token)
    }

    async fn discover_player(&self) -> Result<i64, DeviceError> {
        let players = self.authed(Method::GET, "/player/", None).await?;
        players
            .as_array()
            .and_then(|list| list.first())
            .and_then(|player| player["id"].as_i64())
            .ok_or(DeviceError::NoPlayer)
    }

    /// Calls an authenticated endpoint, logging in again once if the
    /// session has expired.
    async fn authed(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, DeviceError> {
        let mut session = self.session.lock().await;
        let token = match session.as_ref() {
            Some(token) => token.clone(),
            None => {
                let token = self.open_session().await?;
                *session = Some(token.clone());
                token
            }
        };

        match self
            .call(method.clone(), path, Some(&token), body.clone())
            .await
        {
            Err(DeviceError::Auth(reason)) => {
                log_warn!("device session rejected ({reason}), logging in again");
                let token = self.open_session().await?;
                *session = Some(token.clone());
                self.call(method, path, Some(&token), body).await
            }
            other => other,
        }
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<Value, DeviceError> {
        let url = format!("{}{path}", self.config.base_url.trim_end_matches('/'));
        let mut request = self.http.request(method, &url);
        if let Some(token) = token {
            request = request.header(AUTH_HEADER, token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let envelope: Envelope = response
            .json()
            .await
            .map_err(|err| DeviceError::Malformed(format!("{url} (HTTP {status}): {err}")))?;

        if envelope.success {
            return Ok(envelope.result);
        }

        Err(match envelope.error_code.as_str() {
            "auth_required" | "invalid_session" | "invalid_token" => {
                DeviceError::Auth(envelope.msg)
            }
            "insufficient_rights" => DeviceError::PermissionDenied(
                envelope
                    .missing_right
                    .unwrap_or_else(|| PLAYER_PERMISSION.to_string()),
            ),
            _ => DeviceError::Api {
                code: envelope.error_code,
                message: envelope.msg,
            },
        })
    }

    fn player_path(&self, endpoint: &str) -> String {
        format!("/player/{}/api/v6/{endpoint}", self.player_id)
    }
}

#[async_trait]
impl DeviceClient for FreeboxClient {
    async fn status(&self) -> Result<PlayerStatus, DeviceError> {
        let result = self
            .authed(Method::GET, &self.player_path("status/"), None)
            .await?;
        Ok(PlayerStatus::from_api(&result))
    }

    async fn volume(&self) -> Result<VolumeState, DeviceError> {
        let result = self
            .authed(Method::GET, &self.player_path("control/volume/"), None)
            .await?;
        Ok(VolumeState::from_api(&result))
    }

    async fn set_mute(&self, mute: bool) -> Result<(), DeviceError> {
        self.authed(
            Method::PUT,
            &self.player_path("control/volume/"),
            Some(json!({ "mute": mute })),
        )
        .await?;
        Ok(())
    }
}

fn parse<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, DeviceError> {
    serde_json::from_value(value).map_err(|err| DeviceError::Malformed(err.to_string()))
}

/// Login password: hex HMAC-SHA1 of the challenge keyed by the app token.
pub fn sign_challenge(app_token: &str, challenge: &str) -> Result<String, DeviceError> {
    let mut mac = HmacSha1::new_from_slice(app_token.as_bytes())
        .map_err(|err| DeviceError::Auth(format!("unusable app token: {err}")))?;
    mac.update(challenge.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signs_challenge_with_hmac_sha1() {
        // RFC 2202 test case 2
        assert_eq!(
            sign_challenge("Jefe", "what do ya want for nothing?").unwrap(),
            "effcdf6ae5eb2fa2d27416d5f184df9c259a7c79"
        );
    }

    #[test]
    fn base_url_scheme_follows_port() {
        assert_eq!(
            FreeboxConfig::base_url_for("mafreebox.freebox.fr", 443),
            "https://mafreebox.freebox.fr:443/api/v4"
        );
        assert_eq!(
            FreeboxConfig::base_url_for("192.168.1.254", 80),
            "http://192.168.1.254:80/api/v4"
        );
    }

    #[test]
    fn only_permission_errors_are_fatal() {
        assert!(DeviceError::PermissionDenied("player".into()).is_fatal());
        assert!(!DeviceError::NoPlayer.is_fatal());
        assert!(!DeviceError::Auth("expired".into()).is_fatal());
    }
}
