//! Blocking HTTP client for the ZONT API.
//!
//! - Every call is a JSON `POST` to `<base_url><method>`.
//! - `get_authtoken` uses HTTP Basic credentials; every other method sends the session token
//!   in `X-ZONT-Token`. All requests carry `X-ZONT-Client`.
//! - Transient network failures are retried by the transport; anything else is returned as-is.
//! - The API reports logical failures through `ok: false` in the body, even on HTTP 200, so
//!   responses are decoded regardless of status. Use `ensure_ok` to turn that flag into an error.
//!
//! Authentication
//! - `authenticate` stores the token for the lifetime of the client. There is no refresh:
//!   call `authenticate` again if the server starts rejecting the token.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Duration, Utc};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderValue, Request};
use log::{debug, info, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

use crate::config::Config;
use crate::models::zont::*;
use crate::transport::{RetryPolicy, RetryTransport, Transport, TransportError, UreqTransport};
use crate::utils::trailing_window;

const HEADER_CLIENT: &str = "X-ZONT-Client";
const HEADER_TOKEN: &str = "X-ZONT-Token";

const METHOD_AUTHTOKEN: &str = "get_authtoken";
const METHOD_DEVICES: &str = "devices";
const METHOD_UPDATE_DEVICE: &str = "update_device";
const METHOD_LOAD_DATA: &str = "load_data";

const DATA_TYPE_TEMPERATURE: &str = "temperature";
const DATA_TYPE_THERMOSTAT_WORK: &str = "thermostat_work";

/// Trailing window used for "current value" reads.
const CURRENT_WINDOW_SECS: i64 = 180;

#[derive(Debug)]
pub enum ZontClientError {
    /// No session token; call `authenticate` first.
    NotAuthenticated,
    Serialization(serde_json::Error),
    Transport(TransportError),
    Decode {
        method: &'static str,
        source: serde_path_to_error::Error<serde_json::Error>,
    },
    /// The server answered with `ok` other than `true`.
    Api {
        error: Option<String>,
        error_ui: Option<String>,
    },
}

impl core::fmt::Display for ZontClientError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ZontClientError::NotAuthenticated => write!(f, "missing session token for authenticated endpoint"),
            ZontClientError::Serialization(e) => write!(f, "request serialization failed: {}", e),
            ZontClientError::Transport(e) => write!(f, "transport error: {}", e),
            ZontClientError::Decode { method, source } => {
                write!(f, "malformed {} response at {}: {}", method, source.path(), source.inner())
            }
            ZontClientError::Api { error, error_ui } => write!(
                f,
                "api error: {}",
                error_ui.as_deref().or(error.as_deref()).unwrap_or("ok flag not set")
            ),
        }
    }
}

impl std::error::Error for ZontClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ZontClientError::Serialization(e) => Some(e),
            ZontClientError::Transport(e) => Some(e),
            ZontClientError::Decode { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<TransportError> for ZontClientError {
    fn from(value: TransportError) -> Self {
        ZontClientError::Transport(value)
    }
}

/// Turn a logical failure (`ok` missing or false) into `ZontClientError::Api`.
pub fn ensure_ok<E: Envelope>(response: E) -> Result<E, ZontClientError> {
    if response.is_ok() {
        Ok(response)
    } else {
        Err(ZontClientError::Api {
            error: response.error().map(str::to_string),
            error_ui: response.error_ui().map(str::to_string),
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Auth {
    Basic,
    Token,
}

pub struct ZontClient<T = RetryTransport<UreqTransport>> {
    transport: T,
    base_url: String,
    client_name: String,
    zont_client: String,
    login: String,
    password: String,
    debug: bool,
    session: Option<AuthTokenResponse>,
}

impl ZontClient {
    /// Client on the default `ureq` transport with retries configured from `config`.
    pub fn new(config: &Config) -> Self {
        let policy = RetryPolicy {
            max_retries: config.max_retries,
            ..RetryPolicy::default()
        };
        let transport = RetryTransport::new(UreqTransport::new(config.http_timeout), policy);
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> ZontClient<T> {
    pub fn with_transport(config: &Config, transport: T) -> Self {
        ZontClient {
            transport,
            base_url: config.base_url.clone(),
            client_name: config.client_name.clone(),
            zont_client: config.zont_client.clone(),
            login: config.login.clone(),
            password: config.password.clone(),
            debug: config.debug,
            session: None,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Account and profile data from the last `authenticate` call.
    pub fn session(&self) -> Option<&AuthTokenResponse> {
        self.session.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.as_ref().and_then(AuthTokenResponse::token).is_some()
    }

    fn url(&self, method: &str) -> String {
        format!("{}{}", self.base_url, method)
    }

    fn token(&self) -> Result<&str, ZontClientError> {
        self.session
            .as_ref()
            .and_then(AuthTokenResponse::token)
            .ok_or(ZontClientError::NotAuthenticated)
    }

    fn auth_header(&self, auth: Auth) -> Result<HeaderValue, ZontClientError> {
        let raw = match auth {
            Auth::Basic => format!(
                "Basic {}",
                STANDARD.encode(format!("{}:{}", self.login, self.password))
            ),
            Auth::Token => self.token()?.to_string(),
        };
        // `AuthTokenResponse::token` already rejects tokens that cannot be sent as a header.
        let mut value = HeaderValue::from_str(&raw).map_err(|_| ZontClientError::NotAuthenticated)?;
        value.set_sensitive(true);
        Ok(value)
    }

    /// Serialize `payload`, send it to `method` and return the raw body whatever the HTTP status.
    fn post<P: Serialize + ?Sized>(&self, payload: &P, method: &'static str, auth: Auth) -> Result<Vec<u8>, ZontClientError> {
        // Checked first so an unauthenticated call never reaches the network.
        let credential = self.auth_header(auth)?;

        let body = serde_json::to_vec(payload).map_err(ZontClientError::Serialization)?;
        if self.debug {
            debug!("POST {} request: {}", method, String::from_utf8_lossy(&body));
        }

        let credential_header = match auth {
            Auth::Basic => AUTHORIZATION.as_str(),
            Auth::Token => HEADER_TOKEN,
        };
        let request = Request::post(self.url(method))
            .header(CONTENT_TYPE, "application/json")
            .header(HEADER_CLIENT, self.zont_client.as_str())
            .header(credential_header, credential)
            .body(body)
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let response = self.transport.execute(&request)?;
        let status = response.status();
        let bytes = response.into_body();
        debug!("POST {} -> http {} ({} bytes)", method, status.as_u16(), bytes.len());
        if self.debug {
            debug!("POST {} response: {}", method, String::from_utf8_lossy(&bytes));
        }
        Ok(bytes)
    }

    fn decode<R: DeserializeOwned>(method: &'static str, body: &[u8]) -> Result<R, ZontClientError> {
        let de = &mut serde_json::Deserializer::from_slice(body);
        serde_path_to_error::deserialize(de).map_err(|source| ZontClientError::Decode { method, source })
    }

    fn call<P, R>(&self, payload: &P, method: &'static str) -> Result<R, ZontClientError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let body = self.post(payload, method, Auth::Token)?;
        Self::decode(method, &body)
    }

    /// Exchange login/password for a session token and keep it for later calls.
    ///
    /// The `ok` flag is not checked here; a response without a token leaves the client
    /// unauthenticated and later calls fail with `NotAuthenticated`.
    pub fn authenticate(&mut self) -> Result<&AuthTokenResponse, ZontClientError> {
        let payload = ClientNameRequest {
            client_name: self.client_name.clone(),
        };
        let body = self.post(&payload, METHOD_AUTHTOKEN, Auth::Basic)?;
        let auth: AuthTokenResponse = Self::decode(METHOD_AUTHTOKEN, &body)?;

        if auth.token().is_some() {
            info!(
                "Authenticated to ZONT API as {}",
                auth.username.as_deref().unwrap_or("<unknown user>")
            );
        } else {
            warn!(
                "get_authtoken returned no token (ok={:?}, error={})",
                auth.ok,
                auth.error_ui.as_deref().or(auth.error.as_deref()).unwrap_or("-")
            );
        }
        let session: &AuthTokenResponse = self.session.insert(auth);
        Ok(session)
    }

    /// All devices bound to the account plus the device tree. Always a fresh fetch.
    pub fn list_devices(&self) -> Result<DevicesResponse, ZontClientError> {
        let payload = ClientNameRequest {
            client_name: self.client_name.clone(),
        };
        self.call(&payload, METHOD_DEVICES)
    }

    /// Send a partial device patch, e.g. `{"device_id": .., "thermostat_target_temps": {..}}`.
    pub fn update_device<P: Serialize + ?Sized>(&self, payload: &P) -> Result<UpdateDeviceResponse, ZontClientError> {
        self.call(payload, METHOD_UPDATE_DEVICE)
    }

    /// Telemetry for several devices in one round trip. `responses[i]` answers `requests[i]`.
    pub fn load_data(&self, requests: &[DataRequest]) -> Result<LoadDataResponse, ZontClientError> {
        self.call(&LoadDataRequest { requests }, METHOD_LOAD_DATA)
    }

    /// Same endpoint as `load_data`, decoded as thermostat work series. The server does not
    /// tie `data_types` to the response shape; callers should request `thermostat_work`.
    pub fn load_data_thermostat_work(&self, requests: &[DataRequest]) -> Result<ThermostatWorkResponse, ZontClientError> {
        self.call(&LoadDataRequest { requests }, METHOD_LOAD_DATA)
    }

    fn current_window_request(device_id: DeviceId, data_type: &str, now: DateTime<Utc>) -> DataRequest {
        let (mintime, maxtime) = trailing_window(now, Duration::seconds(CURRENT_WINDOW_SECS));
        DataRequest::new(device_id, &[data_type], mintime, maxtime)
    }

    /// Latest temperature reported by the device's first sensor (lowest sensor id with data)
    /// over the last three minutes. `None` when nothing was reported.
    pub fn get_current_temperature(&self, device_id: DeviceId) -> Result<Option<f64>, ZontClientError> {
        let request = Self::current_window_request(device_id, DATA_TYPE_TEMPERATURE, Utc::now());
        let resp = self.load_data(std::slice::from_ref(&request))?;
        Ok(resp
            .responses()
            .first()
            .and_then(|data| data.first_sensor())
            .and_then(|(_, series)| series.latest()))
    }

    /// Latest domestic hot water temperature over the last three minutes.
    pub fn get_current_hot_water_temperature(&self, device_id: DeviceId) -> Result<Option<f64>, ZontClientError> {
        let request = Self::current_window_request(device_id, DATA_TYPE_THERMOSTAT_WORK, Utc::now());
        let resp = self.load_data_thermostat_work(std::slice::from_ref(&request))?;
        Ok(resp
            .responses()
            .first()
            .and_then(|data| data.thermostat_work.as_ref())
            .and_then(ThermostatWork::latest_dhw_temp))
    }

    /// Manually override the target temperature of one thermostat zone.
    pub fn set_target_temperature(
        &self,
        device_id: DeviceId,
        zone_id: &str,
        temp: f64,
    ) -> Result<UpdateDeviceResponse, ZontClientError> {
        let patch = ThermostatUpdate {
            device_id,
            thermostat_target_temps: BTreeMap::from([(
                zone_id.to_string(),
                ThermostatTargetTemp { manual: true, temp },
            )]),
        };
        info!("Setting device {} zone {} target temperature to {}", device_id, zone_id, temp);
        self.update_device(&patch)
    }
}
