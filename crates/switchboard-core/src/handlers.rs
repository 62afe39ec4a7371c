//! Handler logic (framework-agnostic).
//!
//! Every endpoint of both firmware programs is implemented here against the
//! device structs and returns a [`Reply`]. The axum routes and the esp-idf
//! HTTP server only translate requests into these calls and write the reply.

use serde::Deserialize;
use thiserror::Error;

use crate::device::{ClimateDevice, RelayDevice};
use crate::lights::{LightError, LineError};
use crate::pages::{self, escape_html};
use crate::provisioning::{JoinOutcome, ProvisioningError, RadioError};
use crate::status::serialize_status;

pub const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";

/// Response ready to be written by any HTTP framework.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Reply {
    pub fn html(body: impl Into<String>) -> Self {
        Self::ok(CONTENT_TYPE_HTML, body)
    }

    pub fn json(body: impl Into<String>) -> Self {
        Self::ok(CONTENT_TYPE_JSON, body)
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self::ok(CONTENT_TYPE_TEXT, body)
    }

    fn ok(content_type: &'static str, body: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type,
            body: body.into(),
        }
    }
}

/// Request-level failures, each mapped to an HTTP status.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Required query or form field absent (400).
    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),

    /// Toggle target not in the registry (404).
    #[error("Unknown light: {0}")]
    UnknownLight(String),

    /// Hardware line refused a level (500).
    #[error("Output failure: {0}")]
    Output(String),

    /// Radio fault outside the join flow (500).
    #[error(transparent)]
    Radio(#[from] RadioError),

    /// Response body could not be encoded (500).
    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

impl DeviceError {
    pub fn status(&self) -> u16 {
        match self {
            DeviceError::MissingParameter(_) => 400,
            DeviceError::UnknownLight(_) => 404,
            DeviceError::Output(_) | DeviceError::Radio(_) | DeviceError::Encode(_) => 500,
        }
    }
}

impl From<LightError> for DeviceError {
    fn from(err: LightError) -> Self {
        match err {
            LightError::NotFound(name) => DeviceError::UnknownLight(name),
            other => DeviceError::Output(other.to_string()),
        }
    }
}

impl From<LineError> for DeviceError {
    fn from(err: LineError) -> Self {
        DeviceError::Output(err.to_string())
    }
}

impl From<ProvisioningError> for DeviceError {
    fn from(err: ProvisioningError) -> Self {
        match err {
            ProvisioningError::MissingParameter(name) => DeviceError::MissingParameter(name),
            ProvisioningError::Radio(err) => DeviceError::Radio(err),
        }
    }
}

impl From<DeviceError> for Reply {
    fn from(err: DeviceError) -> Self {
        Reply {
            status: err.status(),
            content_type: CONTENT_TYPE_TEXT,
            body: err.to_string(),
        }
    }
}

/// Collapse a handler result into a reply.
pub fn respond(result: Result<Reply, DeviceError>) -> Reply {
    result.unwrap_or_else(Reply::from)
}

/// Query string of `/toggle`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToggleQuery {
    pub id: Option<String>,
}

/// Form body of `/savewifi`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveWifiForm {
    pub ssid: Option<String>,
    pub pass: Option<String>,
    pub name: Option<String>,
}

/// Relay-lights endpoints.
pub struct RelayHandlers;

impl RelayHandlers {
    /// `GET /`
    pub fn dashboard() -> Reply {
        Reply::html(pages::RELAY_DASHBOARD_HTML)
    }

    /// `GET /settings`
    pub fn settings() -> Reply {
        Reply::html(pages::RELAY_SETTINGS_HTML)
    }

    /// `GET /status`
    pub fn status(device: &RelayDevice) -> Result<Reply, DeviceError> {
        Ok(Reply::json(serialize_status(&device.lights)?))
    }

    /// `GET /toggle?id=<name>`
    pub fn toggle(device: &mut RelayDevice, query: &ToggleQuery) -> Result<Reply, DeviceError> {
        let id = query
            .id
            .as_deref()
            .ok_or(DeviceError::MissingParameter("id"))?;
        device.lights.toggle(id)?;
        Self::status(device)
    }

    /// `GET /scan`
    pub fn scan(device: &mut RelayDevice) -> Result<Reply, DeviceError> {
        let networks = device.provisioning.scan_networks();
        Ok(Reply::json(serde_json::to_string(&networks)?))
    }

    /// `POST /savewifi`
    ///
    /// Blocks for up to the join budget.
    pub fn save_wifi(device: &mut RelayDevice, form: &SaveWifiForm) -> Result<Reply, DeviceError> {
        let ssid = form.ssid.as_deref().unwrap_or_default();
        let pass = form.pass.as_deref().unwrap_or_default();
        let name = form.name.as_deref().unwrap_or_default();

        let outcome = device.provisioning.save_and_join(ssid, pass, name)?;
        Ok(match outcome {
            JoinOutcome::Joined => {
                let host = escape_html(device.provisioning.device_name());
                Reply::html(format!(
                    "<p>Connected to <b>{}</b>.</p>\
                     <p>Open <a href=\"http://{host}.local\">http://{host}.local</a> \
                     from the same network.</p>",
                    escape_html(ssid)
                ))
            }
            JoinOutcome::NotJoined => Reply::text(format!(
                "Failed to connect to {ssid}. Check the password and try again; \
                 the device is still reachable on its own access point."
            )),
        })
    }

    /// `GET /network`
    pub fn network(device: &RelayDevice) -> Result<Reply, DeviceError> {
        let state = device.provisioning.current_status();
        Ok(Reply::json(serde_json::to_string(&state)?))
    }
}

/// Climate-dashboard endpoints.
pub struct ClimateHandlers;

impl ClimateHandlers {
    /// `GET /`
    pub fn dashboard() -> Reply {
        Reply::html(pages::CLIMATE_DASHBOARD_HTML)
    }

    /// `GET /sensor`
    pub fn sensor(device: &ClimateDevice) -> Result<Reply, DeviceError> {
        Ok(Reply::json(serde_json::to_string(&device.monitor.reading())?))
    }

    /// `GET /toggleLED`
    pub fn toggle_led(device: &mut ClimateDevice) -> Result<Reply, DeviceError> {
        device.led.toggle()?;
        Ok(Reply::text(device.led.label()))
    }
}
