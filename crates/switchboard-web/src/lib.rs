//! # switchboard-web
//!
//! axum front end for the relay-lights and climate-dashboard devices.
//!
//! The routes here are thin: each one locks the device, calls the matching
//! handler from [`switchboard_core::handlers`] on a blocking thread and turns
//! the returned [`Reply`] into an HTTP response.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use switchboard_web::{create_relay_router, RelayState};
//!
//! let state: RelayState = Arc::new(Mutex::new(device));
//! let app = create_relay_router(state);
//!
//! let listener = TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! ```

pub mod routes;

pub use routes::{create_climate_router, create_relay_router};

use std::sync::{Arc, Mutex};

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use switchboard_core::{ClimateDevice, RelayDevice, Reply};
use thiserror::Error;

/// Shared relay-lights state. One lock per request keeps handlers serial.
pub type RelayState = Arc<Mutex<RelayDevice>>;

/// Shared climate-dashboard state.
pub type ClimateState = Arc<Mutex<ClimateDevice>>;

/// Failures of the web layer itself (not of the device).
#[derive(Debug, Error)]
pub enum WebError {
    #[error("Device state lock poisoned")]
    Poisoned,

    #[error("Handler task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        tracing::error!(err = %self, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

/// [`Reply`] wrapper that axum can send.
#[derive(Debug)]
pub struct DeviceReply(pub Reply);

impl IntoResponse for DeviceReply {
    fn into_response(self) -> Response {
        let Reply {
            status,
            content_type,
            body,
        } = self.0;
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, [(header::CONTENT_TYPE, content_type)], body).into_response()
    }
}

/// Run `f` against the locked device on the blocking pool.
///
/// The lock is held for the whole call, so a slow join blocks other requests
/// exactly as it does on the board.
pub async fn with_device<T, F>(state: Arc<Mutex<T>>, f: F) -> Result<DeviceReply, WebError>
where
    T: Send + 'static,
    F: FnOnce(&mut T) -> Reply + Send + 'static,
{
    let reply = tokio::task::spawn_blocking(move || {
        let mut device = state.lock().map_err(|_| WebError::Poisoned)?;
        Ok::<_, WebError>(f(&mut device))
    })
    .await??;

    Ok(DeviceReply(reply))
}
