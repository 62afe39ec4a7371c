//! Relay-lights routes.
//!
//! # Endpoints
//!
//! ### `GET /status`
//! Light states as `{"<name>": 0|1, ...}` in table order.
//!
//! ### `GET /toggle?id=<name>`
//! Flips one light (case-insensitive) and answers with the new status.
//!
//! ### `GET /scan`
//! JSON array of visible network names.
//!
//! ### `POST /savewifi`
//! Form fields `ssid`, `pass` and optional `name`. Stores the credentials and
//! blocks until the join succeeds or the budget runs out.
//!
//! ### `GET /network`
//! Current join state.

use axum::{
    extract::{rejection::FormRejection, Query, State},
    routing::{get, post},
    Form, Router,
};
use switchboard_core::{respond, RelayHandlers, SaveWifiForm, ToggleQuery};

use crate::{with_device, DeviceReply, RelayState, WebError};

pub fn routes() -> Router<RelayState> {
    Router::new()
        .route("/", get(dashboard))
        .route("/settings", get(settings))
        .route("/status", get(status))
        .route("/toggle", get(toggle))
        .route("/scan", get(scan))
        .route("/savewifi", post(save_wifi))
        .route("/network", get(network))
}

async fn dashboard() -> DeviceReply {
    DeviceReply(RelayHandlers::dashboard())
}

async fn settings() -> DeviceReply {
    DeviceReply(RelayHandlers::settings())
}

/// GET /status
async fn status(State(state): State<RelayState>) -> Result<DeviceReply, WebError> {
    with_device(state, |device| respond(RelayHandlers::status(device))).await
}

/// GET /toggle?id=<name>
async fn toggle(
    State(state): State<RelayState>,
    Query(query): Query<ToggleQuery>,
) -> Result<DeviceReply, WebError> {
    with_device(state, move |device| respond(RelayHandlers::toggle(device, &query))).await
}

/// GET /scan
async fn scan(State(state): State<RelayState>) -> Result<DeviceReply, WebError> {
    with_device(state, |device| respond(RelayHandlers::scan(device))).await
}

/// POST /savewifi
///
/// An unreadable body counts as an empty form, so it is answered with the
/// missing-parameter 400 rather than an extractor rejection.
async fn save_wifi(
    State(state): State<RelayState>,
    form: Result<Form<SaveWifiForm>, FormRejection>,
) -> Result<DeviceReply, WebError> {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            tracing::debug!(%rejection, "unreadable credentials form");
            SaveWifiForm::default()
        }
    };
    tracing::info!(ssid = form.ssid.as_deref().unwrap_or_default(), "credentials submitted");
    with_device(state, move |device| respond(RelayHandlers::save_wifi(device, &form))).await
}

/// GET /network
async fn network(State(state): State<RelayState>) -> Result<DeviceReply, WebError> {
    with_device(state, |device| respond(RelayHandlers::network(device))).await
}
