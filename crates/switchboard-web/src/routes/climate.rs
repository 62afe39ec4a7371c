//! Climate-dashboard routes: `/`, `/sensor` and `/toggleLED`.

use axum::{extract::State, routing::get, Router};
use switchboard_core::{respond, ClimateHandlers};

use crate::{with_device, ClimateState, DeviceReply, WebError};

pub fn routes() -> Router<ClimateState> {
    Router::new()
        .route("/", get(dashboard))
        .route("/sensor", get(sensor))
        .route("/toggleLED", get(toggle_led))
}

async fn dashboard() -> DeviceReply {
    DeviceReply(ClimateHandlers::dashboard())
}

/// GET /sensor
async fn sensor(State(state): State<ClimateState>) -> Result<DeviceReply, WebError> {
    with_device(state, |device| respond(ClimateHandlers::sensor(device))).await
}

/// GET /toggleLED
async fn toggle_led(State(state): State<ClimateState>) -> Result<DeviceReply, WebError> {
    with_device(state, |device| respond(ClimateHandlers::toggle_led(device))).await
}
