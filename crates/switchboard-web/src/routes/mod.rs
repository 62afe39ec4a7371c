//! HTTP routes for both device programs.
//!
//! Each program gets its own router; they never share a listener because
//! each firmware serves its pages at `/`.

pub mod climate;
pub mod lights;

use axum::{http::StatusCode, Router};

use crate::{ClimateState, RelayState};

/// Router for the relay-lights device.
///
/// - `/`, `/settings` - static pages
/// - `/status`, `/toggle` - light control
/// - `/scan`, `/savewifi`, `/network` - provisioning
pub fn create_relay_router(state: RelayState) -> Router {
    lights::routes().fallback(not_found).with_state(state)
}

/// Router for the climate-dashboard device.
pub fn create_climate_router(state: ClimateState) -> Router {
    climate::routes().fallback(not_found).with_state(state)
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found")
}
