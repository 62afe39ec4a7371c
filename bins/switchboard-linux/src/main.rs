//! Host simulator.
//!
//! Runs both device programs against simulated hardware: the relay lights on
//! port 8080 and the climate dashboard on port 8081.
//!
//! Environment:
//! - `SWITCHBOARD_CONFIG`: optional JSON file `{"relay": {...}, "climate": {...}}`
//! - `SWITCHBOARD_STATE`: credential file (default `switchboard-wifi.json`)
//! - `RUST_LOG`: tracing filter

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Context;
use serde::Deserialize;
use switchboard_core::credentials::FileCredentialStore;
use switchboard_core::simulated::{
    SimulatedAdvertiser, SimulatedClimateSensor, SimulatedLines, SimulatedRadio,
};
use switchboard_core::{
    ClimateConfig, ClimateDevice, ProvisioningDrivers, RelayConfig, RelayDevice, SystemClock,
};
use switchboard_web::{create_climate_router, create_relay_router, ClimateState, RelayState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Networks the simulated radio can see and join.
const DEMO_NETWORKS: &[(&str, &str)] = &[("home-network", "password123"), ("cafe-guest", "espresso")];

/// Contents of `SWITCHBOARD_CONFIG`; either section may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HostConfigFile {
    relay: serde_json::Value,
    climate: serde_json::Value,
}

#[derive(Debug, Default)]
struct HostConfig {
    relay: RelayConfig,
    climate: ClimateConfig,
}

impl HostConfig {
    fn from_env() -> anyhow::Result<Self> {
        let Some(path) = std::env::var_os("SWITCHBOARD_CONFIG") else {
            return Ok(Self::default());
        };
        let path = PathBuf::from(path);
        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let file: HostConfigFile =
            serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))?;
        let config = Self {
            relay: RelayConfig::from_value(file.relay).context("relay section")?,
            climate: ClimateConfig::from_value(file.climate).context("climate section")?,
        };
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,switchboard_core=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Switchboard simulator starting...");

    let config = HostConfig::from_env()?;
    let relay_addr: SocketAddr = "0.0.0.0:8080".parse()?;
    let climate_addr: SocketAddr = "0.0.0.0:8081".parse()?;

    let relay = start_relay_device(&config.relay).await?;
    let climate = start_climate_device(&config.climate)?;

    let relay_handle = tokio::spawn(async move {
        if let Err(e) = serve(relay_addr, create_relay_router(relay)).await {
            tracing::error!("Relay lights server error: {}", e);
        }
    });

    let sampler_state = climate.clone();
    let climate_handle = tokio::spawn(async move {
        if let Err(e) = serve(climate_addr, create_climate_router(climate)).await {
            tracing::error!("Climate dashboard server error: {}", e);
        }
    });

    let sampler_handle = tokio::spawn(run_sampler(sampler_state));

    tracing::info!("Relay lights:      http://localhost:8080/");
    tracing::info!("Climate dashboard: http://localhost:8081/");
    for (ssid, password) in DEMO_NETWORKS {
        tracing::info!("Simulated network '{}' (password '{}')", ssid, password);
    }

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        _ = relay_handle => {
            tracing::warn!("Relay lights server stopped");
        }
        _ = climate_handle => {
            tracing::warn!("Climate dashboard server stopped");
        }
        _ = sampler_handle => {
            tracing::warn!("Climate sampler stopped");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Build the relay device and run its boot sequence.
///
/// Boot may block for a full join budget, so it runs off the runtime.
async fn start_relay_device(config: &RelayConfig) -> anyhow::Result<RelayState> {
    let radio = DEMO_NETWORKS
        .iter()
        .fold(SimulatedRadio::new().with_join_delay(3), |radio, (ssid, pw)| {
            radio.with_network(ssid, pw)
        });
    let state_path =
        std::env::var("SWITCHBOARD_STATE").unwrap_or_else(|_| "switchboard-wifi.json".into());

    let device = RelayDevice::new(
        config,
        Box::new(SimulatedLines::new()),
        ProvisioningDrivers {
            radio: Box::new(radio),
            store: Box::new(FileCredentialStore::new(state_path)),
            advertiser: Box::new(SimulatedAdvertiser::new()),
            clock: Box::new(SystemClock),
        },
    )?;

    let device = tokio::task::spawn_blocking(move || {
        let mut device = device;
        let outcome = device.bootstrap()?;
        tracing::info!(joined = outcome.is_joined(), "relay lights booted");
        Ok::<_, anyhow::Error>(device)
    })
    .await??;

    Ok(Arc::new(Mutex::new(device)))
}

fn start_climate_device(config: &ClimateConfig) -> anyhow::Result<ClimateState> {
    let device = ClimateDevice::new(
        config,
        Box::new(SimulatedClimateSensor::new().with_dropout_every(7)),
        Box::new(SimulatedLines::new()),
    )?;
    tracing::info!(
        "climate dashboard on simulated access point '{}'",
        config.access_point.ssid
    );
    Ok(Arc::new(Mutex::new(device)))
}

/// Main-loop stand-in: let the monitor sample whenever it is due.
async fn run_sampler(state: ClimateState) {
    let mut interval = tokio::time::interval(Duration::from_millis(250));
    loop {
        interval.tick().await;
        match state.lock() {
            Ok(mut device) => device.tick(Instant::now()),
            Err(_) => {
                tracing::error!("Climate device state poisoned, stopping sampler");
                return;
            }
        }
    }
}

async fn serve(addr: SocketAddr, app: axum::Router) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
