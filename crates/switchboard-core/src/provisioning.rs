//! Network provisioning.
//!
//! The controller owns the radio, the credential store and the name
//! advertiser. It always keeps the management access point up and layers a
//! station connection on top of it when credentials are available.
//!
//! # State machine
//!
//! ```text
//! Start ──► AttemptJoin ──► Joined
//!   │            │
//!   │            └────────► NotJoined   (budget elapsed, no retry)
//!   └─────────────────────► NotJoined   (no stored network)
//! ```
//!
//! A join attempt blocks the caller for up to the configured budget. The
//! clock is injected so the loop can be driven without real time.

use std::fmt;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::ProvisioningConfig;
use crate::credentials::{CredentialStore, NetworkCredentials};

/// Errors reported by a radio driver.
#[derive(Debug, Error)]
pub enum RadioError {
    #[error("Access point failed to start: {0}")]
    AccessPoint(String),

    #[error("Station join rejected: {0}")]
    Join(String),

    #[error("Network scan failed: {0}")]
    Scan(String),

    #[error("Radio driver error: {0}")]
    Driver(String),
}

/// The name advertisement service could not register the hostname.
#[derive(Debug, Error)]
#[error("Name advertisement failed: {0}")]
pub struct AdvertiseError(pub String);

/// Errors returned by provisioning operations.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    /// A required form field was absent or empty.
    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),

    #[error(transparent)]
    Radio(#[from] RadioError),
}

/// Wireless radio able to run access point and station at the same time.
pub trait RadioDriver: Send {
    /// Bring up the management access point and return its address.
    fn start_access_point(&mut self, ssid: &str, password: &str) -> Result<Ipv4Addr, RadioError>;

    /// Start joining `ssid` as a station without stopping the access point.
    ///
    /// Returns as soon as the request is issued; progress is observed
    /// through [`RadioDriver::is_joined`].
    fn begin_join(&mut self, ssid: &str, password: &str) -> Result<(), RadioError>;

    /// Whether the station is associated and has an address.
    fn is_joined(&self) -> bool;

    /// Drop the station side, leaving only the access point.
    fn abort_join(&mut self) -> Result<(), RadioError>;

    /// Station address while joined.
    fn station_ip(&self) -> Option<Ipv4Addr>;

    /// Names of nearby networks, strongest first where the driver knows.
    fn scan(&mut self) -> Result<Vec<String>, RadioError>;

    /// Whether the management access point is running.
    fn access_point_active(&self) -> bool;
}

/// Local hostname advertisement (mDNS).
pub trait NameAdvertiser: Send {
    /// Announce `<hostname>.local` and an `_http._tcp` service on `http_port`.
    fn advertise(&mut self, hostname: &str, http_port: u16) -> Result<(), AdvertiseError>;

    /// Stop announcing.
    fn withdraw(&mut self);
}

/// Monotonic time source with a blocking sleep.
pub trait Clock: Send {
    fn now(&self) -> Instant;

    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `std::time` and `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Which interfaces the radio is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum JoinMode {
    AccessPointOnly,
    AccessPointAndStation,
}

/// Result of a join attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    NotJoined,
}

impl JoinOutcome {
    pub fn is_joined(self) -> bool {
        self == JoinOutcome::Joined
    }
}

/// Snapshot of the device's network state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinState {
    pub mode: JoinMode,
    pub connected: bool,
    /// Hostname used for advertisement (fallback until one is saved).
    pub device_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station_ip: Option<Ipv4Addr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_point_ip: Option<Ipv4Addr>,
}

/// Platform drivers the controller takes ownership of.
pub struct ProvisioningDrivers {
    pub radio: Box<dyn RadioDriver>,
    pub store: Box<dyn CredentialStore>,
    pub advertiser: Box<dyn NameAdvertiser>,
    pub clock: Box<dyn Clock>,
}

/// Orchestrates access point bring-up, credential persistence and station
/// joins.
pub struct ProvisioningController {
    config: ProvisioningConfig,
    radio: Box<dyn RadioDriver>,
    store: Box<dyn CredentialStore>,
    advertiser: Box<dyn NameAdvertiser>,
    clock: Box<dyn Clock>,
    state: JoinState,
    /// Hostname currently announced, if any.
    advertised: Option<String>,
}

impl ProvisioningController {
    pub fn new(config: ProvisioningConfig, drivers: ProvisioningDrivers) -> Self {
        let state = JoinState {
            mode: JoinMode::AccessPointOnly,
            connected: false,
            device_name: config.fallback_device_name.clone(),
            station_ip: None,
            access_point_ip: None,
        };

        Self {
            config,
            radio: drivers.radio,
            store: drivers.store,
            advertiser: drivers.advertiser,
            clock: drivers.clock,
            state,
            advertised: None,
        }
    }

    /// Boot sequence: start the access point, load stored credentials and
    /// try to join if a network was saved.
    ///
    /// Only an access point failure is an error; a failed join is reported
    /// as [`JoinOutcome::NotJoined`].
    pub fn bootstrap(&mut self) -> Result<JoinOutcome, ProvisioningError> {
        let ap = &self.config.access_point;
        let ap_ip = self.radio.start_access_point(&ap.ssid, &ap.password)?;
        info!(ssid = %ap.ssid, ip = %ap_ip, "access point up");
        self.state.access_point_ip = Some(ap_ip);

        let credentials = self.store.load().unwrap_or_else(|err| {
            warn!(%err, "failed to load stored credentials, starting unprovisioned");
            NetworkCredentials::default()
        });

        if !credentials.device_name.is_empty() {
            self.state.device_name = credentials.device_name.clone();
        }

        Ok(self.attempt_join(&credentials))
    }

    /// Persist new credentials and join with them.
    ///
    /// The write happens before the join and is never rolled back. A
    /// non-empty `device_name` becomes the advertised hostname from now on.
    pub fn save_and_join(
        &mut self,
        ssid: &str,
        password: &str,
        device_name: &str,
    ) -> Result<JoinOutcome, ProvisioningError> {
        if ssid.is_empty() {
            return Err(ProvisioningError::MissingParameter("ssid"));
        }
        if password.is_empty() {
            return Err(ProvisioningError::MissingParameter("pass"));
        }

        let credentials = NetworkCredentials::new(ssid, password, device_name);
        match self.store.save(&credentials) {
            Ok(()) => info!(%ssid, "credentials saved"),
            Err(err) => error!(%err, %ssid, "failed to persist credentials"),
        }

        if !device_name.is_empty() {
            self.state.device_name = device_name.to_string();
        }

        Ok(self.attempt_join(&credentials))
    }

    /// Current network state.
    pub fn current_status(&self) -> JoinState {
        self.state.clone()
    }

    /// Nearby network names. A scan failure is logged and reads as empty.
    pub fn scan_networks(&mut self) -> Vec<String> {
        match self.radio.scan() {
            Ok(networks) => {
                debug!(count = networks.len(), "scan complete");
                networks
            }
            Err(err) => {
                warn!(%err, "network scan failed");
                Vec::new()
            }
        }
    }

    /// Hostname used for advertisement.
    pub fn device_name(&self) -> &str {
        &self.state.device_name
    }

    pub fn http_port(&self) -> u16 {
        self.config.http_port
    }

    pub fn access_point_active(&self) -> bool {
        self.radio.access_point_active()
    }

    fn attempt_join(&mut self, credentials: &NetworkCredentials) -> JoinOutcome {
        if !credentials.has_network() {
            info!("no network configured, serving on access point only");
            self.fall_back_to_access_point();
            return JoinOutcome::NotJoined;
        }

        let ssid = credentials.ssid.as_str();
        self.state.mode = JoinMode::AccessPointAndStation;
        info!(%ssid, "joining network");

        if let Err(err) = self.radio.begin_join(ssid, &credentials.password) {
            warn!(%err, %ssid, "radio rejected join request");
            self.fall_back_to_access_point();
            return JoinOutcome::NotJoined;
        }

        let budget = self.config.join_timeout();
        let interval = self.config.join_poll_interval();
        let started = self.clock.now();

        loop {
            if self.radio.is_joined() {
                self.on_joined(ssid);
                return JoinOutcome::Joined;
            }

            let elapsed = self.clock.now().saturating_duration_since(started);
            if elapsed >= budget {
                warn!(%ssid, ?elapsed, "join timed out");
                self.fall_back_to_access_point();
                return JoinOutcome::NotJoined;
            }

            self.clock.sleep(interval);
        }
    }

    fn on_joined(&mut self, ssid: &str) {
        self.state.connected = true;
        self.state.mode = JoinMode::AccessPointAndStation;
        self.state.station_ip = self.radio.station_ip();

        let hostname = self.state.device_name.clone();
        if self.advertised.as_deref() != Some(hostname.as_str()) {
            if self.advertised.take().is_some() {
                self.advertiser.withdraw();
            }
            match self.advertiser.advertise(&hostname, self.config.http_port) {
                Ok(()) => self.advertised = Some(hostname.clone()),
                Err(err) => warn!(%err, %hostname, "name advertisement not started"),
            }
        }

        match self.state.station_ip {
            Some(ip) => info!(%ssid, %ip, "joined, reachable at http://{hostname}.local"),
            None => info!(%ssid, "joined, reachable at http://{hostname}.local"),
        }
    }

    fn fall_back_to_access_point(&mut self) {
        if self.state.mode == JoinMode::AccessPointAndStation {
            if let Err(err) = self.radio.abort_join() {
                warn!(%err, "failed to drop station interface");
            }
        }
        if self.advertised.take().is_some() {
            self.advertiser.withdraw();
        }

        self.state.mode = JoinMode::AccessPointOnly;
        self.state.connected = false;
        self.state.station_ip = None;
    }
}

impl fmt::Debug for ProvisioningController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisioningController")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("advertised", &self.advertised)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryCredentialStore;
    use crate::simulated::{ManualClock, SimulatedAdvertiser, SimulatedRadio};
    use pretty_assertions::assert_eq;

    struct Harness {
        controller: ProvisioningController,
        radio: SimulatedRadio,
        store: MemoryCredentialStore,
        advertiser: SimulatedAdvertiser,
        clock: ManualClock,
    }

    fn harness(radio: SimulatedRadio, store: MemoryCredentialStore) -> Harness {
        let advertiser = SimulatedAdvertiser::new();
        let clock = ManualClock::new();
        let controller = ProvisioningController::new(
            ProvisioningConfig::default(),
            ProvisioningDrivers {
                radio: Box::new(radio.clone()),
                store: Box::new(store.clone()),
                advertiser: Box::new(advertiser.clone()),
                clock: Box::new(clock.clone()),
            },
        );
        Harness {
            controller,
            radio,
            store,
            advertiser,
            clock,
        }
    }

    #[test]
    fn test_boot_without_credentials_stays_on_access_point() {
        let mut h = harness(SimulatedRadio::new(), MemoryCredentialStore::new());

        let outcome = h.controller.bootstrap().unwrap();

        assert_eq!(outcome, JoinOutcome::NotJoined);
        let state = h.controller.current_status();
        assert_eq!(state.mode, JoinMode::AccessPointOnly);
        assert!(!state.connected);
        assert_eq!(state.device_name, "esp32-lights");
        assert!(h.radio.access_point_active());
        assert!(h.radio.join_requests().is_empty());
        assert_eq!(h.clock.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_boot_with_stored_credentials_joins_and_advertises() {
        let radio = SimulatedRadio::new().with_network("home", "secret");
        let store =
            MemoryCredentialStore::with_credentials(NetworkCredentials::new("home", "secret", "lamp"));
        let mut h = harness(radio, store);

        let outcome = h.controller.bootstrap().unwrap();

        assert_eq!(outcome, JoinOutcome::Joined);
        let state = h.controller.current_status();
        assert_eq!(state.mode, JoinMode::AccessPointAndStation);
        assert!(state.connected);
        assert!(state.station_ip.is_some());
        assert_eq!(h.advertiser.active(), Some(("lamp".to_string(), 80)));
        assert_eq!(h.store.writes(), 0);
    }

    #[test]
    fn test_boot_with_stored_name_but_no_network_skips_driver() {
        let store =
            MemoryCredentialStore::with_credentials(NetworkCredentials::new("", "", "desk"));
        let mut h = harness(SimulatedRadio::new(), store);

        let outcome = h.controller.bootstrap().unwrap();

        assert_eq!(outcome, JoinOutcome::NotJoined);
        assert!(h.radio.join_requests().is_empty());
        assert_eq!(h.controller.device_name(), "desk");
    }

    #[test]
    fn test_boot_fails_when_access_point_cannot_start() {
        let mut h = harness(
            SimulatedRadio::new().with_access_point_failure(),
            MemoryCredentialStore::new(),
        );

        let err = h.controller.bootstrap().unwrap_err();

        assert!(matches!(err, ProvisioningError::Radio(RadioError::AccessPoint(_))));
    }

    #[test]
    fn test_save_with_empty_password_does_not_write() {
        let mut h = harness(SimulatedRadio::new(), MemoryCredentialStore::new());
        h.controller.bootstrap().unwrap();

        let err = h.controller.save_and_join("home", "", "").unwrap_err();

        assert!(matches!(err, ProvisioningError::MissingParameter("pass")));
        assert_eq!(h.store.writes(), 0);
        assert!(h.radio.join_requests().is_empty());
    }

    #[test]
    fn test_save_with_empty_ssid_does_not_write() {
        let mut h = harness(SimulatedRadio::new(), MemoryCredentialStore::new());
        h.controller.bootstrap().unwrap();

        let err = h.controller.save_and_join("", "secret", "lamp").unwrap_err();

        assert!(matches!(err, ProvisioningError::MissingParameter("ssid")));
        assert_eq!(h.store.writes(), 0);
        assert_eq!(h.controller.device_name(), "esp32-lights");
    }

    #[test]
    fn test_save_and_join_success_writes_once() {
        let radio = SimulatedRadio::new().with_network("home", "secret");
        let mut h = harness(radio, MemoryCredentialStore::new());
        h.controller.bootstrap().unwrap();

        let outcome = h.controller.save_and_join("home", "secret", "").unwrap();

        assert_eq!(outcome, JoinOutcome::Joined);
        assert_eq!(h.store.writes(), 1);
        assert_eq!(h.store.stored(), NetworkCredentials::new("home", "secret", ""));
        assert_eq!(h.advertiser.active(), Some(("esp32-lights".to_string(), 80)));
    }

    #[test]
    fn test_wrong_password_times_out_within_budget() {
        let radio = SimulatedRadio::new().with_network("home", "right");
        let mut h = harness(radio, MemoryCredentialStore::new());
        h.controller.bootstrap().unwrap();
        let budget = Duration::from_secs(12);
        let interval = Duration::from_millis(500);

        let outcome = h.controller.save_and_join("home", "wrongpass", "").unwrap();

        assert_eq!(outcome, JoinOutcome::NotJoined);
        let elapsed = h.clock.elapsed();
        assert!(elapsed >= budget, "returned early after {elapsed:?}");
        assert!(elapsed <= budget + interval, "overran budget: {elapsed:?}");
        assert_eq!(h.store.writes(), 1);
        assert_eq!(h.store.stored(), NetworkCredentials::new("home", "wrongpass", ""));
        assert!(h.radio.access_point_active());
        assert_eq!(h.controller.current_status().mode, JoinMode::AccessPointOnly);
        assert!(h.advertiser.active().is_none());
    }

    #[test]
    fn test_refused_join_returns_immediately() {
        let radio = SimulatedRadio::new()
            .with_network("home", "secret")
            .with_join_rejection();
        let mut h = harness(radio, MemoryCredentialStore::new());
        h.controller.bootstrap().unwrap();

        let outcome = h.controller.save_and_join("home", "secret", "").unwrap();

        assert_eq!(outcome, JoinOutcome::NotJoined);
        assert_eq!(h.clock.elapsed(), Duration::ZERO);
        assert_eq!(h.radio.join_requests(), vec!["home".to_string()]);
        assert_eq!(h.store.writes(), 1);
        assert_eq!(h.controller.current_status().mode, JoinMode::AccessPointOnly);
        assert!(h.radio.access_point_active());
    }

    #[test]
    fn test_failed_write_still_joins() {
        let radio = SimulatedRadio::new().with_network("home", "secret");
        let store = MemoryCredentialStore::new();
        store.fail_writes();
        let mut h = harness(radio, store);
        h.controller.bootstrap().unwrap();

        let outcome = h.controller.save_and_join("home", "secret", "lamp").unwrap();

        assert_eq!(outcome, JoinOutcome::Joined);
        assert_eq!(h.store.writes(), 0);
        assert_eq!(h.store.stored(), NetworkCredentials::default());
        assert_eq!(h.radio.joined_network().as_deref(), Some("home"));
        assert_eq!(h.advertiser.active(), Some(("lamp".to_string(), 80)));
    }

    #[test]
    fn test_zero_poll_interval_still_times_out() {
        let clock = ManualClock::new();
        let config = ProvisioningConfig {
            join_poll_interval_ms: 0,
            ..ProvisioningConfig::default()
        };
        let mut controller = ProvisioningController::new(
            config,
            ProvisioningDrivers {
                radio: Box::new(SimulatedRadio::new()),
                store: Box::new(MemoryCredentialStore::new()),
                advertiser: Box::new(SimulatedAdvertiser::new()),
                clock: Box::new(clock.clone()),
            },
        );
        controller.bootstrap().unwrap();

        let outcome = controller.save_and_join("home", "secret", "").unwrap();

        assert_eq!(outcome, JoinOutcome::NotJoined);
        assert!(clock.elapsed() >= Duration::from_secs(12));
    }

    #[test]
    fn test_device_name_persists_across_failed_join() {
        let mut h = harness(SimulatedRadio::new(), MemoryCredentialStore::new());
        h.controller.bootstrap().unwrap();

        h.controller.save_and_join("nowhere", "pw", "porch").unwrap();

        assert_eq!(h.controller.device_name(), "porch");
        assert_eq!(h.store.stored().device_name, "porch");
    }

    #[test]
    fn test_empty_device_name_keeps_previous_name() {
        let radio = SimulatedRadio::new().with_network("home", "secret");
        let mut h = harness(radio, MemoryCredentialStore::new());
        h.controller.bootstrap().unwrap();
        h.controller.save_and_join("home", "secret", "lamp").unwrap();

        h.controller.save_and_join("home", "secret", "").unwrap();

        assert_eq!(h.controller.device_name(), "lamp");
        assert_eq!(h.advertiser.active(), Some(("lamp".to_string(), 80)));
        assert_eq!(h.advertiser.announcements(), 1);
    }

    #[test]
    fn test_rename_while_joined_restarts_advertisement() {
        let radio = SimulatedRadio::new().with_network("home", "secret");
        let mut h = harness(radio, MemoryCredentialStore::new());
        h.controller.bootstrap().unwrap();
        h.controller.save_and_join("home", "secret", "lamp").unwrap();

        h.controller.save_and_join("home", "secret", "desk").unwrap();

        assert_eq!(h.advertiser.active(), Some(("desk".to_string(), 80)));
        assert_eq!(h.advertiser.announcements(), 2);
    }

    #[test]
    fn test_join_waits_for_slow_association() {
        let radio = SimulatedRadio::new()
            .with_network("home", "secret")
            .with_join_delay(4);
        let mut h = harness(radio, MemoryCredentialStore::new());
        h.controller.bootstrap().unwrap();

        let outcome = h.controller.save_and_join("home", "secret", "").unwrap();

        assert_eq!(outcome, JoinOutcome::Joined);
        assert!(h.clock.elapsed() < Duration::from_secs(12));
        assert!(h.clock.elapsed() >= Duration::from_millis(1500));
    }

    #[test]
    fn test_scan_returns_empty_when_nothing_found() {
        let mut h = harness(SimulatedRadio::new(), MemoryCredentialStore::new());

        assert!(h.controller.scan_networks().is_empty());
    }

    #[test]
    fn test_scan_lists_networks() {
        let radio = SimulatedRadio::new()
            .with_network("home", "a")
            .with_network("guest", "b");
        let mut h = harness(radio, MemoryCredentialStore::new());

        assert_eq!(h.controller.scan_networks(), vec!["home", "guest"]);
    }

    #[test]
    fn test_join_state_json() {
        let state = JoinState {
            mode: JoinMode::AccessPointAndStation,
            connected: true,
            device_name: "lamp".to_string(),
            station_ip: Some(Ipv4Addr::new(192, 168, 1, 50)),
            access_point_ip: Some(Ipv4Addr::new(192, 168, 4, 1)),
        };

        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            serde_json::json!({
                "mode": "accessPointAndStation",
                "connected": true,
                "deviceName": "lamp",
                "stationIp": "192.168.1.50",
                "accessPointIp": "192.168.4.1"
            })
        );
    }
}
