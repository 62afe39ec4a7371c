//! Simulated drivers.
//!
//! Used by the Linux simulator binary and by tests. Every type is cheaply
//! cloneable and clones share state, so a test can hand one clone to the
//! device and keep another for inspection.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::climate::{ClimateReading, ClimateSensor, SensorError};
use crate::lights::{LineError, OutputLines, PinId};
use crate::provisioning::{AdvertiseError, Clock, NameAdvertiser, RadioDriver, RadioError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Radio
// ============================================================================

/// A network the simulated radio can see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedNetwork {
    pub ssid: String,
    pub password: String,
}

#[derive(Debug)]
struct PendingJoin {
    ssid: String,
    accepted: bool,
    polls: u32,
}

#[derive(Debug)]
struct RadioSim {
    networks: Vec<SimulatedNetwork>,
    polls_until_joined: u32,
    fail_access_point: bool,
    reject_joins: bool,
    access_point: Option<String>,
    pending: Option<PendingJoin>,
    joined: Option<String>,
    join_requests: Vec<String>,
}

impl Default for RadioSim {
    fn default() -> Self {
        Self {
            networks: Vec::new(),
            polls_until_joined: 1,
            fail_access_point: false,
            reject_joins: false,
            access_point: None,
            pending: None,
            joined: None,
            join_requests: Vec::new(),
        }
    }
}

/// Radio that joins a network when the password matches.
///
/// Association completes after a configurable number of status polls, so
/// join timing is driven entirely by the caller's clock.
#[derive(Debug, Clone, Default)]
pub struct SimulatedRadio {
    inner: Arc<Mutex<RadioSim>>,
}

impl SimulatedRadio {
    pub const ACCESS_POINT_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 1);
    pub const STATION_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 50);

    pub fn new() -> Self {
        Self::default()
    }

    /// Make a network visible and joinable with `password`.
    pub fn with_network(self, ssid: &str, password: &str) -> Self {
        lock(&self.inner).networks.push(SimulatedNetwork {
            ssid: ssid.to_string(),
            password: password.to_string(),
        });
        self
    }

    /// Number of status polls before a correct join reports success.
    pub fn with_join_delay(self, polls: u32) -> Self {
        lock(&self.inner).polls_until_joined = polls.max(1);
        self
    }

    /// Make `start_access_point` fail.
    pub fn with_access_point_failure(self) -> Self {
        lock(&self.inner).fail_access_point = true;
        self
    }

    /// Make `begin_join` refuse every request.
    pub fn with_join_rejection(self) -> Self {
        lock(&self.inner).reject_joins = true;
        self
    }

    /// Every SSID passed to `begin_join`, in order.
    pub fn join_requests(&self) -> Vec<String> {
        lock(&self.inner).join_requests.clone()
    }

    /// Network the station is associated with.
    pub fn joined_network(&self) -> Option<String> {
        lock(&self.inner).joined.clone()
    }
}

impl RadioDriver for SimulatedRadio {
    fn start_access_point(&mut self, ssid: &str, _password: &str) -> Result<Ipv4Addr, RadioError> {
        let mut sim = lock(&self.inner);
        if sim.fail_access_point {
            return Err(RadioError::AccessPoint("simulated failure".to_string()));
        }
        sim.access_point = Some(ssid.to_string());
        info!(%ssid, "simulated access point started");
        Ok(Self::ACCESS_POINT_IP)
    }

    fn begin_join(&mut self, ssid: &str, password: &str) -> Result<(), RadioError> {
        let mut sim = lock(&self.inner);
        sim.join_requests.push(ssid.to_string());
        if sim.reject_joins {
            return Err(RadioError::Join("simulated driver refusal".to_string()));
        }

        let accepted = sim
            .networks
            .iter()
            .any(|n| n.ssid == ssid && n.password == password);

        sim.joined = None;
        sim.pending = Some(PendingJoin {
            ssid: ssid.to_string(),
            accepted,
            polls: 0,
        });
        debug!(%ssid, accepted, "simulated join started");
        Ok(())
    }

    fn is_joined(&self) -> bool {
        let mut sim = lock(&self.inner);
        let needed = sim.polls_until_joined;
        let completed = match sim.pending.as_mut() {
            Some(pending) => {
                pending.polls += 1;
                (pending.accepted && pending.polls >= needed).then(|| pending.ssid.clone())
            }
            None => None,
        };
        if let Some(ssid) = completed {
            sim.pending = None;
            sim.joined = Some(ssid);
        }
        sim.joined.is_some()
    }

    fn abort_join(&mut self) -> Result<(), RadioError> {
        let mut sim = lock(&self.inner);
        sim.pending = None;
        sim.joined = None;
        Ok(())
    }

    fn station_ip(&self) -> Option<Ipv4Addr> {
        lock(&self.inner).joined.as_ref().map(|_| Self::STATION_IP)
    }

    fn scan(&mut self) -> Result<Vec<String>, RadioError> {
        Ok(lock(&self.inner)
            .networks
            .iter()
            .map(|n| n.ssid.clone())
            .collect())
    }

    fn access_point_active(&self) -> bool {
        lock(&self.inner).access_point.is_some()
    }
}

// ============================================================================
// Name advertisement
// ============================================================================

#[derive(Debug, Default)]
struct AdvertiserSim {
    active: Option<(String, u16)>,
    announcements: usize,
}

/// Advertiser that logs and records what it was asked to announce.
#[derive(Debug, Clone, Default)]
pub struct SimulatedAdvertiser {
    inner: Arc<Mutex<AdvertiserSim>>,
}

impl SimulatedAdvertiser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hostname and port currently announced.
    pub fn active(&self) -> Option<(String, u16)> {
        lock(&self.inner).active.clone()
    }

    /// Total number of `advertise` calls.
    pub fn announcements(&self) -> usize {
        lock(&self.inner).announcements
    }
}

impl NameAdvertiser for SimulatedAdvertiser {
    fn advertise(&mut self, hostname: &str, http_port: u16) -> Result<(), AdvertiseError> {
        let mut sim = lock(&self.inner);
        sim.active = Some((hostname.to_string(), http_port));
        sim.announcements += 1;
        info!("advertising {hostname}.local (_http._tcp port {http_port})");
        Ok(())
    }

    fn withdraw(&mut self) {
        if let Some((hostname, _)) = lock(&self.inner).active.take() {
            info!("stopped advertising {hostname}.local");
        }
    }
}

// ============================================================================
// Clock
// ============================================================================

/// Clock that only moves when slept on or advanced.
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        *lock(&self.offset) += by;
    }

    /// Time slept or advanced since creation.
    pub fn elapsed(&self) -> Duration {
        *lock(&self.offset)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

// ============================================================================
// Output lines
// ============================================================================

#[derive(Debug, Default)]
struct LinesSim {
    levels: BTreeMap<PinId, bool>,
    failing: Vec<PinId>,
}

/// Output lines kept in memory.
#[derive(Debug, Clone, Default)]
pub struct SimulatedLines {
    inner: Arc<Mutex<LinesSim>>,
}

impl SimulatedLines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last level driven on `pin`.
    pub fn level(&self, pin: PinId) -> Option<bool> {
        lock(&self.inner).levels.get(&pin).copied()
    }

    /// Make every later write to `pin` fail.
    pub fn fail_on(&self, pin: PinId) {
        lock(&self.inner).failing.push(pin);
    }
}

impl OutputLines for SimulatedLines {
    fn set_level(&mut self, pin: PinId, high: bool) -> Result<(), LineError> {
        let mut sim = lock(&self.inner);
        if sim.failing.contains(&pin) {
            return Err(LineError(format!("{pin} is not writable")));
        }
        sim.levels.insert(pin, high);
        debug!(%pin, high, "line set");
        Ok(())
    }
}

// ============================================================================
// Climate sensor
// ============================================================================

/// Sensor producing a slow indoor-climate drift.
///
/// With a dropout configured, every n-th read returns NaN the way a DHT11
/// does on a checksum error.
#[derive(Debug, Clone)]
pub struct SimulatedClimateSensor {
    reads: u64,
    dropout_every: Option<u64>,
}

impl SimulatedClimateSensor {
    pub fn new() -> Self {
        Self {
            reads: 0,
            dropout_every: None,
        }
    }

    pub fn with_dropout_every(mut self, n: u64) -> Self {
        self.dropout_every = (n > 0).then_some(n);
        self
    }
}

impl Default for SimulatedClimateSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl ClimateSensor for SimulatedClimateSensor {
    fn read(&mut self) -> Result<ClimateReading, SensorError> {
        self.reads += 1;
        if self.dropout_every.is_some_and(|n| self.reads % n == 0) {
            return Ok(ClimateReading {
                temperature: f32::NAN,
                humidity: f32::NAN,
            });
        }

        #[allow(clippy::cast_precision_loss)]
        let phase = self.reads as f32 / 30.0;
        Ok(ClimateReading {
            temperature: (22.0 + 2.0 * phase.sin()).round(),
            humidity: (45.0 + 5.0 * phase.cos()).round(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radio_rejects_wrong_password() {
        let mut radio = SimulatedRadio::new().with_network("home", "right");

        radio.begin_join("home", "wrong").unwrap();

        assert!(!radio.is_joined());
        assert!(!radio.is_joined());
        assert!(radio.station_ip().is_none());
    }

    #[test]
    fn test_radio_joins_after_delay() {
        let mut radio = SimulatedRadio::new()
            .with_network("home", "right")
            .with_join_delay(2);

        radio.begin_join("home", "right").unwrap();

        assert!(!radio.is_joined());
        assert!(radio.is_joined());
        assert_eq!(radio.joined_network().as_deref(), Some("home"));
        assert_eq!(radio.station_ip(), Some(SimulatedRadio::STATION_IP));
    }

    #[test]
    fn test_abort_keeps_access_point() {
        let mut radio = SimulatedRadio::new().with_network("home", "right");
        radio.start_access_point("ap", "pw").unwrap();
        radio.begin_join("home", "right").unwrap();
        assert!(radio.is_joined());

        radio.abort_join().unwrap();

        assert!(!radio.is_joined());
        assert!(radio.access_point_active());
    }

    #[test]
    fn test_manual_clock_advances_on_sleep() {
        let clock = ManualClock::new();
        let start = clock.now();

        clock.sleep(Duration::from_millis(500));

        assert_eq!(clock.now() - start, Duration::from_millis(500));
    }

    #[test]
    fn test_sensor_dropout() {
        let mut sensor = SimulatedClimateSensor::new().with_dropout_every(2);

        assert!(!sensor.read().unwrap().temperature.is_nan());
        assert!(sensor.read().unwrap().temperature.is_nan());
    }
}
