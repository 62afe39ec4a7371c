//! WiFi radio for ESP32.
//!
//! The radio always runs in mixed mode: the management access point stays up
//! while the station side joins, fails or is dropped.

use std::net::Ipv4Addr;

use anyhow::Result;
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::{modem::Modem, peripheral},
    nvs::EspDefaultNvsPartition,
    wifi::{AccessPointConfiguration, AuthMethod, ClientConfiguration, Configuration, EspWifi},
};
use log::{info, warn};
use switchboard_core::{RadioDriver, RadioError};

/// [`RadioDriver`] over `EspWifi`.
pub struct EspRadio {
    wifi: Box<EspWifi<'static>>,
    access_point: AccessPointConfiguration,
}

impl EspRadio {
    pub fn new(
        modem: impl peripheral::Peripheral<P = Modem> + 'static,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
    ) -> Result<Self> {
        Ok(Self {
            wifi: Box::new(EspWifi::new(modem, sysloop, nvs)?),
            access_point: AccessPointConfiguration::default(),
        })
    }

    fn configure(&mut self, client: ClientConfiguration) -> Result<(), esp_idf_svc::sys::EspError> {
        self.wifi
            .set_configuration(&Configuration::Mixed(client, self.access_point.clone()))
    }
}

fn auth_for(password: &str) -> AuthMethod {
    if password.is_empty() {
        AuthMethod::None
    } else {
        AuthMethod::WPA2Personal
    }
}

impl RadioDriver for EspRadio {
    fn start_access_point(&mut self, ssid: &str, password: &str) -> Result<Ipv4Addr, RadioError> {
        let err = |e: String| RadioError::AccessPoint(e);

        self.access_point = AccessPointConfiguration {
            ssid: ssid
                .try_into()
                .map_err(|_| err(format!("ssid '{ssid}' too long")))?,
            password: password
                .try_into()
                .map_err(|_| err("password too long".to_string()))?,
            auth_method: auth_for(password),
            channel: 1,
            ..Default::default()
        };

        self.configure(ClientConfiguration::default())
            .map_err(|e| err(e.to_string()))?;
        self.wifi.start().map_err(|e| err(e.to_string()))?;

        let ip_info = self
            .wifi
            .ap_netif()
            .get_ip_info()
            .map_err(|e| err(e.to_string()))?;
        Ok(ip_info.ip)
    }

    fn begin_join(&mut self, ssid: &str, password: &str) -> Result<(), RadioError> {
        let err = |e: String| RadioError::Join(e);

        // A previous station session would keep retrying its old network.
        if self.wifi.is_connected().unwrap_or(false) {
            if let Err(e) = self.wifi.disconnect() {
                warn!("dropping previous station session failed: {e}");
            }
        }

        self.configure(ClientConfiguration {
            ssid: ssid
                .try_into()
                .map_err(|_| err(format!("ssid '{ssid}' too long")))?,
            password: password
                .try_into()
                .map_err(|_| err("password too long".to_string()))?,
            auth_method: auth_for(password),
            ..Default::default()
        })
        .map_err(|e| err(e.to_string()))?;

        info!("Connecting to '{}'...", ssid);
        self.wifi.connect().map_err(|e| err(e.to_string()))
    }

    fn is_joined(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
            && self.wifi.sta_netif().is_up().unwrap_or(false)
    }

    fn abort_join(&mut self) -> Result<(), RadioError> {
        if let Err(e) = self.wifi.disconnect() {
            warn!("station disconnect failed: {e}");
        }
        self.configure(ClientConfiguration::default())
            .map_err(|e| RadioError::Driver(e.to_string()))
    }

    fn station_ip(&self) -> Option<Ipv4Addr> {
        self.wifi
            .sta_netif()
            .get_ip_info()
            .ok()
            .map(|info| info.ip)
            .filter(|ip| !ip.is_unspecified())
    }

    fn scan(&mut self) -> Result<Vec<String>, RadioError> {
        let found = self
            .wifi
            .scan()
            .map_err(|e| RadioError::Scan(e.to_string()))?;

        let mut names: Vec<String> = Vec::with_capacity(found.len());
        for ap in found {
            let ssid = ap.ssid.as_str();
            if !ssid.is_empty() && !names.iter().any(|n| n == ssid) {
                names.push(ssid.to_string());
            }
        }
        Ok(names)
    }

    fn access_point_active(&self) -> bool {
        self.wifi.is_started().unwrap_or(false)
    }
}
