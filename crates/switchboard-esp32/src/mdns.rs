//! mDNS hostname and HTTP service announcement.

use esp_idf_svc::mdns::EspMdns;
use log::{info, warn};
use switchboard_core::{AdvertiseError, NameAdvertiser};

const SERVICE_TYPE: &str = "_http";
const SERVICE_PROTO: &str = "_tcp";

/// [`NameAdvertiser`] over the ESP-IDF mDNS component.
///
/// The responder is created on first use, so a device that never joins a
/// network never starts it.
#[derive(Default)]
pub struct EspNameAdvertiser {
    mdns: Option<EspMdns>,
}

impl EspNameAdvertiser {
    pub fn new() -> Self {
        Self::default()
    }
}

fn announce(
    mdns: &mut EspMdns,
    hostname: &str,
    http_port: u16,
) -> Result<(), esp_idf_svc::sys::EspError> {
    mdns.set_hostname(hostname)?;
    mdns.set_instance_name(hostname)?;
    mdns.add_service(None, SERVICE_TYPE, SERVICE_PROTO, http_port, &[])
}

impl NameAdvertiser for EspNameAdvertiser {
    fn advertise(&mut self, hostname: &str, http_port: u16) -> Result<(), AdvertiseError> {
        let mut mdns = match self.mdns.take() {
            Some(mdns) => mdns,
            None => EspMdns::take().map_err(|e| AdvertiseError(e.to_string()))?,
        };
        let result = announce(&mut mdns, hostname, http_port);
        self.mdns = Some(mdns);

        result.map_err(|e| AdvertiseError(e.to_string()))?;
        info!("mDNS responder started: http://{hostname}.local");
        Ok(())
    }

    fn withdraw(&mut self) {
        if let Some(mdns) = self.mdns.as_mut() {
            if let Err(e) = mdns.remove_service(SERVICE_TYPE, SERVICE_PROTO) {
                warn!("failed to remove mDNS service: {e}");
            }
        }
    }
}
