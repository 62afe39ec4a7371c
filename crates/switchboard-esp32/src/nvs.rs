//! Credential persistence in NVS.
//!
//! Namespace `wifi`, string keys `ssid`, `pass` and `name`. All three keys
//! are rewritten on every save.

use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
use switchboard_core::{CredentialStore, NetworkCredentials, StorageError};

const NAMESPACE: &str = "wifi";
const KEY_SSID: &str = "ssid";
const KEY_PASS: &str = "pass";
const KEY_NAME: &str = "name";

/// Longest value accepted back from flash (WPA passphrases top out at 64).
const MAX_VALUE_LEN: usize = 96;

pub struct NvsCredentialStore {
    nvs: EspNvs<NvsDefault>,
}

impl NvsCredentialStore {
    pub fn new(partition: EspDefaultNvsPartition) -> anyhow::Result<Self> {
        Ok(Self {
            nvs: EspNvs::new(partition, NAMESPACE, true)?,
        })
    }

    fn read(&self, key: &str) -> Result<String, StorageError> {
        let mut buf = [0_u8; MAX_VALUE_LEN];
        let value = self
            .nvs
            .get_str(key, &mut buf)
            .map_err(|e| StorageError::Read(format!("{key}: {e}")))?;
        Ok(value.unwrap_or_default().to_string())
    }
}

impl CredentialStore for NvsCredentialStore {
    fn load(&self) -> Result<NetworkCredentials, StorageError> {
        Ok(NetworkCredentials {
            ssid: self.read(KEY_SSID)?,
            password: self.read(KEY_PASS)?,
            device_name: self.read(KEY_NAME)?,
        })
    }

    fn save(&mut self, credentials: &NetworkCredentials) -> Result<(), StorageError> {
        for (key, value) in [
            (KEY_SSID, credentials.ssid.as_str()),
            (KEY_PASS, credentials.password.as_str()),
            (KEY_NAME, credentials.device_name.as_str()),
        ] {
            self.nvs
                .set_str(key, value)
                .map_err(|e| StorageError::Write(format!("{key}: {e}")))?;
        }
        Ok(())
    }
}
