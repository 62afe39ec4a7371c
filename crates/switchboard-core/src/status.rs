//! Light status document.
//!
//! `{"kitchen":1,"bedroom":0}`: one key per light in registry order. The
//! same document answers `/status` and `/toggle`.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::lights::LightRegistry;

/// Serializes a registry as a name → 0/1 map without reordering keys.
pub struct LightStatus<'a>(pub &'a LightRegistry);

impl Serialize for LightStatus<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let lights = self.0.lights();
        let mut map = serializer.serialize_map(Some(lights.len()))?;
        for light in lights {
            map.serialize_entry(light.name(), &u8::from(light.is_on()))?;
        }
        map.end()
    }
}

/// Compact JSON status of every light.
pub fn serialize_status(registry: &LightRegistry) -> Result<String, serde_json::Error> {
    serde_json::to_string(&LightStatus(registry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LightSpec;
    use crate::simulated::SimulatedLines;
    use pretty_assertions::assert_eq;

    fn registry(names: &[&str]) -> LightRegistry {
        let table: Vec<LightSpec> = names
            .iter()
            .zip(10u8..)
            .map(|(name, pin)| LightSpec::new(name, pin))
            .collect();
        LightRegistry::new(&table, Box::new(SimulatedLines::new())).unwrap()
    }

    #[test]
    fn test_kitchen_scenario() {
        let mut lights = registry(&["kitchen", "bedroom"]);

        assert!(lights.toggle("Kitchen").unwrap());

        assert_eq!(serialize_status(&lights).unwrap(), r#"{"kitchen":1,"bedroom":0}"#);
    }

    #[test]
    fn test_key_order_follows_registry_not_alphabet() {
        let lights = registry(&["porch", "bathroom", "living", "kitchen", "attic"]);

        assert_eq!(
            serialize_status(&lights).unwrap(),
            r#"{"porch":0,"bathroom":0,"living":0,"kitchen":0,"attic":0}"#
        );
    }

    #[test]
    fn test_empty_registry() {
        let lights = registry(&[]);

        assert_eq!(serialize_status(&lights).unwrap(), "{}");
    }
}
