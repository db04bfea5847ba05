//! Sensor Catalog
//!
//! Field devices report a display name ("MQ-5", "Gas", "Temperature", ...).
//! The engine and the reading log work with canonical sensor type ids
//! (`mq5_01`, `temp_01`, ...). This module owns that mapping.

// ===== CANONICAL SENSOR TYPE IDS =====

/// MQ-5 gas sensor (LPG / natural gas), reported in ppm.
///
/// The only feature the deployed outlier model is fitted on.
pub const GAS_SENSOR: &str = "mq5_01";

/// Ambient temperature sensor (°C).
pub const TEMPERATURE_SENSOR: &str = "temp_01";

/// Relative humidity sensor (%).
pub const HUMIDITY_SENSOR: &str = "humidity_01";

/// Barometric pressure sensor (kPa).
pub const PRESSURE_SENSOR: &str = "pressure_01";

/// Ambient light sensor (lux).
pub const LIGHT_SENSOR: &str = "light_01";

/// PIR motion sensor (events/min).
pub const MOTION_SENSOR: &str = "motion_01";

/// Feature columns of the default statistical model
pub const DEFAULT_MODEL_FEATURES: &[&str] = &[GAS_SENSOR];

/// One supported sensor kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorKind {
    /// Canonical sensor type id used by the engine and the log
    pub id: &'static str,
    /// Name shown to operators
    pub display_name: &'static str,
    /// Names accepted at ingestion besides the canonical id
    pub aliases: &'static [&'static str],
    /// Measurement unit
    pub unit: &'static str,
}

/// Every sensor kind the ingestion boundary accepts
pub const SENSOR_KINDS: &[SensorKind] = &[
    SensorKind {
        id: GAS_SENSOR,
        display_name: "Gas",
        aliases: &["MQ-5", "Gas"],
        unit: "ppm",
    },
    SensorKind {
        id: TEMPERATURE_SENSOR,
        display_name: "Temperature",
        aliases: &["Temperature"],
        unit: "°C",
    },
    SensorKind {
        id: HUMIDITY_SENSOR,
        display_name: "Humidity",
        aliases: &["Humidity"],
        unit: "%",
    },
    SensorKind {
        id: PRESSURE_SENSOR,
        display_name: "Pressure",
        aliases: &["Pressure"],
        unit: "kPa",
    },
    SensorKind {
        id: LIGHT_SENSOR,
        display_name: "Light",
        aliases: &["Light"],
        unit: "lux",
    },
    SensorKind {
        id: MOTION_SENSOR,
        display_name: "Motion",
        aliases: &["Motion"],
        unit: "events/min",
    },
];

/// Resolve a reported sensor name (alias or canonical id)
///
/// Matching is exact; field firmware sends fixed strings.
pub fn resolve(name: &str) -> Option<&'static SensorKind> {
    SENSOR_KINDS
        .iter()
        .find(|kind| kind.id == name || kind.aliases.contains(&name))
}

/// Look up a sensor kind by canonical id only
pub fn by_id(id: &str) -> Option<&'static SensorKind> {
    SENSOR_KINDS.iter().find(|kind| kind.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_to_canonical_ids() {
        assert_eq!(resolve("MQ-5").map(|k| k.id), Some(GAS_SENSOR));
        assert_eq!(resolve("Gas").map(|k| k.id), Some(GAS_SENSOR));
        assert_eq!(resolve("Temperature").map(|k| k.id), Some(TEMPERATURE_SENSOR));
        assert_eq!(resolve("Motion").map(|k| k.unit), Some("events/min"));
    }

    #[test]
    fn canonical_ids_accepted_verbatim() {
        assert_eq!(resolve("mq5_01").map(|k| k.display_name), Some("Gas"));
        assert_eq!(resolve("pressure_01").map(|k| k.unit), Some("kPa"));
    }

    #[test]
    fn unknown_names_rejected() {
        assert!(resolve("Radon").is_none());
        assert!(resolve("gas").is_none());
        assert!(by_id("Gas").is_none());
    }
}
