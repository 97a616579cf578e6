//! Byte-count to CO2e conversion.

/// Converts transferred bytes into grams of CO2 equivalent.
pub trait EmissionsModel: Send + Sync {
    fn grams_for_bytes(&self, bytes: u64) -> f64;
}

/// Energy per byte in data centres, kWh.
const KWH_PER_BYTE_DATA_CENTRE: f64 = 0.000_000_000_72;

/// Energy per byte on the network, kWh.
const KWH_PER_BYTE_NETWORK: f64 = 0.000_000_004_88;

/// Grid carbon intensity for unspecified energy, g CO2e per kWh.
const GRID_INTENSITY: f64 = 519.0;

/// Flat energy-per-byte model (the "1byte" model).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerByteModel {
    pub kwh_per_byte: f64,
    pub grams_per_kwh: f64,
}

impl Default for PerByteModel {
    fn default() -> Self {
        Self {
            kwh_per_byte: KWH_PER_BYTE_DATA_CENTRE + KWH_PER_BYTE_NETWORK,
            grams_per_kwh: GRID_INTENSITY,
        }
    }
}

impl EmissionsModel for PerByteModel {
    fn grams_for_bytes(&self, bytes: u64) -> f64 {
        bytes as f64 * self.kwh_per_byte * self.grams_per_kwh
    }
}
