use std::ops::Range;

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::payload::SensorReading;

const TEMPERATURE_RANGE: Range<f64> = 20.0..32.0;
const HUMIDITY_RANGE: Range<f64> = 30.0..70.0;

/// Something that can produce a reading once per tick.
pub trait ReadingSource {
    fn next_reading(&mut self) -> Option<SensorReading>;
}

/// Random temperature/humidity generator standing in for real hardware.
pub struct SyntheticSensor {
    rng: StdRng,
}

impl SyntheticSensor {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic sequence for tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for SyntheticSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadingSource for SyntheticSensor {
    fn next_reading(&mut self) -> Option<SensorReading> {
        let temperature = round2(self.rng.gen_range(TEMPERATURE_RANGE));
        let humidity = round2(self.rng.gen_range(HUMIDITY_RANGE));
        Some(SensorReading::now(temperature, humidity))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
