//! Data sources feeding the production loop

use async_trait::async_trait;
use rand::Rng;

use crate::error::Result;

use super::reading::Reading;

/// Producer of new readings
///
/// Called once per production tick. A failure skips that tick only.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Produce one new, unsaved reading
    async fn next_reading(&self) -> Result<Reading>;
}

/// Simulated temperature/humidity sensor
///
/// Values jitter uniformly around a baseline and are rounded to two decimals.
#[derive(Debug, Clone)]
pub struct SensorSource {
    base_temperature: f64,
    base_humidity: f64,
    jitter: f64,
}

impl SensorSource {
    /// Sensor around 22 °C and 45 % humidity
    pub fn new() -> Self {
        Self {
            base_temperature: 22.0,
            base_humidity: 45.0,
            jitter: 3.0,
        }
    }

    /// Set the baseline values
    pub fn baseline(mut self, temperature: f64, humidity: f64) -> Self {
        self.base_temperature = temperature;
        self.base_humidity = humidity.clamp(0.0, 100.0);
        self
    }

    /// Set the maximum deviation from the baseline
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.abs();
        self
    }

    fn sample(&self) -> Reading {
        let mut rng = rand::thread_rng();
        let (dt, dh) = if self.jitter > 0.0 {
            (
                rng.gen_range(-self.jitter..=self.jitter),
                rng.gen_range(-self.jitter..=self.jitter),
            )
        } else {
            (0.0, 0.0)
        };

        Reading::now(
            round2(self.base_temperature + dt),
            round2((self.base_humidity + dh).clamp(0.0, 100.0)),
        )
    }
}

impl Default for SensorSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataSource for SensorSource {
    async fn next_reading(&self) -> Result<Reading> {
        Ok(self.sample())
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_values_within_jitter() {
        let source = SensorSource::new().baseline(20.0, 50.0).jitter(1.5);

        for _ in 0..100 {
            let reading = source.next_reading().await.unwrap();
            assert!(reading.id.is_none());
            assert!((18.5..=21.5).contains(&reading.temperature));
            assert!((48.5..=51.5).contains(&reading.humidity));
        }
    }

    #[tokio::test]
    async fn test_humidity_clamped() {
        let source = SensorSource::new().baseline(20.0, 99.5).jitter(2.0);

        for _ in 0..50 {
            let reading = source.next_reading().await.unwrap();
            assert!(reading.humidity <= 100.0);
        }
    }

    #[tokio::test]
    async fn test_timestamps_advance() {
        let source = SensorSource::new().jitter(0.0);

        let first = source.next_reading().await.unwrap();
        let second = source.next_reading().await.unwrap();
        assert!(second.timestamp >= first.timestamp);
        assert_eq!(first.temperature, 22.0);
    }
}
