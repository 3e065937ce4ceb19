use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Name of a display output as reported by the backend, e.g. `eDP-1`.
///
/// Outputs are opaque to us; they are never validated locally.
pub type Output = String;

/// Relative brightness of an output, where 1.0 is full brightness.
///
/// Always within [Brightness::MIN, Brightness::MAX].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Brightness(f64);

/// Returned when a value can't be used as a [Brightness].
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum BrightnessError {
    #[error("brightness must be a finite number, got {0}")]
    NotFinite(f64),
    #[error("brightness {0} is outside of the allowed range 0.1 - 1.0")]
    OutOfRange(f64),
}

impl Brightness {
    pub const MIN: Brightness = Brightness(0.1);
    pub const MAX: Brightness = Brightness(1.0);
    /// Granularity of the brightness slider
    pub const STEP: f64 = 0.01;
    /// Used when an output's current brightness can't be determined
    pub const DEFAULT: Brightness = Brightness::MAX;

    /// Accept `value` as is, refusing anything outside of the allowed range.
    pub fn new(value: f64) -> Result<Brightness, BrightnessError> {
        if !value.is_finite() {
            Err(BrightnessError::NotFinite(value))
        } else if value < Self::MIN.0 || value > Self::MAX.0 {
            Err(BrightnessError::OutOfRange(value))
        } else {
            Ok(Brightness(value))
        }
    }

    /// Interpret `value` the way a range input with min 0.1, max 1.0 and step
    /// 0.01 would: clamp it into range and snap it to the nearest step.
    pub fn from_control(value: f64) -> Result<Brightness, BrightnessError> {
        if !value.is_finite() {
            return Err(BrightnessError::NotFinite(value));
        }
        let clamped = value.clamp(Self::MIN.0, Self::MAX.0);
        // steps / 100 rather than steps * 0.01, so that 0.3 stays 0.3
        let steps = (clamped / Self::STEP).round();
        Ok(Brightness(steps / (1.0 / Self::STEP)))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Brightness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// The operations the panel needs from whatever actually drives the
/// displays. Implementations are expected to be cheap to clone, every clone
/// controlling the same displays.
#[async_trait]
pub trait DisplayBackend: Clone + Send + Sync + 'static {
    /// Currently available outputs. The order is stable, the first output is
    /// the one the panel selects by default. An empty list is not an error.
    async fn list_outputs(&self) -> Result<Vec<Output>>;

    /// Current relative brightness of `output`.
    async fn get_brightness(&self, output: &str) -> Result<Brightness>;

    /// Apply `value` to `output`, returning the backend's acknowledgement.
    async fn set_brightness(&self, output: &str, value: Brightness) -> Result<String>;
}
