//! Brightness actuator port.
//!
//! The engine only decides which brightness to apply. Changing the panel
//! brightness is the actuator's job.

use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};

use anyhow::Result;
use log::info;

use crate::models::MAX_BRIGHTNESS;

/// Port for applying a brightness percentage to the display.
///
/// # Example Implementation
///
/// ```ignore
/// struct SysfsBacklight {
///     device: PathBuf,
///     max_raw: u32,
/// }
///
/// impl BrightnessActuator for SysfsBacklight {
///     async fn set(&self, percentage: u8) -> Result<()> {
///         let raw = self.max_raw * u32::from(percentage) / 100;
///         tokio::fs::write(self.device.join("brightness"), raw.to_string()).await?;
///         Ok(())
///     }
///
///     async fn get_current(&self) -> Result<u8> {
///         // ... read actual_brightness and rescale ...
///     }
/// }
/// ```
pub trait BrightnessActuator: Send + Sync + 'static {
    /// Apply `percentage` (0..=100).
    fn set(&self, percentage: u8) -> impl Future<Output = Result<()>> + Send;

    /// Current brightness. Only used at startup to seed the manual control.
    fn get_current(&self) -> impl Future<Output = Result<u8>> + Send;
}

/// Dry-run actuator: logs every request and remembers the last value.
#[derive(Debug)]
pub struct LogActuator {
    current: AtomicU8,
}

impl LogActuator {
    pub fn new(initial: u8) -> Self {
        Self {
            current: AtomicU8::new(initial.min(MAX_BRIGHTNESS)),
        }
    }
}

impl Default for LogActuator {
    fn default() -> Self {
        Self::new(50)
    }
}

impl BrightnessActuator for LogActuator {
    async fn set(&self, percentage: u8) -> Result<()> {
        let percentage = percentage.min(MAX_BRIGHTNESS);
        let previous = self.current.swap(percentage, Ordering::SeqCst);
        if previous != percentage {
            info!("Brightness {}% -> {}%", previous, percentage);
        }
        Ok(())
    }

    async fn get_current(&self) -> Result<u8> {
        Ok(self.current.load(Ordering::SeqCst))
    }
}
