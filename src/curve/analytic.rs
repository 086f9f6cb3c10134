use crate::models::MappingMode;

/// Lux at which the analytic curve saturates.
pub const LUX_CEILING: f64 = 10_000.0;

/// Lowest brightness the analytic curve will ever return.
pub const ANALYTIC_MIN_BRIGHTNESS: u8 = 10;

/// Highest brightness the analytic curve will ever return.
pub const ANALYTIC_MAX_BRIGHTNESS: u8 = 100;

/// Default light-to-brightness curve, used while no calibration exists.
///
/// Lux is normalized against [`LUX_CEILING`] and compressed with
/// `log10(1 + 9x)`, which maps [0, 1] onto [0, 1] while keeping changes in dim
/// light perceptible. The compressed value is then stretched over
/// [10, 100] (Forward) or [100, 10] (Inverse).
pub fn analytic_brightness(lux: u32, mode: MappingMode) -> u8 {
    let normalized = (f64::from(lux) / LUX_CEILING).min(1.0);
    let compressed = (1.0 + 9.0 * normalized).log10();

    let low = f64::from(ANALYTIC_MIN_BRIGHTNESS);
    let high = f64::from(ANALYTIC_MAX_BRIGHTNESS);
    let span = high - low;

    let value = match mode {
        MappingMode::Forward => low + compressed * span,
        MappingMode::Inverse => high - compressed * span,
    };

    value.round().clamp(low, high) as u8
}
