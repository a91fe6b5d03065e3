use std::time::{SystemTime, UNIX_EPOCH};

// utility functions

/// RMS energy of a frame of samples.  Used as the noise gate by the
/// autocorrelation pitch detector.
pub fn get_frame_rms(data: &[f32]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let sum: f64 = data.iter().map(|v| (*v as f64) * (*v as f64)).sum();
    (sum / data.len() as f64).sqrt()
}

/// microseconds since the epoch.  Hosts that have a real audio clock should
/// use that instead; this is for tests and simple drivers.
pub fn get_micro_time() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros()
}
