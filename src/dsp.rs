//! Modules related to signal analysis: frame assembly, pitch detection,
//! smoothing.
pub mod moving_avg;
pub mod pitch_detector;
pub mod smoothing_filter;
pub mod windower;
