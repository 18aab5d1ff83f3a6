/// Calibration file reader module.
pub mod config;

/// PCD reader and writer module.
pub mod pcd;
