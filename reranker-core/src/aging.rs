use crate::config::RerankConfig;

/// Piecewise-linear age decay.
///
/// Flat at `1.0` inside the freshness window, then falls linearly, reaching
/// zero at `expiration_horizon + freshness_window` and going negative past it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgingModel {
    pub freshness_window_secs: f64,
    pub expiration_horizon_secs: f64,
}

impl AgingModel {
    pub fn new(freshness_window_secs: u64, expiration_horizon_secs: u64) -> Self {
        Self {
            freshness_window_secs: freshness_window_secs as f64,
            expiration_horizon_secs: expiration_horizon_secs as f64,
        }
    }

    pub fn from_config(config: &RerankConfig) -> Self {
        Self::new(config.freshness_window_secs, config.expiration_horizon_secs)
    }

    pub fn decay(&self, age_secs: f64) -> f64 {
        if age_secs < self.freshness_window_secs {
            1.0
        } else {
            let remaining =
                self.expiration_horizon_secs - age_secs + self.freshness_window_secs;
            remaining / self.expiration_horizon_secs
        }
    }
}
