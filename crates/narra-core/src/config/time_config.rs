//! Residual-time estimation parameters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Linear model `residual = a * (N - k) + b * (k + 1)` for one generation
/// method.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearParams {
    pub a: f64,
    pub b: f64,
}

impl Default for LinearParams {
    fn default() -> Self {
        Self { a: 45.0, b: 5.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeEstimationConfig {
    /// Per-method (flash/pro/ultra) linear parameters.
    pub linear_params_by_method: BTreeMap<String, LinearParams>,
    /// Flat per-chapter fallback when no model applies.
    pub fallback_seconds_per_chapter: f64,
    /// How many measured chapter timings make the session average trustworthy.
    pub min_chapters_for_reliable_avg: usize,
    pub use_session_avg_if_available: bool,
}

impl Default for TimeEstimationConfig {
    fn default() -> Self {
        let mut linear = BTreeMap::new();
        linear.insert("flash".to_string(), LinearParams { a: 25.0, b: 4.0 });
        linear.insert("pro".to_string(), LinearParams { a: 60.0, b: 8.0 });
        linear.insert("ultra".to_string(), LinearParams { a: 120.0, b: 15.0 });
        Self {
            linear_params_by_method: linear,
            fallback_seconds_per_chapter: 45.0,
            min_chapters_for_reliable_avg: 3,
            use_session_avg_if_available: true,
        }
    }
}

impl TimeEstimationConfig {
    /// Parameters for a generation method, falling back to the flat
    /// per-chapter estimate expressed as a linear model.
    pub fn params_for(&self, method: &str) -> LinearParams {
        self.linear_params_by_method
            .get(method)
            .copied()
            .unwrap_or(LinearParams {
                a: self.fallback_seconds_per_chapter,
                b: 0.0,
            })
    }
}
