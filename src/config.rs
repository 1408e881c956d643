//! Configuration of error computations and projections, read from JSON.
use crate::norm::NormType;
use crate::project::ProjectionSettings;
use eyre::WrapErr;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parameters of an error computation followed by a projection.
///
/// Missing fields take their default values:
///
/// ```json
/// {
///     "norm": "L2_norm",
///     "exponent": 2.0,
///     "quadrature_strength": 4,
///     "projection": { "enforce_zero_boundary": false, "cg": { "tolerance": 1e-12, "max_iterations": 10000 } }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorToolsConfig {
    pub norm: NormType,
    /// Exponent of the `Lp_norm`, `W1p_seminorm` and `W1p_norm`.
    pub exponent: f64,
    /// Polynomial degree integrated exactly by the quadrature rules.
    pub quadrature_strength: usize,
    pub projection: ProjectionSettings,
}

impl Default for VectorToolsConfig {
    fn default() -> Self {
        Self {
            norm: NormType::L2Norm,
            exponent: 2.0,
            quadrature_strength: 4,
            projection: ProjectionSettings::default(),
        }
    }
}

impl VectorToolsConfig {
    pub fn from_json_str(json: &str) -> eyre::Result<Self> {
        let config: Self = serde_json::from_str(json).wrap_err("Failed to parse configuration")?;
        if config.norm.uses_exponent() && !(config.exponent >= 1.0) {
            eyre::bail!("Exponent of {} must be at least 1, got {}", config.norm, config.exponent);
        }
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read configuration file {}", path.display()))?;
        Self::from_json_str(&json).wrap_err_with(|| format!("Invalid configuration in {}", path.display()))
    }

    pub fn to_json_string(&self) -> eyre::Result<String> {
        serde_json::to_string_pretty(self).wrap_err("Failed to serialize configuration")
    }
}
