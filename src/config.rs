//! Pipeline configuration loaded from JSON

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::filters::IirConfig;
use crate::imu::IntegrationMethod;

fn default_output_every() -> usize {
    10
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Optional smoothing of quantised accel channels
    #[serde(default)]
    pub iir: Option<IirConfig>,

    #[serde(default)]
    pub integration: IntegrationMethod,

    /// Raw samples folded into each emitted preintegrated record
    #[serde(default = "default_output_every")]
    pub output_every: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            iir: None,
            integration: IntegrationMethod::default(),
            output_every: default_output_every(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let config: PipelineConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.integration.validate()?;
        if self.output_every == 0 {
            anyhow::bail!("output_every must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_object() {
        let config = PipelineConfig::from_json("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.integration, IntegrationMethod::Bortz { substeps: 4 });
    }

    #[test]
    fn test_full_config() {
        let config = PipelineConfig::from_json(
            r#"{
                "iir": {"channels": 3, "sample_nbits": 16, "sample_rate_hz": 1000.0, "cutoff_hz": 20.0},
                "integration": {"method": "bortz", "substeps": 8},
                "output_every": 5
            }"#,
        )
        .unwrap();
        let iir = config.iir.unwrap();
        assert_eq!(iir.channels, 3);
        assert_eq!(iir.block_frames, 1);
        assert_eq!(config.integration, IntegrationMethod::Bortz { substeps: 8 });
        assert_eq!(config.output_every, 5);
    }

    #[test]
    fn test_rejects_invalid() {
        assert!(PipelineConfig::from_json(r#"{"output_every": 0}"#).is_err());
        assert!(
            PipelineConfig::from_json(r#"{"integration": {"method": "bortz", "substeps": 0}}"#)
                .is_err()
        );
    }
}
