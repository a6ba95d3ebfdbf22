use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::basic::aggregate::Attribution;
use crate::basic::reduction::ReductionMode;
use crate::error::Result;

use super::dss::EmitOptions;
use super::names_from_json;

/// Ordered bus and branch names of the segment to collapse, source end first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackboneConfig {
    #[serde(deserialize_with = "names_from_json")]
    pub buses: Vec<String>,
    #[serde(deserialize_with = "names_from_json")]
    pub branches: Vec<String>,
}

/// One reduction run: which segment, which laterals feed each backbone bus, how to
/// match the equivalent and how to write it out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReductionConfig {
    pub backbone: BackboneConfig,
    #[serde(default)]
    pub laterals: Vec<Attribution>,
    /// Lossy elements off the branch list whose losses still belong to the segment,
    /// e.g. `Transformer.Reg1`.
    #[serde(default)]
    pub extra_loss_elements: Vec<String>,
    #[serde(default)]
    pub mode: ReductionMode,
    #[serde(default)]
    pub emit: EmitOptions,
}

pub fn config_from_str(content: &str) -> Result<ReductionConfig> {
    Ok(serde_json::from_str(content)?)
}

/// Reads a reduction configuration from a JSON file.
pub fn load_config(path: impl AsRef<Path>) -> Result<ReductionConfig> {
    let content = fs::read_to_string(path.as_ref())?;
    let config = config_from_str(&content)?;
    debug!(
        path = %path.as_ref().display(),
        buses = config.backbone.buses.len(),
        laterals = config.laterals.len(),
        "loaded reduction config"
    );
    Ok(config)
}
