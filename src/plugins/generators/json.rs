use async_trait::async_trait;
use std::sync::Arc;

use super::OutputTarget;
use crate::plugins::{Capability, GenerationInput, Generator, OutputDestination, PluginSettings};
use crate::types::Artifact;
use crate::{DsxError, Result};

pub const FILE_NAME: &str = "styles.json";

/// Writes the data bag verbatim as pretty-printed JSON.
pub struct JsonGenerator {
    id: String,
    target: OutputTarget,
}

impl JsonGenerator {
    pub fn new(id: &str, settings: &PluginSettings) -> Self {
        Self {
            id: id.to_string(),
            target: OutputTarget::new(id, settings),
        }
    }
}

pub fn factory(id: &str, settings: &PluginSettings) -> Result<Capability> {
    Ok(Capability::Generator(Arc::new(JsonGenerator::new(id, settings))))
}

#[async_trait]
impl Generator for JsonGenerator {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        "Complete extraction data as JSON"
    }

    fn format(&self) -> &str {
        "json"
    }

    async fn generate(
        &self,
        input: &GenerationInput<'_>,
        output: Option<&OutputDestination>,
    ) -> Result<Vec<Artifact>> {
        let content = serde_json::to_string_pretty(input.data)
            .map_err(|e| DsxError::generation(&self.id, e.to_string()))?;
        let artifact = self
            .target
            .emit(output, FILE_NAME, "application/json", content)
            .await?;
        Ok(vec![artifact])
    }
}
