mod process;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::MigrationError;

pub use process::ProcessConverter;

/// Rich-text payload in the target CMS format: an array of block objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuredContent(pub Value);

impl StructuredContent {
    pub fn parse(raw: &[u8]) -> Result<Self, MigrationError> {
        let value: Value = serde_json::from_slice(raw)
            .map_err(|e| MigrationError::Conversion(format!("converter output is not JSON: {e}")))?;
        Ok(StructuredContent(value))
    }

    pub fn heading1(text: &str) -> Self {
        Self::single("heading1", text)
    }

    pub fn paragraph(text: &str) -> Self {
        if text.is_empty() {
            return StructuredContent(json!([]));
        }
        Self::single("paragraph", text)
    }

    fn single(kind: &str, text: &str) -> Self {
        StructuredContent(json!([{ "type": kind, "text": text, "spans": [] }]))
    }
}

#[async_trait]
pub trait Converter: Send + Sync {
    async fn convert(&self, html: &str) -> Result<StructuredContent, MigrationError>;
}
