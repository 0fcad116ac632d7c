use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ==================================================================================================
// Job Submission Models
// ==================================================================================================

/// Body of `POST /jobs/submit-single-doc-with-template`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    pub template_id: String,
    pub document_url: String,
    #[serde(default)]
    pub recipients: Vec<Recipient>,
    /// Additional job parameters passed through unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JobRequest {
    pub fn new(template_id: impl Into<String>, document_url: impl Into<String>) -> Self {
        Self {
            template_id: template_id.into(),
            document_url: document_url.into(),
            recipients: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn with_recipient(mut self, recipient: Recipient) -> Self {
        self.recipients.push(recipient);
        self
    }

    /// Standard letter to a single sample recipient
    pub fn sample() -> Self {
        Self::new("standard-letter", "https://example.com/document.pdf").with_recipient(
            Recipient {
                name: "John Doe".to_string(),
                address: Address {
                    line1: "123 Main St".to_string(),
                    line2: None,
                    city: "New York".to_string(),
                    state: "NY".to_string(),
                    zip: "10001".to_string(),
                    country: None,
                },
            },
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub name: String,
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub line1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}
