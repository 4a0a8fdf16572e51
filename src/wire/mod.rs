use serde::{Deserialize, Serialize};
use serde_json::Value;

/// ========================================
/// Domain records exchanged with the model
/// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into() }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self { role: Role::Model, text: text.into() }
    }
}

/// A reference image held as a `data:<mime>;base64,<payload>` URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFile {
    pub data: String,
    pub mime_type: String,
    pub name: String,
}

impl ImageFile {
    /// The base64 payload without the data-URL prefix.
    pub fn base64_payload(&self) -> &str {
        match self.data.split_once(',') {
            Some((_, payload)) => payload,
            None => &self.data,
        }
    }
}

/// One generated file as the model reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub content: String,
}

/// A snapshot of current file content we want the model to see.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileBlob {
    pub path: String,
    pub bytes: usize,
    pub truncated: bool,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorChatResponse {
    pub response: String,
    #[serde(rename = "updatedFiles")]
    pub updated_files: Vec<FileEntry>,
}

/// ========================================
/// Provider-neutral request
/// ========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ResponseFormat {
    Text,
    Json { schema: Value },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmRequest {
    pub stage: String,
    pub system: String,
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageFile>,
    pub temperature: f32,
    pub top_p: f32,
    pub format: ResponseFormat,
}

/// ========================================
/// Gemini generateContent wire protocol
/// ========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub system_instruction: Content,
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

impl From<&LlmRequest> for GenerateContentRequest {
    fn from(req: &LlmRequest) -> Self {
        let mut parts = vec![Part { text: Some(req.user.clone()), inline_data: None }];
        if let Some(img) = &req.image {
            parts.push(Part {
                text: None,
                inline_data: Some(InlineData {
                    mime_type: img.mime_type.clone(),
                    data: img.base64_payload().to_string(),
                }),
            });
        }
        let (response_mime_type, response_schema) = match &req.format {
            ResponseFormat::Text => (None, None),
            ResponseFormat::Json { schema } => {
                (Some("application/json".to_string()), Some(schema.clone()))
            }
        };
        Self {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: Some(req.system.clone()), inline_data: None }],
            },
            contents: vec![Content { role: Some("user".into()), parts }],
            generation_config: GenerationConfig {
                temperature: req.temperature,
                top_p: req.top_p,
                response_mime_type,
                response_schema,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate; empty when the chunk carries none.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub message: String,
}
