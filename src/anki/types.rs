use std::collections::HashMap;

use serde::{
    Deserialize,
    Serialize,
};

/// A single named text slot on a note. The wire format reports the slot's
/// position in the note type's declared field order; JSON object key order
/// carries no meaning and must not be relied on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub value: String,
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteInfo {
    pub note_id: u64,
    pub model_name: String,
    pub fields: HashMap<String, Field>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NoteInfo {
    /// Fields in the note type's declared order, reconstructed from the
    /// server-reported `order` attribute.
    pub fn ordered_fields(&self) -> Vec<(&String, &Field)> {
        let mut fields: Vec<_> = self.fields.iter().collect();
        fields.sort_by_key(|(_, field)| field.order);
        fields
    }

    /// Consuming variant of `ordered_fields` for handing the note off to an
    /// editor view.
    pub fn into_ordered_fields(self) -> Vec<(String, Field)> {
        let mut fields: Vec<_> = self.fields.into_iter().collect();
        fields.sort_by_key(|(_, field)| field.order);
        fields
    }
}

/// Response envelope shared by every bridge action: a non-null `error` string
/// excludes a usable `result`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub result: Option<T>,
    pub error: Option<String>,
}
