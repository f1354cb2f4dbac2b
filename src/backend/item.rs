use serde::{Deserialize, Serialize};

/// One reading article ready for bulk submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportItem {
    pub unit_index: u32,
    pub article_index: u32,
    pub title: String,
    pub reading_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation_en: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation_vi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation_mn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

impl ImportItem {
    pub fn coordinate(&self) -> (u32, u32) {
        (self.unit_index, self.article_index)
    }
}
