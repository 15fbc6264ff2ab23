use serde::{Deserialize, Serialize};

/// Query string of `GET /filteredimage`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilteredImageQuery {
    pub image_url: Option<String>,
}

impl FilteredImageQuery {
    /// The requested URL, if present and non-empty
    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref().filter(|url| !url.is_empty())
    }
}

/// Successful response of `GET /filteredimage`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilteredImageResponse {
    #[serde(rename = "imageUrl")]
    pub image_url: String,
}
