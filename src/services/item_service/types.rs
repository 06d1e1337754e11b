use crate::entities::{groups, items};
use crate::utils::validation::strip_markup;
use bytes::Bytes;
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

/// A file received from a form, fully buffered.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

#[derive(Debug, Clone, Validate)]
pub struct ItemDetails {
    #[validate(length(min = 3, max = 68, message = "Item name should be 3-68 characters"))]
    pub name: String,
    #[validate(length(
        min = 6,
        max = 1000,
        message = "Item description should be 6-1000 characters"
    ))]
    pub description: String,
}

impl ItemDetails {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: strip_markup(name),
            description: strip_markup(description),
        }
    }
}

pub struct ItemSubmission {
    pub details: ItemDetails,
    pub group_ids: Vec<String>,
    pub file: Option<UploadedFile>,
}

#[derive(Debug, Clone)]
pub struct ItemWriteOutcome {
    pub item: items::Model,
    /// Requested groups that were at their ceiling
    pub skipped_groups: Vec<String>,
}

impl ItemWriteOutcome {
    pub fn is_partial(&self) -> bool {
        !self.skipped_groups.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ItemView {
    #[schema(value_type = Object)]
    pub item: items::Model,
    #[schema(value_type = Vec<Object>)]
    pub groups: Vec<groups::Model>,
}
