use serde::{Deserialize, Serialize};

use crate::repository::Notebook;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateNotebookRequest {
    #[schema(example = "Work")]
    pub name: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct NotebookResponse {
    #[schema(example = "0f8c2a6e1d3b4c5a9e7f6d5c4b3a2918")]
    pub id: String,
    #[schema(example = "Work")]
    pub name: String,
    /// Unix milliseconds.
    pub created_at: i64,
}

impl From<Notebook> for NotebookResponse {
    fn from(notebook: Notebook) -> Self {
        Self {
            id: notebook.id.to_string(),
            name: notebook.name,
            created_at: notebook.created_at,
        }
    }
}
