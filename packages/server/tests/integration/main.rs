
mod note;
mod reindex;
mod upload;
