pub mod admin;
pub mod attachment;
pub mod note;
pub mod notebook;
pub mod upload;
