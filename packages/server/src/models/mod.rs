pub mod attachment;
pub mod note;
pub mod notebook;
