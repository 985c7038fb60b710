pub mod evaluate;
pub mod import;
pub mod init;
pub mod list_models;
pub mod train;
pub mod words;
