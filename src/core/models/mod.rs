pub mod backup_request;
pub mod chunk;
pub mod document;
pub mod payload;
