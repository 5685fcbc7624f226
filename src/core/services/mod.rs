pub mod backup_service;
pub mod chunker;
