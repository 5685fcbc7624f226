pub mod age_backend;
pub mod gpg_backend;
