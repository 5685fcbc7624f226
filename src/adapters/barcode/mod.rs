pub mod native_backend;
pub mod qrencode_backend;
