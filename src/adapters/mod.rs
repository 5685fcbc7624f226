pub mod barcode;
pub mod cipher;
pub mod document;
