pub mod pdf_renderer;
