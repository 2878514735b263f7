//! Document text extraction adapters

mod pdf;

pub use pdf::PdfTextExtractor;
