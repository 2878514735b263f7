//! Image generation and CDN adapters

mod clipdrop;
mod cloudinary;

pub use clipdrop::{ClipdropImageGenerator, DEFAULT_CLIPDROP_BASE_URL};
pub use cloudinary::{sign, CloudinaryCredentials, CloudinaryMediaStore, DEFAULT_CLOUDINARY_API_URL};
