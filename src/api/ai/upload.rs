//! Multipart form reading for file-based features

use std::collections::HashMap;

use axum::extract::{multipart::MultipartRejection, Multipart};

use crate::api::types::ApiFailure;
use crate::domain::UploadedFile;

/// Files and text fields of one multipart request
#[derive(Debug, Default)]
pub struct UploadForm {
    files: HashMap<String, UploadedFile>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    pub async fn read(multipart: Result<Multipart, MultipartRejection>) -> Result<Self, ApiFailure> {
        let mut multipart = multipart
            .map_err(|e| ApiFailure::validation(format!("Invalid multipart request: {}", e.body_text())))?;
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiFailure::validation(format!("Failed to read multipart field: {}", e.body_text())))?
        {
            let name = field.name().unwrap_or_default().to_string();

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    // Clients do not always send a part content type
                    let content_type = field
                        .content_type()
                        .map(str::to_string)
                        .unwrap_or_else(|| {
                            mime_guess::from_path(&file_name)
                                .first_or_octet_stream()
                                .to_string()
                        });
                    let data = field.bytes().await.map_err(|e| {
                        ApiFailure::validation(format!("Failed to read file '{}': {}", file_name, e.body_text()))
                    })?;

                    form.files
                        .insert(name, UploadedFile::new(file_name, content_type, data));
                }
                None => {
                    let value = field.text().await.map_err(|e| {
                        ApiFailure::validation(format!("Failed to read field '{}': {}", name, e.body_text()))
                    })?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    pub fn take_file(&mut self, name: &str) -> Result<UploadedFile, ApiFailure> {
        self.files
            .remove(name)
            .ok_or_else(|| ApiFailure::validation(format!("No {} file uploaded", name)))
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}
