//! Multipart form reading.
//!
//! Upload forms mix text fields, repeated checkboxes and file inputs. The
//! whole body is read up front into a [`MultipartForm`] so handlers can
//! validate text before touching any file.

use axum::extract::Multipart;

use crate::error::AppError;

/// A file part with content.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Every part of a multipart body, in order.
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    fields: Vec<(String, String)>,
    files: Vec<UploadedFile>,
}

impl MultipartForm {
    /// Read the whole body.
    ///
    /// File inputs left empty still send a part with no file name and no
    /// bytes; those are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::BadRequest`] if the body is malformed or larger
    /// than the upload limit.
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await.map_err(bad_form)?;
                    if !file_name.is_empty() && !bytes.is_empty() {
                        form.files.push(UploadedFile {
                            field: name,
                            file_name,
                            bytes: bytes.to_vec(),
                        });
                    }
                }
                None => {
                    let value = field.text().await.map_err(bad_form)?;
                    form.fields.push((name, value));
                }
            }
        }

        Ok(form)
    }

    /// First value of a text field, trimmed; `None` when absent or blank.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Every non-blank value of a repeated field, in form order.
    #[must_use]
    pub fn all(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
            .collect()
    }

    /// Whether a checkbox was ticked.
    #[must_use]
    pub fn checked(&self, name: &str) -> bool {
        self.text(name).is_some()
    }

    /// Files sent under `name`, in form order.
    #[must_use]
    pub fn files(&self, name: &str) -> Vec<&UploadedFile> {
        self.files.iter().filter(|f| f.field == name).collect()
    }

    /// Consume the form, keeping only the files sent under `name`.
    #[must_use]
    pub fn into_files(self, name: &str) -> Vec<UploadedFile> {
        self.files.into_iter().filter(|f| f.field == name).collect()
    }

    #[cfg(test)]
    pub(crate) fn from_parts(fields: &[(&str, &str)], files: Vec<UploadedFile>) -> Self {
        Self {
            fields: fields
                .iter()
                .map(|(n, v)| ((*n).to_string(), (*v).to_string()))
                .collect(),
            files,
        }
    }
}

fn bad_form(e: axum::extract::multipart::MultipartError) -> AppError {
    tracing::warn!(error = %e, "Rejected multipart body");
    AppError::BadRequest(
        "Não foi possível ler o formulário. Verifique o tamanho dos arquivos.".to_string(),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        body::Body,
        extract::FromRequest,
        http::{Request, header},
    };

    use super::*;

    const BOUNDARY: &str = "XBOUNDARYX";

    fn body(parts: &[(&str, Option<&str>, &str)]) -> String {
        let mut out = String::new();
        for (name, file_name, content) in parts {
            out.push_str(&format!("--{BOUNDARY}\r\n"));
            match file_name {
                Some(file) => out.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )),
                None => out.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
                )),
            }
            out.push_str(content);
            out.push_str("\r\n");
        }
        out.push_str(&format!("--{BOUNDARY}--\r\n"));
        out
    }

    async fn read(parts: &[(&str, Option<&str>, &str)]) -> MultipartForm {
        let request = Request::builder()
            .method("POST")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body(parts)))
            .unwrap();
        let multipart = Multipart::from_request(request, &()).await.unwrap();
        MultipartForm::read(multipart).await.unwrap()
    }

    #[tokio::test]
    async fn test_reads_fields_and_files() {
        let form = read(&[
            ("nome", None, "  Caneta Metal  "),
            ("categorias", None, "Canetas"),
            ("categorias", None, "Escritório"),
            ("destaque", None, "on"),
            ("imagens", Some("frente.png"), "PNGDATA"),
            ("imagens", Some(""), ""),
        ])
        .await;

        assert_eq!(form.text("nome"), Some("Caneta Metal"));
        assert_eq!(form.all("categorias"), vec!["Canetas", "Escritório"]);
        assert!(form.checked("destaque"));
        assert!(!form.checked("popular"));

        let files = form.files("imagens");
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name, "frente.png");
        assert_eq!(files[0].bytes, b"PNGDATA");
    }

    #[test]
    fn test_blank_text_is_absent() {
        let form = MultipartForm::from_parts(&[("descricao", "   ")], Vec::new());
        assert_eq!(form.text("descricao"), None);
        assert!(form.all("descricao").is_empty());
    }
}
