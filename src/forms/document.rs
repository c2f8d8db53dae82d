use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::dialog::FormSchema;
use crate::error::{AdminError, ValidationErrors};
use crate::models::{Document, UploadedFile};
use crate::validation;

pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "jpg", "jpeg", "png",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentForm {
    pub title: String,
    pub document_type: String,
    pub description: String,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<u64>,
}

impl DocumentForm {
    /// Points the document at a file the backend already stored.
    pub fn attach(&mut self, file: &UploadedFile) {
        self.file_url = Some(file.url.clone());
        self.file_name = Some(file.original_name.clone());
        self.file_size = Some(file.size);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPayload {
    pub title: String,
    pub document_type: String,
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

impl FormSchema for DocumentForm {
    type Entity = Document;
    type Payload = DocumentPayload;

    fn from_entity(document: &Document) -> Self {
        Self {
            title: document.title.clone(),
            document_type: document.document_type.clone(),
            description: document.description.clone().unwrap_or_default(),
            file_url: document.file_url.clone(),
            file_name: document.file_name.clone(),
            file_size: document.file_size,
        }
    }

    fn validate(&self) -> Result<DocumentPayload, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let title = errors.check("title", validation::required(&self.title));
        if let Some(title) = &title {
            errors.check("title", validation::max_chars(title, 200));
        }
        let document_type = errors.check(
            "documentType",
            validation::required(&self.document_type).map(|t| t.to_uppercase()),
        );

        match (title, document_type) {
            (Some(title), Some(document_type)) if errors.is_empty() => Ok(DocumentPayload {
                title,
                document_type,
                description: validation::optional(&self.description),
                file_url: self.file_url.clone(),
                file_name: self.file_name.clone(),
                file_size: self.file_size,
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub size: u64,
}

/// Files picked for upload, checked before anything is sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSelection {
    pub files: Vec<SelectedFile>,
}

impl UploadSelection {
    /// Reads the size of every file from disk.
    pub async fn inspect(paths: &[PathBuf]) -> Result<Self, AdminError> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let metadata = tokio::fs::metadata(path)
                .await
                .map_err(|e| AdminError::Io(format!("{}: {e}", path.display())))?;
            files.push(SelectedFile {
                path: path.clone(),
                size: metadata.len(),
            });
        }
        Ok(Self { files })
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    pub fn validate(&self, max_bytes: u64) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.files.is_empty() {
            errors.add("files", "select at least one file");
        }
        for file in &self.files {
            let path: &Path = &file.path;
            errors.check("files", validation::allowed_extension(path, ALLOWED_EXTENSIONS));
            errors.check("files", validation::within_size(path, file.size, max_bytes));
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_and_type_are_required() {
        let errors = DocumentForm::default().validate().unwrap_err();
        assert!(errors.has("title"));
        assert!(errors.has("documentType"));
    }

    #[test]
    fn attached_file_travels_in_payload() {
        let mut form = DocumentForm {
            title: "Meeting minutes".to_string(),
            document_type: "report".to_string(),
            ..DocumentForm::default()
        };
        form.attach(&UploadedFile {
            url: "/uploads/minutes.pdf".to_string(),
            original_name: "minutes.pdf".to_string(),
            size: 2048,
        });

        let payload = form.validate().unwrap();
        assert_eq!(payload.document_type, "REPORT");
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["fileUrl"], "/uploads/minutes.pdf");
        assert_eq!(json["fileSize"], 2048);
    }

    #[test]
    fn unattached_payload_omits_file_fields() {
        let form = DocumentForm {
            title: "Notice".to_string(),
            document_type: "NOTICE".to_string(),
            ..DocumentForm::default()
        };
        let json = serde_json::to_value(form.validate().unwrap()).unwrap();
        assert!(json.get("fileUrl").is_none());
    }

    #[test]
    fn selection_rejects_bad_type_and_oversize() {
        let selection = UploadSelection {
            files: vec![
                SelectedFile {
                    path: PathBuf::from("plan.docx"),
                    size: 100,
                },
                SelectedFile {
                    path: PathBuf::from("tool.exe"),
                    size: 100,
                },
                SelectedFile {
                    path: PathBuf::from("scan.png"),
                    size: 20 * 1024 * 1024,
                },
            ],
        };
        let errors = selection.validate(10 * 1024 * 1024).unwrap_err();
        assert_eq!(errors.iter().count(), 2);
        assert!(UploadSelection::default().validate(1).is_err());
    }

    #[tokio::test]
    async fn inspect_reads_sizes() {
        let path = std::env::temp_dir().join(format!("youth-admin-{}.txt", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, b"hello").await.unwrap();

        let selection = UploadSelection::inspect(&[path.clone()]).await.unwrap();
        assert_eq!(selection.total_bytes(), 5);
        assert!(selection.validate(10).is_ok());

        tokio::fs::remove_file(&path).await.unwrap();
        assert!(matches!(
            UploadSelection::inspect(&[path]).await,
            Err(AdminError::Io(_))
        ));
    }
}
