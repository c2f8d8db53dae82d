use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Subcommand};

use super::{cached, load, set, submit, Context, ListArgs};
use crate::api::upload::DOCUMENT_UPLOAD_PATH;
use crate::api::{ProgressFn, ResourceFetcher, UploadProgress};
use crate::dialog::{mutate_and_refresh, MutationDialog};
use crate::error::{AdminError, ValidationErrors};
use crate::forms::{DocumentForm, UploadSelection};
use crate::listing::ListViewModel;
use crate::models::{Document, DocumentStatus, UploadedFile};
use crate::render;
use crate::stats::{self, Memo};

#[derive(Subcommand, Debug)]
pub enum DocumentCommand {
    /// List documents
    List {
        #[command(flatten)]
        list: ListArgs,
        /// Also print view and download totals
        #[arg(long)]
        stats: bool,
    },
    Show {
        id: String,
    },
    Create {
        #[command(flatten)]
        fields: DocumentFields,
        /// Upload this file and attach it to the new document
        #[arg(long)]
        file: Option<PathBuf>,
        /// Send the notification once the document exists
        #[arg(long)]
        notify: bool,
    },
    Update {
        id: String,
        #[command(flatten)]
        fields: DocumentFields,
        /// Replace the attached file
        #[arg(long)]
        file: Option<PathBuf>,
    },
    Delete {
        id: String,
    },
    /// Publish, archive or expire a document
    Status {
        id: String,
        status: DocumentStatus,
    },
    /// Upload files without creating a document
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Send the document notification (once per document)
    Notify {
        id: String,
    },
}

#[derive(Args, Debug, Default)]
pub struct DocumentFields {
    #[arg(long)]
    title: Option<String>,
    #[arg(long = "type")]
    document_type: Option<String>,
    #[arg(long)]
    description: Option<String>,
}

impl DocumentFields {
    fn apply(self, form: &mut DocumentForm) {
        set(&mut form.title, self.title);
        set(&mut form.document_type, self.document_type);
        set(&mut form.description, self.description);
    }
}

pub async fn run(ctx: &Context, command: DocumentCommand) -> Result<(), AdminError> {
    let client = &ctx.client;
    let list = ctx.list_model::<Document>(ResourceFetcher::new(client.clone()))?;

    match command {
        DocumentCommand::List { list: args, stats } => {
            load(&list, &args).await?;
            println!("{}", render::list_page("Documents", &list.view()));
            if stats {
                let totals = Memo::new().over(&list, stats::document_totals);
                println!("{}", render::document_panel(&totals));
            }
        }
        DocumentCommand::Show { id } => {
            let document = client.get::<Document>(&id).await?;
            println!("{}", render::document_detail(&document));
        }
        DocumentCommand::Create {
            fields,
            file,
            notify,
        } => {
            let mut dialog = MutationDialog::<DocumentForm>::new();
            dialog.open_create();
            if let Some(form) = dialog.form_mut() {
                fields.apply(form);
            }
            let created = submit(client, &list, &mut dialog).await?;
            println!("Created document {} ({})", created.title, created.id);

            if created.id.is_empty() {
                if file.is_some() || notify {
                    tracing::warn!(
                        title = %created.title,
                        "create response carried no id, skipping attach and notify"
                    );
                }
                return Ok(());
            }

            let document = match file {
                Some(path) => attach(ctx, &list, &created, path).await?,
                None => created,
            };
            if notify {
                let sent = send_notification(ctx, &list, &document).await?;
                println!("Notification sent for {}", sent.title);
            }
        }
        DocumentCommand::Update { id, fields, file } => {
            list.refresh().await?;
            let existing = cached(&list, &id)?;
            let mut dialog = MutationDialog::<DocumentForm>::new();
            dialog.open_edit(&id, &existing);
            if let Some(form) = dialog.form_mut() {
                fields.apply(form);
            }
            if let Some(path) = file {
                let stored = upload_files(ctx, &[path]).await?;
                if let (Some(form), Some(stored)) = (dialog.form_mut(), stored.first()) {
                    form.attach(stored);
                }
            }
            let updated = submit(client, &list, &mut dialog).await?;
            println!("{}", render::document_detail(&updated));
        }
        DocumentCommand::Delete { id } => {
            list.refresh().await?;
            let existing = cached(&list, &id)?;
            mutate_and_refresh(&list, client.delete::<Document>(&id)).await?;
            println!("Deleted document {} ({})", existing.id, existing.title);
        }
        DocumentCommand::Status { id, status } => {
            list.refresh().await?;
            let existing = cached(&list, &id)?;
            if existing.status == status {
                return Err(AdminError::Validation(ValidationErrors::single(
                    "status",
                    format!("document is already {status}"),
                )));
            }
            let updated =
                mutate_and_refresh(&list, client.change_document_status(&id, status)).await?;
            println!("{} is now {}", updated.title, updated.status);
        }
        DocumentCommand::Upload { files } => {
            let stored = upload_files(ctx, &files).await?;
            let rows: Vec<Vec<String>> = stored
                .iter()
                .map(|f| vec![f.original_name.clone(), f.size.to_string(), f.url.clone()])
                .collect();
            println!("{}", render::table(&["FILE", "BYTES", "URL"], &rows));
        }
        DocumentCommand::Notify { id } => {
            list.refresh().await?;
            let existing = cached(&list, &id)?;
            let sent = send_notification(ctx, &list, &existing).await?;
            println!("Notification sent for {}", sent.title);
        }
    }
    Ok(())
}

/// Checks the selection locally, then uploads it with progress on stderr.
async fn upload_files(ctx: &Context, paths: &[PathBuf]) -> Result<Vec<UploadedFile>, AdminError> {
    let selection = UploadSelection::inspect(paths).await?;
    selection.validate(ctx.settings.max_upload_bytes())?;
    tracing::info!(
        files = selection.files.len(),
        bytes = selection.total_bytes(),
        "uploading"
    );

    let progress: ProgressFn = Arc::new(|p: UploadProgress| eprint!("\ruploading {:>3}%", p.percent()));
    let stored = ctx
        .client
        .upload(DOCUMENT_UPLOAD_PATH, &selection.paths(), progress)
        .await;
    eprintln!();
    stored
}

async fn attach(
    ctx: &Context,
    list: &ListViewModel<Document>,
    document: &Document,
    path: PathBuf,
) -> Result<Document, AdminError> {
    let stored = upload_files(ctx, &[path]).await?;
    let Some(file) = stored.first() else {
        tracing::warn!(id = %document.id, "upload returned no files, nothing to attach");
        return Ok(document.clone());
    };

    let mut dialog = MutationDialog::<DocumentForm>::new();
    dialog.open_edit(&document.id, document);
    if let Some(form) = dialog.form_mut() {
        form.attach(file);
    }
    let updated = submit(&ctx.client, list, &mut dialog).await?;
    println!("Attached {} to {}", file.original_name, updated.title);
    Ok(updated)
}

fn ensure_not_notified(document: &Document) -> Result<(), AdminError> {
    if document.notification_sent {
        return Err(AdminError::Validation(ValidationErrors::single(
            "notification",
            format!("already sent for {}", document.title),
        )));
    }
    Ok(())
}

async fn send_notification(
    ctx: &Context,
    list: &ListViewModel<Document>,
    document: &Document,
) -> Result<Document, AdminError> {
    ensure_not_notified(document)?;
    mutate_and_refresh(list, ctx.client.send_document_notification(&document.id)).await
}
