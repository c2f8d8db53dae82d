use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::{Args, Subcommand};

use super::{cached, load, set, submit, Context, ListArgs};
use crate::api::ResourceFetcher;
use crate::dialog::{mutate_and_refresh, FormSchema, MutationDialog};
use crate::error::{AdminError, ValidationErrors};
use crate::forms::ExamForm;
use crate::models::Exam;
use crate::render;
use crate::stats::{self, Memo};

#[derive(Subcommand, Debug)]
pub enum ExamCommand {
    /// List exams
    List {
        #[command(flatten)]
        list: ListArgs,
        /// Also print question and point totals
        #[arg(long)]
        stats: bool,
    },
    Show {
        id: String,
    },
    Create {
        #[command(flatten)]
        fields: ExamFields,
        #[command(flatten)]
        questions: QuestionEdits,
    },
    /// Edit an exam; question edits apply as removals, then moves, then imports
    Update {
        id: String,
        #[command(flatten)]
        fields: ExamFields,
        #[command(flatten)]
        questions: QuestionEdits,
    },
    Delete {
        id: String,
    },
    /// Write the questions of an exam as CSV
    Export {
        id: String,
        /// Output file, stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default)]
pub struct ExamFields {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    description: Option<String>,
    /// Minutes
    #[arg(long)]
    duration: Option<String>,
    /// Percentage needed to pass
    #[arg(long)]
    passing_score: Option<String>,
    #[arg(long)]
    max_attempts: Option<String>,
    #[arg(long)]
    active: Option<bool>,
}

impl ExamFields {
    fn apply(self, form: &mut ExamForm) {
        set(&mut form.title, self.title);
        set(&mut form.description, self.description);
        set(&mut form.duration, self.duration);
        set(&mut form.passing_score, self.passing_score);
        set(&mut form.max_attempts, self.max_attempts);
        if let Some(active) = self.active {
            form.is_active = active;
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct QuestionEdits {
    /// Append questions from a CSV file
    /// (`content,optionA,optionB,optionC,optionD,correctAnswer,points`)
    #[arg(long)]
    questions_csv: Option<PathBuf>,
    /// Remove the question at this position (1-based, repeatable)
    #[arg(long = "remove-question")]
    remove: Vec<usize>,
    /// Move a question, `FROM:TO` (1-based, repeatable)
    #[arg(long = "move-question")]
    moves: Vec<QuestionMove>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionMove {
    from: usize,
    to: usize,
}

impl FromStr for QuestionMove {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (from, to) = s
            .split_once(':')
            .ok_or_else(|| format!("`{s}` is not FROM:TO"))?;
        let position = |raw: &str| match raw.trim().parse::<usize>() {
            Ok(n) if n >= 1 => Ok(n),
            _ => Err(format!("`{raw}` is not a question position")),
        };
        Ok(Self {
            from: position(from)?,
            to: position(to)?,
        })
    }
}

impl QuestionEdits {
    async fn apply(self, form: &mut ExamForm) -> Result<(), AdminError> {
        let mut errors = ValidationErrors::new();

        let mut remove = self.remove;
        remove.sort_unstable_by(|a, b| b.cmp(a));
        remove.dedup();
        for position in remove {
            if position == 0 || form.remove_question(position - 1).is_none() {
                errors.add("questions", format!("no question at position {position}"));
            }
        }
        for QuestionMove { from, to } in self.moves {
            if !form.move_question(from - 1, to - 1) {
                errors.add("questions", format!("cannot move question {from} to {to}"));
            }
        }
        errors.into_result()?;

        if let Some(path) = self.questions_csv {
            let imported = import(form, &path).await?;
            tracing::info!(imported, file = %path.display(), "questions imported");
        }
        Ok(())
    }
}

async fn import(form: &mut ExamForm, path: &Path) -> Result<usize, AdminError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| AdminError::Io(format!("{}: {e}", path.display())))?;
    form.import_csv(bytes.as_slice())
}

pub async fn run(ctx: &Context, command: ExamCommand) -> Result<(), AdminError> {
    let client = &ctx.client;
    let list = ctx.list_model::<Exam>(ResourceFetcher::new(client.clone()))?;

    match command {
        ExamCommand::List { list: args, stats } => {
            load(&list, &args).await?;
            println!("{}", render::list_page("Exams", &list.view()));
            if stats {
                let totals = Memo::new().over(&list, stats::exam_totals);
                println!("{}", render::exam_panel(&totals));
            }
        }
        ExamCommand::Show { id } => {
            let exam = client.get::<Exam>(&id).await?;
            println!("{}", render::exam_detail(&exam));
        }
        ExamCommand::Create { fields, questions } => {
            let mut dialog = MutationDialog::<ExamForm>::new();
            dialog.open_create();
            if let Some(form) = dialog.form_mut() {
                fields.apply(form);
                questions.apply(form).await?;
            }
            let created = submit(client, &list, &mut dialog).await?;
            println!("Created exam {}", created.id);
            println!("{}", render::exam_detail(&created));
        }
        ExamCommand::Update {
            id,
            fields,
            questions,
        } => {
            list.refresh().await?;
            let existing = cached(&list, &id)?;
            let mut dialog = MutationDialog::<ExamForm>::new();
            dialog.open_edit(&id, &existing);
            if let Some(form) = dialog.form_mut() {
                fields.apply(form);
                questions.apply(form).await?;
            }
            let updated = submit(client, &list, &mut dialog).await?;
            println!("{}", render::exam_detail(&updated));
        }
        ExamCommand::Delete { id } => {
            list.refresh().await?;
            let existing = cached(&list, &id)?;
            mutate_and_refresh(&list, client.delete::<Exam>(&id)).await?;
            println!("Deleted exam {} ({})", existing.id, existing.title);
        }
        ExamCommand::Export { id, out } => {
            let exam = client.get::<Exam>(&id).await?;
            let mut buffer = Vec::new();
            ExamForm::from_entity(&exam).export_csv(&mut buffer)?;
            match out {
                Some(path) => {
                    tokio::fs::write(&path, &buffer)
                        .await
                        .map_err(|e| AdminError::Io(format!("{}: {e}", path.display())))?;
                    println!(
                        "Wrote {} questions to {}",
                        exam.questions.len(),
                        path.display()
                    );
                }
                None => print!("{}", String::from_utf8_lossy(&buffer)),
            }
        }
    }
    Ok(())
}
