use clap::{Args, Subcommand};

use super::{cached, load, set, submit, Context, ListArgs};
use crate::api::ResourceFetcher;
use crate::dialog::{mutate_and_refresh, MutationDialog};
use crate::error::{AdminError, ValidationErrors};
use crate::forms::SurveyForm;
use crate::listing::ListViewModel;
use crate::models::{Survey, SurveyStatus};
use crate::render;
use crate::stats;

#[derive(Subcommand, Debug)]
pub enum SurveyCommand {
    List {
        #[command(flatten)]
        list: ListArgs,
    },
    Show {
        id: String,
    },
    Create(SurveyFields),
    /// Edit a survey; `--question` appends to the existing questions
    Update {
        id: String,
        #[command(flatten)]
        fields: SurveyFields,
        /// Drop the existing questions first
        #[arg(long)]
        replace_questions: bool,
    },
    Delete {
        id: String,
    },
    /// Start collecting responses
    Open {
        id: String,
    },
    /// Stop collecting responses
    Close {
        id: String,
    },
    /// Per-question answer tallies
    Responses {
        id: String,
    },
}

#[derive(Args, Debug, Default)]
pub struct SurveyFields {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    description: Option<String>,
    /// `YYYY-MM-DD HH:MM` (UTC) or RFC 3339
    #[arg(long)]
    end_date: Option<String>,
    /// `[*]TYPE|content[|opt1;opt2]`, `*` marks it required; repeatable
    #[arg(long = "question")]
    questions: Vec<String>,
}

impl SurveyFields {
    fn apply(self, form: &mut SurveyForm) -> Result<(), AdminError> {
        set(&mut form.title, self.title);
        set(&mut form.description, self.description);
        set(&mut form.end_date, self.end_date);

        let mut errors = ValidationErrors::new();
        for line in &self.questions {
            errors.check("questions", form.add_question(line));
        }
        errors.into_result()?;
        Ok(())
    }
}

fn check_status(survey: &Survey, next: SurveyStatus) -> Result<(), AdminError> {
    let allowed = match next {
        SurveyStatus::Active => survey.status != SurveyStatus::Active,
        SurveyStatus::Closed => survey.status == SurveyStatus::Active,
        SurveyStatus::Draft => false,
    };
    if !allowed {
        return Err(AdminError::Validation(ValidationErrors::single(
            "status",
            format!("survey is {}, cannot move to {next}", survey.status),
        )));
    }
    Ok(())
}

pub async fn run(ctx: &Context, command: SurveyCommand) -> Result<(), AdminError> {
    let client = &ctx.client;
    let list = ctx.list_model::<Survey>(ResourceFetcher::new(client.clone()))?;

    match command {
        SurveyCommand::List { list: args } => {
            load(&list, &args).await?;
            println!("{}", render::list_page("Surveys", &list.view()));
        }
        SurveyCommand::Show { id } => {
            let survey = client.get::<Survey>(&id).await?;
            println!("{}", render::survey_detail(&survey));
        }
        SurveyCommand::Create(fields) => {
            let mut dialog = MutationDialog::<SurveyForm>::new();
            dialog.open_create();
            if let Some(form) = dialog.form_mut() {
                fields.apply(form)?;
            }
            let created = submit(client, &list, &mut dialog).await?;
            println!("Created survey {}", created.id);
            println!("{}", render::survey_detail(&created));
        }
        SurveyCommand::Update {
            id,
            fields,
            replace_questions,
        } => {
            list.refresh().await?;
            let existing = cached(&list, &id)?;
            let mut dialog = MutationDialog::<SurveyForm>::new();
            dialog.open_edit(&id, &existing);
            if let Some(form) = dialog.form_mut() {
                if replace_questions {
                    form.questions.clear();
                }
                fields.apply(form)?;
            }
            let updated = submit(client, &list, &mut dialog).await?;
            println!("{}", render::survey_detail(&updated));
        }
        SurveyCommand::Delete { id } => {
            list.refresh().await?;
            let existing = cached(&list, &id)?;
            mutate_and_refresh(&list, client.delete::<Survey>(&id)).await?;
            println!("Deleted survey {} ({})", existing.id, existing.title);
        }
        SurveyCommand::Open { id } => change_status(ctx, &list, &id, SurveyStatus::Active).await?,
        SurveyCommand::Close { id } => change_status(ctx, &list, &id, SurveyStatus::Closed).await?,
        SurveyCommand::Responses { id } => {
            let (survey, responses) =
                tokio::try_join!(client.get::<Survey>(&id), client.survey_responses(&id))?;
            let tallies = stats::survey_tallies(&survey, &responses);
            println!("{}", render::survey_panel(&survey, &tallies));
        }
    }
    Ok(())
}

async fn change_status(
    ctx: &Context,
    list: &ListViewModel<Survey>,
    id: &str,
    next: SurveyStatus,
) -> Result<(), AdminError> {
    list.refresh().await?;
    let existing = cached(list, id)?;
    check_status(&existing, next)?;
    let updated = mutate_and_refresh(list, ctx.client.change_survey_status(id, next)).await?;
    println!("{} is now {}", updated.title, updated.status);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn survey(status: SurveyStatus) -> Survey {
        Survey {
            id: "s1".to_string(),
            title: "Camp feedback".to_string(),
            description: None,
            status,
            questions: Vec::new(),
            response_count: 0,
            end_date: None,
        }
    }

    #[test]
    fn open_and_close_follow_the_current_status() {
        assert!(check_status(&survey(SurveyStatus::Draft), SurveyStatus::Active).is_ok());
        assert!(check_status(&survey(SurveyStatus::Closed), SurveyStatus::Active).is_ok());
        assert!(check_status(&survey(SurveyStatus::Active), SurveyStatus::Closed).is_ok());

        assert!(check_status(&survey(SurveyStatus::Draft), SurveyStatus::Closed).is_err());
        assert!(check_status(&survey(SurveyStatus::Active), SurveyStatus::Active).is_err());
    }

    #[test]
    fn every_bad_question_is_reported() {
        let mut form = SurveyForm::default();
        let err = SurveyFields {
            title: Some("Camp feedback".to_string()),
            questions: vec![
                "*rating|How was the food?".to_string(),
                "essay|Tell us more".to_string(),
                "single_choice|".to_string(),
            ],
            ..SurveyFields::default()
        }
        .apply(&mut form)
        .unwrap_err();

        let AdminError::Validation(errors) = err else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.iter().count(), 2);
        assert_eq!(form.questions.len(), 1);
        assert!(form.questions[0].required);
    }
}
