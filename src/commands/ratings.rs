use clap::Subcommand;

use super::{load, submit, Context, ListArgs};
use crate::api::resources::submissions_path;
use crate::api::ResourceFetcher;
use crate::dialog::MutationDialog;
use crate::error::{AdminError, ValidationErrors};
use crate::forms::{RatingPeriodForm, RatingReviewForm};
use crate::listing::ListViewModel;
use crate::models::{RatingPeriod, SelfRating};
use crate::render;
use crate::stats::{self, Memo};

#[derive(Subcommand, Debug)]
pub enum RatingCommand {
    /// List rating periods
    Periods {
        #[command(flatten)]
        list: ListArgs,
    },
    CreatePeriod {
        #[arg(long)]
        name: String,
        /// `YYYY-MM-DD`
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        /// `name` or `name: description`, repeatable
        #[arg(long = "criterion")]
        criteria: Vec<String>,
    },
    /// Self-rating submissions of one period
    Submissions {
        period: String,
        #[command(flatten)]
        list: ListArgs,
        /// Also print suggested vs final ratings
        #[arg(long)]
        stats: bool,
    },
    /// Approve, reject or send back a submission
    Review {
        period: String,
        submission: String,
        /// APPROVED, REJECTED or NEEDS_REVISION
        #[arg(long)]
        decision: String,
        /// Defaults to the final rating, then the suggested one
        #[arg(long)]
        final_rating: Option<String>,
        #[arg(long)]
        comment: Option<String>,
    },
}

fn submissions(ctx: &Context, period: &str) -> Result<ListViewModel<SelfRating>, AdminError> {
    ctx.list_model::<SelfRating>(ResourceFetcher::at(
        ctx.client.clone(),
        submissions_path(period),
    ))
}

pub async fn run(ctx: &Context, command: RatingCommand) -> Result<(), AdminError> {
    let client = &ctx.client;

    match command {
        RatingCommand::Periods { list: args } => {
            let periods = ctx.list_model::<RatingPeriod>(ResourceFetcher::new(client.clone()))?;
            load(&periods, &args).await?;
            println!("{}", render::list_page("Rating periods", &periods.view()));
        }
        RatingCommand::CreatePeriod {
            name,
            start,
            end,
            criteria,
        } => {
            let periods = ctx.list_model::<RatingPeriod>(ResourceFetcher::new(client.clone()))?;
            let mut dialog = MutationDialog::<RatingPeriodForm>::new();
            dialog.open_create();
            if let Some(form) = dialog.form_mut() {
                form.name = name;
                form.start_date = start;
                form.end_date = end;
                form.criteria = criteria.join("\n");
            }
            let created = submit(client, &periods, &mut dialog).await?;
            println!(
                "Created rating period {} ({}, {} to {})",
                created.name, created.id, created.start_date, created.end_date
            );
        }
        RatingCommand::Submissions {
            period,
            list: args,
            stats,
        } => {
            let list = submissions(ctx, &period)?;
            load(&list, &args).await?;
            println!("{}", render::list_page("Self-ratings", &list.view()));
            if stats {
                let distribution = Memo::new().over(&list, stats::rating_distribution);
                println!("{}", render::rating_panel(&distribution));
            }
        }
        RatingCommand::Review {
            period,
            submission,
            decision,
            final_rating,
            comment,
        } => {
            let list = submissions(ctx, &period)?;
            list.refresh().await?;
            let current = list.find(|s| s.id == submission).ok_or_else(|| {
                AdminError::Validation(ValidationErrors::single(
                    "submission",
                    format!("no submission with id {submission} in period {period}"),
                ))
            })?;

            let mut dialog = MutationDialog::<RatingReviewForm>::new();
            dialog.open_edit(&submission, &current);
            if let Some(form) = dialog.form_mut() {
                form.decision = decision;
                if let Some(rating) = final_rating {
                    form.final_rating = rating;
                }
                if let Some(comment) = comment {
                    form.admin_comment = comment;
                }
            }
            let id = &submission;
            let reviewed = dialog
                .submit_and_refresh(&list, |_, payload| async move {
                    client.review_submission(id, &payload).await
                })
                .await?;
            println!(
                "{} is {}{}",
                reviewed.full_name.as_deref().unwrap_or(&reviewed.user_id),
                reviewed.status,
                reviewed
                    .final_rating
                    .map(|r| format!(", final rating {r}"))
                    .unwrap_or_default()
            );
        }
    }
    Ok(())
}
