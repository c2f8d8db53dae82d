use clap::Subcommand;

use super::{load, Context, ListArgs};
use crate::api::resources::LEADERBOARD_PATH;
use crate::api::ResourceFetcher;
use crate::dialog::MutationDialog;
use crate::error::{AdminError, ValidationErrors};
use crate::forms::PointsAdjustmentForm;
use crate::listing::ListViewModel;
use crate::models::Member;
use crate::render;
use crate::stats::{self, Memo};

#[derive(Subcommand, Debug)]
pub enum PointsCommand {
    /// Members ranked by points
    Leaderboard {
        /// Name search
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        unit: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Also print the rank distribution
        #[arg(long)]
        stats: bool,
    },
    /// Credit or debit a member's points
    Adjust {
        member: String,
        /// Signed amount, e.g. `-20`
        #[arg(allow_hyphen_values = true)]
        points: String,
        #[arg(long)]
        reason: String,
    },
}

fn leaderboard(ctx: &Context) -> Result<ListViewModel<Member>, AdminError> {
    ctx.list_model::<Member>(ResourceFetcher::at(ctx.client.clone(), LEADERBOARD_PATH))
}

pub async fn run(ctx: &Context, command: PointsCommand) -> Result<(), AdminError> {
    let list = leaderboard(ctx)?;
    let thresholds = &ctx.settings.rank_thresholds;

    match command {
        PointsCommand::Leaderboard {
            search,
            unit,
            page,
            stats,
        } => {
            let args = ListArgs {
                search,
                status: unit,
                page,
            };
            load(&list, &args).await?;
            println!("{}", render::leaderboard_page(&list.view(), thresholds));
            if stats {
                let (distribution, summary) = Memo::new().over(&list, |members| {
                    (
                        stats::rank_distribution(members, thresholds),
                        stats::points_summary(members),
                    )
                });
                println!("{}", render::rank_panel(&distribution, &summary));
            }
        }
        PointsCommand::Adjust {
            member,
            points,
            reason,
        } => {
            list.refresh().await?;
            let current = list.find(|m| m.id == member).ok_or_else(|| {
                AdminError::Validation(ValidationErrors::single(
                    "memberId",
                    format!("no member with id {member} on the leaderboard"),
                ))
            })?;

            let mut dialog = MutationDialog::<PointsAdjustmentForm>::new();
            dialog.open_edit(&member, &current);
            if let Some(form) = dialog.form_mut() {
                form.points = points;
                form.reason = reason;
            }
            let client = &ctx.client;
            let updated = dialog
                .submit_and_refresh(&list, |_, payload| async move {
                    client.adjust_points(&payload).await
                })
                .await?;
            println!(
                "{} now has {} points ({})",
                updated.full_name,
                updated.points,
                thresholds.rank_for(updated.points).unwrap_or(stats::UNRANKED)
            );
        }
    }
    Ok(())
}
