use clap::Subcommand;

use super::{load, Context, ListArgs};
use crate::api::ResourceFetcher;
use crate::error::AdminError;
use crate::models::User;
use crate::render;

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// List users; search is answered by the backend
    List {
        #[command(flatten)]
        list: ListArgs,
    },
    /// Profile with participation history
    Show { id: String },
}

pub async fn run(ctx: &Context, command: UserCommand) -> Result<(), AdminError> {
    let client = &ctx.client;

    match command {
        UserCommand::List { list: args } => {
            let list = ctx.list_model::<User>(ResourceFetcher::new(client.clone()))?;
            load(&list, &args).await?;
            println!("{}", render::list_page("Users", &list.view()));
        }
        UserCommand::Show { id } => {
            let (user, history) =
                tokio::try_join!(client.get::<User>(&id), client.user_activities(&id))?;
            println!("{}", render::user_profile(&user, &history));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;
    use crate::testing::{context, spawn_backend};

    #[tokio::test]
    async fn profile_fails_as_a_whole_when_history_fails() {
        let app = Router::new()
            .route(
                "/api/users/:id",
                get(|| async {
                    Json(json!({"success": true, "data": {
                        "id": "u1", "username": "lan", "fullName": "Lan Pham", "isActive": true
                    }}))
                }),
            )
            .route(
                "/api/users/:id/activities",
                get(|| async {
                    (
                        axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({"success": false, "error": "history unavailable"})),
                    )
                }),
            );
        let url = spawn_backend(app).await;
        let ctx = context(&url);

        let err = run(&ctx, UserCommand::Show { id: "u1".to_string() })
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::Server { status: 500, .. }));
        assert_eq!(err.to_string(), "history unavailable");
    }
}
