//! Helpers shared by the unit tests.

use clap::Parser;

use crate::api::ApiClient;
use crate::commands::Context;
use crate::config::Settings;
use crate::session::Session;

/// Serves `app` on an ephemeral local port and returns its base URL.
pub async fn spawn_backend(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Default settings with the search debounce switched off.
pub fn settings() -> Settings {
    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        settings: Settings,
    }
    Harness::parse_from(["youth-admin", "--debounce-ms", "0"]).settings
}

/// A signed-in command context talking to `url`.
pub fn context(url: &str) -> Context {
    let session = Session::in_memory(Some("token".to_string()));
    Context {
        client: ApiClient::new(url, session).unwrap(),
        settings: settings(),
    }
}
