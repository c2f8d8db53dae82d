use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::session::TokenStore;
use crate::stats::RankThresholds;

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
pub const DEFAULT_RANK_THRESHOLDS: &str = "excellent=800,good=600,average=400,poor=200";

/// Global options, each with an environment fallback. `.env` is loaded
/// before parsing so it can supply any of them.
#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Backend base URL; requests go to `{api_url}/api/...`
    #[arg(long, env = "YOUTH_ADMIN_API_URL", default_value = DEFAULT_API_URL, global = true)]
    pub api_url: String,

    /// File holding the session token between runs
    #[arg(
        long,
        env = "YOUTH_ADMIN_TOKEN_FILE",
        default_value = ".youth-admin-token",
        global = true
    )]
    pub token_file: PathBuf,

    /// Rows per page on list screens
    #[arg(
        long,
        env = "YOUTH_ADMIN_PAGE_SIZE",
        default_value_t = 10,
        value_parser = parse_page_size,
        global = true
    )]
    pub page_size: usize,

    /// Delay before a search term takes effect
    #[arg(long, default_value_t = 300, global = true)]
    pub debounce_ms: u64,

    /// Rank tiers as `label=points` pairs
    #[arg(
        long,
        env = "YOUTH_ADMIN_RANK_THRESHOLDS",
        default_value = DEFAULT_RANK_THRESHOLDS,
        global = true
    )]
    pub rank_thresholds: RankThresholds,

    /// Largest accepted upload, per file
    #[arg(long, default_value_t = 10, global = true)]
    pub max_upload_mb: u64,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

fn parse_page_size(raw: &str) -> Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err("page size must be greater than 0".to_string()),
        Ok(size) => Ok(size),
        Err(_) => Err(format!("`{raw}` is not a page size")),
    }
}

impl Settings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }

    pub fn token_store(&self) -> TokenStore {
        TokenStore::new(&self.token_file)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        settings: Settings,
    }

    fn parse(args: &[&str]) -> Result<Settings, clap::Error> {
        let argv = std::iter::once("youth-admin").chain(args.iter().copied());
        Harness::try_parse_from(argv).map(|h| h.settings)
    }

    #[test]
    fn defaults_apply() {
        let settings = parse(&[]).unwrap();
        assert_eq!(settings.page_size, 10);
        assert_eq!(settings.debounce(), Duration::from_millis(300));
        assert_eq!(settings.max_upload_bytes(), 10 * 1024 * 1024);
        assert_eq!(settings.rank_thresholds, RankThresholds::default());
    }

    #[test]
    fn zero_page_size_is_rejected() {
        assert!(parse(&["--page-size", "0"]).is_err());
        assert_eq!(parse(&["--page-size", "25"]).unwrap().page_size, 25);
    }

    #[test]
    fn custom_thresholds_parse() {
        let settings = parse(&["--rank-thresholds", "gold=500,silver=250"]).unwrap();
        assert_eq!(settings.rank_thresholds.rank_for(300), Some("silver"));
        assert!(parse(&["--rank-thresholds", "gold"]).is_err());
    }
}
