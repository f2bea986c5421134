use crate::configuration::Configuration;
use clap::Parser;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "school_portal", about = "Parent portal and meeting scheduler service")]
pub struct ConfigurationHandler {
    /// Title shown on the portal pages
    #[arg(long, env = "PORTAL_TITLE", default_value = "School Portal")]
    website_title: String,

    /// Password expected in the x-admin-password header of admin routes
    #[arg(long, env = "ADMIN_PASSWORD")]
    password: String,

    #[arg(long, env = "PORTAL_PORT", default_value = "3000")]
    port: String,

    /// Base URL of the hosted table API. Bundled data is served when absent.
    #[arg(long, env = "TABLES_URL", requires = "tables_key")]
    tables_url: Option<String>,

    #[arg(long, env = "TABLES_KEY")]
    tables_key: Option<String>,

    /// Simulated latency of the class teacher's calendar in milliseconds
    #[arg(long, env = "SLOT_FETCH_DELAY_MS", default_value_t = 600)]
    slot_fetch_delay_ms: u64,

    /// Scheduler sessions unused for this many seconds are discarded
    #[arg(long, env = "SESSION_IDLE_SECS", default_value_t = 1800)]
    session_idle_secs: u64,
}

impl ConfigurationHandler {
    pub fn parse_arguments() -> Self {
        if let Err(err) = dotenvy::dotenv() {
            tracing::debug!(?err, "No .env file loaded");
        }
        Self::parse()
    }
}

impl Configuration for ConfigurationHandler {
    fn website_title(&self) -> String {
        self.website_title.clone()
    }

    fn password(&self) -> String {
        self.password.clone()
    }

    fn port(&self) -> String {
        self.port.clone()
    }

    fn tables_url(&self) -> Option<String> {
        self.tables_url.clone()
    }

    fn tables_key(&self) -> Option<String> {
        self.tables_key.clone()
    }

    fn slot_fetch_delay(&self) -> Duration {
        Duration::from_millis(self.slot_fetch_delay_ms)
    }

    fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }
}
