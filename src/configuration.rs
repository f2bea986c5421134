use std::time::Duration;

pub trait Configuration: Clone + Send + Sync + 'static {
    fn website_title(&self) -> String;
    fn password(&self) -> String;
    fn port(&self) -> String;
    fn tables_url(&self) -> Option<String>;
    fn tables_key(&self) -> Option<String>;
    fn slot_fetch_delay(&self) -> Duration;
    fn session_idle_timeout(&self) -> Duration;
}
