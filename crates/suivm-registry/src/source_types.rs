pub const DEFAULT_RELEASES_API_URL: &str = "https://api.github.com/repos/MystenLabs/sui/releases";
pub const DEFAULT_USER_AGENT: &str = concat!("suivm/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSourceConfig {
    pub api_url: String,
    pub max_pages: u32,
    pub user_agent: String,
}

impl Default for ReleaseSourceConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_RELEASES_API_URL.to_string(),
            max_pages: 1,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}
