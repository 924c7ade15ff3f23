use platform_db::DatabaseSettings;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseSettings,
    /// Empty means any origin.
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn load() -> Self {
        let database = DatabaseSettings::from_env();
        let cors_allowed_origins =
            parse_origins(&std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default());
        Self {
            database,
            cors_allowed_origins,
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
