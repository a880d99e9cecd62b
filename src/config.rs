use std::env;
use std::path::PathBuf;

/// Runtime configuration read from the environment (after `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: PathBuf,
    /// Remote catalog base URL; the local `data_dir` is used when unset.
    pub catalog_url: Option<String>,
    /// Postgres progress storage; the JSON `progress_file` is used when unset.
    pub database_url: Option<String>,
    pub progress_file: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        let port = match env::var("PORT") {
            Ok(s) => s.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %s, "invalid PORT, using 8081");
                8081
            }),
            Err(_) => 8081,
        };
        let data_dir = PathBuf::from(env::var("DATA_DIR").unwrap_or("./data".into()));
        let progress_file = env::var("PROGRESS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("progress.json"));

        Self {
            port,
            catalog_url: non_empty("CATALOG_URL"),
            database_url: non_empty("DATABASE_URL"),
            data_dir,
            progress_file,
        }
    }

    pub fn media_dir(&self) -> PathBuf {
        self.data_dir.join("media")
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
