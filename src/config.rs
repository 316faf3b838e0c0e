use std::{path::PathBuf, str::FromStr};

use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::{
    constants::{
        AMOUNT_MAX_VALUE, AMOUNT_MIN_VALUE, COOKING_TIME_MAX_VALUE, COOKING_TIME_MIN_VALUE,
        DB_MAX_CONNECTIONS, RECIPE_COUNT_PER_PAGE,
    },
    error::QueryError,
    jwt::SessionKey,
    payload::Limits,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("{min_key} must not exceed {max_key}")]
    EmptyRange {
        min_key: &'static str,
        max_key: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_url: String,
    pub session_secret: String,
    pub db_max_connections: u32,
    pub limits: Limits,
    pub page_size: i64,
    pub pdf_font_path: Option<PathBuf>,
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<String, ConfigError> {
    lookup(key)
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::Missing(key))
}

impl Settings {
    /// Reads `.env` (when present) and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenv::dotenv() {
            log::debug!("no .env file loaded: {e}");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let amount_min = parse_or(&lookup, "AMOUNT_MIN", AMOUNT_MIN_VALUE)?;
        let amount_max = parse_or(&lookup, "AMOUNT_MAX", AMOUNT_MAX_VALUE)?;
        if amount_min > amount_max {
            return Err(ConfigError::EmptyRange {
                min_key: "AMOUNT_MIN",
                max_key: "AMOUNT_MAX",
            });
        }

        let cooking_min = parse_or(&lookup, "COOKING_TIME_MIN", COOKING_TIME_MIN_VALUE)?;
        let cooking_max = parse_or(&lookup, "COOKING_TIME_MAX", COOKING_TIME_MAX_VALUE)?;
        if cooking_min > cooking_max {
            return Err(ConfigError::EmptyRange {
                min_key: "COOKING_TIME_MIN",
                max_key: "COOKING_TIME_MAX",
            });
        }

        let page_size = parse_or(&lookup, "PAGE_SIZE", RECIPE_COUNT_PER_PAGE)?;
        if page_size < 1 {
            return Err(ConfigError::Invalid {
                key: "PAGE_SIZE",
                value: page_size.to_string(),
            });
        }

        Ok(Self {
            database_url: required(&lookup, "DATABASE_URL")?,
            session_secret: required(&lookup, "SESSION_SECRET")?,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", DB_MAX_CONNECTIONS)?,
            limits: Limits {
                amount: amount_min..=amount_max,
                cooking_time: cooking_min..=cooking_max,
            },
            page_size,
            pdf_font_path: lookup("PDF_FONT_PATH")
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
        })
    }

    pub fn session_key(&self) -> SessionKey {
        SessionKey::new(self.session_secret.as_bytes())
    }

    pub async fn connect(&self) -> Result<Pool<Postgres>, potion::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(self.db_max_connections)
            .connect(&self.database_url)
            .await
            .map_err(QueryError::from)?;

        log::info!(
            "connected to database with up to {} connections",
            self.db_max_connections
        );
        Ok(pool)
    }
}
