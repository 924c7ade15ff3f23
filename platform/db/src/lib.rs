//! Database primitives shared by every product crate: connection settings,
//! the [`DbError`] taxonomy and the generic repository.

mod repositorio;

pub use repositorio::{
    Columna, Consulta, Entidad, Guardado, Modelo, ModeloActivo, Registro, Repositorio,
    RepositorioSeaOrm,
};

use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, SqlErr};
use thiserror::Error;
use tracing::info;

/// Shared connection pool alias.
pub type DbPool = DatabaseConnection;

/// Used when `DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";

const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Idle and lifetime limit for the connection holding an in-memory database.
const IN_MEMORY_KEEPALIVE: Duration = Duration::from_secs(60 * 60 * 24 * 365);

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database url missing")]
    MissingUrl,
    /// The store refused a write: missing required value or dangling foreign key.
    #[error("write rejected: {0}")]
    Rejected(String),
    #[error("duplicate record: {0}")]
    Duplicate(String),
    #[error(transparent)]
    Orm(DbErr),
}

pub type DbResult<T> = Result<T, DbError>;

impl From<DbErr> for DbError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => return Self::Duplicate(detail),
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => return Self::Rejected(detail),
            _ => {}
        }
        // SQLite primary-key and NOT NULL failures are not classified by `sql_err`.
        let message = err.to_string();
        let lowered = message.to_lowercase();
        if lowered.contains("unique constraint") || lowered.contains("duplicate key") {
            Self::Duplicate(message)
        } else if lowered.contains("not null constraint")
            || lowered.contains("not-null constraint")
            || lowered.contains("foreign key constraint")
        {
            Self::Rejected(message)
        } else {
            Self::Orm(err)
        }
    }
}

/// Environment-driven connection settings.
#[derive(Clone, Debug)]
pub struct DatabaseSettings {
    url: String,
    max_connections: u32,
    sql_logging: bool,
}

impl DatabaseSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            sql_logging: false,
        }
    }

    /// Reads `DATABASE_URL`, `DATABASE_MAX_CONNECTIONS` and `DATABASE_SQL_LOGGING`.
    pub fn from_env() -> Self {
        let url = std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.into());
        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);
        let sql_logging = std::env::var("DATABASE_SQL_LOGGING")
            .ok()
            .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        Self {
            url,
            max_connections,
            sql_logging,
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn database_url(&self) -> DbResult<&str> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(DbError::MissingUrl);
        }
        Ok(url)
    }

    /// An in-memory database starts empty on every process start.
    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:")
    }

    fn pool_size(&self) -> u32 {
        if self.is_in_memory() {
            1
        } else {
            self.max_connections.max(1)
        }
    }

    /// Pool options for [`connect`].
    ///
    /// An in-memory SQLite database only exists while a connection to it is
    /// open, so that single connection is never reaped for idling or age.
    pub fn connect_options(&self) -> DbResult<ConnectOptions> {
        let mut options = ConnectOptions::new(self.database_url()?.to_owned());
        options
            .max_connections(self.pool_size())
            .sqlx_logging(self.sql_logging);
        if self.is_in_memory() {
            options
                .min_connections(1)
                .idle_timeout(IN_MEMORY_KEEPALIVE)
                .max_lifetime(IN_MEMORY_KEEPALIVE);
        }
        Ok(options)
    }
}

pub async fn connect(settings: &DatabaseSettings) -> DbResult<DbPool> {
    let pool = Database::connect(settings.connect_options()?).await?;
    info!(backend = ?pool.get_database_backend(), "database connected");
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_null_violations_are_rejections() {
        let err = DbError::from(DbErr::Custom(
            "NOT NULL constraint failed: empleado.compania_id".into(),
        ));
        assert!(matches!(err, DbError::Rejected(_)));

        let err = DbError::from(DbErr::Custom(
            "null value in column \"compania_id\" violates not-null constraint".into(),
        ));
        assert!(matches!(err, DbError::Rejected(_)));
    }

    #[test]
    fn unique_violations_are_duplicates() {
        let err = DbError::from(DbErr::Custom("UNIQUE constraint failed: empleado.id".into()));
        assert!(matches!(err, DbError::Duplicate(_)));
    }

    #[test]
    fn other_errors_stay_opaque() {
        let err = DbError::from(DbErr::RecordNotFound("empleado".into()));
        assert!(matches!(err, DbError::Orm(_)));
    }

    #[test]
    fn blank_url_is_missing() {
        let settings = DatabaseSettings::new("  ");
        assert!(matches!(settings.database_url(), Err(DbError::MissingUrl)));
    }

    #[test]
    fn in_memory_sqlite_uses_a_single_connection() {
        let settings = DatabaseSettings::new(DEFAULT_DATABASE_URL).with_max_connections(8);
        assert_eq!(settings.pool_size(), 1);
        let settings = DatabaseSettings::new("postgres://localhost/empleados").with_max_connections(8);
        assert_eq!(settings.pool_size(), 8);
    }

    #[test]
    fn in_memory_connection_is_kept_open() {
        let options = DatabaseSettings::new(DEFAULT_DATABASE_URL)
            .connect_options()
            .unwrap();
        assert_eq!(options.get_max_connections(), Some(1));
        assert_eq!(options.get_min_connections(), Some(1));
        assert_eq!(options.get_idle_timeout(), Some(IN_MEMORY_KEEPALIVE));
        assert_eq!(options.get_max_lifetime(), Some(IN_MEMORY_KEEPALIVE));
    }

    #[test]
    fn server_databases_keep_pool_defaults() {
        let options = DatabaseSettings::new("postgres://localhost/empleados")
            .with_max_connections(4)
            .connect_options()
            .unwrap();
        assert_eq!(options.get_max_connections(), Some(4));
        assert_eq!(options.get_min_connections(), None);
        assert_eq!(options.get_idle_timeout(), None);
    }

    #[tokio::test]
    async fn connects_to_in_memory_sqlite() {
        let pool = connect(&DatabaseSettings::new(DEFAULT_DATABASE_URL))
            .await
            .unwrap();
        assert_eq!(pool.get_database_backend(), sea_orm::DbBackend::Sqlite);
    }
}
