mod config;
mod empleados;
mod http;

use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use dotenvy::dotenv;
use migration::{Migrator, MigratorTrait};
use platform_db::{DbPool, connect};
use platform_obs::{ObsConfig, init_tracing};
use products_hr::semilla;
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    http::{AppState, ServeConfig},
};

#[derive(Parser, Debug)]
#[command(name = "empleados-server", version, about = "Employee management REST API")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server.
    Serve(ServeCommand),
    /// Run database migrations.
    #[command(subcommand)]
    Migrate(MigrateCommand),
    /// Insert the demo company when it is missing.
    Seed,
}

#[derive(Subcommand, Debug)]
enum MigrateCommand {
    /// Apply pending migrations.
    Up,
    /// Rollback the most recent migration.
    Down,
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: std::net::IpAddr,
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,
    #[arg(long, help = "Apply pending migrations before serving")]
    migrate: bool,
    #[arg(long, help = "Seed the demo company before serving")]
    seed: bool,
    #[arg(long, help = "Allow starting even when migrations are pending")]
    allow_dirty: bool,
}

impl From<&ServeCommand> for ServeConfig {
    fn from(value: &ServeCommand) -> Self {
        ServeConfig::new(value.host, value.port)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_tracing(ObsConfig::default())?;
    let cli = Cli::parse();
    let config = Arc::new(AppConfig::load());
    match cli.command {
        Command::Serve(cmd) => run_server(cmd, config).await,
        Command::Migrate(action) => match action {
            MigrateCommand::Up => migrate_up(&config).await,
            MigrateCommand::Down => migrate_down(&config).await,
        },
        Command::Seed => run_seed(&config).await,
    }
}

async fn setup_pool(config: &AppConfig) -> Result<DbPool> {
    if config.database.is_in_memory() {
        warn!("using an in-memory database; data is lost on exit");
    }
    connect(&config.database).await.map_err(Into::into)
}

async fn run_server(cmd: ServeCommand, config: Arc<AppConfig>) -> Result<()> {
    let pool = setup_pool(&config).await?;
    // A fresh in-memory database is unusable without its schema.
    if cmd.migrate || config.database.is_in_memory() {
        Migrator::up(&pool, None).await?;
        info!("database migrations applied");
    } else {
        ensure_migrations(&pool, cmd.allow_dirty).await?;
    }
    if cmd.seed {
        semilla::sembrar(&pool).await?;
    }
    let state = AppState {
        db: pool,
        config: config.clone(),
    };
    http::serve((&cmd).into(), state).await
}

async fn ensure_migrations(pool: &DbPool, allow_dirty: bool) -> Result<()> {
    let pending = Migrator::get_pending_migrations(pool).await?;
    if !pending.is_empty() && !allow_dirty {
        anyhow::bail!(
            "pending migrations detected; run `empleados-server migrate up`, or pass --migrate or --allow-dirty"
        );
    }
    Ok(())
}

async fn run_seed(config: &AppConfig) -> Result<()> {
    let pool = setup_pool(config).await?;
    let compania = semilla::sembrar(&pool).await?;
    info!(id = compania.id, nombre = %compania.nombre, "seed complete");
    Ok(())
}

async fn migrate_up(config: &AppConfig) -> Result<()> {
    let pool = setup_pool(config).await?;
    Migrator::up(&pool, None).await?;
    info!("database migrations applied");
    Ok(())
}

async fn migrate_down(config: &AppConfig) -> Result<()> {
    let pool = setup_pool(config).await?;
    Migrator::down(&pool, Some(1)).await?;
    info!("most recent migration rolled back");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_flags_parse() {
        let cli = Cli::try_parse_from([
            "empleados-server",
            "serve",
            "--port",
            "9090",
            "--migrate",
            "--seed",
        ])
        .unwrap();
        let Command::Serve(cmd) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(cmd.port, 9090);
        assert!(cmd.migrate && cmd.seed && !cmd.allow_dirty);
    }
}
