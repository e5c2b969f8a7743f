use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};
use gig_payment_engine::{db::db_url, SqliteDatabase};
use sqlx::{
    migrate::{MigrateDatabase, Migrator},
    Sqlite,
};

/// Setup commands work directly on the server's database.
#[derive(Debug, Subcommand)]
pub enum SetupCommand {
    /// Create the database if needed, and run the migrations.
    Migrate(MigrateParams),
}

#[derive(Debug, Args)]
pub struct MigrateParams {
    /// Defaults to `GIG_DATABASE_URL`, or the server's default database if that is not set either.
    #[arg(short, long)]
    pub database_url: Option<String>,
    /// The path to the migrations directory. The migrations are embedded in the binary by default, and so this
    /// parameter is optional. If provided, the migrations at <path> will be executed instead.
    #[arg(short, long)]
    pub path: Option<String>,
}

pub async fn handle_setup_command(command: SetupCommand) -> Result<()> {
    match command {
        SetupCommand::Migrate(params) => migrate_db(params).await,
    }
}

async fn migrate_db(params: MigrateParams) -> Result<()> {
    let url = params.database_url.clone().unwrap_or_else(db_url);
    create_database_if_not_exist(&url).await?;
    let db = SqliteDatabase::new_with_url(&url, 1).await?;
    match &params.path {
        Some(path) => {
            println!("Running migrations at: {path}");
            let migrator = Migrator::new(Path::new(path)).await?;
            migrator.run(db.pool()).await?;
        },
        None => {
            println!("Running embedded migrations");
            sqlx::migrate!("../gig_payment_engine/src/sqlite/migrations").run(db.pool()).await?;
        },
    }
    println!("Migrations complete");
    Ok(())
}

async fn create_database_if_not_exist(url: &str) -> Result<()> {
    if !Sqlite::database_exists(url).await? {
        println!("Creating new database at: {url}");
        Sqlite::create_database(url).await?;
    }
    Ok(())
}
