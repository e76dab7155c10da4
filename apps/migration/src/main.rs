//! Migration CLI tool.
//!
//! Reads `DATABASE_URL` and applies the schema, e.g. `migration up` or
//! `migration fresh`.

use sea_orm_migration::prelude::*;
use yatube_infra::Migrator;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt().with_env_filter("info").init();

    tracing::info!("Running Yatube migrations");
    cli::run_cli(Migrator).await;
}
