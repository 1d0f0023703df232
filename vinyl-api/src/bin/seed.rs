//! Seed the albums table with the fixed catalogue.
//!
//! Uses the same `VINYL_DB_*` settings as the server.

use vinyl_api::seed::seed_catalogue;
use vinyl_api::telemetry::init_telemetry;
use vinyl_api::{AlbumRepository, ApiResult, AppConfig, DbClient, RequestLedger};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let config = AppConfig::from_env()?;
    let telemetry = init_telemetry(&config.telemetry)?;

    let repository = AlbumRepository::new(DbClient::from_config(&config.db)?);
    let ledger = RequestLedger::detached(format!("{}-seed", config.service_name));

    let result = seed_catalogue(&repository, &ledger).await;

    let context = ledger.snapshot();
    tracing::info!(
        statements = context.database.len(),
        failed = context.database.iter().filter(|c| c.is_error()).count(),
        "Seed finished"
    );

    telemetry.shutdown();
    result.map(|_| ())
}
