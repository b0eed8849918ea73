//! Migrate command
//!
//! Usage: agora migrate

use agora_engine::EngineConfig;
use agora_store::StoreAdapter;
use anyhow::Context;

pub fn execute(config: &EngineConfig) -> anyhow::Result<()> {
    let mut store = StoreAdapter::open(&config.db_path, &config.store_options())
        .with_context(|| format!("opening {}", config.db_path.display()))?;
    agora_store::apply_migrations(store.connection_mut())?;

    println!("Migrations applied to {}", config.db_path.display());
    Ok(())
}
