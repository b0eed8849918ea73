//! Reset command
//!
//! Usage: agora reset --yes

use agora_engine::{EngineConfig, Gateway};
use clap::Args;

#[derive(Debug, Args)]
pub struct ResetArgs {
    /// Confirm deletion of all data
    #[arg(long)]
    pub yes: bool,
}

pub async fn execute(config: &EngineConfig, args: ResetArgs) -> anyhow::Result<()> {
    if !args.yes {
        anyhow::bail!("refusing to reset {} without --yes", config.db_path.display());
    }

    let gateway = Gateway::open(config)?;
    let result = gateway.reset_all().await;
    gateway.shutdown();

    let receipt = result?;
    println!("{}", serde_json::to_string_pretty(&receipt)?);
    Ok(())
}
