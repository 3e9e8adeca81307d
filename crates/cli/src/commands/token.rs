use pagerform_api::PagerDutyApi;
use pagerform_provider::{ProviderConfig, ProviderError};

use crate::OutputFormat;

pub async fn run(config: &ProviderConfig, format: OutputFormat) -> anyhow::Result<()> {
    let client = config.build_client()?;
    let abilities = client
        .list_abilities()
        .await
        .map_err(ProviderError::Credentials)?;

    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({ "valid": true, "abilities": abilities });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            println!("Token accepted ({} abilities).", abilities.len());
            for ability in &abilities {
                println!("  {ability}");
            }
        }
    }
    Ok(())
}
