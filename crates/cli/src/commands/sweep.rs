use pagerform_api::PagerDutyApi;
use pagerform_provider::sweep_addons;

use crate::OutputFormat;

pub async fn run(api: &dyn PagerDutyApi, format: OutputFormat) -> anyhow::Result<()> {
    let deleted = sweep_addons(api).await?;

    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({ "deleted": deleted });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            println!("Deleted {} add-ons.", deleted.len());
            for id in &deleted {
                println!("  {id}");
            }
        }
    }
    Ok(())
}
