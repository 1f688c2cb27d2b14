//! Detect command handler.

use whisvc_runtime::CapabilityDetector;

use crate::bootstrap::Platform;
use crate::error::CliError;
use crate::presentation::render_capability;

pub async fn execute(platform: &Platform, json: bool) -> Result<(), CliError> {
    let report = CapabilityDetector::new(platform.runner.clone())
        .detect()
        .await;

    if json {
        let text = serde_json::to_string_pretty(&report).map_err(anyhow::Error::from)?;
        println!("{text}");
    } else {
        println!("GPU capability");
        print!("{}", render_capability(&report));
    }
    Ok(())
}
