//! Resolve product images from the command line
//!
//! Usage: `shelfscope <ID>...`. Prints a JSON object mapping each identifier
//! to its image URL.

use anyhow::Result;
use shelfscope_app::{Dashboard, logging};
use shelfscope_settings::ShelfscopeSettings;
use std::collections::BTreeMap;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_default()?;

    let settings = match ShelfscopeSettings::settings_path() {
        Ok(path) => ShelfscopeSettings::load_or_default(&path),
        Err(err) => {
            tracing::warn!("Using default settings: {:#}", err);
            ShelfscopeSettings::default()
        }
    };
    let dashboard = Dashboard::open(settings)?;

    let ids: Vec<String> = std::env::args().skip(1).collect();
    if ids.is_empty() {
        eprintln!("usage: shelfscope <ID>...");
        return Ok(());
    }

    let result: BTreeMap<String, Option<String>> = if let [id] = ids.as_slice() {
        let lookup = dashboard.images().resolve_one(id).await;
        BTreeMap::from([(id.clone(), lookup.url)])
    } else {
        let batch = dashboard.image_session().resolve_many(&ids).await;
        if let Some(error) = &batch.error {
            tracing::warn!(%error, "Some images could not be resolved");
        }
        ids.iter()
            .map(|id| (id.clone(), batch.urls.get(id.trim()).cloned()))
            .collect()
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
