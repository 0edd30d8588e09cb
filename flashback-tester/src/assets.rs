use anyhow::{Context, Result};
use flashback_game::{Catalog, CatalogError, GameConfig};
use std::path::Path;

/// Load the event catalog from `path`, or the bundled one when no path is given.
pub async fn load_catalog(path: Option<&Path>) -> Result<Catalog> {
    let Some(path) = path else {
        log::debug!("using bundled event catalog");
        return Catalog::load_from_static().context("bundled catalog is invalid");
    };

    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CatalogError::Unavailable(e.to_string()))
        .with_context(|| format!("failed to read catalog {}", path.display()))?;
    let catalog = Catalog::from_json(&json)
        .with_context(|| format!("invalid catalog {}", path.display()))?;
    log::info!("loaded {} events from {}", catalog.len(), path.display());
    Ok(catalog)
}

/// Load and validate a game config from `path`, or the bundled one when no path is given.
pub async fn load_config(path: Option<&Path>) -> Result<GameConfig> {
    let config = match path {
        Some(path) => {
            let json = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read config {}", path.display()))?;
            GameConfig::from_json(&json)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => GameConfig::load_from_static(),
    };
    config.validate().context("config rejected")?;
    Ok(config)
}
