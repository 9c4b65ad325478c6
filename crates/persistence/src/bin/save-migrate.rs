#![deny(warnings)]

//! Upgrades a JSON save in place: runs the legacy-id normalisation and
//! repair pipeline, then rewrites the file at the current schema version.

use anyhow::{bail, Context, Result};
use game_core::catalog::Catalog;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = std::env::args().skip(1);
    let Some(input) = args.next() else {
        bail!("usage: save-migrate <save.json> [output.json]");
    };
    let input = PathBuf::from(input);
    let output = args.next().map(PathBuf::from).unwrap_or_else(|| input.clone());

    let catalog = Catalog::standard();
    let state = persistence::load_json(&catalog, &input)
        .with_context(|| format!("loading {}", input.display()))?;
    persistence::save_json(&output, &state)
        .with_context(|| format!("writing {}", output.display()))?;

    println!(
        "Migrated {} -> {} (schema v{})",
        input.display(),
        output.display(),
        persistence::SCHEMA_VERSION
    );
    Ok(())
}
