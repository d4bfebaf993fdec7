use crate::error::{CliError, CliResult};
use crate::output::{format_point, print_json};
use iath_db::{CacheConfig, CachedTileLookup, StoreConfig, TileStore};
use std::path::Path;
use std::sync::Arc;

pub fn run(
    file: &Path,
    coords: &[f32],
    config: StoreConfig,
    cache: &CacheConfig,
) -> CliResult<()> {
    if coords.len() % 3 != 0 {
        return Err(CliError::Usage(format!(
            "coordinates must come in x y z triples (got {} values)",
            coords.len()
        )));
    }

    let store = Arc::new(TileStore::load(file, config)?);
    let lookup = CachedTileLookup::new(store, cache)?;

    for xyz in coords.chunks_exact(3) {
        let point = [xyz[0], xyz[1], xyz[2]];
        match lookup.fetch_default(point) {
            Some(tile) => print_json(&*tile)?,
            None => println!(
                "no tile within {} of {}",
                lookup.store().config().default_tolerance,
                format_point(point)
            ),
        }
    }
    tracing::debug!(cached = lookup.cache().len(), "fetch complete");
    Ok(())
}
