use crate::error::{CliError, CliResult};
use colored::Colorize;
use iath_db::{write_database, DomainRegistry, Tile};
use std::fs;
use std::path::{Path, PathBuf};

pub fn run(
    input_dir: &Path,
    output: &Path,
    domain: &str,
    registry: &DomainRegistry,
    quiet: bool,
) -> CliResult<()> {
    let schema = registry.get(domain).ok_or_else(|| CliError::UnknownDomain {
        domain: domain.to_string(),
        known: registry.list_domains().into_iter().map(String::from).collect(),
    })?;

    let files = tile_files(input_dir)?;
    let mut tiles = Vec::with_capacity(files.len());
    for path in &files {
        let mut tile = read_tile(path)?;
        if tile.metadata.domain.is_empty() {
            tile.metadata.domain = schema.id.clone();
        }
        tiles.push(tile);
    }
    tracing::info!(
        input = %input_dir.display(),
        files = files.len(),
        domain = %schema.id,
        "encoding tile batch"
    );

    let batch = write_database(output, &tiles, schema.domain_code)?;

    if !quiet {
        if batch.skipped > 0 {
            eprintln!(
                "{} skipped {} tile(s) with an empty id",
                "warning:".yellow().bold(),
                batch.skipped
            );
        }
        println!(
            "Wrote {} tiles to {} ({} bytes)",
            batch.entries.len(),
            output.display(),
            batch.bytes.len()
        );
    }
    Ok(())
}

/// `*.json` files directly under `dir`, sorted by file name.
fn tile_files(dir: &Path) -> CliResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(CliError::Input(format!(
            "input directory not found: {}",
            dir.display()
        )));
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn read_tile(path: &Path) -> CliResult<Tile> {
    let text = fs::read_to_string(path)
        .map_err(|e| CliError::Input(format!("failed to read {}: {e}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|e| CliError::Input(format!("invalid tile JSON in {}: {e}", path.display())))
}
