use crate::cli::OutputFormat;
use crate::error::CliResult;
use crate::output::{print_json, tile_table};
use iath_db::{StoreConfig, TileStore};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct SearchHit<'a> {
    id: &'a str,
    topic: &'a str,
}

pub fn run(file: &Path, keyword: &str, config: StoreConfig, format: OutputFormat) -> CliResult<()> {
    let store = TileStore::load(file, config)?;
    let hits = store.search_by_keyword(keyword);

    match format {
        OutputFormat::Json => {
            let hits: Vec<SearchHit<'_>> = hits
                .iter()
                .map(|t| SearchHit {
                    id: t.id(),
                    topic: &t.metadata.topic,
                })
                .collect();
            print_json(&hits)
        }
        OutputFormat::Table if hits.is_empty() => {
            println!("no tiles match '{keyword}'");
            Ok(())
        }
        OutputFormat::Table => {
            println!("{}", tile_table(&hits));
            Ok(())
        }
    }
}
