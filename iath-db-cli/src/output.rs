use crate::error::CliResult;
use comfy_table::{ContentArrangement, Table};
use iath_db::Tile;
use serde::Serialize;
use std::sync::Arc;

/// Print any serializable value as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Two-column `field | value` table.
pub fn key_value_table(rows: &[(&str, String)]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Field", "Value"]);
    for (field, value) in rows {
        table.add_row(vec![(*field).to_string(), value.clone()]);
    }
    table
}

/// One row per tile: id, topic, domain-space coordinate, certainty.
pub fn tile_table(tiles: &[&Arc<Tile>]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["ID", "Topic", "Coordinate", "Certainty"]);
    for tile in tiles {
        table.add_row(vec![
            tile.id().to_string(),
            tile.metadata.topic.clone(),
            format_point(tile.domain_space()),
            format!("{:.0}", tile.certainty()),
        ]);
    }
    table
}

pub fn format_point(p: [f32; 3]) -> String {
    format!("({}, {}, {})", p[0], p[1], p[2])
}
