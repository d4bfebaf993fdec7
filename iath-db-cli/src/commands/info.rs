use crate::cli::OutputFormat;
use crate::error::CliResult;
use crate::output::{key_value_table, print_json};
use iath_db::format::{Compression, DatabaseHeader};
use iath_db::{LoadReport, StoreConfig, StoreStats, TileStore};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct InfoReport<'a> {
    file: String,
    header: &'a DatabaseHeader,
    stats: StoreStats,
    load: &'a LoadReport,
}

pub fn run(file: &Path, config: StoreConfig, format: OutputFormat) -> CliResult<()> {
    let store = TileStore::load(file, config)?;
    let header = store.header();
    let stats = store.stats();

    if format == OutputFormat::Json {
        return print_json(&InfoReport {
            file: file.display().to_string(),
            header,
            stats,
            load: store.load_report(),
        });
    }

    let compression = match header.compression {
        Compression::Zstd => "zstd",
    };
    let rows = [
        ("File", file.display().to_string()),
        ("Format version", header.version.to_string()),
        ("Domain code", format!("0x{:02x}", header.domain_code)),
        ("Compression", compression.to_string()),
        ("Index offset", header.index_offset.to_string()),
        ("Data offset", header.data_offset.to_string()),
        ("Tiles", stats.tile_count.to_string()),
        ("Skipped", store.load_report().skipped_count().to_string()),
        ("Avg certainty", format!("{:.1}", stats.avg_certainty)),
        ("Min certainty", format!("{:.1}", stats.min_certainty)),
        ("Max certainty", format!("{:.1}", stats.max_certainty)),
        ("File size", format!("{} bytes", stats.file_size_bytes)),
    ];
    println!("{}", key_value_table(&rows));
    Ok(())
}
