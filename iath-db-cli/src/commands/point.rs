use crate::error::{CliError, CliResult};
use crate::output::print_json;
use iath_db::{CoordinateSpace, DomainRegistry};

pub fn run(registry: &DomainRegistry, domain: &str, text: &str) -> CliResult<()> {
    let schema = registry.get(domain).ok_or_else(|| CliError::UnknownDomain {
        domain: domain.to_string(),
        known: registry.list_domains().into_iter().map(String::from).collect(),
    })?;

    let space = CoordinateSpace::new(schema.clone())?;
    print_json(&space.extract_point(text))
}
