//! Runs one filter through parse, bind and translate for the configured backend.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sieve_filter::{AcceptanceRules, ComplexType};
use sieve_persistence::backends::relational::{RelationalTranslator, SqlDialect};
use sieve_persistence::backends::{EsQueryBuilder, MongoTranslator};
use sieve_persistence::{BackendKind, QueryError, translate_filter};
use tracing::{debug, info, warn};

use crate::config::CliConfig;

/// Name of the schema used when none is given. It accepts any field.
const DEFAULT_SCHEMA_NAME: &str = "Document";

/// Translates the configured filter and returns the output text.
///
/// Document and search backends print their JSON filter. Relational
/// backends print `{"sql": ..., "params": [...]}`.
pub fn run(config: &CliConfig) -> anyhow::Result<String> {
    let backend = config.backend_kind().map_err(|e| anyhow::anyhow!(e))?;
    let schema = match &config.schema {
        Some(path) => load_json::<ComplexType>(path)?,
        None => ComplexType::new(DEFAULT_SCHEMA_NAME).open(),
    };
    let rules = match &config.rules {
        Some(path) => load_json::<AcceptanceRules>(path)?,
        None => AcceptanceRules::unrestricted(),
    };
    let ctx = config
        .translation_context()
        .map_err(|e| anyhow::anyhow!(e))?;
    let options = config.parse_options();

    info!(
        backend = %backend,
        schema = %schema.name,
        externals = ctx.len(),
        "Translating filter"
    );

    let output = match backend {
        BackendKind::MongoDB => {
            let translator = MongoTranslator::new();
            let document =
                translate_filter(&translator, &config.filter, &options, &schema, &rules, &ctx)
                    .map_err(rejected)?;
            to_json(&document, config.pretty)?
        }
        BackendKind::Elasticsearch => {
            let builder = EsQueryBuilder::new();
            let query = translate_filter(&builder, &config.filter, &options, &schema, &rules, &ctx)
                .map_err(rejected)?;
            to_json(&builder.search_body(query), config.pretty)?
        }
        BackendKind::Sqlite | BackendKind::Postgres => {
            let dialect = if backend == BackendKind::Sqlite {
                SqlDialect::Sqlite
            } else {
                SqlDialect::Postgres
            };
            let translator =
                RelationalTranslator::new(dialect).with_path_separator(&config.path_separator);
            let expr = translate_filter(&translator, &config.filter, &options, &schema, &rules, &ctx)
                .map_err(rejected)?;
            let fragment = translator.render(&expr, config.param_offset);
            debug!(sql = %fragment.sql, params = fragment.params.len(), "Rendered SQL");
            to_json(&fragment, config.pretty)?
        }
    };

    Ok(output)
}

/// Logs a rejected filter and converts it for the caller.
fn rejected(err: QueryError) -> anyhow::Error {
    warn!(code = err.issue_code(), error = %err, "Filter rejected");
    anyhow::Error::new(err)
}

fn load_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<String> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(text)
}
