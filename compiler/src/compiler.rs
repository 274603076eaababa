use brine_tl_schema::Schema;
use tracing::debug;

use crate::{
    config::Config,
    conversion::build_mapping,
    error::CompileError,
    gen_rust::compile_schema_to_rust,
    parser::{parse_sources, Source},
    resolver::{resolve_schema, ResolveOptions},
};

/// Parses and resolves the given sources as one schema.
/// Returns `Err(CompileError)` if the configuration is invalid or any
/// source fails to tokenize, parse or resolve.
pub fn compile_sources(config: &Config, sources: &[Source]) -> Result<Schema, CompileError> {
    config.validate()?;
    let parsed = parse_sources(sources, &config.skip)?;
    debug!(
        sources = sources.len(),
        combinators = parsed.combinators.len(),
        "parsed schema"
    );
    resolve_schema(&parsed, &ResolveOptions::from_config(config))
}

/// Compiles a single schema text.
pub fn compile_schema(config: &Config, text: &str) -> Result<Schema, CompileError> {
    compile_sources(config, &[Source::new("<schema>", text)])
}

/// Compiles the sources and generates Rust code for them. `foreign` is the
/// resolved schema named by the `conversion` block, if there is one.
pub fn generate_rust(
    config: &Config,
    sources: &[Source],
    foreign: Option<&Schema>,
) -> Result<String, CompileError> {
    let schema = compile_sources(config, sources)?;
    match (&config.conversion, foreign) {
        (Some(conversion), Some(foreign)) => {
            let mapping = build_mapping(&schema, foreign, conversion)?;
            compile_schema_to_rust(config, &schema, Some(&mapping))
        }
        (Some(_), None) => Err(CompileError::Config(
            "A conversion is configured but no foreign schema was given".to_string(),
        )),
        (None, _) => compile_schema_to_rust(config, &schema, None),
    }
}
