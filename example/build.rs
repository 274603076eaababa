use std::{env, fs, path::PathBuf};

use brine_tl_compiler::{compile_sources, generate_rust, CompileError, Config, Source};

fn main() -> Result<(), CompileError> {
    println!("cargo:rerun-if-changed=schema");

    let out_dir = env::var("OUT_DIR")
        .map(PathBuf::from)
        .map_err(|e| CompileError::Config(format!("OUT_DIR: {}", e)))?;

    let api_config = Config::load("schema/api.json")?;
    let api_sources = [Source::load("schema/api.tl")?];
    fs::write(out_dir.join("api.rs"), generate_rust(&api_config, &api_sources, None)?)?;

    // The native schema converts into the API one, so it is generated
    // against the resolved API schema.
    let api_schema = compile_sources(&api_config, &api_sources)?;
    let native_config = Config::load("schema/native.json")?;
    let native_sources = [Source::load("schema/native.tl")?];
    fs::write(
        out_dir.join("native.rs"),
        generate_rust(&native_config, &native_sources, Some(&api_schema))?,
    )?;

    Ok(())
}
