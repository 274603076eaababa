//! Compiler configuration.
//!
//! One immutable [Config] drives a whole run. It is read from JSON with the
//! same keys the TL generator scripts use (`namespaces`, `prefixes`,
//! `builtinTemplates`, ...).

use crate::{error::CompileError, utils::quote};
use brine_tl_schema::{Primitive, Template};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::Path};

lazy_static! {
    static ref RUST_PATH: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(::[A-Za-z_][A-Za-z0-9_]*)*$").unwrap();
    static ref PREFIX:    Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

pub const READ_WRITE_SECTION: &str = "read-write";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    pub namespaces:        Namespaces,
    #[serde(default)]
    pub prefixes:          Prefixes,
    #[serde(default)]
    pub types:             Types,
    #[serde(default)]
    pub sections:          Vec<String>,
    #[serde(default)]
    pub skip:              Vec<String>,
    #[serde(default)]
    pub builtin:           Vec<String>,
    #[serde(default)]
    pub builtin_templates: Vec<String>,
    #[serde(default = "default_builtin_include")]
    pub builtin_include:   String,
    #[serde(default)]
    pub nullable:          Vec<String>,
    #[serde(default)]
    pub conversion:        Option<ConversionConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Namespaces {
    /// `::` separated, e.g. `Ton::details`.
    pub global:  String,
    #[serde(default)]
    pub creator: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Prefixes {
    #[serde(rename = "type", default = "default_type_prefix")]
    pub type_:     String,
    #[serde(default = "default_data_prefix")]
    pub data:      String,
    #[serde(default = "default_id_prefix")]
    pub id:        String,
    #[serde(default = "default_construct_prefix")]
    pub construct: String,
}

impl Default for Prefixes {
    fn default() -> Self {
        Prefixes {
            type_:     default_type_prefix(),
            data:      default_data_prefix(),
            id:        default_id_prefix(),
            construct: default_construct_prefix(),
        }
    }
}

/// Representation overrides. They are validated and recorded in the
/// generated header, but do not change the wire format.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Types {
    #[serde(default)]
    pub prime:   Option<String>,
    #[serde(default)]
    pub type_id: Option<String>,
    #[serde(default)]
    pub buffer:  Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConversionConfig {
    /// Rust path of the module holding the foreign generated code.
    pub include:            String,
    /// Namespace the foreign code was generated into, e.g. `ton::tonlib_api`.
    pub namespace:          String,
    #[serde(default)]
    pub builtin_additional: Vec<String>,
    #[serde(default)]
    pub builtin_include:    Option<String>,
    /// Prefixes the foreign code was generated with. Defaults to ours.
    #[serde(default)]
    pub prefixes:           Option<Prefixes>,
    /// Native combinator name to foreign combinator name.
    #[serde(default)]
    pub rename:             BTreeMap<String, String>,
}

impl ConversionConfig {
    /// Full Rust path of the foreign namespace module.
    pub fn foreign_path(&self) -> String {
        let mut path = vec![self.include.clone()];
        path.extend(crate::utils::module_path(&self.namespace));
        path.join("::")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    ReadWrite,
}

fn default_builtin_include() -> String {
    "brine_tl::builtins".to_string()
}

fn default_type_prefix() -> String {
    "TL".to_string()
}

fn default_data_prefix() -> String {
    "TLD".to_string()
}

fn default_id_prefix() -> String {
    "id".to_string()
}

fn default_construct_prefix() -> String {
    "make_".to_string()
}

fn config_error(msg: String) -> CompileError {
    CompileError::Config(msg)
}

impl Config {
    /// Reads and validates a JSON configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, CompileError> {
        let text = fs::read_to_string(path)?;
        Config::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Config, CompileError> {
        let config: Config =
            serde_json::from_str(text).map_err(|e| config_error(format!("Invalid JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn sections(&self) -> Result<Vec<Section>, CompileError> {
        self.sections
            .iter()
            .map(|name| match name.as_str() {
                READ_WRITE_SECTION => Ok(Section::ReadWrite),
                other => Err(config_error(format!("Unknown section {}", quote(other)))),
            })
            .collect()
    }

    pub fn read_write(&self) -> bool {
        self.sections.iter().any(|s| s == READ_WRITE_SECTION)
    }

    pub fn validate(&self) -> Result<(), CompileError> {
        if crate::utils::module_path(&self.namespaces.global).is_empty() {
            return Err(config_error("The global namespace must not be empty".to_string()));
        }
        if !RUST_PATH.is_match(&self.namespaces.global) {
            return Err(config_error(format!(
                "Invalid global namespace {}",
                quote(&self.namespaces.global)
            )));
        }
        if let Some(creator) = &self.namespaces.creator {
            if !PREFIX.is_match(creator) {
                return Err(config_error(format!("Invalid creator namespace {}", quote(creator))));
            }
        }

        validate_prefixes(&self.prefixes)?;
        self.sections()?;

        if let Some(prime) = &self.types.prime {
            if !["int32", "char"].contains(&prime.as_str()) {
                return Err(config_error(format!("Unsupported prime type {}", quote(prime))));
            }
        }
        if let Some(type_id) = &self.types.type_id {
            if !["uint32", "int32"].contains(&type_id.as_str()) {
                return Err(config_error(format!("Unsupported typeId type {}", quote(type_id))));
            }
        }

        for name in &self.builtin {
            if Primitive::from_name(name).is_none() {
                return Err(config_error(format!("Unknown builtin {}", quote(name))));
            }
        }
        for name in &self.builtin_templates {
            if Template::from_name(name).is_none() {
                return Err(config_error(format!("Unknown builtin template {}", quote(name))));
            }
        }
        if !RUST_PATH.is_match(&self.builtin_include) {
            return Err(config_error(format!(
                "Invalid builtinInclude {}",
                quote(&self.builtin_include)
            )));
        }

        if let Some(conversion) = &self.conversion {
            if !RUST_PATH.is_match(&conversion.include) {
                return Err(config_error(format!(
                    "Invalid conversion include {}",
                    quote(&conversion.include)
                )));
            }
            if !RUST_PATH.is_match(&conversion.namespace) {
                return Err(config_error(format!(
                    "Invalid conversion namespace {}",
                    quote(&conversion.namespace)
                )));
            }
            if let Some(include) = &conversion.builtin_include {
                if !RUST_PATH.is_match(include) {
                    return Err(config_error(format!(
                        "Invalid conversion builtinInclude {}",
                        quote(include)
                    )));
                }
            }
            if let Some(prefixes) = &conversion.prefixes {
                validate_prefixes(prefixes)?;
            }
        }

        Ok(())
    }

    /// Prefixes of the foreign schema named in the `conversion` block.
    pub fn foreign_prefixes(&self) -> &Prefixes {
        self.conversion
            .as_ref()
            .and_then(|c| c.prefixes.as_ref())
            .unwrap_or(&self.prefixes)
    }
}

fn validate_prefixes(prefixes: &Prefixes) -> Result<(), CompileError> {
    for (key, value) in [
        ("type", &prefixes.type_),
        ("data", &prefixes.data),
        ("id", &prefixes.id),
        ("construct", &prefixes.construct),
    ] {
        if !PREFIX.is_match(value) {
            return Err(config_error(format!("Invalid {} prefix {}", key, quote(value))));
        }
    }
    Ok(())
}
