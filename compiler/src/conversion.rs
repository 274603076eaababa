//! Conversion between two independently generated schemas.
//!
//! The native schema is the one being generated; the foreign schema (for
//! example the public API schema) was generated separately. Combinators are
//! matched by name, types by the constructors they are made of.

use std::collections::{HashMap, HashSet};

use brine_tl_schema::{Combinator, Schema, TypeRef};
use tracing::{debug, info};

use crate::{
    config::{Config, ConversionConfig},
    error::CompileError,
    gen_rust::{field_name, Names},
    utils::quote,
};

/// A builtin the foreign schema has but the native one spells out as a
/// type with two zero-field constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adaptation {
    pub builtin:     &'static str,
    pub native_type: &'static str,
    pub false_ctor:  &'static str,
    pub true_ctor:   &'static str,
}

pub const ADAPTATIONS: &[Adaptation] = &[Adaptation {
    builtin:     "bool",
    native_type: "Bool",
    false_ctor:  "boolFalse",
    true_ctor:   "boolTrue",
}];

pub fn adaptation(builtin: &str) -> Option<&'static Adaptation> {
    ADAPTATIONS.iter().find(|a| a.builtin == builtin)
}

fn conversion_error(combinator: &str, msg: String) -> CompileError {
    CompileError::Conversion {
        combinator: combinator.to_string(),
        msg,
    }
}

#[derive(Debug)]
pub struct ConversionMapping<'a> {
    pub native:              &'a Schema,
    pub foreign:             &'a Schema,
    pub config:              &'a ConversionConfig,
    /// Native constructor to foreign constructor, in native order.
    pub combinators:         Vec<(String, String)>,
    /// Native function to foreign function, in native order.
    pub functions:           Vec<(String, String)>,
    /// Native type to foreign type.
    pub types:               HashMap<String, String>,
    pub reverse_types:       HashMap<String, String>,
    /// Native type to the builtin adaptation covering it.
    pub adapted:             HashMap<String, &'static Adaptation>,
    pub adapted_combinators: HashSet<String>,
    ctor_map:                HashMap<String, String>,
    reverse_ctor_map:        HashMap<String, String>,
}

/// Pairs the combinators and types of two resolved schemas and checks that
/// the pairing is total and shape preserving.
pub fn build_mapping<'a>(
    native: &'a Schema,
    foreign: &'a Schema,
    config: &'a ConversionConfig,
) -> Result<ConversionMapping<'a>, CompileError> {
    let mut mapping = ConversionMapping {
        native,
        foreign,
        config,
        combinators: Vec::new(),
        functions: Vec::new(),
        types: HashMap::new(),
        reverse_types: HashMap::new(),
        adapted: HashMap::new(),
        adapted_combinators: HashSet::new(),
        ctor_map: HashMap::new(),
        reverse_ctor_map: HashMap::new(),
    };

    mapping.add_adaptations()?;

    for name in config.rename.keys() {
        if native.combinator(name).is_none() && native.function(name).is_none() {
            return Err(conversion_error(name, "Renamed combinator is not declared".to_string()));
        }
    }

    for combinator in &native.combinators {
        if mapping.adapted_combinators.contains(&combinator.name) {
            continue;
        }
        let foreign_name = mapping.foreign_name(&combinator.name);
        if foreign.combinator(&foreign_name).is_none() {
            if config.rename.contains_key(&combinator.name) {
                return Err(conversion_error(
                    &combinator.name,
                    format!("Renamed to {}, which the foreign schema does not declare", quote(&foreign_name)),
                ));
            }
            continue;
        }
        if let Some(previous) = mapping
            .reverse_ctor_map
            .insert(foreign_name.clone(), combinator.name.clone())
        {
            return Err(conversion_error(
                &combinator.name,
                format!("Foreign constructor {} is already mapped from {}", quote(&foreign_name), quote(&previous)),
            ));
        }
        mapping.ctor_map.insert(combinator.name.clone(), foreign_name.clone());
        mapping.combinators.push((combinator.name.clone(), foreign_name));
    }

    mapping.map_types()?;

    for (native_name, foreign_name) in &mapping.combinators {
        if let (Some(n), Some(f)) = (native.combinator(native_name), foreign.combinator(foreign_name)) {
            mapping.check_fields(n, f)?;
        }
    }

    let mut functions = Vec::new();
    for function in &native.functions {
        let foreign_name = mapping.foreign_name(&function.name);
        if let Some(foreign_function) = foreign.function(&foreign_name) {
            mapping.check_fields(function, foreign_function)?;
            functions.push((function.name.clone(), foreign_name));
        }
    }
    mapping.functions = functions;

    info!(
        constructors = mapping.combinators.len(),
        types = mapping.types.len(),
        functions = mapping.functions.len(),
        "built conversion mapping"
    );
    Ok(mapping)
}

impl<'a> ConversionMapping<'a> {
    fn foreign_name(&self, native_name: &str) -> String {
        self.config
            .rename
            .get(native_name)
            .cloned()
            .unwrap_or_else(|| native_name.to_string())
    }

    fn add_adaptations(&mut self) -> Result<(), CompileError> {
        for builtin in &self.config.builtin_additional {
            let rule = adaptation(builtin).ok_or_else(|| {
                conversion_error(builtin, "No adaptation rule exists for this builtin".to_string())
            })?;
            if !self.foreign.has_builtin(builtin) {
                return Err(conversion_error(
                    builtin,
                    "Additional builtin is not a builtin of the foreign schema".to_string(),
                ));
            }
            if self.native.has_builtin(builtin) {
                return Err(conversion_error(
                    builtin,
                    "Additional builtin is also a builtin of the native schema".to_string(),
                ));
            }

            let Some(type_def) = self.native.type_def(rule.native_type) else {
                debug!(builtin = builtin.as_str(), "native schema does not use {}", rule.native_type);
                continue;
            };
            let mut ctors: Vec<&str> = type_def.constructors.iter().map(String::as_str).collect();
            ctors.sort_unstable();
            let mut expected = vec![rule.false_ctor, rule.true_ctor];
            expected.sort_unstable();
            let zero_fields = type_def
                .constructors
                .iter()
                .filter_map(|name| self.native.combinator(name))
                .all(|c| c.fields.is_empty());
            if ctors != expected || !zero_fields {
                return Err(conversion_error(
                    rule.native_type,
                    format!(
                        "{} must consist of the zero-field constructors {} and {}",
                        rule.native_type, rule.false_ctor, rule.true_ctor
                    ),
                ));
            }

            self.adapted.insert(type_def.name.clone(), rule);
            self.adapted_combinators.extend(type_def.constructors.iter().cloned());
        }
        Ok(())
    }

    /// Every constructor of a converted type must be mapped, into a single
    /// foreign type whose constructors are all mapped back.
    fn map_types(&mut self) -> Result<(), CompileError> {
        for type_def in &self.native.types {
            if self.adapted.contains_key(&type_def.name) {
                continue;
            }
            let mapped: Vec<&String> = type_def
                .constructors
                .iter()
                .filter(|name| self.ctor_map.contains_key(*name))
                .collect();
            let Some(first) = mapped.first() else {
                debug!(type_name = type_def.name.as_str(), "type has no foreign counterpart");
                continue;
            };
            if let Some(missing) = type_def.constructors.iter().find(|name| !self.ctor_map.contains_key(*name)) {
                return Err(conversion_error(
                    missing,
                    format!("Constructor of {} has no foreign counterpart", quote(&type_def.name)),
                ));
            }

            let foreign_type = self
                .foreign
                .combinator(&self.ctor_map[*first])
                .map(|c| c.result_name().to_string())
                .unwrap_or_default();
            for name in &type_def.constructors {
                let target = &self.ctor_map[name];
                let result = self.foreign.combinator(target).map(Combinator::result_name);
                if result != Some(foreign_type.as_str()) {
                    return Err(conversion_error(
                        name,
                        format!(
                            "Constructors of {} map into different foreign types {} and {}",
                            quote(&type_def.name),
                            quote(&foreign_type),
                            quote(result.unwrap_or_default())
                        ),
                    ));
                }
            }

            if let Some(foreign_def) = self.foreign.type_def(&foreign_type) {
                for foreign_ctor in &foreign_def.constructors {
                    match self.reverse_ctor_map.get(foreign_ctor) {
                        None => {
                            return Err(conversion_error(
                                foreign_ctor,
                                format!("Foreign constructor of {} has no native counterpart", quote(&foreign_type)),
                            ))
                        }
                        Some(native_ctor) if !type_def.constructors.contains(native_ctor) => {
                            return Err(conversion_error(
                                foreign_ctor,
                                format!(
                                    "Foreign constructor of {} maps back to {}, which is not a constructor of {}",
                                    quote(&foreign_type),
                                    quote(native_ctor),
                                    quote(&type_def.name)
                                ),
                            ))
                        }
                        Some(_) => {}
                    }
                }
            }

            if let Some(previous) = self.reverse_types.get(&foreign_type) {
                return Err(conversion_error(
                    &type_def.name,
                    format!("Foreign type {} is already mapped from {}", quote(&foreign_type), quote(previous)),
                ));
            }
            self.types.insert(type_def.name.clone(), foreign_type.clone());
            self.reverse_types.insert(foreign_type, type_def.name.clone());
        }
        Ok(())
    }

    fn check_fields(&self, native: &Combinator, foreign: &Combinator) -> Result<(), CompileError> {
        if native.fields.len() != foreign.fields.len() {
            return Err(conversion_error(
                &native.name,
                format!(
                    "Arity mismatch: {} fields here, {} in foreign {}",
                    native.fields.len(),
                    foreign.fields.len(),
                    quote(&foreign.name)
                ),
            ));
        }
        for (n, f) in native.fields.iter().zip(&foreign.fields) {
            if n.name != f.name {
                return Err(conversion_error(
                    &native.name,
                    format!("Field {} is called {} in the foreign schema", quote(&n.name), quote(&f.name)),
                ));
            }
            self.check_type(&n.type_, &f.type_).map_err(|msg| {
                conversion_error(&native.name, format!("Field {}: {}", quote(&n.name), msg))
            })?;
        }
        Ok(())
    }

    fn check_type(&self, native: &TypeRef, foreign: &TypeRef) -> Result<(), String> {
        match (native, foreign) {
            (TypeRef::Builtin { name: a, .. }, TypeRef::Builtin { name: b, .. }) if a == b => Ok(()),

            (
                TypeRef::Template { template: a, args: native_args, .. },
                TypeRef::Template { template: b, args: foreign_args, .. },
            ) => {
                if a != b || native_args.len() != foreign_args.len() {
                    return Err(format!(
                        "template {} with {} arguments does not match {} with {}",
                        a.name(),
                        native_args.len(),
                        b.name(),
                        foreign_args.len()
                    ));
                }
                native_args
                    .iter()
                    .zip(foreign_args)
                    .try_for_each(|(n, f)| self.check_type(n, f))
            }

            (TypeRef::User { name, boxed: true, nullable: false }, TypeRef::Builtin { name: builtin, .. })
                if self.adapted.get(name).map(|rule| rule.builtin) == Some(builtin.as_str()) =>
            {
                Ok(())
            }

            (
                TypeRef::User { name: native_name, boxed: native_boxed, nullable: native_nullable },
                TypeRef::User { name: foreign_name, boxed: foreign_boxed, nullable: foreign_nullable },
            ) => {
                if native_nullable != foreign_nullable {
                    return Err("nullable on one side only".to_string());
                }
                if native_boxed != foreign_boxed {
                    return Err("boxed on one side only".to_string());
                }
                let map = if *native_boxed { &self.types } else { &self.ctor_map };
                match map.get(native_name) {
                    Some(target) if target == foreign_name => Ok(()),
                    Some(target) => Err(format!(
                        "{} converts to {}, not {}",
                        quote(native_name),
                        quote(target),
                        quote(foreign_name)
                    )),
                    None => Err(format!("{} has no foreign counterpart", quote(native_name))),
                }
            }

            _ => Err(format!(
                "{} does not correspond to {}",
                quote(native.name()),
                quote(foreign.name())
            )),
        }
    }

    /// Expression converting `expr` between the two schemas.
    fn convert(
        &self,
        expr: &str,
        native: &TypeRef,
        foreign: &TypeRef,
        to_foreign: bool,
        names: (&Names, &Names),
    ) -> String {
        match (native, foreign) {
            (TypeRef::Template { args: native_args, .. }, TypeRef::Template { args: foreign_args, .. }) => format!(
                "{}.into_iter().map(|item| {}).collect::<Vec<_>>()",
                expr,
                self.convert("item", &native_args[0], &foreign_args[0], to_foreign, names)
            ),
            (TypeRef::User { nullable: true, .. }, TypeRef::User { nullable: true, .. }) => format!(
                "{}.map(|item| {})",
                expr,
                self.convert("item", &non_null(native), &non_null(foreign), to_foreign, names)
            ),
            _ => {
                let target = if to_foreign {
                    names.1.rust_type(foreign)
                } else {
                    names.0.rust_type(native)
                };
                format!("<{}>::from({})", target, expr)
            }
        }
    }

    fn emit_struct_pair(
        &self,
        lines: &mut Vec<String>,
        native: &Combinator,
        foreign: &Combinator,
        native_struct: &str,
        foreign_struct: &str,
        names: (&Names, &Names),
    ) {
        for to_foreign in [true, false] {
            let (from, to) = if to_foreign {
                (native_struct, foreign_struct)
            } else {
                (foreign_struct, native_struct)
            };
            lines.push(format!("impl From<{}> for {} {{", from, to));
            lines.push(format!("    fn from(value: {}) -> Self {{", from));
            if native.fields.is_empty() {
                lines.push("        Self {}".to_string());
            } else {
                lines.push("        Self {".to_string());
                for (n, f) in native.fields.iter().zip(&foreign.fields) {
                    let name = field_name(&n.name);
                    let expr = format!("value.{}", name);
                    lines.push(format!(
                        "            {}: {},",
                        name,
                        self.convert(&expr, &n.type_, &f.type_, to_foreign, names)
                    ));
                }
                lines.push("        }".to_string());
            }
            lines.push("    }".to_string());
            lines.push("}".to_string());
            lines.push("".to_string());
        }
    }

    fn emit_type_pair(&self, lines: &mut Vec<String>, native_type: &str, foreign_type: &str, names: (&Names, &Names)) {
        let (native_names, foreign_names) = names;
        let native_ctors = self.native.type_def(native_type).map(|t| t.constructors.clone()).unwrap_or_default();
        let native_polymorphic = native_ctors.len() > 1;
        let foreign_polymorphic = self.foreign.type_def(foreign_type).map_or(false, |t| t.is_polymorphic());

        let native_type_name = native_names.type_name(native_type);
        let foreign_type_name = foreign_names.type_name(foreign_type);

        lines.push(format!("impl From<{}> for {} {{", native_type_name, foreign_type_name));
        lines.push(format!("    fn from(value: {}) -> Self {{", native_type_name));
        if native_polymorphic {
            lines.push("        match value {".to_string());
            for ctor in &native_ctors {
                lines.push(format!(
                    "            {}::{}(data) => Self::from({}::from(data)),",
                    native_type_name,
                    native_names.variant_name(ctor),
                    foreign_names.data_name(&self.ctor_map[ctor])
                ));
            }
            lines.push("        }".to_string());
        } else if let Some(ctor) = native_ctors.first() {
            lines.push(format!(
                "        Self::from({}::from(value.0))",
                foreign_names.data_name(&self.ctor_map[ctor])
            ));
        }
        lines.push("    }".to_string());
        lines.push("}".to_string());
        lines.push("".to_string());

        let foreign_ctors = self.foreign.type_def(foreign_type).map(|t| t.constructors.clone()).unwrap_or_default();
        lines.push(format!("impl From<{}> for {} {{", foreign_type_name, native_type_name));
        lines.push(format!("    fn from(value: {}) -> Self {{", foreign_type_name));
        if foreign_polymorphic {
            lines.push("        match value {".to_string());
            for ctor in &foreign_ctors {
                lines.push(format!(
                    "            {}::{}(data) => Self::from({}::from(data)),",
                    foreign_type_name,
                    foreign_names.variant_name(ctor),
                    native_names.data_name(&self.reverse_ctor_map[ctor])
                ));
            }
            lines.push("        }".to_string());
        } else if let Some(ctor) = foreign_ctors.first() {
            lines.push(format!(
                "        Self::from({}::from(value.0))",
                native_names.data_name(&self.reverse_ctor_map[ctor])
            ));
        }
        lines.push("    }".to_string());
        lines.push("}".to_string());
        lines.push("".to_string());
    }

    fn emit_adaptation(&self, lines: &mut Vec<String>, type_name: &str, rule: &Adaptation, names: (&Names, &Names)) {
        let (native_names, foreign_names) = names;
        let native_type = native_names.type_name(type_name);
        let builtin = foreign_names.rust_type(&TypeRef::Builtin {
            name:      rule.builtin.to_string(),
            primitive: brine_tl_schema::Primitive::Bool,
        });
        let true_variant = native_names.variant_name(rule.true_ctor);

        lines.push(format!("impl From<{}> for {} {{", native_type, builtin));
        lines.push(format!("    fn from(value: {}) -> Self {{", native_type));
        lines.push(format!("        matches!(value, {}::{}(_))", native_type, true_variant));
        lines.push("    }".to_string());
        lines.push("}".to_string());
        lines.push("".to_string());

        lines.push(format!("impl From<{}> for {} {{", builtin, native_type));
        lines.push(format!("    fn from(value: {}) -> Self {{", builtin));
        lines.push("        if value {".to_string());
        lines.push(format!("            Self::from({} {{}})", native_names.data_name(rule.true_ctor)));
        lines.push("        } else {".to_string());
        lines.push(format!("            Self::from({} {{}})", native_names.data_name(rule.false_ctor)));
        lines.push("        }".to_string());
        lines.push("    }".to_string());
        lines.push("}".to_string());
        lines.push("".to_string());
    }

    /// Emits `pub mod conversion` with `From` impls in both directions.
    pub fn emit(&self, config: &Config) -> Result<String, CompileError> {
        let native_names = Names::new(&config.prefixes);
        let foreign_names = Names::with_path(config.foreign_prefixes(), "foreign");
        let names = (&native_names, &foreign_names);
        let mut lines = Vec::new();

        lines.push("pub mod conversion {".to_string());
        lines.push("use super::*;".to_string());
        lines.push(format!("use {} as foreign;", self.config.foreign_path()));
        if let Some(include) = &self.config.builtin_include {
            lines.push(format!("use {}::*;", include));
        }
        lines.push("".to_string());

        for type_def in &self.native.types {
            if let Some(rule) = self.adapted.get(&type_def.name) {
                self.emit_adaptation(&mut lines, &type_def.name, rule, names);
            }
        }

        for type_def in &self.native.types {
            if let Some(foreign_type) = self.types.get(&type_def.name) {
                self.emit_type_pair(&mut lines, &type_def.name, foreign_type, names);
            }
        }

        for (native_name, foreign_name) in &self.combinators {
            let (Some(n), Some(f)) = (self.native.combinator(native_name), self.foreign.combinator(foreign_name)) else {
                return Err(conversion_error(native_name, "Mapped constructor disappeared".to_string()));
            };
            self.emit_struct_pair(
                &mut lines,
                n,
                f,
                &native_names.data_name(native_name),
                &foreign_names.data_name(foreign_name),
                names,
            );
        }

        for (native_name, foreign_name) in &self.functions {
            let (Some(n), Some(f)) = (self.native.function(native_name), self.foreign.function(foreign_name)) else {
                return Err(conversion_error(native_name, "Mapped function disappeared".to_string()));
            };
            self.emit_struct_pair(
                &mut lines,
                n,
                f,
                &native_names.function_name(native_name),
                &foreign_names.function_name(foreign_name),
                names,
            );
        }

        lines.push("}".to_string());
        lines.push("".to_string());
        Ok(lines.join("\n"))
    }
}

fn non_null(type_ref: &TypeRef) -> TypeRef {
    match type_ref {
        TypeRef::User { name, boxed, .. } => TypeRef::User {
            name:     name.clone(),
            boxed:    *boxed,
            nullable: false,
        },
        other => other.clone(),
    }
}
