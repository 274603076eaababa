use brine_tl_schema::{Combinator, Schema, TypeDef, TypeRef};

use crate::{
    config::{Config, Prefixes, Section},
    conversion::ConversionMapping,
    error::CompileError,
    utils::{escape_rust_keyword, function_name, mangle, module_path, to_pascal_case, to_snake_case},
};

const ALLOW_LINTS: &str = "#![allow(dead_code, non_camel_case_types, non_snake_case, non_upper_case_globals, unused_imports, unused_variables, clippy::all)]";
const DERIVES: &str = "#[derive(Debug, Clone, PartialEq)]";

/// Names of the generated items, formed from the configured prefixes.
///
/// `path` is prepended to every name, which lets the conversion code refer
/// to the foreign schema's items as `foreign::TLfoo`.
pub struct Names<'a> {
    prefixes: &'a Prefixes,
    path:     String,
}

impl<'a> Names<'a> {
    pub fn new(prefixes: &'a Prefixes) -> Names<'a> {
        Names { prefixes, path: String::new() }
    }

    pub fn with_path(prefixes: &'a Prefixes, path: &str) -> Names<'a> {
        Names { prefixes, path: format!("{}::", path) }
    }

    /// `TLstorage_WalletList`
    pub fn type_name(&self, name: &str) -> String {
        format!("{}{}{}", self.path, self.prefixes.type_, mangle(name))
    }

    /// `TLDstorage_walletEntry`
    pub fn data_name(&self, ctor: &str) -> String {
        format!("{}{}{}", self.path, self.prefixes.data, mangle(ctor))
    }

    /// `id_boolTrue`
    pub fn id_name(&self, ctor: &str) -> String {
        format!("{}{}_{}", self.path, self.prefixes.id, mangle(ctor))
    }

    /// `make_boolTrue`
    pub fn construct_name(&self, ctor: &str) -> String {
        format!("{}{}{}", self.path, self.prefixes.construct, mangle(ctor))
    }

    /// `TLDeleteKey`
    pub fn function_name(&self, name: &str) -> String {
        format!("{}{}{}", self.path, self.prefixes.type_, function_name(name))
    }

    /// Enum variant of a constructor inside its sum type.
    pub fn variant_name(&self, ctor: &str) -> String {
        escape_rust_keyword(&to_pascal_case(ctor))
    }

    /// Maps a resolved type reference to the Rust type of a field.
    pub fn rust_type(&self, type_ref: &TypeRef) -> String {
        match type_ref {
            TypeRef::Builtin { name, .. } => format!("{}{}{}", self.path, self.prefixes.type_, name),
            TypeRef::Template { name, args, .. } => format!(
                "{}{}{}<{}>",
                self.path,
                self.prefixes.type_,
                name,
                args.iter().map(|arg| self.rust_type(arg)).collect::<Vec<_>>().join(", ")
            ),
            TypeRef::User { name, boxed, nullable } => {
                let base = if *boxed { self.type_name(name) } else { self.data_name(name) };
                if *nullable {
                    format!("Option<{}>", base)
                } else {
                    base
                }
            }
        }
    }
}

pub fn field_name(name: &str) -> String {
    escape_rust_keyword(name)
}

/// Compiles a resolved schema into Rust source text. When `conversion` is
/// given, a `conversion` module with `From` impls between this schema and
/// the foreign one is appended.
pub fn compile_schema_to_rust(
    config: &Config,
    schema: &Schema,
    conversion: Option<&ConversionMapping>,
) -> Result<String, CompileError> {
    config.validate()?;
    let read_write = config.sections()?.contains(&Section::ReadWrite);
    let names = Names::new(&config.prefixes);
    let modules = module_path(&config.namespaces.global);
    let mut rust_code: Vec<String> = Vec::new();

    rust_code.push("// Generated by brine-tl-compiler. Do not edit.".to_string());
    rust_code.push(format!(
        "// types: prime={} typeId={} buffer={}",
        config.types.prime.as_deref().unwrap_or("default"),
        config.types.type_id.as_deref().unwrap_or("default"),
        config.types.buffer.as_deref().unwrap_or("default"),
    ));
    for module in &modules {
        rust_code.push(format!("pub mod {} {{", module));
    }
    rust_code.push(ALLOW_LINTS.to_string());
    rust_code.push("".to_string());
    rust_code.push("use brine_tl::{ByteBuffer, ByteBufferMut, TlFunction, TlRead, TlWrite, WireError};".to_string());
    rust_code.push(format!("pub use {}::*;", config.builtin_include));
    rust_code.push("".to_string());

    for combinator in schema.combinators.iter().chain(&schema.functions) {
        rust_code.push(format!(
            "pub const {}: u32 = {:#010x};",
            names.id_name(&combinator.name),
            combinator.id
        ));
    }
    rust_code.push("".to_string());

    for type_def in &schema.types {
        let ctors = constructors(schema, type_def);
        rust_code.push(generate_type(&names, type_def, &ctors));
        for ctor in &ctors {
            rust_code.push(generate_struct(&names.data_name(&ctor.name), &names, ctor));
        }
    }
    for function in &schema.functions {
        rust_code.push(generate_struct(&names.function_name(&function.name), &names, function));
    }

    rust_code.push(generate_creators(config, &names, schema));

    if read_write {
        for type_def in &schema.types {
            let ctors = constructors(schema, type_def);
            rust_code.push(generate_type_read_write(&names, type_def, &ctors));
            for ctor in &ctors {
                rust_code.push(generate_struct_read_write(&names, ctor));
            }
        }
        for function in &schema.functions {
            rust_code.push(generate_function_read_write(&names, function));
        }
    }

    if let Some(mapping) = conversion {
        rust_code.push(mapping.emit(config)?);
    }

    for _ in &modules {
        rust_code.push("}".to_string());
    }
    rust_code.push("".to_string());

    Ok(rust_code.join("\n"))
}

fn constructors<'a>(schema: &'a Schema, type_def: &TypeDef) -> Vec<&'a Combinator> {
    type_def
        .constructors
        .iter()
        .filter_map(|name| schema.combinator(name))
        .collect()
}

/// Generates the declaration of a result type: an enum over its
/// constructors, or a newtype around the only one.
fn generate_type(names: &Names, type_def: &TypeDef, ctors: &[&Combinator]) -> String {
    let type_name = names.type_name(&type_def.name);
    let mut lines = Vec::new();

    if type_def.is_polymorphic() {
        lines.push(DERIVES.to_string());
        lines.push(format!("pub enum {} {{", type_name));
        for ctor in ctors {
            lines.push(format!(
                "    {}({}),",
                names.variant_name(&ctor.name),
                names.data_name(&ctor.name)
            ));
        }
        lines.push("}".to_string());
        lines.push("".to_string());
        lines.push(format!("impl {} {{", type_name));
        lines.push("    pub fn type_id(&self) -> u32 {".to_string());
        lines.push("        match self {".to_string());
        for ctor in ctors {
            lines.push(format!(
                "            Self::{}(_) => {},",
                names.variant_name(&ctor.name),
                names.id_name(&ctor.name)
            ));
        }
        lines.push("        }".to_string());
        lines.push("    }".to_string());
        lines.push("}".to_string());
        for ctor in ctors {
            lines.push("".to_string());
            lines.push(format!("impl From<{}> for {} {{", names.data_name(&ctor.name), type_name));
            lines.push(format!("    fn from(data: {}) -> Self {{", names.data_name(&ctor.name)));
            lines.push(format!("        Self::{}(data)", names.variant_name(&ctor.name)));
            lines.push("    }".to_string());
            lines.push("}".to_string());
        }
    } else if let Some(ctor) = ctors.first() {
        let data_name = names.data_name(&ctor.name);
        lines.push(DERIVES.to_string());
        lines.push(format!("pub struct {}(pub {});", type_name, data_name));
        lines.push("".to_string());
        lines.push(format!("impl {} {{", type_name));
        lines.push("    pub fn type_id(&self) -> u32 {".to_string());
        lines.push(format!("        {}", names.id_name(&ctor.name)));
        lines.push("    }".to_string());
        lines.push("}".to_string());
        lines.push("".to_string());
        lines.push(format!("impl From<{}> for {} {{", data_name, type_name));
        lines.push(format!("    fn from(data: {}) -> Self {{", data_name));
        lines.push("        Self(data)".to_string());
        lines.push("    }".to_string());
        lines.push("}".to_string());
    }

    lines.push("".to_string());
    lines.join("\n")
}

/// Generates a struct holding a combinator's fields in declared order.
fn generate_struct(struct_name: &str, names: &Names, combinator: &Combinator) -> String {
    if combinator.fields.is_empty() {
        return format!("{}\npub struct {} {{}}\n", DERIVES, struct_name);
    }
    let fields = combinator
        .fields
        .iter()
        .map(|field| format!("    pub {}: {},", field_name(&field.name), names.rust_type(&field.type_)))
        .collect::<Vec<_>>();
    format!("{}\npub struct {} {{\n{}\n}}\n", DERIVES, struct_name, fields.join("\n"))
}

/// Generates the construction helpers, inside the creator namespace when
/// one is configured.
fn generate_creators(config: &Config, names: &Names, schema: &Schema) -> String {
    let mut lines = Vec::new();
    let creator = config.namespaces.creator.as_deref().map(to_snake_case);
    if let Some(module) = &creator {
        lines.push(format!("pub mod {} {{", escape_rust_keyword(module)));
        lines.push("use super::*;".to_string());
        lines.push("".to_string());
    }

    let params = |combinator: &Combinator| {
        combinator
            .fields
            .iter()
            .map(|field| format!("{}: {}", field_name(&field.name), names.rust_type(&field.type_)))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let init = |struct_name: &str, combinator: &Combinator| {
        let fields = combinator
            .fields
            .iter()
            .map(|field| field_name(&field.name))
            .collect::<Vec<_>>();
        if fields.is_empty() {
            format!("{} {{}}", struct_name)
        } else {
            format!("{} {{ {} }}", struct_name, fields.join(", "))
        }
    };

    for type_def in &schema.types {
        let type_name = names.type_name(&type_def.name);
        for ctor in constructors(schema, type_def) {
            lines.push(format!(
                "pub fn {}({}) -> {} {{",
                names.construct_name(&ctor.name),
                params(ctor),
                type_name
            ));
            lines.push(format!("    {}::from({})", type_name, init(&names.data_name(&ctor.name), ctor)));
            lines.push("}".to_string());
            lines.push("".to_string());
        }
    }
    for function in &schema.functions {
        let struct_name = names.function_name(&function.name);
        lines.push(format!(
            "pub fn {}({}) -> {} {{",
            names.construct_name(&function.name),
            params(function),
            struct_name
        ));
        lines.push(format!("    {}", init(&struct_name, function)));
        lines.push("}".to_string());
        lines.push("".to_string());
    }

    if creator.is_some() {
        lines.push("}".to_string());
        lines.push("".to_string());
    }
    lines.join("\n")
}

/// `Self { a: ..., b: ... }` reading each field in declared order, with
/// errors tagged by combinator and field.
fn read_fields(combinator: &Combinator, indent: &str) -> String {
    if combinator.fields.is_empty() {
        return "Self {}".to_string();
    }
    let mut lines = vec!["Self {".to_string()];
    for field in &combinator.fields {
        lines.push(format!(
            "{}    {}: TlRead::read(bb).map_err(|e| e.in_field({:?}, {:?}))?,",
            indent,
            field_name(&field.name),
            combinator.name,
            field.name
        ));
    }
    lines.push(format!("{}}}", indent));
    lines.join("\n")
}

fn write_fields(combinator: &Combinator, receiver: &str, indent: &str) -> Vec<String> {
    combinator
        .fields
        .iter()
        .map(|field| format!("{}TlWrite::write(&{}.{}, bb)?;", indent, receiver, field_name(&field.name)))
        .chain(std::iter::once(format!("{}Ok(())", indent)))
        .collect()
}

/// The bare form: fields only, no identifier.
fn generate_struct_read_write(names: &Names, ctor: &Combinator) -> String {
    let data_name = names.data_name(&ctor.name);
    let mut lines = Vec::new();
    lines.push(format!("impl TlRead for {} {{", data_name));
    lines.push("    fn read(bb: &mut ByteBuffer<'_>) -> Result<Self, WireError> {".to_string());
    lines.push(format!("        Ok({})", read_fields(ctor, "        ")));
    lines.push("    }".to_string());
    lines.push("}".to_string());
    lines.push("".to_string());
    lines.push(format!("impl TlWrite for {} {{", data_name));
    lines.push("    fn write(&self, bb: &mut ByteBufferMut) -> Result<(), WireError> {".to_string());
    lines.extend(write_fields(ctor, "self", "        "));
    lines.push("    }".to_string());
    lines.push("}".to_string());
    lines.push("".to_string());
    lines.join("\n")
}

fn unknown_id_arm(type_name: &str) -> String {
    format!(
        "            id => Err(WireError::UnknownId {{ type_name: {:?}.to_owned(), id }}),",
        type_name
    )
}

/// The boxed form: the identifier picks the constructor out of the closed
/// set of the type, then its fields follow.
fn generate_type_read_write(names: &Names, type_def: &TypeDef, ctors: &[&Combinator]) -> String {
    let type_name = names.type_name(&type_def.name);
    let polymorphic = type_def.is_polymorphic();
    let mut lines = Vec::new();

    lines.push(format!("impl TlRead for {} {{", type_name));
    lines.push("    fn read(bb: &mut ByteBuffer<'_>) -> Result<Self, WireError> {".to_string());
    lines.push("        match bb.read_u32()? {".to_string());
    for ctor in ctors {
        let read = format!("<{} as TlRead>::read(bb)?", names.data_name(&ctor.name));
        let value = if polymorphic {
            format!("Self::{}({})", names.variant_name(&ctor.name), read)
        } else {
            format!("Self({})", read)
        };
        lines.push(format!("            self::{} => Ok({}),", names.id_name(&ctor.name), value));
    }
    lines.push(unknown_id_arm(&type_def.name));
    lines.push("        }".to_string());
    lines.push("    }".to_string());
    lines.push("}".to_string());
    lines.push("".to_string());

    lines.push(format!("impl TlWrite for {} {{", type_name));
    lines.push("    fn write(&self, bb: &mut ByteBufferMut) -> Result<(), WireError> {".to_string());
    if polymorphic {
        lines.push("        match self {".to_string());
        for ctor in ctors {
            lines.push(format!("            Self::{}(data) => {{", names.variant_name(&ctor.name)));
            lines.push(format!("                bb.write_u32({});", names.id_name(&ctor.name)));
            lines.push("                TlWrite::write(data, bb)".to_string());
            lines.push("            }".to_string());
        }
        lines.push("        }".to_string());
    } else if let Some(ctor) = ctors.first() {
        lines.push(format!("        bb.write_u32({});", names.id_name(&ctor.name)));
        lines.push("        TlWrite::write(&self.0, bb)".to_string());
    }
    lines.push("    }".to_string());
    lines.push("}".to_string());
    lines.push("".to_string());
    lines.join("\n")
}

/// Functions always travel boxed.
fn generate_function_read_write(names: &Names, function: &Combinator) -> String {
    let struct_name = names.function_name(&function.name);
    let id_name = names.id_name(&function.name);
    let mut lines = Vec::new();

    lines.push(format!("impl TlFunction for {} {{", struct_name));
    lines.push(format!("    const ID: u32 = {};", id_name));
    lines.push(format!("    type Output = {};", names.rust_type(&function.result)));
    lines.push("}".to_string());
    lines.push("".to_string());

    lines.push(format!("impl TlRead for {} {{", struct_name));
    lines.push("    fn read(bb: &mut ByteBuffer<'_>) -> Result<Self, WireError> {".to_string());
    lines.push("        match bb.read_u32()? {".to_string());
    lines.push(format!("            self::{} => Ok({}),", id_name, read_fields(function, "            ")));
    lines.push(unknown_id_arm(&function.name));
    lines.push("        }".to_string());
    lines.push("    }".to_string());
    lines.push("}".to_string());
    lines.push("".to_string());

    lines.push(format!("impl TlWrite for {} {{", struct_name));
    lines.push("    fn write(&self, bb: &mut ByteBufferMut) -> Result<(), WireError> {".to_string());
    lines.push(format!("        bb.write_u32({});", id_name));
    lines.extend(write_fields(function, "self", "        "));
    lines.push("    }".to_string());
    lines.push("}".to_string());
    lines.push("".to_string());
    lines.join("\n")
}
