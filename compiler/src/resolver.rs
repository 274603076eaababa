use std::collections::{HashMap, HashSet};

use brine_tl_schema::{Combinator, Field, Primitive, Schema, Template, TypeRef};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info};

use crate::{
    config::Config,
    error::CompileError,
    id::combinator_id,
    types::{self, ParsedSchema, TypeExpr},
    utils::{function_name, lowercase_first, mangle, quote, to_pascal_case},
};

lazy_static! {
    static ref FIELD_NAME: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// The parts of the configuration the resolver needs.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub builtins:  Vec<String>,
    pub templates: Vec<String>,
    pub nullable:  Vec<String>,
}

impl ResolveOptions {
    pub fn from_config(config: &Config) -> ResolveOptions {
        ResolveOptions {
            builtins:  config.builtin.clone(),
            templates: config.builtin_templates.clone(),
            nullable:  config.nullable.clone(),
        }
    }
}

struct Resolver<'a> {
    builtins:  HashMap<&'a str, Primitive>,
    templates: HashMap<&'a str, Template>,
    nullable:  HashSet<&'a str>,
    /// Result type name to its constructors, in declaration order.
    types:     HashMap<&'a str, Vec<&'a types::Combinator>>,
    ctors:     HashMap<&'a str, &'a types::Combinator>,
}

fn schema_error(combinator: &types::Combinator, msg: String) -> CompileError {
    CompileError::Schema {
        combinator: combinator.name.clone(),
        line:       combinator.line,
        msg,
    }
}

/// Records `key` as generated from `name`, returning the other TL name that
/// already generates it.
fn claim<'a>(seen: &mut HashMap<String, &'a str>, key: String, name: &'a str) -> Option<&'a str> {
    match seen.get(&key) {
        Some(&other) if other != name => Some(other),
        Some(_) => None,
        None => {
            seen.insert(key, name);
            None
        }
    }
}

/// Generated names fold `.` into `_` and change case, so distinct TL names
/// may end up as the same Rust item.
fn check_generated_names<'a>(
    constructors: &[&'a types::Combinator],
    functions: &[&'a types::Combinator],
    type_order: &[&'a str],
    types: &HashMap<&'a str, Vec<&'a types::Combinator>>,
) -> Result<(), CompileError> {
    let collision = |combinator: &types::Combinator, what: &str, name: &str, other: &str| {
        schema_error(
            combinator,
            format!("{} {} generates the same name as {}", what, quote(name), quote(other)),
        )
    };

    let mut type_names = HashMap::new();
    for &type_name in type_order {
        if let Some(other) = claim(&mut type_names, mangle(type_name), type_name) {
            if let Some(ctor) = types.get(type_name).and_then(|ctors| ctors.first()) {
                return Err(collision(ctor, "Type", type_name, other));
            }
        }
        let mut variants = HashMap::new();
        for &ctor in types.get(type_name).map(Vec::as_slice).unwrap_or_default() {
            if let Some(other) = claim(&mut variants, to_pascal_case(&ctor.name), &ctor.name) {
                return Err(collision(ctor, "Variant of constructor", &ctor.name, other));
            }
        }
    }

    let mut data_names = HashMap::new();
    for &ctor in constructors {
        if let Some(other) = claim(&mut data_names, mangle(&ctor.name), &ctor.name) {
            return Err(collision(ctor, "Constructor", &ctor.name, other));
        }
    }

    let mut function_names = HashMap::new();
    for &function in functions {
        if let Some(other) = claim(&mut function_names, function_name(&function.name), &function.name) {
            return Err(collision(function, "Function", &function.name, other));
        }
    }

    // Identifier constants and creators share one namespace.
    let mut id_names = HashMap::new();
    for &combinator in constructors.iter().chain(functions) {
        if let Some(other) = claim(&mut id_names, mangle(&combinator.name), &combinator.name) {
            return Err(collision(combinator, "Identifier of", &combinator.name, other));
        }
    }
    Ok(())
}

impl<'a> Resolver<'a> {
    fn builtin(&self, name: &str) -> Option<(&'a str, Primitive)> {
        self.builtins
            .get_key_value(name)
            .or_else(|| self.builtins.get_key_value(lowercase_first(name).as_str()))
            .map(|(name, primitive)| (*name, *primitive))
    }

    fn resolve_type(
        &self,
        expr: &TypeExpr,
        combinator: &types::Combinator,
        field: &types::Field,
    ) -> Result<TypeRef, CompileError> {
        let arity_error = |msg: String| CompileError::TemplateArity {
            combinator: combinator.name.clone(),
            line:       field.line,
            msg,
        };

        if let Some(&template) = self.templates.get(expr.name.as_str()) {
            if expr.args.len() != template.arity() {
                return Err(arity_error(format!(
                    "{} takes {} type argument, found {}",
                    quote(&expr.name),
                    template.arity(),
                    expr.args.len()
                )));
            }
            let args = expr
                .args
                .iter()
                .map(|arg| self.resolve_type(arg, combinator, field))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(TypeRef::Template {
                name: template.name().to_string(),
                template,
                args,
            });
        }

        if !expr.args.is_empty() {
            return Err(arity_error(format!("{} is not a template", quote(&expr.name))));
        }

        if let Some((name, primitive)) = self.builtin(&expr.name) {
            return Ok(TypeRef::Builtin {
                name: name.to_string(),
                primitive,
            });
        }

        if let Some(ctors) = self.types.get(expr.name.as_str()) {
            if expr.bare {
                return match ctors.as_slice() {
                    [single] => Ok(TypeRef::User {
                        name:     single.name.clone(),
                        boxed:    false,
                        nullable: self.nullable.contains(single.name.as_str()),
                    }),
                    _ => Err(schema_error(
                        combinator,
                        format!(
                            "Field {} uses the bare form of {}, which has several constructors",
                            quote(&field.name),
                            quote(&expr.name)
                        ),
                    )),
                };
            }
            return Ok(TypeRef::User {
                name:     expr.name.clone(),
                boxed:    true,
                nullable: self.nullable.contains(expr.name.as_str()),
            });
        }

        if self.ctors.contains_key(expr.name.as_str()) {
            return Ok(TypeRef::User {
                name:     expr.name.clone(),
                boxed:    false,
                nullable: self.nullable.contains(expr.name.as_str()),
            });
        }

        Err(CompileError::UnresolvedType {
            type_name: expr.name.clone(),
            location:  format!(
                "field {} of {} ({}, line {})",
                quote(&field.name),
                combinator.name,
                combinator.file,
                field.line
            ),
        })
    }

    fn resolve_combinator(&self, combinator: &types::Combinator, result: TypeRef) -> Result<Combinator, CompileError> {
        let mut names = HashSet::new();
        let mut fields = Vec::with_capacity(combinator.fields.len());
        for field in &combinator.fields {
            if !FIELD_NAME.is_match(&field.name) {
                return Err(schema_error(combinator, format!("Invalid field name {}", quote(&field.name))));
            }
            if !names.insert(field.name.as_str()) {
                return Err(schema_error(
                    combinator,
                    format!("The field {} is defined twice", quote(&field.name)),
                ));
            }
            fields.push(Field {
                name:  field.name.clone(),
                type_: self.resolve_type(&field.type_, combinator, field)?,
            });
        }
        Ok(Combinator {
            name: combinator.name.clone(),
            id: combinator_id(combinator),
            fields,
            result,
        })
    }

    fn check_nullable(&self) -> Result<(), CompileError> {
        for &name in &self.nullable {
            if self.builtin(name).is_some() || self.templates.contains_key(name) {
                return Err(CompileError::AmbiguousNullable {
                    name: name.to_string(),
                    msg:  "builtin and template types cannot be nullable".to_string(),
                });
            }
            if let Some(ctor) = self.ctors.get(name) {
                if self.nullable.contains(ctor.result.as_str()) {
                    return Err(CompileError::AmbiguousNullable {
                        name: name.to_string(),
                        msg:  format!("its type {} is listed as well", quote(&ctor.result)),
                    });
                }
            } else if !self.types.contains_key(name) {
                return Err(CompileError::UnresolvedType {
                    type_name: name.to_string(),
                    location:  "the nullable list".to_string(),
                });
            }
        }
        Ok(())
    }

    /// A type may only contain itself through a vector, otherwise its values
    /// would be infinitely large.
    fn check_recursion(
        &self,
        name: &'a str,
        fields: &HashMap<&'a str, Vec<String>>,
        state: &mut HashMap<&'a str, u8>,
    ) -> Result<(), CompileError> {
        match state.get(name).copied() {
            Some(1) => {
                let combinator = self.ctors[name];
                return Err(schema_error(
                    combinator,
                    format!("Recursive nesting of {} is not allowed", quote(name)),
                ));
            }
            Some(_) => return Ok(()),
            None => {}
        }
        state.insert(name, 1);
        for target in fields.get(name).into_iter().flatten() {
            let next: Vec<&'a str> = match self.types.get(target.as_str()) {
                Some(ctors) => ctors.iter().map(|c| c.name.as_str()).collect(),
                None => self.ctors.get_key_value(target.as_str()).map(|(k, _)| *k).into_iter().collect(),
            };
            for ctor in next {
                self.check_recursion(ctor, fields, state)?;
            }
        }
        state.insert(name, 2);
        Ok(())
    }
}

/// Resolves every type reference of a parsed schema and validates it as a
/// whole.
pub fn resolve_schema(parsed: &ParsedSchema, options: &ResolveOptions) -> Result<Schema, CompileError> {
    let mut builtins = HashMap::new();
    for name in &options.builtins {
        let primitive = Primitive::from_name(name)
            .ok_or_else(|| CompileError::Config(format!("Unknown builtin {}", quote(name))))?;
        builtins.insert(name.as_str(), primitive);
    }
    let mut templates = HashMap::new();
    for name in &options.templates {
        let template = Template::from_name(name)
            .ok_or_else(|| CompileError::Config(format!("Unknown builtin template {}", quote(name))))?;
        templates.insert(name.as_str(), template);
    }

    let mut resolver = Resolver {
        builtins,
        templates,
        nullable: options.nullable.iter().map(String::as_str).collect(),
        types: HashMap::new(),
        ctors: HashMap::new(),
    };

    // Constructors of builtin types only document the builtin.
    let mut constructors = Vec::new();
    for combinator in parsed.constructors() {
        if resolver.builtin(&combinator.result).is_some() {
            debug!(
                combinator = combinator.name.as_str(),
                "dropping constructor of builtin type {}", combinator.result
            );
            continue;
        }
        if resolver.templates.contains_key(combinator.result.as_str()) {
            return Err(schema_error(
                combinator,
                format!("Result type {} is a builtin template", quote(&combinator.result)),
            ));
        }
        constructors.push(combinator);
    }

    // The constructor set of every type is closed once the whole schema is read.
    let mut type_order: Vec<&str> = Vec::new();
    for &combinator in &constructors {
        resolver.ctors.insert(combinator.name.as_str(), combinator);
        resolver
            .types
            .entry(combinator.result.as_str())
            .or_insert_with(|| {
                type_order.push(combinator.result.as_str());
                Vec::new()
            })
            .push(combinator);
    }

    for &type_name in &type_order {
        if let Some(ctor) = resolver.ctors.get(type_name) {
            if ctor.result != type_name {
                return Err(schema_error(
                    ctor,
                    format!("Type name {} is also used as a constructor name", quote(type_name)),
                ));
            }
        }
    }

    resolver.check_nullable()?;

    let mut combinators = Vec::with_capacity(constructors.len());
    for &combinator in &constructors {
        let result = TypeRef::User {
            name:     combinator.result.clone(),
            boxed:    true,
            nullable: false,
        };
        combinators.push(resolver.resolve_combinator(combinator, result)?);
    }

    let type_names: HashSet<String> = type_order.iter().map(|name| mangle(name)).collect();
    let mut functions = Vec::new();
    for combinator in parsed.functions() {
        if type_names.contains(&function_name(&combinator.name)) {
            return Err(schema_error(
                combinator,
                format!(
                    "Function {} generates the same name as a type",
                    quote(&combinator.name)
                ),
            ));
        }
        let field = types::Field {
            name:   "result".to_string(),
            line:   combinator.line,
            column: combinator.column,
            type_:  TypeExpr::named(&combinator.result),
        };
        let result = resolver.resolve_type(&field.type_, combinator, &field)?;
        functions.push(resolver.resolve_combinator(combinator, result)?);
    }

    let parsed_functions: Vec<&types::Combinator> = parsed.functions().collect();
    check_generated_names(&constructors, &parsed_functions, &type_order, &resolver.types)?;

    // Identifiers must be unique across constructors and functions.
    let mut ids: HashMap<u32, &str> = HashMap::new();
    for (resolved, source) in combinators
        .iter()
        .zip(constructors.iter().copied())
        .chain(functions.iter().zip(parsed_functions.iter().copied()))
    {
        if let Some(other) = ids.insert(resolved.id, resolved.name.as_str()) {
            return Err(schema_error(
                source,
                format!(
                    "Identifier {:#010x} of {} collides with {}",
                    resolved.id,
                    quote(&resolved.name),
                    quote(other)
                ),
            ));
        }
    }

    let mut targets: HashMap<&str, Vec<String>> = HashMap::new();
    for combinator in &combinators {
        // Fields embedded by value, i.e. not behind a vector.
        let out: Vec<String> = combinator
            .fields
            .iter()
            .filter_map(|field| match &field.type_ {
                TypeRef::User { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect();
        if let Some((name, _)) = resolver.ctors.get_key_value(combinator.name.as_str()) {
            targets.insert(*name, out);
        }
    }
    let mut state = HashMap::new();
    for &combinator in &constructors {
        resolver.check_recursion(combinator.name.as_str(), &targets, &mut state)?;
    }

    info!(
        constructors = combinators.len(),
        types = type_order.len(),
        functions = functions.len(),
        "resolved schema"
    );

    Ok(Schema::new(options.builtins.clone(), combinators, functions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_sources, Source};

    fn options(nullable: &[&str]) -> ResolveOptions {
        ResolveOptions {
            builtins:  ["int32", "int64", "string", "bytes"].iter().map(|s| s.to_string()).collect(),
            templates: vec!["vector".to_string()],
            nullable:  nullable.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn resolve_with(text: &str, nullable: &[&str]) -> Result<Schema, CompileError> {
        let parsed = parse_sources(&[Source::new("test.tl", text)], &[])?;
        resolve_schema(&parsed, &options(nullable))
    }

    fn resolve(text: &str) -> Result<Schema, CompileError> {
        resolve_with(text, &[])
    }

    #[test]
    fn resolves_polymorphic_types() {
        let schema = resolve("foo a:int32 b:string = Bar;\nbaz c:int32 = Bar;\nqux = Qux;").unwrap();
        let bar = schema.type_def("Bar").unwrap();
        assert_eq!(bar.constructors, ["foo", "baz"]);
        assert!(bar.is_polymorphic());
        assert!(!schema.type_def("Qux").unwrap().is_polymorphic());
        assert_eq!(
            schema.combinator("foo").unwrap().fields[0].type_,
            TypeRef::Builtin { name: "int32".to_string(), primitive: Primitive::Int32 }
        );
    }

    #[test]
    fn forward_references_resolve() {
        let schema = resolve("holder items:vector<Item> one:item = Holder;\nitem x:int32 = Item;").unwrap();
        let holder = schema.combinator("holder").unwrap();
        assert_eq!(
            holder.fields[0].type_,
            TypeRef::Template {
                name:     "vector".to_string(),
                template: Template::Vector,
                args:     vec![TypeRef::User { name: "Item".to_string(), boxed: true, nullable: false }],
            }
        );
        assert_eq!(
            holder.fields[1].type_,
            TypeRef::User { name: "item".to_string(), boxed: false, nullable: false }
        );
    }

    #[test]
    fn percent_is_the_bare_form() {
        let schema = resolve("key k:bytes = Key;\nwrap k:%Key = Wrap;").unwrap();
        assert_eq!(
            schema.combinator("wrap").unwrap().fields[0].type_,
            TypeRef::User { name: "key".to_string(), boxed: false, nullable: false }
        );
    }

    #[test]
    fn drops_constructors_of_builtins() {
        let schema = resolve("int32 = Int32;\nbytes = Bytes;\nok = Ok;").unwrap();
        assert_eq!(schema.combinators.len(), 1);
        assert!(schema.type_def("Int32").is_none());
    }

    #[test]
    fn boxed_builtin_spelling_resolves() {
        let schema = resolve("m a:Int64 = M;").unwrap();
        assert_eq!(
            schema.combinator("m").unwrap().fields[0].type_,
            TypeRef::Builtin { name: "int64".to_string(), primitive: Primitive::Int64 }
        );
    }

    #[test]
    fn unresolved_type_names_the_field() {
        match resolve("m a:int32\n b:Missing = M;") {
            Err(CompileError::UnresolvedType { type_name, location }) => {
                assert_eq!(type_name, "Missing");
                assert!(location.contains("\"b\""), "{}", location);
                assert!(location.contains("line 2"), "{}", location);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn template_arity_is_checked() {
        assert!(matches!(resolve("m a:vector<int32,string> = M;"), Err(CompileError::TemplateArity { .. })));
        assert!(matches!(resolve("m a:vector = M;"), Err(CompileError::TemplateArity { .. })));
        assert!(matches!(resolve("m a:int32<string> = M;"), Err(CompileError::TemplateArity { .. })));
        assert!(resolve("m a:vector<vector<int32>> = M;").is_ok());
    }

    #[test]
    fn nullable_marks_references() {
        let schema = resolve_with("config c:string = Config;\nopts a:config b:Config = Opts;", &["config"]).unwrap();
        let opts = schema.combinator("opts").unwrap();
        assert!(opts.fields[0].type_.is_nullable());
        assert!(!opts.fields[1].type_.is_nullable());
    }

    #[test]
    fn nullable_conflicts_are_rejected() {
        let text = "config c:string = Config;";
        assert!(matches!(
            resolve_with(text, &["config", "Config"]),
            Err(CompileError::AmbiguousNullable { .. })
        ));
        assert!(matches!(resolve_with(text, &["int32"]), Err(CompileError::AmbiguousNullable { .. })));
        assert!(matches!(resolve_with(text, &["vector"]), Err(CompileError::AmbiguousNullable { .. })));
        assert!(matches!(resolve_with(text, &["nothing"]), Err(CompileError::UnresolvedType { .. })));
    }

    #[test]
    fn identifier_collisions_are_rejected() {
        match resolve("a#00000001 = A;\nb#00000001 = B;") {
            Err(CompileError::Schema { combinator, line, msg }) => {
                assert_eq!(combinator, "b");
                assert_eq!(line, 2);
                assert!(msg.contains("\"a\""));
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn recursion_needs_a_vector() {
        assert!(matches!(resolve("node next:Node = Node;"), Err(CompileError::Schema { .. })));
        assert!(matches!(
            resolve("a b:B = A;\nb a:a = B;"),
            Err(CompileError::Schema { .. })
        ));
        assert!(resolve("node children:vector<Node> = Node;").is_ok());
    }

    #[test]
    fn function_names_may_not_shadow_types() {
        let err = resolve("ok = Ok;\nsendMessage = SendMessage;\n---functions---\nsendMessage = Ok;");
        // The duplicate combinator name is found first.
        assert!(matches!(err, Err(CompileError::Parse { .. })));

        let err = resolve("ok = Ok;\nmessage = DeleteKey;\n---functions---\ndeleteKey = Ok;");
        assert!(matches!(err, Err(CompileError::Schema { .. })));
    }

    #[test]
    fn functions_resolve_their_result() {
        let schema = resolve("ok = Ok;\n---functions---\ndeleteKey key:bytes = Ok;\ncount = Int32;").unwrap();
        assert_eq!(schema.functions.len(), 2);
        assert_eq!(
            schema.function("deleteKey").unwrap().result,
            TypeRef::User { name: "Ok".to_string(), boxed: true, nullable: false }
        );
        assert!(matches!(schema.function("count").unwrap().result, TypeRef::Builtin { .. }));
        assert!(schema.combinator("deleteKey").is_none());
    }

    #[test]
    fn generated_names_must_be_unique() {
        let schema_msg = |text: &str| match resolve(text) {
            Err(CompileError::Schema { combinator, msg, .. }) => (combinator, msg),
            other => panic!("expected a Schema error but got {:?}", other.map(|s| s.combinators)),
        };

        let (combinator, msg) = schema_msg("fooBar = X;\nfoo_bar = X;");
        assert_eq!(combinator, "foo_bar");
        assert!(msg.contains("\"fooBar\""), "{}", msg);

        let (combinator, _) = schema_msg("a.b = Y;\na_b = Z;");
        assert_eq!(combinator, "a_b");

        let (combinator, _) = schema_msg("x = a.B;\ny = a_B;");
        assert_eq!(combinator, "y");

        let (combinator, _) = schema_msg("ok = Ok;\n---functions---\nfooBar = Ok;\nFooBar = Ok;");
        assert_eq!(combinator, "FooBar");

        assert!(resolve("fooBar = X;\nfoo_bar = Y;").is_ok());
    }
}
