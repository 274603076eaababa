use serde::Serialize;
use std::collections::HashMap;

/// Wire representation of a builtin type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Primitive {
    Int32,
    Int53,
    Int64,
    Double,
    String,
    Bytes,
    SecureString,
    SecureBytes,
    Bool,
}

impl Primitive {
    pub const ALL: [Primitive; 9] = [
        Primitive::Int32,
        Primitive::Int53,
        Primitive::Int64,
        Primitive::Double,
        Primitive::String,
        Primitive::Bytes,
        Primitive::SecureString,
        Primitive::SecureBytes,
        Primitive::Bool,
    ];

    /// The builtin name a configuration uses for this primitive.
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Int32 => "int32",
            Primitive::Int53 => "int53",
            Primitive::Int64 => "int64",
            Primitive::Double => "double",
            Primitive::String => "string",
            Primitive::Bytes => "bytes",
            Primitive::SecureString => "secureString",
            Primitive::SecureBytes => "secureBytes",
            Primitive::Bool => "bool",
        }
    }

    pub fn from_name(name: &str) -> Option<Primitive> {
        Primitive::ALL.into_iter().find(|p| p.name() == name)
    }
}

/// Generic builtin types. TL only has the homogeneous sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Template {
    Vector,
}

impl Template {
    pub fn name(self) -> &'static str {
        match self {
            Template::Vector => "vector",
        }
    }

    pub fn arity(self) -> usize {
        1
    }

    pub fn from_name(name: &str) -> Option<Template> {
        match name {
            "vector" => Some(Template::Vector),
            _ => None,
        }
    }
}

/// A resolved field type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TypeRef {
    Builtin {
        name:      String,
        primitive: Primitive,
    },
    /// A boxed reference names a result type and carries the constructor
    /// identifier on the wire; a bare reference names a single constructor
    /// and carries only its fields.
    User {
        name:     String,
        boxed:    bool,
        nullable: bool,
    },
    Template {
        name:     String,
        template: Template,
        args:     Vec<TypeRef>,
    },
}

impl TypeRef {
    pub fn is_nullable(&self) -> bool {
        matches!(self, TypeRef::User { nullable: true, .. })
    }

    pub fn name(&self) -> &str {
        match self {
            TypeRef::Builtin { name, .. }
            | TypeRef::User { name, .. }
            | TypeRef::Template { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name:  String,
    #[serde(rename = "type")]
    pub type_: TypeRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Combinator {
    pub name:   String,
    pub id:     u32,
    pub fields: Vec<Field>,
    pub result: TypeRef,
}

impl Combinator {
    /// The result type name of a constructor.
    pub fn result_name(&self) -> &str {
        self.result.name()
    }
}

/// A result type and the closed, ordered set of constructors producing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeDef {
    pub name:         String,
    pub constructors: Vec<String>,
}

impl TypeDef {
    pub fn is_polymorphic(&self) -> bool {
        self.constructors.len() > 1
    }
}

/// A fully resolved schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    pub builtins:     Vec<String>,
    pub types:        Vec<TypeDef>,
    pub combinators:  Vec<Combinator>,
    pub functions:    Vec<Combinator>,
    #[serde(skip)]
    combinator_index: HashMap<String, usize>,
    #[serde(skip)]
    function_index:   HashMap<String, usize>,
    #[serde(skip)]
    id_index:         HashMap<u32, usize>,
    #[serde(skip)]
    type_index:       HashMap<String, usize>,
}

impl Schema {
    /// Builds the lookup tables and groups constructors by result type in
    /// declaration order.
    pub fn new(
        builtins: Vec<String>,
        combinators: Vec<Combinator>,
        functions: Vec<Combinator>,
    ) -> Schema {
        let mut types: Vec<TypeDef> = Vec::new();
        let mut type_index = HashMap::new();
        for c in &combinators {
            let name = c.result_name();
            let index = *type_index.entry(name.to_owned()).or_insert_with(|| {
                types.push(TypeDef {
                    name:         name.to_owned(),
                    constructors: Vec::new(),
                });
                types.len() - 1
            });
            types[index].constructors.push(c.name.clone());
        }

        let combinator_index = combinators
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();
        let function_index = functions
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();
        let id_index = combinators
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id, i))
            .collect();

        Schema {
            builtins,
            types,
            combinators,
            functions,
            combinator_index,
            function_index,
            id_index,
            type_index,
        }
    }

    pub fn combinator(&self, name: &str) -> Option<&Combinator> {
        self.combinator_index.get(name).map(|&i| &self.combinators[i])
    }

    /// Constructor lookup by wire identifier.
    pub fn combinator_by_id(&self, id: u32) -> Option<&Combinator> {
        self.id_index.get(&id).map(|&i| &self.combinators[i])
    }

    pub fn function(&self, name: &str) -> Option<&Combinator> {
        self.function_index.get(name).map(|&i| &self.functions[i])
    }

    pub fn type_def(&self, name: &str) -> Option<&TypeDef> {
        self.type_index.get(name).map(|&i| &self.types[i])
    }

    pub fn has_builtin(&self, name: &str) -> bool {
        self.builtins.iter().any(|b| b == name)
    }
}
