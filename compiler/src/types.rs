use serde::Serialize;
use std::collections::HashSet;

use crate::error::CompileError;

/// Which part of a schema file a declaration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Section {
    Types,
    Functions,
}

/// A field type as written, before resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeExpr {
    pub name: String,
    pub args: Vec<TypeExpr>,
    /// Written with a leading `%`.
    pub bare: bool,
}

impl TypeExpr {
    pub fn named(name: &str) -> TypeExpr {
        TypeExpr {
            name: name.to_string(),
            args: Vec::new(),
            bare: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name:   String,
    pub line:   usize,
    pub column: usize,
    pub type_:  TypeExpr,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Combinator {
    pub name:        String,
    pub explicit_id: Option<u32>,
    pub fields:      Vec<Field>,
    pub result:      String,
    pub section:     Section,
    pub file:        String,
    pub line:        usize,
    pub column:      usize,
}

/// The declarations of one schema, in source order.
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct ParsedSchema {
    pub combinators: Vec<Combinator>,
    #[serde(skip)]
    names:           HashSet<String>,
}

impl ParsedSchema {
    pub fn new() -> ParsedSchema {
        ParsedSchema::default()
    }

    /// Appends a declaration, rejecting a name that was already declared.
    pub fn add(&mut self, combinator: Combinator) -> Result<(), CompileError> {
        if !self.names.insert(combinator.name.clone()) {
            return Err(CompileError::Parse {
                file:   combinator.file.clone(),
                line:   combinator.line,
                column: combinator.column,
                msg:    format!("The combinator {} is defined twice", crate::utils::quote(&combinator.name)),
            });
        }
        self.combinators.push(combinator);
        Ok(())
    }

    pub fn extend(&mut self, other: ParsedSchema) -> Result<(), CompileError> {
        for combinator in other.combinators {
            self.add(combinator)?;
        }
        Ok(())
    }

    pub fn constructors(&self) -> impl Iterator<Item = &Combinator> {
        self.combinators.iter().filter(|c| c.section == Section::Types)
    }

    pub fn functions(&self) -> impl Iterator<Item = &Combinator> {
        self.combinators.iter().filter(|c| c.section == Section::Functions)
    }
}
