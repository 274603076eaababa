use crate::{
    error::CompileError,
    tokenizer::{tokenize_schema, Token},
    types::{Combinator, Field, ParsedSchema, Section, TypeExpr},
    utils::{error, quote},
};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

lazy_static! {
    static ref IDENTIFIER:     Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*$").unwrap();
    static ref EXPLICIT_ID:    Regex = Regex::new(r"^#[0-9a-fA-F]{1,8}$").unwrap();
    static ref SECTION_MARKER: Regex = Regex::new(r"^---[a-z]+---$").unwrap();
}

/// One schema input file.
#[derive(Debug, Clone)]
pub struct Source {
    pub name: String,
    pub text: String,
}

impl Source {
    pub fn new(name: &str, text: &str) -> Source {
        Source {
            name: name.to_string(),
            text: text.to_string(),
        }
    }

    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Source, CompileError> {
        let path = path.as_ref();
        Ok(Source {
            name: path.display().to_string(),
            text: std::fs::read_to_string(path)?,
        })
    }
}

/// Renders a declaration's tokens the way skip entries are compared.
fn normalize(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalizes `skip` entries so they can be compared against declarations
/// regardless of the whitespace they were written with.
pub fn normalize_skip(skip: &[String]) -> Result<HashSet<String>, CompileError> {
    skip.iter()
        .map(|entry| {
            let mut tokens = tokenize_schema("<skip>", entry)
                .map_err(|_| CompileError::Config(format!("Invalid skip entry {}", quote(entry))))?;
            tokens.pop();
            Ok(normalize(&tokens))
        })
        .collect()
}

/// Parses the tokens of one schema file.
pub fn parse_schema(file: &str, tokens: &[Token], skip: &HashSet<String>) -> Result<ParsedSchema, CompileError> {
    let mut schema  = ParsedSchema::new();
    let mut section = Section::Types;
    let mut index   = 0;

    while index < tokens.len() && !tokens[index].is_eof() {
        let token = &tokens[index];
        if SECTION_MARKER.is_match(&token.text) {
            section = match token.text.as_str() {
                "---types---" => Section::Types,
                "---functions---" => Section::Functions,
                other => {
                    return Err(error(
                        file,
                        &format!("Unknown section marker {}", quote(other)),
                        token.line,
                        token.column,
                    ))
                }
            };
            index += 1;
            continue;
        }

        let start = index;
        while !tokens[index].is_eof()
            && tokens[index].text != ";"
            && !SECTION_MARKER.is_match(&tokens[index].text)
        {
            index += 1;
        }
        let end = &tokens[index];
        if end.text != ";" {
            return Err(error(
                file,
                &format!("Expected \";\" but found {}", quote(&end.text)),
                end.line,
                end.column,
            ));
        }
        index += 1;

        // Includes the terminating ";".
        let declaration = &tokens[start..index];
        if skip.contains(&normalize(declaration)) {
            debug!(file, line = declaration[0].line, "skipping {}", normalize(declaration));
            continue;
        }

        schema.add(parse_declaration(file, declaration, section)?)?;
    }

    Ok(schema)
}

/// Parses every source of one schema, in order, into a single model.
pub fn parse_sources(sources: &[Source], skip: &[String]) -> Result<ParsedSchema, CompileError> {
    let skip = normalize_skip(skip)?;
    let mut schema = ParsedSchema::new();
    for source in sources {
        let tokens = tokenize_schema(&source.name, &source.text)?;
        schema.extend(parse_schema(&source.name, &tokens, &skip)?)?;
    }
    Ok(schema)
}

/// A cursor over the tokens of a single `;` terminated declaration.
struct Cursor<'a> {
    file:   &'a str,
    tokens: &'a [Token],
    index:  usize,
}

impl<'a> Cursor<'a> {
    fn current(&self) -> &'a Token {
        // The last token is always the ";".
        &self.tokens[self.index.min(self.tokens.len() - 1)]
    }

    fn peek(&self, text: &str) -> bool {
        self.current().text == text
    }

    fn eat(&mut self, text: &str) -> bool {
        if self.peek(text) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn fail(&self, msg: &str) -> CompileError {
        let token = self.current();
        error(self.file, msg, token.line, token.column)
    }

    fn unexpected(&self, expected: &str) -> CompileError {
        self.fail(&format!("Expected {} but found {}", expected, quote(&self.current().text)))
    }

    fn expect(&mut self, text: &str) -> Result<(), CompileError> {
        if !self.eat(text) {
            return Err(self.unexpected(&quote(text)));
        }
        Ok(())
    }

    fn identifier(&mut self, what: &str) -> Result<&'a Token, CompileError> {
        let token = self.current();
        match token.text.as_str() {
            "#" => Err(self.fail("Natural number types are not supported")),
            text if IDENTIFIER.is_match(text) => {
                self.index += 1;
                Ok(token)
            }
            _ => Err(self.unexpected(what)),
        }
    }
}

fn parse_declaration(file: &str, tokens: &[Token], section: Section) -> Result<Combinator, CompileError> {
    let mut cursor = Cursor { file, tokens, index: 0 };

    let name = cursor.identifier("combinator name")?;

    let mut explicit_id = None;
    if EXPLICIT_ID.is_match(&cursor.current().text) {
        let token = cursor.current();
        explicit_id = Some(
            u32::from_str_radix(&token.text[1..], 16)
                .map_err(|_| cursor.fail(&format!("Invalid identifier {}", quote(&token.text))))?,
        );
        cursor.index += 1;
    }

    let mut fields: Vec<Field> = Vec::new();
    while !cursor.eat("=") {
        match cursor.current().text.as_str() {
            ";" => return Err(cursor.unexpected("\"=\"")),
            "{" => return Err(cursor.fail("Type parameters are not supported")),
            "[" => return Err(cursor.fail("Repeated field groups are not supported")),
            _ => {}
        }
        let field_name = cursor.identifier("field name")?;
        cursor.expect(":")?;
        let type_ = parse_type(&mut cursor)?;
        fields.push(Field {
            name:   field_name.text.clone(),
            line:   field_name.line,
            column: field_name.column,
            type_,
        });
    }

    if cursor.peek(";") {
        return Err(cursor.fail("Missing result type"));
    }
    let result = cursor.identifier("result type")?;
    if !cursor.peek(";") {
        if cursor.peek("<") || IDENTIFIER.is_match(&cursor.current().text) {
            return Err(cursor.fail("Parameterized result types are not supported"));
        }
        return Err(cursor.unexpected("\";\""));
    }

    Ok(Combinator {
        name: name.text.clone(),
        explicit_id,
        fields,
        result: result.text.clone(),
        section,
        file: file.to_string(),
        line: name.line,
        column: name.column,
    })
}

/// `type := ['%'] ident ['<' type {',' type} '>'] | '(' ident type+ ')'`
fn parse_type(cursor: &mut Cursor) -> Result<TypeExpr, CompileError> {
    let bare = cursor.eat("%");

    if cursor.eat("(") {
        let name = cursor.identifier("type name")?;
        let mut args = Vec::new();
        while !cursor.eat(")") {
            if cursor.peek(";") {
                return Err(cursor.unexpected("\")\""));
            }
            args.push(parse_type(cursor)?);
        }
        if args.is_empty() {
            return Err(cursor.fail("Expected at least one type argument"));
        }
        return Ok(TypeExpr { name: name.text.clone(), args, bare });
    }

    let name = cursor.identifier("type name")?;
    if cursor.peek("?") {
        return Err(cursor.fail("Conditional fields are not supported"));
    }

    let mut args = Vec::new();
    if cursor.eat("<") {
        loop {
            args.push(parse_type(cursor)?);
            if cursor.eat(">") {
                break;
            }
            cursor.expect(",")?;
        }
    }

    Ok(TypeExpr { name: name.text.clone(), args, bare })
}
