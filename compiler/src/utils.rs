use crate::error::CompileError;

pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

pub fn error(file: &str, msg: &str, line: usize, column: usize) -> CompileError {
    CompileError::Parse {
        file: file.to_string(),
        line,
        column,
        msg: msg.to_string(),
    }
}

/// Turns a TL name into a Rust identifier fragment: `storage.walletEntry`
/// becomes `storage_walletEntry`.
pub fn mangle(name: &str) -> String {
    name.replace('.', "_")
}

pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().to_string() + chars.as_str(),
    }
}

pub fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_lowercase().to_string() + chars.as_str(),
    }
}

/// Name suffix of the struct generated for a function, without the type
/// prefix. `deleteKey` becomes `DeleteKey`.
pub fn function_name(name: &str) -> String {
    capitalize_first(&mangle(name))
}

/// Converts a TL name to PascalCase, treating `.` and `_` as word breaks and
/// keeping the casing inside each word: `storage.walletEntry` becomes
/// `StorageWalletEntry`.
pub fn to_pascal_case(s: &str) -> String {
    s.split(|c| c == '.' || c == '_')
        .filter(|word| !word.is_empty())
        .map(capitalize_first)
        .collect::<String>()
}

/// Converts a string to snake_case.
/// This implementation avoids inserting underscores between consecutive uppercase letters,
/// so that acronyms remain intact (e.g. "sessionID" becomes "session_id").
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut snake = String::new();
    for i in 0..chars.len() {
        let c = chars[i];
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                // Insert an underscore if the previous character is not uppercase,
                // or if the next character exists and is lowercase.
                if prev != '_'
                    && (!prev.is_uppercase() || (i + 1 < chars.len() && chars[i + 1].is_lowercase()))
                {
                    snake.push('_');
                }
            }
            snake.extend(c.to_lowercase());
        } else {
            snake.push(c);
        }
    }
    snake
}

/// Escapes Rust reserved keywords by suffixing with an underscore.
pub fn escape_rust_keyword(s: &str) -> String {
    let keywords = [
        "abstract", "as", "async", "await", "become", "box", "break", "const",
        "continue", "crate", "do", "dyn", "else", "enum", "extern", "false",
        "final", "fn", "for", "if", "impl", "in", "let", "loop", "macro",
        "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
        "return", "self", "Self", "static", "struct", "super", "trait", "true",
        "try", "type", "typeof", "unsafe", "unsized", "use", "virtual", "where",
        "while", "yield",
    ];
    if keywords.contains(&s) {
        format!("{}_", s)
    } else {
        s.to_string()
    }
}

/// Splits a `::` separated namespace into snake_case module names.
pub fn module_path(namespace: &str) -> Vec<String> {
    namespace
        .split("::")
        .filter(|segment| !segment.is_empty())
        .map(|segment| escape_rust_keyword(&to_snake_case(segment)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pascal_case_keeps_inner_casing() {
        assert_eq!(to_pascal_case("boolTrue"), "BoolTrue");
        assert_eq!(to_pascal_case("storage.walletEntry"), "StorageWalletEntry");
        assert_eq!(to_pascal_case("raw_message"), "RawMessage");
    }

    #[test]
    fn snake_case_keeps_acronyms() {
        assert_eq!(to_snake_case("Ton"), "ton");
        assert_eq!(to_snake_case("TonlibApi"), "tonlib_api");
        assert_eq!(to_snake_case("sessionID"), "session_id");
        assert_eq!(to_snake_case("tonlib_api"), "tonlib_api");
        assert_eq!(to_snake_case("Tonlib_Api"), "tonlib_api");
    }

    #[test]
    fn module_path_splits_namespaces() {
        assert_eq!(module_path("Ton::details"), ["ton", "details"]);
        assert_eq!(module_path("Ton"), ["ton"]);
    }

    #[test]
    fn keywords_are_escaped() {
        assert_eq!(escape_rust_keyword("type"), "type_");
        assert_eq!(escape_rust_keyword("async"), "async_");
        assert_eq!(escape_rust_keyword("key"), "key");
    }

    #[test]
    fn function_names_are_capitalized() {
        assert_eq!(function_name("deleteKey"), "DeleteKey");
        assert_eq!(function_name("wallet.getAddress"), "Wallet_getAddress");
    }
}
