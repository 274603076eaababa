//! Combinator identifiers.
//!
//! An identifier is the CRC-32 (IEEE 802.3) of the combinator's canonical
//! signature, the same value TL tooling prints after `#` in schema dumps.

use crate::types::{Combinator, TypeExpr};

const CRC_TABLE: [u32; 256] = make_table();

const fn make_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut c = i as u32;
        let mut k = 0;
        while k < 8 {
            c = if c & 1 != 0 { 0xEDB8_8320 ^ (c >> 1) } else { c >> 1 };
            k += 1;
        }
        table[i] = c;
        i += 1;
    }
    table
}

pub fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = !0u32;
    for &byte in bytes {
        crc = CRC_TABLE[((crc ^ byte as u32) & 0xff) as usize] ^ (crc >> 8);
    }
    !crc
}

/// Renders a field type the way it appears in a canonical signature.
/// Template arguments are separated by spaces: `vector<int32>` becomes
/// `vector int32`.
pub fn canonical_type(expr: &TypeExpr) -> String {
    let mut out = String::new();
    if expr.bare {
        out.push('%');
    }
    out.push_str(&expr.name);
    for arg in &expr.args {
        out.push(' ');
        out.push_str(&canonical_type(arg));
    }
    out
}

/// `name field:type ... = Result`, independent of the source formatting.
pub fn canonical_signature(combinator: &Combinator) -> String {
    let mut out = combinator.name.clone();
    for field in &combinator.fields {
        out.push(' ');
        out.push_str(&field.name);
        out.push(':');
        out.push_str(&canonical_type(&field.type_));
    }
    out.push_str(" = ");
    out.push_str(&combinator.result);
    out
}

/// The wire identifier of a combinator. An identifier written in the source
/// with `#` takes precedence over the computed one.
pub fn combinator_id(combinator: &Combinator) -> u32 {
    combinator
        .explicit_id
        .unwrap_or_else(|| crc32(canonical_signature(combinator).as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_sources, Source};
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn first(text: &str) -> Combinator {
        parse_sources(&[Source::new("test.tl", text)], &[])
            .unwrap()
            .combinators
            .remove(0)
    }

    #[test]
    fn crc32_check_value() {
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(crc32(b""), 0);
    }

    #[test]
    fn known_identifiers() {
        assert_eq!(combinator_id(&first("boolTrue = Bool;")), 0x997275b5);
        assert_eq!(combinator_id(&first("boolFalse = Bool;")), 0xbc799737);
        assert_eq!(combinator_id(&first("null = Null;")), 0x56730bcc);
    }

    #[test]
    fn signature_ignores_formatting() {
        let a = first("m  rows:vector<vector<int32>>   ref:%key = M ;");
        let b = first("m rows:vector<vector<int32>> ref:%key=M;");
        assert_eq!(canonical_signature(&a), "m rows:vector vector int32 ref:%key = M");
        assert_eq!(combinator_id(&a), combinator_id(&b));
    }

    #[test]
    fn signature_is_case_sensitive() {
        assert_ne!(combinator_id(&first("foo = Bar;")), combinator_id(&first("Foo = Bar;")));
    }

    #[test]
    fn explicit_identifier_wins() {
        assert_eq!(combinator_id(&first("foo#0000abcd = Bar;")), 0xabcd);
    }

    #[test]
    fn synthetic_schema_has_no_collisions() {
        let mut text = String::new();
        for i in 0..2000 {
            text.push_str(&format!("item{} value:int32 index{}:vector<string> = Item{};\n", i, i, i % 37));
        }
        let schema = parse_sources(&[Source::new("synthetic.tl", &text)], &[]).unwrap();

        let mut seen: HashMap<u32, &str> = HashMap::new();
        for combinator in &schema.combinators {
            if let Some(other) = seen.insert(combinator_id(combinator), &combinator.name) {
                panic!("{} collides with {}", combinator.name, other);
            }
        }
        assert_eq!(seen.len(), 2000);
    }

    proptest! {
        #[test]
        fn identifiers_are_deterministic(
            name in "[a-z][A-Za-z0-9]{0,12}",
            fields in proptest::collection::vec(("[a-z][a-z0-9_]{0,8}", "(int32|string|bytes|Foo)"), 0..6),
        ) {
            let mut text = name.clone();
            for (field, ty) in &fields {
                text.push_str(&format!(" {}:{}", field, ty));
            }
            text.push_str(" = Result;");

            let spaced = text.replace(' ', "   ").replace(':', " : ");
            prop_assert_eq!(combinator_id(&first(&text)), combinator_id(&first(&text)));
            prop_assert_eq!(combinator_id(&first(&text)), combinator_id(&first(&spaced)));
        }
    }
}
