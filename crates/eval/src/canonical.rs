//! RFC 8785 JSON Canonicalization.
//!
//! Object keys sort by UTF-16 code units, numbers print in ES6
//! shortest form (integral doubles without a fraction, exponents as
//! `e+NN`/`e-NN`), and strings use the minimal two-character escapes
//! plus lowercase `\u00xx` for remaining control characters. The
//! canonical form of equal values is byte-identical, which makes the
//! SHA-256 of a payload reproducible across implementations.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Serialize a JSON value into its canonical form.
pub fn canonicalize(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

/// Lowercase hex SHA-256 of the input bytes.
pub fn sha256_hex(input: &[u8]) -> String {
    format!("{:x}", Sha256::digest(input))
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => write_number(out, n),
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_by(|a, b| utf16_cmp(a, b));
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, key);
                out.push(':');
                write_value(out, &map[key.as_str()]);
            }
            out.push('}');
        }
    }
}

/// Key order is defined on UTF-16 code units, which differs from byte
/// order for characters outside the basic multilingual plane.
fn utf16_cmp(a: &str, b: &str) -> std::cmp::Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}

fn write_number(out: &mut String, n: &serde_json::Number) {
    if let Some(i) = n.as_i64() {
        out.push_str(&i.to_string());
        return;
    }
    if let Some(u) = n.as_u64() {
        out.push_str(&u.to_string());
        return;
    }
    let f = n.as_f64().unwrap_or(0.0);
    if f == 0.0 {
        // Covers negative zero as well.
        out.push('0');
        return;
    }
    if f.fract() == 0.0 && f.abs() < 1e21 {
        out.push_str(&format!("{:.0}", f));
        return;
    }
    // Shortest round-trip form; normalize the exponent to carry an
    // explicit sign as ES6 prints it.
    let text = n.to_string();
    match text.find('e') {
        Some(idx) if !matches!(text.as_bytes().get(idx + 1), Some(b'+') | Some(b'-')) => {
            let (mantissa, exponent) = text.split_at(idx + 1);
            out.push_str(mantissa);
            out.push('+');
            out.push_str(exponent);
        }
        _ => out.push_str(&text),
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{0009}' => out.push_str("\\t"),
            '\u{000A}' => out.push_str("\\n"),
            '\u{000C}' => out.push_str("\\f"),
            '\u{000D}' => out.push_str("\\r"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
