//! Canonical, stable rendering of values.
//!
//! Two renderings exist: the *plain* form used for `%s`, `string()`, and
//! `Display` (strings and bytes appear raw), and the *quoted* form used for
//! elements inside containers (strings quoted and escaped, bytes prefixed,
//! timestamps and durations wrapped in their constructor syntax). Map entries
//! render sorted by their quoted key so the output is independent of
//! insertion order.

use core::fmt::Write as _;

use chrono::{SecondsFormat, TimeDelta};

use crate::values::Val;

/// Render a duration as seconds with up to nine fractional digits, trailing
/// zeros trimmed: `123.000000456s`, `60s`, `-0.5s`.
pub fn format_duration(d: &TimeDelta) -> String {
    let mut secs = d.num_seconds();
    let mut nanos = d.subsec_nanos();
    // chrono splits -1.5s into -1s and -500ms; render the sign once.
    let negative = secs < 0 || nanos < 0;
    if negative {
        secs = -secs;
        nanos = -nanos;
    }
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    let _ = write!(out, "{}", secs);
    if nanos > 0 {
        let mut frac = format!("{:09}", nanos);
        while frac.ends_with('0') {
            frac.pop();
        }
        let _ = write!(out, ".{}", frac);
    }
    out.push('s');
    out
}

fn format_double(d: f64) -> String {
    if d.is_nan() {
        return "NaN".to_string();
    }
    if d == f64::INFINITY {
        return "+Inf".to_string();
    }
    if d == f64::NEG_INFINITY {
        return "-Inf".to_string();
    }
    let s = d.to_string();
    if s.contains('.') || s.contains('e') || s.contains('E') {
        s
    } else {
        format!("{}.0", s)
    }
}

/// The unquoted rendering: raw strings and bytes, `null`, decimal numbers.
pub fn render_plain(v: &Val) -> String {
    match v {
        Val::Null => "null".to_string(),
        Val::Bool(b) => b.to_string(),
        Val::Int(i) => i.to_string(),
        Val::Uint(u) => u.to_string(),
        Val::Double(d) => format_double(*d),
        Val::String(s) => s.to_string(),
        Val::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        Val::Duration(d) => format_duration(d),
        Val::Timestamp(t) => t.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        Val::List(_) | Val::Map(_) | Val::Struct(_) | Val::Optional(_) => render_quoted(v),
        Val::Type(name) => name.to_string(),
        Val::Error(e) => format!("<error: {}>", e.message),
        Val::Unknown(u) => {
            let mut out = String::from("<unknown: {");
            for (i, attr) in u.attributes.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(attr);
            }
            out.push_str("}>");
            out
        }
    }
}

/// The rendering used for container elements.
pub fn render_quoted(v: &Val) -> String {
    match v {
        Val::String(s) => {
            let mut out = String::with_capacity(s.len() + 2);
            out.push('"');
            for c in s.chars() {
                if c == '\\' || c == '"' {
                    out.push('\\');
                }
                out.push(c);
            }
            out.push('"');
            out
        }
        Val::Bytes(b) => {
            let text: std::sync::Arc<str> = String::from_utf8_lossy(b).into_owned().into();
            format!("b{}", render_quoted(&Val::String(text)))
        }
        Val::Duration(d) => format!("duration(\"{}\")", format_duration(d)),
        Val::Timestamp(t) => format!(
            "timestamp(\"{}\")",
            t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
        ),
        Val::Double(d) if d.is_nan() => "\"NaN\"".to_string(),
        Val::Double(d) if *d == f64::INFINITY => "\"+Inf\"".to_string(),
        Val::Double(d) if *d == f64::NEG_INFINITY => "\"-Inf\"".to_string(),
        Val::List(elems) => {
            let mut out = String::from("[");
            for (i, e) in elems.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&render_quoted(e));
            }
            out.push(']');
            out
        }
        Val::Map(m) => {
            let mut rendered: Vec<(String, String)> = m
                .iter()
                .map(|(k, v)| (render_quoted(k), render_quoted(v)))
                .collect();
            rendered.sort_by(|a, b| a.0.cmp(&b.0));
            let mut out = String::from("{");
            for (i, (k, v)) in rendered.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(k);
                out.push(':');
                out.push_str(v);
            }
            out.push('}');
            out
        }
        Val::Struct(s) => {
            let mut out = String::new();
            let _ = write!(out, "{}{{", s.type_name);
            for (i, (name, value)) in s.fields().iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{}: {}", name, render_quoted(value));
            }
            out.push('}');
            out
        }
        Val::Optional(None) => "optional.none()".to_string(),
        Val::Optional(Some(inner)) => format!("optional.of({})", render_quoted(inner)),
        _ => render_plain(v),
    }
}

impl core::fmt::Display for Val {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&render_plain(self))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::DateTime;

    use super::*;
    use crate::values::MapVal;

    #[test]
    fn plain_rendering() {
        assert_eq!(render_plain(&Val::Null), "null");
        assert_eq!(render_plain(&Val::Int(-3)), "-3");
        assert_eq!(render_plain(&Val::Uint(3)), "3");
        assert_eq!(render_plain(&Val::Double(2.5)), "2.5");
        assert_eq!(render_plain(&Val::Double(2.0)), "2.0");
        assert_eq!(render_plain(&Val::Double(f64::NAN)), "NaN");
        assert_eq!(render_plain(&Val::string("hi")), "hi");
    }

    #[test]
    fn list_rendering_quotes_strings() {
        let v = Val::list(vec![Val::string("a"), Val::Int(1)]);
        assert_eq!(render_plain(&v), "[\"a\", 1]");
    }

    #[test]
    fn map_rendering_sorts_by_key() {
        let m = MapVal::from_entries(vec![
            (Val::string("b"), Val::Int(2)),
            (Val::string("a"), Val::Int(1)),
        ])
        .unwrap();
        assert_eq!(render_plain(&Val::Map(Arc::new(m))), "{\"a\":1, \"b\":2}");
    }

    #[test]
    fn duration_rendering_trims_zeros() {
        let d = TimeDelta::new(123, 456).unwrap();
        assert_eq!(format_duration(&d), "123.000000456s");
        assert_eq!(format_duration(&TimeDelta::seconds(60)), "60s");
        assert_eq!(format_duration(&TimeDelta::milliseconds(-500)), "-0.5s");
        assert_eq!(format_duration(&TimeDelta::milliseconds(1500)), "1.5s");
    }

    #[test]
    fn timestamp_rendering_is_rfc3339() {
        let t = DateTime::parse_from_rfc3339("2024-03-01T10:00:00Z")
            .unwrap()
            .to_utc();
        assert_eq!(render_plain(&Val::Timestamp(t)), "2024-03-01T10:00:00Z");
    }

    #[test]
    fn error_and_unknown_rendering() {
        assert_eq!(
            render_plain(&Val::error(7, "division by zero")),
            "<error: division by zero>"
        );
        let u = Val::Unknown(Arc::new(
            crate::values::UnknownSet::single("x").union(&crate::values::UnknownSet::single("a.b")),
        ));
        assert_eq!(render_plain(&u), "<unknown: {a.b, x}>");
    }
}
