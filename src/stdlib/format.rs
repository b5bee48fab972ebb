//! Format-string interpolation (`'x is %d'.format([x])`).
//!
//! Supported clauses: `%s` (canonical rendering), `%d` (decimal), `%f`
//! (fixed, optional `.N` precision), `%e` (scientific), `%b` (binary),
//! `%x`/`%X` (hex), `%o` (octal), and `%%`. An unrecognized clause or a
//! value the clause cannot render produces an error message for the caller
//! to wrap in an error value.

use core::fmt::Write as _;

use crate::values::{render, Val};

pub fn format_values(template: &str, args: &[Val]) -> Result<String, String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    let mut next_arg = 0usize;

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }

        // Optional precision, only meaningful for %f and %e.
        let mut precision: Option<usize> = None;
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut digits = String::new();
            while let Some(d) = chars.peek() {
                if d.is_ascii_digit() {
                    digits.push(*d);
                    chars.next();
                } else {
                    break;
                }
            }
            if digits.is_empty() {
                return Err("unable to find end of precision specifier".to_string());
            }
            precision = Some(
                digits
                    .parse()
                    .map_err(|_| "unable to parse precision specifier".to_string())?,
            );
        }

        let verb = chars
            .next()
            .ok_or_else(|| "unterminated formatting clause".to_string())?;
        let arg = args.get(next_arg).ok_or_else(|| {
            format!("index {} out of range", next_arg)
        })?;
        next_arg += 1;

        match verb {
            's' => out.push_str(&render::render_plain(arg)),
            'd' => match arg {
                Val::Int(i) => {
                    let _ = write!(out, "{}", i);
                }
                Val::Uint(u) => {
                    let _ = write!(out, "{}", u);
                }
                other => {
                    return Err(format!(
                        "%d expects an integer, found {}",
                        other.kind().name()
                    ))
                }
            },
            'f' => match arg {
                Val::Double(d) => {
                    let _ = write!(out, "{:.*}", precision.unwrap_or(6), d);
                }
                Val::Duration(d) => out.push_str(&render::format_duration(d)),
                other => {
                    return Err(format!(
                        "%f expects a double or duration, found {}",
                        other.kind().name()
                    ))
                }
            },
            'e' => match arg {
                Val::Double(d) => out.push_str(&scientific(*d, precision.unwrap_or(6))),
                other => {
                    return Err(format!(
                        "%e expects a double, found {}",
                        other.kind().name()
                    ))
                }
            },
            'b' => match arg {
                Val::Int(i) => push_signed(&mut out, *i, |n, s| {
                    let _ = write!(s, "{:b}", n);
                }),
                Val::Uint(u) => {
                    let _ = write!(out, "{:b}", u);
                }
                Val::Bool(b) => out.push(if *b { '1' } else { '0' }),
                other => {
                    return Err(format!(
                        "%b expects an integer or bool, found {}",
                        other.kind().name()
                    ))
                }
            },
            'x' | 'X' => {
                let mut hex = String::new();
                match arg {
                    Val::Int(i) => push_signed(&mut hex, *i, |n, s| {
                        let _ = write!(s, "{:x}", n);
                    }),
                    Val::Uint(u) => {
                        let _ = write!(hex, "{:x}", u);
                    }
                    Val::String(s) => {
                        for byte in s.as_bytes() {
                            let _ = write!(hex, "{:02x}", byte);
                        }
                    }
                    Val::Bytes(b) => {
                        for byte in b.iter() {
                            let _ = write!(hex, "{:02x}", byte);
                        }
                    }
                    other => {
                        return Err(format!(
                            "%x expects an integer, string, or bytes, found {}",
                            other.kind().name()
                        ))
                    }
                }
                if verb == 'X' {
                    hex = hex.to_ascii_uppercase();
                }
                out.push_str(&hex);
            }
            'o' => match arg {
                Val::Int(i) => push_signed(&mut out, *i, |n, s| {
                    let _ = write!(s, "{:o}", n);
                }),
                Val::Uint(u) => {
                    let _ = write!(out, "{:o}", u);
                }
                other => {
                    return Err(format!(
                        "%o expects an integer, found {}",
                        other.kind().name()
                    ))
                }
            },
            other => {
                return Err(format!(
                    "unrecognized formatting clause \"%{}\"",
                    other
                ))
            }
        }
    }

    if next_arg < args.len() {
        return Err(format!(
            "too many arguments: expected {}, got {}",
            next_arg,
            args.len()
        ));
    }
    Ok(out)
}

/// Render a signed integer through an unsigned base formatter, keeping a
/// leading minus instead of two's-complement digits.
fn push_signed(out: &mut String, value: i64, write_abs: impl Fn(u64, &mut String)) {
    if value < 0 {
        out.push('-');
    }
    write_abs(value.unsigned_abs(), out);
}

/// `1.234560e+04`-style scientific notation with a signed two-digit
/// exponent.
fn scientific(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    let raw = format!("{:.*e}", precision, value);
    match raw.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => raw,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    #[test]
    fn plain_clauses() {
        assert_eq!(
            format_values("%s scored %d", &[Val::string("ada"), Val::Int(42)]).unwrap(),
            "ada scored 42"
        );
        assert_eq!(format_values("100%%", &[]).unwrap(), "100%");
    }

    #[test]
    fn fixed_precision() {
        assert_eq!(
            format_values("%f", &[Val::Double(2.5)]).unwrap(),
            "2.500000"
        );
        assert_eq!(
            format_values("%.2f", &[Val::Double(2.5)]).unwrap(),
            "2.50"
        );
    }

    #[test]
    fn fixed_duration() {
        let d = TimeDelta::new(123, 456).unwrap();
        assert_eq!(
            format_values("%f", &[Val::Duration(d)]).unwrap(),
            "123.000000456s"
        );
    }

    #[test]
    fn scientific_exponent_shape() {
        assert_eq!(
            format_values("%e", &[Val::Double(12345.6789)]).unwrap(),
            "1.234568e+04"
        );
        assert_eq!(
            format_values("%.2e", &[Val::Double(0.00123)]).unwrap(),
            "1.23e-03"
        );
    }

    #[test]
    fn radix_clauses() {
        assert_eq!(format_values("%b", &[Val::Int(5)]).unwrap(), "101");
        assert_eq!(format_values("%b", &[Val::Int(-5)]).unwrap(), "-101");
        assert_eq!(format_values("%b", &[Val::Bool(true)]).unwrap(), "1");
        assert_eq!(format_values("%b", &[Val::Bool(false)]).unwrap(), "0");
        assert_eq!(format_values("%x", &[Val::Int(255)]).unwrap(), "ff");
        assert_eq!(format_values("%X", &[Val::Int(255)]).unwrap(), "FF");
        assert_eq!(format_values("%o", &[Val::Int(8)]).unwrap(), "10");
        assert_eq!(
            format_values("%x", &[Val::string("Az")]).unwrap(),
            "417a"
        );
    }

    #[test]
    fn unrecognized_clause_is_an_error() {
        let e = format_values("%r", &[Val::Int(1)]).unwrap_err();
        assert!(e.contains("unrecognized formatting clause"));
    }

    #[test]
    fn argument_count_mismatches() {
        assert!(format_values("%d %d", &[Val::Int(1)]).is_err());
        assert!(format_values("%d", &[Val::Int(1), Val::Int(2)]).is_err());
    }
}
