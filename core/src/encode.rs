//! Null-terminated payload encoders.
//!
//! Each UTF-16 code unit of the input becomes one byte, truncated to its low
//! eight bits, and a single `0` byte is appended. This is not UTF-8: only
//! ASCII and Latin-1 text survive the trip intact. Devices on the other end
//! read the body as a C string, which is why the terminator is always there.

use std::io;

use serde::Serialize;
use serde_json::ser::Formatter;

use crate::error::QwebError;

/// Encode `s` as one byte per UTF-16 code unit followed by a `0` byte.
///
/// Code units above `0xFF` are truncated (`'Ā'` (U+0100) becomes `0x00`),
/// and characters outside the BMP contribute two bytes, one per surrogate.
pub fn string_to_bytes(s: &str) -> Vec<u8> {
    let mut bytes: Vec<u8> = s.encode_utf16().map(|unit| unit as u8).collect();
    bytes.push(0);
    bytes
}

/// Serialize `value` as compact JSON and encode it with [`string_to_bytes`].
///
/// Object keys keep their insertion order and struct fields their
/// declaration order. Floats are printed the way JavaScript prints numbers
/// (see [`JsNumberFormatter`]). Fails before any I/O if `value` cannot be
/// represented as JSON (for example a map keyed by something other than
/// strings).
pub fn json_to_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, QwebError> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, JsNumberFormatter);
    value.serialize(&mut ser)?;
    Ok(string_to_bytes(&String::from_utf8_lossy(&buf)))
}

/// Compact JSON formatter that prints floats like ECMAScript
/// `Number::toString`: no `.0` on integral values, `-0` as `0`, and
/// exponent form only below `1e-6` or from `1e21` up.
///
/// `f32` values use their own shortest digits, not those of the widened
/// `f64`. Non-finite floats never reach the formatter; serde_json writes
/// them as `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsNumberFormatter;

impl Formatter for JsNumberFormatter {
    fn write_f32<W: ?Sized + io::Write>(&mut self, writer: &mut W, value: f32) -> io::Result<()> {
        if value == 0.0 {
            return writer.write_all(b"0");
        }
        writer.write_all(js_number(&format!("{value:e}")).as_bytes())
    }

    fn write_f64<W: ?Sized + io::Write>(&mut self, writer: &mut W, value: f64) -> io::Result<()> {
        if value == 0.0 {
            return writer.write_all(b"0");
        }
        writer.write_all(js_number(&format!("{value:e}")).as_bytes())
    }
}

/// Lay out a shortest-digits `{:e}` rendering (`-1.25e-7`) as JavaScript
/// would print the same number.
fn js_number(exp_form: &str) -> String {
    let (sign, unsigned) = match exp_form.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", exp_form),
    };
    let (mantissa, exponent) = unsigned.split_once('e').unwrap_or((unsigned, "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let exponent: i32 = exponent.parse().unwrap_or(0);

    // Value is 0.digits * 10^n.
    let k = digits.len() as i32;
    let n = exponent + 1;

    let body = if k <= n && n <= 21 {
        format!("{digits}{}", "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        let (int, frac) = digits.split_at(n as usize);
        format!("{int}.{frac}")
    } else if -6 < n && n <= 0 {
        format!("0.{}{digits}", "0".repeat((-n) as usize))
    } else {
        let e = n - 1;
        let e_sign = if e < 0 { '-' } else { '+' };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{first}e{e_sign}{}", e.abs())
        } else {
            format!("{first}.{rest}e{e_sign}{}", e.abs())
        }
    };
    format!("{sign}{body}")
}
