// kestrel-data - Rendering values as text
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The single recursive render hook used by printers.
//!
//! [`render`] dispatches on what a value is: sequences print as
//! `(a b c)`, vectors as `[a b]`, maps as `{k v, k v}`, and everything else
//! through its own textual form. Printing policy (which sink, whether to
//! print readably, how much of a long collection to show) is the caller's
//! business and arrives through [`RenderOptions`].
//!
//! The output isn't guaranteed to read back as the same value; opaque
//! handles, for one, have no readable form.

use std::fmt::{self, Write};

use crate::error::Result;
use crate::map::PersistentMap;
use crate::seq::seq_iter;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Quote strings and name characters so the reader could parse them.
    pub readably: bool,
    /// Show at most this many elements of each collection, then `...`.
    pub print_length: Option<usize>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            readably: true,
            print_length: None,
        }
    }
}

/// Write the textual form of `value` to `out`.
///
/// Fails only if `out` fails or if a lazy seq fails to realize.
pub fn render<W: Write + ?Sized>(value: &Value, out: &mut W, opts: &RenderOptions) -> Result<()> {
    match value {
        Value::Nil => out.write_str("nil")?,
        Value::Bool(b) => write!(out, "{}", b)?,
        Value::Int(n) => write!(out, "{}", n)?,
        Value::Float(n) => write_float(*n, out)?,
        Value::Char(c) => {
            if opts.readably {
                write!(out, "\\{}", char_name(*c))?
            } else {
                out.write_char(*c)?
            }
        }
        Value::String(s) => {
            if opts.readably {
                write!(out, "\"{}\"", escape_string(s))?
            } else {
                out.write_str(s)?
            }
        }
        Value::Symbol(sym) => write!(out, "{}", sym)?,
        Value::Keyword(kw) => write!(out, "{}", kw)?,
        Value::Vector(v) => render_items(v.iter().cloned().map(Ok), "[", "]", out, opts)?,
        Value::SubVector(v) => render_items(v.iter().cloned().map(Ok), "[", "]", out, opts)?,
        Value::List(_) | Value::Seq(_) | Value::LazySeq(_) => {
            render_items(seq_iter(value)?, "(", ")", out, opts)?
        }
        Value::Map(m) => render_map(m, out, opts)?,
        Value::Var(v) => write!(out, "{}", v)?,
        Value::Reduced(inner) => {
            out.write_str("#reduced[")?;
            render(inner, out, opts)?;
            out.write_str("]")?
        }
        Value::Opaque(o) => write!(out, "#object[{} {}]", o.type_name(), o.label())?,
    }
    Ok(())
}

fn render_items<W, I>(
    items: I,
    open: &str,
    close: &str,
    out: &mut W,
    opts: &RenderOptions,
) -> Result<()>
where
    W: Write + ?Sized,
    I: Iterator<Item = Result<Value>>,
{
    out.write_str(open)?;
    for (i, item) in items.enumerate() {
        if i > 0 {
            out.write_char(' ')?;
        }
        if opts.print_length == Some(i) {
            out.write_str("...")?;
            break;
        }
        render(&item?, out, opts)?;
    }
    out.write_str(close)?;
    Ok(())
}

fn render_map<W: Write + ?Sized>(
    m: &PersistentMap,
    out: &mut W,
    opts: &RenderOptions,
) -> Result<()> {
    out.write_char('{')?;
    for (i, (k, v)) in m.iter().enumerate() {
        if i > 0 {
            out.write_str(", ")?;
        }
        if opts.print_length == Some(i) {
            out.write_str("...")?;
            break;
        }
        render(k, out, opts)?;
        out.write_char(' ')?;
        render(v, out, opts)?;
    }
    out.write_char('}')?;
    Ok(())
}

fn write_float<W: Write + ?Sized>(n: f64, out: &mut W) -> fmt::Result {
    if n.is_nan() {
        out.write_str("##NaN")
    } else if n.is_infinite() {
        out.write_str(if n > 0.0 { "##Inf" } else { "##-Inf" })
    } else if n.fract() == 0.0 {
        write!(out, "{}.0", n)
    } else {
        write!(out, "{}", n)
    }
}

fn char_name(c: char) -> String {
    match c {
        '\n' => "newline".to_string(),
        ' ' => "space".to_string(),
        '\t' => "tab".to_string(),
        '\r' => "return".to_string(),
        '\x08' => "backspace".to_string(),
        '\x0C' => "formfeed".to_string(),
        _ => c.to_string(),
    }
}

fn escape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\n' => result.push_str("\\n"),
            '\t' => result.push_str("\\t"),
            '\r' => result.push_str("\\r"),
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            _ => result.push(c),
        }
    }
    result
}

/// Render with the given options into a new string.
pub fn print_string(value: &Value, opts: &RenderOptions) -> Result<String> {
    let mut out = String::new();
    render(value, &mut out, opts)?;
    Ok(out)
}
