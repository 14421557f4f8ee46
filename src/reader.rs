// ABOUTME: Recursive-descent reader: source text to heap value graph (§4.5)

use crate::error::{LispError, LispResult};
use crate::heap::Heap;
use crate::value::Value;
use nom::{
    bytes::complete::{escaped, take_while1},
    character::complete::{char, digit1, none_of, one_of},
    combinator::{opt, recognize},
    IResult, Parser,
};

/// An intermediate, heap-free AST. `nom` builds this; [`build`] allocates it.
enum Sexpr {
    Int(i64),
    Str(String),
    Symbol(String),
    List(Vec<Sexpr>, Option<Box<Sexpr>>),
    Quote(&'static str, Box<Sexpr>),
}

fn skip_ws_and_comments(input: &str) -> &str {
    let mut s = input;
    loop {
        let trimmed = s.trim_start_matches([' ', '\t', '\n', '\r']);
        if let Some(rest) = trimmed.strip_prefix(';') {
            s = rest.split_once('\n').map_or("", |(_, after)| after);
            continue;
        }
        if trimmed.len() == s.len() {
            return trimmed;
        }
        s = trimmed;
    }
}

fn parse_int(input: &str) -> IResult<&str, i64> {
    recognize((opt(char('-')), digit1))
        .map(|s: &str| s.parse().expect("digit1 guarantees a parseable integer"))
        .parse(input)
}

fn parse_string_body(input: &str) -> IResult<&str, String> {
    let (input, _) = char('"')(input)?;
    if let Ok((input, _)) = char::<_, nom::error::Error<_>>('"')(input) {
        return Ok((input, String::new()));
    }
    let (input, content) =
        escaped(none_of("\"\\"), '\\', one_of("abfnrtv\"\\")).parse(input)?;
    let (input, _) = char('"')(input)?;

    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('a') => out.push('\u{7}'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{C}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('v') => out.push('\u{B}'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    Ok((input, out))
}

fn is_symbol_byte(c: char) -> bool {
    !matches!(c, ' ' | '\t' | '\n' | '\r' | '(' | ')' | '\'' | ';' | '"')
}

fn parse_symbol_text(input: &str) -> IResult<&str, &str> {
    take_while1(is_symbol_byte)(input)
}

/// Splits `a.b.c` into the nested `(getattr (getattr a 'b) 'c)` form (§4.5).
/// A bare `.` anywhere but the first/last byte triggers the rewrite.
fn dotted_rewrite(raw: &str) -> Result<Sexpr, String> {
    if !raw.contains('.') {
        return Ok(Sexpr::Symbol(raw.to_string()));
    }
    if raw.starts_with('.') || raw.ends_with('.') {
        return Err(format!("malformed dotted symbol: {raw}"));
    }
    let mut parts = raw.split('.');
    let mut acc = Sexpr::Symbol(parts.next().unwrap().to_string());
    for part in parts {
        let quoted = Sexpr::Quote("quote", Box::new(Sexpr::Symbol(part.to_string())));
        acc = Sexpr::List(vec![Sexpr::Symbol("getattr".to_string()), acc, quoted], None);
    }
    Ok(acc)
}

/// `origin` is the whole buffer passed to the public entry point; it never
/// shrinks across recursive calls, so every error can be stamped with its
/// true byte offset (and thus line number) regardless of nesting depth.
fn at(origin: &str, input: &str, err: LispError) -> LispError {
    let offset = origin.len() - input.len();
    err.with_line(line_of(origin, offset))
}

fn parse_sexpr<'a>(origin: &str, input: &'a str) -> Result<(Sexpr, &'a str), LispError> {
    let input = skip_ws_and_comments(input);
    let Some(first) = input.chars().next() else {
        return Err(at(origin, input, LispError::end_of_file()));
    };
    match first {
        '"' => {
            let (rest, s) = parse_string_body(input)
                .map_err(|_| at(origin, input, LispError::end_of_file()))?;
            Ok((Sexpr::Str(s), rest))
        }
        '(' => parse_list(origin, &input[1..]),
        ')' => Ok((Sexpr::List(vec![], None), &input[1..])),
        '\'' => {
            let (inner, rest) = parse_sexpr(origin, &input[1..])?;
            Ok((Sexpr::Quote("quote", Box::new(inner)), rest))
        }
        '`' => {
            let (inner, rest) = parse_sexpr(origin, &input[1..])?;
            Ok((Sexpr::Quote("quasiquote", Box::new(inner)), rest))
        }
        ',' => {
            let (inner, rest) = parse_sexpr(origin, &input[1..])?;
            Ok((Sexpr::Quote("unquote", Box::new(inner)), rest))
        }
        c if c.is_ascii_digit() => {
            let (rest, n) = parse_int(input)
                .map_err(|_| at(origin, input, LispError::syntax("malformed integer")))?;
            Ok((Sexpr::Int(n), rest))
        }
        '-' if input[1..].chars().next().is_some_and(|c| c.is_ascii_digit()) => {
            let (rest, n) = parse_int(input)
                .map_err(|_| at(origin, input, LispError::syntax("malformed integer")))?;
            Ok((Sexpr::Int(n), rest))
        }
        _ => {
            let (rest, raw) = parse_symbol_text(input)
                .map_err(|_| at(origin, input, LispError::syntax("expected a symbol")))?;
            let expr = dotted_rewrite(raw).map_err(|msg| at(origin, input, LispError::syntax(msg)))?;
            Ok((expr, rest))
        }
    }
}

fn parse_list<'a>(origin: &str, mut input: &'a str) -> Result<(Sexpr, &'a str), LispError> {
    let mut items = Vec::new();
    loop {
        input = skip_ws_and_comments(input);
        match input.chars().next() {
            None => return Err(at(origin, input, LispError::end_of_file())),
            Some(')') => return Ok((Sexpr::List(items, None), &input[1..])),
            Some('.') if input[1..].starts_with([' ', '\t', '\n', '\r', '(']) => {
                let (tail, rest) = parse_sexpr(origin, &input[1..])?;
                let rest = skip_ws_and_comments(rest);
                let rest = rest.strip_prefix(')').ok_or_else(|| {
                    at(origin, rest, LispError::syntax("expected ')' after dotted tail"))
                })?;
                return Ok((Sexpr::List(items, Some(Box::new(tail))), rest));
            }
            _ => {
                let (item, rest) = parse_sexpr(origin, input)?;
                items.push(item);
                input = rest;
            }
        }
    }
}

fn build(heap: &mut Heap, expr: Sexpr) -> Value {
    match expr {
        Sexpr::Int(n) => heap.alloc_int(n),
        Sexpr::Str(s) => heap.alloc_str(s),
        Sexpr::Symbol(name) => heap.symbol(&name),
        Sexpr::Quote(keyword, inner) => {
            let kw = heap.symbol(keyword);
            let v = build(heap, *inner);
            let nil = heap.nil();
            let tail = heap.alloc_pair(v, nil);
            heap.alloc_pair(kw, tail)
        }
        Sexpr::List(items, tail) => {
            let mut acc = match tail {
                Some(t) => build(heap, *t),
                None => heap.nil(),
            };
            for item in items.into_iter().rev() {
                let v = build(heap, item);
                acc = heap.alloc_pair(v, acc);
            }
            acc
        }
    }
}

/// Parses one value starting at `text`, returning it and how many bytes were
/// consumed (relative to `text`, not a larger enclosing buffer).
pub fn parse_value(heap: &mut Heap, text: &str) -> LispResult<Option<(Value, usize)>> {
    let trimmed = skip_ws_and_comments(text);
    if trimmed.is_empty() {
        return Ok(None);
    }
    let (expr, rest) = parse_sexpr(text, text)?;
    let consumed = text.len() - rest.len();
    Ok(Some((build(heap, expr), consumed)))
}

fn line_of(text: &str, byte_offset: usize) -> usize {
    1 + text[..byte_offset.min(text.len())].matches('\n').count()
}

/// Reads every top-level form in `text` and threads them into `(progn …)`
/// (§4.5 "top-level read"). `origin` stays fixed at the whole buffer across
/// forms so a failure deep in form N still reports N's true line.
pub fn parse_progn(heap: &mut Heap, text: &str) -> LispResult<Value> {
    let progn_sym = heap.symbol("progn");
    let mut forms = vec![progn_sym];
    let mut remaining = text;
    loop {
        let trimmed = skip_ws_and_comments(remaining);
        if trimmed.is_empty() {
            break;
        }
        match parse_sexpr(text, remaining) {
            Ok((expr, rest)) => {
                forms.push(build(heap, expr));
                remaining = rest;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(crate::argspec::vec_to_list(heap, &forms))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_one(src: &str) -> (Value, Heap) {
        let mut heap = Heap::new();
        let (v, _) = parse_value(&mut heap, src).unwrap().unwrap();
        (v, heap)
    }

    #[test]
    fn parses_integers_with_sign() {
        let (v, _heap) = read_one("42");
        assert_eq!(v.as_int(), Some(42));
        let (v, _heap) = read_one("-7");
        assert_eq!(v.as_int(), Some(-7));
    }

    #[test]
    fn parses_string_with_escapes() {
        let (v, heap) = read_one(r#""hi\nthere""#);
        assert_eq!(v.as_str(), Some("hi\nthere"));
        let _ = heap;
    }

    #[test]
    fn parses_dotted_list() {
        let (v, heap) = read_one("(1 2 . 3)");
        assert_eq!(v.to_display_string(heap.nil()), "(1 2 . 3)");
    }

    #[test]
    fn parses_quote_reader_macro() {
        let (v, heap) = read_one("'x");
        assert_eq!(v.to_display_string(heap.nil()), "(quote x)");
    }

    #[test]
    fn rewrites_dotted_symbol_to_getattr() {
        let (v, heap) = read_one("a.b.c");
        assert_eq!(
            v.to_display_string(heap.nil()),
            "(getattr (getattr a (quote b)) (quote c))"
        );
    }

    #[test]
    fn parse_progn_threads_multiple_forms() {
        let mut heap = Heap::new();
        let v = parse_progn(&mut heap, "1 2 3").unwrap();
        assert_eq!(v.to_display_string(heap.nil()), "(progn 1 2 3)");
    }

    #[test]
    fn unterminated_string_is_end_of_file_error() {
        let mut heap = Heap::new();
        let err = parse_value(&mut heap, "\"abc").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::EndOfFile);
    }

    #[test]
    fn unterminated_list_is_end_of_file_error() {
        let mut heap = Heap::new();
        let err = parse_value(&mut heap, "(1 2").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::EndOfFile);
    }

    #[test]
    fn parse_progn_reports_one_based_line_number() {
        let mut heap = Heap::new();
        let err = parse_progn(&mut heap, "1\n2\n(3").unwrap_err();
        assert_eq!(err.line, Some(3));
    }
}
