//! Lexical rules shared by the grammar.
//!
//! Small parsers in nom style (`&str` in, remainder and match out) plus a
//! scanner that finds the next top-level stop character while skipping
//! strings, comments and bracketed groups.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_until, take_while1},
    character::complete::{char, digit1, one_of},
    combinator::{opt, recognize},
    sequence::{delimited, pair, preceded, tuple},
};

fn failure(input: &str, kind: nom::error::ErrorKind) -> nom::Err<nom::error::Error<&str>> {
    nom::Err::Error(nom::error::Error::new(input, kind))
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

/// A CSS identifier: `color`, `-webkit-box`, `--custom`.
pub fn ident(input: &str) -> IResult<&str, &str> {
    let (rest, name) = take_while1(is_name_char)(input)?;
    let body = name.trim_start_matches('-');
    let dashes = name.len() - body.len();
    if body.starts_with(|c: char| c.is_ascii_digit()) || (body.is_empty() && dashes < 2) {
        return Err(failure(input, nom::error::ErrorKind::AlphaNumeric));
    }
    Ok((rest, name))
}

/// A `/* ... */` comment; returns its content.
pub fn comment(input: &str) -> IResult<&str, &str> {
    delimited(tag("/*"), take_until("*/"), tag("*/"))(input)
}

/// A quoted string; returns the quote and the content between the quotes,
/// escapes left as written.
pub fn string(input: &str) -> IResult<&str, (char, &str)> {
    let quote = match input.chars().next() {
        Some(quote @ ('"' | '\'')) => quote,
        _ => return Err(failure(input, nom::error::ErrorKind::Char)),
    };
    let body = &input[1..];
    let mut escaped = false;
    for (index, c) in body.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '\n' => break,
            _ if c == quote => return Ok((&body[index + 1..], (quote, &body[..index]))),
            _ => {}
        }
    }
    Err(failure(input, nom::error::ErrorKind::Char))
}

/// A number with optional sign, fraction and exponent.
pub fn number(input: &str) -> IResult<&str, f64> {
    let (rest, text) = recognize(tuple((
        opt(one_of("+-")),
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit1)))),
            recognize(pair(char('.'), digit1)),
        )),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    )))(input)?;
    match text.parse::<f64>() {
        Ok(value) => Ok((rest, value)),
        Err(_) => Err(failure(input, nom::error::ErrorKind::Float)),
    }
}

/// `#` followed by 3, 4, 6 or 8 hex digits; returns the digits.
pub fn hex(input: &str) -> IResult<&str, &str> {
    let (rest, digits) = preceded(char('#'), take_while1(|c: char| c.is_ascii_hexdigit()))(input)?;
    let whole_word = !rest.starts_with(is_name_char);
    if whole_word && matches!(digits.len(), 3 | 4 | 6 | 8) {
        Ok((rest, digits))
    } else {
        Err(failure(input, nom::error::ErrorKind::HexDigit))
    }
}

/// Where [`scan_until`] stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Split<'a> {
    /// Text before the stop character.
    pub before: &'a str,
    /// The stop character, `None` when the input ran out.
    pub stop: Option<char>,
    /// Text from the stop character on, stop included.
    pub after: &'a str,
}

/// Find the first of `stops` outside strings, comments and brackets.
pub fn scan_until<'a>(input: &'a str, stops: &[char]) -> Split<'a> {
    let bytes = input.as_bytes();
    let mut depth = 0usize;
    let mut chars = input.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        if depth == 0 && stops.contains(&c) {
            return Split {
                before: &input[..index],
                stop: Some(c),
                after: &input[index..],
            };
        }
        match c {
            '"' | '\'' => {
                let end = match string(&input[index..]) {
                    Ok((rest, _)) => input.len() - rest.len(),
                    Err(_) => input.len(),
                };
                while chars.peek().is_some_and(|(next, _)| *next < end) {
                    chars.next();
                }
            }
            '/' if bytes.get(index + 1) == Some(&b'*') => {
                let end = input[index + 2..]
                    .find("*/")
                    .map_or(input.len(), |close| index + 2 + close + 2);
                while chars.peek().is_some_and(|(next, _)| *next < end) {
                    chars.next();
                }
            }
            '\\' => {
                chars.next();
            }
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Split {
        before: input,
        stop: None,
        after: &input[input.len()..],
    }
}

/// A `{ ... }` block with balanced content; returns the content.
pub fn block(input: &str) -> IResult<&str, &str> {
    enclosed(input, '{', '}')
}

/// A `( ... )` group with balanced content; returns the content.
pub fn parens(input: &str) -> IResult<&str, &str> {
    enclosed(input, '(', ')')
}

fn enclosed(input: &str, open: char, close: char) -> IResult<&str, &str> {
    let (inner, _) = char(open)(input)?;
    let split = scan_until(inner, &[close]);
    match split.stop {
        Some(_) => Ok((&split.after[close.len_utf8()..], split.before)),
        None => Err(failure(input, nom::error::ErrorKind::Char)),
    }
}

/// Collapse runs of whitespace into single spaces and trim. Strings and
/// comments are kept as written.
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut space = false;
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        if c.is_whitespace() {
            space = true;
            rest = rest.trim_start();
            continue;
        }
        let len = match c {
            '"' | '\'' => string(rest)
                .map_or(c.len_utf8(), |(after, _)| rest.len() - after.len()),
            '/' if rest.starts_with("/*") => {
                rest[2..].find("*/").map_or(rest.len(), |close| close + 4)
            }
            _ => c.len_utf8(),
        };
        if space && !out.is_empty() {
            out.push(' ');
        }
        space = false;
        out.push_str(&rest[..len]);
        rest = &rest[len..];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idents() {
        assert_eq!(ident("color: red"), Ok((": red", "color")));
        assert_eq!(ident("--main-bg x"), Ok((" x", "--main-bg")));
        assert_eq!(ident("-webkit-box"), Ok(("", "-webkit-box")));
        assert!(ident("1px").is_err());
        assert!(ident("-1").is_err());
        assert!(ident("- x").is_err());
    }

    #[test]
    fn collapsing_leaves_strings_and_comments_alone() {
        assert_eq!(collapse_whitespace("  red \n\t blue  "), "red blue");
        assert_eq!(collapse_whitespace("\"a   b\"   'c  d'"), "\"a   b\" 'c  d'");
        assert_eq!(collapse_whitespace("x  /* a   b */  y"), "x /* a   b */ y");
        assert_eq!(collapse_whitespace("\"open   end"), "\"open end");
    }

    #[test]
    fn strings_keep_escapes() {
        assert_eq!(string(r#""a\"b" c"#), Ok((" c", ('"', r#"a\"b"#))));
        assert_eq!(string("'x'"), Ok(("", ('\'', "x"))));
        assert!(string("\"open").is_err());
    }

    #[test]
    fn numbers() {
        assert_eq!(number("10px"), Ok(("px", 10.0)));
        assert_eq!(number("-.5em"), Ok(("em", -0.5)));
        assert_eq!(number("1e3"), Ok(("", 1000.0)));
        assert!(number("px").is_err());
    }

    #[test]
    fn hex_colors_need_valid_lengths() {
        assert_eq!(hex("#fff;"), Ok((";", "fff")));
        assert_eq!(hex("#a0b1c2d3"), Ok(("", "a0b1c2d3")));
        assert!(hex("#abcde").is_err());
        assert!(hex("#fffx").is_err());
    }

    #[test]
    fn scan_skips_nested_content() {
        let split = scan_until("a[title=','], b { x }", &[',']);
        assert_eq!(split.before, "a[title=',']");
        assert_eq!(split.after, ", b { x }");

        let split = scan_until("url(a;b) /* ; */ x; y", &[';']);
        assert_eq!(split.before, "url(a;b) /* ; */ x");
        assert_eq!(split.stop, Some(';'));

        let split = scan_until("no stop", &[';']);
        assert_eq!(split.stop, None);
        assert_eq!(split.after, "");
    }

    #[test]
    fn blocks_are_balanced() {
        assert_eq!(block("{ a { b } } rest"), Ok((" rest", " a { b } ")));
        assert!(block("{ a { b }").is_err());
        assert_eq!(parens("(a, (b)) c"), Ok((" c", "a, (b)")));
    }
}
