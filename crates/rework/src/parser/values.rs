//! Declaration value refinement: raw value text into terms.
//!
//! Terms are tried in this order:
//!
//! - Operators: `,` and `/`
//! - Strings: `"a"`, `'b'`
//! - Hex colors: `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`
//! - Unicode ranges: `U+0025-00FF`, kept as keywords
//! - Functions: `rgba(0, 0, 0, .5)`, `url(a.png)`
//! - Numbers with an optional unit: `10px`, `50%`, `1.5`
//! - Keywords: `solid`, `-webkit-box`
//!
//! Custom property values are kept whole as a single generic value.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, one_of},
    combinator::{map, opt, recognize},
    sequence::{pair, tuple},
};

use crate::ast::{Numeric, OperatorKind, Syntax};
use crate::broadcast::Sender;
use crate::error::{Message, Result};
use crate::parser::Source;
use crate::parser::lexer::{collapse_whitespace, hex, ident, number, parens, string};

fn operator(input: &str) -> IResult<&str, Syntax> {
    map(one_of(",/"), |c| match c {
        ',' => Syntax::Operator(OperatorKind::Comma),
        _ => Syntax::Operator(OperatorKind::Slash),
    })(input)
}

fn unicode_range(input: &str) -> IResult<&str, Syntax> {
    map(
        recognize(tuple((
            one_of("uU"),
            char('+'),
            take_while1(|c: char| c.is_ascii_hexdigit() || c == '?' || c == '-'),
        ))),
        |range: &str| Syntax::KeywordValue {
            keyword: range.to_string(),
        },
    )(input)
}

fn function(input: &str) -> IResult<&str, Syntax> {
    map(pair(ident, parens), |(name, args)| Syntax::FunctionValue {
        name: name.to_string(),
        args: collapse_whitespace(args),
    })(input)
}

fn numeric(input: &str) -> IResult<&str, Syntax> {
    map(pair(number, opt(alt((tag("%"), ident)))), |(value, unit)| {
        Syntax::NumericValue(Numeric::new(value, unit))
    })(input)
}

/// Parses one value term.
pub fn term(input: &str) -> IResult<&str, Syntax> {
    alt((
        operator,
        map(string, |(quote, content)| Syntax::StringValue {
            quote,
            content: content.to_string(),
        }),
        map(hex, |color| Syntax::HexColorValue {
            color: color.to_string(),
        }),
        unicode_range,
        function,
        numeric,
        map(ident, |keyword| Syntax::KeywordValue {
            keyword: keyword.to_string(),
        }),
    ))(input)
}

/// Parse a declaration value and broadcast each term.
pub fn terms(source: &mut Source<'_>, custom: bool, sender: &mut Sender<'_, '_>) -> Result<()> {
    source.skip_whitespace()?;
    if custom {
        let text = source.rest().trim_end();
        if !text.is_empty() {
            let unit = sender.ast_mut().create(
                Syntax::GenericValue {
                    text: text.to_string(),
                },
                Some(source.position()),
            );
            source.advance(text.len());
            sender.broadcast(unit)?;
        }
        return Ok(());
    }

    loop {
        source.skip_whitespace()?;
        if source.is_empty() {
            break;
        }
        let position = source.position();
        let rest = source.rest();
        let (after, syntax) = term(rest).map_err(|_| {
            let message = if rest.starts_with(['"', '\'']) {
                Message::UnclosedString
            } else {
                let word = rest.split_whitespace().next().unwrap_or_default();
                Message::InvalidTerm(word.to_string())
            };
            source.error(message)
        })?;
        source.advance_to(after);
        let unit = sender.ast_mut().create(syntax, Some(position));
        sender.broadcast(unit)?;
    }
    Ok(())
}
