//! Selector refinement: one raw selector into its parts.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, multispace0, one_of},
    combinator::{map, opt},
    sequence::{delimited, pair, preceded, tuple},
};
use phf::phf_set;

use crate::ast::{AttributeMatch, AttributeOperator, CombinatorKind, Syntax};
use crate::broadcast::Sender;
use crate::error::{Message, Result};
use crate::parser::Source;
use crate::parser::lexer::{collapse_whitespace, ident, number, parens, string};

/// Pseudo-elements that may still be written with a single colon.
static LEGACY_PSEUDO_ELEMENTS: phf::Set<&'static str> = phf_set! {
    "before",
    "after",
    "first-line",
    "first-letter",
};

/// Parses a simple selector: type, `*`, `.class`, `#id`, `[attr]`,
/// `:pseudo-class(args)` or `::pseudo-element`.
pub fn simple_selector(input: &str) -> IResult<&str, Syntax> {
    alt((
        map(preceded(char('#'), ident), |name| Syntax::IdSelector {
            name: name.to_string(),
        }),
        map(preceded(char('.'), ident), |name| Syntax::ClassSelector {
            name: name.to_string(),
        }),
        attribute_selector,
        map(preceded(tag("::"), ident), |name| Syntax::PseudoElementSelector {
            name: name.to_string(),
        }),
        map(preceded(char(':'), pair(ident, opt(parens))), |(name, args)| {
            pseudo_class(name, args)
        }),
        map(char('*'), |_| Syntax::UniversalSelector),
        map(ident, |name| Syntax::TypeSelector {
            name: name.to_string(),
        }),
    ))(input)
}

fn pseudo_class(name: &str, args: Option<&str>) -> Syntax {
    if args.is_none() && LEGACY_PSEUDO_ELEMENTS.contains(name.to_ascii_lowercase().as_str()) {
        return Syntax::PseudoElementSelector {
            name: name.to_string(),
        };
    }
    Syntax::PseudoClassSelector {
        name: name.to_string(),
        args: args.map(collapse_whitespace),
    }
}

fn attribute_operator(input: &str) -> IResult<&str, AttributeOperator> {
    alt((
        map(tag("~="), |_| AttributeOperator::Includes),
        map(tag("|="), |_| AttributeOperator::DashMatch),
        map(tag("^="), |_| AttributeOperator::Prefix),
        map(tag("$="), |_| AttributeOperator::Suffix),
        map(tag("*="), |_| AttributeOperator::Substring),
        map(char('='), |_| AttributeOperator::Equals),
    ))(input)
}

fn attribute_value(input: &str) -> IResult<&str, (Option<char>, &str)> {
    alt((
        map(string, |(quote, content)| (Some(quote), content)),
        map(ident, |value| (None, value)),
    ))(input)
}

fn attribute_selector(input: &str) -> IResult<&str, Syntax> {
    let (input, (name, matcher)) = delimited(
        pair(char('['), multispace0),
        pair(
            ident,
            opt(tuple((
                preceded(multispace0, attribute_operator),
                preceded(multispace0, attribute_value),
                opt(preceded(multispace0, one_of("iIsS"))),
            ))),
        ),
        pair(multispace0, char(']')),
    )(input)?;

    let matcher = matcher.map(|(operator, (quote, value), flag)| AttributeMatch {
        operator,
        value: value.to_string(),
        quote,
        flag: flag.map(|flag| flag.to_ascii_lowercase()),
    });
    Ok((
        input,
        Syntax::AttributeSelector {
            name: name.to_string(),
            matcher,
        },
    ))
}

fn combinator(c: char) -> Option<CombinatorKind> {
    match c {
        '>' => Some(CombinatorKind::Child),
        '+' => Some(CombinatorKind::AdjacentSibling),
        '~' => Some(CombinatorKind::GeneralSibling),
        _ => None,
    }
}

/// A selector made of a single percentage, as used inside `@keyframes`.
fn keyframe_selector(text: &str) -> bool {
    match number(text) {
        Ok((rest, _)) => rest == "%",
        Err(_) => false,
    }
}

/// Parse the parts of one selector and broadcast each of them.
pub fn selector_parts(source: &mut Source<'_>, sender: &mut Sender<'_, '_>) -> Result<()> {
    source.skip_whitespace()?;
    let text = source.rest().trim_end();
    if keyframe_selector(text) {
        let position = source.position();
        let unit = sender.ast_mut().create(
            Syntax::KeyframeSelector {
                text: text.to_string(),
            },
            Some(position),
        );
        source.advance(text.len());
        return sender.broadcast(unit);
    }

    let mut parts = 0;
    let mut dangling = false;
    loop {
        let spaced = source.skip_whitespace()?;
        let Some(next) = source.peek() else {
            break;
        };
        let position = source.position();

        if let Some(kind) = combinator(next) {
            if dangling || parts == 0 {
                return Err(source.error(Message::InvalidSelector(next.to_string())).into());
            }
            source.advance(next.len_utf8());
            let unit = sender.ast_mut().create(Syntax::Combinator(kind), Some(position));
            sender.broadcast(unit)?;
            dangling = true;
            continue;
        }

        if spaced && parts > 0 && !dangling {
            let unit = sender
                .ast_mut()
                .create(Syntax::Combinator(CombinatorKind::Descendant), Some(position));
            sender.broadcast(unit)?;
        }

        let (rest, syntax) = simple_selector(source.rest()).map_err(|_| {
            let word = source.rest().split_whitespace().next().unwrap_or_default();
            source.error(Message::InvalidSelector(word.to_string()))
        })?;
        source.advance_to(rest);
        let unit = sender.ast_mut().create(syntax, Some(position));
        sender.broadcast(unit)?;
        parts += 1;
        dangling = false;
    }

    if dangling {
        return Err(source.error(Message::InvalidSelector(source.text().trim().to_string())).into());
    }
    if parts == 0 {
        return Err(source.error(Message::ExpectedSelector).into());
    }
    Ok(())
}
