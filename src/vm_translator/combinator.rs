// Parser Combinators
// Small text-matching building blocks the VM front end is assembled from

use crate::vm_translator::error::TranslatorError;
use regex::Regex;

/// Number of input characters quoted in a failure diagnostic
const SNIPPET_LENGTH: usize = 20;

/// A successful parse step: the value produced and the input left over
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<'a, T> {
    pub value: T,
    pub rest: &'a str,
}

pub type ParseResult<'a, T> = Result<Parsed<'a, T>, TranslatorError>;

type ParseFn<'p, T> = dyn for<'a> Fn(&'a str) -> ParseResult<'a, T> + 'p;

/// A parser is a function from input text to a value plus remainder.
///
/// Failures come in two tiers (see [`TranslatorError::is_recoverable`]):
/// recoverable ones drive backtracking in [`Parser::or`] and terminate
/// [`Parser::repeating`], fatal ones always propagate to the caller.
pub struct Parser<'p, T> {
    run: Box<ParseFn<'p, T>>,
}

/// Up to the next few characters of `input`, for diagnostics
pub fn snippet(input: &str) -> String {
    input.chars().take(SNIPPET_LENGTH).collect()
}

impl<'p, T: 'p> Parser<'p, T> {
    pub fn new<F>(run: F) -> Self
    where
        F: for<'a> Fn(&'a str) -> ParseResult<'a, T> + 'p,
    {
        Parser { run: Box::new(run) }
    }

    pub fn parse<'a>(&self, input: &'a str) -> ParseResult<'a, T> {
        (self.run)(input)
    }

    /// Transform a successful value, keeping the remainder
    pub fn map<U: 'p, F>(self, f: F) -> Parser<'p, U>
    where
        F: Fn(T) -> U + 'p,
    {
        Parser::new(move |input| {
            let parsed = self.parse(input)?;
            Ok(Parsed {
                value: f(parsed.value),
                rest: parsed.rest,
            })
        })
    }

    /// Transform a successful value with a function that may itself fail
    pub fn try_map<U: 'p, F>(self, f: F) -> Parser<'p, U>
    where
        F: Fn(T) -> Result<U, TranslatorError> + 'p,
    {
        Parser::new(move |input| {
            let parsed = self.parse(input)?;
            Ok(Parsed {
                value: f(parsed.value)?,
                rest: parsed.rest,
            })
        })
    }

    /// Run `self`, then `other` on the remainder, producing both values
    pub fn and_then<U: 'p>(self, other: Parser<'p, U>) -> Parser<'p, (T, U)> {
        Parser::new(move |input| {
            let first = self.parse(input)?;
            let second = other.parse(first.rest)?;
            Ok(Parsed {
                value: (first.value, second.value),
                rest: second.rest,
            })
        })
    }

    /// Sequence keeping only the right-hand value
    pub fn skip_and<U: 'p>(self, other: Parser<'p, U>) -> Parser<'p, U> {
        self.and_then(other).map(|(_, right)| right)
    }

    /// Sequence keeping only the left-hand value
    pub fn and_skip<U: 'p>(self, other: Parser<'p, U>) -> Parser<'p, T> {
        self.and_then(other).map(|(left, _)| left)
    }

    /// Try `self`; on a recoverable failure try `other` against the same input
    pub fn or(self, other: Parser<'p, T>) -> Parser<'p, T> {
        Parser::new(move |input| match self.parse(input) {
            Err(err) if err.is_recoverable() => other.parse(input),
            result => result,
        })
    }

    /// Apply the parser until it fails, collecting every value in input order.
    ///
    /// Zero matches is a success. A match that consumes nothing ends the
    /// repetition.
    pub fn repeating(self) -> Parser<'p, Vec<T>> {
        self.fold_repeating(Vec::new, |mut values, value| {
            values.push(value);
            Ok(values)
        })
    }

    /// Like [`Parser::repeating`], but feeds each value through `step` as soon
    /// as it is parsed. An error from `step` aborts the whole repetition.
    pub fn fold_repeating<S: 'p, I, F>(self, init: I, step: F) -> Parser<'p, S>
    where
        I: Fn() -> S + 'p,
        F: Fn(S, T) -> Result<S, TranslatorError> + 'p,
    {
        Parser::new(move |input| {
            let mut acc = init();
            let mut rest = input;
            loop {
                match self.parse(rest) {
                    Ok(parsed) => {
                        if parsed.rest.len() == rest.len() {
                            break;
                        }
                        acc = step(acc, parsed.value)?;
                        rest = parsed.rest;
                    }
                    Err(err) if err.is_recoverable() => break,
                    Err(err) => return Err(err),
                }
            }
            Ok(Parsed { value: acc, rest })
        })
    }
}

/// Match an exact string
pub fn literal(text: &str) -> Parser<'_, String> {
    Parser::new(move |input| match input.strip_prefix(text) {
        Some(rest) => Ok(Parsed {
            value: text.to_string(),
            rest,
        }),
        None => Err(TranslatorError::NoMatch(snippet(input))),
    })
}

/// Match a regular expression at the start of the input.
///
/// Patterns should be anchored with `^`; a match found further along the
/// input is still rejected.
pub fn pattern(regex: &Regex) -> Parser<'_, String> {
    Parser::new(move |input| match regex.find(input) {
        Some(found) if found.start() == 0 => Ok(Parsed {
            value: found.as_str().to_string(),
            rest: &input[found.end()..],
        }),
        _ => Err(TranslatorError::NoMatch(snippet(input))),
    })
}

/// Succeeds only on empty input
pub fn end_of_input<'p>() -> Parser<'p, String> {
    Parser::new(|input| {
        if input.is_empty() {
            Ok(Parsed {
                value: String::new(),
                rest: input,
            })
        } else {
            Err(TranslatorError::ExpectedEndOfInput(snippet(input)))
        }
    })
}

/// A newline, or the end of input so the last line needs no terminator
pub fn eol<'p>() -> Parser<'p, String> {
    literal("\n").or(end_of_input())
}
