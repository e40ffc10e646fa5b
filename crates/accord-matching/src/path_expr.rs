//! Path expressions (`$.a.b[0]`, `$.a[*]`, `$.a.*`) and their evaluation against concrete paths.
//!
//! A concrete path is the list of segments visited while walking a body, e.g. `["$", "items", "0",
//! "name"]`. A path expression is the key a matching rule is registered under. Evaluation produces
//! a score rather than a boolean so that overlapping rules can be ranked:
//!
//! - exact structural matches (root, field name, index value) score 2
//! - wildcards (`[*]` against a numeric segment, `*` against anything) score 1
//! - anything else scores 0

use crate::error::{MatchError, Result};
use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;
use tracing::warn;

/// Characters (beyond letters and digits) allowed in an unquoted identifier.
const ALLOWED_SPECIAL_CHARS: &str = "-_:#@";

/// Characters that force a field to be rendered in bracket notation.
const PATH_SPECIAL_CHARS: &str = "'[].@ \t\n";

/// A single token of a parsed path expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathToken {
    /// `$`
    Root,
    /// `.name` or `['name']`
    Field(String),
    /// `[n]`
    Index(usize),
    /// `.*`
    Star,
    /// `[*]`
    StarIndex,
}

impl fmt::Display for PathToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathToken::Root => write!(f, "$"),
            PathToken::Field(name) if name.chars().any(|c| PATH_SPECIAL_CHARS.contains(c)) => {
                write!(f, "['{name}']")
            }
            PathToken::Field(name) => write!(f, "{name}"),
            PathToken::Index(index) => write!(f, "[{index}]"),
            PathToken::Star => write!(f, "*"),
            PathToken::StarIndex => write!(f, "[*]"),
        }
    }
}

type Chars<'a> = Peekable<CharIndices<'a>>;

/// Parse a path expression into tokens.
///
/// An empty expression yields no tokens. Anything else must start with `$`.
pub fn parse_path(expression: &str) -> Result<Vec<PathToken>> {
    let mut tokens = Vec::new();
    let mut chars = expression.char_indices().peekable();

    match chars.next() {
        None => return Ok(tokens),
        Some((_, '$')) => tokens.push(PathToken::Root),
        Some(_) => {
            return Err(MatchError::path(
                expression,
                "does not start with a root marker \"$\"",
            ))
        }
    }

    while let Some((index, ch)) = chars.next() {
        match ch {
            '.' => path_identifier(expression, index, &mut chars, &mut tokens)?,
            '[' => bracket_path(expression, index, &mut chars, &mut tokens)?,
            other => {
                return Err(MatchError::path(
                    expression,
                    format!("Expected a \".\" or \"[\" instead of \"{other}\" at index {index}"),
                ))
            }
        }
    }

    Ok(tokens)
}

// path_identifier -> identifier | *
fn path_identifier(
    expression: &str,
    index: usize,
    chars: &mut Chars<'_>,
    tokens: &mut Vec<PathToken>,
) -> Result<()> {
    match chars.next() {
        Some((_, '*')) => {
            tokens.push(PathToken::Star);
            Ok(())
        }
        Some((_, ch)) if valid_path_character(ch) => identifier(expression, ch, chars, tokens),
        Some((i, _)) => Err(MatchError::path(
            expression,
            format!("Expected either a \"*\" or path identifier at index {i}"),
        )),
        None => Err(MatchError::path(
            expression,
            format!("Expected a path after \".\" at index {index}"),
        )),
    }
}

// identifier -> [a-zA-Z0-9\-_:#@]+
fn identifier(
    expression: &str,
    first: char,
    chars: &mut Chars<'_>,
    tokens: &mut Vec<PathToken>,
) -> Result<()> {
    let mut id = String::from(first);
    while let Some(&(i, c)) = chars.peek() {
        if valid_path_character(c) {
            id.push(c);
            chars.next();
        } else if c == '.' || c == '\'' || c == '[' {
            break;
        } else {
            return Err(MatchError::path(
                expression,
                format!("\"{c}\" is not allowed in an identifier at index {i}"),
            ));
        }
    }
    tokens.push(PathToken::Field(id));
    Ok(())
}

// bracket_path -> (string_path | index | *) ]
fn bracket_path(
    expression: &str,
    index: usize,
    chars: &mut Chars<'_>,
    tokens: &mut Vec<PathToken>,
) -> Result<()> {
    let (ch_index, ch) = chars.next().ok_or_else(|| {
        MatchError::path(
            expression,
            format!("Expected a \"'\" (single quote) or a digit after index {index}"),
        )
    })?;

    match ch {
        '\'' => string_path(expression, ch_index, chars, tokens)?,
        c if c.is_ascii_digit() => index_path(expression, c, chars, tokens)?,
        '*' => tokens.push(PathToken::StarIndex),
        ']' => {
            return Err(MatchError::path(
                expression,
                format!("Empty bracket expressions are not allowed at index {ch_index}"),
            ))
        }
        c => {
            return Err(MatchError::path(
                expression,
                format!(
                    "Indexes can only consist of numbers or a \"*\", found \"{c}\" instead at index {ch_index}"
                ),
            ))
        }
    }

    match chars.next() {
        Some((_, ']')) => Ok(()),
        Some((i, c)) => Err(MatchError::path(
            expression,
            format!("Unterminated brackets, found \"{c}\" instead of \"]\" at index {i}"),
        )),
        None => Err(MatchError::path(
            expression,
            format!("Unterminated brackets at index {ch_index}"),
        )),
    }
}

// string_path -> [^']+
fn string_path(
    expression: &str,
    index: usize,
    chars: &mut Chars<'_>,
    tokens: &mut Vec<PathToken>,
) -> Result<()> {
    let mut id = String::new();
    loop {
        match chars.next() {
            Some((i, '\'')) if id.is_empty() => {
                return Err(MatchError::path(
                    expression,
                    format!("Empty strings are not allowed at index {i}"),
                ))
            }
            Some((_, '\'')) => {
                tokens.push(PathToken::Field(id));
                return Ok(());
            }
            Some((_, c)) => id.push(c),
            None => {
                return Err(MatchError::path(
                    expression,
                    format!("Unterminated string at index {index}"),
                ))
            }
        }
    }
}

// index_path -> [0-9]+
fn index_path(
    expression: &str,
    first: char,
    chars: &mut Chars<'_>,
    tokens: &mut Vec<PathToken>,
) -> Result<()> {
    let mut id = String::from(first);
    while let Some(&(i, c)) = chars.peek() {
        if c.is_ascii_digit() {
            id.push(c);
            chars.next();
        } else if c == ']' {
            break;
        } else {
            return Err(MatchError::path(
                expression,
                format!(
                    "Indexes can only consist of numbers or a \"*\", found \"{c}\" instead at index {i}"
                ),
            ));
        }
    }
    let value = id
        .parse::<usize>()
        .map_err(|_| MatchError::path(expression, format!("Index {id} is out of range")))?;
    tokens.push(PathToken::Index(value));
    Ok(())
}

/// Whether `c` may appear in an unquoted path identifier.
pub fn valid_path_character(c: char) -> bool {
    c.is_alphanumeric() || ALLOWED_SPECIAL_CHARS.contains(c)
}

fn is_index_segment(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// Score a concrete path segment against one token: 2 exact, 1 wildcard, 0 no match.
pub fn matches_token(segment: &str, token: &PathToken) -> u32 {
    match token {
        PathToken::Root if segment == "$" => 2,
        PathToken::Field(name) if segment == name => 2,
        PathToken::Index(index) if is_index_segment(segment) => {
            match segment.parse::<usize>() {
                Ok(value) if value == *index => 2,
                _ => 0,
            }
        }
        PathToken::StarIndex if is_index_segment(segment) => 1,
        PathToken::Star => 1,
        _ => 0,
    }
}

/// Length of the alignment between `tokens` and the concrete `path`, or 0 when they do not align.
///
/// The tokens align with the leading segments of the path, so a rule registered on an ancestor
/// (`$.items`) also applies below it (`$.items.0.name`).
pub fn matches_path_tokens(tokens: &[PathToken], path: &[String]) -> usize {
    if tokens.is_empty() || tokens.len() > path.len() {
        return 0;
    }
    let aligned = path
        .iter()
        .zip(tokens)
        .all(|(segment, token)| matches_token(segment, token) > 0);
    if aligned {
        tokens.len()
    } else {
        0
    }
}

/// Parse `expression` and compute [`matches_path_tokens`]. Unparseable expressions never match.
pub fn matches_path(expression: &str, path: &[String]) -> usize {
    match parse_path(expression) {
        Ok(tokens) => matches_path_tokens(&tokens, path),
        Err(err) => {
            warn!("Ignoring matching rule with {}", err);
            0
        }
    }
}

/// Product of the per-position token scores. Any non-matching position collapses the weight to 0.
pub fn calculate_path_weight_tokens(tokens: &[PathToken], path: &[String]) -> u32 {
    if tokens.is_empty() {
        return 0;
    }
    path.iter()
        .zip(tokens)
        .map(|(segment, token)| matches_token(segment, token))
        .product()
}

/// Parse `expression` and compute [`calculate_path_weight_tokens`].
pub fn calculate_path_weight(expression: &str, path: &[String]) -> u32 {
    parse_path(expression)
        .map(|tokens| calculate_path_weight_tokens(&tokens, path))
        .unwrap_or(0)
}

/// Join `segment` onto `root`, using bracket notation for indices and unusual field names.
pub fn construct_valid_path(segment: &str, root: &str) -> String {
    if root.is_empty() {
        return segment.to_string();
    }
    if segment.is_empty() {
        return root.to_string();
    }
    let root = root.trim_end_matches('.');
    if is_index_segment(segment) {
        format!("{root}[{segment}]")
    } else if segment != "*" && segment.chars().any(|c| !valid_path_character(c)) {
        format!("{root}['{segment}']")
    } else {
        format!("{root}.{segment}")
    }
}

/// Render a concrete path as a path expression string, e.g. `$.items[0].name`.
pub fn construct_path<S: AsRef<str>>(path: &[S]) -> String {
    path.iter().fold(String::new(), |acc, segment| {
        if acc.is_empty() {
            segment.as_ref().to_string()
        } else {
            construct_valid_path(segment.as_ref(), &acc)
        }
    })
}

/// Render tokens back into an expression string.
pub fn path_from_tokens(tokens: &[PathToken]) -> String {
    tokens.iter().fold(String::new(), |mut acc, token| {
        let rendered = token.to_string();
        match token {
            PathToken::Field(_) | PathToken::Star
                if !acc.is_empty() && !rendered.starts_with('[') =>
            {
                acc.push('.');
                acc.push_str(&rendered);
            }
            _ => acc.push_str(&rendered),
        }
        acc
    })
}
