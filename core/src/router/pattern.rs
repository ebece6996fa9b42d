//! Route pattern compilation.
//!
//! `:name` placeholders become `([^/]+)` capture groups, everything else is
//! matched literally, and a single trailing slash is always accepted.

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use regex::Regex;

use courier_types::Params;

use super::RouteError;

/// Characters escaped when a parameter value is written back into a path.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

enum Token<'a> {
    Literal(&'a str),
    Param(&'a str),
}

/// Split a pattern into literal runs and `:name` placeholders. A `:` not
/// followed by an identifier is an error.
fn tokenize(pattern: &str) -> Option<Vec<Token<'_>>> {
    let bytes = pattern.as_bytes();
    let mut tokens = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b':' {
            i += 1;
            continue;
        }
        let name_start = i + 1;
        let mut end = name_start;
        while end < bytes.len()
            && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_')
            && !(end == name_start && bytes[end].is_ascii_digit())
        {
            end += 1;
        }
        if end == name_start {
            return None;
        }
        if literal_start < i {
            tokens.push(Token::Literal(&pattern[literal_start..i]));
        }
        tokens.push(Token::Param(&pattern[name_start..end]));
        literal_start = end;
        i = end;
    }
    if literal_start < bytes.len() {
        tokens.push(Token::Literal(&pattern[literal_start..]));
    }
    Some(tokens)
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledPattern {
    source: String,
    matcher: Regex,
    names: Vec<String>,
}

impl CompiledPattern {
    pub(crate) fn compile(pattern: &str) -> Result<Self, RouteError> {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            return Err(RouteError::EmptyPattern);
        }
        let body = trimmed.trim_end_matches('/');
        let tokens = tokenize(body).ok_or_else(|| RouteError::EmptyParam {
            pattern: pattern.to_string(),
        })?;

        let mut expression = String::from("^");
        let mut names: Vec<String> = Vec::new();
        for token in tokens {
            match token {
                Token::Literal(text) => expression.push_str(&regex::escape(text)),
                Token::Param(name) => {
                    if names.iter().any(|existing| existing == name) {
                        return Err(RouteError::DuplicateParam {
                            pattern: pattern.to_string(),
                            name: name.to_string(),
                        });
                    }
                    expression.push_str("([^/]+)");
                    names.push(name.to_string());
                }
            }
        }
        expression.push_str("/?$");

        let matcher = Regex::new(&expression).map_err(|source| RouteError::Regex {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            source: trimmed.to_string(),
            matcher,
            names,
        })
    }

    pub(crate) fn source(&self) -> &str {
        &self.source
    }

    /// Decoded parameters if `path` matches.
    pub(crate) fn matches(&self, path: &str) -> Option<Params> {
        let caps = self.matcher.captures(path)?;
        Some(
            self.names
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let raw = caps.get(i + 1).map_or("", |m| m.as_str());
                    (name.clone(), decode_segment(raw))
                })
                .collect(),
        )
    }

    /// Fill the placeholders back in. `None` if a parameter is missing.
    pub(crate) fn build(&self, params: &Params) -> Option<String> {
        let mut out = String::with_capacity(self.source.len());
        for token in tokenize(&self.source)? {
            match token {
                Token::Literal(text) => out.push_str(text),
                Token::Param(name) => {
                    out.extend(utf8_percent_encode(params.get(name)?, SEGMENT));
                }
            }
        }
        Some(out)
    }
}

fn decode_segment(raw: &str) -> String {
    match percent_decode_str(raw).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            tracing::warn!(segment = raw, "Route segment is not valid UTF-8 once decoded: {e}");
            raw.to_string()
        }
    }
}
