//! Token-level statement handling.
//!
//! Masks MySQL `#` comments, which the tokenizer does not recognise, and
//! locates the statement text to execute. When the grammar parser cannot read
//! a query, statements are split on semicolons and typed by their leading
//! keyword.

use std::borrow::Cow;

use sqlparser::dialect::Dialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Location, Token, Tokenizer};
use tracing::debug;

use super::{QueryRejection, StatementType};

/// Splits `sql` into statements and classifies each by its leading keyword.
///
/// Segments holding only whitespace and comments are not statements.
pub(super) fn classify_lexically(
    dialect: &dyn Dialect,
    sql: &str,
) -> Result<Vec<StatementType>, QueryRejection> {
    let tokens = Tokenizer::new(dialect, sql).tokenize().map_err(|e| {
        debug!("Tokenizer rejected query: {}", e);
        QueryRejection::Invalid
    })?;

    let mut statements = Vec::new();
    let mut segment: Vec<&Token> = Vec::new();

    for token in &tokens {
        match token {
            Token::SemiColon => {
                if !segment.is_empty() {
                    statements.push(classify_segment(&segment));
                    segment.clear();
                }
            }
            Token::Whitespace(_) | Token::EOF => {}
            other => segment.push(other),
        }
    }

    if !segment.is_empty() {
        statements.push(classify_segment(&segment));
    }

    Ok(statements)
}

#[derive(Clone, Copy, PartialEq)]
enum ScanState {
    Code,
    Quoted(char),
    LineComment,
    BlockComment,
    HashComment,
}

/// Replaces each character of a `#` comment with a space.
///
/// Quoted text and `--` / `/* */` comments are left alone. The character
/// count is preserved, so token locations in the result index the input.
pub(super) fn mask_hash_comments(sql: &str) -> Cow<'_, str> {
    if !sql.contains('#') {
        return Cow::Borrowed(sql);
    }

    let mut masked = String::with_capacity(sql.len());
    let mut state = ScanState::Code;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            ScanState::Code => match c {
                '\'' | '"' | '`' => state = ScanState::Quoted(c),
                '#' => {
                    state = ScanState::HashComment;
                    masked.push(' ');
                    continue;
                }
                '-' if chars.peek() == Some(&'-') => state = ScanState::LineComment,
                '/' if chars.peek() == Some(&'*') => {
                    masked.push(c);
                    masked.extend(chars.next());
                    state = ScanState::BlockComment;
                    continue;
                }
                _ => {}
            },
            ScanState::Quoted(quote) => {
                if c == '\\' && quote != '`' {
                    masked.push(c);
                    masked.extend(chars.next());
                    continue;
                }
                if c == quote {
                    state = ScanState::Code;
                }
            }
            ScanState::LineComment => {
                if c == '\n' {
                    state = ScanState::Code;
                }
            }
            ScanState::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    masked.push(c);
                    masked.extend(chars.next());
                    state = ScanState::Code;
                    continue;
                }
            }
            ScanState::HashComment => {
                if c == '\n' {
                    state = ScanState::Code;
                } else {
                    masked.push(' ');
                    continue;
                }
            }
        }
        masked.push(c);
    }

    Cow::Owned(masked)
}

/// Returns the part of `sql` from its first to its last significant token.
///
/// Surrounding whitespace, comments and terminators are dropped. `masked` is
/// `sql` after [`mask_hash_comments`].
pub(super) fn statement_text<'a>(
    dialect: &dyn Dialect,
    sql: &'a str,
    masked: &str,
) -> Result<&'a str, QueryRejection> {
    let tokens = Tokenizer::new(dialect, masked)
        .tokenize_with_location()
        .map_err(|_| QueryRejection::Invalid)?;

    let significant = |token: &Token| {
        !matches!(token, Token::Whitespace(_) | Token::SemiColon | Token::EOF)
    };
    let first = tokens
        .iter()
        .position(|t| significant(&t.token))
        .ok_or(QueryRejection::Invalid)?;
    let last = tokens
        .iter()
        .rposition(|t| significant(&t.token))
        .ok_or(QueryRejection::Invalid)?;

    let line_starts = line_starts(masked);
    let start = char_offset(&line_starts, tokens[first].location)?;
    let end = match tokens.get(last + 1) {
        Some(next) => char_offset(&line_starts, next.location)?,
        None => masked.chars().count(),
    };

    let start = byte_offset(sql, start);
    let end = byte_offset(sql, end);
    sql.get(start..end)
        .map(str::trim_end)
        .ok_or(QueryRejection::Invalid)
}

/// Character offsets at which each line begins.
fn line_starts(text: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(
            text.chars()
                .enumerate()
                .filter(|(_, c)| *c == '\n')
                .map(|(i, _)| i + 1),
        )
        .collect()
}

/// Tokenizer locations are 1-based lines and character columns.
fn char_offset(line_starts: &[usize], location: Location) -> Result<usize, QueryRejection> {
    let line = usize::try_from(location.line).map_err(|_| QueryRejection::Invalid)?;
    let column = usize::try_from(location.column).map_err(|_| QueryRejection::Invalid)?;

    line.checked_sub(1)
        .and_then(|index| line_starts.get(index))
        .zip(column.checked_sub(1))
        .map(|(start, column)| start + column)
        .ok_or(QueryRejection::Invalid)
}

fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map_or(text.len(), |(index, _)| index)
}

/// Classifies one statement's significant tokens.
fn classify_segment(tokens: &[&Token]) -> StatementType {
    match tokens.first() {
        Some(Token::Word(word)) if word.keyword == Keyword::WITH => classify_after_with(&tokens[1..]),
        Some(Token::Word(word)) => keyword_type(word.keyword),
        _ => StatementType::Unknown,
    }
}

/// A `WITH` prefix is typed by the first DML keyword outside parentheses.
fn classify_after_with(tokens: &[&Token]) -> StatementType {
    let mut depth = 0usize;

    for token in tokens {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            Token::Word(word) if depth == 0 => match word.keyword {
                Keyword::SELECT | Keyword::INSERT | Keyword::UPDATE | Keyword::DELETE
                | Keyword::REPLACE => return keyword_type(word.keyword),
                _ => {}
            },
            _ => {}
        }
    }

    StatementType::Unknown
}

fn keyword_type(keyword: Keyword) -> StatementType {
    match keyword {
        Keyword::SELECT => StatementType::Select,
        Keyword::INSERT => StatementType::Insert,
        Keyword::UPDATE => StatementType::Update,
        Keyword::DELETE => StatementType::Delete,
        Keyword::REPLACE => StatementType::Replace,
        Keyword::DROP => StatementType::Drop,
        Keyword::TRUNCATE => StatementType::Truncate,
        Keyword::ALTER => StatementType::Alter,
        Keyword::CREATE => StatementType::Create,
        Keyword::GRANT => StatementType::Grant,
        Keyword::REVOKE => StatementType::Revoke,
        Keyword::EXPLAIN | Keyword::DESCRIBE | Keyword::DESC => StatementType::Explain,
        Keyword::SHOW => StatementType::Show,
        Keyword::VALUES => StatementType::Values,
        Keyword::TABLE => StatementType::Table,
        _ => StatementType::Unknown,
    }
}
