//! Advanced-search grammar for the notification feed.
//!
//! Parses a free-text search string into a [`FilterExpression`] — two
//! predicate lists, `and` (all must hold) and `or` (at least one must hold
//! when non-empty). The grammar is deliberately small:
//!
//! - `type:billing` — restrict to notification kinds (values lower-cased,
//!   merged with any explicitly selected kinds into one [`Filter::TypeIn`]).
//! - `-spam` — unconditional exclusion, wherever it appears in the string.
//! - `a AND b` / `a OR b` — binary operators joining the neighboring terms.
//! - bare terms — match-any ("default OR") inclusion.
//!
//! Parsing never fails: anything unrecognized degrades to a plain inclusion
//! term. Quoted-phrase syntax is not part of the grammar; quote characters
//! pass through as ordinary term characters.
//!
//! This module lives in `core` (zero database deps) so the grammar stays
//! independent of the persistence technology; `opsdesk-db` owns the single
//! lowering point from [`Filter`] to SQL.

use serde::Serialize;

// ---------------------------------------------------------------------------
// Filter AST
// ---------------------------------------------------------------------------

/// One predicate over a notification row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "op", content = "value")]
pub enum Filter {
    /// Message or kind contains the term (case-insensitive substring).
    Include(String),
    /// Neither message nor kind contains the term.
    Exclude(String),
    /// Kind is one of the listed values (exact match).
    TypeIn(Vec<String>),
}

/// The parsed form of an advanced search string.
///
/// `and` entries must all hold; when `or` is non-empty a row must
/// additionally satisfy at least one of its entries. An empty expression
/// means "no filtering" — never "match nothing".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterExpression {
    pub and: Vec<Filter>,
    pub or: Vec<Filter>,
}

impl FilterExpression {
    /// `true` when the expression imposes no constraints at all.
    pub fn is_empty(&self) -> bool {
        self.and.is_empty() && self.or.is_empty()
    }

    /// Evaluate the expression against a single row's text fields.
    ///
    /// This is the reference semantics for the grammar; the SQL lowering in
    /// the repository layer must agree with it.
    pub fn matches(&self, message: &str, kind: Option<&str>) -> bool {
        let all_and = self.and.iter().all(|f| f.matches(message, kind));
        let any_or = self.or.is_empty() || self.or.iter().any(|f| f.matches(message, kind));
        all_and && any_or
    }
}

impl Filter {
    /// Evaluate a single predicate against a row's text fields.
    pub fn matches(&self, message: &str, kind: Option<&str>) -> bool {
        match self {
            Filter::Include(term) => contains_ci(message, term) || kind.is_some_and(|k| contains_ci(k, term)),
            Filter::Exclude(term) => !contains_ci(message, term) && !kind.is_some_and(|k| contains_ci(k, term)),
            Filter::TypeIn(kinds) => kind.is_some_and(|k| kinds.iter().any(|v| v == k)),
        }
    }
}

/// Case-insensitive substring containment.
fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// The `type:` field-filter prefix.
const TYPE_PREFIX: &str = "type:";

/// Parse an advanced search string into a [`FilterExpression`].
///
/// `explicit_kinds` are kinds already selected structurally (e.g. via a
/// filter dropdown); they are unioned with any `type:` tokens from the
/// search string. Parsed values are lower-cased, explicit values kept as
/// given, duplicates dropped preserving first occurrence.
///
/// An empty or whitespace-only search with no explicit kinds yields an
/// empty expression.
pub fn parse(search: &str, explicit_kinds: &[String]) -> FilterExpression {
    let mut expr = FilterExpression::default();

    // Pass 1: pull out `type:` tokens and exclusions; collect the rest.
    let mut kinds: Vec<String> = Vec::new();
    let mut terms: Vec<&str> = Vec::new();

    for token in search.split_whitespace() {
        if let Some(value) = token.strip_prefix(TYPE_PREFIX) {
            if !value.is_empty() {
                push_unique(&mut kinds, value.to_lowercase());
            }
            continue;
        }
        if let Some(excluded) = token.strip_prefix('-') {
            // An exclusion is required regardless of its position relative
            // to any AND/OR operators, so it never participates as an
            // operator operand.
            if !excluded.is_empty() {
                expr.and.push(Filter::Exclude(excluded.to_string()));
                continue;
            }
            // A lone "-" degrades to a plain term below.
        }
        terms.push(token);
    }

    for kind in explicit_kinds {
        push_unique(&mut kinds, kind.clone());
    }
    if !kinds.is_empty() {
        expr.and.push(Filter::TypeIn(kinds));
    }

    // Pass 2: resolve AND/OR operators over the remaining plain terms.
    //
    // A bare term is held until the next token decides its fate: an
    // operator claims it as the left operand; anything else flushes it to
    // the default-OR list.
    let mut held: Option<String> = None;
    let mut pending_op: Option<Op> = None;

    for token in terms {
        match token {
            "AND" => pending_op = Some(Op::And),
            "OR" => pending_op = Some(Op::Or),
            term => match pending_op.take() {
                Some(op) => {
                    let bucket = match op {
                        Op::And => &mut expr.and,
                        Op::Or => &mut expr.or,
                    };
                    if let Some(left) = held.take() {
                        bucket.push(Filter::Include(left));
                    }
                    bucket.push(Filter::Include(term.to_string()));
                }
                None => {
                    if let Some(prev) = held.replace(term.to_string()) {
                        expr.or.push(Filter::Include(prev));
                    }
                }
            },
        }
    }

    // A trailing held term (including one left dangling by an operator with
    // no right operand) degrades to a default-OR term.
    if let Some(term) = held {
        expr.or.push(Filter::Include(term));
    }

    expr
}

/// A binary search operator.
#[derive(Debug, Clone, Copy)]
enum Op {
    And,
    Or,
}

/// Append `value` unless an equal entry is already present.
fn push_unique(values: &mut Vec<String>, value: String) {
    if !values.contains(&value) {
        values.push(value);
    }
}

// ---------------------------------------------------------------------------
// Pagination bounds
// ---------------------------------------------------------------------------

/// Default number of notifications per page.
pub const DEFAULT_PAGE_LIMIT: i64 = 50;

/// Maximum number of notifications per page.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Clamp a user-provided limit to valid bounds.
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_PAGE_LIMIT).max(1).min(MAX_PAGE_LIMIT)
}

/// Clamp a user-provided offset to non-negative.
pub fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
