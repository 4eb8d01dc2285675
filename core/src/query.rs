use crate::error::QueryError;
use crate::{DocSet, Normalizer, SearchIndex};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::fmt;

lazy_static! {
    // term1 <ws> term2 [ws] / [ws] distance
    static ref PROXIMITY: Regex = Regex::new(r"^\s*(\S.*?)\s+(\S.*?)\s*/\s*(\d+)\s*$").expect("valid regex");
}

const USAGE: &str = "use boolean operators (AND, OR, NOT) or proximity search (word1 word2 / distance)";
const PROXIMITY_USAGE: &str = "proximity query format should be: word1 word2 / distance";

/// Shape of a query string, decided before any index is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    Boolean,
    Proximity,
    Invalid,
}

/// A `/` anywhere means proximity; otherwise an `AND`/`OR`/`NOT` token or a
/// single bare word means boolean. Anything else is invalid.
pub fn classify(query: &str) -> QueryKind {
    if query.contains('/') {
        return QueryKind::Proximity;
    }
    if query.split_whitespace().any(|t| matches!(t, "AND" | "OR" | "NOT")) {
        return QueryKind::Boolean;
    }
    let mut tokens = query.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(_), None) => QueryKind::Boolean,
        _ => QueryKind::Invalid,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    And,
    Or,
}

impl Op {
    fn apply(self, mut left: DocSet, right: DocSet) -> DocSet {
        match self {
            Op::And => {
                left.retain(|d| right.contains(d));
                left
            }
            Op::Or => {
                left.extend(right);
                left
            }
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::And => f.write_str("AND"),
            Op::Or => f.write_str("OR"),
        }
    }
}

enum Entry {
    Operand(DocSet),
    Operator(Op),
}

/// Evaluates query strings against a frozen [`SearchIndex`].
///
/// Holds only borrows, so any number of processors can serve concurrently
/// from one index.
pub struct QueryProcessor<'a, N: Normalizer> {
    index: &'a SearchIndex,
    normalizer: &'a N,
}

impl<'a, N: Normalizer> QueryProcessor<'a, N> {
    pub fn new(index: &'a SearchIndex, normalizer: &'a N) -> Self {
        Self { index, normalizer }
    }

    pub fn evaluate(&self, query: &str) -> Result<DocSet, QueryError> {
        self.evaluate_with_kind(query).1
    }

    /// Like [`evaluate`](Self::evaluate), also returning the shape the query
    /// was dispatched on.
    pub fn evaluate_with_kind(&self, query: &str) -> (QueryKind, Result<DocSet, QueryError>) {
        let kind = classify(query);
        let result = match kind {
            QueryKind::Boolean => self.evaluate_boolean(query),
            QueryKind::Proximity => self.evaluate_proximity(query),
            QueryKind::Invalid => Err(QueryError::invalid(USAGE)),
        };
        match &result {
            Ok(docs) => tracing::debug!(query, ?kind, hits = docs.len(), "query evaluated"),
            Err(e) => tracing::debug!(query, ?kind, error = %e, "query rejected"),
        }
        (kind, result)
    }

    /// Left-to-right AND/OR/NOT chain with no precedence: each operator is
    /// applied as soon as its right operand arrives, so `a AND b OR c` is
    /// `(a AND b) OR c`.
    pub fn evaluate_boolean(&self, query: &str) -> Result<DocSet, QueryError> {
        let mut stack: Vec<Entry> = Vec::new();
        let mut negate = false;

        for word in query.split_whitespace() {
            match word {
                "NOT" => negate = true,
                "AND" | "OR" => {
                    let op = if word == "AND" { Op::And } else { Op::Or };
                    if negate {
                        return Err(QueryError::invalid(format!("NOT must be followed by a term, found {op}")));
                    }
                    match stack.last() {
                        Some(Entry::Operand(_)) => stack.push(Entry::Operator(op)),
                        Some(Entry::Operator(prev)) => {
                            return Err(QueryError::invalid(format!("operator {op} directly follows {prev}")));
                        }
                        None => return Err(QueryError::invalid(format!("operator {op} has no left operand"))),
                    }
                }
                _ => {
                    let mut result = self.lookup(word, negate);
                    negate = false;
                    while matches!(stack.last(), Some(Entry::Operator(_))) {
                        let Some(Entry::Operator(op)) = stack.pop() else { break };
                        match stack.pop() {
                            Some(Entry::Operand(left)) => result = op.apply(left, result),
                            _ => return Err(QueryError::invalid(format!("operator {op} has no left operand"))),
                        }
                    }
                    if matches!(stack.last(), Some(Entry::Operand(_))) {
                        return Err(QueryError::invalid(format!("expected AND or OR before '{word}'")));
                    }
                    stack.push(Entry::Operand(result));
                }
            }
        }

        if negate {
            return Err(QueryError::invalid("NOT must be followed by a term"));
        }
        match stack.pop() {
            Some(Entry::Operand(docs)) => Ok(docs),
            Some(Entry::Operator(op)) => Err(QueryError::invalid(format!("operator {op} has no right operand"))),
            None => Ok(DocSet::new()),
        }
    }

    /// `term1 term2 / distance`. Each term chunk contributes only its first
    /// normalized term. Offsets are `u32`, so a distance past `u32::MAX`
    /// saturates and only requires both terms to be present.
    pub fn evaluate_proximity(&self, query: &str) -> Result<DocSet, QueryError> {
        let caps = PROXIMITY
            .captures(query)
            .ok_or_else(|| QueryError::invalid(PROXIMITY_USAGE))?;
        // digits only, so the sole parse failure is overflow
        let distance = caps[3].parse::<u32>().unwrap_or(u32::MAX);
        let (Some(t1), Some(t2)) = (self.term(&caps[1]), self.term(&caps[2])) else {
            return Ok(DocSet::new());
        };
        Ok(self.index.positional().proximity_search(&t1, &t2, distance))
    }

    fn term(&self, raw: &str) -> Option<String> {
        self.normalizer.normalize_query_fragment(raw).into_iter().next()
    }

    fn lookup(&self, word: &str, negate: bool) -> DocSet {
        let unordered = self.index.unordered();
        match (self.term(word), negate) {
            (Some(t), false) => unordered.documents_with(&t),
            (Some(t), true) => unordered.documents_without(&t),
            (None, false) => DocSet::new(),
            (None, true) => unordered.all_documents().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IndexBuilder;

    /// Identity normalizer: whitespace split, lowercase.
    struct Plain;

    impl Normalizer for Plain {
        fn normalize_document(&self, text: &str) -> Vec<String> {
            text.split_whitespace().map(str::to_lowercase).collect()
        }
    }

    fn index() -> SearchIndex {
        let mut b = IndexBuilder::new();
        b.add_document(1, &["a"]).unwrap();
        b.add_document(2, &["a", "b"]).unwrap();
        b.add_document(3, &["b", "c"]).unwrap();
        b.add_document(4, &["c"]).unwrap();
        b.finish()
    }

    #[test]
    fn classify_shapes() {
        assert_eq!(classify("a b / 3"), QueryKind::Proximity);
        assert_eq!(classify("a AND b"), QueryKind::Boolean);
        assert_eq!(classify("NOT a"), QueryKind::Boolean);
        assert_eq!(classify("word"), QueryKind::Boolean);
        assert_eq!(classify("two words"), QueryKind::Invalid);
        assert_eq!(classify("   "), QueryKind::Invalid);
        // keywords are whole tokens, case-sensitive
        assert_eq!(classify("ANDROID phone"), QueryKind::Invalid);
        assert_eq!(classify("cats and dogs"), QueryKind::Invalid);
    }

    #[test]
    fn left_associative_without_precedence() {
        let idx = index();
        let qp = QueryProcessor::new(&idx, &Plain);
        assert_eq!(qp.evaluate("a AND b OR c").unwrap(), DocSet::from([2, 3, 4]));
        assert_eq!(qp.evaluate("c OR a AND b").unwrap(), DocSet::from([2, 3]));
    }

    #[test]
    fn not_applies_to_next_term_only() {
        let idx = index();
        let qp = QueryProcessor::new(&idx, &Plain);
        assert_eq!(qp.evaluate("NOT a").unwrap(), DocSet::from([3, 4]));
        assert_eq!(qp.evaluate("b AND NOT a").unwrap(), DocSet::from([3]));
        assert_eq!(qp.evaluate("NOT missing").unwrap(), DocSet::from([1, 2, 3, 4]));
    }

    #[test]
    fn terms_are_normalized() {
        let idx = index();
        let qp = QueryProcessor::new(&idx, &Plain);
        assert_eq!(qp.evaluate("A").unwrap(), DocSet::from([1, 2]));
    }

    #[test]
    fn malformed_chains_are_invalid() {
        let idx = index();
        let qp = QueryProcessor::new(&idx, &Plain);
        for q in ["AND a", "a AND", "a AND OR b", "a NOT", "a b NOT c", "NOT AND a"] {
            assert!(matches!(qp.evaluate(q), Err(QueryError::InvalidQuery(_))), "{q}");
        }
    }

    #[test]
    fn empty_boolean_is_empty_set() {
        let idx = index();
        let qp = QueryProcessor::new(&idx, &Plain);
        assert!(qp.evaluate_boolean("").unwrap().is_empty());
    }

    #[test]
    fn proximity_parses_and_delegates() {
        let mut b = IndexBuilder::new();
        b.add_document(1, &["x", "y", "info", "z", "w", "retrieve"]).unwrap();
        let idx = b.finish();
        let qp = QueryProcessor::new(&idx, &Plain);
        assert_eq!(qp.evaluate("info retrieve / 3").unwrap(), DocSet::from([1]));
        assert_eq!(qp.evaluate("info retrieve/3").unwrap(), DocSet::from([1]));
        assert!(qp.evaluate("info retrieve / 2").unwrap().is_empty());
    }

    #[test]
    fn malformed_proximity_reports_format() {
        let idx = index();
        let qp = QueryProcessor::new(&idx, &Plain);
        let err = qp.evaluate("information /").unwrap_err();
        assert_eq!(err.reason(), PROXIMITY_USAGE);
        assert!(qp.evaluate("a b / -1").is_err());
    }

    #[test]
    fn oversized_distance_saturates() {
        let mut b = IndexBuilder::new();
        b.add_document(1, &["info", "x", "y", "retrieve"]).unwrap();
        b.add_document(2, &["info"]).unwrap();
        let idx = b.finish();
        let qp = QueryProcessor::new(&idx, &Plain);
        assert_eq!(qp.evaluate("info retrieve / 5000000000").unwrap(), DocSet::from([1]));
        assert_eq!(qp.evaluate("info retrieve / 99999999999999999999999").unwrap(), DocSet::from([1]));
    }

    #[test]
    fn evaluate_reports_dispatched_kind() {
        let idx = index();
        let qp = QueryProcessor::new(&idx, &Plain);
        assert_eq!(qp.evaluate_with_kind("a AND b").0, QueryKind::Boolean);
        assert_eq!(qp.evaluate_with_kind("a b / 2").0, QueryKind::Proximity);
        let (kind, result) = qp.evaluate_with_kind("a b");
        assert_eq!(kind, QueryKind::Invalid);
        assert!(result.is_err());
    }
}
