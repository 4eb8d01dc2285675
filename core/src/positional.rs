//! Positional postings (term -> doc -> offsets) for proximity search.
//!
//! Offsets are indices into the normalized term stream of a document, not
//! byte or raw-word positions. Stop words are already gone, so offsets are
//! dense over the surviving terms.

use crate::{DocId, DocSet, Position};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
pub struct PositionalIndex {
    // term -> (doc_id -> increasing offsets)
    postings: HashMap<String, BTreeMap<DocId, Vec<Position>>>,
    all_docs: DocSet,
}

impl PositionalIndex {
    pub fn new() -> Self { Self::default() }

    /// Register `doc_id` and append every offset of every term.
    ///
    /// Calling this twice for one id appends a second run of offsets; callers
    /// index each document once. Terms past offset `u32::MAX` are not indexed.
    pub fn index<S: AsRef<str>>(&mut self, document_terms: &[S], doc_id: DocId) {
        self.all_docs.insert(doc_id);
        for (i, term) in document_terms.iter().enumerate() {
            let term = term.as_ref();
            let Some(pos) = position(i) else {
                tracing::warn!(doc_id, len = document_terms.len(), "document too long, truncating positional postings");
                break;
            };
            match self.postings.get_mut(term) {
                Some(docs) => docs.entry(doc_id).or_default().push(pos),
                None => {
                    let mut docs = BTreeMap::new();
                    docs.insert(doc_id, vec![pos]);
                    self.postings.insert(term.to_string(), docs);
                }
            }
        }
    }

    /// Offsets of `term` in `doc_id`; empty when either is unknown.
    pub fn positions_of(&self, term: &str, doc_id: DocId) -> &[Position] {
        self.postings
            .get(term)
            .and_then(|docs| docs.get(&doc_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Documents holding at least one offset for `term`.
    pub fn documents_with(&self, term: &str) -> DocSet {
        self.postings
            .get(term)
            .map(|docs| docs.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Documents containing both terms with some occurrence pair satisfying
    /// `|pos1 - pos2| <= distance`.
    ///
    /// Only documents in the intersection of the two posting lists are
    /// scanned. Per candidate the scan is a cross product of the two offset
    /// lists that stops at the first matching pair.
    pub fn proximity_search(&self, term1: &str, term2: &str, distance: u32) -> DocSet {
        let (Some(docs1), Some(docs2)) = (self.postings.get(term1), self.postings.get(term2)) else {
            return DocSet::new();
        };
        // walk the smaller map, probe the larger
        let (small, large, swapped) = if docs1.len() <= docs2.len() {
            (docs1, docs2, false)
        } else {
            (docs2, docs1, true)
        };
        let mut matches = DocSet::new();
        for (doc_id, small_pos) in small {
            let Some(large_pos) = large.get(doc_id) else { continue };
            let (p1, p2) = if swapped { (large_pos, small_pos) } else { (small_pos, large_pos) };
            if any_within(p1, p2, distance) {
                matches.insert(*doc_id);
            }
        }
        tracing::trace!(term1, term2, distance, hits = matches.len(), "proximity search");
        matches
    }

    pub fn all_documents(&self) -> &DocSet {
        &self.all_docs
    }

    pub fn num_terms(&self) -> usize {
        self.postings.len()
    }
}

fn position(offset: usize) -> Option<Position> {
    Position::try_from(offset).ok()
}

fn any_within(p1: &[Position], p2: &[Position], distance: u32) -> bool {
    p1.iter().any(|&a| p2.iter().any(|&b| a.abs_diff(b) <= distance))
}
