use crate::{DocId, DocSet};
use std::collections::{HashMap, HashSet};

/// Term -> set of documents containing it, plus the corpus universe.
#[derive(Debug, Default)]
pub struct UnorderedIndex {
    postings: HashMap<String, DocSet>,
    all_docs: DocSet,
}

impl UnorderedIndex {
    pub fn new() -> Self { Self::default() }

    /// Register `doc_id` and add it under every distinct term of the document.
    pub fn index<S: AsRef<str>>(&mut self, document_terms: &[S], doc_id: DocId) {
        self.all_docs.insert(doc_id);
        let distinct: HashSet<&str> = document_terms.iter().map(AsRef::as_ref).collect();
        for term in distinct {
            match self.postings.get_mut(term) {
                Some(docs) => {
                    docs.insert(doc_id);
                }
                None => {
                    self.postings.insert(term.to_string(), DocSet::from([doc_id]));
                }
            }
        }
    }

    /// Borrowed posting set, `None` for unknown terms.
    pub fn postings(&self, term: &str) -> Option<&DocSet> {
        self.postings.get(term)
    }

    /// Documents containing `term`; empty for unknown terms.
    pub fn documents_with(&self, term: &str) -> DocSet {
        self.postings(term).cloned().unwrap_or_default()
    }

    /// Corpus universe minus `documents_with(term)`.
    pub fn documents_without(&self, term: &str) -> DocSet {
        match self.postings(term) {
            Some(docs) => self.all_docs.difference(docs).copied().collect(),
            None => self.all_docs.clone(),
        }
    }

    pub fn boolean_and(&self, t1: &str, t2: &str) -> DocSet {
        match (self.postings(t1), self.postings(t2)) {
            (Some(a), Some(b)) => a.intersection(b).copied().collect(),
            _ => DocSet::new(),
        }
    }

    pub fn boolean_or(&self, t1: &str, t2: &str) -> DocSet {
        let mut out = self.documents_with(t1);
        if let Some(b) = self.postings(t2) {
            out.extend(b.iter().copied());
        }
        out
    }

    pub fn all_documents(&self) -> &DocSet {
        &self.all_docs
    }

    pub fn num_terms(&self) -> usize {
        self.postings.len()
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> + '_ {
        self.postings.keys().map(String::as_str)
    }
}
