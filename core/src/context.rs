use crate::error::BuildError;
use crate::{DocId, DocSet, PositionalIndex, UnorderedIndex};

/// Build phase: the only place the two indexes are mutable.
///
/// Both indexes are fed from the same call so they agree on the corpus
/// universe and on which documents contain which terms.
#[derive(Debug, Default)]
pub struct IndexBuilder {
    unordered: UnorderedIndex,
    positional: PositionalIndex,
}

impl IndexBuilder {
    pub fn new() -> Self { Self::default() }

    pub fn add_document<S: AsRef<str>>(&mut self, doc_id: DocId, terms: &[S]) -> Result<(), BuildError> {
        if self.unordered.all_documents().contains(&doc_id) {
            return Err(BuildError::DuplicateDocument(doc_id));
        }
        self.unordered.index(terms, doc_id);
        self.positional.index(terms, doc_id);
        Ok(())
    }

    pub fn num_documents(&self) -> usize {
        self.unordered.all_documents().len()
    }

    /// Freeze the indexes. There is no way back to the build phase.
    pub fn finish(self) -> SearchIndex {
        tracing::info!(
            num_docs = self.unordered.all_documents().len(),
            num_terms = self.unordered.num_terms(),
            "index build complete"
        );
        SearchIndex { unordered: self.unordered, positional: self.positional }
    }
}

/// Serve phase: read-only view over both indexes, safe to share across threads.
#[derive(Debug)]
pub struct SearchIndex {
    unordered: UnorderedIndex,
    positional: PositionalIndex,
}

impl SearchIndex {
    pub fn unordered(&self) -> &UnorderedIndex {
        &self.unordered
    }

    pub fn positional(&self) -> &PositionalIndex {
        &self.positional
    }

    pub fn all_documents(&self) -> &DocSet {
        self.unordered.all_documents()
    }

    pub fn num_documents(&self) -> usize {
        self.unordered.all_documents().len()
    }

    pub fn num_terms(&self) -> usize {
        self.unordered.num_terms()
    }
}
