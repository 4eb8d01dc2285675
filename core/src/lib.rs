//! Boolean and proximity retrieval over a fixed corpus of text documents.
//!
//! Documents are normalized into term sequences, fed once into an
//! [`IndexBuilder`], and frozen into a read-only [`SearchIndex`] that a
//! [`QueryProcessor`] evaluates queries against.

pub mod context;
pub mod corpus;
pub mod error;
pub mod index;
pub mod positional;
pub mod query;
pub mod tokenizer;

pub use context::{IndexBuilder, SearchIndex};
pub use error::{BuildError, QueryError};
pub use index::UnorderedIndex;
pub use positional::PositionalIndex;
pub use query::{classify, QueryKind, QueryProcessor};
pub use tokenizer::{EnglishNormalizer, Normalizer};

/// Externally supplied document identifier.
pub type DocId = u32;

/// Zero-based offset of a term within a document's normalized token stream.
pub type Position = u32;

/// Result of a query: matching document ids in ascending order.
pub type DocSet = std::collections::BTreeSet<DocId>;
