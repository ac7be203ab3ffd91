//! In-memory inverted index
//!
//! Maps term -> (segment-local doc id -> [`Posting`]). The index is
//! append-only: documents are never removed from an index, whole segments
//! are retired instead.

mod posting;

pub use posting::Posting;

use crate::text::Token;
use ahash::AHashMap;
use std::collections::BTreeMap;

/// Segment-local document id
pub type DocId = u32;

/// Postings of one term, keyed by document
pub type PostingList = BTreeMap<DocId, Posting>;

static EMPTY_POSTINGS: PostingList = BTreeMap::new();

#[derive(Debug, Clone, Default)]
pub struct InvertedIndex {
    terms: AHashMap<String, PostingList>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one occurrence of `term` in `doc_id`
    ///
    /// Repeated calls for the same (term, doc) pair are not deduplicated:
    /// every call adds an occurrence.
    pub fn add_term(&mut self, term: &str, doc_id: DocId, position: u32, offset: u32) {
        self.terms
            .entry(term.to_string())
            .or_default()
            .entry(doc_id)
            .or_default()
            .add_occurrence(position, offset);
    }

    /// Add every token of a document, in order
    pub fn add_document(&mut self, doc_id: DocId, tokens: &[Token]) {
        for token in tokens {
            self.add_term(&token.term, doc_id, token.position, token.offset);
        }
    }

    /// Insert a whole stored posting, replacing any existing one for the pair
    pub fn insert_posting(&mut self, term: &str, doc_id: DocId, posting: Posting) {
        self.terms
            .entry(term.to_string())
            .or_default()
            .insert(doc_id, posting);
    }

    /// Postings for `term`; empty when the term was never indexed
    pub fn get_postings(&self, term: &str) -> &PostingList {
        self.terms.get(term).unwrap_or(&EMPTY_POSTINGS)
    }

    /// Posting for one (term, document) pair
    pub fn posting(&self, term: &str, doc_id: DocId) -> Option<&Posting> {
        self.terms.get(term).and_then(|postings| postings.get(&doc_id))
    }

    /// Number of documents containing `term`
    pub fn document_frequency(&self, term: &str) -> usize {
        self.get_postings(term).len()
    }

    /// All (term, postings) entries, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PostingList)> {
        self.terms.iter().map(|(term, postings)| (term.as_str(), postings))
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Re-derive a document's token stream from its postings
    ///
    /// Tokens are collected term by term and then sorted by position. Since
    /// positions are unique within one document this restores the order the
    /// tokens were originally indexed in.
    pub fn reconstruct_tokens(&self, doc_id: DocId) -> Vec<Token> {
        let mut tokens: Vec<Token> = self
            .terms
            .iter()
            .filter_map(|(term, postings)| postings.get(&doc_id).map(|p| (term, p)))
            .flat_map(|(term, posting)| {
                posting
                    .occurrences()
                    .map(move |(position, offset)| Token::new(term.clone(), position, offset))
            })
            .collect();

        tokens.sort_by(|a, b| a.position.cmp(&b.position).then(a.term.cmp(&b.term)));
        tokens
    }
}
