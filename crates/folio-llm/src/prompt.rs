//! Prompt assembly in the model's turn format.
//!
//! The wire format must match the model's chat template byte for byte:
//! a `<|system|>` turn carrying the preamble and one `Page <n>:` block per
//! page, a `<|user|>` turn with the verbatim question, and an unterminated
//! `<|assistant|>` turn for the model to complete.

use std::collections::BTreeMap;
use std::fmt::Write;

use folio_index::RetrievedChunk;

/// System preamble used when the host does not supply its own.
pub const DEFAULT_PREAMBLE: &str = "You are a helpful assistant, and you should answer questions about this information, in a direct and simple way, using only this content:";

/// Build the full prompt from ranked retrieval hits.
///
/// Hits are grouped by page and emitted in ascending page order — not in
/// relevance order, which reads worse to the model — while retrieval order
/// is kept within a page. Zero hits yields a prompt with no page blocks.
#[must_use]
pub fn assemble(preamble: &str, question: &str, ranked: &[RetrievedChunk]) -> String {
    let mut by_page: BTreeMap<u32, Vec<&str>> = BTreeMap::new();
    for hit in ranked {
        by_page
            .entry(hit.chunk.page)
            .or_default()
            .push(hit.chunk.text.as_str());
    }

    let mut prompt = String::from("<|system|>\n");
    prompt.push_str(preamble);

    let blocks: Vec<String> = by_page
        .iter()
        .map(|(page, texts)| format!("\nPage {page}: {}", texts.join("\n")))
        .collect();
    prompt.push_str(&blocks.join("\n"));

    let _ = write!(prompt, "<|end|>\n<|user|>\n{question}<|end|>\n<|assistant|>");
    prompt
}
