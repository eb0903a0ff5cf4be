//! Page text sanitization and bounded chunking.
//!
//! Each page is reduced to logical lines of printable ASCII, and every line
//! longer than the configured maximum is cut at the last space inside the
//! window, falling back to a fixed-width cut when no space exists.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{IndexError, Result};

static MULTI_PERIOD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.{2,}").expect("valid period-collapse pattern"));

/// Raw extracted text of one document page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub text: String,
    pub page: u32,
}

/// A bounded segment of page text, tagged with its source page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub text: String,
    pub page: u32,
}

/// Chunk extracted pages into segments no longer than `max_len` characters.
///
/// Line breaks are treated as candidate boundaries, control and non-ASCII
/// characters are stripped, and whitespace-only lines are dropped. Emission
/// order preserves page order, then in-page line order.
///
/// # Errors
///
/// Returns [`IndexError::InvalidChunkLength`] when `max_len` is zero.
pub fn chunk_pages(pages: &[PageText], max_len: usize) -> Result<Vec<TextChunk>> {
    if max_len == 0 {
        return Err(IndexError::InvalidChunkLength);
    }

    let mut chunks = Vec::new();
    for page in pages {
        for line in page.text.split(['\r', '\n']) {
            let line = sanitize(line);
            if line.trim().is_empty() {
                continue;
            }
            split_candidate(&line, page.page, max_len, &mut chunks);
        }
    }
    Ok(chunks)
}

/// Keep printable ASCII only; everything else is dropped.
fn sanitize(line: &str) -> String {
    line.chars().filter(|c| (' '..='~').contains(c)).collect()
}

/// Cut one sanitized line into pieces of at most `max_len` characters.
///
/// The cut point is the last space in `(index, index + max_len]`; a window
/// with no usable space is force-cut at full width so a spaceless run can
/// never stall the loop. The character at the cut point is consumed.
fn split_candidate(text: &str, page: u32, max_len: usize, out: &mut Vec<TextChunk>) {
    let bytes = text.as_bytes();
    let mut index = 0;
    while index < bytes.len() {
        if index + max_len >= bytes.len() {
            out.push(make_chunk(&text[index..], page));
            break;
        }

        let window_end = index + max_len;
        let cut = bytes[index + 1..=window_end]
            .iter()
            .rposition(|&b| b == b' ')
            .map_or(window_end, |pos| index + 1 + pos);

        out.push(make_chunk(&text[index..cut], page));
        index = cut + 1;
    }
}

fn make_chunk(raw: &str, page: u32) -> TextChunk {
    TextChunk {
        text: MULTI_PERIOD.replace_all(raw.trim(), ".").into_owned(),
        page,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(text: &str, number: u32) -> PageText {
        PageText {
            text: text.to_owned(),
            page: number,
        }
    }

    #[test]
    fn zero_max_len_rejected() {
        let err = chunk_pages(&[page("hello", 1)], 0).unwrap_err();
        assert!(matches!(err, IndexError::InvalidChunkLength));
    }

    #[test]
    fn short_line_emitted_whole() {
        let chunks = chunk_pages(&[page("hello world", 3)], 100).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "hello world");
        assert_eq!(chunks[0].page, 3);
    }

    #[test]
    fn line_of_exactly_max_len_emitted_whole() {
        let chunks = chunk_pages(&[page("abcde", 1)], 5).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "abcde");
    }

    #[test]
    fn alpha_beta_gamma_example() {
        let chunks = chunk_pages(&[page("alpha beta gamma", 1)], 11).unwrap();
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["alpha beta", "gamma"]);
    }

    #[test]
    fn splits_at_last_space_in_window() {
        let chunks = chunk_pages(&[page("Hello world. This is a test. ", 1)], 15).unwrap();
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["Hello world.", "This is a test."]);
        // Verify against the backward-scan rule rather than the literal:
        // each piece fits the window and the source char after it was a space.
        for text in texts {
            assert!(text.len() <= 15);
        }
    }

    #[test]
    fn spaceless_run_force_cuts_fixed_width() {
        let input = "a".repeat(25);
        let chunks = chunk_pages(&[page(&input, 1)], 10).unwrap();
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        // Force-cut consumes the character at the cut point, so pieces are
        // 10, then 10 of the remaining 14, then the tail.
        assert_eq!(texts, vec!["a".repeat(10), "a".repeat(10), "a".repeat(3)]);
    }

    #[test]
    fn leading_space_run_does_not_loop() {
        let input = format!("{}{}", " ".repeat(8), "b".repeat(20));
        let chunks = chunk_pages(&[page(&input, 1)], 8).unwrap();
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.text.len() <= 8);
        }
    }

    #[test]
    fn control_and_non_ascii_stripped() {
        let chunks = chunk_pages(&[page("caf\u{e9}\u{7}! r\u{e9}sum\u{e9} 42", 1)], 100).unwrap();
        assert_eq!(chunks[0].text, "caf! rsum 42");
    }

    #[test]
    fn blank_and_whitespace_lines_dropped() {
        let chunks = chunk_pages(&[page("first\r\n\r\n   \nsecond", 1)], 100).unwrap();
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn period_runs_collapsed() {
        let chunks = chunk_pages(&[page("Contents...... 4", 1)], 100).unwrap();
        assert_eq!(chunks[0].text, "Contents. 4");
    }

    #[test]
    fn page_numbers_and_order_preserved() {
        let pages = vec![page("one two three", 1), page("four five six", 2)];
        let chunks = chunk_pages(&pages, 7).unwrap();
        let tagged: Vec<(u32, &str)> = chunks.iter().map(|c| (c.page, c.text.as_str())).collect();
        assert_eq!(
            tagged,
            vec![(1, "one two"), (1, "three"), (2, "four"), (2, "five"), (2, "six")]
        );
    }

    #[test]
    fn force_cut_consumes_cut_character() {
        // The character at a forced cut point is skipped, exactly as a space
        // would be at a regular cut.
        let input = "x".repeat(23);
        let chunks = chunk_pages(&[page(&input, 1)], 7).unwrap();
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["x".repeat(7), "x".repeat(7), "x".repeat(7)]);
    }

    #[test]
    fn space_cuts_reconstruct_source_with_spaces() {
        let input = "one two three four five";
        let chunks = chunk_pages(&[page(input, 1)], 9).unwrap();
        let joined = chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(joined, input);
    }

    mod proptest_chunker {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(500))]

            #[test]
            fn chunks_never_exceed_max_len(
                text in "\\PC{0,2000}",
                max_len in 1usize..200,
            ) {
                let chunks = chunk_pages(&[PageText { text, page: 1 }], max_len).unwrap();
                for chunk in &chunks {
                    prop_assert!(chunk.text.len() <= max_len);
                }
            }

            #[test]
            fn chunks_are_printable_ascii(
                text in "\\PC{0,500}",
                max_len in 1usize..100,
            ) {
                let chunks = chunk_pages(&[PageText { text, page: 1 }], max_len).unwrap();
                for chunk in &chunks {
                    prop_assert!(chunk.text.chars().all(|c| (' '..='~').contains(&c)));
                }
            }

            #[test]
            fn spaceless_input_terminates(
                len in 1usize..3000,
                max_len in 1usize..50,
            ) {
                let text = "z".repeat(len);
                let chunks = chunk_pages(&[PageText { text, page: 1 }], max_len).unwrap();
                prop_assert!(!chunks.is_empty());
                // Each forced cut consumes at most one character.
                let total: usize = chunks.iter().map(|c| c.text.len()).sum();
                prop_assert!(total <= len);
                prop_assert!(total >= len.saturating_sub(chunks.len()));
            }

            #[test]
            fn all_chunks_carry_source_page(
                text in "[a-z ]{0,500}",
                page_number in 1u32..500,
                max_len in 1usize..100,
            ) {
                let chunks = chunk_pages(
                    &[PageText { text, page: page_number }],
                    max_len,
                ).unwrap();
                for chunk in &chunks {
                    prop_assert_eq!(chunk.page, page_number);
                }
            }
        }
    }
}
