//! Immutable cursor over the pages an answer drew from.

/// Position within an ordered page list. Navigation returns a new cursor
/// instead of mutating shared state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    pages: Vec<u32>,
    index: usize,
}

impl PageCursor {
    /// `None` when there are no pages to point at.
    #[must_use]
    pub fn new(pages: Vec<u32>) -> Option<Self> {
        if pages.is_empty() {
            None
        } else {
            Some(Self { pages, index: 0 })
        }
    }

    #[must_use]
    pub fn current(&self) -> u32 {
        self.pages[self.index]
    }

    #[must_use]
    pub fn next(&self) -> Option<Self> {
        if self.index + 1 < self.pages.len() {
            Some(Self {
                pages: self.pages.clone(),
                index: self.index + 1,
            })
        } else {
            None
        }
    }

    #[must_use]
    pub fn prev(&self) -> Option<Self> {
        if self.index > 0 {
            Some(Self {
                pages: self.pages.clone(),
                index: self.index - 1,
            })
        } else {
            None
        }
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
