//! Mid-stream stop marker detection.

/// Markers that end generation: the model's own end-of-turn, plus the role
/// markers that mean it has started hallucinating a new conversational turn.
pub const STOP_MARKERS: [&str; 3] = ["<|end|>", "<|user|>", "<|system|>"];

/// Rolling scanner over decoded output. Only a short tail is retained —
/// long enough for any marker to straddle an increment boundary — which is
/// equivalent to scanning the full accumulated buffer.
#[derive(Debug, Default)]
pub struct StopWatcher {
    tail: String,
}

impl StopWatcher {
    // Longest marker is 10 bytes; keep comfortably more.
    const TAIL_KEEP: usize = 16;

    /// Append an increment and report whether any stop marker is now present.
    pub fn push(&mut self, increment: &str) -> bool {
        self.tail.push_str(increment);
        let hit = STOP_MARKERS.iter().any(|m| self.tail.contains(m));
        if !hit && self.tail.len() > Self::TAIL_KEEP {
            let mut cut = self.tail.len() - Self::TAIL_KEEP;
            while !self.tail.is_char_boundary(cut) {
                cut -= 1;
            }
            self.tail.drain(..cut);
        }
        hit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_never_matches() {
        let mut watcher = StopWatcher::default();
        for part in ["The answer", " is on", " page 4."] {
            assert!(!watcher.push(part));
        }
    }

    #[test]
    fn end_marker_in_single_increment() {
        let mut watcher = StopWatcher::default();
        assert!(watcher.push("done<|end|>"));
    }

    #[test]
    fn marker_split_across_increments() {
        let mut watcher = StopWatcher::default();
        assert!(!watcher.push("answer<|en"));
        assert!(watcher.push("d|>"));
    }

    #[test]
    fn role_markers_match() {
        let mut watcher = StopWatcher::default();
        assert!(watcher.push("<|user|>"));
        let mut watcher = StopWatcher::default();
        assert!(watcher.push("<|system|>"));
    }

    #[test]
    fn long_stream_keeps_matching_across_trims() {
        let mut watcher = StopWatcher::default();
        for _ in 0..100 {
            assert!(!watcher.push("lorem ipsum "));
        }
        assert!(!watcher.push("<|sys"));
        assert!(watcher.push("tem|>"));
    }

    #[test]
    fn angle_brackets_alone_do_not_match() {
        let mut watcher = StopWatcher::default();
        assert!(!watcher.push("a < b and b |> c"));
    }
}
