//! Reasoning-span filtering for relayed token streams.
//!
//! Model output may contain structured reasoning bounded by `<think>` /
//! `</think>` markers. Those spans are suppressed from consumer-visible
//! output. Markers can arrive split across stream fragments, so the filter
//! holds back the smallest ambiguous suffix until enough input arrives to
//! decide.

const OPEN_MARKER: &str = "<think>";
const CLOSE_MARKER: &str = "</think>";

/// Incremental filter over streamed content fragments.
///
/// Feed fragments through `push` in arrival order and flush with `finish`
/// when the stream ends. The concatenation of everything returned equals the
/// input with every well-formed reasoning span removed.
///
/// While inside a span the suppressed text is retained rather than dropped:
/// a stream that ends without the closing marker flushes the whole held-back
/// region — open marker included — as ordinary content, so an unterminated
/// marker never swallows output.
#[derive(Debug, Default)]
pub struct ThinkFilter {
    inside: bool,
    held: String,
}

impl ThinkFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one fragment and return the text releasable so far.
    pub fn push(&mut self, fragment: &str) -> String {
        let mut work = std::mem::take(&mut self.held);
        work.push_str(fragment);
        let mut out = String::new();

        loop {
            if self.inside {
                // `work` starts at the span's open marker.
                match work.find(CLOSE_MARKER) {
                    Some(idx) => {
                        work.drain(..idx + CLOSE_MARKER.len());
                        self.inside = false;
                    }
                    None => {
                        self.held = work;
                        return out;
                    }
                }
            } else {
                match work.find(OPEN_MARKER) {
                    Some(idx) => {
                        out.push_str(&work[..idx]);
                        work.drain(..idx);
                        self.inside = true;
                    }
                    None => {
                        // Hold back a suffix that could be the start of a
                        // split open marker.
                        let keep = partial_marker_len(&work, OPEN_MARKER);
                        let tail = work.split_off(work.len() - keep);
                        out.push_str(&work);
                        self.held = tail;
                        return out;
                    }
                }
            }
        }
    }

    /// Flush at end of stream. Held-back text — a pending partial marker or
    /// an unterminated span — is released verbatim.
    pub fn finish(&mut self) -> String {
        self.inside = false;
        std::mem::take(&mut self.held)
    }
}

/// Length of the longest proper prefix of `marker` that `s` ends with.
fn partial_marker_len(s: &str, marker: &str) -> usize {
    let max = (marker.len() - 1).min(s.len());
    for len in (1..=max).rev() {
        if s.ends_with(&marker[..len]) {
            return len;
        }
    }
    0
}

/// Filter a complete (non-streamed) text in one shot.
pub fn strip_reasoning(text: &str) -> String {
    let mut filter = ThinkFilter::new();
    let mut out = filter.push(text);
    out.push_str(&filter.finish());
    out
}
