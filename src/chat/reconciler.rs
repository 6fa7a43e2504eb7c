//! StreamReconciler — live think/answer segmentation of a streamed reply.
//!
//! Fragments are appended to one buffer in arrival order. After every
//! fragment the whole buffer is re-scanned for `open … close` spans and two
//! views are derived from it:
//! - the reasoning view: the first span's inner text, trimmed
//! - the visible view: everything outside the spans, trimmed
//!
//! Live rendering policy: text from an unterminated open tag onward is
//! withheld from the visible view until its close tag arrives, and is shown
//! instead as in-progress reasoning (`complete == false`). A trailing partial
//! marker (`"<thi"`, `"</th"`) is held back from whichever view it would
//! otherwise leak into, so neither view ever shows marker text and the
//! reasoning view only ever grows.
//!
//! Finalization ([`extract`]) removes every complete span, treats an
//! unterminated segment as ordinary answer text, and strips any marker
//! literal that is left over.

use std::ops::Range;

use futures::{Stream, StreamExt};

use crate::inference::InferenceError;

// ─── Tags ────────────────────────────────────────────────────────────────────

/// The literal, case-sensitive marker pair around a reasoning segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThinkTags {
    pub open: &'static str,
    pub close: &'static str,
}

impl ThinkTags {
    pub const DEFAULT: ThinkTags = ThinkTags {
        open: "<think>",
        close: "</think>",
    };
}

impl Default for ThinkTags {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ─── Views ───────────────────────────────────────────────────────────────────

/// Reasoning text known so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reasoning {
    pub text: String,
    /// `false` while the close tag has not arrived yet.
    pub complete: bool,
}

/// Best-known split of the accumulated text at one point in the stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveView {
    pub reasoning: Option<Reasoning>,
    pub visible: String,
}

/// Receives live views while a reply streams in.
///
/// Views are advisory: the same view may be delivered more than once.
pub trait ViewObserver {
    fn on_view(&mut self, view: &LiveView);
}

impl<F: FnMut(&LiveView)> ViewObserver for F {
    fn on_view(&mut self, view: &LiveView) {
        self(view)
    }
}

/// Final split of a completed reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Visible answer, markers removed and trimmed. May be empty.
    pub response: String,
    /// Reasoning segment, `None` when absent or blank.
    pub think: Option<String>,
}

// ─── StreamReconciler ────────────────────────────────────────────────────────

/// Accumulates one reply and tracks its live view.
#[derive(Debug)]
pub struct StreamReconciler {
    tags: ThinkTags,
    buffer: String,
    last_view: LiveView,
}

impl StreamReconciler {
    pub fn new(tags: ThinkTags) -> Self {
        Self {
            tags,
            buffer: String::new(),
            last_view: LiveView::default(),
        }
    }

    /// Append a fragment. Returns the new view only if it changed.
    pub fn push(&mut self, fragment: &str) -> Option<&LiveView> {
        self.buffer.push_str(fragment);
        let view = live_view(&self.buffer, &self.tags);
        if view == self.last_view {
            return None;
        }
        self.last_view = view;
        Some(&self.last_view)
    }

    /// The most recent view.
    pub fn view(&self) -> &LiveView {
        &self.last_view
    }

    /// Everything received so far, verbatim.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Final extraction over the current buffer. Pure: calling it twice
    /// yields the same result.
    pub fn finish(&self) -> Extraction {
        extract(&self.buffer, &self.tags)
    }
}

/// Drain a fragment stream through a reconciler, reporting changed views.
///
/// A stream error aborts reconciliation; whatever was received, including a
/// half-finished reasoning segment, is dropped with the reconciler.
pub async fn reconcile<S, O>(
    fragments: S,
    tags: ThinkTags,
    observer: &mut O,
) -> Result<Extraction, InferenceError>
where
    S: Stream<Item = Result<String, InferenceError>>,
    O: ViewObserver + ?Sized,
{
    let mut fragments = std::pin::pin!(fragments);
    let mut reconciler = StreamReconciler::new(tags);
    let mut count = 0usize;

    while let Some(fragment) = fragments.next().await {
        let fragment = fragment?;
        count += 1;
        if let Some(view) = reconciler.push(&fragment) {
            observer.on_view(view);
        }
    }

    tracing::debug!(
        fragments = count,
        raw_bytes = reconciler.buffer().len(),
        "stream drained"
    );
    Ok(reconciler.finish())
}

// ─── Extraction ──────────────────────────────────────────────────────────────

/// Split a complete reply into answer and reasoning.
pub fn extract(raw: &str, tags: &ThinkTags) -> Extraction {
    let scan = scan(raw, tags);
    let response = strip_markers(&text_outside(raw, &scan.spans, raw.len()), tags);

    Extraction {
        response,
        think: scan.first_capture.and_then(non_blank),
    }
}

/// Live view of a possibly incomplete reply.
fn live_view(raw: &str, tags: &ThinkTags) -> LiveView {
    let scan = scan(raw, tags);
    let last_end = scan.spans.last().map_or(0, |s| s.end);

    let limit = match scan.open_at {
        Some(at) => at,
        None => {
            let held = partial_tag_suffix(raw, tags.open).max(partial_tag_suffix(raw, tags.close));
            (raw.len() - held).max(last_end)
        }
    };
    let visible = strip_markers(&text_outside(raw, &scan.spans, limit), tags);

    let reasoning = match (scan.first_capture, scan.open_at) {
        (Some(capture), _) => non_blank(capture).map(|text| Reasoning {
            text,
            complete: true,
        }),
        (None, Some(at)) => {
            let inner = &raw[at + tags.open.len()..];
            let keep = inner.len() - partial_tag_suffix(inner, tags.close);
            non_blank(&inner[..keep]).map(|text| Reasoning {
                text,
                complete: false,
            })
        }
        (None, None) => None,
    };

    LiveView { reasoning, visible }
}

/// Marker positions found in one pass over the text.
struct Scan<'a> {
    /// Complete `open … close` spans, non-overlapping, in order.
    spans: Vec<Range<usize>>,
    /// Inner text of the first complete span.
    first_capture: Option<&'a str>,
    /// Start of an open tag with no close tag after it.
    open_at: Option<usize>,
}

/// Find spans the way a non-greedy `open(.*?)close` search does, repeated
/// from the end of each match.
fn scan<'a>(text: &'a str, tags: &ThinkTags) -> Scan<'a> {
    let mut spans = Vec::new();
    let mut first_capture = None;
    let mut open_at = None;
    let mut pos = 0;

    while let Some(rel) = text[pos..].find(tags.open) {
        let start = pos + rel;
        let inner_start = start + tags.open.len();
        match text[inner_start..].find(tags.close) {
            Some(rel_close) => {
                let inner_end = inner_start + rel_close;
                let end = inner_end + tags.close.len();
                if first_capture.is_none() {
                    first_capture = Some(&text[inner_start..inner_end]);
                }
                spans.push(start..end);
                pos = end;
            }
            None => {
                open_at = Some(start);
                break;
            }
        }
    }

    Scan {
        spans,
        first_capture,
        open_at,
    }
}

/// Concatenate the text in `..limit` that lies outside every span.
fn text_outside(text: &str, spans: &[Range<usize>], limit: usize) -> String {
    let mut out = String::with_capacity(limit);
    let mut pos = 0;
    for span in spans {
        if span.start >= limit {
            break;
        }
        out.push_str(&text[pos..span.start]);
        pos = span.end;
    }
    if pos < limit {
        out.push_str(&text[pos..limit]);
    }
    out
}

/// Unterminated or stray markers carry no segment; replace the literals so
/// the answer never contains them.
fn strip_markers(text: &str, tags: &ThinkTags) -> String {
    text.replace(tags.open, "\n")
        .replace(tags.close, "\n")
        .trim()
        .to_string()
}

/// Length of the longest proper prefix of `tag` that `text` ends with.
fn partial_tag_suffix(text: &str, tag: &str) -> usize {
    (1..tag.len())
        .rev()
        .filter(|&k| tag.is_char_boundary(k))
        .find(|&k| text.ends_with(&tag[..k]))
        .unwrap_or(0)
}

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// ─── Tests ───────────────────────────────────────────────────────────────────
