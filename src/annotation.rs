//! The annotated-text sink: the stream a builder writes into.
//!
//! Builders emit two kinds of segments. A text segment passes source bytes
//! through to the plaintext verbatim; a markup segment attributes source
//! bytes to nothing, or to a short synthetic replacement (`interpret_as`).
//! Concatenating the segments in emission order reproduces the consumed
//! source, and every plaintext offset can be mapped back to a source offset
//! (and vice versa).

use crate::span::Span;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SegmentKind {
    Text,
    Markup { interpret_as: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    /// Byte range in the original source.
    pub source: Span,
    /// Byte range in the produced plaintext.
    pub plain: Span,
    pub kind: SegmentKind,
}

impl Segment {
    pub fn is_text(&self) -> bool {
        self.kind == SegmentKind::Text
    }
}

/// Accumulates segments and the plaintext projection seen by the checker.
#[derive(Clone, Debug, Default)]
pub struct AnnotatedText {
    segments: Vec<Segment>,
    plain: String,
    source_len: usize,
}

impl AnnotatedText {
    pub fn new() -> Self {
        Self::default()
    }

    /// The plaintext handed to the grammar checker.
    pub fn plain(&self) -> &str {
        &self.plain
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Total number of source bytes attributed so far.
    pub fn source_len(&self) -> usize {
        self.source_len
    }

    /// Append plaintext whose origin is the next `text.len()` source bytes.
    pub fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let source = Span::new(self.source_len, self.source_len + text.len());
        let plain = Span::new(self.plain.len(), self.plain.len() + text.len());
        self.plain.push_str(text);
        self.source_len = source.end;

        // Contiguous text extends the previous text segment.
        if let Some(last) = self.segments.last_mut() {
            if last.is_text() {
                last.source = last.source.merge(source);
                last.plain = last.plain.merge(plain);
                return;
            }
        }
        self.segments.push(Segment {
            source,
            plain,
            kind: SegmentKind::Text,
        });
    }

    /// Attribute the next `raw.len()` source bytes to no plaintext.
    pub fn push_markup(&mut self, raw: &str) {
        self.push_markup_as(raw, "");
    }

    /// Attribute the next `raw.len()` source bytes to plaintext `interpret_as`.
    pub fn push_markup_as(&mut self, raw: &str, interpret_as: &str) {
        if raw.is_empty() && interpret_as.is_empty() {
            return;
        }
        // Markup that interprets as exactly its own source text is text.
        if raw == interpret_as {
            self.push_text(raw);
            return;
        }
        let source = Span::new(self.source_len, self.source_len + raw.len());
        let plain = Span::new(self.plain.len(), self.plain.len() + interpret_as.len());
        self.plain.push_str(interpret_as);
        self.source_len = source.end;

        // Silent markup extends a directly preceding markup segment.
        if interpret_as.is_empty() {
            if let Some(last) = self.segments.last_mut() {
                if let SegmentKind::Markup { .. } = last.kind {
                    last.source = last.source.merge(source);
                    return;
                }
            }
        }
        self.segments.push(Segment {
            source,
            plain,
            kind: SegmentKind::Markup {
                interpret_as: interpret_as.to_string(),
            },
        });
    }

    /// Map a plaintext byte offset back to a source byte offset.
    ///
    /// Offsets inside a markup replacement map to the start of the markup's
    /// source range; offsets at or past the end of the plaintext map to the
    /// end of the consumed source.
    pub fn source_offset(&self, plain_offset: usize) -> usize {
        let idx = match self
            .segments
            .partition_point(|seg| seg.plain.start <= plain_offset)
        {
            0 => return 0,
            n => n - 1,
        };
        let seg = &self.segments[idx];
        if plain_offset >= self.plain.len() {
            return self.source_len;
        }
        match seg.kind {
            SegmentKind::Text => seg.source.start + (plain_offset - seg.plain.start),
            SegmentKind::Markup { .. } => seg.source.start,
        }
    }

    /// Map a source byte offset to a plaintext byte offset.
    ///
    /// Offsets inside markup map to the start of the markup's plaintext
    /// replacement (which is also where elided source collapses to).
    pub fn plain_offset(&self, source_offset: usize) -> usize {
        let idx = match self
            .segments
            .partition_point(|seg| seg.source.start <= source_offset)
        {
            0 => return 0,
            n => n - 1,
        };
        let seg = &self.segments[idx];
        if source_offset >= self.source_len {
            return self.plain.len();
        }
        match seg.kind {
            SegmentKind::Text => seg.plain.start + (source_offset - seg.source.start),
            SegmentKind::Markup { .. } => seg.plain.start,
        }
    }
}
