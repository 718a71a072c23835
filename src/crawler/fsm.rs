//! Incremental tag/attribute segmenter
//!
//! A character-driven finite-state machine that recognizes URI-bearing
//! attribute values in an HTML byte stream as it arrives. The stream may
//! be fragmented arbitrarily: state survives across chunks, so a tag name,
//! an attribute, or a quoted value can straddle any number of chunk
//! boundaries and still come out whole.
//!
//! This is deliberately not an HTML5 parser. It segments just enough
//! structure (tag open, element name, attribute name, quoted value,
//! comment skipping) to pull `href`/`src` values out of the four
//! registered elements, and ignores everything else.
//!
//! The machine is flat: one state enum selecting between three nodes
//! (document, tag, attribute), each with its own scratch fields on the
//! [`Segmenter`] itself. Each node's step function consumes bytes from the
//! current offset until it transitions or exhausts the chunk.

/// Receiver for recognized URI-bearing attribute values.
///
/// `line` and `column` locate the value's opening quote; the column is
/// also the zero-based offset of the first value byte on its line. The
/// same tuple set is produced for a given input regardless of how it was
/// chunked.
pub trait AttributeSink {
    fn uri_attribute(&mut self, element: &str, attribute: &str, value: &str, line: u64, column: u64);
}

/// The single attribute per element whose value names content to fetch.
fn registered_attribute(element: &str) -> Option<&'static str> {
    match element {
        "a" => Some("href"),
        "img" | "script" | "iframe" => Some("src"),
        _ => None,
    }
}

/// Characters that may appear in an element or attribute name.
fn is_token_char(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'-' || ch == b':'
}

/// Position within the stream.
#[derive(Debug)]
struct Cursor {
    line: u64,
    column: u64,
    read: u64,
}

impl Cursor {
    fn new() -> Self {
        Self {
            line: 1,
            column: 0,
            read: 0,
        }
    }

    /// Accounts for one consumed byte. A newline starts the next line at
    /// column zero; any other byte advances the column.
    fn advance(&mut self, ch: u8) {
        if ch == b'\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        self.read += 1;
    }
}

/// Which node currently consumes bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Document,
    Tag,
    Attribute,
}

/// Per-tag scratch, reset on every ascent back to the document.
#[derive(Debug, Default)]
struct TagState {
    close: bool,
    skipped: bool,
    name_done: bool,
    comment: bool,
    comment_begin: bool,
    comment_end: bool,
    last_ch: u8,
    name: String,
    seek_attr: Option<&'static str>,
}

impl TagState {
    fn reset(&mut self) {
        self.close = false;
        self.skipped = false;
        self.name_done = false;
        self.comment = false;
        self.comment_begin = false;
        self.comment_end = false;
        self.last_ch = 0;
        self.name.clear();
        self.seek_attr = None;
    }
}

/// Per-attribute scratch, reset on every ascent back to the tag.
#[derive(Debug, Default)]
struct AttributeState {
    has_value: bool,
    name: String,
    quote: u8,
    line: u64,
    column: u64,
    value: String,
}

impl AttributeState {
    fn reset(&mut self) {
        self.has_value = false;
        self.name.clear();
        self.quote = 0;
        self.line = 0;
        self.column = 0;
        self.value.clear();
    }
}

/// The streaming tag/attribute segmenter.
///
/// Construct once per HTML stream, feed chunks through
/// [`advance`](Self::advance), and receive value tuples on the sink as
/// soon as each one is recognized.
#[derive(Debug)]
pub struct Segmenter {
    cursor: Cursor,
    current: Node,
    tag: TagState,
    attr: AttributeState,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Segmenter {
    pub fn new() -> Self {
        Self {
            cursor: Cursor::new(),
            current: Node::Document,
            tag: TagState::default(),
            attr: AttributeState::default(),
        }
    }

    /// Total bytes consumed so far.
    pub fn bytes_read(&self) -> u64 {
        self.cursor.read
    }

    /// Consumes one chunk, emitting any values completed within it.
    pub fn advance(&mut self, chunk: &[u8], sink: &mut dyn AttributeSink) {
        let mut offset = 0;
        while offset < chunk.len() {
            match self.current {
                Node::Document => self.crawl_document(chunk, &mut offset),
                Node::Tag => self.crawl_tag(chunk, &mut offset),
                Node::Attribute => self.crawl_attribute(chunk, &mut offset, sink),
            }
        }
    }

    /// Document node: everything outside a tag is skipped; `<` descends.
    fn crawl_document(&mut self, chunk: &[u8], offset: &mut usize) {
        while *offset < chunk.len() {
            let ch = chunk[*offset];
            *offset += 1;
            self.cursor.advance(ch);

            if ch == b'<' {
                self.current = Node::Tag;
                return;
            }
        }
    }

    fn crawl_tag(&mut self, chunk: &[u8], offset: &mut usize) {
        if self.tag.skipped {
            self.crawl_tag_skipped(chunk, offset);
        } else {
            self.crawl_tag_attrs(chunk, offset);
        }
    }

    /// Tag node, attrs mode: accumulate the element name, then hand each
    /// attribute to the attribute node. Elements without a registered
    /// attribute, declarations, processing instructions and malformed
    /// syntax all degrade into skipped mode.
    fn crawl_tag_attrs(&mut self, chunk: &[u8], offset: &mut usize) {
        while *offset < chunk.len() {
            let ch = chunk[*offset];
            *offset += 1;
            self.cursor.advance(ch);

            match ch {
                b'>' => {
                    tracing::trace!(
                        "{} tag {:?} done",
                        if self.tag.close { "closing" } else { "opening" },
                        self.tag.name
                    );
                    self.ascend_tag();
                    self.tag.last_ch = ch;
                    return;
                }

                // <!doctype, <!-- ... --> and <?pi are all skipped; only a
                // bang with no name yet can open a comment.
                b'!' | b'?' => {
                    if ch == b'!' {
                        self.tag.comment_begin = self.tag.name.is_empty();
                    }
                    self.tag.skipped = true;
                    self.tag.last_ch = ch;
                    return;
                }

                b'/' => {
                    self.tag.close = true;
                }

                b' ' | b'\r' | b'\n' | b'\t' => {
                    if !self.tag.name.is_empty() {
                        self.tag.name_done = true;
                        self.tag.seek_attr = registered_attribute(&self.tag.name);
                        if self.tag.seek_attr.is_none() {
                            // Not an element we care about.
                            self.tag.skipped = true;
                            self.tag.last_ch = ch;
                            return;
                        }
                    }
                }

                // A dash may continue a name but cannot start one or
                // follow a completed one.
                b'-' => {
                    if !self.tag.name_done && !self.tag.name.is_empty() {
                        self.tag.name.push('-');
                    } else {
                        self.tag.skipped = true;
                        self.tag.last_ch = ch;
                        return;
                    }
                }

                _ => {
                    if is_token_char(ch) {
                        if !self.tag.name_done {
                            self.tag.name.push(ch.to_ascii_lowercase() as char);
                        } else {
                            // First character of an attribute name.
                            self.descend_attribute(ch);
                            self.tag.last_ch = ch;
                            return;
                        }
                    } else {
                        // Syntax error; give up on this tag.
                        self.tag.skipped = true;
                        self.tag.last_ch = ch;
                        return;
                    }
                }
            }

            self.tag.last_ch = ch;
        }
    }

    /// Tag node, skipped mode: scan for the closing `>`, except inside a
    /// comment, where `>` only counts after a `--` pair has been seen.
    ///
    /// The flag logic is loose on purpose: `comment_begin` is cleared by
    /// any byte other than `-`, and `comment_end`, once set, stays set.
    /// `<!--->` therefore does not terminate its comment.
    fn crawl_tag_skipped(&mut self, chunk: &[u8], offset: &mut usize) {
        while *offset < chunk.len() {
            let ch = chunk[*offset];
            *offset += 1;
            self.cursor.advance(ch);

            match ch {
                b'>' => {
                    if !self.tag.comment || self.tag.comment_end {
                        self.ascend_tag();
                        self.tag.last_ch = ch;
                        return;
                    }
                }

                b'-' => {
                    if self.tag.comment_begin {
                        if self.tag.last_ch == b'-' {
                            self.tag.comment = true;
                        }
                    } else if self.tag.comment {
                        if self.tag.last_ch == b'-' {
                            self.tag.comment_end = true;
                        }
                    }
                }

                _ => {
                    self.tag.comment_begin = false;
                }
            }

            self.tag.last_ch = ch;
        }
    }

    /// Attribute node: accumulate a name, then a quoted value. The name
    /// and value survive chunk boundaries like everything else.
    ///
    /// Inside a quoted value every byte except the matching closing quote
    /// is content, `=`, `/`, `>` and whitespace included. The structural
    /// meanings of those bytes apply only while no value is open.
    fn crawl_attribute(&mut self, chunk: &[u8], offset: &mut usize, sink: &mut dyn AttributeSink) {
        while *offset < chunk.len() {
            let ch = chunk[*offset];
            *offset += 1;
            self.cursor.advance(ch);

            if self.attr.quote != 0 {
                if ch == self.attr.quote {
                    self.process(sink);
                    self.ascend_attribute();
                    return;
                }
                self.attr.value.push(ch as char);
                continue;
            }

            match ch {
                // The tag self-closes.
                b'/' => {
                    self.tag.close = true;
                    self.ascend_attribute();
                    self.ascend_tag();
                    return;
                }

                // Shortcut exit: the tag ends before any value opened.
                b'>' => {
                    if self.attr.has_value {
                        // An unquoted value was never captured.
                        tracing::trace!("unquoted value of attribute {:?} dropped", self.attr.name);
                    }
                    self.process(sink);
                    self.ascend_attribute();
                    self.ascend_tag();
                    return;
                }

                b'=' => {
                    self.attr.has_value = true;
                }

                b'\'' | b'"' => {
                    // Value opens here; this is the position the stored
                    // filename will be derived from.
                    self.attr.quote = ch;
                    self.attr.line = self.cursor.line;
                    self.attr.column = self.cursor.column;
                }

                b' ' | b'\r' | b'\n' | b'\t' => {}

                _ => {
                    self.attr.name.push(ch.to_ascii_lowercase() as char);
                }
            }
        }
    }

    /// Emits the accumulated value if this attribute is the one registered
    /// for the current element.
    fn process(&mut self, sink: &mut dyn AttributeSink) {
        debug_assert!(
            self.tag.seek_attr.is_some(),
            "attribute node entered without a registered element"
        );
        if let Some(registered) = self.tag.seek_attr {
            if self.attr.name == registered {
                sink.uri_attribute(
                    &self.tag.name,
                    &self.attr.name,
                    &self.attr.value,
                    self.attr.line,
                    self.attr.column,
                );
            }
        }
    }

    fn descend_attribute(&mut self, ch: u8) {
        self.attr.name.push(ch.to_ascii_lowercase() as char);
        self.current = Node::Attribute;
    }

    fn ascend_attribute(&mut self) {
        self.attr.reset();
        self.current = Node::Tag;
    }

    fn ascend_tag(&mut self) {
        self.tag.reset();
        self.current = Node::Document;
    }
}
