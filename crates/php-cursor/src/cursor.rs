use std::collections::BTreeSet;

use memchr::memmem;
use regex::Regex;

/// Nesting depth cap for rule matching. Pathological input becomes a
/// reportable failure instead of a stack overflow.
pub const MAX_DEPTH: u32 = 512;

/// Lexing mode of the cursor. PHP mode skips ignorable whitespace and
/// comments before terminal matches; HTML mode never does. String and
/// heredoc bodies are scanned verbatim through the raw char helpers, so
/// they need no mode of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Php,
    Html,
}

/// A saved cursor position. Rewinding restores position and mode only;
/// the deepest-failure record deliberately survives backtracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pos: usize,
    mode: Mode,
}

/// The deepest point any trial match failed at, with the rule names that
/// were being attempted there. Backtracking keeps the furthest record so
/// the final syntax error points at the most advanced parse position.
#[derive(Debug, Clone, Default)]
pub struct Furthest {
    pub offset: usize,
    pub expected: BTreeSet<String>,
}

/// Positional view over one source text for a single parse call.
#[derive(Debug)]
pub struct Cursor<'src> {
    src: &'src str,
    pos: usize,
    mode: Mode,
    depth: u32,
    depth_exceeded: bool,
    furthest: Furthest,
}

impl<'src> Cursor<'src> {
    pub fn new(src: &'src str) -> Self {
        Self {
            src,
            pos: 0,
            mode: Mode::Html,
            depth: 0,
            depth_exceeded: false,
            furthest: Furthest::default(),
        }
    }

    pub fn source(&self) -> &'src str {
        self.src
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn rest(&self) -> &'src str {
        &self.src[self.pos..]
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn mark(&self) -> Checkpoint {
        Checkpoint {
            pos: self.pos,
            mode: self.mode,
        }
    }

    pub fn rewind(&mut self, checkpoint: Checkpoint) {
        self.pos = checkpoint.pos;
        self.mode = checkpoint.mode;
    }

    /// Advance by `n` bytes. Callers are responsible for keeping the
    /// position on a char boundary.
    pub fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.src.len());
    }

    // =========================================================================
    // Raw character access (string/heredoc sub-lexing)
    // =========================================================================

    pub fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn bump_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.rest().starts_with(prefix)
    }

    /// Consume `prefix` if the remaining text starts with it.
    pub fn eat(&mut self, prefix: &str) -> bool {
        if self.starts_with(prefix) {
            self.pos += prefix.len();
            true
        } else {
            false
        }
    }

    /// Byte offset of `needle` in the remaining text.
    pub fn find(&self, needle: &str) -> Option<usize> {
        memmem::find(self.rest().as_bytes(), needle.as_bytes())
    }

    /// Consume everything up to (not including) the offset relative to the
    /// current position, returning the consumed slice.
    pub fn take(&mut self, len: usize) -> &'src str {
        let end = (self.pos + len).min(self.src.len());
        let taken = &self.src[self.pos..end];
        self.pos = end;
        taken
    }

    // =========================================================================
    // Terminal matching
    // =========================================================================

    /// Skip whitespace and comments. PHP line comments (`//` and `#`) end
    /// at a newline or at a `?>` close tag, which stays unconsumed.
    pub fn skip_ignorable(&mut self) {
        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start();
            self.pos += rest.len() - trimmed.len();

            if self.starts_with("/*") {
                match self.find("*/") {
                    Some(end) => self.advance(end + 2),
                    None => {
                        self.pos = self.src.len();
                        return;
                    }
                }
            } else if self.starts_with("//") || self.starts_with("#") {
                let rest = self.rest();
                let close = memmem::find(rest.as_bytes(), b"?>");
                let newline = memchr::memchr(b'\n', rest.as_bytes());
                let end = match (newline, close) {
                    (Some(n), Some(c)) => n.min(c),
                    (Some(n), None) => n,
                    (None, Some(c)) => c,
                    (None, None) => rest.len(),
                };
                self.advance(end);
            } else {
                return;
            }
        }
    }

    /// Match an anchored regex at the current position without skipping.
    /// Returns the requested capture group on success; the position moves
    /// past the whole match.
    pub fn match_regex(&mut self, re: &Regex, group: usize) -> Option<String> {
        let caps = re.captures(self.rest())?;
        let whole = caps.get(0)?;
        debug_assert_eq!(whole.start(), 0, "terminal patterns must be anchored");
        let captured = caps.get(group)?.as_str().to_string();
        self.pos += whole.end();
        Some(captured)
    }

    pub fn match_literal(&mut self, literal: &str) -> bool {
        self.eat(literal)
    }

    // =========================================================================
    // Failure bookkeeping
    // =========================================================================

    /// Record a terminal mismatch for rule `rule` at the current position.
    pub fn note_failure(&mut self, rule: &str) {
        if self.pos > self.furthest.offset {
            self.furthest.offset = self.pos;
            self.furthest.expected.clear();
        }
        if self.pos == self.furthest.offset {
            self.furthest.expected.insert(rule.to_string());
        }
    }

    pub fn furthest(&self) -> &Furthest {
        &self.furthest
    }

    // =========================================================================
    // Depth guard
    // =========================================================================

    /// Enter one rule nesting level. Returns false (and latches the
    /// exceeded flag) once `MAX_DEPTH` is reached.
    pub fn enter(&mut self) -> bool {
        if self.depth >= MAX_DEPTH {
            self.depth_exceeded = true;
            false
        } else {
            self.depth += 1;
            true
        }
    }

    pub fn exit(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn depth_exceeded(&self) -> bool {
        self.depth_exceeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn php_cursor(src: &str) -> Cursor<'_> {
        let mut cur = Cursor::new(src);
        cur.set_mode(Mode::Php);
        cur
    }

    #[test]
    fn test_mark_rewind_restores_position_and_mode() {
        let mut cur = php_cursor("abc");
        let cp = cur.mark();
        cur.advance(2);
        cur.set_mode(Mode::Html);
        cur.rewind(cp);
        assert_eq!(cur.pos(), 0);
        assert_eq!(cur.mode(), Mode::Php);
    }

    #[test]
    fn test_skip_ignorable_passes_whitespace_and_comments() {
        let mut cur = php_cursor("  // line\n  /* block\n still */ # hash\n$x");
        cur.skip_ignorable();
        assert!(cur.starts_with("$x"));
    }

    #[test]
    fn test_line_comment_stops_at_close_tag() {
        let mut cur = php_cursor("// trailing ?> html");
        cur.skip_ignorable();
        assert!(cur.starts_with("?>"));
    }

    #[test]
    fn test_unterminated_block_comment_consumes_rest() {
        let mut cur = php_cursor("/* never closed");
        cur.skip_ignorable();
        assert!(cur.at_end());
    }

    #[test]
    fn test_match_regex_is_anchored_and_advances() {
        let re = Regex::new(r"^\$([a-z_]+)").unwrap();
        let mut cur = php_cursor("$abc = 1");
        assert_eq!(cur.match_regex(&re, 1).as_deref(), Some("abc"));
        assert!(cur.starts_with(" = 1"));
    }

    #[test]
    fn test_match_regex_failure_leaves_position() {
        let re = Regex::new(r"^\d+").unwrap();
        let mut cur = php_cursor("abc");
        assert!(cur.match_regex(&re, 0).is_none());
        assert_eq!(cur.pos(), 0);
    }

    #[test]
    fn test_note_failure_keeps_deepest() {
        let mut cur = php_cursor("abcdef");
        cur.advance(4);
        cur.note_failure("N_VARIABLE");
        cur.rewind(Checkpoint { pos: 1, mode: Mode::Php });
        cur.note_failure("N_STRING");
        assert_eq!(cur.furthest().offset, 4);
        assert!(cur.furthest().expected.contains("N_VARIABLE"));
        assert!(!cur.furthest().expected.contains("N_STRING"));
    }

    #[test]
    fn test_note_failure_merges_rules_at_same_offset() {
        let mut cur = php_cursor("ab");
        cur.note_failure("N_INTEGER");
        cur.note_failure("N_FLOAT");
        assert_eq!(cur.furthest().expected.len(), 2);
    }

    #[test]
    fn test_depth_guard_latches() {
        let mut cur = php_cursor("");
        for _ in 0..MAX_DEPTH {
            assert!(cur.enter());
        }
        assert!(!cur.enter());
        assert!(cur.depth_exceeded());
    }

    #[test]
    fn test_find_uses_remaining_text() {
        let mut cur = php_cursor("<p><?php echo 1;");
        assert_eq!(cur.find("<?php"), Some(3));
        cur.advance(3);
        assert_eq!(cur.find("<?php"), Some(0));
    }
}
