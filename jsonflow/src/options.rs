// SPDX-License-Identifier: Apache-2.0

//! Per-session encoding options: the replacer, the indentation policy and
//! the output buffering hint.
//!
//! Options are fixed once the encoder is constructed; the engine owns them
//! and hands a shared reference into every classification and advance call.

use crate::value::Value;
use bytes::BytesMut;
use core::fmt;

/// Default number of output bytes accumulated before a chunk is yielded.
pub(crate) const DEFAULT_CHUNK_HINT: usize = 16 * 1024;

/// Indentation is capped at 10 spaces / 10 characters, matching the
/// `JSON.stringify` convention the output format follows.
const INDENT_CAP: usize = 10;

/// Key/value rewrite policy applied to object members.
pub enum Replacer {
    /// Called as `f(key, value)` for every object member; returning
    /// [`Value::Undefined`] drops the member. Also called once as
    /// `f("", root)` before the root value is classified.
    Function(Box<dyn Fn(&str, Value) -> Value + Send + Sync>),
    /// Allow-list: object members whose key is not listed are dropped.
    Keys(Vec<String>),
}

/// Options shared by every frame of one encoding session.
pub struct EncodeOptions {
    replacer: Option<Replacer>,
    indent: Option<String>,
    chunk_hint: usize,
}

impl EncodeOptions {
    /// Compact output, no replacer, default chunk hint.
    pub fn new() -> Self {
        Self {
            replacer: None,
            indent: None,
            chunk_hint: DEFAULT_CHUNK_HINT,
        }
    }

    /// Install a replacer.
    pub fn with_replacer(mut self, replacer: Replacer) -> Self {
        self.replacer = Some(replacer);
        self
    }

    /// Install a function replacer. Shorthand for
    /// [`with_replacer`](Self::with_replacer) with [`Replacer::Function`].
    pub fn with_replacer_fn<F>(self, f: F) -> Self
    where
        F: Fn(&str, Value) -> Value + Send + Sync + 'static,
    {
        self.with_replacer(Replacer::Function(Box::new(f)))
    }

    /// Install a key allow-list replacer.
    pub fn with_allowed_keys<I, S>(self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_replacer(Replacer::Keys(keys.into_iter().map(Into::into).collect()))
    }

    /// Indent with `count` spaces per depth level, capped at 10.
    /// A count of zero keeps compact output.
    pub fn with_indent_spaces(mut self, count: usize) -> Self {
        let count = count.min(INDENT_CAP);
        self.indent = if count == 0 {
            None
        } else {
            Some(" ".repeat(count))
        };
        self
    }

    /// Indent with the first 10 characters of `unit` per depth level.
    /// An empty unit keeps compact output.
    pub fn with_indent(mut self, unit: &str) -> Self {
        let unit: String = unit.chars().take(INDENT_CAP).collect();
        self.indent = if unit.is_empty() { None } else { Some(unit) };
        self
    }

    /// Set the max-bytes buffering hint: the engine yields a chunk once at
    /// least this many bytes have accumulated.
    pub fn with_chunk_hint(mut self, bytes: usize) -> Self {
        self.chunk_hint = bytes.max(1);
        self
    }

    pub(crate) fn chunk_hint(&self) -> usize {
        self.chunk_hint
    }

    pub(crate) fn is_indented(&self) -> bool {
        self.indent.is_some()
    }

    /// Write the whitespace gap for `depth`: a newline followed by the
    /// indent unit repeated `depth` times. Nothing in compact mode.
    pub(crate) fn write_gap(&self, depth: usize, out: &mut BytesMut) {
        if let Some(unit) = &self.indent {
            out.extend_from_slice(b"\n");
            for _ in 0..depth {
                out.extend_from_slice(unit.as_bytes());
            }
        }
    }

    /// Root pass of a function replacer, keyed with the empty string.
    pub(crate) fn replace_root(&self, value: Value) -> Value {
        match &self.replacer {
            Some(Replacer::Function(f)) => f("", value),
            _ => value,
        }
    }

    /// Per-member pass of a function replacer.
    pub(crate) fn replace_entry(&self, key: &str, value: Value) -> Value {
        match &self.replacer {
            Some(Replacer::Function(f)) => f(key, value),
            _ => value,
        }
    }

    /// Allow-list check; keys are always allowed without a list replacer.
    pub(crate) fn key_allowed(&self, key: &str) -> bool {
        match &self.replacer {
            Some(Replacer::Keys(keys)) => keys.iter().any(|k| k == key),
            _ => true,
        }
    }
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EncodeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodeOptions")
            .field("indent", &self.indent)
            .field("chunk_hint", &self.chunk_hint)
            .field("has_replacer", &self.replacer.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gap(opts: &EncodeOptions, depth: usize) -> String {
        let mut out = BytesMut::new();
        opts.write_gap(depth, &mut out);
        String::from_utf8(out.to_vec()).unwrap()
    }

    #[test]
    fn test_compact_by_default() {
        let opts = EncodeOptions::new();
        assert!(!opts.is_indented());
        assert_eq!(gap(&opts, 3), "");
    }

    #[test]
    fn test_space_indent() {
        let opts = EncodeOptions::new().with_indent_spaces(2);
        assert_eq!(gap(&opts, 0), "\n");
        assert_eq!(gap(&opts, 2), "\n    ");
    }

    #[test]
    fn test_space_indent_capped_at_ten() {
        let opts = EncodeOptions::new().with_indent_spaces(99);
        assert_eq!(gap(&opts, 1), format!("\n{}", " ".repeat(10)));
    }

    #[test]
    fn test_zero_spaces_is_compact() {
        let opts = EncodeOptions::new().with_indent_spaces(0);
        assert!(!opts.is_indented());
    }

    #[test]
    fn test_string_indent_truncated() {
        let opts = EncodeOptions::new().with_indent("abcdefghijKLMNOP");
        assert_eq!(gap(&opts, 1), "\nabcdefghij");
    }

    #[test]
    fn test_empty_string_indent_is_compact() {
        let opts = EncodeOptions::new().with_indent("");
        assert!(!opts.is_indented());
    }

    #[test]
    fn test_allow_list() {
        let opts = EncodeOptions::new().with_allowed_keys(["kept"]);
        assert!(opts.key_allowed("kept"));
        assert!(!opts.key_allowed("dropped"));
    }

    #[test]
    fn test_function_replacer_root_pass() {
        let opts = EncodeOptions::new().with_replacer_fn(|key, value| {
            if key.is_empty() {
                Value::from(42i64)
            } else {
                value
            }
        });
        let replaced = opts.replace_root(Value::Null);
        assert!(matches!(replaced, Value::Int(42)));
    }

    #[test]
    fn test_chunk_hint_floor() {
        let opts = EncodeOptions::new().with_chunk_hint(0);
        assert_eq!(opts.chunk_hint(), 1);
    }
}
