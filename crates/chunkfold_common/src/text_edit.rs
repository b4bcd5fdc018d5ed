use std::ops::Range;

/// An ordered list of byte-range replacements over immutable source text.
///
/// Edits are collected while walking the AST and applied in a single pass,
/// so offsets taken from spans stay valid for the whole step. Two edits must
/// never overlap; an edit whose range falls inside an already recorded one
/// is rejected by [`TextEdits::covers`] checks at the call sites.
#[derive(Debug, Default)]
pub struct TextEdits {
  edits: Vec<TextEdit>,
}

#[derive(Debug)]
struct TextEdit {
  start: usize,
  end: usize,
  replacement: String,
}

impl TextEdits {
  pub fn new() -> Self {
    Default::default()
  }

  pub fn is_empty(&self) -> bool {
    self.edits.is_empty()
  }

  pub fn len(&self) -> usize {
    self.edits.len()
  }

  pub fn replace(&mut self, range: Range<usize>, replacement: impl Into<String>) {
    debug_assert!(range.start <= range.end);
    self.edits.push(TextEdit {
      start: range.start,
      end: range.end,
      replacement: replacement.into(),
    });
  }

  pub fn remove(&mut self, range: Range<usize>) {
    self.replace(range, "");
  }

  pub fn insert(&mut self, at: usize, text: impl Into<String>) {
    self.replace(at..at, text);
  }

  /// Whether `range` lies inside a range that is already being rewritten.
  /// Used to skip use-site renames inside structurally re-emitted statements.
  pub fn covers(&self, range: &Range<usize>) -> bool {
    self
      .edits
      .iter()
      .any(|edit| edit.start <= range.start && range.end <= edit.end && edit.start < edit.end)
  }

  /// Apply all edits against `source` in one pass.
  ///
  /// Returns an error if any two edits overlap; that is an internal
  /// invariant violation, never a user-facing condition.
  pub fn apply(mut self, source: &str) -> anyhow::Result<String> {
    self.edits.sort_by_key(|edit| (edit.start, edit.end));

    let mut output = String::with_capacity(source.len());
    let mut cursor = 0usize;
    for edit in &self.edits {
      if edit.start < cursor {
        anyhow::bail!(
          "overlapping text edits at byte {} (cursor already at {})",
          edit.start,
          cursor
        );
      }
      if edit.end > source.len() {
        anyhow::bail!(
          "text edit {}..{} out of bounds for source of {} bytes",
          edit.start,
          edit.end,
          source.len()
        );
      }
      output.push_str(&source[cursor..edit.start]);
      output.push_str(&edit.replacement);
      cursor = edit.end;
    }
    output.push_str(&source[cursor..]);
    Ok(output)
  }
}
