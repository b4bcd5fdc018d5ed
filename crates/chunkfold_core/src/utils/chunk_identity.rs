/// The forms under which an import statement may refer to a chunk:
/// the emitted file name (with or without a `./` prefix), the bare chunk
/// name, and the extensionless file name. All must resolve to the same
/// chunk during merge and wrap.
#[derive(Debug, Clone)]
pub struct ChunkIdentity {
  forms: Vec<String>,
}

impl ChunkIdentity {
  pub fn new(name: &str, file_name: &str) -> Self {
    let mut forms = vec![file_name.to_string(), name.to_string()];
    for ext in [".js", ".mjs", ".cjs"] {
      if let Some(stem) = file_name.strip_suffix(ext) {
        forms.push(stem.to_string());
      }
    }
    Self { forms }
  }

  pub fn matches(&self, source: &str) -> bool {
    let source = source.strip_prefix("./").unwrap_or(source);
    self.forms.iter().any(|form| form == source)
  }
}

/// Import sources that do not start with `.` or `/` come from outside the
/// build and stay external through the whole pass.
pub fn is_external_source(source: &str) -> bool {
  !source.starts_with('.') && !source.starts_with('/')
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn matches_every_spelling_of_a_chunk() {
    let identity = ChunkIdentity::new("shared", "shared.chunk.js");
    assert!(identity.matches("shared.chunk.js"));
    assert!(identity.matches("./shared.chunk.js"));
    assert!(identity.matches("shared"));
    assert!(identity.matches("./shared.chunk"));
    assert!(!identity.matches("other.chunk.js"));
  }

  #[test]
  fn classifies_external_sources() {
    assert!(is_external_source("react"));
    assert!(is_external_source("@scope/pkg"));
    assert!(!is_external_source("./shared.js"));
    assert!(!is_external_source("../up.js"));
  }
}
