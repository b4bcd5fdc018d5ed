use once_cell::sync::Lazy;
use phf::{phf_set, Set};

pub static RESERVED_NAMES: Set<&'static str> = phf_set! {
    "await",
    "break",
    "case",
    "catch",
    "class",
    "const",
    "continue",
    "debugger",
    "default",
    "delete",
    "do",
    "else",
    "enum",
    "eval",
    "export",
    "extends",
    "false",
    "finally",
    "for",
    "function",
    "if",
    "implements",
    "import",
    "in",
    "instanceof",
    "interface",
    "let",
    "NaN",
    "new",
    "null",
    "package",
    "private",
    "protected",
    "public",
    "return",
    "static",
    "super",
    "switch",
    "this",
    "throw",
    "true",
    "try",
    "typeof",
    "undefined",
    "var",
    "void",
    "while",
    "with",
    "yield",
};

fn starts_with_digit(s: &str) -> bool {
  s.chars().next().map_or(false, |c| c.is_ascii_digit())
}

fn need_escape(s: &str) -> bool {
  starts_with_digit(s) || RESERVED_NAMES.contains(s) || s == "arguments"
}

static ILLEGAL_CHARACTERS: Lazy<regex::Regex> = Lazy::new(|| regex::Regex::new(r"[^\w$]").unwrap());

/// Turns an arbitrary string (chunk name, import source) into a legal
/// identifier.
pub fn make_legal(value: &str) -> String {
  let value = ILLEGAL_CHARACTERS.replace_all(value, "_");

  let ret = if need_escape(&value) {
    format!("_{}", value)
  } else {
    value.to_string()
  };

  if ret != value {
    tracing::warn!("illegal identifier: {}, replaced with {}", value, ret);
  }

  ret
}

/// Fresh name for a shared-chunk binding that collides with a primary one.
/// The prefix is reserved, so the result is never itself taken.
pub fn shared_alias(name: &str) -> String {
  format!("__shared${name}")
}

/// Fresh name for a binding duplicated out of an unshared chunk into one of
/// its importing entries. Unique per donor chunk.
pub fn unshared_alias(chunk_name: &str, name: &str) -> String {
  format!("__{}${name}", make_legal(chunk_name))
}

/// Appends `$1`, `$2`, ... until `taken` no longer claims the candidate.
pub fn deconflict(base: &str, taken: impl Fn(&str) -> bool) -> String {
  if !taken(base) {
    return base.to_string();
  }
  let mut n = 1usize;
  loop {
    let candidate = format!("{base}${n}");
    if !taken(&candidate) {
      return candidate;
    }
    n += 1;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn make_legal_sanitizes_sources_and_reserved_words() {
    assert_eq!(make_legal("react-dom"), "react_dom");
    assert_eq!(make_legal("@scope/pkg"), "_scope_pkg");
    assert_eq!(make_legal("default"), "_default");
    assert_eq!(make_legal("1abc"), "_1abc");
    assert_eq!(make_legal("fine$name"), "fine$name");
  }

  #[test]
  fn aliases_use_reserved_prefixes() {
    assert_eq!(shared_alias("helper"), "__shared$helper");
    assert_eq!(unshared_alias("vendors.chunk", "util"), "__vendors_chunk$util");
  }

  #[test]
  fn deconflict_walks_numeric_suffixes() {
    assert_eq!(deconflict("Shared", |_| false), "Shared");
    let taken = ["Shared", "Shared$1"];
    assert_eq!(
      deconflict("Shared", |name| taken.contains(&name)),
      "Shared$2"
    );
  }
}
