use std::fmt::Display;

use chunkfold_common::StaticStr;

use crate::utils::format_quoted_strings;

pub mod error_code;

#[derive(Debug)]
pub enum ErrorKind {
  /// Malformed module source anywhere in the pass. Downstream byte offsets
  /// would be meaningless, so the whole pass aborts.
  ParseFailed {
    file_name: StaticStr,
    detail: StaticStr,
  },

  /// The configured primary entry is not among the build's entry chunks.
  MissingPrimaryEntry {
    primary: StaticStr,
    entries: Vec<StaticStr>,
  },

  /// A satellite entry has exports but no property configured under the
  /// primary global.
  MissingSecondaryProp {
    entry: StaticStr,
    exported_keys: Vec<StaticStr>,
  },

  /// An externally-sourced import has no configured global name at wrap
  /// time. Downgradeable to a generated name via `skip_require_globals`.
  MissingGlobalName {
    source: StaticStr,
    chunk: StaticStr,
  },

  /// Unrecoverable internal error, e.g. a violated edit or parameter
  /// invariant. Used for graceful shutdown instead of `panic!()`.
  Panic {
    source: anyhow::Error,
  },

  IoError(std::io::Error),
}

impl Display for ErrorKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ErrorKind::ParseFailed { file_name, detail } => {
        write!(f, "Could not parse \"{file_name}\": {detail}")
      }
      ErrorKind::MissingPrimaryEntry { primary, entries } => {
        if entries.is_empty() {
          write!(
            f,
            "Primary entry \"{primary}\" is not among the build's entries; the build has no entry chunks.",
          )
        } else {
          write!(
            f,
            "Primary entry \"{primary}\" is not among the build's entries; valid entries are {}.",
            format_quoted_strings(entries),
          )
        }
      }
      ErrorKind::MissingSecondaryProp {
        entry,
        exported_keys,
      } => {
        let mut exported_keys = exported_keys.iter().collect::<Vec<_>>();
        exported_keys.sort();
        write!(
          f,
          "Entry \"{entry}\" exports {} but has no property configured under the primary global.",
          format_quoted_strings(&exported_keys),
        )
      }
      ErrorKind::MissingGlobalName { source, chunk } => write!(
        f,
        "No global name is configured for external module \"{source}\" imported by \"{chunk}\".",
      ),
      ErrorKind::Panic { source } => source.fmt(f),
      ErrorKind::IoError(e) => e.fmt(f),
    }
  }
}

impl ErrorKind {
  pub fn code(&self) -> &'static str {
    match self {
      ErrorKind::ParseFailed { .. } => error_code::PARSE_FAILED,
      ErrorKind::MissingPrimaryEntry { .. } => error_code::MISSING_PRIMARY_ENTRY,
      ErrorKind::MissingSecondaryProp { .. } => error_code::MISSING_SECONDARY_PROP,
      ErrorKind::MissingGlobalName { .. } => error_code::MISSING_GLOBAL_NAME,
      ErrorKind::Panic { .. } => error_code::PANIC,
      ErrorKind::IoError(_) => error_code::IO_ERROR,
    }
  }
}

#[cfg(test)]
mod tests {
  #[test]
  fn missing_primary_message_copes_with_an_entryless_build() {
    let err = crate::Error::missing_primary_entry("main", Vec::<String>::new());
    assert!(err.to_string().contains("no entry chunks"));

    let err =
      crate::Error::missing_primary_entry("main", vec!["a".to_string(), "b".to_string()]);
    assert!(err.to_string().contains("\"a\" and \"b\""));
  }
}
