use std::fmt::Display;

use crate::ErrorKind;

#[derive(Debug)]
pub struct Error {
  contexts: Vec<String>,
  pub kind: ErrorKind,
}

impl Error {
  fn with_kind(kind: ErrorKind) -> Self {
    Self {
      contexts: vec![],
      kind,
    }
  }

  pub fn context(mut self, context: String) -> Self {
    self.contexts.push(context);
    self
  }

  pub fn parse_failed(file_name: impl Into<String>, detail: impl Into<String>) -> Self {
    Self::with_kind(ErrorKind::ParseFailed {
      file_name: file_name.into().into(),
      detail: detail.into().into(),
    })
  }

  pub fn missing_primary_entry(
    primary: impl Into<String>,
    entries: impl IntoIterator<Item = String>,
  ) -> Self {
    Self::with_kind(ErrorKind::MissingPrimaryEntry {
      primary: primary.into().into(),
      entries: entries.into_iter().map(Into::into).collect(),
    })
  }

  pub fn missing_secondary_prop(
    entry: impl Into<String>,
    exported_keys: impl IntoIterator<Item = String>,
  ) -> Self {
    Self::with_kind(ErrorKind::MissingSecondaryProp {
      entry: entry.into().into(),
      exported_keys: exported_keys.into_iter().map(Into::into).collect(),
    })
  }

  pub fn missing_global_name(source: impl Into<String>, chunk: impl Into<String>) -> Self {
    Self::with_kind(ErrorKind::MissingGlobalName {
      source: source.into().into(),
      chunk: chunk.into().into(),
    })
  }

  pub fn io_error(e: std::io::Error) -> Self {
    Self::with_kind(ErrorKind::IoError(e))
  }

  pub fn panic(msg: String) -> Self {
    anyhow::format_err!(msg).into()
  }
}

impl From<anyhow::Error> for Error {
  fn from(value: anyhow::Error) -> Self {
    Self::with_kind(ErrorKind::Panic { source: value })
  }
}

impl From<std::io::Error> for Error {
  fn from(value: std::io::Error) -> Self {
    Self::io_error(value)
  }
}

impl std::error::Error for Error {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match &self.kind {
      ErrorKind::Panic { source, .. } => Some(source.as_ref()),
      _ => None,
    }
  }
}

impl Display for Error {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    for ctx in self.contexts.iter().rev() {
      writeln!(f, "{}: {}", ansi_term::Color::Yellow.paint("context"), ctx)?;
    }

    self.kind.fmt(f)
  }
}
