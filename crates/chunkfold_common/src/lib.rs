use std::borrow::Cow;

use swc_core::ecma::atoms::JsWord;

mod text_edit;
pub use text_edit::*;

pub type StaticStr = Cow<'static, str>;

/// Rename of top-level locals, scoped to one donor chunk's merge into one
/// recipient. Keys are the original local names, values the replacements.
pub type RenameMap = rustc_hash::FxHashMap<JsWord, JsWord>;

/// Exported names of the shared chunk that at least one other chunk imports.
/// Kept in insertion order so the materialized shared object is stable.
pub type NeededExports = hashlink::LinkedHashSet<JsWord>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportKind {
  Default,
  Namespace,
  Named,
}

/// One binding introduced by an import statement.
///
/// For `import { foo as foo2 } from './foo'`, `imported` is `foo` and
/// `local` is `foo2`. For default and namespace imports `imported` is
/// `None`; the external name is implied by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportRecord {
  pub source: JsWord,
  pub kind: ImportKind,
  pub local: JsWord,
  pub imported: Option<JsWord>,
}

impl ImportRecord {
  /// The name this binding refers to on the source module: `default`, `*`,
  /// or the named import.
  pub fn imported_name(&self) -> JsWord {
    match self.kind {
      ImportKind::Default => "default".into(),
      ImportKind::Namespace => "*".into(),
      ImportKind::Named => self.imported.clone().unwrap_or_else(|| self.local.clone()),
    }
  }
}

/// `export { foo as foo2 }`: `foo` is `local_name`, `foo2` is `exported_name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExportRecord {
  pub exported_name: JsWord,
  pub local_name: JsWord,
}
