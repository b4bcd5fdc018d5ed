use swc_core::ecma::{ast, atoms::JsWord};

pub trait ModuleExportNameExt {
  /// The name itself, whether written as an identifier or as a string
  /// literal (`export { a as "b-c" }`).
  fn atom(&self) -> &JsWord;
}

impl ModuleExportNameExt for ast::ModuleExportName {
  fn atom(&self) -> &JsWord {
    match self {
      ast::ModuleExportName::Ident(ident) => &ident.sym,
      ast::ModuleExportName::Str(s) => &s.value,
    }
  }
}

pub trait ImportNamedSpecifierExt {
  fn imported_name(&self) -> &JsWord;
  fn local_ident(&self) -> &ast::Ident;
}

impl ImportNamedSpecifierExt for ast::ImportNamedSpecifier {
  fn imported_name(&self) -> &JsWord {
    match &self.imported {
      Some(imported) => imported.atom(),
      None => &self.local.sym,
    }
  }

  fn local_ident(&self) -> &ast::Ident {
    &self.local
  }
}

pub trait ExportNamedSpecifierExt {
  fn local_name(&self) -> &JsWord;
  fn exported_as_name(&self) -> &JsWord;
}

impl ExportNamedSpecifierExt for ast::ExportNamedSpecifier {
  fn local_name(&self) -> &JsWord {
    self.orig.atom()
  }

  fn exported_as_name(&self) -> &JsWord {
    match &self.exported {
      Some(exported) => exported.atom(),
      None => self.orig.atom(),
    }
  }
}
