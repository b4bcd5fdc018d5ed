use std::ops::Range;

use chunkfold_common::{ExportRecord, ImportKind, ImportRecord};
use hashlink::LinkedHashSet;
use swc_core::{
  common::{BytePos, Spanned},
  ecma::{
    ast::{self, Decl, ModuleDecl, ModuleItem, Stmt},
    atoms::JsWord,
    utils::var::VarCollector,
    visit::VisitWith,
  },
};

use crate::{range_of, ExportNamedSpecifierExt, ImportNamedSpecifierExt, ModuleExportNameExt};

/// Everything the merge pipeline needs to know about one chunk's top level:
/// declared names, import bindings, and the ranges required to splice
/// import/export syntax out of the original text.
#[derive(Debug, Default)]
pub struct ModuleFacts {
  /// Names bound by top-level `const`/`let`/`var`, function, or class
  /// declarations, including ones still wrapped in an export clause.
  pub declared_names: LinkedHashSet<JsWord>,
  /// Local names bound by import statements. These collide with
  /// declarations exactly like declarations once chunks share a scope.
  pub import_bindings: LinkedHashSet<JsWord>,
  pub imports: Vec<ImportFacts>,
  pub exports: Vec<ExportFacts>,
  pub has_default: bool,
}

#[derive(Debug)]
pub struct ImportFacts {
  /// Whole import statement.
  pub range: Range<usize>,
  pub source: JsWord,
  pub specifiers: Vec<ImportSpecFacts>,
}

#[derive(Debug)]
pub struct ImportSpecFacts {
  pub record: ImportRecord,
  pub range: Range<usize>,
  pub local_range: Range<usize>,
}

#[derive(Debug)]
pub struct NamedExportSpec {
  /// For `export { a as b } from './x'`, `local_name` is the name on the
  /// source module (`a`) and `exported_name` the alias (`b`).
  pub record: ExportRecord,
  pub orig_range: Range<usize>,
  pub is_namespace: bool,
}

#[derive(Debug)]
pub enum ExportFacts {
  /// `export const x = …`, `export function f() {}`, `export class C {}`.
  Decl {
    stmt_range: Range<usize>,
    /// Covers `export ` up to the declaration itself.
    export_kw_range: Range<usize>,
    records: Vec<ExportRecord>,
  },
  /// `export { a, b as c }`, with or without `from`.
  Named {
    stmt_range: Range<usize>,
    source: Option<JsWord>,
    specifiers: Vec<NamedExportSpec>,
  },
  /// `export default function f() {}` / `export default class {}`.
  DefaultDecl {
    stmt_range: Range<usize>,
    /// Covers `export default ` up to the function/class keyword.
    default_kw_range: Range<usize>,
    local: Option<JsWord>,
  },
  /// `export default <expr>`.
  DefaultExpr {
    stmt_range: Range<usize>,
    default_kw_range: Range<usize>,
  },
  /// `export * from './x'`.
  All {
    stmt_range: Range<usize>,
    source: JsWord,
  },
}

impl ModuleFacts {
  /// All names the module binds at its top level, declarations and import
  /// bindings alike.
  pub fn bound_names(&self) -> LinkedHashSet<JsWord> {
    let mut names = self.declared_names.clone();
    names.extend(self.import_bindings.iter().cloned());
    names
  }

  /// Ordered `(exportedName, localName)` pairs for exports whose local
  /// binding lives in this module. Re-exports (`from`) are not included;
  /// they have no local binding to resolve to.
  pub fn local_export_records(&self) -> Vec<ExportRecord> {
    let mut records = vec![];
    for export in &self.exports {
      match export {
        ExportFacts::Decl { records: r, .. } => records.extend(r.iter().cloned()),
        ExportFacts::Named {
          source: None,
          specifiers,
          ..
        } => records.extend(specifiers.iter().map(|s| s.record.clone())),
        ExportFacts::DefaultDecl {
          local: Some(local), ..
        } => records.push(ExportRecord {
          exported_name: "default".into(),
          local_name: local.clone(),
        }),
        _ => {}
      }
    }
    records
  }

  /// Every name this module exports, whatever the export's shape, in
  /// statement order. `default` appears when a default export exists.
  pub fn exported_names(&self) -> LinkedHashSet<JsWord> {
    let mut names = LinkedHashSet::new();
    for export in &self.exports {
      match export {
        ExportFacts::Decl { records, .. } => {
          names.extend(records.iter().map(|r| r.exported_name.clone()));
        }
        ExportFacts::Named { specifiers, .. } => {
          names.extend(specifiers.iter().map(|s| s.record.exported_name.clone()));
        }
        ExportFacts::DefaultDecl { .. } | ExportFacts::DefaultExpr { .. } => {
          names.insert("default".into());
        }
        ExportFacts::All { .. } => {}
      }
    }
    names
  }

  pub fn imports_of<'a>(&'a self, source: &'a JsWord) -> impl Iterator<Item = &'a ImportFacts> {
    self.imports.iter().filter(move |i| &i.source == source)
  }
}

/// Extracts [`ModuleFacts`] from one parsed chunk. Purely structural; the
/// module does not need to be resolved first.
pub fn extract(module: &ast::Module, base: BytePos) -> ModuleFacts {
  let mut facts = ModuleFacts::default();

  for item in &module.body {
    match item {
      ModuleItem::Stmt(Stmt::Decl(decl)) => {
        collect_decl_names(decl, &mut facts.declared_names);
      }
      ModuleItem::ModuleDecl(module_decl) => {
        extract_module_decl(module_decl, base, &mut facts);
      }
      ModuleItem::Stmt(_) => {}
    }
  }

  facts
}

fn collect_decl_names(decl: &Decl, into: &mut LinkedHashSet<JsWord>) {
  match decl {
    Decl::Class(decl) => {
      into.insert(decl.ident.sym.clone());
    }
    Decl::Fn(decl) => {
      into.insert(decl.ident.sym.clone());
    }
    Decl::Var(decl) => {
      let mut collected = vec![] as Vec<ast::Ident>;
      let mut collector = VarCollector { to: &mut collected };
      decl.visit_with(&mut collector);
      collected.into_iter().for_each(|ident| {
        into.insert(ident.sym);
      });
    }
    _ => {}
  }
}

fn extract_module_decl(module_decl: &ModuleDecl, base: BytePos, facts: &mut ModuleFacts) {
  match module_decl {
    ModuleDecl::Import(import_decl) => {
      let source = import_decl.src.value.clone();
      let specifiers = import_decl
        .specifiers
        .iter()
        .map(|specifier| {
          let (record, local_span) = match specifier {
            ast::ImportSpecifier::Named(s) => (
              ImportRecord {
                source: source.clone(),
                kind: ImportKind::Named,
                local: s.local.sym.clone(),
                imported: Some(s.imported_name().clone()),
              },
              s.local_ident().span,
            ),
            ast::ImportSpecifier::Default(s) => (
              ImportRecord {
                source: source.clone(),
                kind: ImportKind::Default,
                local: s.local.sym.clone(),
                imported: None,
              },
              s.local.span,
            ),
            ast::ImportSpecifier::Namespace(s) => (
              ImportRecord {
                source: source.clone(),
                kind: ImportKind::Namespace,
                local: s.local.sym.clone(),
                imported: None,
              },
              s.local.span,
            ),
          };
          facts.import_bindings.insert(record.local.clone());
          ImportSpecFacts {
            record,
            range: range_of(specifier.span(), base),
            local_range: range_of(local_span, base),
          }
        })
        .collect();

      facts.imports.push(ImportFacts {
        range: range_of(import_decl.span, base),
        source,
        specifiers,
      });
    }

    ModuleDecl::ExportDecl(export_decl) => {
      let mut names = LinkedHashSet::new();
      collect_decl_names(&export_decl.decl, &mut names);
      let records = names
        .iter()
        .map(|name| ExportRecord {
          exported_name: name.clone(),
          local_name: name.clone(),
        })
        .collect();
      facts.declared_names.extend(names);

      let stmt_range = range_of(export_decl.span, base);
      let decl_range = range_of(export_decl.decl.span(), base);
      facts.exports.push(ExportFacts::Decl {
        export_kw_range: stmt_range.start..decl_range.start,
        stmt_range,
        records,
      });
    }

    ModuleDecl::ExportNamed(node) => {
      let source = node.src.as_ref().map(|s| s.value.clone());
      let specifiers = node
        .specifiers
        .iter()
        .filter_map(|specifier| match specifier {
          ast::ExportSpecifier::Named(s) => {
            let record = ExportRecord {
              exported_name: s.exported_as_name().clone(),
              local_name: s.local_name().clone(),
            };
            if record.exported_name.as_ref() == "default" {
              facts.has_default = true;
            }
            Some(NamedExportSpec {
              orig_range: range_of(s.orig.span(), base),
              record,
              is_namespace: false,
            })
          }
          ast::ExportSpecifier::Namespace(s) => Some(NamedExportSpec {
            record: ExportRecord {
              exported_name: s.name.atom().clone(),
              local_name: "*".into(),
            },
            orig_range: range_of(s.name.span(), base),
            is_namespace: true,
          }),
          // `export v from './x'` is not valid ESM.
          ast::ExportSpecifier::Default(_) => None,
        })
        .collect();

      facts.exports.push(ExportFacts::Named {
        stmt_range: range_of(node.span, base),
        source,
        specifiers,
      });
    }

    ModuleDecl::ExportDefaultDecl(node) => {
      facts.has_default = true;
      let stmt_range = range_of(node.span, base);
      let (local, decl_start) = match &node.decl {
        ast::DefaultDecl::Class(cls) => (
          cls.ident.as_ref().map(|i| i.sym.clone()),
          range_of(cls.class.span, base).start,
        ),
        ast::DefaultDecl::Fn(func) => (
          func.ident.as_ref().map(|i| i.sym.clone()),
          range_of(func.function.span, base).start,
        ),
        ast::DefaultDecl::TsInterfaceDecl(_) => return,
      };
      if let Some(local) = &local {
        facts.declared_names.insert(local.clone());
      }
      facts.exports.push(ExportFacts::DefaultDecl {
        default_kw_range: stmt_range.start..decl_start,
        stmt_range,
        local,
      });
    }

    ModuleDecl::ExportDefaultExpr(node) => {
      facts.has_default = true;
      let stmt_range = range_of(node.span, base);
      let expr_range = range_of(node.expr.span(), base);
      facts.exports.push(ExportFacts::DefaultExpr {
        default_kw_range: stmt_range.start..expr_range.start,
        stmt_range,
      });
    }

    ModuleDecl::ExportAll(node) => {
      facts.exports.push(ExportFacts::All {
        stmt_range: range_of(node.span, base),
        source: node.src.value.clone(),
      });
    }

    _ => {}
  }
}

#[cfg(test)]
mod tests {
  use chunkfold_compiler::Compiler;

  use super::*;

  fn facts_of(code: &str) -> (ModuleFacts, String) {
    let compiler = Compiler::new();
    let parsed = compiler.parse(code.to_string(), "test.js").unwrap();
    let facts = extract(&parsed.module, parsed.file.start_pos);
    (facts, code.to_string())
  }

  #[test]
  fn collects_declarations_and_exported_declarations() {
    let (facts, _) = facts_of(
      "const a = 1;\nexport const b = 2, { c } = obj;\nfunction d() {}\nexport class E {}\n",
    );
    let declared = facts
      .declared_names
      .iter()
      .map(|w| w.to_string())
      .collect::<Vec<_>>();
    assert_eq!(declared, ["a", "b", "c", "d", "E"]);
  }

  #[test]
  fn collects_import_bindings_and_records() {
    let (facts, _) = facts_of(
      "import def, { a, b as c } from './x';\nimport * as ns from 'react';\n",
    );
    let bindings = facts
      .import_bindings
      .iter()
      .map(|w| w.to_string())
      .collect::<Vec<_>>();
    assert_eq!(bindings, ["def", "a", "c", "ns"]);
    assert_eq!(facts.imports.len(), 2);
    assert_eq!(facts.imports[0].specifiers.len(), 3);
    let named = &facts.imports[0].specifiers[2].record;
    assert_eq!(named.imported_name().to_string(), "b");
    assert_eq!(named.local.to_string(), "c");
  }

  #[test]
  fn collects_export_specifier_lists_and_default() {
    let (facts, _) = facts_of("const a = 1;\nexport { a, a as b };\nexport default a;\n");
    assert!(facts.has_default);
    let records = facts.local_export_records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].exported_name.to_string(), "a");
    assert_eq!(records[1].exported_name.to_string(), "b");
    assert_eq!(records[1].local_name.to_string(), "a");
  }

  #[test]
  fn handles_string_module_export_names() {
    let (facts, _) = facts_of("export { a as \"b-c\" } from './x';\n");
    match &facts.exports[0] {
      ExportFacts::Named {
        source: Some(source),
        specifiers,
        ..
      } => {
        assert_eq!(source.as_ref(), "./x");
        assert_eq!(specifiers[0].record.exported_name.as_ref(), "b-c");
        assert_eq!(specifiers[0].record.local_name.as_ref(), "a");
      }
      other => panic!("unexpected facts: {other:?}"),
    }
  }

  #[test]
  fn export_kw_range_strips_cleanly() {
    let (facts, code) = facts_of("export const x = 1;\n");
    match &facts.exports[0] {
      ExportFacts::Decl {
        export_kw_range, ..
      } => {
        assert_eq!(&code[export_kw_range.clone()], "export ");
      }
      other => panic!("unexpected facts: {other:?}"),
    }
  }

  #[test]
  fn extraction_is_idempotent_over_stripped_output() {
    // Stripping exports never changes which names are bound.
    let (facts, code) = facts_of("export const x = 1;\nexport function f() {}\n");
    let mut edits = chunkfold_common::TextEdits::new();
    for export in &facts.exports {
      if let ExportFacts::Decl {
        export_kw_range, ..
      } = export
      {
        edits.remove(export_kw_range.clone());
      }
    }
    let stripped = edits.apply(&code).unwrap();
    let (stripped_facts, _) = facts_of(&stripped);
    assert_eq!(facts.declared_names, stripped_facts.declared_names);
  }
}
