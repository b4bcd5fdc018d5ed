use chunkfold_common::TextEdits;
use rustc_hash::FxHashMap;
use swc_core::{
  common::{BytePos, Spanned, SyntaxContext},
  ecma::{
    ast::{self, Ident},
    atoms::JsWord,
    visit::{Visit, VisitWith},
  },
};

use crate::{range_of, ImportNamedSpecifierExt};

/// Whether `text` can appear bare in a specifier list, or needs the
/// string-literal form (`export { a as "b-c" }`).
fn is_ident_text(text: &str) -> bool {
  let mut chars = text.chars();
  match chars.next() {
    Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
    _ => return false,
  }
  chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Replacement text keyed by the old top-level local name. Values are
/// arbitrary expressions, so the same pass serves plain renames and the
/// wrap phase's `local` → `param.imported` rewrites.
pub type Renames = FxHashMap<JsWord, String>;

/// Member-access rewrites for namespace import locals:
/// `ns` → (`prop` → replacement text for the whole `ns.prop` expression).
pub type MemberTargets = FxHashMap<JsWord, FxHashMap<JsWord, String>>;

/// Applies a rename map throughout a module as text edits.
///
/// Only identifiers resolved to the module's top level are candidates;
/// shadowed locals keep their names. Binding-introducing sites get
/// syntax-preserving rewrites instead of blind text renames:
/// - `{ imported as localOld }` renames the local only, never the external
///   name; shorthand named imports gain an `as` clause;
/// - a renamed default-import binding converts the statement to the named
///   form `{ default as localNew }`;
/// - a namespace import's local is renamed in place;
/// - `export { a }` becomes `export { a2 as a }` so the exported name is
///   preserved; an explicit export alias is never renamed.
///
/// Statements that are structurally re-emitted are not descended into again
/// (the skip-recursion rule), so a rename can never clobber an edit that
/// was already applied to the same range.
pub fn collect_rename_edits(
  module: &ast::Module,
  base: BytePos,
  top_level_ctxt: SyntaxContext,
  renames: &Renames,
  edits: &mut TextEdits,
) {
  if renames.is_empty() {
    return;
  }
  let mut collector = RenameCollector {
    base,
    top_level_ctxt,
    renames,
    edits,
  };
  module.visit_with(&mut collector);
}

struct RenameCollector<'a> {
  base: BytePos,
  top_level_ctxt: SyntaxContext,
  renames: &'a Renames,
  edits: &'a mut TextEdits,
}

impl RenameCollector<'_> {
  fn replacement_for(&self, ident: &Ident) -> Option<&str> {
    if ident.span.ctxt != self.top_level_ctxt {
      return None;
    }
    self.renames.get(&ident.sym).map(String::as_str)
  }

  fn rename_use(&mut self, ident: &Ident) {
    if let Some(replacement) = self.replacement_for(ident) {
      let range = range_of(ident.span, self.base);
      if !self.edits.covers(&range) {
        let replacement = replacement.to_string();
        self.edits.replace(range, replacement);
      }
    }
  }

  fn replace_uncovered(&mut self, range: std::ops::Range<usize>, text: String) {
    if !self.edits.covers(&range) {
      self.edits.replace(range, text);
    }
  }

  fn rebuild_import_decl(&mut self, node: &ast::ImportDecl) {
    let src = node
      .src
      .raw
      .as_ref()
      .map(|raw| raw.to_string())
      .unwrap_or_else(|| format!("'{}'", node.src.value));

    let mut braced = vec![];
    let mut namespace = None;
    for specifier in &node.specifiers {
      match specifier {
        ast::ImportSpecifier::Default(s) => {
          let local = self
            .replacement_for(&s.local)
            .unwrap_or(s.local.sym.as_ref());
          braced.push(format!("default as {local}"));
        }
        ast::ImportSpecifier::Named(s) => {
          let imported = s.imported_name();
          let local = self
            .replacement_for(&s.local)
            .unwrap_or(s.local.sym.as_ref());
          if imported.as_ref() == local {
            braced.push(local.to_string());
          } else if is_ident_text(imported) {
            braced.push(format!("{imported} as {local}"));
          } else {
            braced.push(format!("\"{imported}\" as {local}"));
          }
        }
        ast::ImportSpecifier::Namespace(s) => {
          let local = self
            .replacement_for(&s.local)
            .unwrap_or(s.local.sym.as_ref());
          namespace = Some(local.to_string());
        }
      }
    }

    let mut statements = vec![];
    if !braced.is_empty() {
      statements.push(format!("import {{ {} }} from {src};", braced.join(", ")));
    }
    if let Some(ns) = namespace {
      statements.push(format!("import * as {ns} from {src};"));
    }
    self.replace_uncovered(range_of(node.span, self.base), statements.join("\n"));
  }
}

impl Visit for RenameCollector<'_> {
  fn visit_ident(&mut self, ident: &Ident) {
    self.rename_use(ident);
  }

  fn visit_member_expr(&mut self, node: &ast::MemberExpr) {
    node.obj.visit_with(self);
    if let ast::MemberProp::Computed(computed) = &node.prop {
      computed.visit_with(self);
    }
  }

  fn visit_prop_name(&mut self, node: &ast::PropName) {
    if let ast::PropName::Computed(computed) = node {
      computed.visit_with(self);
    }
  }

  fn visit_prop(&mut self, node: &ast::Prop) {
    if let ast::Prop::Shorthand(ident) = node {
      // `{ foo }` must become `{ foo: foo2 }` so `obj.foo` stays valid.
      if let Some(replacement) = self.replacement_for(ident) {
        let replacement = format!("{}: {}", ident.sym, replacement);
        self.replace_uncovered(range_of(ident.span, self.base), replacement);
      }
      return;
    }
    node.visit_children_with(self);
  }

  fn visit_object_pat_prop(&mut self, node: &ast::ObjectPatProp) {
    match node {
      ast::ObjectPatProp::Assign(prop) => {
        // `{ foo }` / `{ foo = 1 }` patterns keep their key:
        // `{ foo: foo2 }` / `{ foo: foo2 = 1 }`.
        if let Some(replacement) = self.replacement_for(&prop.key) {
          let replacement = format!("{}: {}", prop.key.sym, replacement);
          self.replace_uncovered(range_of(prop.key.span, self.base), replacement);
        }
        if let Some(value) = &prop.value {
          value.visit_with(self);
        }
      }
      ast::ObjectPatProp::KeyValue(prop) => {
        self.visit_prop_name(&prop.key);
        prop.value.visit_with(self);
      }
      ast::ObjectPatProp::Rest(rest) => rest.visit_children_with(self),
    }
  }

  fn visit_import_decl(&mut self, node: &ast::ImportDecl) {
    let default_renamed = node.specifiers.iter().any(|specifier| {
      matches!(specifier, ast::ImportSpecifier::Default(s) if self.replacement_for(&s.local).is_some())
    });
    if default_renamed {
      // A renamed default binding is only expressible in the named form,
      // which changes the statement's shape.
      self.rebuild_import_decl(node);
      return;
    }

    for specifier in &node.specifiers {
      match specifier {
        ast::ImportSpecifier::Named(s) => {
          if let Some(replacement) = self.replacement_for(&s.local) {
            let text = if s.imported.is_some() {
              replacement.to_string()
            } else {
              format!("{} as {}", s.local.sym, replacement)
            };
            self.replace_uncovered(range_of(s.local.span, self.base), text);
          }
        }
        ast::ImportSpecifier::Namespace(s) => {
          if let Some(replacement) = self.replacement_for(&s.local) {
            let replacement = replacement.to_string();
            self.replace_uncovered(range_of(s.local.span, self.base), replacement);
          }
        }
        ast::ImportSpecifier::Default(_) => {}
      }
    }
  }

  fn visit_named_export(&mut self, node: &ast::NamedExport) {
    if node.src.is_some() {
      // Specifiers name exports of the source module, not locals.
      return;
    }
    for specifier in &node.specifiers {
      if let ast::ExportSpecifier::Named(s) = specifier {
        if let ast::ModuleExportName::Ident(orig) = &s.orig {
          if let Some(replacement) = self.replacement_for(orig) {
            let text = if s.exported.is_some() {
              // `export { a as b }`: only the local use is renamed, the
              // alias stays. Export aliases resolve through the
              // export-to-local table, never through this map.
              replacement.to_string()
            } else {
              format!("{} as {}", replacement, orig.sym)
            };
            self.replace_uncovered(range_of(orig.span, self.base), text);
          }
        }
      }
    }
  }
}

/// Rewrites member accesses on namespace-import locals (`ns.prop`, also
/// `ns['prop']`) to the replacement recorded for that property. Unlisted
/// properties are left alone and reported at trace level.
pub fn collect_member_edits(
  module: &ast::Module,
  base: BytePos,
  top_level_ctxt: SyntaxContext,
  targets: &MemberTargets,
  edits: &mut TextEdits,
) {
  if targets.is_empty() {
    return;
  }
  let mut collector = MemberCollector {
    base,
    top_level_ctxt,
    targets,
    edits,
  };
  module.visit_with(&mut collector);
}

struct MemberCollector<'a> {
  base: BytePos,
  top_level_ctxt: SyntaxContext,
  targets: &'a MemberTargets,
  edits: &'a mut TextEdits,
}

impl Visit for MemberCollector<'_> {
  fn visit_member_expr(&mut self, node: &ast::MemberExpr) {
    if let ast::Expr::Ident(obj) = node.obj.as_ref() {
      if obj.span.ctxt == self.top_level_ctxt {
        if let Some(props) = self.targets.get(&obj.sym) {
          let prop = match &node.prop {
            ast::MemberProp::Ident(ident) => Some(ident.sym.clone()),
            ast::MemberProp::Computed(computed) => match computed.expr.as_ref() {
              ast::Expr::Lit(ast::Lit::Str(s)) => Some(s.value.clone()),
              _ => None,
            },
            ast::MemberProp::PrivateName(_) => None,
          };
          match prop.as_ref().and_then(|prop| props.get(prop)) {
            Some(replacement) => {
              let range = range_of(node.span, self.base);
              if !self.edits.covers(&range) {
                self.edits.replace(range, replacement.clone());
              }
              return;
            }
            None => {
              tracing::trace!(
                "no rewrite target for member access on \"{}\", leaving as-is",
                obj.sym
              );
            }
          }
        }
      }
    }
    node.obj.visit_with(self);
    if let ast::MemberProp::Computed(computed) = &node.prop {
      computed.visit_with(self);
    }
  }
}
