use std::ops::Range;

use swc_core::{
  common::{BytePos, Spanned, SyntaxContext},
  ecma::{
    ast,
    atoms::JsWord,
    visit::{Visit, VisitWith},
  },
};

use crate::range_of;

/// One parameter of the wrapper function. `sym` is `None` for non-identifier
/// patterns, which the wrap phase never emits but foreign input may contain.
#[derive(Debug)]
pub struct ParamFacts {
  pub sym: Option<JsWord>,
  pub ctxt: SyntaxContext,
  pub range: Range<usize>,
}

/// Shape of the first function expression in a module, which by the wrap
/// phase's construction is the bundle wrapper.
#[derive(Debug)]
pub struct WrapperFacts {
  pub params: Vec<ParamFacts>,
  /// Range of a leading `'use strict';` directive inside the body, if any.
  pub directive_range: Option<Range<usize>>,
}

pub fn find_wrapper(module: &ast::Module, base: BytePos) -> Option<WrapperFacts> {
  let mut finder = WrapperFinder { base, facts: None };
  module.visit_with(&mut finder);
  finder.facts
}

struct WrapperFinder {
  base: BytePos,
  facts: Option<WrapperFacts>,
}

impl Visit for WrapperFinder {
  fn visit_fn_expr(&mut self, node: &ast::FnExpr) {
    if self.facts.is_some() {
      return;
    }
    let params = node
      .function
      .params
      .iter()
      .map(|param| {
        let (sym, ctxt) = match &param.pat {
          ast::Pat::Ident(binding) => {
            (Some(binding.id.sym.clone()), binding.id.span.ctxt)
          }
          _ => (None, SyntaxContext::empty()),
        };
        ParamFacts {
          sym,
          ctxt,
          range: range_of(param.pat.span(), self.base),
        }
      })
      .collect();

    let directive_range = node.function.body.as_ref().and_then(|body| {
      body.stmts.first().and_then(|stmt| match stmt {
        ast::Stmt::Expr(expr_stmt) => match expr_stmt.expr.as_ref() {
          ast::Expr::Lit(ast::Lit::Str(s)) if s.value.as_ref() == "use strict" => {
            Some(range_of(expr_stmt.span, self.base))
          }
          _ => None,
        },
        _ => None,
      })
    });

    self.facts = Some(WrapperFacts {
      params,
      directive_range,
    });
  }
}

/// A `param.prop` or `param['prop']` use inside the wrapper body.
#[derive(Debug)]
pub struct ParamMemberUse {
  pub range: Range<usize>,
  pub prop: JsWord,
}

/// Collects every static member access on the given parameter binding.
/// Dynamic accesses (`param[expr]`) are not returned; the caller keeps the
/// parameter in that case rather than destructuring it unsoundly.
pub fn collect_param_member_uses(
  module: &ast::Module,
  base: BytePos,
  param: &(JsWord, SyntaxContext),
) -> ParamMemberUses {
  let mut collector = ParamMemberCollector {
    base,
    param,
    uses: vec![],
    has_dynamic_use: false,
  };
  module.visit_with(&mut collector);
  ParamMemberUses {
    uses: collector.uses,
    has_dynamic_use: collector.has_dynamic_use,
  }
}

#[derive(Debug)]
pub struct ParamMemberUses {
  pub uses: Vec<ParamMemberUse>,
  /// True when the parameter escapes static member access, e.g. it is
  /// passed around whole or indexed with a computed expression.
  pub has_dynamic_use: bool,
}

struct ParamMemberCollector<'a> {
  base: BytePos,
  param: &'a (JsWord, SyntaxContext),
  uses: Vec<ParamMemberUse>,
  has_dynamic_use: bool,
}

impl ParamMemberCollector<'_> {
  fn is_param(&self, ident: &ast::Ident) -> bool {
    ident.sym == self.param.0 && ident.span.ctxt == self.param.1
  }
}

impl Visit for ParamMemberCollector<'_> {
  fn visit_member_expr(&mut self, node: &ast::MemberExpr) {
    if let ast::Expr::Ident(obj) = node.obj.as_ref() {
      if self.is_param(obj) {
        let prop = match &node.prop {
          ast::MemberProp::Ident(ident) => Some(ident.sym.clone()),
          ast::MemberProp::Computed(computed) => match computed.expr.as_ref() {
            ast::Expr::Lit(ast::Lit::Str(s)) => Some(s.value.clone()),
            _ => None,
          },
          ast::MemberProp::PrivateName(_) => None,
        };
        match prop {
          Some(prop) => self.uses.push(ParamMemberUse {
            range: range_of(node.span, self.base),
            prop,
          }),
          None => self.has_dynamic_use = true,
        }
        if let ast::MemberProp::Computed(computed) = &node.prop {
          computed.visit_with(self);
        }
        return;
      }
    }
    node.obj.visit_with(self);
    if let ast::MemberProp::Computed(computed) = &node.prop {
      computed.visit_with(self);
    }
  }

  fn visit_ident(&mut self, ident: &ast::Ident) {
    // A bare reference that is not the object of a member access means the
    // parameter is used as a value and cannot be dissolved.
    if self.is_param(ident) {
      self.has_dynamic_use = true;
    }
  }

  fn visit_param(&mut self, _: &ast::Param) {
    // Binding occurrences in parameter lists are not uses.
  }
}

#[cfg(test)]
mod tests {
  use chunkfold_compiler::Compiler;
  use swc_core::common::{Globals, Mark, GLOBALS};

  use super::*;

  fn analyze(code: &str) -> (ast::Module, BytePos, SyntaxContext) {
    let compiler = Compiler::new();
    let mut parsed = compiler.parse(code.to_string(), "test.js").unwrap();
    let unresolved_mark = Mark::new();
    let top_level_mark = Mark::new();
    crate::resolve(&mut parsed.module, unresolved_mark, top_level_mark);
    let base = parsed.file.start_pos;
    (
      parsed.module,
      base,
      SyntaxContext::empty().apply_mark(top_level_mark),
    )
  }

  #[test]
  fn finds_first_fn_expr_params_and_directive() {
    GLOBALS.set(&Globals::new(), || {
      let code = "var app = (function (exports, dep, shared) {\n'use strict';\nshared.helper();\nreturn exports;\n})({}, Dep, app.__shared__);\n";
      let (module, base, _) = analyze(code);
      let facts = find_wrapper(&module, base).unwrap();
      assert_eq!(facts.params.len(), 3);
      assert_eq!(facts.params[2].sym.as_deref(), Some("shared"));
      let directive = facts.directive_range.unwrap();
      assert_eq!(&code[directive.clone()], "'use strict';");
    })
  }

  #[test]
  fn collects_static_member_uses_of_a_param() {
    GLOBALS.set(&Globals::new(), || {
      let code = "var app = (function (shared) {\nshared.helper();\nconsole.log(shared['other']);\n})(app.__shared__);\n";
      let (module, base, _) = analyze(code);
      let facts = find_wrapper(&module, base).unwrap();
      let param = &facts.params[0];
      let uses = collect_param_member_uses(
        &module,
        base,
        &(param.sym.clone().unwrap(), param.ctxt),
      );
      assert!(!uses.has_dynamic_use);
      let props = uses
        .uses
        .iter()
        .map(|u| u.prop.as_ref())
        .collect::<Vec<_>>();
      assert_eq!(props, vec!["helper", "other"]);
    })
  }

  #[test]
  fn flags_params_used_as_whole_values() {
    GLOBALS.set(&Globals::new(), || {
      let code = "var app = (function (shared) {\nconsume(shared);\n})(app.__shared__);\n";
      let (module, base, _) = analyze(code);
      let facts = find_wrapper(&module, base).unwrap();
      let param = &facts.params[0];
      let uses = collect_param_member_uses(
        &module,
        base,
        &(param.sym.clone().unwrap(), param.ctxt),
      );
      assert!(uses.has_dynamic_use);
    })
  }
}
