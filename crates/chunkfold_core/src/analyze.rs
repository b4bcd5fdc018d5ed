use chunkfold_compiler::Compiler;
use chunkfold_swc_visitors::{extract, resolve, ModuleFacts};
use swc_core::{
  common::{BytePos, Mark, SyntaxContext},
  ecma::ast,
};

use crate::{BuildError, BuildResult};

/// A chunk's current text parsed, resolved and reduced to facts. Every
/// merge/inline/wrap step re-analyzes from the text it is about to edit,
/// since earlier steps shift byte offsets.
pub(crate) struct Analysis {
  pub module: ast::Module,
  pub facts: ModuleFacts,
  pub base: BytePos,
  pub top_level_ctxt: SyntaxContext,
}

/// Must run under the pass's swc `GLOBALS`.
pub(crate) fn analyze(compiler: &Compiler, code: &str, file_name: &str) -> BuildResult<Analysis> {
  let mut parsed = compiler
    .parse(code.to_string(), file_name)
    .map_err(|detail| BuildError::parse_failed(file_name.to_string(), detail))?;
  let unresolved_mark = Mark::new();
  let top_level_mark = Mark::new();
  resolve(&mut parsed.module, unresolved_mark, top_level_mark);
  let base = parsed.file.start_pos;
  let facts = extract(&parsed.module, base);
  Ok(Analysis {
    module: parsed.module,
    facts,
    base,
    top_level_ctxt: SyntaxContext::empty().apply_mark(top_level_mark),
  })
}
