use std::{path::PathBuf, sync::Arc};

use ast::EsVersion;
use swc_common::{FileName, SourceMap};
use swc_core::{
  common::{self as swc_common, SourceFile},
  ecma::{
    ast,
    parser::{self as swc_ecma_parser},
  },
};
use swc_ecma_parser::{lexer::Lexer, Parser, StringInput, Syntax};

/// One parse of one chunk's text. The module's spans are relative to
/// `file.start_pos`; subtract it before indexing into the original text.
pub struct ParsedModule {
  pub module: ast::Module,
  pub file: Arc<SourceFile>,
}

/// Thin wrapper over swc's ECMAScript parser.
///
/// The merge pipeline shares one compiler; every wrap task owns a throwaway
/// one so concurrent parses never contend on a source map.
#[derive(Default)]
pub struct Compiler {
  pub cm: Arc<SourceMap>,
}

impl Compiler {
  pub fn new() -> Self {
    Default::default()
  }

  pub fn with_cm(cm: Arc<SourceMap>) -> Self {
    Self { cm }
  }

  pub fn create_source_file(&self, filename: PathBuf, code: String) -> Arc<SourceFile> {
    self.cm.new_source_file(FileName::Real(filename), code)
  }

  /// Parse `code` as a module. The input is always assumed to be ESM.
  pub fn parse(&self, code: String, filename: &str) -> Result<ParsedModule, String> {
    let file = self.create_source_file(PathBuf::from(filename), code);

    let lexer = Lexer::new(
      Syntax::Es(Default::default()),
      EsVersion::latest(),
      StringInput::from(file.as_ref()),
      None,
    );
    let mut parser = Parser::new_from(lexer);
    let module = parser
      .parse_module()
      .map_err(|err| err.kind().msg().to_string())?;
    // The parser recovers from some malformed input; treat that as fatal
    // too, since downstream byte offsets would be meaningless.
    if let Some(err) = parser.take_errors().into_iter().next() {
      return Err(err.kind().msg().to_string());
    }

    Ok(ParsedModule { module, file })
  }
}
