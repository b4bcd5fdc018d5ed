use std::sync::Arc;

use once_cell::sync::Lazy;
use swc_core::common::{FilePathMapping, Globals, SourceMap};

mod chunk;
pub use chunk::*;
mod options;
pub use options::*;
mod chunk_set;
pub use chunk_set::*;
mod analyze;
pub(crate) use analyze::*;
mod merge;
pub(crate) use merge::*;
mod inline;
pub(crate) use inline::*;
mod wrap;
pub(crate) use wrap::*;
mod bundle;
pub use bundle::*;
mod utils;
pub use utils::*;

pub(crate) static SOURCE_MAP: Lazy<Arc<SourceMap>> =
  Lazy::new(|| Arc::new(SourceMap::new(FilePathMapping::empty())));

pub(crate) static COMPILER: Lazy<Arc<chunkfold_compiler::Compiler>> = Lazy::new(|| {
  let cm = SOURCE_MAP.clone();
  let compiler = chunkfold_compiler::Compiler::with_cm(cm);
  Arc::new(compiler)
});

pub(crate) static SWC_GLOBALS: Lazy<Arc<Globals>> = Lazy::new(|| Arc::new(Globals::new()));

// public exports

pub type BuildResult<T> = chunkfold_error::Result<T>;
pub type BuildError = chunkfold_error::Error;
