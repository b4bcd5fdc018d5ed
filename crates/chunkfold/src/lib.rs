mod collapser;
pub use {
  chunkfold_core::{
    classify, Asset, BuildError, BuildResult, Chunk, ChunkSet, CollapseOptions, ModuleGraph,
    UnsharedPredicate,
  },
  collapser::Collapser,
};
