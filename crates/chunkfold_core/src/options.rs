use std::{path::PathBuf, sync::Arc};

use derivative::Derivative;
use rustc_hash::FxHashMap;

use crate::{BuildResult, Chunk};

pub type UnsharedPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Configuration of one collapse pass, validated up front in
/// [`CollapseOptions::validate`].
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct CollapseOptions {
  /// Name of the entry chunk that receives the merged shared code.
  pub primary: String,
  /// Global variable the primary wrapper is bound to.
  pub primary_global: String,
  /// Satellite entry name to property name under the primary global.
  pub secondary_props: FxHashMap<String, String>,
  /// Property under the primary global holding the materialized shared
  /// object.
  pub shared_prop: String,
  /// Decides which multi-importer chunks are duplicated into their
  /// importers instead of being merged into the primary.
  #[derivative(Debug = "ignore")]
  pub unshared: UnsharedPredicate,
  /// Global variable names for externally-sourced imports, keyed by import
  /// source.
  pub globals: FxHashMap<String, String>,
  /// When set, a missing entry in `globals` yields a sanitized generated
  /// name instead of failing the build.
  pub skip_require_globals: bool,
  /// Directory for intermediate per-stage snapshots of each chunk's text.
  pub debug_dir: Option<PathBuf>,
}

impl CollapseOptions {
  pub fn new(primary: impl Into<String>, primary_global: impl Into<String>) -> Self {
    Self {
      primary: primary.into(),
      primary_global: primary_global.into(),
      secondary_props: Default::default(),
      shared_prop: "__shared__".to_string(),
      unshared: Arc::new(|_| false),
      globals: Default::default(),
      skip_require_globals: false,
      debug_dir: None,
    }
  }

  /// Checks the parts that do not depend on chunk classification: every
  /// satellite entry that exports anything must have a property to be
  /// exposed under.
  pub(crate) fn validate(&self, chunks: &[Chunk]) -> BuildResult<()> {
    for chunk in chunks {
      if !chunk.is_entry || chunk.name == self.primary || chunk.exports.is_empty() {
        continue;
      }
      if !self.secondary_props.contains_key(&chunk.name) {
        return Err(chunkfold_error::Error::missing_secondary_prop(
          chunk.name.clone(),
          chunk.exports.iter().cloned(),
        ));
      }
    }
    Ok(())
  }
}
