use std::path::Path;

use chunkfold_core::{Asset, BuildResult, Chunk, CollapseOptions, CollapserCore, ModuleGraph};

/// Public entry point of the collapse pass.
pub struct Collapser {
  core: CollapserCore,
}

impl Collapser {
  pub fn new(options: CollapseOptions) -> Self {
    chunkfold_tracing::enable_tracing_on_demand();
    Self {
      core: CollapserCore::new(options),
    }
  }

  /// Collapses the chunks in memory and returns the finished assets.
  pub async fn generate(
    &self,
    chunks: Vec<Chunk>,
    graph: &dyn ModuleGraph,
  ) -> BuildResult<Vec<Asset>> {
    self.core.collapse(chunks, graph).await
  }

  /// Collapses the chunks and writes each asset under `dir`.
  pub async fn write(
    &self,
    chunks: Vec<Chunk>,
    graph: &dyn ModuleGraph,
    dir: impl AsRef<Path>,
  ) -> BuildResult<Vec<Asset>> {
    let assets = self.core.collapse(chunks, graph).await?;
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    for asset in &assets {
      let dest = dir.join(&asset.filename);
      if let Some(parent) = dest.parent() {
        if !parent.exists() {
          std::fs::create_dir_all(parent)?;
        }
      }
      std::fs::write(dest, &asset.content)?;
    }
    Ok(assets)
  }
}
