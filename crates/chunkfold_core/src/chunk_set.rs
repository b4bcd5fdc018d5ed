use crate::{BuildError, BuildResult, Chunk, CollapseOptions, ModuleGraph};

/// The partition the rest of the pass works on. Shared chunks are merged
/// into the primary in order; unshared chunks are duplicated into each
/// importing entry.
#[derive(Debug)]
pub struct ChunkSet {
  pub primary: Chunk,
  pub satellites: Vec<Chunk>,
  pub shared: Vec<Chunk>,
  pub unshared: Vec<Chunk>,
}

pub fn classify(
  chunks: Vec<Chunk>,
  graph: &dyn ModuleGraph,
  options: &CollapseOptions,
) -> BuildResult<ChunkSet> {
  let mut primary = None;
  let mut satellites = vec![];
  let mut shared = vec![];
  let mut unshared = vec![];

  let entry_names = chunks
    .iter()
    .filter(|chunk| chunk.is_entry)
    .map(|chunk| chunk.name.clone())
    .collect::<Vec<_>>();

  for chunk in chunks {
    if chunk.is_entry {
      if chunk.name == options.primary {
        primary = Some(chunk);
      } else {
        satellites.push(chunk);
      }
    } else if (options.unshared)(&chunk.file_name)
      || graph.importer_count(&chunk.file_name) <= 1
    {
      // A single importer means the code was split out for loading
      // granularity, not for sharing. It goes back into its importer.
      unshared.push(chunk);
    } else {
      shared.push(chunk);
    }
  }

  let primary = primary
    .ok_or_else(|| BuildError::missing_primary_entry(options.primary.clone(), entry_names))?;

  tracing::debug!(
    "classified chunks: primary={}, satellites={}, shared={}, unshared={}",
    primary.name,
    satellites.len(),
    shared.len(),
    unshared.len()
  );

  Ok(ChunkSet {
    primary,
    satellites,
    shared,
    unshared,
  })
}

#[cfg(test)]
mod tests {
  use rustc_hash::FxHashMap;

  use super::*;

  struct StubGraph(FxHashMap<&'static str, usize>);

  impl ModuleGraph for StubGraph {
    fn importer_count(&self, file_name: &str) -> usize {
      self.0.get(file_name).copied().unwrap_or(0)
    }
  }

  fn chunk(name: &str, is_entry: bool) -> Chunk {
    Chunk {
      name: name.to_string(),
      file_name: format!("{name}.chunk.js"),
      code: String::new(),
      is_entry,
      exports: vec![],
      imports: vec![],
    }
  }

  #[test]
  fn partitions_by_entry_flag_and_importer_count() {
    let graph = StubGraph(FxHashMap::from_iter([
      ("common.chunk.js", 3),
      ("split.chunk.js", 1),
    ]));
    let options = CollapseOptions::new("main", "app");
    let set = classify(
      vec![
        chunk("main", true),
        chunk("admin", true),
        chunk("common", false),
        chunk("split", false),
      ],
      &graph,
      &options,
    )
    .unwrap();
    assert_eq!(set.primary.name, "main");
    assert_eq!(set.satellites.len(), 1);
    assert_eq!(set.shared.len(), 1);
    assert_eq!(set.shared[0].name, "common");
    assert_eq!(set.unshared[0].name, "split");
  }

  #[test]
  fn unshared_predicate_overrides_importer_count() {
    let graph = StubGraph(FxHashMap::from_iter([("common.chunk.js", 3)]));
    let mut options = CollapseOptions::new("main", "app");
    options.unshared = std::sync::Arc::new(|file_name| file_name.starts_with("common"));
    let set = classify(
      vec![chunk("main", true), chunk("common", false)],
      &graph,
      &options,
    )
    .unwrap();
    assert!(set.shared.is_empty());
    assert_eq!(set.unshared[0].name, "common");
  }

  #[test]
  fn missing_primary_is_fatal_and_lists_entries() {
    let graph = StubGraph(Default::default());
    let options = CollapseOptions::new("nope", "app");
    let err = classify(vec![chunk("main", true)], &graph, &options).unwrap_err();
    assert_eq!(err.kind.code(), chunkfold_error::error_code::MISSING_PRIMARY_ENTRY);
  }
}
