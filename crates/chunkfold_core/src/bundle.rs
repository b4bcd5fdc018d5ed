use std::path::Path;

use chunkfold_common::{ImportKind, NeededExports};
use chunkfold_compiler::Compiler;
use chunkfold_swc_visitors::ExportFacts;
use futures::future::try_join_all;
use swc_core::common::{Globals, GLOBALS};
use tokio::task::JoinHandle;

use crate::{
  analyze, classify, inline_unshared_into_entry, merge_shared_into_primary, wrap_chunk, Asset,
  BuildError, BuildResult, Chunk, ChunkIdentity, ChunkSet, CollapseOptions, GlobalBinding,
  ModuleGraph, WrapConfig, COMPILER, SWC_GLOBALS,
};

/// Drives one collapse pass: classification, the sequential merge and
/// inline phases, then one wrapping task per output chunk.
#[derive(Debug)]
pub struct CollapserCore {
  options: CollapseOptions,
}

impl CollapserCore {
  pub fn new(options: CollapseOptions) -> Self {
    chunkfold_tracing::enable_tracing_on_demand();
    Self { options }
  }

  #[tracing::instrument(skip_all)]
  pub async fn collapse(
    &self,
    chunks: Vec<Chunk>,
    graph: &dyn ModuleGraph,
  ) -> BuildResult<Vec<Asset>> {
    self.options.validate(&chunks)?;
    let mut set = classify(chunks, graph, &self.options)?;
    if set.shared.len() > 1 {
      // One materialized shared object per build; extra shared chunks are
      // duplicated into their importers instead.
      tracing::warn!(
        "{} shared chunks found; merging the first and duplicating the rest",
        set.shared.len()
      );
      let extra = set.shared.split_off(1);
      set.unshared.extend(extra);
    }
    let shared_chunk = set.shared.pop();

    let debug_dir = self.options.debug_dir.as_deref();
    for chunk in self.output_chunks(&set).chain(shared_chunk.iter()) {
      write_debug_snapshot(debug_dir, "input", &chunk.file_name, &chunk.code);
    }

    // Merge and inline are strictly sequential; chunk text is rewritten in
    // place and later steps depend on earlier ones.
    GLOBALS.set(&SWC_GLOBALS, || -> BuildResult<()> {
      let compiler = COMPILER.clone();
      let merged = match &shared_chunk {
        Some(shared) => {
          let needed = needed_exports(&compiler, shared, &set.satellites, &set.unshared)?;
          let merged = merge_shared_into_primary(
            &compiler,
            &mut set.primary,
            shared,
            &needed,
            &self.options.shared_prop,
          )?;
          Some(merged)
        }
        None => None,
      };
      write_debug_snapshot(debug_dir, "merged", &set.primary.file_name, &set.primary.code);

      for donor in &set.unshared {
        if set.primary.imports.iter().any(|i| i == &donor.file_name) {
          inline_unshared_into_entry(&compiler, &mut set.primary, donor, merged.as_ref())?;
        }
        for satellite in &mut set.satellites {
          if satellite.imports.iter().any(|i| i == &donor.file_name) {
            inline_unshared_into_entry(&compiler, satellite, donor, None)?;
          }
        }
      }
      Ok(())
    })?;

    for chunk in self.output_chunks(&set) {
      write_debug_snapshot(debug_dir, "prewrap", &chunk.file_name, &chunk.code);
    }

    // Wrapping is embarrassingly parallel: one task per output chunk, no
    // shared mutable state, failed jointly on the first error.
    let shared_target = shared_chunk.as_ref().map(|shared| {
      (
        ChunkIdentity::new(&shared.name, &shared.file_name),
        format!("{}.{}", self.options.primary_global, self.options.shared_prop),
      )
    });

    let mut tasks: Vec<JoinHandle<BuildResult<Asset>>> = vec![];
    let ChunkSet {
      primary, satellites, ..
    } = set;
    tasks.push(self.spawn_wrap(
      primary,
      GlobalBinding::Global(self.options.primary_global.clone()),
      None,
    ));
    for satellite in satellites {
      let binding = if satellite.exports.is_empty() {
        GlobalBinding::None
      } else {
        match self.options.secondary_props.get(&satellite.name) {
          Some(prop) => GlobalBinding::Property {
            global: self.options.primary_global.clone(),
            prop: prop.clone(),
          },
          None => {
            return Err(BuildError::missing_secondary_prop(
              satellite.name.clone(),
              satellite.exports.iter().cloned(),
            ))
          }
        }
      };
      tasks.push(self.spawn_wrap(satellite, binding, shared_target.clone()));
    }

    let joined = try_join_all(tasks)
      .await
      .map_err(|error| BuildError::panic(error.to_string()))?;
    let assets = joined.into_iter().collect::<BuildResult<Vec<Asset>>>()?;

    for asset in &assets {
      write_debug_snapshot(debug_dir, "wrapped", &asset.filename, &asset.content);
    }
    Ok(assets)
  }

  fn output_chunks<'a>(&self, set: &'a ChunkSet) -> impl Iterator<Item = &'a Chunk> {
    std::iter::once(&set.primary).chain(set.satellites.iter())
  }

  fn spawn_wrap(
    &self,
    chunk: Chunk,
    binding: GlobalBinding,
    shared: Option<(ChunkIdentity, String)>,
  ) -> JoinHandle<BuildResult<Asset>> {
    let globals = self.options.globals.clone();
    let skip_require_globals = self.options.skip_require_globals;
    tokio::task::spawn_blocking(move || {
      // Each task owns throwaway swc globals and a throwaway compiler,
      // released when the scope ends on every exit path.
      let swc_globals = Globals::new();
      GLOBALS.set(&swc_globals, || {
        let compiler = Compiler::new();
        let config = WrapConfig {
          binding,
          globals: &globals,
          skip_require_globals,
          shared,
        };
        let content = wrap_chunk(&compiler, &chunk, &config)?;
        Ok(Asset {
          filename: chunk.file_name.clone(),
          content,
        })
      })
    })
  }
}

/// Exports of the shared chunk that at least one satellite, or an unshared
/// chunk about to be duplicated into a satellite, actually imports. An
/// export consumed only on the primary's side must not end up in the
/// materialized shared object.
fn needed_exports(
  compiler: &Compiler,
  shared: &Chunk,
  satellites: &[Chunk],
  unshared: &[Chunk],
) -> BuildResult<NeededExports> {
  let identity = ChunkIdentity::new(&shared.name, &shared.file_name);
  let shared_analysis = analyze(compiler, &shared.code, &shared.file_name)?;
  let all_exports = shared_analysis.facts.exported_names();

  // An unshared donor inlined only into the primary has its shared imports
  // dissolved into direct locals; it never reads the materialized object.
  let satellite_inlined = unshared.iter().filter(|donor| {
    satellites
      .iter()
      .any(|satellite| satellite.imports.iter().any(|i| i == &donor.file_name))
  });

  let mut needed = NeededExports::new();
  for chunk in satellites.iter().chain(satellite_inlined) {
    let analysis = analyze(compiler, &chunk.code, &chunk.file_name)?;
    for import in &analysis.facts.imports {
      if !identity.matches(&import.source) {
        continue;
      }
      for spec in &import.specifiers {
        if matches!(spec.record.kind, ImportKind::Namespace) {
          needed.extend(all_exports.iter().cloned());
        } else {
          needed.insert(spec.record.imported_name());
        }
      }
    }
    for export in &analysis.facts.exports {
      if let ExportFacts::Named {
        source: Some(source),
        specifiers,
        ..
      } = export
      {
        if identity.matches(source) {
          for spec in specifiers {
            if !spec.is_namespace {
              needed.insert(spec.record.local_name.clone());
            }
          }
        }
      }
    }
  }
  Ok(needed)
}

/// Snapshot failures never abort a build.
fn write_debug_snapshot(debug_dir: Option<&Path>, stage: &str, file_name: &str, content: &str) {
  let dir = match debug_dir {
    Some(dir) => dir,
    None => return,
  };
  let path = dir.join(format!("{stage}.{}", file_name.replace('/', "_")));
  let written = std::fs::create_dir_all(dir).and_then(|_| std::fs::write(&path, content));
  if let Err(error) = written {
    tracing::warn!("could not write debug snapshot {}: {}", path.display(), error);
  }
}
