use chunkfold_common::{ImportKind, TextEdits};
use chunkfold_compiler::Compiler;
use chunkfold_swc_visitors::{collect_member_edits, collect_rename_edits, MemberTargets, Renames};
use swc_core::ecma::atoms::JsWord;

use crate::{
  analyze, rewire_imports_of, rewire_reexports_of, strip_export_syntax, unshared_alias,
  BuildResult, Chunk, ChunkIdentity, SharedMerge,
};

/// Duplicates `donor` into `entry`: strips the donor's exports, renames
/// every donor top-level binding with a donor-unique prefix, rewires the
/// entry's imports of the donor to the renamed locals, and prepends the
/// donor body. The prefix is applied unconditionally, not just on
/// collision, so the same donor inlined into several entries never aliases
/// across them. Must run under the pass's swc `GLOBALS`.
pub(crate) fn inline_unshared_into_entry(
  compiler: &Compiler,
  entry: &mut Chunk,
  donor: &Chunk,
  merged_shared: Option<&SharedMerge>,
) -> BuildResult<()> {
  let donor_analysis = analyze(compiler, &donor.code, &donor.file_name)?;
  let entry_analysis = analyze(compiler, &entry.code, &entry.file_name)?;

  let mut donor_renames = Renames::default();
  for name in donor_analysis.facts.bound_names() {
    donor_renames.insert(name.clone(), unshared_alias(&donor.name, &name));
  }

  let mut donor_edits = TextEdits::new();
  let mut donor_member_targets = MemberTargets::default();

  // When the donor lands in the primary, its imports of the already-merged
  // shared chunk dissolve into direct references; in satellites they stay
  // as imports and only their locals are prefixed.
  if let Some(shared) = merged_shared {
    for import in &donor_analysis.facts.imports {
      if !shared.identity.matches(&import.source) {
        continue;
      }
      donor_edits.remove(import.range.clone());
      for spec in &import.specifiers {
        match spec.record.kind {
          ImportKind::Named | ImportKind::Default => {
            let imported = spec.record.imported_name();
            let resolved = shared.export_to_local.get(&imported).cloned().unwrap_or_else(|| {
              tracing::warn!(
                "\"{}\" imports \"{}\" from the merged shared chunk, which exports no such name",
                donor.file_name,
                imported
              );
              imported.to_string()
            });
            donor_renames.insert(spec.record.local.clone(), resolved);
          }
          ImportKind::Namespace => {
            donor_renames.remove(&spec.record.local);
            let props = shared
              .export_to_local
              .iter()
              .map(|(exported, local)| (exported.clone(), local.clone()))
              .collect();
            donor_member_targets.insert(spec.record.local.clone(), props);
          }
        }
      }
    }
  }

  let rename = |name: &JsWord| {
    donor_renames
      .get(name)
      .cloned()
      .unwrap_or_else(|| unshared_alias(&donor.name, name))
  };
  let default_local = unshared_alias(&donor.name, "default");
  let export_table = strip_export_syntax(
    &donor_analysis.facts,
    &rename,
    &default_local,
    &donor.file_name,
    &mut donor_edits,
  );

  collect_rename_edits(
    &donor_analysis.module,
    donor_analysis.base,
    donor_analysis.top_level_ctxt,
    &donor_renames,
    &mut donor_edits,
  );
  collect_member_edits(
    &donor_analysis.module,
    donor_analysis.base,
    donor_analysis.top_level_ctxt,
    &donor_member_targets,
    &mut donor_edits,
  );
  let donor_body = donor_edits.apply(&donor.code)?;

  let identity = ChunkIdentity::new(&donor.name, &donor.file_name);
  let mut entry_edits = TextEdits::new();
  let mut entry_renames = Renames::default();
  let mut entry_member_targets = MemberTargets::default();
  rewire_imports_of(
    &entry_analysis.facts,
    &identity,
    &export_table,
    &donor.file_name,
    &mut entry_renames,
    &mut entry_member_targets,
    &mut entry_edits,
  );
  rewire_reexports_of(
    &entry_analysis.facts,
    &identity,
    &export_table,
    &donor.file_name,
    &mut entry_edits,
  );
  collect_rename_edits(
    &entry_analysis.module,
    entry_analysis.base,
    entry_analysis.top_level_ctxt,
    &entry_renames,
    &mut entry_edits,
  );
  collect_member_edits(
    &entry_analysis.module,
    entry_analysis.base,
    entry_analysis.top_level_ctxt,
    &entry_member_targets,
    &mut entry_edits,
  );
  let entry_body = entry_edits.apply(&entry.code)?;

  let mut combined =
    String::with_capacity(donor_body.len() + entry_body.len() + 1);
  combined.push_str(donor_body.trim_end());
  combined.push('\n');
  combined.push_str(&entry_body);
  entry.code = combined;

  Ok(())
}

#[cfg(test)]
mod tests {
  use swc_core::common::GLOBALS;

  use super::*;

  fn chunk(name: &str, file_name: &str, code: &str) -> Chunk {
    Chunk {
      name: name.to_string(),
      file_name: file_name.to_string(),
      code: code.to_string(),
      is_entry: false,
      exports: vec![],
      imports: vec![],
    }
  }

  fn inline(entry_code: &str, donor_code: &str) -> String {
    GLOBALS.set(&Default::default(), || {
      let compiler = Compiler::new();
      let mut entry = chunk("admin", "admin.js", entry_code);
      entry.is_entry = true;
      let donor = chunk("split", "split.chunk.js", donor_code);
      inline_unshared_into_entry(&compiler, &mut entry, &donor, None).unwrap();
      entry.code
    })
  }

  #[test]
  fn prefixes_every_donor_binding_and_rewires_the_entry() {
    let out = inline(
      "import { util } from './split.chunk.js';\nutil();\n",
      "const state = 1;\nexport function util() { return state; }\n",
    );
    assert!(out.contains("const __split$state = 1;"));
    assert!(out.contains("function __split$util() { return __split$state; }"));
    assert!(out.contains("__split$util();"));
    assert!(!out.contains("import"));
  }

  #[test]
  fn prefixes_apply_even_without_collisions() {
    // The same donor may be inlined into several entries; its bindings must
    // never alias across them.
    let out = inline(
      "import { a } from './split.chunk.js';\nconsole.log(a);\n",
      "export const a = 1;\n",
    );
    assert!(out.contains("const __split$a = 1;"));
    assert!(out.contains("console.log(__split$a);"));
  }

  #[test]
  fn rewires_namespace_access_on_the_donor() {
    let out = inline(
      "import * as split from './split.chunk.js';\nsplit.util();\n",
      "export function util() {}\n",
    );
    assert!(out.contains("function __split$util() {}"));
    assert!(out.contains("__split$util();"));
    assert!(!out.contains("split.util"));
  }

  #[test]
  fn keeps_donor_imports_of_other_sources() {
    let out = inline(
      "import { util } from './split.chunk.js';\nutil();\n",
      "import { render } from 'react-dom';\nexport function util() { render(); }\n",
    );
    assert!(out.contains("import { render as __split$render } from 'react-dom';"));
    assert!(out.contains("function __split$util() { __split$render(); }"));
  }
}
