use chunkfold_common::{ImportKind, ImportRecord, NeededExports, TextEdits};
use chunkfold_compiler::Compiler;
use chunkfold_swc_visitors::{
  collect_member_edits, collect_rename_edits, ExportFacts, MemberTargets, NamedExportSpec, Renames,
};
use hashlink::LinkedHashMap;
use once_cell::sync::Lazy;
use rustc_hash::{FxHashMap, FxHashSet};
use swc_core::ecma::atoms::JsWord;

use crate::{
  analyze, deconflict, is_external_source, make_legal, shared_alias, BuildResult, Chunk,
  ChunkIdentity,
};

/// What the rest of the pipeline needs to know about a completed
/// shared-into-primary merge.
pub(crate) struct SharedMerge {
  pub identity: ChunkIdentity,
  /// Shared chunk's exported name to its final local name in the merged
  /// primary text, in export order.
  pub export_to_local: LinkedHashMap<JsWord, String>,
}

/// Inlines `shared` into `primary`, leaving `primary.code` as
/// stripped shared body + rewritten primary body + the materialized shared
/// object and its export. Must run under the pass's swc `GLOBALS`.
pub(crate) fn merge_shared_into_primary(
  compiler: &Compiler,
  primary: &mut Chunk,
  shared: &Chunk,
  needed_exports: &NeededExports,
  shared_prop: &str,
) -> BuildResult<SharedMerge> {
  let shared_analysis = analyze(compiler, &shared.code, &shared.file_name)?;
  let primary_analysis = analyze(compiler, &primary.code, &primary.file_name)?;
  let shared_bound = shared_analysis.facts.bound_names();

  let mut primary_edits = TextEdits::new();
  let mut primary_renames = Renames::default();
  let mut removed_primary_locals = FxHashSet::<JsWord>::default();

  // 1. Shared code lands first in the output, so its externally-sourced
  // imports are authoritative. The primary's duplicates are removed and its
  // references follow the shared chunk's local alias.
  let mut shared_external = FxHashMap::<(JsWord, JsWord), JsWord>::default();
  for import in &shared_analysis.facts.imports {
    if !is_external_source(&import.source) {
      continue;
    }
    for spec in &import.specifiers {
      shared_external.insert(
        (import.source.clone(), spec.record.imported_name()),
        spec.record.local.clone(),
      );
    }
  }
  for import in &primary_analysis.facts.imports {
    if !is_external_source(&import.source) {
      continue;
    }
    let (dupes, kept): (Vec<_>, Vec<_>) = import.specifiers.iter().partition(|spec| {
      shared_external.contains_key(&(import.source.clone(), spec.record.imported_name()))
    });
    if dupes.is_empty() {
      continue;
    }
    for spec in &dupes {
      let shared_local =
        &shared_external[&(import.source.clone(), spec.record.imported_name())];
      removed_primary_locals.insert(spec.record.local.clone());
      if *shared_local != spec.record.local {
        primary_renames.insert(spec.record.local.clone(), shared_local.to_string());
      }
    }
    if kept.is_empty() {
      primary_edits.remove(import.range.clone());
    } else {
      let records = kept.iter().map(|spec| spec.record.clone()).collect::<Vec<_>>();
      primary_edits.replace(import.range.clone(), render_import(&records, &import.source));
    }
  }

  // 2. Collisions between what the deduplicated primary still binds and
  // everything the shared chunk binds. Bindings introduced by the
  // primary's imports of the shared chunk itself do not count; step 4
  // removes them.
  let identity = ChunkIdentity::new(&shared.name, &shared.file_name);
  let mut primary_bound = primary_analysis.facts.bound_names();
  for local in &removed_primary_locals {
    primary_bound.remove(local);
  }
  for import in &primary_analysis.facts.imports {
    if identity.matches(&import.source) {
      for spec in &import.specifiers {
        primary_bound.remove(&spec.record.local);
      }
    }
  }
  let mut shared_renames = Renames::default();
  for name in &shared_bound {
    if primary_bound.contains(name) {
      shared_renames.insert(name.clone(), shared_alias(name));
    }
  }
  // A step-1 rename may point at a shared local that itself just got
  // renamed; follow it.
  for target in primary_renames.values_mut() {
    if let Some(renamed) = shared_renames.get(&JsWord::from(target.as_str())) {
      *target = renamed.clone();
    }
  }
  let renamed =
    |name: &JsWord| -> String { shared_renames.get(name).cloned().unwrap_or_else(|| name.to_string()) };

  // 3. Strip the shared chunk's own export syntax, recording the
  // export-to-local table as we go.
  let default_local = deconflict("__shared_default__", |candidate| {
    let candidate = JsWord::from(candidate);
    primary_bound.contains(&candidate) || shared_bound.contains(&candidate)
  });
  let mut shared_edits = TextEdits::new();
  let export_to_local = strip_export_syntax(
    &shared_analysis.facts,
    &renamed,
    &default_local,
    &shared.file_name,
    &mut shared_edits,
  );

  collect_rename_edits(
    &shared_analysis.module,
    shared_analysis.base,
    shared_analysis.top_level_ctxt,
    &shared_renames,
    &mut shared_edits,
  );
  let shared_body = shared_edits.apply(&shared.code)?;

  // 4. The primary no longer imports the shared chunk; every reference
  // resolves through the export-to-local table instead.
  let mut member_targets = MemberTargets::default();
  rewire_imports_of(
    &primary_analysis.facts,
    &identity,
    &export_to_local,
    &shared.file_name,
    &mut primary_renames,
    &mut member_targets,
    &mut primary_edits,
  );
  rewire_reexports_of(
    &primary_analysis.facts,
    &identity,
    &export_to_local,
    &shared.file_name,
    &mut primary_edits,
  );

  collect_rename_edits(
    &primary_analysis.module,
    primary_analysis.base,
    primary_analysis.top_level_ctxt,
    &primary_renames,
    &mut primary_edits,
  );
  collect_member_edits(
    &primary_analysis.module,
    primary_analysis.base,
    primary_analysis.top_level_ctxt,
    &member_targets,
    &mut primary_edits,
  );
  let primary_body = primary_edits.apply(&primary.code)?;

  // 5. Materialize the shared object, restricted to what satellites
  // actually import.
  let shared_ident = deconflict(&make_legal(shared_prop), |candidate| {
    let word = JsWord::from(candidate);
    primary_bound.contains(&word)
      || shared_bound.contains(&word)
      || candidate == default_local
      || shared_renames.values().any(|v| v == candidate)
      || primary_renames.values().any(|v| v == candidate)
  });
  let mut props = vec![];
  for (exported, local) in export_to_local.iter() {
    if !needed_exports.contains(exported) {
      continue;
    }
    let prop = if is_ident_key(exported) {
      if exported.as_ref() == local.as_str() {
        local.clone()
      } else {
        format!("{exported}: {local}")
      }
    } else {
      format!("'{exported}': {local}")
    };
    props.push(prop);
  }
  let object_decl = format!("const {shared_ident} = {{ {} }};", props.join(", "));
  let object_export = if shared_ident == shared_prop {
    format!("export {{ {shared_ident} }};")
  } else {
    format!("export {{ {shared_ident} as {shared_prop} }};")
  };

  // 6. Shared body first, so its bindings exist before primary code runs.
  let mut merged = String::with_capacity(
    shared_body.len() + primary_body.len() + object_decl.len() + object_export.len() + 4,
  );
  merged.push_str(shared_body.trim_end());
  merged.push('\n');
  merged.push_str(primary_body.trim_end());
  merged.push('\n');
  merged.push_str(&object_decl);
  merged.push('\n');
  merged.push_str(&object_export);
  merged.push('\n');
  primary.code = merged;

  Ok(SharedMerge {
    identity,
    export_to_local,
  })
}

/// Removes an importer's import statements of a now-inlined donor chunk and
/// records how their bindings resolve instead: named and default locals
/// through the rename map, namespace locals through member-access targets.
pub(crate) fn rewire_imports_of(
  facts: &chunkfold_swc_visitors::ModuleFacts,
  identity: &ChunkIdentity,
  table: &LinkedHashMap<JsWord, String>,
  donor_file_name: &str,
  renames: &mut Renames,
  member_targets: &mut MemberTargets,
  edits: &mut TextEdits,
) {
  for import in &facts.imports {
    if !identity.matches(&import.source) {
      continue;
    }
    edits.remove(import.range.clone());
    for spec in &import.specifiers {
      match spec.record.kind {
        ImportKind::Named | ImportKind::Default => {
          let imported = spec.record.imported_name();
          let resolved = table.get(&imported).cloned().unwrap_or_else(|| {
            tracing::warn!(
              "import of \"{}\" does not match any export of \"{}\"",
              imported,
              donor_file_name
            );
            imported.to_string()
          });
          if resolved != spec.record.local.as_ref() {
            renames.insert(spec.record.local.clone(), resolved);
          }
        }
        ImportKind::Namespace => {
          let props = table
            .iter()
            .map(|(exported, local)| (exported.clone(), local.clone()))
            .collect::<FxHashMap<_, _>>();
          member_targets.insert(spec.record.local.clone(), props);
        }
      }
    }
  }
}

/// Turns `export { a as b } from <donor>` clauses into plain export lists
/// over the donor's now-local bindings.
pub(crate) fn rewire_reexports_of(
  facts: &chunkfold_swc_visitors::ModuleFacts,
  identity: &ChunkIdentity,
  table: &LinkedHashMap<JsWord, String>,
  donor_file_name: &str,
  edits: &mut TextEdits,
) {
  for export in &facts.exports {
    match export {
      ExportFacts::Named {
        source: Some(source),
        stmt_range,
        specifiers,
      } if identity.matches(source) => {
        let mut items = vec![];
        for spec in specifiers {
          if spec.is_namespace {
            tracing::warn!(
              "dropping `export * as {}` of inlined chunk \"{}\"",
              spec.record.exported_name,
              donor_file_name
            );
            continue;
          }
          let resolved = table
            .get(&spec.record.local_name)
            .cloned()
            .unwrap_or_else(|| spec.record.local_name.to_string());
          let exported = &spec.record.exported_name;
          if resolved == exported.as_ref() {
            items.push(resolved);
          } else if is_ident_key(exported) {
            items.push(format!("{} as {}", resolved, exported));
          } else {
            items.push(format!("{} as \"{}\"", resolved, exported));
          }
        }
        if items.is_empty() {
          edits.remove(stmt_range.clone());
        } else {
          edits.replace(stmt_range.clone(), format!("export {{ {} }};", items.join(", ")));
        }
      }
      ExportFacts::All { stmt_range, source } if identity.matches(source) => {
        tracing::warn!(
          "dropping `export * from '{}'`; the inlined chunk is no longer importable",
          source
        );
        edits.remove(stmt_range.clone());
      }
      _ => {}
    }
  }
}

/// Strips a donor chunk's export syntax in place and returns its
/// export-to-local table, with locals already run through `rename`.
/// `export const x` loses the keyword, `export default <expr>` becomes a
/// plain declaration of `default_local`, bare specifier lists are deleted,
/// and re-exports become plain imports so the merged scope gains a binding.
pub(crate) fn strip_export_syntax(
  facts: &chunkfold_swc_visitors::ModuleFacts,
  rename: &dyn Fn(&JsWord) -> String,
  default_local: &str,
  file_name: &str,
  edits: &mut TextEdits,
) -> LinkedHashMap<JsWord, String> {
  let mut export_to_local = LinkedHashMap::<JsWord, String>::new();

  for export in &facts.exports {
    match export {
      ExportFacts::Decl {
        export_kw_range,
        records,
        ..
      } => {
        edits.remove(export_kw_range.clone());
        for record in records {
          export_to_local.insert(record.exported_name.clone(), rename(&record.local_name));
        }
      }
      ExportFacts::Named {
        source: None,
        stmt_range,
        specifiers,
      } => {
        // The bindings already exist as plain declarations.
        edits.remove(stmt_range.clone());
        for spec in specifiers {
          export_to_local.insert(spec.record.exported_name.clone(), rename(&spec.record.local_name));
        }
      }
      ExportFacts::Named {
        source: Some(source),
        stmt_range,
        specifiers,
      } => {
        // Re-exports have no local binding yet; import them so the merged
        // scope gains one.
        edits.replace(stmt_range.clone(), render_reexport_import(specifiers, source, rename));
        for spec in specifiers {
          export_to_local.insert(
            spec.record.exported_name.clone(),
            rename(&spec.record.exported_name),
          );
        }
      }
      ExportFacts::DefaultDecl {
        stmt_range,
        default_kw_range,
        local,
      } => match local {
        Some(local) => {
          edits.remove(default_kw_range.clone());
          export_to_local.insert("default".into(), rename(local));
        }
        None => {
          edits.replace(default_kw_range.clone(), format!("const {default_local} = "));
          edits.insert(stmt_range.end, ";");
          export_to_local.insert("default".into(), default_local.to_string());
        }
      },
      ExportFacts::DefaultExpr {
        default_kw_range, ..
      } => {
        edits.replace(default_kw_range.clone(), format!("var {default_local} = "));
        export_to_local.insert("default".into(), default_local.to_string());
      }
      ExportFacts::All { stmt_range, source } => {
        tracing::warn!(
          "dropping `export * from '{}'` while merging \"{}\"; star re-exports cannot be materialized",
          source,
          file_name
        );
        edits.remove(stmt_range.clone());
      }
    }
  }

  export_to_local
}

static IDENT_KEY: Lazy<regex::Regex> =
  Lazy::new(|| regex::Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap());

pub(crate) fn is_ident_key(key: &str) -> bool {
  IDENT_KEY.is_match(key)
}

/// Renders an import statement from records, preserving specifier kinds.
pub(crate) fn render_import(records: &[ImportRecord], source: &JsWord) -> String {
  let mut default = None;
  let mut namespace = None;
  let mut named = vec![];
  for record in records {
    match record.kind {
      ImportKind::Default => default = Some(record.local.to_string()),
      ImportKind::Namespace => namespace = Some(record.local.to_string()),
      ImportKind::Named => {
        let imported = record.imported_name();
        if imported == record.local {
          named.push(record.local.to_string());
        } else if is_ident_key(&imported) {
          named.push(format!("{} as {}", imported, record.local));
        } else {
          named.push(format!("\"{}\" as {}", imported, record.local));
        }
      }
    }
  }
  let mut clauses = vec![];
  if let Some(default) = default {
    clauses.push(default);
  }
  if let Some(namespace) = namespace {
    clauses.push(format!("* as {namespace}"));
  }
  if !named.is_empty() {
    clauses.push(format!("{{ {} }}", named.join(", ")));
  }
  format!("import {} from '{}';", clauses.join(", "), source)
}

fn render_reexport_import(
  specifiers: &[NamedExportSpec],
  source: &JsWord,
  rename: &dyn Fn(&JsWord) -> String,
) -> String {
  let mut statements = vec![];
  let mut named = vec![];
  for spec in specifiers {
    let local = rename(&spec.record.exported_name);
    if spec.is_namespace {
      statements.push(format!("import * as {local} from '{source}';"));
    } else if spec.record.local_name.as_ref() == local {
      named.push(local);
    } else if is_ident_key(&spec.record.local_name) {
      named.push(format!("{} as {}", spec.record.local_name, local));
    } else {
      named.push(format!("\"{}\" as {}", spec.record.local_name, local));
    }
  }
  if !named.is_empty() {
    statements.push(format!("import {{ {} }} from '{}';", named.join(", "), source));
  }
  statements.join("\n")
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

  fn merge(primary_code: &str, shared_code: &str, needed: &[&str]) -> String {
    GLOBALS.set(&Default::default(), || {
      let compiler = Compiler::new();
      let mut primary = chunk("main", "main.js", primary_code);
      primary.is_entry = true;
      let shared = chunk("shared", "shared.chunk.js", shared_code);
      let needed = needed.iter().map(|n| JsWord::from(*n)).collect::<NeededExports>();
      merge_shared_into_primary(&compiler, &mut primary, &shared, &needed, "Shared").unwrap();
      primary.code
    })
  }

  #[test]
  fn merges_shared_exports_and_materializes_needed_subset() {
    let out = merge(
      "import { helper } from './shared.chunk.js';\nhelper();\n",
      "export function helper() { return 1; }\nexport const unused = 2;\n",
      &["helper"],
    );
    assert_eq!(out.matches("function helper").count(), 1);
    assert!(!out.contains("import"));
    assert!(out.contains("const Shared = { helper };"));
    assert!(out.contains("export { Shared };"));
    assert!(!out.contains("unused:"));
  }

  #[test]
  fn resolves_declaration_collisions_with_the_shared_prefix() {
    let out = merge(
      "import { sharedHelper } from './shared.chunk.js';\nconst helper = 'primary-helper';\nconsole.log(helper, sharedHelper());\n",
      "const helper = 'shared-internal';\nexport function sharedHelper() { return helper; }\n",
      &["sharedHelper"],
    );
    assert!(out.contains("const helper = 'primary-helper';"));
    assert!(out.contains("const __shared$helper = 'shared-internal';"));
    assert!(out.contains("function sharedHelper() { return __shared$helper; }"));
  }

  #[test]
  fn dedupes_external_imports_in_favor_of_the_shared_copy() {
    let out = merge(
      "import { render as mount } from 'react-dom';\nimport { helper } from './shared.chunk.js';\nmount(helper);\n",
      "import { render } from 'react-dom';\nexport function helper() { render(); }\n",
      &["helper"],
    );
    assert_eq!(out.matches("from 'react-dom'").count(), 1);
    assert!(out.contains("import { render } from 'react-dom';"));
    assert!(out.contains("render(helper)"));
  }

  #[test]
  fn rewrites_namespace_access_and_default_import_of_shared() {
    let out = merge(
      "import def, * as shared from './shared.chunk.js';\nconsole.log(shared.helper(), def);\n",
      "export function helper() { return 1; }\nexport default 42;\n",
      &["helper"],
    );
    assert!(out.contains("var __shared_default__ = 42;"));
    assert!(out.contains("console.log(helper(), __shared_default__);"));
  }

  #[test]
  fn reexport_from_shared_becomes_a_plain_export_list() {
    let out = merge(
      "export { helper as publicHelper } from './shared.chunk.js';\n",
      "export function helper() { return 1; }\n",
      &["helper"],
    );
    assert!(out.contains("export { helper as publicHelper };"));
    assert!(!out.contains("from './shared.chunk.js'"));
  }
}
