use chunkfold_common::{ImportKind, ImportRecord, TextEdits};
use chunkfold_compiler::Compiler;
use chunkfold_swc_visitors::{
  collect_param_member_uses, collect_rename_edits, find_wrapper, resolve, ExportFacts, Renames,
};
use hashlink::LinkedHashMap;
use rustc_hash::FxHashMap;
use swc_core::{
  common::Mark,
  ecma::atoms::JsWord,
};

use crate::{
  analyze, deconflict, is_ident_key, make_legal, BuildError, BuildResult, Chunk, ChunkIdentity,
};

/// How a wrapped chunk attaches to the page's global scope.
#[derive(Debug, Clone)]
pub(crate) enum GlobalBinding {
  /// `var <name> = (function (…) {…})(…);`
  Global(String),
  /// `<global>.<prop> = (function (…) {…})(…);`
  Property { global: String, prop: String },
  /// Bare invocation; the chunk has nothing to expose.
  None,
}

pub(crate) struct WrapConfig<'a> {
  pub binding: GlobalBinding,
  pub globals: &'a FxHashMap<String, String>,
  pub skip_require_globals: bool,
  /// Identity of the merged shared chunk and the dotted path its
  /// materialized object lives at, e.g. `app.__shared__`.
  pub shared: Option<(ChunkIdentity, String)>,
}

/// Converts one finalized chunk into a self-contained IIFE script.
///
/// Every remaining module-level import becomes a call parameter fed by a
/// configured global (or, for the merged shared chunk, the dotted path to
/// the primary's shared object); exports become assignments on a
/// conventional `exports` object. The shared-state parameter is always
/// last, then dissolved back into the original imported names by
/// [`recover_destructuring`]. Must run under the pass's swc `GLOBALS`.
pub(crate) fn wrap_chunk(compiler: &Compiler, chunk: &Chunk, config: &WrapConfig) -> BuildResult<String> {
  let analysis = analyze(compiler, &chunk.code, &chunk.file_name)?;
  let bound = analysis.facts.bound_names();
  let mut edits = TextEdits::new();
  let mut renames = Renames::default();

  for import in &analysis.facts.imports {
    edits.remove(import.range.clone());
  }

  // Exports become `exports.<name> = <local>;` assignments in the wrapper
  // epilogue.
  let default_local = deconflict("__default_export__", |c| bound.contains(&JsWord::from(c)));
  let mut export_table = LinkedHashMap::<JsWord, String>::new();
  let mut synthetic_imports = Vec::<ImportRecord>::new();
  for export in &analysis.facts.exports {
    match export {
      ExportFacts::Decl {
        export_kw_range,
        records,
        ..
      } => {
        edits.remove(export_kw_range.clone());
        for record in records {
          export_table.insert(record.exported_name.clone(), record.local_name.to_string());
        }
      }
      ExportFacts::Named {
        source: None,
        stmt_range,
        specifiers,
      } => {
        edits.remove(stmt_range.clone());
        for spec in specifiers {
          export_table.insert(spec.record.exported_name.clone(), spec.record.local_name.to_string());
        }
      }
      ExportFacts::Named {
        source: Some(source),
        stmt_range,
        specifiers,
      } => {
        // Re-exports turn into an import binding fed through a parameter
        // plus a plain exports assignment.
        edits.remove(stmt_range.clone());
        for spec in specifiers {
          if spec.is_namespace {
            tracing::warn!(
              "dropping `export * as {}` from \"{}\"; namespaces cannot cross a script boundary",
              spec.record.exported_name,
              chunk.file_name
            );
            continue;
          }
          synthetic_imports.push(ImportRecord {
            source: source.clone(),
            kind: ImportKind::Named,
            local: spec.record.exported_name.clone(),
            imported: Some(spec.record.local_name.clone()),
          });
          export_table.insert(
            spec.record.exported_name.clone(),
            spec.record.exported_name.to_string(),
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
          export_table.insert("default".into(), local.to_string());
        }
        None => {
          edits.replace(default_kw_range.clone(), format!("const {default_local} = "));
          edits.insert(stmt_range.end, ";");
          export_table.insert("default".into(), default_local.clone());
        }
      },
      ExportFacts::DefaultExpr {
        default_kw_range, ..
      } => {
        edits.replace(default_kw_range.clone(), format!("var {default_local} = "));
        export_table.insert("default".into(), default_local.clone());
      }
      ExportFacts::All { stmt_range, source } => {
        tracing::warn!(
          "dropping `export * from '{}'` from \"{}\"; star re-exports cannot cross a script boundary",
          source,
          chunk.file_name
        );
        edits.remove(stmt_range.clone());
      }
    }
  }

  // Group import bindings by source, in first-appearance order; each
  // source becomes one parameter. The shared chunk's parameter goes last.
  let mut by_source = LinkedHashMap::<JsWord, Vec<ImportRecord>>::new();
  for import in &analysis.facts.imports {
    let records = by_source.entry(import.source.clone()).or_insert_with(Vec::new);
    records.extend(import.specifiers.iter().map(|spec| spec.record.clone()));
  }
  for record in synthetic_imports {
    by_source
      .entry(record.source.clone())
      .or_insert_with(Vec::new)
      .push(record);
  }

  let mut params: Vec<String> = vec![];
  let mut args = vec![];
  let mut taken_params = Vec::<String>::new();
  let mut shared_param: Option<String> = None;
  let mut shared_mapping = LinkedHashMap::<JsWord, JsWord>::new();
  let mut recover = false;

  for (source, records) in by_source.iter() {
    let shared_path = config
      .shared
      .as_ref()
      .and_then(|(identity, path)| identity.matches(source).then_some(path.as_str()));
    if records.is_empty() && shared_path.is_none() {
      // A side-effect import of an external script; the host page loads it
      // on its own.
      tracing::debug!(
        "dropping side-effect import of '{}' from \"{}\"",
        source,
        chunk.file_name
      );
      continue;
    }

    // A namespace import may keep the incoming object whole. A default
    // import may not when the object is the materialized shared one: its
    // `default` property is the value the local must resolve to.
    let sole_object_binding = records.len() == 1
      && match records[0].kind {
        ImportKind::Namespace => true,
        ImportKind::Default => shared_path.is_none(),
        ImportKind::Named => false,
      };
    let param = if sole_object_binding {
      records[0].local.to_string()
    } else {
      let param = deconflict(&make_legal(source), |c| {
        bound.contains(&JsWord::from(c)) || taken_params.iter().any(|p| p == c)
      });
      for record in records {
        match record.kind {
          ImportKind::Namespace => {
            renames.insert(record.local.clone(), param.clone());
          }
          _ => {
            let imported = record.imported_name();
            let access = if is_ident_key(&imported) {
              format!("{param}.{imported}")
            } else {
              format!("{param}['{imported}']")
            };
            renames.insert(record.local.clone(), access);
          }
        }
      }
      param
    };
    taken_params.push(param.clone());

    if let Some(path) = shared_path {
      shared_param = Some(param);
      // Original import specifiers, kept so recovery can restore the
      // destructured names.
      for record in records {
        match record.kind {
          ImportKind::Namespace => {}
          _ => {
            shared_mapping.insert(record.imported_name(), record.local.clone());
          }
        }
      }
      recover = !(records.len() == 1 && matches!(records[0].kind, ImportKind::Namespace));
      args.push(path.to_string());
    } else {
      let arg = match config.globals.get(source.as_ref()) {
        Some(global) => global.clone(),
        None if config.skip_require_globals => make_legal(source),
        None => {
          return Err(BuildError::missing_global_name(
            source.to_string(),
            chunk.file_name.clone(),
          ))
        }
      };
      args.push(arg);
    }
  }

  // Shared state is by convention the final parameter.
  let shared_index = shared_param
    .as_ref()
    .and_then(|param| taken_params.iter().position(|p| p == param));
  if let Some(index) = shared_index {
    let param = taken_params.remove(index);
    let arg = args.remove(index);
    taken_params.push(param);
    args.push(arg);
  }

  collect_rename_edits(
    &analysis.module,
    analysis.base,
    analysis.top_level_ctxt,
    &renames,
    &mut edits,
  );
  let body = edits.apply(&chunk.code)?;

  let exports_name = deconflict("exports", |c| {
    bound.contains(&JsWord::from(c)) || taken_params.iter().any(|p| p == c)
  });
  let has_exports = !export_table.is_empty();
  if has_exports {
    taken_params.insert(0, exports_name.clone());
    args.insert(0, "{}".to_string());
  }

  let mut epilogue = String::new();
  for (exported, local) in export_table.iter() {
    // An exported import binding no longer exists as a local; it resolves
    // through the same parameter access as its in-body uses.
    let value = renames
      .get(&JsWord::from(local.as_str()))
      .cloned()
      .unwrap_or_else(|| local.clone());
    if is_ident_key(exported) {
      epilogue.push_str(&format!("{exports_name}.{exported} = {value};\n"));
    } else {
      epilogue.push_str(&format!("{exports_name}['{exported}'] = {value};\n"));
    }
  }
  if has_exports {
    epilogue.push_str(&format!("return {exports_name};\n"));
  }

  let fn_text = format!(
    "(function ({}) {{\n'use strict';\n{}\n{}}})({});",
    taken_params.join(", "),
    body.trim_end(),
    epilogue,
    args.join(", ")
  );
  let wrapped = match &config.binding {
    GlobalBinding::Global(name) => format!("var {name} = {fn_text}\n"),
    GlobalBinding::Property { global, prop } => format!("{global}.{prop} = {fn_text}\n"),
    GlobalBinding::None => format!("{fn_text}\n"),
  };

  match (shared_param, recover) {
    (Some(param), true) => {
      recover_destructuring(compiler, &chunk.file_name, &wrapped, &param, &shared_mapping)
    }
    _ => Ok(wrapped),
  }
}

/// Replaces the wrapper's final (shared-state) parameter with a
/// destructuring pattern of the originally imported names and rewrites its
/// member accesses to those names. A strict-mode directive cannot coexist
/// with a destructuring parameter, so it is removed.
fn recover_destructuring(
  compiler: &Compiler,
  file_name: &str,
  wrapped: &str,
  shared_param: &str,
  mapping: &LinkedHashMap<JsWord, JsWord>,
) -> BuildResult<String> {
  let mut parsed = compiler
    .parse(wrapped.to_string(), file_name)
    .map_err(|detail| BuildError::parse_failed(file_name.to_string(), detail))?;
  let unresolved_mark = Mark::new();
  let top_level_mark = Mark::new();
  resolve(&mut parsed.module, unresolved_mark, top_level_mark);
  let base = parsed.file.start_pos;

  let facts = match find_wrapper(&parsed.module, base) {
    Some(facts) => facts,
    None => {
      return Err(
        chunkfold_error::format_err!("no wrapper function found in \"{file_name}\"").into(),
      )
    }
  };
  let last = match facts.params.last() {
    Some(last) => last,
    None => return Ok(wrapped.to_string()),
  };
  if last.sym.as_deref() != Some(shared_param) {
    return Err(
      chunkfold_error::format_err!(
        "wrapper of \"{file_name}\" does not keep its shared-state parameter last"
      )
      .into(),
    );
  }

  let uses = collect_param_member_uses(
    &parsed.module,
    base,
    &(JsWord::from(shared_param), last.ctxt),
  );
  if uses.has_dynamic_use {
    tracing::warn!(
      "shared-state parameter of \"{}\" escapes member access; keeping it opaque",
      file_name
    );
    return Ok(wrapped.to_string());
  }

  // A side-effect-only import leaves no specifiers to restore; fall back
  // to the accessed property names themselves.
  let mut mapping = mapping.clone();
  for member_use in &uses.uses {
    if !mapping.contains_key(&member_use.prop) {
      mapping.insert(member_use.prop.clone(), member_use.prop.clone());
    }
  }
  if mapping.is_empty() {
    return Ok(wrapped.to_string());
  }

  let pattern = mapping
    .iter()
    .map(|(imported, local)| {
      if imported == local && is_ident_key(imported) {
        local.to_string()
      } else if is_ident_key(imported) {
        format!("{imported}: {local}")
      } else {
        format!("'{imported}': {local}")
      }
    })
    .collect::<Vec<_>>()
    .join(", ");

  let mut edits = TextEdits::new();
  edits.replace(last.range.clone(), format!("{{ {pattern} }}"));
  for member_use in &uses.uses {
    let local = mapping
      .get(&member_use.prop)
      .cloned()
      .unwrap_or_else(|| member_use.prop.clone());
    edits.replace(member_use.range.clone(), local.to_string());
  }
  if let Some(directive) = facts.directive_range {
    edits.remove(directive);
  }
  Ok(edits.apply(wrapped)?)
}
