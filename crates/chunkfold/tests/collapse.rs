use chunkfold::{Asset, Chunk, CollapseOptions, Collapser, ModuleGraph};
use rustc_hash::FxHashMap;

struct Graph(FxHashMap<&'static str, usize>);

impl ModuleGraph for Graph {
  fn importer_count(&self, file_name: &str) -> usize {
    self.0.get(file_name).copied().unwrap_or(0)
  }
}

fn chunk(name: &str, file_name: &str, is_entry: bool, code: &str) -> Chunk {
  Chunk {
    name: name.to_string(),
    file_name: file_name.to_string(),
    code: code.to_string(),
    is_entry,
    exports: vec![],
    imports: vec![],
  }
}

fn asset<'a>(assets: &'a [Asset], filename: &str) -> &'a Asset {
  assets
    .iter()
    .find(|asset| asset.filename == filename)
    .unwrap_or_else(|| panic!("no asset named {filename}"))
}

fn options() -> CollapseOptions {
  let mut options = CollapseOptions::new("main", "app");
  options.shared_prop = "Shared".to_string();
  options.secondary_props.insert("admin".to_string(), "admin".to_string());
  options
}

#[tokio::test(flavor = "multi_thread")]
async fn shared_helper_is_merged_once_and_exposed_on_the_primary_global() {
  let mut main = chunk(
    "main",
    "main.js",
    true,
    "import { helper } from './shared.chunk.js';\nhelper();\n",
  );
  main.imports = vec!["shared.chunk.js".to_string()];
  let mut admin = chunk(
    "admin",
    "admin.js",
    true,
    "import { helper } from './shared.chunk.js';\nexport function start() { return helper(); }\n",
  );
  admin.exports = vec!["start".to_string()];
  admin.imports = vec!["shared.chunk.js".to_string()];
  let shared = chunk(
    "shared",
    "shared.chunk.js",
    false,
    "export function helper() { return 1; }\nexport const onlyPrimary = 2;\n",
  );

  let graph = Graph(FxHashMap::from_iter([("shared.chunk.js", 2)]));
  let assets = Collapser::new(options())
    .generate(vec![main, admin, shared], &graph)
    .await
    .unwrap();

  assert_eq!(assets.len(), 2);
  let primary = asset(&assets, "main.js");
  assert_eq!(primary.content.matches("function helper").count(), 1);
  assert!(!primary.content.contains("import"));
  assert!(primary.content.starts_with("var app = (function (exports)"));
  assert!(primary.content.contains("const Shared = { helper };"));
  assert!(primary.content.contains("exports.Shared = Shared;"));
  // An export only the primary would use is not needed by anyone here.
  assert!(!primary.content.contains("onlyPrimary:"));

  let satellite = asset(&assets, "admin.js");
  assert!(satellite.content.starts_with("app.admin = (function (exports, { helper })"));
  assert!(satellite.content.contains("return helper();"));
  assert!(satellite.content.trim_end().ends_with("})({}, app.Shared);"));
}

#[tokio::test(flavor = "multi_thread")]
async fn colliding_declarations_get_the_shared_prefix() {
  let mut main = chunk(
    "main",
    "main.js",
    true,
    "import { sharedHelper } from './shared.chunk.js';\nconst helper = 'primary-helper';\nconsole.log(helper, sharedHelper());\n",
  );
  main.imports = vec!["shared.chunk.js".to_string()];
  let mut admin = chunk(
    "admin",
    "admin.js",
    true,
    "import { sharedHelper } from './shared.chunk.js';\nexport const start = () => sharedHelper();\n",
  );
  admin.exports = vec!["start".to_string()];
  admin.imports = vec!["shared.chunk.js".to_string()];
  let shared = chunk(
    "shared",
    "shared.chunk.js",
    false,
    "const helper = 'shared-internal';\nexport function sharedHelper() { return helper; }\n",
  );

  let graph = Graph(FxHashMap::from_iter([("shared.chunk.js", 2)]));
  let assets = Collapser::new(options())
    .generate(vec![main, admin, shared], &graph)
    .await
    .unwrap();

  let primary = asset(&assets, "main.js");
  assert!(primary.content.contains("const helper = 'primary-helper';"));
  assert!(primary.content.contains("const __shared$helper = 'shared-internal';"));
  assert!(primary.content.contains("function sharedHelper() { return __shared$helper; }"));
}

#[tokio::test(flavor = "multi_thread")]
async fn shared_exports_consumed_only_on_the_primary_side_are_not_materialized() {
  let mut main = chunk(
    "main",
    "main.js",
    true,
    "import { helper } from './shared.chunk.js';\nimport { start } from './boot.chunk.js';\nhelper();\nstart();\n",
  );
  main.imports = vec!["shared.chunk.js".to_string(), "boot.chunk.js".to_string()];
  let mut admin = chunk(
    "admin",
    "admin.js",
    true,
    "import { helper } from './shared.chunk.js';\nexport const run = () => helper();\n",
  );
  admin.exports = vec!["run".to_string()];
  admin.imports = vec!["shared.chunk.js".to_string()];
  // Imported only by the primary; its shared import dissolves into a
  // direct reference during inlining.
  let mut boot = chunk(
    "boot",
    "boot.chunk.js",
    false,
    "import { secret } from './shared.chunk.js';\nexport function start() { return secret; }\n",
  );
  boot.imports = vec!["shared.chunk.js".to_string()];
  let shared = chunk(
    "shared",
    "shared.chunk.js",
    false,
    "export function helper() { return 1; }\nexport const secret = 2;\n",
  );

  let graph = Graph(FxHashMap::from_iter([
    ("shared.chunk.js", 3),
    ("boot.chunk.js", 1),
  ]));
  let assets = Collapser::new(options())
    .generate(vec![main, admin, boot, shared], &graph)
    .await
    .unwrap();

  let primary = asset(&assets, "main.js");
  assert!(primary.content.contains("const Shared = { helper };"));
  assert!(primary.content.contains("const secret = 2;"));
  assert!(primary.content.contains("return secret;"));
}

#[tokio::test(flavor = "multi_thread")]
async fn unshared_locales_are_duplicated_per_entry() {
  let mut main = chunk(
    "main",
    "main.js",
    true,
    "import { text } from './locale_en.chunk.js';\nconsole.log(text);\n",
  );
  main.imports = vec!["locale_en.chunk.js".to_string()];
  let mut admin = chunk(
    "admin",
    "admin.js",
    true,
    "import { text } from './locale_fr.chunk.js';\nconsole.log(text);\n",
  );
  admin.imports = vec!["locale_fr.chunk.js".to_string()];
  let locale_en = chunk(
    "locale_en",
    "locale_en.chunk.js",
    false,
    "export const text = 'hello';\n",
  );
  let locale_fr = chunk(
    "locale_fr",
    "locale_fr.chunk.js",
    false,
    "export const text = 'bonjour';\n",
  );

  let graph = Graph(FxHashMap::from_iter([
    ("locale_en.chunk.js", 1),
    ("locale_fr.chunk.js", 1),
  ]));
  let mut options = options();
  options.unshared = std::sync::Arc::new(|file_name| file_name.starts_with("locale"));
  let assets = Collapser::new(options)
    .generate(vec![main, admin, locale_en, locale_fr], &graph)
    .await
    .unwrap();

  // Inlined chunks are not emitted.
  assert_eq!(assets.len(), 2);
  let primary = asset(&assets, "main.js");
  assert!(primary.content.contains("'hello'"));
  assert!(!primary.content.contains("'bonjour'"));
  assert!(primary.content.contains("__locale_en$text"));
  let satellite = asset(&assets, "admin.js");
  assert!(satellite.content.contains("'bonjour'"));
  assert!(!satellite.content.contains("'hello'"));
}

#[tokio::test(flavor = "multi_thread")]
async fn shared_state_parameter_stays_last() {
  let mut main = chunk("main", "main.js", true, "export const boot = 1;\n");
  main.exports = vec!["boot".to_string()];
  let mut admin = chunk(
    "admin",
    "admin.js",
    true,
    "import { render } from 'react-dom';\nimport { helper } from './shared.chunk.js';\nexport function start() { render(helper()); }\n",
  );
  admin.exports = vec!["start".to_string()];
  admin.imports = vec!["shared.chunk.js".to_string()];
  let shared = chunk(
    "shared",
    "shared.chunk.js",
    false,
    "export function helper() { return 1; }\n",
  );

  let graph = Graph(FxHashMap::from_iter([("shared.chunk.js", 2)]));
  let mut options = options();
  options
    .globals
    .insert("react-dom".to_string(), "ReactDOM".to_string());
  let assets = Collapser::new(options)
    .generate(vec![main, admin, shared], &graph)
    .await
    .unwrap();

  let satellite = asset(&assets, "admin.js");
  assert!(satellite
    .content
    .starts_with("app.admin = (function (exports, react_dom, { helper })"));
  assert!(satellite.content.trim_end().ends_with("})({}, ReactDOM, app.Shared);"));
}

#[tokio::test(flavor = "multi_thread")]
async fn configuration_errors_are_user_facing() {
  let graph = Graph(FxHashMap::default());

  let err = Collapser::new(CollapseOptions::new("nope", "app"))
    .generate(vec![chunk("main", "main.js", true, "")], &graph)
    .await
    .unwrap_err();
  assert!(err.to_string().contains("\"nope\""));
  assert!(err.to_string().contains("\"main\""));

  let mut admin = chunk("admin", "admin.js", true, "export const a = 1;\n");
  admin.exports = vec!["a".to_string()];
  let err = Collapser::new(CollapseOptions::new("main", "app"))
    .generate(vec![chunk("main", "main.js", true, ""), admin], &graph)
    .await
    .unwrap_err();
  assert!(err.to_string().contains("\"admin\""));
}
