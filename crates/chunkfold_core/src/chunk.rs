/// One code-split output chunk of the upstream build, as handed to the
/// collapse pass. `code` is the chunk's emitted module source.
#[derive(Debug, Clone)]
pub struct Chunk {
  /// The chunk's logical name, e.g. `"vendors"` or `"main"`.
  pub name: String,
  /// The emitted file name, e.g. `"vendors.chunk.js"`.
  pub file_name: String,
  pub code: String,
  pub is_entry: bool,
  /// Names this chunk exports, in emission order.
  pub exports: Vec<String>,
  /// File names of chunks this chunk imports from.
  pub imports: Vec<String>,
}

/// The upstream build's module graph, consulted during classification.
/// Implementations only need to answer questions about chunk file names.
pub trait ModuleGraph: Send + Sync {
  /// Number of distinct chunks that import the given chunk.
  fn importer_count(&self, file_name: &str) -> usize;
}

/// A finished output file.
#[derive(Debug)]
pub struct Asset {
  pub filename: String,
  pub content: String,
}
