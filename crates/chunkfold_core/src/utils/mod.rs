mod name_helpers;
pub use name_helpers::*;
mod chunk_identity;
pub use chunk_identity::*;
