use std::ops::Range;

use swc_core::common::{BytePos, Span};

mod ext;
pub use ext::*;
mod extract;
pub use extract::*;
mod resolve;
pub use resolve::*;
mod rewrite;
pub use rewrite::*;
mod destructure;
pub use destructure::*;

/// Byte range of `span` within the original text of the file that starts at
/// `base`. All edits computed by this crate are expressed in these ranges.
pub fn range_of(span: Span, base: BytePos) -> Range<usize> {
  (span.lo.0 - base.0) as usize..(span.hi.0 - base.0) as usize
}
