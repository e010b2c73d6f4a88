//! Re-serialization of objects and cross-reference tables.
//!
//! The writer is independent of the reading path: it consumes the object
//! model and emits canonical PDF text. Dictionary keys keep their insertion
//! order; strings pick literal or hex form by content; xref tables are
//! emitted as one subsection per contiguous run of object numbers.

mod serializer;
mod xref;

pub use serializer::{write_indirect_object, write_object, write_stream};
pub use xref::{write_trailer, write_xref_table};
