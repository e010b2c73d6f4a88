#![warn(missing_docs)]

//! # pdfplumb
//!
//! Low-level, random-access machinery for the structural layer of PDF
//! files: the cross-reference chain, the trailer, indirect objects, stream
//! payloads with their filter pipelines, and the Standard Security Handler.
//!
//! This crate is deliberately the *plumbing* layer. It parses byte layout,
//! resolves references, decodes stream filters, and handles passwords; it
//! does not interpret pages, fonts, or content-stream operators — those
//! belong to a document layer built on top.
//!
//! ## Design
//!
//! - **Lazy by construction.** Opening a document reads the header, the
//!   `startxref` pointer, and the newest trailer. Objects are parsed when
//!   looked up; stream payloads are pulled through [`std::io::Read`]
//!   sources; the xref chain is walked on demand. The full file is never
//!   loaded.
//! - **No caches.** Every lookup re-walks the chain. Layers that know their
//!   access patterns add caching where it pays.
//! - **Value-typed objects.** Parsed [`Object`]s are owned snapshots and
//!   never point back into the file, so reference cycles in the document
//!   graph cannot create ownership cycles here.
//!
//! ## Example
//!
//! ```no_run
//! use pdfplumb::{Document, ObjectRef};
//!
//! # fn main() -> pdfplumb::Result<()> {
//! let file = std::fs::File::open("report.pdf")?;
//! let mut doc = Document::open(file)?;
//!
//! let root = doc.trailer().get("Root").cloned().unwrap();
//! let catalog = doc.deref(&root)?;
//! println!("catalog: {:?}", catalog);
//!
//! let page = doc.lookup_object(ObjectRef::new(3, 0))?;
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod decoders;
pub mod document;
pub mod encryption;
pub mod error;
pub mod lexer;
pub mod name;
pub mod object;
pub mod objstm;
pub mod parser;
pub mod stream;
pub mod writer;
pub mod xref;

pub use document::Document;
pub use error::{Error, Result};
pub use name::Name;
pub use object::{Dict, IndirectObject, Object, ObjectRef, Stream};
pub use stream::StreamContent;
pub use xref::{XRef, XRefEntry};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
