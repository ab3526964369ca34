//!
//! # Gds21 Integrated Circuit Layout Parser & Writer
//!
//! GDSII is the IC industry's de facto standard for storing and sharing layout data.
//! Gds21 reads and writes GDSII stream data, and keeps it in memory on GDSII's own terms:
//! its idioms, its naming conventions, and its (occasionally odd) numeric formats.
//! Higher-level manipulation, such as merging libraries, is left to its users.
//!
//! Layout data is represented in three forms:
//!
//! * A short tree:
//!   * The root is a [GdsLibrary], a set of cell definitions ([GdsStruct]s) plus library metadata.
//!     A library cannot refer to cells defined outside itself.
//!     On disk each [GdsLibrary] is typically one `.gds` file.
//!   * Each [GdsStruct] is an ordered list of [GdsElement]s: polygons ([GdsBoundary]),
//!     instances of other cells ([GdsStructRef], [GdsArrayRef]), text ([GdsTextElem]),
//!     and a few other geometric elements.
//! * For storage, the tree is flattened to a series of [GdsRecord]s,
//!   marking the beginning, end, and content of each tree-node.
//! * Records are encoded in GDSII's binary form: a length, record-type, data-type header,
//!   and optional content. Raw bytes are never stored; they exist only on the way
//!   through a [std::io::Read] or [std::io::Write].
//!
//! ## Alternate Serialization
//!
//! Everything in the [GdsLibrary] tree is [serde]-serializable.
//! The [ser] module reads and writes JSON, YAML, and TOML renditions.
//!
//! ## Usage
//!
//! Loading a [GdsLibrary] from disk:
//!
//! ```skip
//! let lib = gds21::GdsLibrary::open("sample.gds")?;
//! ```
//!
//! Creating a library and adding a cell:
//!
//! ```
//! use gds21::{GdsLibrary, GdsStruct};
//! let mut lib = GdsLibrary::new("mylib");
//! lib.structs.push(GdsStruct::new("mycell"));
//! assert_eq!(lib.stats().structs, 1);
//! ```
//!
//! Saving it:
//!
//! ```skip
//! lib.save("mylib.gds")?;
//! ```
//!

mod data;
pub use data::*;

mod read;
pub use read::*;

mod write;
pub use write::*;

pub mod ser;

#[cfg(test)]
mod tests;
