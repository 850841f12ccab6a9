pub mod defs;

pub use defs::{Article, RawRecord, SourceKind, SourcedRecord};
