#![allow(dead_code)]

//! Primitives shared by the `jp2`, `jpc` and `icc` crates: the byte
//! reader, the tests/properties tree builders, the enumeration mapper and
//! the validation configuration. None of these types touch I/O; every
//! validator in this workspace is a pure function from a borrowed byte
//! slice (and a `Config`) to a `ValidatorResult`.

pub mod config;
pub mod enum_map;
pub mod reader;
pub mod tree;

pub use config::Config;
pub use enum_map::{default_map, EnumerationMap};
pub use reader::{ByteReader, ReaderError, ReaderResult};
pub use tree::{ElementBuilder, PropertyNode, PropertyValue, TestNode, TestTree, ValidatorResult};
