//! Strome value model and dictionary encoding.
//!
//! This crate defines the closed set of persistable values that every entity
//! property reduces to, and the object-notation codec used to move entity
//! dictionaries in and out of a backing store.
//!
//! # Modules
//!
//! - [`value`] - [`FieldValue`], [`ValueKind`] and the [`Mapping`] dictionary type
//! - [`codec`] - JSON encoding of mappings
//! - [`error`] - Encoding error types
//!
//! ```
//! use strome_proto::{codec, EncodeOptions, FieldValue, Mapping};
//!
//! let mut map = Mapping::new();
//! map.insert("city".into(), FieldValue::from("Delhi"));
//!
//! let bytes = codec::encode_mapping(&map, EncodeOptions::compact()).unwrap();
//! assert_eq!(codec::decode_mapping(&bytes).unwrap(), map);
//! ```

pub mod codec;
pub mod error;
pub mod value;

pub use codec::EncodeOptions;
pub use error::Error;
pub use value::{FieldValue, Mapping, ValueKind};
