//! Dictionary conversion.
//!
//! [`Entity`] is the contract between a typed record and its dictionary
//! form. [`DictionaryWriter`] and [`DictionaryReader`] carry the per-property
//! encode and decode rules so implementations stay declarative.

mod entity;
mod reader;
mod writer;

pub use entity::{Entity, Projection};
pub use reader::DictionaryReader;
pub use writer::DictionaryWriter;
