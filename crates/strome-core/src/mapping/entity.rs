//! The entity conversion contract.

use strome_proto::Mapping;

use super::reader::DictionaryReader;
use super::writer::DictionaryWriter;
use crate::catalog::{EntitySchema, DEFAULT_MIGRATION_VERSION};
use crate::error::{Error, MappingError};
use crate::store::{Criterion, Store};

/// A record type that converts to and from an entity dictionary.
///
/// Implementations declare their properties in [`Entity::schema`] and move
/// values through [`Entity::write`] and [`Entity::read`]; everything else is
/// provided.
///
/// ```
/// use strome_core::catalog::EntitySchema;
/// use strome_core::error::MappingError;
/// use strome_core::mapping::{DictionaryReader, DictionaryWriter, Entity};
///
/// #[derive(Debug, PartialEq)]
/// struct City {
///     name: String,
///     pin_code: Option<String>,
/// }
///
/// impl Entity for City {
///     const NAME: &'static str = "City";
///
///     fn schema() -> EntitySchema {
///         EntitySchema::new(Self::NAME)
///             .field::<String>("name")
///             .field::<Option<String>>("pinCode")
///     }
///
///     fn write(&self, writer: &mut DictionaryWriter<'_>) {
///         writer.field("name", &self.name).field("pinCode", &self.pin_code);
///     }
///
///     fn read(reader: &DictionaryReader<'_>) -> Result<Self, MappingError> {
///         Ok(Self {
///             name: reader.field("name")?,
///             pin_code: reader.field("pinCode")?,
///         })
///     }
/// }
///
/// let city = City { name: "Delhi".into(), pin_code: None };
/// let map = city.to_dictionary();
/// assert!(map["pinCode"].is_null());
/// assert_eq!(City::from_dictionary(&map).unwrap(), city);
/// ```
pub trait Entity: Sized {
    /// Entity type name, unique within a catalog.
    const NAME: &'static str;

    /// Version of the record shape.
    const MIGRATION_VERSION: u32 = DEFAULT_MIGRATION_VERSION;

    /// Declared properties, in order.
    fn schema() -> EntitySchema;

    /// Write every declared property.
    fn write(&self, writer: &mut DictionaryWriter<'_>);

    /// Read every declared property.
    fn read(reader: &DictionaryReader<'_>) -> Result<Self, MappingError>;

    /// Flatten into a dictionary keyed by the declared property names.
    ///
    /// A relationship that disagrees with its declaration is still encoded
    /// and logged. Use [`Entity::to_checked_dictionary`] to reject it.
    fn to_dictionary(&self) -> Mapping {
        let schema = Self::schema();
        let mut writer = DictionaryWriter::new(&schema);
        self.write(&mut writer);
        if let Some(e) = writer.error() {
            tracing::warn!(entity = Self::NAME, error = %e, "relationship disagrees with its declaration");
        }
        writer.finish()
    }

    /// Flatten into a dictionary, failing if a relationship instance sets a
    /// rule or type other than the declared one or breaks the declared bounds.
    fn to_checked_dictionary(&self) -> Result<Mapping, MappingError> {
        let schema = Self::schema();
        let mut writer = DictionaryWriter::new(&schema);
        self.write(&mut writer);
        writer.finish_checked()
    }

    /// Rebuild from a dictionary. Fails without producing a partial entity.
    fn from_dictionary(map: &Mapping) -> Result<Self, MappingError> {
        let schema = Self::schema();
        Self::read(&DictionaryReader::new(&schema, map))
    }

    /// Rebuild from a dictionary, logging and discarding the error.
    fn try_from_dictionary(map: &Mapping) -> Option<Self> {
        match Self::from_dictionary(map) {
            Ok(entity) => Some(entity),
            Err(e) => {
                tracing::debug!(entity = Self::NAME, error = %e, "dictionary decode failed");
                None
            }
        }
    }

    /// Query stored instances of this type. An empty criteria list matches all.
    fn fetch<S: Store + ?Sized>(store: &S, criteria: &[Criterion]) -> Result<Vec<Self>, Error> {
        let rows = store.query(Self::NAME, criteria)?;
        tracing::debug!(entity = Self::NAME, rows = rows.len(), "fetched");
        rows.iter()
            .map(|row| Self::from_dictionary(row).map_err(Error::from))
            .collect()
    }
}

/// A partial read model over the dictionaries of a source entity type.
pub trait Projection: Sized {
    /// Entity type the projection reads from.
    type Source: Entity;

    /// Read the projected properties from a source dictionary.
    fn project(reader: &DictionaryReader<'_>) -> Result<Self, MappingError>;

    /// Decode from a source dictionary.
    fn from_dictionary(map: &Mapping) -> Result<Self, MappingError> {
        let schema = <Self::Source as Entity>::schema();
        Self::project(&DictionaryReader::new(&schema, map))
    }

    /// Query stored instances of the source type and project each one.
    fn fetch<S: Store + ?Sized>(store: &S, criteria: &[Criterion]) -> Result<Vec<Self>, Error> {
        store
            .query(<Self::Source as Entity>::NAME, criteria)?
            .iter()
            .map(|row| <Self as Projection>::from_dictionary(row).map_err(Error::from))
            .collect()
    }
}
