//! The sample user model.

use strome_core::catalog::{DeleteRule, EntitySchema, Relationship, RelationshipDef};
use strome_core::error::MappingError;
use strome_core::mapping::{DictionaryReader, DictionaryWriter, Entity, Projection};

/// A person's name.
#[derive(Debug, Clone, PartialEq)]
pub struct Name {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
}

impl Name {
    pub fn new(first_name: &str, middle_name: Option<&str>, last_name: Option<&str>) -> Self {
        Self {
            first_name: first_name.to_string(),
            middle_name: middle_name.map(str::to_string),
            last_name: last_name.map(str::to_string),
        }
    }

    /// First, middle and last name separated by spaces, skipping absent parts.
    pub fn full_name(&self) -> String {
        let mut full_name = self.first_name.clone();
        for part in [&self.middle_name, &self.last_name].into_iter().flatten() {
            full_name.push(' ');
            full_name.push_str(part);
        }
        full_name
    }
}

impl Entity for Name {
    const NAME: &'static str = "Name";

    fn schema() -> EntitySchema {
        EntitySchema::new(Self::NAME)
            .field::<String>("firstName")
            .field::<Option<String>>("middleName")
            .field::<Option<String>>("lastName")
    }

    fn write(&self, writer: &mut DictionaryWriter<'_>) {
        writer
            .field("firstName", &self.first_name)
            .field("middleName", &self.middle_name)
            .field("lastName", &self.last_name);
    }

    fn read(reader: &DictionaryReader<'_>) -> Result<Self, MappingError> {
        Ok(Self {
            first_name: reader.field("firstName")?,
            middle_name: reader.field("middleName")?,
            last_name: reader.field("lastName")?,
        })
    }
}

/// A postal address.
#[derive(Debug, Clone, PartialEq)]
pub struct Address {
    pub house_number: String,
    pub city: String,
    pub state: String,
    pub pin_code: String,
}

impl Address {
    pub fn new(house_number: &str, city: &str, state: &str, pin_code: &str) -> Self {
        Self {
            house_number: house_number.to_string(),
            city: city.to_string(),
            state: state.to_string(),
            pin_code: pin_code.to_string(),
        }
    }
}

impl Entity for Address {
    const NAME: &'static str = "Address";

    fn schema() -> EntitySchema {
        EntitySchema::new(Self::NAME)
            .field::<String>("houseNumber")
            .field::<String>("city")
            .field::<String>("state")
            .field::<String>("pinCode")
    }

    fn write(&self, writer: &mut DictionaryWriter<'_>) {
        writer
            .field("houseNumber", &self.house_number)
            .field("city", &self.city)
            .field("state", &self.state)
            .field("pinCode", &self.pin_code);
    }

    fn read(reader: &DictionaryReader<'_>) -> Result<Self, MappingError> {
        Ok(Self {
            house_number: reader.field("houseNumber")?,
            city: reader.field("city")?,
            state: reader.field("state")?,
            pin_code: reader.field("pinCode")?,
        })
    }
}

/// A user with a name, phone numbers and postal addresses.
///
/// Deleting a user cascades to its name and addresses.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub name: Relationship<Name>,
    pub age: i64,
    pub phone_numbers: Vec<String>,
    pub addresses: Relationship<Vec<Address>>,
}

impl User {
    pub fn new(name: Name, age: i64, phone_numbers: Vec<String>, addresses: Vec<Address>) -> Self {
        Self {
            name: Relationship::new(name),
            age,
            phone_numbers,
            addresses: Relationship::new(addresses),
        }
    }

    /// The user from the sample app: two phone numbers, two addresses.
    pub fn sample() -> Self {
        Self::new(
            Name::new("Ravi", Some("Prakash"), Some("Maurya")),
            45,
            vec!["99xx2xxx4x".into(), "89xx4xxx9x".into()],
            vec![
                Address::new("B-2803", "Delhi", "Delhi", "110011"),
                Address::new("3-1102", "Navi Mumbai", "Maharastra", "401508"),
            ],
        )
    }

    pub fn full_name(&self) -> String {
        self.name.full_name()
    }
}

impl Entity for User {
    const NAME: &'static str = "User";

    fn schema() -> EntitySchema {
        EntitySchema::new(Self::NAME)
            .with_relationship(
                RelationshipDef::of::<Name>("name").with_delete_rule(DeleteRule::Cascade),
            )
            .field::<i64>("age")
            .field::<Vec<String>>("phoneNumbers")
            .with_relationship(
                RelationshipDef::of::<Vec<Address>>("addresses")
                    .with_delete_rule(DeleteRule::Cascade),
            )
    }

    fn write(&self, writer: &mut DictionaryWriter<'_>) {
        writer
            .relationship("name", &self.name)
            .field("age", &self.age)
            .field("phoneNumbers", &self.phone_numbers)
            .relationship("addresses", &self.addresses);
    }

    fn read(reader: &DictionaryReader<'_>) -> Result<Self, MappingError> {
        Ok(Self {
            name: reader.relationship("name")?,
            age: reader.field("age")?,
            phone_numbers: reader.field("phoneNumbers")?,
            addresses: reader.relationship("addresses")?,
        })
    }
}

/// Name and age read out of stored users.
#[derive(Debug, Clone, PartialEq)]
pub struct UserSummary {
    pub full_name: String,
    pub age: i64,
}

impl Projection for UserSummary {
    type Source = User;

    fn project(reader: &DictionaryReader<'_>) -> Result<Self, MappingError> {
        let name: Relationship<Name> = reader.relationship("name")?;
        Ok(Self {
            full_name: name.full_name(),
            age: reader.field("age")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name_skips_absent_parts() {
        assert_eq!(
            Name::new("Ravi", Some("Prakash"), Some("Maurya")).full_name(),
            "Ravi Prakash Maurya"
        );
        assert_eq!(Name::new("Ravi", None, Some("Maurya")).full_name(), "Ravi Maurya");
        assert_eq!(Name::new("Ravi", None, None).full_name(), "Ravi");
    }

    #[test]
    fn test_user_schema() {
        let schema = User::schema();
        schema.validate().unwrap();
        assert_eq!(
            schema.property_names(),
            vec!["name", "age", "phoneNumbers", "addresses"]
        );

        let addresses = schema.get_relationship("addresses").unwrap();
        assert_eq!(addresses.target, "Address");
        assert_eq!(addresses.delete_rule, DeleteRule::Cascade);
        assert!(!addresses.optional);
        assert!(!schema.get_relationship("name").unwrap().optional);
        assert!(!schema.get_field("phoneNumbers").unwrap().optional);
    }

    #[test]
    fn test_sample_user() {
        let user = User::sample();
        assert_eq!(user.full_name(), "Ravi Prakash Maurya");
        assert_eq!(user.addresses.len(), 2);
        // Rules come from the schema, not the instance.
        assert_eq!(user.addresses.delete_rule(), DeleteRule::NoAction);
        let stored = User::from_dictionary(&user.to_checked_dictionary().unwrap()).unwrap();
        assert_eq!(stored, user);
        assert_eq!(stored.addresses.delete_rule(), DeleteRule::Cascade);
    }
}
