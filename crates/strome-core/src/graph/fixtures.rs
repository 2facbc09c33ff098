//! Entity types shared by the graph tests.

use crate::catalog::{DeleteRule, EntitySchema, Relationship, RelationshipDef, RelationshipType};
use crate::error::MappingError;
use crate::mapping::{DictionaryReader, DictionaryWriter, Entity};

#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub label: String,
}

impl Part {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
        }
    }
}

impl Entity for Part {
    const NAME: &'static str = "Part";

    fn schema() -> EntitySchema {
        EntitySchema::new(Self::NAME).field::<String>("label")
    }

    fn write(&self, writer: &mut DictionaryWriter<'_>) {
        writer.field("label", &self.label);
    }

    fn read(reader: &DictionaryReader<'_>) -> Result<Self, MappingError> {
        Ok(Self {
            label: reader.field("label")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lock {
    pub code: i64,
}

impl Lock {
    pub fn new(code: i64) -> Self {
        Self { code }
    }
}

impl Entity for Lock {
    const NAME: &'static str = "Lock";

    fn schema() -> EntitySchema {
        EntitySchema::new(Self::NAME).field::<i64>("code")
    }

    fn write(&self, writer: &mut DictionaryWriter<'_>) {
        writer.field("code", &self.code);
    }

    fn read(reader: &DictionaryReader<'_>) -> Result<Self, MappingError> {
        Ok(Self {
            code: reader.field("code")?,
        })
    }
}

/// `locks` (deny) is declared before `parts` (cascade).
#[derive(Debug, Clone, PartialEq)]
pub struct Owner {
    pub name: String,
    pub locks: Relationship<Option<Vec<Lock>>>,
    pub parts: Relationship<Vec<Part>>,
}

impl Owner {
    fn locks_def() -> RelationshipDef {
        RelationshipDef::of::<Option<Vec<Lock>>>("locks").with_delete_rule(DeleteRule::Deny)
    }

    fn parts_def() -> RelationshipDef {
        RelationshipDef::of::<Vec<Part>>("parts").with_delete_rule(DeleteRule::Cascade)
    }

    pub fn new(name: &str, locks: Option<Vec<Lock>>, parts: Vec<Part>) -> Self {
        Self {
            name: name.to_string(),
            locks: Relationship::new(locks).with_delete_rule(DeleteRule::Deny),
            parts: Relationship::new(parts).with_delete_rule(DeleteRule::Cascade),
        }
    }
}

impl Entity for Owner {
    const NAME: &'static str = "Owner";

    fn schema() -> EntitySchema {
        EntitySchema::new(Self::NAME)
            .field::<String>("name")
            .with_relationship(Self::locks_def())
            .with_relationship(Self::parts_def())
    }

    fn write(&self, writer: &mut DictionaryWriter<'_>) {
        writer
            .field("name", &self.name)
            .relationship("locks", &self.locks)
            .relationship("parts", &self.parts);
    }

    fn read(reader: &DictionaryReader<'_>) -> Result<Self, MappingError> {
        Ok(Self {
            name: reader.field("name")?,
            locks: reader.relationship("locks")?,
            parts: reader.relationship("parts")?,
        })
    }
}

/// Self-referencing type; cycles are closed with `EntityGraph::link`.
#[derive(Debug, Clone, PartialEq)]
pub struct Ring {
    pub name: String,
    pub next: Relationship<Vec<Ring>>,
}

impl Ring {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            next: Relationship::new(Vec::new()).with_delete_rule(DeleteRule::Cascade),
        }
    }
}

impl Entity for Ring {
    const NAME: &'static str = "Ring";

    fn schema() -> EntitySchema {
        EntitySchema::new(Self::NAME)
            .field::<String>("name")
            .with_relationship(
                RelationshipDef::of::<Vec<Ring>>("next").with_delete_rule(DeleteRule::Cascade),
            )
    }

    fn write(&self, writer: &mut DictionaryWriter<'_>) {
        writer
            .field("name", &self.name)
            .relationship("next", &self.next);
    }

    fn read(reader: &DictionaryReader<'_>) -> Result<Self, MappingError> {
        Ok(Self {
            name: reader.field("name")?,
            next: reader.relationship("next")?,
        })
    }
}

/// `members` nullifies the reciprocal `Member.team` link.
#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    pub name: String,
    pub members: Relationship<Vec<Member>>,
}

impl Team {
    fn members_def() -> RelationshipDef {
        RelationshipDef::of::<Vec<Member>>("members")
            .with_delete_rule(DeleteRule::Nullify)
            .with_type(RelationshipType::to_many(0, 2))
            .with_inverse("team")
    }

    pub fn new(name: &str, members: Vec<Member>) -> Self {
        Self {
            name: name.to_string(),
            members: Relationship::from_def(&Self::members_def(), members)
                .expect("team within bounds"),
        }
    }
}

impl Entity for Team {
    const NAME: &'static str = "Team";

    fn schema() -> EntitySchema {
        EntitySchema::new(Self::NAME)
            .field::<String>("name")
            .with_relationship(Self::members_def())
    }

    fn write(&self, writer: &mut DictionaryWriter<'_>) {
        writer
            .field("name", &self.name)
            .relationship("members", &self.members);
    }

    fn read(reader: &DictionaryReader<'_>) -> Result<Self, MappingError> {
        Ok(Self {
            name: reader.field("name")?,
            members: reader.relationship("members")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub team: Relationship<Option<Team>>,
}

impl Member {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            team: Relationship::new(None),
        }
    }
}

impl Entity for Member {
    const NAME: &'static str = "Member";

    fn schema() -> EntitySchema {
        EntitySchema::new(Self::NAME)
            .field::<String>("name")
            .relationship::<Option<Team>>("team")
    }

    fn write(&self, writer: &mut DictionaryWriter<'_>) {
        writer.field("name", &self.name).relationship("team", &self.team);
    }

    fn read(reader: &DictionaryReader<'_>) -> Result<Self, MappingError> {
        Ok(Self {
            name: reader.field("name")?,
            team: reader.relationship("team")?,
        })
    }
}
