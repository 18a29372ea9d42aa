//! core/schema.rs
//!
//! The fixed record schema shared by every row of a snapshot.
//!
//! - One entry per metadata field, in column order
//! - `path` is the identifier field (the file's current location)
//! - Read-only fields are loaded for inspection but never written back
//!
//! The schema is plain data: no SQL, no tag parsing. The snapshot turns it into
//! a table, the tag codec maps field names onto ID3 frames.

/// How a field's value is stored in the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Numeric,
}

impl FieldKind {
    /// SQLite column type used in the `CREATE TABLE` statement.
    pub fn sql_type(self) -> &'static str {
        match self {
            FieldKind::Text => "TEXT",
            FieldKind::Integer => "INTEGER",
            FieldKind::Numeric => "NUMERIC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadWrite,
    /// Shown in the snapshot, ignored by the reconciler.
    ReadOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Legally holds more than one value per file.
    pub multi: bool,
    pub access: Access,
}

impl Field {
    const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text,
            multi: false,
            access: Access::ReadWrite,
        }
    }

    const fn multi(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text,
            multi: true,
            access: Access::ReadWrite,
        }
    }

    const fn integer(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Integer,
            multi: false,
            access: Access::ReadWrite,
        }
    }

    const fn read_only(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            multi: false,
            access: Access::ReadOnly,
        }
    }

    pub fn is_identifier(&self) -> bool {
        self.name == IDENTIFIER
    }

    /// True for fields the reconciler writes back to the file.
    pub fn is_writable(&self) -> bool {
        !self.is_identifier() && self.access == Access::ReadWrite
    }

    /// Column declaration: (name, SQL type).
    pub fn column(&self) -> (&'static str, &'static str) {
        (self.name, self.kind.sql_type())
    }
}

/// Name of the identifier field (the file's current path).
pub const IDENTIFIER: &str = "path";

/// Canonical field list, in column order.
pub const FIELDS: &[Field] = &[
    Field::text(IDENTIFIER),
    Field::text("title"),
    Field::multi("artist"),
    Field::text("album"),
    Field::multi("album_artist"),
    Field::multi("composer"),
    Field::multi("genre"),
    Field::integer("track_no"),
    Field::integer("track_total"),
    Field::integer("disc_no"),
    Field::integer("disc_total"),
    Field::text("date"),
    Field::integer("bpm"),
    Field::text("grouping"),
    Field::multi("lyricist"),
    Field::multi("conductor"),
    Field::multi("remixer"),
    Field::text("publisher"),
    Field::text("subtitle"),
    Field::text("initial_key"),
    Field::multi("mood"),
    Field::multi("language"),
    Field::text("isrc"),
    Field::text("encoded_by"),
    Field::text("copyright"),
    Field::text("comment"),
    // Seconds, probed from the audio stream.
    Field::read_only("duration", FieldKind::Numeric),
];

/// Every field except the identifier, in column order.
///
/// This is the order of `Record::values`.
pub fn data_fields() -> impl Iterator<Item = &'static Field> {
    FIELDS.iter().filter(|f| !f.is_identifier())
}

pub fn field(name: &str) -> Option<&'static Field> {
    FIELDS.iter().find(|f| f.name == name)
}
