//! Reduced metadata properties for indexers and file managers.
//!
//! Unlike [`RomFields`](super::RomFields), properties come from a fixed
//! vocabulary and each has a fixed value type.

use serde::Serialize;

/// Known properties.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Property {
    Title,
    Artist,
    Album,
    Composer,
    Author,
    Copyright,
    Publisher,
    Description,
    Comment,
    Genre,
    /// Milliseconds.
    Duration,
    ReleaseYear,
    TrackNumber,
    Width,
    Height,
    CreationDate,
}

/// Value type of a property.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PropertyType {
    Integer,
    UnsignedInteger,
    String,
    Timestamp,
}

impl Property {
    pub fn property_type(self) -> PropertyType {
        use Property::*;
        match self {
            Title | Artist | Album | Composer | Author | Copyright | Publisher | Description
            | Comment | Genre => PropertyType::String,
            Duration | Width | Height => PropertyType::Integer,
            ReleaseYear | TrackNumber => PropertyType::UnsignedInteger,
            CreationDate => PropertyType::Timestamp,
        }
    }

    pub fn name(self) -> &'static str {
        use Property::*;
        match self {
            Title => "Title",
            Artist => "Artist",
            Album => "Album",
            Composer => "Composer",
            Author => "Author",
            Copyright => "Copyright",
            Publisher => "Publisher",
            Description => "Description",
            Comment => "Comment",
            Genre => "Genre",
            Duration => "Duration",
            ReleaseYear => "Release Year",
            TrackNumber => "Track Number",
            Width => "Width",
            Height => "Height",
            CreationDate => "Creation Date",
        }
    }
}

/// A property value.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Integer(i64),
    UnsignedInteger(u64),
    String(String),
    /// Seconds since the Unix epoch.
    Timestamp(i64),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    fn property_type(&self) -> PropertyType {
        match self {
            PropertyValue::Integer(_) => PropertyType::Integer,
            PropertyValue::UnsignedInteger(_) => PropertyType::UnsignedInteger,
            PropertyValue::String(_) => PropertyType::String,
            PropertyValue::Timestamp(_) => PropertyType::Timestamp,
        }
    }
}

/// Ordered list of properties.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RomMetaData {
    items: Vec<(Property, PropertyValue)>,
}

impl RomMetaData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Property, &PropertyValue)> {
        self.items.iter().map(|(p, v)| (*p, v))
    }

    /// First value stored for `prop`.
    pub fn get(&self, prop: Property) -> Option<&PropertyValue> {
        self.items.iter().find(|(p, _)| *p == prop).map(|(_, v)| v)
    }

    fn push(&mut self, prop: Property, value: PropertyValue) -> Option<usize> {
        debug_assert_eq!(
            prop.property_type(),
            value.property_type(),
            "wrong value type for {prop:?}"
        );
        if prop.property_type() != value.property_type() {
            return None;
        }
        self.items.push((prop, value));
        Some(self.items.len() - 1)
    }

    /// Add a string property. Empty strings are not stored.
    pub fn add_string(&mut self, prop: Property, value: &str) -> Option<usize> {
        let value = value.trim_end();
        if value.is_empty() {
            return None;
        }
        self.push(prop, PropertyValue::String(value.to_string()))
    }

    pub fn add_integer(&mut self, prop: Property, value: i64) -> Option<usize> {
        self.push(prop, PropertyValue::Integer(value))
    }

    pub fn add_unsigned(&mut self, prop: Property, value: u64) -> Option<usize> {
        self.push(prop, PropertyValue::UnsignedInteger(value))
    }

    pub fn add_timestamp(&mut self, prop: Property, value: i64) -> Option<usize> {
        self.push(prop, PropertyValue::Timestamp(value))
    }

    /// Copy every property of `other`.
    pub fn add_from(&mut self, other: &RomMetaData) -> Option<usize> {
        let first = self.items.len();
        self.items.extend(other.items.iter().cloned());
        (self.items.len() > first).then_some(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_types_enforced() {
        let mut md = RomMetaData::new();
        assert_eq!(md.add_string(Property::Title, "Song"), Some(0));
        assert_eq!(md.add_integer(Property::Duration, 90_000), Some(1));
        assert_eq!(md.add_unsigned(Property::ReleaseYear, 1994), Some(2));
        assert_eq!(md.get(Property::Title), Some(&PropertyValue::String("Song".into())));
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "wrong value type"))]
    fn test_mismatched_type_rejected() {
        let mut md = RomMetaData::new();
        assert_eq!(md.add_integer(Property::Title, 1), None);
    }

    #[test]
    fn test_empty_string_skipped_and_merge() {
        let mut a = RomMetaData::new();
        assert_eq!(a.add_string(Property::Artist, "   "), None);
        a.add_string(Property::Artist, "Composer X");

        let mut b = RomMetaData::new();
        b.add_string(Property::Title, "T");
        assert_eq!(b.add_from(&a), Some(1));
        assert_eq!(b.count(), 2);
        assert_eq!(RomMetaData::new().add_from(&RomMetaData::new()), None);
    }
}
