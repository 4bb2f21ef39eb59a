use chrono::{DateTime, FixedOffset};
use std::fmt;

/// Binary content attached to a node property.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub filename: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(DateTime<FixedOffset>),
    Reference(String),
    References(Vec<String>),
    Resource(Resource),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    String,
    Integer,
    Float,
    Boolean,
    Date,
    Reference,
    References,
    Resource,
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::String => "string",
            PropertyType::Integer => "integer",
            PropertyType::Float => "float",
            PropertyType::Boolean => "boolean",
            PropertyType::Date => "date",
            PropertyType::Reference => "reference",
            PropertyType::References => "references",
            PropertyType::Resource => "resource",
        }
    }

    pub fn from_str(s: &str) -> Option<PropertyType> {
        match s {
            "string" => Some(PropertyType::String),
            "integer" => Some(PropertyType::Integer),
            "float" => Some(PropertyType::Float),
            "boolean" => Some(PropertyType::Boolean),
            "date" => Some(PropertyType::Date),
            "reference" => Some(PropertyType::Reference),
            "references" => Some(PropertyType::References),
            "resource" => Some(PropertyType::Resource),
            _ => None,
        }
    }
}

impl PropertyValue {
    pub fn property_type(&self) -> PropertyType {
        match self {
            PropertyValue::String(_) => PropertyType::String,
            PropertyValue::Integer(_) => PropertyType::Integer,
            PropertyValue::Float(_) => PropertyType::Float,
            PropertyValue::Boolean(_) => PropertyType::Boolean,
            PropertyValue::Date(_) => PropertyType::Date,
            PropertyValue::Reference(_) => PropertyType::Reference,
            PropertyValue::References(_) => PropertyType::References,
            PropertyValue::Resource(_) => PropertyType::Resource,
        }
    }

    /// Text form shared by the database and the XML document.
    ///
    /// Multi-valued references are joined with a single space; resources
    /// yield their original filename (the bytes travel separately).
    pub fn to_text(&self) -> String {
        match self {
            PropertyValue::String(s) => s.clone(),
            PropertyValue::Integer(i) => i.to_string(),
            PropertyValue::Float(f) => f.to_string(),
            PropertyValue::Boolean(b) => b.to_string(),
            PropertyValue::Date(d) => d.to_rfc3339(),
            PropertyValue::Reference(id) => id.clone(),
            PropertyValue::References(ids) => ids.join(" "),
            PropertyValue::Resource(r) => r.filename.clone(),
        }
    }

    /// Inverse of [`PropertyValue::to_text`] for every type except resources.
    pub fn from_text(property_type: PropertyType, text: &str) -> Option<PropertyValue> {
        match property_type {
            PropertyType::String => Some(PropertyValue::String(text.to_string())),
            PropertyType::Integer => text.trim().parse().ok().map(PropertyValue::Integer),
            PropertyType::Float => text.trim().parse().ok().map(PropertyValue::Float),
            PropertyType::Boolean => match text.trim() {
                "true" | "1" => Some(PropertyValue::Boolean(true)),
                "false" | "0" | "" => Some(PropertyValue::Boolean(false)),
                _ => None,
            },
            PropertyType::Date => DateTime::parse_from_rfc3339(text.trim())
                .ok()
                .map(PropertyValue::Date),
            PropertyType::Reference => {
                let id = text.trim();
                if id.is_empty() || id.contains(char::is_whitespace) {
                    None
                } else {
                    Some(PropertyValue::Reference(id.to_string()))
                }
            }
            PropertyType::References => Some(PropertyValue::References(
                text.split_whitespace().map(str::to_string).collect(),
            )),
            PropertyType::Resource => None,
        }
    }
}

/// A named property in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub value: PropertyValue,
}

impl Property {
    pub fn new(name: impl Into<String>, value: PropertyValue) -> Self {
        Property {
            name: name.into(),
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_type_names() {
        for t in [
            PropertyType::String,
            PropertyType::Integer,
            PropertyType::Float,
            PropertyType::Boolean,
            PropertyType::Date,
            PropertyType::Reference,
            PropertyType::References,
            PropertyType::Resource,
        ] {
            assert_eq!(PropertyType::from_str(t.as_str()), Some(t));
        }
        assert_eq!(PropertyType::from_str("blob"), None);
    }

    #[test]
    fn test_date_text_keeps_offset() {
        let date = DateTime::parse_from_rfc3339("2024-01-15T10:30:00+02:00").unwrap();
        let value = PropertyValue::Date(date);
        let text = value.to_text();
        assert_eq!(
            PropertyValue::from_text(PropertyType::Date, &text),
            Some(value)
        );
    }

    #[test]
    fn test_invalid_scalars_rejected() {
        assert_eq!(PropertyValue::from_text(PropertyType::Integer, "12a"), None);
        assert_eq!(PropertyValue::from_text(PropertyType::Boolean, "yes"), None);
        assert_eq!(PropertyValue::from_text(PropertyType::Date, "yesterday"), None);
        assert_eq!(PropertyValue::from_text(PropertyType::Reference, ""), None);
        assert_eq!(PropertyValue::from_text(PropertyType::Resource, "a.png"), None);
    }

    #[test]
    fn test_references_split_on_whitespace() {
        assert_eq!(
            PropertyValue::from_text(PropertyType::References, " a  b\nc "),
            Some(PropertyValue::References(vec![
                "a".into(),
                "b".into(),
                "c".into()
            ]))
        );
        assert_eq!(
            PropertyValue::from_text(PropertyType::References, ""),
            Some(PropertyValue::References(vec![]))
        );
    }

    #[test]
    fn test_string_preserves_whitespace() {
        assert_eq!(
            PropertyValue::from_text(PropertyType::String, "  padded "),
            Some(PropertyValue::String("  padded ".into()))
        );
    }
}
