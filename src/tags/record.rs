//! Conversion of table fragments into tag records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::xml::{self, XmlTable, XmlTag};

/// Result type for fragment conversion.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Errors produced while converting a fragment.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// The fragment is not well-formed XML.
    #[error("malformed table fragment: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The fragment bytes are not UTF-8.
    #[error("table fragment is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// The fragment contains no element at all.
    #[error("table fragment contains no element")]
    Empty,

    /// The fragment ends before its root element is closed.
    #[error("table `{table}` is not terminated")]
    Unterminated {
        /// Name attribute of the offending table.
        table: String,
    },

    /// A required attribute is missing.
    #[error("`{element}` element lacks the `{attribute}` attribute")]
    MissingAttribute {
        /// Element name as written in the fragment.
        element: String,
        /// Missing attribute name.
        attribute: &'static str,
    },

    /// A boolean attribute holds something other than a boolean spelling.
    #[error("invalid boolean attribute value `{value}`")]
    InvalidBool {
        /// Raw attribute value.
        value: String,
    },

    /// The table has no `<tag>` element.
    #[error("table `{table}` contains no tag element")]
    MissingTag {
        /// Name attribute of the offending table.
        table: String,
    },
}

/// JSON representation of one metadata tag.
///
/// Field order is the order of the serialized object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    /// Whether the tool can write this tag.
    pub writable: bool,

    /// `group:name`.
    pub path: String,

    /// Table (group) the tag belongs to.
    pub group: String,

    /// Value type, e.g. `string` or `int16u`.
    #[serde(rename = "type")]
    pub tag_type: String,

    /// Localized descriptions keyed by language code.
    pub description: BTreeMap<String, String>,
}

impl TagRecord {
    fn from_xml(group: String, tag: XmlTag) -> Self {
        let mut description = BTreeMap::new();
        for desc in tag.descriptions {
            // later entries win on duplicate language codes
            description.insert(desc.lang, desc.text);
        }

        Self {
            writable: tag.writable,
            path: format!("{}:{}", group, tag.name),
            group,
            tag_type: tag.tag_type,
            description,
        }
    }
}

/// Convert one `<table>...</table>` fragment into a [`TagRecord`].
///
/// When a table wraps several tags, the last one is used.
///
/// # Errors
///
/// Fails if the fragment is not well-formed, misses `name`/`type`
/// attributes, has a `writable` value that is not a boolean, or contains no
/// tag.
pub fn convert_fragment(fragment: &str) -> ConvertResult<TagRecord> {
    let XmlTable { name, tag } = xml::parse_table(fragment)?;

    let tag = tag.ok_or_else(|| ConvertError::MissingTag { table: name.clone() })?;

    Ok(TagRecord::from_xml(name, tag))
}
