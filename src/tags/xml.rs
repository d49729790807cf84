//! Event-driven reader for one `exiftool -listx` table fragment.
//!
//! ```xml
//! <table name='EXIF::Main' g0='EXIF' g1='IFD0' g2='Image'>
//!  <tag id='271' name='Make' type='string' writable='true'>
//!   <desc lang='en'>Make</desc>
//!   <desc lang='de'>Hersteller</desc>
//!  </tag>
//! </table>
//! ```
//!
//! Only the root's `name`, the direct `<tag>` children and their direct
//! `<desc>` children are read. Other attributes and elements (`g0`, `id`,
//! table-level `desc`, ...) are skipped. Description text is kept verbatim,
//! whitespace included.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::record::{ConvertError, ConvertResult};

/// Root element of a fragment.
#[derive(Debug)]
pub(crate) struct XmlTable {
    pub name: String,

    /// Last `<tag>` child, if any.
    pub tag: Option<XmlTag>,
}

/// `<tag>` element.
#[derive(Debug)]
pub(crate) struct XmlTag {
    pub name: String,
    pub tag_type: String,
    pub writable: bool,
    pub descriptions: Vec<XmlDesc>,
}

/// `<desc>` element.
#[derive(Debug)]
pub(crate) struct XmlDesc {
    pub lang: String,
    pub text: String,
}

const TAG_DEPTH: usize = 2;
const DESC_DEPTH: usize = 3;

/// Read a fragment into an [`XmlTable`].
///
/// Reading stops as soon as the root element closes; anything after it is
/// ignored.
pub(crate) fn parse_table(fragment: &str) -> ConvertResult<XmlTable> {
    let mut reader = Reader::from_str(fragment);
    let mut builder = TableBuilder::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) => builder.open(&e)?,
            Event::Empty(e) => {
                builder.open(&e)?;
                builder.close();
            }
            Event::End(_) => {
                builder.close();
                if builder.depth == 0 {
                    break;
                }
            }
            Event::Text(e) => {
                if builder.in_desc() {
                    builder.push_text(&e.unescape()?);
                }
            }
            Event::CData(e) => {
                if builder.in_desc() {
                    builder.push_text(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    builder.finish()
}

#[derive(Default)]
struct TableBuilder {
    depth: usize,
    name: Option<String>,
    closed: bool,
    open_tag: Option<XmlTag>,
    open_desc: Option<XmlDesc>,
    last_tag: Option<XmlTag>,
}

impl TableBuilder {
    fn open(&mut self, e: &BytesStart<'_>) -> ConvertResult<()> {
        self.depth += 1;

        match (self.depth, e.name().as_ref()) {
            (1, _) => self.name = Some(required(e, "name")?),
            (TAG_DEPTH, b"tag") => {
                let writable = match attribute(e, "writable")? {
                    Some(value) => parse_bool(&value)?,
                    None => false,
                };
                self.open_tag = Some(XmlTag {
                    name: required(e, "name")?,
                    tag_type: required(e, "type")?,
                    writable,
                    descriptions: Vec::new(),
                });
            }
            (DESC_DEPTH, b"desc") if self.open_tag.is_some() => {
                self.open_desc = Some(XmlDesc {
                    lang: required(e, "lang")?,
                    text: String::new(),
                });
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self) {
        match self.depth {
            1 => self.closed = true,
            TAG_DEPTH => {
                if let Some(tag) = self.open_tag.take() {
                    self.last_tag = Some(tag);
                }
            }
            DESC_DEPTH => {
                if let (Some(desc), Some(tag)) = (self.open_desc.take(), self.open_tag.as_mut()) {
                    tag.descriptions.push(desc);
                }
            }
            _ => {}
        }
        self.depth = self.depth.saturating_sub(1);
    }

    /// True while the innermost open element is a `<desc>` being collected.
    fn in_desc(&self) -> bool {
        self.depth == DESC_DEPTH && self.open_desc.is_some()
    }

    fn push_text(&mut self, text: &str) {
        if let Some(desc) = self.open_desc.as_mut() {
            desc.text.push_str(text);
        }
    }

    fn finish(self) -> ConvertResult<XmlTable> {
        let name = self.name.ok_or(ConvertError::Empty)?;
        if !self.closed {
            return Err(ConvertError::Unterminated { table: name });
        }
        Ok(XmlTable {
            name,
            tag: self.last_tag,
        })
    }
}

fn attribute(e: &BytesStart<'_>, key: &str) -> ConvertResult<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == key.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn required(e: &BytesStart<'_>, key: &'static str) -> ConvertResult<String> {
    attribute(e, key)?.ok_or_else(|| ConvertError::MissingAttribute {
        element: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
        attribute: key,
    })
}

/// Boolean attribute value. Accepts `1`, `t`, `T`, `TRUE`, `true`, `True`
/// and their false counterparts; surrounding whitespace is ignored and an
/// empty value is false.
pub(crate) fn parse_bool(value: &str) -> ConvertResult<bool> {
    match value.trim() {
        "" | "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        _ => Err(ConvertError::InvalidBool {
            value: value.to_string(),
        }),
    }
}
