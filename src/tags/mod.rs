//! Tag records and their conversion from XML table fragments.

mod record;
mod xml;

pub use record::{convert_fragment, ConvertError, ConvertResult, TagRecord};
