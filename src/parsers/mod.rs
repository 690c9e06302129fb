pub mod spotbugs;

use std::collections::HashMap;
use std::str;

use quick_xml::events::BytesStart;

use crate::error::{Result, SpotwatchError};
use crate::model::BugCollection;

/// Every report parser implements this trait.
pub trait Parser {
    /// Parse the input bytes into our report model.
    fn parse(&self, input: &[u8]) -> Result<BugCollection>;
}

/// Extract attributes from an XML element into a HashMap.
pub(crate) fn attr_map(e: &BytesStart) -> HashMap<String, String> {
    e.attributes()
        .filter_map(|a| {
            let attr = a.ok()?;
            let key = str::from_utf8(attr.key.local_name().into_inner())
                .ok()?
                .to_string();
            let value = attr.unescape_value().ok()?.to_string();
            Some((key, value))
        })
        .collect()
}

/// Parse an optional numeric attribute. A missing attribute is `None`; a
/// present but non-numeric one is a decode error.
pub(crate) fn numeric_attr<T: str::FromStr>(
    attrs: &HashMap<String, String>,
    name: &str,
    position: usize,
) -> Result<Option<T>> {
    match attrs.get(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| SpotwatchError::Decode {
            message: format!("attribute '{}' is not a number: '{}'", name, raw),
            position,
        }),
    }
}

/// Parse an optional descriptive attribute. Missing and malformed values
/// both read as `None`.
pub(crate) fn lenient_attr<T: str::FromStr>(
    attrs: &HashMap<String, String>,
    name: &str,
) -> Option<T> {
    attrs.get(name).and_then(|raw| raw.trim().parse().ok())
}
