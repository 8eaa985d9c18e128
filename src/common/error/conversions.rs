//! Error conversion implementations.
//!
//! This module contains From trait implementations to convert parser errors
//! from third-party crates into the unified Error type.

#[cfg(feature = "ooxml")]
use super::types::Error;

#[cfg(feature = "ooxml")]
impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

#[cfg(feature = "ooxml")]
impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::Xml(err.to_string())
    }
}

#[cfg(feature = "ooxml")]
impl From<quick_xml::escape::EscapeError> for Error {
    fn from(err: quick_xml::escape::EscapeError) -> Self {
        Error::Xml(err.to_string())
    }
}
