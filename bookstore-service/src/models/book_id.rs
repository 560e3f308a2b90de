//! External string form of book identifiers.
//!
//! Books are keyed by MongoDB `ObjectId`s; clients only ever see the
//! 24-character hexadecimal rendering.

use mongodb::bson::{oid::ObjectId, Bson};
use service_core::error::AppError;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid book ID format")]
pub struct InvalidIdentifierFormat;

impl From<InvalidIdentifierFormat> for AppError {
    fn from(err: InvalidIdentifierFormat) -> Self {
        AppError::BadRequest(anyhow::Error::new(err))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BookId(ObjectId);

impl BookId {
    pub fn new() -> Self {
        Self(ObjectId::new())
    }

    pub fn object_id(&self) -> ObjectId {
        self.0
    }
}

impl Default for BookId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ObjectId> for BookId {
    fn from(oid: ObjectId) -> Self {
        Self(oid)
    }
}

impl From<BookId> for Bson {
    fn from(id: BookId) -> Self {
        Bson::ObjectId(id.0)
    }
}

impl FromStr for BookId {
    type Err = InvalidIdentifierFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::parse_str(s)
            .map(Self)
            .map_err(|_| InvalidIdentifierFormat)
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}
