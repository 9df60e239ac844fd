//! Checked field access on JSON objects.
//!
//! Each accessor knows the path of the object it reads from, so a bad
//! document is reported as `subWallets.subWallet[0].unspentInputs[1].amount`
//! rather than "invalid type".

use serde_json::{Map, Value};
use thiserror::Error;

/// Errors converting between the wallet JSON document and the stored graph.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("expected a JSON object at `{path}`")]
    NotAnObject { path: String },

    #[error("missing field `{path}`")]
    MissingField { path: String },

    #[error("field `{path}` must be {expected}")]
    WrongType { path: String, expected: &'static str },

    #[error("wallet file format version {found} is newer than supported version {supported}")]
    UnsupportedFormatVersion { found: u64, supported: u64 },
}

pub type CodecResult<T> = Result<T, CodecError>;

/// A JSON object together with its path in the document.
pub(crate) struct Obj<'a> {
    path: String,
    map: &'a Map<String, Value>,
}

impl<'a> Obj<'a> {
    pub(crate) fn new(value: &'a Value, path: impl Into<String>) -> CodecResult<Self> {
        let path = path.into();
        match value.as_object() {
            Some(map) => Ok(Self { path, map }),
            None => Err(CodecError::NotAnObject { path }),
        }
    }

    fn child_path(&self, field: &str) -> String {
        if self.path.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", self.path, field)
        }
    }

    fn field(&self, field: &str) -> CodecResult<&'a Value> {
        self.map.get(field).ok_or_else(|| CodecError::MissingField {
            path: self.child_path(field),
        })
    }

    fn wrong(&self, field: &str, expected: &'static str) -> CodecError {
        CodecError::WrongType {
            path: self.child_path(field),
            expected,
        }
    }

    pub(crate) fn has(&self, field: &str) -> bool {
        self.map.get(field).map_or(false, |v| !v.is_null())
    }

    pub(crate) fn str(&self, field: &str) -> CodecResult<String> {
        self.field(field)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.wrong(field, "a string"))
    }

    pub(crate) fn u64(&self, field: &str) -> CodecResult<u64> {
        self.field(field)?
            .as_u64()
            .ok_or_else(|| self.wrong(field, "a non-negative integer"))
    }

    pub(crate) fn i64(&self, field: &str) -> CodecResult<i64> {
        self.field(field)?
            .as_i64()
            .ok_or_else(|| self.wrong(field, "an integer"))
    }

    /// Absent and `null` both read as `None`.
    pub(crate) fn opt_u64(&self, field: &str) -> CodecResult<Option<u64>> {
        if !self.has(field) {
            return Ok(None);
        }
        self.u64(field).map(Some)
    }

    pub(crate) fn bool(&self, field: &str) -> CodecResult<bool> {
        self.field(field)?
            .as_bool()
            .ok_or_else(|| self.wrong(field, "a boolean"))
    }

    pub(crate) fn obj(&self, field: &str) -> CodecResult<Obj<'a>> {
        Obj::new(self.field(field)?, self.child_path(field))
    }

    fn array(&self, field: &str) -> CodecResult<&'a Vec<Value>> {
        self.field(field)?
            .as_array()
            .ok_or_else(|| self.wrong(field, "an array"))
    }

    pub(crate) fn str_list(&self, field: &str) -> CodecResult<Vec<String>> {
        let path = self.child_path(field);
        self.array(field)?
            .iter()
            .enumerate()
            .map(|(i, v)| {
                v.as_str().map(str::to_string).ok_or_else(|| CodecError::WrongType {
                    path: format!("{path}[{i}]"),
                    expected: "a string",
                })
            })
            .collect()
    }

    /// Decode every element of the array `field` with `each`, in order.
    pub(crate) fn list<T, F>(&self, field: &str, each: F) -> CodecResult<Vec<T>>
    where
        F: Fn(&Obj<'a>) -> CodecResult<T>,
    {
        let path = self.child_path(field);
        self.array(field)?
            .iter()
            .enumerate()
            .map(|(i, v)| each(&Obj::new(v, format!("{path}[{i}]"))?))
            .collect()
    }
}
