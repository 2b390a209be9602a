//! Generic parsing of `key: value` style procfs files such as `/proc/<pid>/io`.
//!
//! Implementors of [`KeyValueStat`] declare which keys they understand and how
//! each parsed value is applied. Unknown keys are ignored, so newer kernels
//! adding fields do not break parsing.

use std::collections::{HashMap, HashSet};
use std::io::BufRead;

use super::StatParseError;

/// Handler applying a parsed value to a field of the implementing struct.
pub type FieldHandler<S> = fn(&mut S, u64);

/// A trait for parsing multi-line key-value stat files.
pub trait KeyValueStat: Default
where
    Self: 'static,
{
    /// Character terminating each key, stripped before lookup.
    ///
    /// `/proc/<pid>/io` uses `Some(':')` (`write_bytes: 4096`). With `None`,
    /// the key is used as-is.
    const KEY_SUFFIX: Option<char>;

    /// If `false`, encountering the same key more than once is an error.
    const ALLOW_DUPLICATE_KEYS: bool;

    /// Returns the known field names and the handlers that apply their values.
    fn field_handlers() -> &'static HashMap<&'static str, FieldHandler<Self>>;

    /// Parses a buffer into `Self`, one key-value pair per line.
    ///
    /// Lines without a value are skipped.
    ///
    /// # Errors
    /// Returns [`StatParseError::Io`] if reading fails, or a parse variant if a
    /// known key carries a non-numeric value or is duplicated.
    fn from_reader<R: BufRead>(buf: &mut R) -> Result<Self, StatParseError> {
        let mut stat = Self::default();
        let handlers = Self::field_handlers();
        let mut seen_keys = HashSet::with_capacity(handlers.len());

        let mut line = String::new();
        let mut lineno = 0;
        while buf.read_line(&mut line)? != 0 {
            lineno += 1;
            let mut parts = line.split_whitespace();
            if let (Some(key), Some(val)) = (parts.next(), parts.next()) {
                let key = match Self::KEY_SUFFIX {
                    Some(suffix) => key.strip_suffix(suffix).unwrap_or(key),
                    None => key,
                };
                Self::parse_and_set(key, val, &mut stat, lineno, handlers, &mut seen_keys)?;
            }
            line.clear();
        }

        Ok(stat)
    }

    /// Parses a single key-value pair and updates `stat` via its handler.
    ///
    /// # Errors
    /// Returns [`StatParseError::InvalidKeyValue`] if the value is not a `u64`,
    /// or [`StatParseError::DuplicateField`] if duplicates are disallowed.
    fn parse_and_set(
        key: &str,
        val: &str,
        stat: &mut Self,
        lineno: usize,
        handlers: &HashMap<&'static str, FieldHandler<Self>>,
        seen_keys: &mut HashSet<&'static str>,
    ) -> Result<(), StatParseError> {
        let Some((k, handler)) = handlers.get_key_value(key) else {
            return Ok(());
        };
        let parsed = val
            .parse::<u64>()
            .map_err(|source| StatParseError::InvalidKeyValue {
                key: key.to_string(),
                value: val.to_string(),
                line: lineno,
                source,
            })?;
        if !Self::ALLOW_DUPLICATE_KEYS && !seen_keys.insert(k) {
            return Err(StatParseError::DuplicateField {
                field: key.to_string(),
                line: lineno,
            });
        }
        handler(stat, parsed);
        Ok(())
    }
}
