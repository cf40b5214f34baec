//! Serde utilities for blasted-image.

use serde::de::{self, Visitor};
use serde::Deserializer;
use std::fmt;

/// Module to deserialize attempt budgets that may arrive as numbers,
/// strings, booleans or null. Anything that is not a positive number
/// becomes a single attempt.
pub mod lenient_retries {
    use super::{de, fmt, Deserializer, Visitor};
    use crate::domain::entities::Retries;

    /// Deserializes a [`Retries`] from any scalar.
    ///
    /// # Errors
    ///
    /// Returns an error only if the input is not a scalar (a map or a
    /// sequence).
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Retries, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct LenientVisitor;

        impl Visitor<'_> for LenientVisitor {
            type Value = Retries;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a retry count")
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Retries::new(i64::try_from(value).unwrap_or(i64::MAX)))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Retries::new(value))
            }

            fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Retries::from_f64(value))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Retries::from_lenient_str(value))
            }

            fn visit_bool<E>(self, _value: bool) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Retries::ONCE)
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Retries::ONCE)
            }

            fn visit_none<E>(self) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Retries::ONCE)
            }
        }

        deserializer.deserialize_any(LenientVisitor)
    }
}
