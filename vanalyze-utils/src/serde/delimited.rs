//! Module that allows to (de-)serialize delimiter-joined list cells with `serde`.
//!
//! Simulation result CSVs store list-valued columns as a single cell whose
//! elements are joined by a separator character. Empty fragments (as produced
//! by trailing separators) are dropped on the way in.

use std::{fmt::Display, str::FromStr};

use itertools::Itertools;
use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

/// (De-)serialize a `Vec<T>` as an underscore-joined string, e.g. `"1_2_3"`.
///
/// Example:
/// ```ignore
/// #[serde(with = "vanalyze_utils::serde::delimited::underscore_list")]
/// pub node_ids: Vec<String>,
/// ```
pub mod underscore_list {
    use super::*;

    pub fn serialize<S: Serializer, T: Display>(
        list: &[T],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        super::serialize_joined(list, '_', serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>, T: FromStr>(
        deserializer: D,
    ) -> Result<Vec<T>, D::Error>
    where
        T::Err: Display,
    {
        super::deserialize_split(deserializer, '_')
    }
}

/// Join the list elements with `sep` and serialize the resulting string.
pub fn serialize_joined<S: Serializer, T: Display>(
    list: &[T],
    sep: char,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let list_str = list.iter().map(|x| x.to_string()).join(&sep.to_string());

    serializer.serialize_str(&list_str)
}

/// Deserialize a string cell and split it on `sep`, skipping empty fragments.
pub fn deserialize_split<'de, D: Deserializer<'de>, T: FromStr>(
    deserializer: D,
    sep: char,
) -> Result<Vec<T>, D::Error>
where
    T::Err: Display,
{
    let buf = String::deserialize(deserializer)?;
    split_nonempty(&buf, sep)
        .map(|x| x.parse::<T>().map_err(D::Error::custom))
        .collect()
}

/// Split `s` on `sep`, dropping empty fragments.
pub fn split_nonempty(s: &str, sep: char) -> impl Iterator<Item = &str> {
    s.split(sep).map(str::trim).filter(|x| !x.is_empty())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn split_drops_empty_fragments() {
        let parts: Vec<&str> = split_nonempty("1_2__3_", '_').collect();
        assert_eq!(parts, vec!["1", "2", "3"]);
    }

    #[test]
    fn split_empty_string() {
        assert_eq!(split_nonempty("", '_').count(), 0);
    }
}
