//! Grid → records formatting
//!
//! With a header (and at least two rows) row 0 supplies the field names and every later row
//! becomes one [`Record`]; missing trailing cells become "" and extra cells are ignored.
//! Otherwise every row is keyed `Column_1..Column_N`.
//!
//! [`Record`] keeps header order and serialises as a JSON object. A header repeated in row 0
//! keeps its first position and takes the value of its last occurrence.

// ZST struct methods use &self for API consistency
#![allow(clippy::trivially_copy_pass_by_ref)]

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One table row keyed by field name, in header order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Set a field; an existing key keeps its position and takes the new value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((key, value)),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Field names in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = Record;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Record, A::Error> {
                let mut record = Record::new();
                while let Some((k, v)) = access.next_entry::<String, String>()? {
                    record.insert(k, v);
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

/// Converts between text grids and records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StructuredFormatter;

impl StructuredFormatter {
    #[inline]
    #[must_use = "returns a new StructuredFormatter instance"]
    pub const fn new() -> Self {
        Self
    }

    /// Key every row of `grid`
    #[must_use]
    pub fn format_as_records(&self, grid: &[Vec<String>], has_header: bool) -> Vec<Record> {
        match grid {
            [header, rows @ ..] if has_header && !rows.is_empty() => rows
                .iter()
                .map(|row| {
                    header
                        .iter()
                        .enumerate()
                        .map(|(i, name)| (name.clone(), row.get(i).cloned().unwrap_or_default()))
                        .collect()
                })
                .collect(),
            _ => grid
                .iter()
                .map(|row| {
                    row.iter()
                        .enumerate()
                        .map(|(i, value)| (format!("Column_{}", i + 1), value.clone()))
                        .collect()
                })
                .collect(),
        }
    }

    /// Inverse of [`Self::format_as_records`] with a header: header row, then values
    ///
    /// Field names come from the first record; absent fields become "".
    #[must_use]
    pub fn records_to_grid(&self, records: &[Record]) -> Vec<Vec<String>> {
        let Some(first) = records.first() else {
            return Vec::new();
        };
        let header: Vec<String> = first.keys().map(str::to_string).collect();

        let mut grid = Vec::with_capacity(records.len() + 1);
        for record in records {
            grid.push(
                header
                    .iter()
                    .map(|k| record.get(k).unwrap_or_default().to_string())
                    .collect(),
            );
        }
        grid.insert(0, header);
        grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|s| (*s).to_string()).collect())
            .collect()
    }

    #[test]
    fn test_header_records() {
        let table = grid(&[&["Name", "Amt"], &["Aspirin", "20"], &["Paracetamol", "15"]]);
        let records = StructuredFormatter::new().format_as_records(&table, true);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("Name"), Some("Aspirin"));
        assert_eq!(records[1].get("Amt"), Some("15"));
        assert_eq!(
            serde_json::to_string(&records).unwrap(),
            r#"[{"Name":"Aspirin","Amt":"20"},{"Name":"Paracetamol","Amt":"15"}]"#
        );
    }

    #[test]
    fn test_short_and_long_rows() {
        let table = grid(&[&["A", "B"], &["1"], &["1", "2", "3"]]);
        let records = StructuredFormatter::new().format_as_records(&table, true);
        assert_eq!(records[0].get("B"), Some(""));
        assert_eq!(records[1].len(), 2);
    }

    #[test]
    fn test_generic_columns_without_header_or_single_row() {
        let formatter = StructuredFormatter::new();
        let single = grid(&[&["x", "y"]]);
        let records = formatter.format_as_records(&single, true);
        assert_eq!(records[0].keys().collect::<Vec<_>>(), vec!["Column_1", "Column_2"]);

        let table = grid(&[&["Name", "Amt"], &["Aspirin", "20"]]);
        assert_eq!(formatter.format_as_records(&table, false).len(), 2);
    }

    #[test]
    fn test_repeated_header_keeps_first_position() {
        let table = grid(&[&["Qty", "Item", "Qty"], &["1", "Pen", "2"]]);
        let records = StructuredFormatter::new().format_as_records(&table, true);
        let pairs: Vec<(&str, &str)> = records[0].iter().collect();
        assert_eq!(pairs, vec![("Qty", "2"), ("Item", "Pen")]);
    }

    #[test]
    fn test_records_to_grid_round_trip() {
        let formatter = StructuredFormatter::new();
        let table = grid(&[&["Name", "Amt"], &["Aspirin", "20"], &["Paracetamol", "15"]]);
        let records = formatter.format_as_records(&table, true);
        assert_eq!(formatter.records_to_grid(&records), table);
        assert!(formatter.records_to_grid(&[]).is_empty());
    }

    #[test]
    fn test_record_deserialises_in_document_order() {
        let record: Record = serde_json::from_str(r#"{"z":"1","a":"2"}"#).unwrap();
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["z", "a"]);
    }
}
