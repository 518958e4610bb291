use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::catalog::schema::CatalogError;

const CREDIT_KEY_PREFIX: &str = "ECTS";

/// ECTS weight per 1-based subject position, keyed `ECTS{n}` on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, Decimal>",
    into = "BTreeMap<String, Decimal>"
)]
pub struct CreditTable(BTreeMap<usize, Decimal>);

impl CreditTable {
    /// Configured weight; zero or negative weights count as missing.
    pub fn weight(&self, position: usize) -> Option<Decimal> {
        self.0
            .get(&position)
            .copied()
            .filter(|w| *w > Decimal::ZERO)
    }

    pub fn insert(&mut self, position: usize, weight: Decimal) {
        self.0.insert(position, weight);
    }

    pub fn merge(&mut self, other: &CreditTable) {
        for (position, weight) in &other.0 {
            self.0.insert(*position, *weight);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, Decimal)> + '_ {
        self.0.iter().map(|(p, w)| (*p, *w))
    }
}

impl FromIterator<(usize, Decimal)> for CreditTable {
    fn from_iter<T: IntoIterator<Item = (usize, Decimal)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl TryFrom<BTreeMap<String, Decimal>> for CreditTable {
    type Error = CatalogError;

    fn try_from(value: BTreeMap<String, Decimal>) -> Result<Self, Self::Error> {
        value
            .into_iter()
            .map(|(key, weight)| Ok((parse_credit_key(&key)?, weight)))
            .collect()
    }
}

impl From<CreditTable> for BTreeMap<String, Decimal> {
    fn from(value: CreditTable) -> Self {
        value
            .0
            .into_iter()
            .map(|(position, weight)| (format!("{CREDIT_KEY_PREFIX}{position}"), weight))
            .collect()
    }
}

pub fn parse_credit_key(key: &str) -> Result<usize, CatalogError> {
    let trimmed = key.trim();
    let suffix = trimmed
        .get(..CREDIT_KEY_PREFIX.len())
        .filter(|prefix| prefix.eq_ignore_ascii_case(CREDIT_KEY_PREFIX))
        .map(|_| &trimmed[CREDIT_KEY_PREFIX.len()..])
        .ok_or_else(|| CatalogError::InvalidCreditKey(key.to_string()))?;
    match suffix.parse::<usize>() {
        Ok(position) if position > 0 => Ok(position),
        _ => Err(CatalogError::InvalidCreditKey(key.to_string())),
    }
}

/// Reads an ECTS credit file: `{ "M1-S1": [ { "ECTS1": 2, ... } ] }`.
///
/// Only the first entry of each program is used. Blank values and keys that
/// are not `ECTS{n}` are skipped.
pub fn parse_credit_file(json: &str) -> Result<BTreeMap<String, CreditTable>, CatalogError> {
    let raw: BTreeMap<String, Vec<BTreeMap<String, Value>>> = serde_json::from_str(json)?;
    let mut tables = BTreeMap::new();
    for (program, entries) in raw {
        let Some(entry) = entries.into_iter().next() else {
            continue;
        };
        let mut table = CreditTable::default();
        for (key, value) in entry {
            let position = match parse_credit_key(&key) {
                Ok(position) => position,
                Err(err) => {
                    warn!(%program, "skipping credit entry: {err}");
                    continue;
                }
            };
            if let Some(weight) = credit_value(&value) {
                table.insert(position, weight);
            }
        }
        tables.insert(program, table);
    }
    Ok(tables)
}

fn credit_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(number) => Decimal::from_str(&number.to_string()).ok(),
        Value::String(text) => {
            let text = text.trim().replace(',', ".");
            if text.is_empty() {
                return None;
            }
            Decimal::from_str(&text).ok()
        }
        _ => None,
    }
}
