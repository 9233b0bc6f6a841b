use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::normalize::{parse_finite, parse_percent};
use crate::{Capability, ProviderId, Symbol, UtcDateTime};

/// One normalized field. Absence is kept explicit so `0` and "not reported" stay distinct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Field {
    Number(Option<f64>),
    Text(Option<String>),
    Rows(Vec<FieldMap>),
}

impl Field {
    pub fn number(raw: Option<&Value>) -> Self {
        Self::Number(raw.and_then(parse_finite))
    }

    pub fn percent(raw: Option<&Value>) -> Self {
        Self::Number(raw.and_then(parse_percent))
    }

    /// Numbers that are only meaningful when finite and set.
    pub fn computed(value: Option<f64>) -> Self {
        Self::Number(value.filter(|value| value.is_finite()))
    }

    pub fn text(raw: Option<&Value>) -> Self {
        let text = match raw {
            Some(Value::String(text)) if !text.trim().is_empty() => Some(text.clone()),
            Some(Value::Number(number)) => Some(number.to_string()),
            _ => None,
        };
        Self::Text(text)
    }
}

/// Named fields of one snapshot or one statement report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap(BTreeMap<String, Field>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, field: Field) {
        self.0.insert(name.into(), field);
    }

    pub fn with(mut self, name: impl Into<String>, field: Field) -> Self {
        self.insert(name, field);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.0.get(name)
    }

    /// The reported number, `None` when absent or not numeric.
    pub fn number(&self, name: &str) -> Option<f64> {
        match self.0.get(name) {
            Some(Field::Number(value)) => *value,
            _ => None,
        }
    }

    /// The reported number with the zero default applied.
    pub fn number_or_zero(&self, name: &str) -> f64 {
        self.number(name).unwrap_or(0.0)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.0.get(name) {
            Some(Field::Text(Some(value))) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn rows(&self, name: &str) -> &[FieldMap] {
        match self.0.get(name) {
            Some(Field::Rows(rows)) => rows.as_slice(),
            _ => &[],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.0.iter().map(|(name, field)| (name.as_str(), field))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Field)> for FieldMap {
    fn from_iter<T: IntoIterator<Item = (String, Field)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Normalized result of fetching one capability for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub symbol: Symbol,
    pub capability: Capability,
    pub provider: ProviderId,
    pub fields: FieldMap,
    pub fetched_at: UtcDateTime,
}

impl Snapshot {
    pub fn new(
        symbol: Symbol,
        capability: Capability,
        provider: ProviderId,
        fields: FieldMap,
    ) -> Self {
        Self {
            symbol,
            capability,
            provider,
            fields,
            fetched_at: UtcDateTime::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn keeps_absence_distinct_from_zero() {
        let fields = FieldMap::new()
            .with("reported", Field::number(Some(&json!("0"))))
            .with("missing", Field::number(Some(&json!("None"))));

        assert_eq!(fields.number("reported"), Some(0.0));
        assert_eq!(fields.number("missing"), None);
        assert_eq!(fields.number_or_zero("missing"), 0.0);
        assert_eq!(fields.number_or_zero("never-inserted"), 0.0);
    }

    #[test]
    fn computed_values_drop_non_finite_results() {
        assert_eq!(Field::computed(Some(f64::NAN)), Field::Number(None));
        assert_eq!(Field::computed(Some(f64::INFINITY)), Field::Number(None));
        assert_eq!(Field::computed(Some(2.5)), Field::Number(Some(2.5)));
    }

    #[test]
    fn blank_text_is_absent() {
        assert_eq!(Field::text(Some(&json!("  "))), Field::Text(None));
        assert_eq!(Field::text(None), Field::Text(None));
        assert_eq!(
            Field::text(Some(&json!("USD"))),
            Field::Text(Some(String::from("USD")))
        );
    }

    #[test]
    fn snapshot_survives_json_persistence() {
        let row = FieldMap::new().with("totalAssets", Field::number(Some(&json!("100"))));
        let snapshot = Snapshot::new(
            Symbol::parse("msft").expect("valid symbol"),
            Capability::BalanceSheet,
            ProviderId::Alphavantage,
            FieldMap::new()
                .with("symbol", Field::text(Some(&json!("MSFT"))))
                .with("annualReports", Field::Rows(vec![row]))
                .with("goodwill", Field::Number(None)),
        );

        let encoded = serde_json::to_string(&snapshot).expect("serialize");
        let decoded: Snapshot = serde_json::from_str(&encoded).expect("deserialize");

        assert_eq!(decoded, snapshot);
        assert_eq!(decoded.fields.rows("annualReports").len(), 1);
    }
}
