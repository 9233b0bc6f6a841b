//! Snapshot → JSON response bodies.
//!
//! Absent numbers render as `0` unless a route documents `null` for them; absent text
//! renders as `null`.

use marketdesk_core::{Cached, Field, FieldMap, Snapshot};
use serde_json::{json, Map, Value};

/// Largest integer an f64 holds exactly.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

pub fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < MAX_EXACT_INTEGER {
        json!(value as i64)
    } else {
        json!(value)
    }
}

fn nullable(value: Option<f64>) -> Value {
    value.map_or(Value::Null, number)
}

pub fn field(field: &Field) -> Value {
    match field {
        Field::Number(value) => number(value.unwrap_or(0.0)),
        Field::Text(text) => text.as_ref().map_or(Value::Null, |text| json!(text)),
        Field::Rows(rows) => Value::Array(rows.iter().map(fields).collect()),
    }
}

pub fn fields(map: &FieldMap) -> Value {
    Value::Object(
        map.iter()
            .map(|(name, value)| (name.to_owned(), field(value)))
            .collect::<Map<_, _>>(),
    )
}

/// Statement and other flat bodies. `symbol` falls back to the requested ticker.
pub fn snapshot(snapshot: &Snapshot) -> Value {
    with_symbol(fields(&snapshot.fields), snapshot)
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Number,
    Text,
}

/// Quote body keys; every provider's quote renders to exactly this set.
const QUOTE_SCHEMA: &[(&str, Kind)] = &[
    ("symbol", Kind::Text),
    ("open", Kind::Number),
    ("high", Kind::Number),
    ("low", Kind::Number),
    ("price", Kind::Number),
    ("volume", Kind::Number),
    ("latestTradingDay", Kind::Text),
    ("previousClose", Kind::Number),
    ("change", Kind::Number),
    ("changePercent", Kind::Number),
];

fn with_schema(snapshot: &Snapshot, schema: &[(&str, Kind)]) -> Value {
    let body = schema
        .iter()
        .map(|(name, kind)| {
            let value = match (snapshot.fields.get(name), kind) {
                (Some(value), _) => field(value),
                (None, Kind::Number) => json!(0),
                (None, Kind::Text) => Value::Null,
            };
            (String::from(*name), value)
        })
        .collect::<Map<_, _>>();
    with_symbol(Value::Object(body), snapshot)
}

fn with_symbol(mut body: Value, snapshot: &Snapshot) -> Value {
    if let Value::Object(map) = &mut body {
        if map.get("symbol").map_or(true, Value::is_null) {
            map.insert(String::from("symbol"), json!(snapshot.symbol.as_str()));
        }
    }
    body
}

pub fn quote(quote: &Snapshot) -> Value {
    with_schema(quote, QUOTE_SCHEMA)
}

/// Company overview; a missing or zero head count is `null`.
pub fn overview(overview: &Snapshot) -> Value {
    let mut body = snapshot(overview);
    let employees = overview
        .fields
        .number("employees")
        .filter(|employees| *employees != 0.0);
    if let Value::Object(map) = &mut body {
        map.insert(String::from("employees"), nullable(employees));
    }
    body
}

pub fn market_data(cached: &Cached) -> Value {
    let fields = &cached.snapshot.fields;
    json!({
        "ticker": cached.snapshot.symbol.as_str(),
        "price": number(fields.number_or_zero("price")),
        "change": nullable(fields.number("change")),
        "changePercent": nullable(fields.number("changePercent")),
        "volume": number(fields.number_or_zero("volume").floor()),
        "source": cached.snapshot.provider.display_name(),
        "lastUpdated": cached.last_updated.format_rfc3339(),
        "cached": cached.served_from_cache(),
    })
}

#[cfg(test)]
mod tests {
    use marketdesk_core::{CacheStatus, Capability, ProviderId, Symbol, UtcDateTime};

    use super::*;

    fn snapshot_with(capability: Capability, fields: FieldMap) -> Snapshot {
        Snapshot::new(
            Symbol::parse("AAPL").expect("valid"),
            capability,
            ProviderId::Polygon,
            fields,
        )
    }

    #[test]
    fn integral_numbers_render_without_fraction() {
        assert_eq!(number(1_000_000.0).to_string(), "1000000");
        assert_eq!(number(150.25).to_string(), "150.25");
    }

    #[test]
    fn absent_fields_collapse_to_zero_or_null() {
        let body = snapshot(&snapshot_with(
            Capability::Quote,
            FieldMap::new()
                .with("price", Field::Number(None))
                .with("latestTradingDay", Field::Text(None)),
        ));

        assert_eq!(body["price"], json!(0));
        assert_eq!(body["latestTradingDay"], Value::Null);
        assert_eq!(body["symbol"], json!("AAPL"));
    }

    #[test]
    fn quote_renders_the_fixed_key_set_whatever_the_provider_mapped() {
        let mut yahoo_quote = snapshot_with(
            Capability::Quote,
            FieldMap::new()
                .with("price", Field::Number(Some(420.0)))
                .with("currency", Field::Text(Some(String::from("USD")))),
        );
        yahoo_quote.provider = ProviderId::Yahoo;

        let body = quote(&yahoo_quote);

        let keys = body
            .as_object()
            .map(|map| map.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        assert_eq!(
            keys,
            [
                "change",
                "changePercent",
                "high",
                "latestTradingDay",
                "low",
                "open",
                "previousClose",
                "price",
                "symbol",
                "volume",
            ]
        );
        assert_eq!(body["price"], json!(420));
        assert_eq!(body["open"], json!(0));
        assert_eq!(body["latestTradingDay"], Value::Null);
        assert_eq!(body["symbol"], json!("AAPL"));
    }

    #[test]
    fn zero_employees_is_null() {
        let body = overview(&snapshot_with(
            Capability::Overview,
            FieldMap::new().with("employees", Field::Number(Some(0.0))),
        ));
        assert_eq!(body["employees"], Value::Null);
    }

    #[test]
    fn market_data_keeps_uncomputed_change_null() {
        let cached = Cached {
            snapshot: snapshot_with(
                Capability::MarketData,
                FieldMap::new()
                    .with("price", Field::Number(Some(187.5)))
                    .with("change", Field::Number(Some(1.5)))
                    .with("changePercent", Field::Number(None))
                    .with("volume", Field::Number(Some(1234.9))),
            ),
            last_updated: UtcDateTime::now(),
            status: CacheStatus::Hit,
        };

        let body = market_data(&cached);

        assert_eq!(body["price"], json!(187.5));
        assert_eq!(body["change"], json!(1.5));
        assert_eq!(body["changePercent"], Value::Null);
        assert_eq!(body["volume"], json!(1234));
        assert_eq!(body["source"], json!("Polygon"));
        assert_eq!(body["cached"], json!(true));
    }
}
