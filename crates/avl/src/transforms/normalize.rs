// ai
//! 🧹 Record Normalizer: taking the parkas off every field, then teaching the strings some math.
//!
//! 🎬 COLD OPEN: INT. CUSTOMS CHECKPOINT, 2:47 AM
//!
//! The record arrives wearing a union on every field. `{"string": "p1"}`.
//! `{"long": 42}`. `{"string": "12.5"}`: a price, dressed as a string, dressed
//! as a union. Customs has seen this before. Customs has a two-step process.
//!
//! 1. **Unwrap.** Every field whose value is a single-entry map keyed by a
//!    recognized type tag gets replaced by the value inside.
//! 2. **Coerce.** Every field named in the [`CoercionTable`] whose value is (now)
//!    a string gets parsed per its [`CoercionRule`]. If the parse fails, the
//!    string stays. No error, no drama, just a named [`CoercionOutcome`].
//!
//! Both passes are idempotent. Run it twice and the second run is a no-op.
//!
//! 🦆 The duck wore a union once. It did not enjoy it.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::trace;

use crate::common::{FieldValue, Record};

/// 📜 What to do with a stringly-typed field.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CoercionRule {
    /// 🔢 parse as a signed 64-bit integer
    Integer,
    /// 🌊 parse as a 64-bit float
    Float,
    /// 🙅 leave it exactly as it is
    Keep,
}

/// 🗺️ Field name → rule. Static per deployment, loaded from config.
pub type CoercionTable = BTreeMap<String, CoercionRule>;

/// 🏷️ Did the unwrap pass do anything to this value?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnwrapOutcome {
    Unwrapped,
    Untouched,
}

/// 🏷️ What the coercion pass did to a value. Three doors, all named.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoercionOutcome {
    /// ✅ string parsed and replaced by the number
    Coerced,
    /// 🤷 it was a string, it did not parse, it is still a string
    LeftAsString,
    /// 🚫 not a string, or the rule is `keep`: nothing was attempted
    NotApplicable,
}

/// 📊 Per-record tally of what normalization actually did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub unwrapped: usize,
    pub coerced: usize,
    pub left_as_string: usize,
}

/// 🏷️ Unwraps a tagged scalar in place.
///
/// Recognized: a map with exactly one entry whose tag matches its contents:
/// `string`/`bytes` around a string, `long`/`int` around an integer,
/// `double`/`float` around a float, `boolean` around a bool. Anything else,
/// including a tag we don't know or a tag that lies about its contents, is
/// left exactly where it was.
pub fn unwrap_tagged(value: &mut FieldValue) -> UnwrapOutcome {
    let the_inner = match value {
        FieldValue::Map(wrapper) if wrapper.len() == 1 => match wrapper.iter().next() {
            Some((tag, inner)) if tag_matches(tag, inner) => inner.clone(),
            _ => return UnwrapOutcome::Untouched,
        },
        _ => return UnwrapOutcome::Untouched,
    };
    *value = the_inner;
    UnwrapOutcome::Unwrapped
}

fn tag_matches(tag: &str, inner: &FieldValue) -> bool {
    matches!(
        (tag, inner),
        ("string" | "bytes", FieldValue::String(_))
            | ("long" | "int", FieldValue::Integer(_))
            | ("double" | "float", FieldValue::Float(_))
            | ("boolean", FieldValue::Boolean(_))
    )
}

/// 🔢 Applies one coercion rule to one value, in place.
///
/// Only strings are candidates. Parsing is exact (`" 12"` is not an integer),
/// and floats that come out as `NaN` or infinite count as failures, since JSON
/// has no way to say either.
pub fn coerce(value: &mut FieldValue, rule: CoercionRule) -> CoercionOutcome {
    let FieldValue::String(the_raw) = value else {
        return CoercionOutcome::NotApplicable;
    };

    let the_parsed = match rule {
        CoercionRule::Keep => return CoercionOutcome::NotApplicable,
        CoercionRule::Integer => the_raw.parse::<i64>().ok().map(FieldValue::Integer),
        CoercionRule::Float => the_raw
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(FieldValue::Float),
    };

    match the_parsed {
        Some(the_number) => {
            *value = the_number;
            CoercionOutcome::Coerced
        }
        None => CoercionOutcome::LeftAsString,
    }
}

/// 🧹 The normalizer: one coercion table, applied to one record at a time.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    table: CoercionTable,
}

impl Normalizer {
    pub fn new(table: CoercionTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &CoercionTable {
        &self.table
    }

    /// 🔄 Unwrap every field, then coerce the ones the table names. Mutates in place.
    ///
    /// Pure with respect to everything but the record. The `BTreeMap` walks
    /// fields in sorted order, so the same input always takes the same path.
    pub fn normalize(&self, record: &mut Record) -> NormalizeReport {
        let mut the_report = NormalizeReport::default();

        for value in record.values_mut() {
            if unwrap_tagged(value) == UnwrapOutcome::Unwrapped {
                the_report.unwrapped += 1;
            }
        }

        for (field, rule) in &self.table {
            let Some(value) = record.get_mut(field) else {
                continue;
            };
            match coerce(value, *rule) {
                CoercionOutcome::Coerced => the_report.coerced += 1,
                CoercionOutcome::LeftAsString => {
                    // -- 🤷 silent by contract. trace is as loud as this gets.
                    trace!("🤷 field '{}' kept its string, {:?} parse said no", field, rule);
                    the_report.left_as_string += 1;
                }
                CoercionOutcome::NotApplicable => {}
            }
        }

        the_report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::tagged;

    fn products_table() -> CoercionTable {
        CoercionTable::from([
            ("price".to_string(), CoercionRule::Float),
            ("stock".to_string(), CoercionRule::Integer),
            ("sku".to_string(), CoercionRule::Keep),
        ])
    }

    #[test]
    fn the_one_where_every_known_tag_takes_off_its_parka() {
        let mut the_cases = vec![
            (tagged("string", "p1"), FieldValue::from("p1")),
            (tagged("bytes", "AAE="), FieldValue::from("AAE=")),
            (tagged("long", 42i64), FieldValue::Integer(42)),
            (tagged("int", 7i64), FieldValue::Integer(7)),
            (tagged("double", 1.5), FieldValue::Float(1.5)),
            (tagged("float", 0.25), FieldValue::Float(0.25)),
            (tagged("boolean", true), FieldValue::Boolean(true)),
        ];
        for (value, expected) in the_cases.iter_mut() {
            assert_eq!(unwrap_tagged(value), UnwrapOutcome::Unwrapped);
            assert_eq!(value, expected);
        }
    }

    #[test]
    fn the_one_where_strangers_and_liars_keep_their_coats_on() {
        // -- unknown tag
        let mut the_stranger = tagged("com.acme.Money", "12");
        assert_eq!(unwrap_tagged(&mut the_stranger), UnwrapOutcome::Untouched);
        assert_eq!(the_stranger, tagged("com.acme.Money", "12"));

        // -- known tag, wrong contents
        let mut the_liar = tagged("long", "not a long");
        assert_eq!(unwrap_tagged(&mut the_liar), UnwrapOutcome::Untouched);

        // -- two entries is a real map, not a union
        let mut the_real_map = FieldValue::Map(BTreeMap::from([
            ("string".to_string(), FieldValue::from("a")),
            ("long".to_string(), FieldValue::Integer(1)),
        ]));
        assert_eq!(unwrap_tagged(&mut the_real_map), UnwrapOutcome::Untouched);

        // -- already a scalar
        let mut the_plain = FieldValue::from("plain");
        assert_eq!(unwrap_tagged(&mut the_plain), UnwrapOutcome::Untouched);
    }

    #[test]
    fn the_one_where_valid_strings_become_numbers() {
        let mut the_price = FieldValue::from("12.5");
        assert_eq!(coerce(&mut the_price, CoercionRule::Float), CoercionOutcome::Coerced);
        assert_eq!(the_price, FieldValue::Float(12.5));

        let mut the_stock = FieldValue::from("-17");
        assert_eq!(coerce(&mut the_stock, CoercionRule::Integer), CoercionOutcome::Coerced);
        assert_eq!(the_stock, FieldValue::Integer(-17));

        let mut the_whole_float = FieldValue::from("3");
        assert_eq!(coerce(&mut the_whole_float, CoercionRule::Float), CoercionOutcome::Coerced);
        assert_eq!(the_whole_float, FieldValue::Float(3.0));
    }

    #[test]
    fn the_one_where_unparseable_strings_stay_strings() {
        for (raw, rule) in [
            ("bad", CoercionRule::Float),
            ("NaN", CoercionRule::Float),
            ("inf", CoercionRule::Float),
            ("12.5", CoercionRule::Integer),
            (" 12", CoercionRule::Integer),
            ("", CoercionRule::Integer),
        ] {
            let mut the_value = FieldValue::from(raw);
            assert_eq!(
                coerce(&mut the_value, rule),
                CoercionOutcome::LeftAsString,
                "'{raw}' under {rule:?} should have been left alone"
            );
            assert_eq!(the_value, FieldValue::from(raw));
        }
    }

    #[test]
    fn the_one_where_non_strings_and_keep_are_not_applicable() {
        let mut the_number = FieldValue::Integer(5);
        assert_eq!(coerce(&mut the_number, CoercionRule::Float), CoercionOutcome::NotApplicable);
        assert_eq!(the_number, FieldValue::Integer(5));

        let mut the_kept = FieldValue::from("007");
        assert_eq!(coerce(&mut the_kept, CoercionRule::Keep), CoercionOutcome::NotApplicable);
        assert_eq!(the_kept, FieldValue::from("007"));
    }

    #[test]
    fn the_one_where_a_whole_record_gets_the_full_treatment() {
        let mut the_record = Record::from([
            ("id".to_string(), tagged("string", "p1")),
            ("price".to_string(), tagged("string", "12.5")),
            ("stock".to_string(), tagged("string", "many")),
            ("sku".to_string(), tagged("string", "0042")),
            ("views".to_string(), tagged("long", 9i64)),
            ("note".to_string(), FieldValue::Null),
        ]);

        let the_report = Normalizer::new(products_table()).normalize(&mut the_record);

        assert_eq!(the_record["id"], FieldValue::from("p1"));
        assert_eq!(the_record["price"], FieldValue::Float(12.5));
        assert_eq!(the_record["stock"], FieldValue::from("many"));
        assert_eq!(the_record["sku"], FieldValue::from("0042"));
        assert_eq!(the_record["views"], FieldValue::Integer(9));
        assert_eq!(the_record["note"], FieldValue::Null);
        assert_eq!(
            the_report,
            NormalizeReport { unwrapped: 5, coerced: 1, left_as_string: 1 }
        );
    }

    #[test]
    fn the_one_where_normalizing_twice_changes_nothing_the_second_time() {
        let the_normalizer = Normalizer::new(products_table());
        let mut the_record = Record::from([
            ("price".to_string(), tagged("string", "9.99")),
            ("stock".to_string(), tagged("string", "3")),
            ("title".to_string(), tagged("string", "lamp")),
        ]);

        the_normalizer.normalize(&mut the_record);
        let the_snapshot = the_record.clone();
        let the_second_report = the_normalizer.normalize(&mut the_record);

        assert_eq!(the_record, the_snapshot);
        assert_eq!(the_second_report.unwrapped, 0);
        assert_eq!(the_second_report.coerced, 0);
        assert!(the_record.values().all(FieldValue::is_scalar));
    }

    #[test]
    fn the_one_where_fields_missing_from_the_record_are_simply_skipped() {
        let mut the_record = Record::from([("title".to_string(), FieldValue::from("lamp"))]);
        let the_report = Normalizer::new(products_table()).normalize(&mut the_record);
        assert_eq!(the_report, NormalizeReport::default());
        assert_eq!(the_record.len(), 1);
    }

    #[test]
    fn the_one_where_rules_deserialize_from_snake_case() {
        let the_table: CoercionTable =
            serde_json::from_str(r#"{"price":"float","stock":"integer","sku":"keep"}"#)
                .expect("💀 coercion table did not parse");
        assert_eq!(the_table, products_table());
    }
}
