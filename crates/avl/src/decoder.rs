// ai
//! 🧬 Record decoder: Avro object container files in, [`Record`]s out, one pull at a time.
//!
//! 🧠 Knowledge graph:
//! - `apache_avro::Reader` parses the header eagerly and then walks the block
//!   structure lazily. We never hold more than one block in memory.
//! - Each pull is one of three things: a record, a skipped record (non-fatal),
//!   or exhaustion. A broken header fails [`RecordDecoder::new`]; a broken block
//!   fails the pull that hits it.
//! - Avro values are lifted into [`FieldValue`] with the writer schema in hand,
//!   so a union can say which branch it took: `{"string": "p1"}`. The normalizer
//!   downstream peels those wrappers off.
//!
//! ⚠️ `apache_avro::Reader` stops for good after the first error it hits (a bad
//! sync marker, a short block, a codec that won't decompress, a datum that lost
//! its framing). Nothing past that point is trustworthy, so it surfaces as
//! [`PipelineError::StreamMalformed`]. Only a well-framed value that just isn't a
//! record gets skipped. 🦆

use std::collections::{BTreeMap, HashMap};
use std::io::Read;

use apache_avro::schema::{Name, Schema};
use apache_avro::types::Value;
use apache_avro::Reader;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{trace, warn};

use crate::common::{FieldValue, Record};
use crate::errors::PipelineError;

/// 🧯 This many failed pulls in a row and we stop pretending the stream is fine.
const MAX_CONSECUTIVE_FAILURES: usize = 64;

/// 🎣 What one pull brought up.
#[derive(Debug, Clone, PartialEq)]
pub enum Pull {
    Record(Record),
    /// 🗑️ One datum that couldn't become a record. The reason is for the logs.
    Skipped(String),
    /// 🏁 Nothing left. Further pulls keep saying this.
    Exhausted,
}

/// 🧬 Streaming decoder over a single container file. Not restartable, not shareable.
pub struct RecordDecoder {
    reader: Reader<'static, Box<dyn Read + Send>>,
    schema: Schema,
    named: HashMap<String, Schema>,
    locator: String,
    consecutive_failures: usize,
    exhausted: bool,
}

impl std::fmt::Debug for RecordDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordDecoder")
            .field("locator", &self.locator)
            .field("consecutive_failures", &self.consecutive_failures)
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}

impl RecordDecoder {
    /// 🚪 Read the header. Magic bytes, schema, codec, sync marker. Garbage here is fatal.
    pub fn new(stream: Box<dyn Read + Send>, locator: &str) -> Result<Self, PipelineError> {
        let reader = Reader::new(stream).map_err(|err| PipelineError::StreamMalformed {
            locator: locator.to_string(),
            reason: err.to_string(),
        })?;
        let schema = reader.writer_schema().clone();
        let mut named = HashMap::new();
        collect_named(&schema, &mut named);
        trace!(
            "🧬 opened container '{}' with {} named schema(s)",
            locator,
            named.len()
        );
        Ok(Self {
            reader,
            schema,
            named,
            locator: locator.to_string(),
            consecutive_failures: 0,
            exhausted: false,
        })
    }

    pub fn writer_schema(&self) -> &Schema {
        &self.schema
    }

    /// 🎣 Pull the next datum off the stream.
    pub fn pull(&mut self) -> Result<Pull, PipelineError> {
        if self.exhausted {
            return Ok(Pull::Exhausted);
        }
        let the_pull = match self.reader.next() {
            None => {
                self.exhausted = true;
                return Ok(Pull::Exhausted);
            }
            Some(Err(err)) => {
                self.exhausted = true;
                return Err(PipelineError::StreamMalformed {
                    locator: self.locator.clone(),
                    reason: format!("corrupt block: {err}"),
                });
            }
            Some(Ok(value)) => self.lift_top_level(value),
        };

        if matches!(the_pull, Pull::Skipped(_)) {
            self.consecutive_failures += 1;
            if self.consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                warn!(
                    "🧯 '{}' produced {} non-record values in a row, giving up on it",
                    self.locator, self.consecutive_failures
                );
                self.exhausted = true;
                return Err(PipelineError::StreamMalformed {
                    locator: self.locator.clone(),
                    reason: format!(
                        "{} consecutive values were not records",
                        self.consecutive_failures
                    ),
                });
            }
        } else {
            self.consecutive_failures = 0;
        }
        Ok(the_pull)
    }

    fn lift_top_level(&self, value: Value) -> Pull {
        match value {
            Value::Record(_) | Value::Map(_) => {
                match lift(value, Some(&self.schema), &self.named) {
                    FieldValue::Map(fields) => Pull::Record(fields),
                    other => Pull::Skipped(format!(
                        "top-level value lifted to {} instead of a field mapping",
                        other.kind()
                    )),
                }
            }
            other => Pull::Skipped(format!(
                "top-level value is {} instead of a record",
                value_type_name(&other)
            )),
        }
    }
}

impl Iterator for RecordDecoder {
    type Item = Result<Pull, PipelineError>;

    /// 🔁 Same as [`RecordDecoder::pull`] but stops at `Exhausted`, for `for` loops and tests.
    fn next(&mut self) -> Option<Self::Item> {
        match self.pull() {
            Ok(Pull::Exhausted) => None,
            other => Some(other),
        }
    }
}

fn full_name(name: &Name) -> String {
    match &name.namespace {
        Some(ns) if !ns.is_empty() => format!("{}.{}", ns, name.name),
        _ => name.name.clone(),
    }
}

/// 📇 Index every named type in the schema so `Ref`s can be resolved while lifting.
fn collect_named(schema: &Schema, named: &mut HashMap<String, Schema>) {
    match schema {
        Schema::Record(rs) => {
            named.insert(full_name(&rs.name), schema.clone());
            named
                .entry(rs.name.name.clone())
                .or_insert_with(|| schema.clone());
            for field in &rs.fields {
                collect_named(&field.schema, named);
            }
        }
        Schema::Enum(es) => {
            named.insert(full_name(&es.name), schema.clone());
        }
        Schema::Fixed(fs) => {
            named.insert(full_name(&fs.name), schema.clone());
        }
        Schema::Union(us) => {
            for variant in us.variants() {
                collect_named(variant, named);
            }
        }
        _ => {}
    }
}

fn resolve<'a>(schema: &'a Schema, named: &'a HashMap<String, Schema>) -> &'a Schema {
    match schema {
        Schema::Ref { name } => named
            .get(&full_name(name))
            .or_else(|| named.get(&name.name))
            .unwrap_or(schema),
        other => other,
    }
}

/// 🏷️ The name a union branch goes by. Primitives by type name, named types by full name.
fn branch_name(schema: &Schema) -> Option<String> {
    let the_name = match schema {
        Schema::Null => "null".to_string(),
        Schema::Boolean => "boolean".to_string(),
        Schema::Int => "int".to_string(),
        Schema::Long => "long".to_string(),
        Schema::Float => "float".to_string(),
        Schema::Double => "double".to_string(),
        Schema::Bytes => "bytes".to_string(),
        Schema::String => "string".to_string(),
        Schema::Array(_) => "array".to_string(),
        Schema::Map(_) => "map".to_string(),
        Schema::Record(rs) => full_name(&rs.name),
        Schema::Enum(es) => full_name(&es.name),
        Schema::Fixed(fs) => full_name(&fs.name),
        Schema::Ref { name } => full_name(name),
        Schema::Date => "int.date".to_string(),
        Schema::TimeMillis => "int.time-millis".to_string(),
        Schema::TimeMicros => "long.time-micros".to_string(),
        Schema::TimestampMillis => "long.timestamp-millis".to_string(),
        Schema::TimestampMicros => "long.timestamp-micros".to_string(),
        Schema::Uuid => "string.uuid".to_string(),
        _ => return None,
    };
    Some(the_name)
}

/// 🔎 Fallback branch naming when the schema isn't around to ask.
fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Boolean(_) => "boolean",
        Value::Int(_) => "int",
        Value::Long(_) => "long",
        Value::Float(_) => "float",
        Value::Double(_) => "double",
        Value::Bytes(_) => "bytes",
        Value::String(_) => "string",
        Value::Fixed(..) => "fixed",
        Value::Enum(..) => "enum",
        Value::Union(..) => "union",
        Value::Array(_) => "array",
        Value::Map(_) => "map",
        Value::Record(_) => "record",
        Value::Date(_) => "int.date",
        Value::TimeMillis(_) => "int.time-millis",
        Value::TimeMicros(_) => "long.time-micros",
        Value::TimestampMillis(_) => "long.timestamp-millis",
        Value::TimestampMicros(_) => "long.timestamp-micros",
        Value::Uuid(_) => "string.uuid",
        _ => "value",
    }
}

/// 🪜 Avro value → FieldValue, guided by the schema when we have one.
fn lift(value: Value, schema: Option<&Schema>, named: &HashMap<String, Schema>) -> FieldValue {
    let schema = schema.map(|s| resolve(s, named));
    match value {
        Value::Null => FieldValue::Null,
        Value::Boolean(b) => FieldValue::Boolean(b),
        Value::Int(i) | Value::Date(i) | Value::TimeMillis(i) => FieldValue::Integer(i64::from(i)),
        Value::Long(l)
        | Value::TimeMicros(l)
        | Value::TimestampMillis(l)
        | Value::TimestampMicros(l) => FieldValue::Integer(l),
        Value::Float(f) => FieldValue::Float(f64::from(f)),
        Value::Double(d) => FieldValue::Float(d),
        Value::Bytes(bytes) | Value::Fixed(_, bytes) => FieldValue::String(STANDARD.encode(bytes)),
        Value::String(s) | Value::Enum(_, s) => FieldValue::String(s),
        Value::Uuid(uuid) => FieldValue::String(uuid.to_string()),
        Value::Union(index, inner) => {
            if matches!(*inner, Value::Null) {
                return FieldValue::Null;
            }
            let the_branch = match schema {
                Some(Schema::Union(us)) => us.variants().get(index as usize),
                _ => None,
            };
            let the_tag = the_branch
                .and_then(branch_name)
                .unwrap_or_else(|| value_type_name(&inner).to_string());
            let mut the_wrapper = BTreeMap::new();
            the_wrapper.insert(the_tag, lift(*inner, the_branch, named));
            FieldValue::Map(the_wrapper)
        }
        Value::Array(items) => {
            FieldValue::Array(items.into_iter().map(|v| lift(v, None, named)).collect())
        }
        Value::Map(entries) => FieldValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k, lift(v, None, named)))
                .collect(),
        ),
        Value::Record(fields) => {
            let the_field_schemas: HashMap<&str, &Schema> = match schema {
                Some(Schema::Record(rs)) => rs
                    .fields
                    .iter()
                    .map(|f| (f.name.as_str(), &f.schema))
                    .collect(),
                _ => HashMap::new(),
            };
            let mut the_map = BTreeMap::new();
            for (name, v) in fields {
                let the_lifted = lift(v, the_field_schemas.get(name.as_str()).copied(), named);
                the_map.insert(name, the_lifted);
            }
            FieldValue::Map(the_map)
        }
        // -- 🧪 decimals, durations and friends: let apache_avro pick their JSON costume
        other => match serde_json::Value::try_from(other) {
            Ok(json) => FieldValue::from(json),
            Err(err) => {
                trace!("🤷 value with no JSON form, lifting as null: {}", err);
                FieldValue::Null
            }
        },
    }
}
