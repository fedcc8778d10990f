//! Shaping of joined records into search documents.
//!
//! Staging identifiers and foreign keys that the embedding makes redundant are
//! removed, and the numeric fields the mapping declares as integers are
//! coerced from the strings the source delivers.

use centric_etl_shared::{Record, SequenceCentric};
use serde_json::Value;

/// Store-internal identifier removed from every embedded record.
const INTERNAL_ID: &str = "_id";

const SEQUENCE_OMITTED: [&str; 2] = [INTERNAL_ID, "sample_id"];
const FILE_OMITTED: [&str; 2] = [INTERNAL_ID, "sequence_id"];
const SAMPLE_OMITTED: [&str; 2] = [INTERNAL_ID, "host_id"];
const HOST_OMITTED: [&str; 3] = [INTERNAL_ID, "collection_ids", "data_source_id"];

const SEQUENCE_INTEGER_FIELDS: [&str; 2] = ["consensus_genome_length", "number_base_pairs_sequenced"];
const HOST_INTEGER_FIELDS: [&str; 1] = ["number_of_vaccine_doses_received"];

/// Read the leading integer of a value.
///
/// Strings are read like a lenient integer parser: optional surrounding
/// whitespace and sign, then the leading run of digits (`"12 kb"` is 12).
/// Numbers are truncated toward zero. Anything without a leading digit,
/// including `""` and `"N/A"`, has no integer value.
pub fn to_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => {
            let trimmed = s.trim_start();
            let (negative, rest) = match trimmed.as_bytes().first() {
                Some(b'-') => (true, &trimmed[1..]),
                Some(b'+') => (false, &trimmed[1..]),
                _ => (false, trimmed),
            };
            let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
            if digits_len == 0 {
                return None;
            }
            let magnitude: i64 = rest[..digits_len].parse().ok()?;
            Some(if negative { -magnitude } else { magnitude })
        }
        _ => None,
    }
}

/// Text form of a scalar identifier, as used for joins.
pub fn id_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn omit(mut record: Record, fields: &[&str]) -> Record {
    for field in fields {
        record.remove(*field);
    }
    record
}

/// Replace each field by its integer value, dropping it when there is none.
fn coerce_integers(record: &mut Record, fields: &[&str]) {
    for field in fields {
        if let Some(value) = record.remove(*field) {
            if let Some(n) = to_integer(&value) {
                record.insert(field.to_string(), Value::from(n));
            }
        }
    }
}

/// Assemble the denormalized document of one sequence.
///
/// Returns `None` when the sequence has no string `sequence_id`.
pub fn build_document(
    sequence: Record,
    files: Vec<Record>,
    sample: Record,
    host: Record,
    collections: Vec<Record>,
    data_source: Option<Record>,
) -> Option<SequenceCentric> {
    let mut sequence = omit(sequence, &SEQUENCE_OMITTED);
    coerce_integers(&mut sequence, &SEQUENCE_INTEGER_FIELDS);

    let files = files
        .into_iter()
        .map(|file| omit(file, &FILE_OMITTED))
        .collect();

    let sample = omit(sample, &SAMPLE_OMITTED);

    let mut host = omit(host, &HOST_OMITTED);
    coerce_integers(&mut host, &HOST_INTEGER_FIELDS);

    let collections = collections
        .into_iter()
        .map(|collection| omit(collection, &[INTERNAL_ID]))
        .collect();
    let data_source = data_source.map(|source| omit(source, &[INTERNAL_ID]));

    SequenceCentric::new(sequence, files, sample, host, collections, data_source)
}
