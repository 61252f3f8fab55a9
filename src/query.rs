//! Query construction
//!
//! A [`Query`] owns the JSON body of one fetch session and mutates the
//! pagination window per page request. The free functions below build filter
//! clauses (term, terms, wildcard, ranges) and are stateless; callers collect
//! them with [`push_condition`] and assemble the final query in their
//! [`FilterSet`](crate::list::FilterSet) implementation.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value, json};

/// Maximum number of values per `terms` clause before splitting
pub const TERMS_CHUNK_SIZE: usize = 1024;

/// Date format accepted by range clauses
const DATE_RANGE_FORMAT: &str = "yyyy-MM-dd hh:mm:ss||yyyy-MM-dd";

/// The JSON body of one fetch session
///
/// Owned exclusively by the fetcher running the session; the pagination
/// window (`from`/`size`) and the `_source` excludes are rewritten per page.
#[derive(Clone, Debug, Default)]
pub struct Query {
    body: Map<String, Value>,
}

impl Query {
    /// Wrap a query body built from filter input
    ///
    /// Non-object values are ignored and produce an empty body.
    pub fn new(body: Value) -> Self {
        match body {
            Value::Object(map) => Self { body: map },
            _ => Self::default(),
        }
    }

    /// Replace the sort clause
    pub fn set_sort(&mut self, clause: Value) {
        self.body.insert("sort".to_string(), json!([clause]));
    }

    /// Set the pagination window for the next page request
    pub fn set_page(&mut self, from: usize, size: usize) {
        self.body.insert("from".to_string(), json!(from));
        self.body.insert("size".to_string(), json!(size));
    }

    /// Exclude fields from the returned document sources
    pub fn set_source_excludes(&mut self, fields: &[String]) {
        if fields.is_empty() {
            return;
        }
        self.body
            .insert("_source".to_string(), json!({ "excludes": fields }));
    }

    /// The current body as a JSON value
    pub fn to_value(&self) -> Value {
        Value::Object(self.body.clone())
    }

    /// Read back a top-level field (used by logging and tests)
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }
}

/// Append a clause to a condition list when one was built
pub fn push_condition(conditions: &mut Vec<Value>, condition: Option<Value>) {
    if let Some(condition) = condition {
        conditions.push(condition);
    }
}

/// Sort clause for a physical field name
pub fn sort_clause(field: &str, ascending: bool) -> Value {
    let direction = if ascending { "asc" } else { "desc" };
    json!({ field: direction })
}

/// Sort-by-relevance clause
pub fn sort_by_score_clause() -> Value {
    json!({ "sort": ["_score"] })
}

/// Exact-match clause for an integer value
pub fn int_condition(field: &str, value: Option<i64>) -> Option<Value> {
    value.map(|value| json!({ "term": { field: value } }))
}

/// Membership clause for a list of integer values
pub fn ints_condition(field: &str, values: Option<&[i64]>) -> Option<Value> {
    values.map(|values| json!({ "terms": { field: values } }))
}

/// Exact-match clause for a text value; empty input builds nothing
pub fn text_condition(field: &str, text: Option<&str>) -> Option<Value> {
    match text {
        Some(text) if !text.is_empty() => Some(json!({ "term": { field: text } })),
        _ => None,
    }
}

/// Membership clause for string values
///
/// With `must_include_all` the clause requires every value to match
/// (a `bool/must` of single `term` clauses); otherwise any value matches.
pub fn string_values_condition(
    field: &str,
    values: Option<&[String]>,
    must_include_all: bool,
) -> Option<Value> {
    let values = values.filter(|values| !values.is_empty())?;

    if !must_include_all {
        return Some(json!({ "terms": { field: values } }));
    }

    let clauses: Vec<Value> = values
        .iter()
        .map(|value| json!({ "term": { field: value } }))
        .collect();
    Some(json!({ "bool": { "must": clauses } }))
}

/// Free-text clause with wildcard semantics
///
/// Quoted input (`"exact"`) strips the quotes and matches the term exactly.
/// Unquoted input is lowercased and wrapped in `*...*` unless it already
/// contains a wildcard. The field is matched against its `.raw_lowercase`
/// sub-field.
pub fn wildcard_condition(field: &str, text: Option<&str>) -> Option<Value> {
    let text = text.filter(|text| !text.is_empty())?;

    let quoted = text.len() >= 2 && text.starts_with('"') && text.ends_with('"');
    let (term_level_key, search_text) = if quoted {
        ("term", text[1..text.len() - 1].to_string())
    } else if text.contains('*') {
        ("wildcard", text.to_string())
    } else {
        ("wildcard", format!("*{text}*"))
    };

    let field = if field.ends_with(".raw_lowercase") {
        field.to_string()
    } else {
        format!("{field}.raw_lowercase")
    };

    Some(json!({ term_level_key: { field: search_text.to_lowercase() } }))
}

/// Date-range clause over calendar days
///
/// The lower bound is inclusive; the upper bound is widened by one day and
/// made exclusive so the whole final day matches.
pub fn date_range_condition(
    field: &str,
    min_date: Option<NaiveDate>,
    max_date: Option<NaiveDate>,
) -> Option<Value> {
    if min_date.is_none() && max_date.is_none() {
        return None;
    }

    let mut range = Map::new();
    if let Some(min_date) = min_date {
        range.insert("gte".to_string(), json!(min_date.format("%Y-%m-%d").to_string()));
    }
    if let Some(max_date) = max_date
        && let Some(day_after) = max_date.succ_opt()
    {
        range.insert("lt".to_string(), json!(day_after.format("%Y-%m-%d").to_string()));
    }
    range.insert("format".to_string(), json!(DATE_RANGE_FORMAT));

    Some(json!({ "range": { field: Value::Object(range) } }))
}

/// Integer-range clause; only positive bounds participate
pub fn int_range_condition(
    field: &str,
    min_value: Option<i64>,
    max_value: Option<i64>,
) -> Option<Value> {
    if min_value.is_none() && max_value.is_none() {
        return None;
    }

    let mut range = Map::new();
    if let Some(min_value) = min_value.filter(|value| *value > 0) {
        range.insert("gte".to_string(), json!(min_value));
    }
    if let Some(max_value) = max_value.filter(|value| *value > 0) {
        range.insert("lte".to_string(), json!(max_value));
    }

    Some(json!({ "range": { field: Value::Object(range) } }))
}

/// Membership clause for arbitrarily long value lists
///
/// Splits the values into chunks of [`TERMS_CHUNK_SIZE`] and wraps one
/// `terms` clause per chunk in a `bool/should`, staying under the backend's
/// per-clause value limit.
pub fn chunked_terms_condition<T: Serialize>(field: &str, values: &[T]) -> Value {
    let clauses: Vec<Value> = values
        .chunks(TERMS_CHUNK_SIZE)
        .map(|chunk| json!({ "terms": { field: chunk } }))
        .collect();

    json!({ "bool": { "should": clauses } })
}
