//! Metadata filter grammar.
//!
//! Callers may supply either a flat `{key: value}` map (conjunction of
//! equalities) or the nested `{"$and": [{k: v}, ...]}` form some stores
//! require. Both are canonicalized here, before any store call; unknown
//! comparators fail fast.

use crate::core::{MetaValue, Metadata};
use crate::error::FilterError;
use serde_json::Value;
use std::collections::BTreeMap;

/// Canonical metadata filter: a conjunction of key-equality clauses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFilter {
    clauses: BTreeMap<String, MetaValue>,
}

impl MetadataFilter {
    /// Creates an empty filter (matches everything).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a single-clause equality filter.
    #[must_use]
    pub fn equals(key: &str, value: impl Into<MetaValue>) -> Self {
        let mut clauses = BTreeMap::new();
        clauses.insert(key.to_string(), value.into());
        Self { clauses }
    }

    /// Adds an equality clause, builder style.
    #[must_use]
    pub fn and_equals(mut self, key: &str, value: impl Into<MetaValue>) -> Self {
        self.clauses.insert(key.to_string(), value.into());
        self
    }

    /// Parses a caller-supplied JSON filter.
    ///
    /// Accepts the flat form `{"source": "mcd", "state": "CA"}` and the
    /// nested form `{"$and": [{"source": "mcd"}, {"state": "CA"}]}`
    /// (`$and` may nest).
    ///
    /// # Errors
    ///
    /// Returns `FilterError::UnknownComparator` for any other `$`-prefixed
    /// key, and `FilterError::NonScalarValue` for array/object values.
    pub fn parse(value: &Value) -> Result<Self, FilterError> {
        let mut filter = Self::new();
        filter.absorb(value)?;
        Ok(filter)
    }

    fn absorb(&mut self, value: &Value) -> Result<(), FilterError> {
        let Value::Object(map) = value else {
            return Err(FilterError::NonScalarValue {
                key: "<root>".to_string(),
            });
        };
        for (key, val) in map {
            if key == "$and" {
                let Value::Array(parts) = val else {
                    return Err(FilterError::NonScalarValue { key: key.clone() });
                };
                for part in parts {
                    self.absorb(part)?;
                }
            } else if key.starts_with('$') {
                return Err(FilterError::UnknownComparator {
                    comparator: key.clone(),
                });
            } else {
                self.clauses.insert(key.clone(), scalar(key, val)?);
            }
        }
        Ok(())
    }

    /// True when the filter has no clauses.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Number of clauses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// The value this filter pins `key` to, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.clauses.get(key)
    }

    /// The source kind this filter pins, if it pins one.
    #[must_use]
    pub fn pinned_source(&self) -> Option<&str> {
        self.get("source").and_then(MetaValue::as_str)
    }

    /// True when every clause is satisfied by `metadata`.
    #[must_use]
    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.clauses
            .iter()
            .all(|(key, want)| metadata.get(key) == Some(want))
    }

    /// Conjunction of two filters.
    ///
    /// Returns `None` when the filters pin the same key to different
    /// values (an unsatisfiable conjunction).
    #[must_use]
    pub fn and(&self, other: &Self) -> Option<Self> {
        let mut clauses = self.clauses.clone();
        for (key, value) in &other.clauses {
            match clauses.get(key) {
                Some(existing) if existing != value => return None,
                _ => {
                    clauses.insert(key.clone(), value.clone());
                }
            }
        }
        Some(Self { clauses })
    }

    /// Emits the store wire form: flat `{k: v}` for a single clause,
    /// `{"$and": [{k: v}, ...]}` for a conjunction.
    #[must_use]
    pub fn to_store_query(&self) -> Option<Value> {
        match self.clauses.len() {
            0 => None,
            1 => {
                let (key, value) = self.clauses.iter().next()?;
                Some(Value::Object(
                    [(key.clone(), meta_to_json(value))].into_iter().collect(),
                ))
            }
            _ => {
                let parts: Vec<Value> = self
                    .clauses
                    .iter()
                    .map(|(key, value)| {
                        Value::Object([(key.clone(), meta_to_json(value))].into_iter().collect())
                    })
                    .collect();
                Some(Value::Object(
                    [("$and".to_string(), Value::Array(parts))].into_iter().collect(),
                ))
            }
        }
    }
}

/// Merges an optional variant filter with an optional caller filter.
///
/// `None` on either side passes the other through. Returns `None` for a
/// contradictory conjunction (same key pinned to different values), and
/// `Some(effective_filter)` otherwise.
#[must_use]
pub fn merge_filters(
    caller: Option<&MetadataFilter>,
    variant: Option<&MetadataFilter>,
) -> Option<Option<MetadataFilter>> {
    match (caller, variant) {
        (None, None) => Some(None),
        (Some(f), None) | (None, Some(f)) => Some(Some(f.clone())),
        (Some(a), Some(b)) => a.and(b).map(Some),
    }
}

fn scalar(key: &str, value: &Value) -> Result<MetaValue, FilterError> {
    match value {
        Value::String(s) => Ok(MetaValue::Str(s.clone())),
        Value::Number(n) => n.as_i64().map_or_else(
            || {
                n.as_f64().map(MetaValue::Float).ok_or_else(|| FilterError::NonScalarValue {
                    key: key.to_string(),
                })
            },
            |i| Ok(MetaValue::Int(i)),
        ),
        Value::Bool(b) => Ok(MetaValue::Bool(*b)),
        _ => Err(FilterError::NonScalarValue {
            key: key.to_string(),
        }),
    }
}

fn meta_to_json(value: &MetaValue) -> Value {
    match value {
        MetaValue::Str(s) => Value::String(s.clone()),
        MetaValue::Int(i) => Value::from(*i),
        MetaValue::Float(x) => Value::from(*x),
        MetaValue::Bool(b) => Value::from(*b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_flat() {
        let filter = MetadataFilter::parse(&json!({"source": "mcd", "state": "CA"})).unwrap();
        assert_eq!(filter.len(), 2);
        assert_eq!(filter.pinned_source(), Some("mcd"));
        assert_eq!(filter.get("state"), Some(&MetaValue::Str("CA".to_string())));
    }

    #[test]
    fn test_parse_and_form() {
        let filter =
            MetadataFilter::parse(&json!({"$and": [{"source": "mcd"}, {"state": "CA"}]})).unwrap();
        assert_eq!(filter, MetadataFilter::equals("source", "mcd").and_equals("state", "CA"));
    }

    #[test]
    fn test_parse_nested_and() {
        let filter = MetadataFilter::parse(
            &json!({"$and": [{"$and": [{"source": "iom"}]}, {"chapter": 7}]}),
        )
        .unwrap();
        assert_eq!(filter.len(), 2);
        assert_eq!(filter.get("chapter"), Some(&MetaValue::Int(7)));
    }

    #[test]
    fn test_parse_unknown_comparator() {
        let err = MetadataFilter::parse(&json!({"$or": [{"source": "mcd"}]})).unwrap_err();
        assert!(matches!(err, FilterError::UnknownComparator { comparator } if comparator == "$or"));

        let err = MetadataFilter::parse(&json!({"chapter": {"$gte": 3}})).unwrap_err();
        assert!(matches!(err, FilterError::NonScalarValue { .. }));
    }

    #[test]
    fn test_matches() {
        let filter = MetadataFilter::equals("source", "regulations");
        let mut meta = Metadata::new();
        assert!(!filter.matches(&meta));
        meta.insert("source".to_string(), MetaValue::Str("regulations".to_string()));
        assert!(filter.matches(&meta));
        meta.insert("state".to_string(), MetaValue::Str("CA".to_string()));
        assert!(filter.matches(&meta));

        assert!(MetadataFilter::new().matches(&Metadata::new()));
    }

    #[test]
    fn test_and_merge() {
        let a = MetadataFilter::equals("source", "mcd");
        let b = MetadataFilter::equals("state", "CA");
        let merged = a.and(&b).unwrap();
        assert_eq!(merged.len(), 2);

        // Same pin is fine
        assert!(a.and(&a).is_some());

        // Contradictory pins are unsatisfiable
        let c = MetadataFilter::equals("source", "iom");
        assert!(a.and(&c).is_none());
    }

    #[test]
    fn test_merge_filters_optionals() {
        let caller = MetadataFilter::equals("state", "CA");
        let variant = MetadataFilter::equals("source", "forms");

        assert_eq!(merge_filters(None, None), Some(None));
        assert_eq!(merge_filters(Some(&caller), None), Some(Some(caller.clone())));
        let merged = merge_filters(Some(&caller), Some(&variant)).unwrap().unwrap();
        assert_eq!(merged.len(), 2);

        let clash = MetadataFilter::equals("state", "NY");
        assert_eq!(merge_filters(Some(&caller), Some(&clash)), None);
    }

    #[test]
    fn test_to_store_query_grammar() {
        assert_eq!(MetadataFilter::new().to_store_query(), None);

        let single = MetadataFilter::equals("source", "codes");
        assert_eq!(single.to_store_query(), Some(json!({"source": "codes"})));

        let multi = MetadataFilter::equals("source", "codes").and_equals("chapter", 2_i64);
        assert_eq!(
            multi.to_store_query(),
            Some(json!({"$and": [{"chapter": 2}, {"source": "codes"}]}))
        );
    }
}
