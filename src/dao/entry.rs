//! Leaderboard entries: immutable, ordered field → value records.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scalar value stored under a field of an [`Entry`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Integral number.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Free-form text.
    Str(String),
}

impl FieldValue {
    /// Numeric view of the value, `None` for strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(value) => Some(*value as f64),
            FieldValue::Float(value) => Some(*value),
            FieldValue::Str(_) => None,
        }
    }

    /// Value used when ranking: non-numeric values count as zero.
    pub fn as_score(&self) -> f64 {
        match self.as_f64() {
            Some(value) if value.is_nan() => 0.0,
            // Adding zero folds -0.0 into 0.0 so both rank as equal.
            Some(value) => value + 0.0,
            None => 0.0,
        }
    }

    /// NaN and infinities become `0.0`, the score they rank with, so every
    /// stored value survives a JSON round trip.
    fn normalized(self) -> Self {
        match self {
            FieldValue::Float(value) if !value.is_finite() => FieldValue::Float(0.0),
            other => other,
        }
    }

    /// Short name of the variant, used in conversion errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Int(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::Str(_) => "string",
        }
    }
}

/// Numbers compare by value across variants, strings only match strings.
impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldValue::Int(a), FieldValue::Int(b)) => a == b,
            (FieldValue::Str(a), FieldValue::Str(b)) => a == b,
            (FieldValue::Str(_), _) | (_, FieldValue::Str(_)) => false,
            (FieldValue::Float(a), FieldValue::Float(b)) => a == b,
            (FieldValue::Int(int), FieldValue::Float(float))
            | (FieldValue::Float(float), FieldValue::Int(int)) => int_equals_float(*int, *float),
        }
    }
}

/// Exact comparison: no rounding of large integers through `f64`.
fn int_equals_float(int: i64, float: f64) -> bool {
    // i64::MIN is exactly representable, i64::MAX rounds up to 2^63.
    float.fract() == 0.0
        && float >= i64::MIN as f64
        && float < i64::MAX as f64
        && float as i64 == int
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(value) => write!(f, "{value}"),
            FieldValue::Float(value) if value.is_finite() && value.fract() == 0.0 => {
                write!(f, "{value:.1}")
            }
            FieldValue::Float(value) => write!(f, "{value}"),
            FieldValue::Str(value) => f.write_str(value),
        }
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(value.into())
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Int(value.into())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        FieldValue::Float(value.into())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(value)
    }
}

/// Raised when a field cannot be read as the requested type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot convert field `{field}` from {from} to {to}")]
pub struct ConversionError {
    /// Name of the field being read.
    pub field: String,
    /// Stored value type.
    pub from: &'static str,
    /// Requested type.
    pub to: &'static str,
}

/// Types an entry field can be read as through [`Entry::get_as`].
pub trait FromFieldValue: Sized {
    /// Human readable name of the target type.
    const TYPE_NAME: &'static str;

    /// Convert a stored value, returning `None` when no conversion rule applies.
    fn from_field_value(value: &FieldValue) -> Option<Self>;
}

impl FromFieldValue for i32 {
    const TYPE_NAME: &'static str = "i32";

    fn from_field_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Int(v) => Some(*v as i32),
            FieldValue::Float(v) => Some(*v as i32),
            FieldValue::Str(_) => None,
        }
    }
}

impl FromFieldValue for i64 {
    const TYPE_NAME: &'static str = "i64";

    fn from_field_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Int(v) => Some(*v),
            FieldValue::Float(v) => Some(*v as i64),
            FieldValue::Str(_) => None,
        }
    }
}

impl FromFieldValue for f64 {
    const TYPE_NAME: &'static str = "f64";

    fn from_field_value(value: &FieldValue) -> Option<Self> {
        value.as_f64()
    }
}

impl FromFieldValue for String {
    const TYPE_NAME: &'static str = "string";

    fn from_field_value(value: &FieldValue) -> Option<Self> {
        Some(value.to_string())
    }
}

/// One ranked record of a leaderboard.
///
/// Field order follows insertion order and only matters for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Entry {
    fields: IndexMap<String, FieldValue>,
}

impl Entry {
    /// Start building a new entry.
    pub fn builder() -> EntryBuilder {
        EntryBuilder::default()
    }

    /// Raw value stored under `field`.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Read `field` converted to `T`.
    ///
    /// Returns `Ok(None)` when the field is absent.
    pub fn get_as<T: FromFieldValue>(&self, field: &str) -> Result<Option<T>, ConversionError> {
        let Some(value) = self.fields.get(field) else {
            return Ok(None);
        };

        T::from_field_value(value)
            .map(Some)
            .ok_or_else(|| ConversionError {
                field: field.to_owned(),
                from: value.type_name(),
                to: T::TYPE_NAME,
            })
    }

    /// Whether `field` holds a value equal to `value`.
    pub fn matches(&self, field: &str, value: &FieldValue) -> bool {
        self.get(field).is_some_and(|stored| stored == value)
    }

    /// Ranking score stored under `field`, zero when absent or non-numeric.
    pub fn score(&self, field: &str) -> f64 {
        self.get(field).map_or(0.0, FieldValue::as_score)
    }

    /// Read-only ordered view of every field.
    pub fn as_map(&self) -> &IndexMap<String, FieldValue> {
        &self.fields
    }

    /// Number of fields in the entry.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the entry carries no field at all.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Builder pre-filled with every field of this entry.
    pub fn to_builder(&self) -> EntryBuilder {
        EntryBuilder {
            fields: self.fields.clone(),
        }
    }
}

impl FromIterator<(String, FieldValue)> for Entry {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Entry::builder(), |builder, (name, value)| {
                builder.field(name, value)
            })
            .build()
    }
}

/// Incremental builder for [`Entry`].
#[derive(Debug, Clone, Default)]
pub struct EntryBuilder {
    fields: IndexMap<String, FieldValue>,
}

impl EntryBuilder {
    /// Set `name` to `value`; a later call for the same name wins.
    ///
    /// Non-finite floats are stored as `0.0`.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into().normalized());
        self
    }

    /// Finalize the entry.
    pub fn build(self) -> Entry {
        Entry {
            fields: self.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_map_keeps_insertion_order() {
        let entry = Entry::builder().field("a", 1).field("b", "x").build();

        let pairs: Vec<_> = entry.as_map().iter().collect();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0], (&"a".to_string(), &FieldValue::Int(1)));
        assert_eq!(pairs[1], (&"b".to_string(), &FieldValue::Str("x".into())));
    }

    #[test]
    fn last_write_wins_and_keeps_position() {
        let entry = Entry::builder()
            .field("player", "Steve")
            .field("kills", 1)
            .field("player", "Alex")
            .build();

        assert_eq!(entry.get("player"), Some(&FieldValue::from("Alex")));
        assert_eq!(entry.as_map().get_index(0).map(|(k, _)| k.as_str()), Some("player"));
        assert_eq!(entry.len(), 2);
    }

    #[test]
    fn numeric_equality_crosses_variants() {
        assert_eq!(FieldValue::Int(5), FieldValue::Float(5.0));
        assert_ne!(FieldValue::Int(5), FieldValue::Float(5.5));
        assert_ne!(FieldValue::Int(5), FieldValue::Str("5".into()));
    }

    #[test]
    fn large_integers_do_not_round_into_floats() {
        assert_ne!(
            FieldValue::Int(9_007_199_254_740_993),
            FieldValue::Float(9_007_199_254_740_992.0)
        );
        assert_eq!(
            FieldValue::Float(9_007_199_254_740_992.0),
            FieldValue::Int(9_007_199_254_740_992)
        );
        assert_ne!(FieldValue::Int(i64::MAX), FieldValue::Float(i64::MAX as f64));
        assert_eq!(FieldValue::Int(i64::MIN), FieldValue::Float(i64::MIN as f64));
        assert_ne!(FieldValue::Int(0), FieldValue::Float(f64::NAN));
    }

    #[test]
    fn non_finite_floats_are_stored_as_zero() {
        let entry = Entry::builder()
            .field("player", "Steve")
            .field("kills", f64::INFINITY)
            .field("deaths", f64::NEG_INFINITY)
            .field("kd", f64::NAN)
            .build();

        for field in ["kills", "deaths", "kd"] {
            assert_eq!(entry.get(field), Some(&FieldValue::Float(0.0)));
        }

        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"player":"Steve","kills":0.0,"deaths":0.0,"kd":0.0}"#);
        let back: Entry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn get_as_converts_numbers() {
        let entry = Entry::builder()
            .field("kills", 150)
            .field("ratio", 2.75)
            .build();

        assert_eq!(entry.get_as::<i64>("kills"), Ok(Some(150)));
        assert_eq!(entry.get_as::<f64>("kills"), Ok(Some(150.0)));
        assert_eq!(entry.get_as::<i32>("ratio"), Ok(Some(2)));
        assert_eq!(entry.get_as::<String>("ratio"), Ok(Some("2.75".into())));
        assert_eq!(entry.get_as::<i64>("missing"), Ok(None));
    }

    #[test]
    fn get_as_rejects_text_to_number() {
        let entry = Entry::builder().field("player", "Steve").build();

        let err = entry.get_as::<f64>("player").unwrap_err();
        assert_eq!(err.field, "player");
        assert_eq!(err.from, "string");
        assert_eq!(err.to, "f64");
        assert_eq!(entry.get_as::<String>("player"), Ok(Some("Steve".into())));
    }

    #[test]
    fn integral_floats_render_with_fraction() {
        assert_eq!(FieldValue::Float(15.0).to_string(), "15.0");
        assert_eq!(FieldValue::Int(15).to_string(), "15");
    }

    #[test]
    fn score_treats_text_and_nan_as_zero() {
        let entry = Entry::builder()
            .field("name", "x")
            .field("nan", f64::NAN)
            .build();

        assert_eq!(entry.score("name"), 0.0);
        assert_eq!(entry.score("nan"), 0.0);
        assert_eq!(entry.score("absent"), 0.0);
    }

    #[test]
    fn serializes_as_flat_object() {
        let entry = Entry::builder()
            .field("player", "Steve")
            .field("kills", 150)
            .field("kd", 1.5)
            .build();

        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"player":"Steve","kills":150,"kd":1.5}"#);

        let back: Entry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
