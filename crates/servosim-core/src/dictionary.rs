//! Dynamically typed configuration and observation tree.
//!
//! A [`Dictionary`] maps string keys to [`Value`]s. Nested dictionaries act
//! as namespaces: the IMU writes under `imu`, the simulator under `bullet`,
//! and so on. Keys can be addressed as dotted paths (`"reset.floor"`).
//!
//! Typed reads go through [`FromValue`] and fail with
//! [`DictionaryError::TypeMismatch`] rather than coercing silently. The only
//! implicit conversions are integer → float and numeric arrays of length 3
//! or 4 → vector / quaternion (`[w, x, y, z]`), which is how TOML and JSON
//! files spell them.

use std::collections::BTreeMap;
use std::path::Path;

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

use crate::error::{ConfigError, DictionaryError};

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A single entry of a [`Dictionary`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Vector3(Vector3<f64>),
    /// Not necessarily normalized.
    Quaternion(Quaternion<f64>),
    Array(Vec<f64>),
    Dictionary(Dictionary),
}

impl Value {
    /// Short type name used in error messages.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Vector3(_) => "vector3",
            Self::Quaternion(_) => "quaternion",
            Self::Array(_) => "array",
            Self::Dictionary(_) => "dictionary",
        }
    }

    /// JSON rendering. Quaternions are written `[w, x, y, z]`, non-finite
    /// floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Float(x) => serde_json::Value::from(*x),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Vector3(v) => v.iter().copied().map(serde_json::Value::from).collect(),
            Self::Quaternion(q) => [q.w, q.i, q.j, q.k]
                .into_iter()
                .map(serde_json::Value::from)
                .collect(),
            Self::Array(a) => a.iter().copied().map(serde_json::Value::from).collect(),
            Self::Dictionary(d) => d.to_json(),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vector3<f64>> for Value {
    fn from(value: Vector3<f64>) -> Self {
        Self::Vector3(value)
    }
}

impl From<Quaternion<f64>> for Value {
    fn from(value: Quaternion<f64>) -> Self {
        Self::Quaternion(value)
    }
}

impl From<UnitQuaternion<f64>> for Value {
    fn from(value: UnitQuaternion<f64>) -> Self {
        Self::Quaternion(value.into_inner())
    }
}

impl From<Vec<f64>> for Value {
    fn from(value: Vec<f64>) -> Self {
        Self::Array(value)
    }
}

impl From<Dictionary> for Value {
    fn from(value: Dictionary) -> Self {
        Self::Dictionary(value)
    }
}

// ---------------------------------------------------------------------------
// FromValue
// ---------------------------------------------------------------------------

/// Types that can be read out of a [`Value`].
pub trait FromValue: Sized {
    /// Name reported as `expected` on a type mismatch.
    const KIND: &'static str;

    /// Convert, or `None` if the value holds another type.
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for bool {
    const KIND: &'static str = "bool";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromValue for i64 {
    const KIND: &'static str = "int";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl FromValue for i32 {
    const KIND: &'static str = "int";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => Self::try_from(*i).ok(),
            _ => None,
        }
    }
}

impl FromValue for usize {
    const KIND: &'static str = "int";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => Self::try_from(*i).ok(),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    const KIND: &'static str = "float";

    #[allow(clippy::cast_precision_loss)]
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(x) => Some(*x),
            Value::Int(i) => Some(*i as Self),
            _ => None,
        }
    }
}

impl FromValue for String {
    const KIND: &'static str = "string";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromValue for Vector3<f64> {
    const KIND: &'static str = "vector3";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Vector3(v) => Some(*v),
            Value::Array(a) if a.len() == 3 => Some(Self::new(a[0], a[1], a[2])),
            _ => None,
        }
    }
}

impl FromValue for Quaternion<f64> {
    const KIND: &'static str = "quaternion";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Quaternion(q) => Some(*q),
            Value::Array(a) if a.len() == 4 => Some(Self::new(a[0], a[1], a[2], a[3])),
            _ => None,
        }
    }
}

impl FromValue for UnitQuaternion<f64> {
    const KIND: &'static str = "quaternion";

    fn from_value(value: &Value) -> Option<Self> {
        Quaternion::from_value(value)
            .filter(|q| q.norm() > f64::EPSILON)
            .map(Self::from_quaternion)
    }
}

impl FromValue for Vec<f64> {
    const KIND: &'static str = "array";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Array(a) => Some(a.clone()),
            Value::Vector3(v) => Some(v.iter().copied().collect()),
            _ => None,
        }
    }
}

impl FromValue for Dictionary {
    const KIND: &'static str = "dictionary";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Dictionary(d) => Some(d.clone()),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Dictionary
// ---------------------------------------------------------------------------

/// Ordered string-keyed tree of [`Value`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary {
    entries: BTreeMap<String, Value>,
}

impl Dictionary {
    /// Empty dictionary.
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether `path` resolves to a value.
    pub fn has(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    /// Keys at this level, in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries at this level, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Insert at this level, replacing any previous value. Returns the
    /// replaced value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    /// Resolve a dotted path (`"bullet.reset.floor"`).
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.entries.get(first)?;
        for segment in segments {
            match current {
                Value::Dictionary(d) => current = d.entries.get(segment)?,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Nested dictionary at `path`, or `None` if absent or not a dictionary.
    pub fn child(&self, path: &str) -> Option<&Self> {
        match self.lookup(path)? {
            Value::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    /// Nested dictionary at `key`, created if missing.
    ///
    /// A non-dictionary value already stored under `key` is replaced.
    pub fn child_mut(&mut self, key: &str) -> &mut Self {
        let entry = self
            .entries
            .entry(key.to_owned())
            .or_insert_with(|| Value::Dictionary(Self::new()));
        if !matches!(entry, Value::Dictionary(_)) {
            *entry = Value::Dictionary(Self::new());
        }
        match entry {
            Value::Dictionary(d) => d,
            _ => unreachable!("entry was just set to a dictionary"),
        }
    }

    /// Typed read of `path`.
    pub fn get<T: FromValue>(&self, path: &str) -> Result<T, DictionaryError> {
        let value = self
            .lookup(path)
            .ok_or_else(|| DictionaryError::MissingKey(path.to_owned()))?;
        T::from_value(value).ok_or_else(|| DictionaryError::TypeMismatch {
            key: path.to_owned(),
            expected: T::KIND,
            found: value.kind(),
        })
    }

    /// Typed read of `path`, `None` when absent. Present values of the wrong
    /// type are still an error.
    pub fn get_opt<T: FromValue>(&self, path: &str) -> Result<Option<T>, DictionaryError> {
        if self.has(path) {
            self.get(path).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Typed read of `path` with a fallback for absent keys.
    pub fn get_or<T: FromValue>(&self, path: &str, default: T) -> Result<T, DictionaryError> {
        Ok(self.get_opt(path)?.unwrap_or(default))
    }

    /// Recursively copy `other` into `self`. Nested dictionaries are merged,
    /// everything else is overwritten.
    pub fn update(&mut self, other: &Self) {
        for (key, value) in &other.entries {
            match value {
                Value::Dictionary(d) => self.child_mut(key).update(d),
                _ => {
                    self.entries.insert(key.clone(), value.clone());
                }
            }
        }
    }

    /// JSON object rendering of the whole tree.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    // -- Loading --

    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = toml::from_str(content)?;
        Ok(from_toml_table(&table, "")?)
    }

    /// Parse a JSON document. The top level must be an object.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_json::from_str(content)?;
        Ok(Self::from_json(&value)?)
    }

    /// Convert a JSON object.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, DictionaryError> {
        match value {
            serde_json::Value::Object(map) => {
                let mut dict = Self::new();
                for (key, item) in map {
                    dict.entries.insert(key.clone(), json_to_value(item, key)?);
                }
                Ok(dict)
            }
            other => Err(DictionaryError::Unsupported {
                key: String::new(),
                message: format!("top level must be an object, got {other}"),
            }),
        }
    }

    /// Load a `.json` or TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }
}

// ---------------------------------------------------------------------------
// Format conversion helpers
// ---------------------------------------------------------------------------

fn join_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}.{key}")
    }
}

fn from_toml_table(table: &toml::Table, prefix: &str) -> Result<Dictionary, DictionaryError> {
    let mut dict = Dictionary::new();
    for (key, value) in table {
        let path = join_key(prefix, key);
        dict.entries.insert(key.clone(), toml_to_value(value, &path)?);
    }
    Ok(dict)
}

#[allow(clippy::cast_precision_loss)]
fn toml_to_value(value: &toml::Value, path: &str) -> Result<Value, DictionaryError> {
    Ok(match value {
        toml::Value::String(s) => Value::String(s.clone()),
        toml::Value::Integer(i) => Value::Int(*i),
        toml::Value::Float(x) => Value::Float(*x),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Datetime(d) => Value::String(d.to_string()),
        toml::Value::Array(items) => {
            let numbers = items
                .iter()
                .map(|item| match item {
                    toml::Value::Integer(i) => Some(*i as f64),
                    toml::Value::Float(x) => Some(*x),
                    _ => None,
                })
                .collect::<Option<Vec<f64>>>();
            Value::Array(numbers.ok_or_else(|| DictionaryError::Unsupported {
                key: path.to_owned(),
                message: "only numeric arrays are supported".into(),
            })?)
        }
        toml::Value::Table(t) => Value::Dictionary(from_toml_table(t, path)?),
    })
}

fn json_to_value(value: &serde_json::Value, path: &str) -> Result<Value, DictionaryError> {
    let unsupported = |message: &str| DictionaryError::Unsupported {
        key: path.to_owned(),
        message: message.to_owned(),
    };
    Ok(match value {
        serde_json::Value::Null => return Err(unsupported("null values are not supported")),
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().ok_or_else(|| unsupported("number out of range"))?),
        },
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => Value::Array(
            items
                .iter()
                .map(serde_json::Value::as_f64)
                .collect::<Option<Vec<f64>>>()
                .ok_or_else(|| unsupported("only numeric arrays are supported"))?,
        ),
        serde_json::Value::Object(map) => {
            let mut dict = Dictionary::new();
            for (key, item) in map {
                let child_path = join_key(path, key);
                dict.entries
                    .insert(key.clone(), json_to_value(item, &child_path)?);
            }
            Value::Dictionary(dict)
        }
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Typed access ----

    #[test]
    fn insert_and_get_scalars() {
        let mut dict = Dictionary::new();
        dict.insert("gui", false);
        dict.insert("dt", 0.001);
        dict.insert("count", 3_i64);
        dict.insert("name", "upkie");

        assert!(!dict.get::<bool>("gui").unwrap());
        assert!((dict.get::<f64>("dt").unwrap() - 0.001).abs() < f64::EPSILON);
        assert_eq!(dict.get::<i64>("count").unwrap(), 3);
        assert_eq!(dict.get::<String>("name").unwrap(), "upkie");
        assert_eq!(dict.len(), 4);
    }

    #[test]
    fn int_reads_as_float() {
        let mut dict = Dictionary::new();
        dict.insert("friction", 1_i64);
        assert!((dict.get::<f64>("friction").unwrap() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn float_does_not_read_as_bool() {
        let mut dict = Dictionary::new();
        dict.insert("floor", 1.0);
        let err = dict.get::<bool>("floor").unwrap_err();
        assert_eq!(
            err,
            DictionaryError::TypeMismatch {
                key: "floor".into(),
                expected: "bool",
                found: "float",
            }
        );
    }

    #[test]
    fn missing_key_error() {
        let dict = Dictionary::new();
        assert_eq!(
            dict.get::<f64>("dt").unwrap_err(),
            DictionaryError::MissingKey("dt".into())
        );
    }

    #[test]
    fn get_or_and_get_opt() {
        let mut dict = Dictionary::new();
        dict.insert("gui", true);
        assert!(dict.get_or("gui", false).unwrap());
        assert!(!dict.get_or("floor", false).unwrap());
        assert_eq!(dict.get_opt::<bool>("floor").unwrap(), None);
        assert!(dict.get_or::<f64>("gui", 0.0).is_err());
    }

    // ---- Paths and namespaces ----

    #[test]
    fn dotted_path_lookup() {
        let mut dict = Dictionary::new();
        dict.child_mut("bullet")
            .child_mut("reset")
            .insert("position_base_in_world", Vector3::new(0.0, 0.0, 1.0));

        assert!(dict.has("bullet.reset.position_base_in_world"));
        assert!(!dict.has("bullet.reset.orientation_base_in_world"));
        assert!(!dict.has("bullet.reset.position_base_in_world.x"));
        let v: Vector3<f64> = dict.get("bullet.reset.position_base_in_world").unwrap();
        assert!((v.z - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn child_returns_none_for_scalars() {
        let mut dict = Dictionary::new();
        dict.insert("imu", 1.0);
        assert!(dict.child("imu").is_none());
        assert!(dict.child("missing").is_none());
    }

    #[test]
    fn child_mut_replaces_scalar() {
        let mut dict = Dictionary::new();
        dict.insert("imu", 1.0);
        dict.child_mut("imu").insert("orientation", UnitQuaternion::identity());
        assert!(dict.child("imu").unwrap().has("orientation"));
    }

    #[test]
    fn child_mut_keeps_existing_entries() {
        let mut dict = Dictionary::new();
        dict.child_mut("bullet").insert("gui", false);
        dict.child_mut("bullet").insert("floor", true);
        let bullet = dict.child("bullet").unwrap();
        assert_eq!(bullet.len(), 2);
    }

    #[test]
    fn update_merges_nested() {
        let mut base = Dictionary::new();
        base.child_mut("bullet").insert("gui", true);
        base.child_mut("bullet").insert("floor", true);

        let mut overrides = Dictionary::new();
        overrides.child_mut("bullet").insert("floor", false);

        base.update(&overrides);
        assert!(base.get::<bool>("bullet.gui").unwrap());
        assert!(!base.get::<bool>("bullet.floor").unwrap());
    }

    // ---- Vector types ----

    #[test]
    fn arrays_read_as_vector_and_quaternion() {
        let mut dict = Dictionary::new();
        dict.insert("v", vec![1.0, 2.0, 3.0]);
        dict.insert("q", vec![0.707, 0.0, -0.707, 0.0]);

        let v: Vector3<f64> = dict.get("v").unwrap();
        assert!((v.y - 2.0).abs() < f64::EPSILON);

        let q: Quaternion<f64> = dict.get("q").unwrap();
        assert!((q.w - 0.707).abs() < f64::EPSILON);
        assert!((q.j + 0.707).abs() < f64::EPSILON);

        let unit: UnitQuaternion<f64> = dict.get("q").unwrap();
        assert!((unit.into_inner().norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn wrong_length_array_is_mismatch() {
        let mut dict = Dictionary::new();
        dict.insert("v", vec![1.0, 2.0]);
        assert!(matches!(
            dict.get::<Vector3<f64>>("v"),
            Err(DictionaryError::TypeMismatch { expected: "vector3", .. })
        ));
    }

    #[test]
    fn zero_quaternion_is_not_a_rotation() {
        let mut dict = Dictionary::new();
        dict.insert("q", Quaternion::new(0.0, 0.0, 0.0, 0.0));
        assert!(dict.get::<UnitQuaternion<f64>>("q").is_err());
    }

    // ---- TOML / JSON ----

    #[test]
    fn from_toml_nested_tables() {
        let dict = Dictionary::from_toml_str(
            r#"
            [bullet]
            gui = false
            floor = true

            [bullet.reset]
            position_base_in_world = [0.0, 0.0, 1]
            orientation_base_in_world = [1.0, 0.0, 0.0, 0.0]

            [bullet.joint_friction]
            left_wheel = 0.1
            "#,
        )
        .unwrap();

        assert!(dict.get::<bool>("bullet.floor").unwrap());
        let p: Vector3<f64> = dict.get("bullet.reset.position_base_in_world").unwrap();
        assert!((p.z - 1.0).abs() < f64::EPSILON);
        let q: UnitQuaternion<f64> = dict.get("bullet.reset.orientation_base_in_world").unwrap();
        assert!(q.angle() < 1e-12);
        assert!((dict.get::<f64>("bullet.joint_friction.left_wheel").unwrap() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn from_toml_rejects_string_arrays() {
        let err = Dictionary::from_toml_str("names = [\"a\", \"b\"]").unwrap_err();
        assert!(err.to_string().contains("names"));
    }

    #[test]
    fn from_json_object() {
        let dict = Dictionary::from_json_str(
            r#"{"bullet": {"monitor": {"contacts": {"left_wheel_tire": true}}}, "dt": 0.005}"#,
        )
        .unwrap();
        assert!(dict.get::<bool>("bullet.monitor.contacts.left_wheel_tire").unwrap());
        assert!((dict.get::<f64>("dt").unwrap() - 0.005).abs() < f64::EPSILON);
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        let err = Dictionary::from_json_str("{\"bullet\": {\"floor\": tru").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
        assert!(err.to_string().starts_with("malformed JSON: "), "{err}");
    }

    #[test]
    fn from_json_rejects_non_object() {
        assert!(Dictionary::from_json_str("[1, 2]").is_err());
    }

    #[test]
    fn to_json_layout() {
        let mut dict = Dictionary::new();
        let imu = dict.child_mut("imu");
        imu.insert("orientation", UnitQuaternion::identity());
        imu.insert("angular_velocity", Vector3::new(1.0, 2.0, 3.0));
        dict.insert("nan", f64::NAN);

        let json = dict.to_json();
        assert_eq!(json["imu"]["orientation"], serde_json::json!([1.0, 0.0, 0.0, 0.0]));
        assert_eq!(
            json["imu"]["angular_velocity"],
            serde_json::json!([1.0, 2.0, 3.0])
        );
        assert!(json["nan"].is_null());
    }

    #[test]
    fn json_round_trip_keeps_structure() {
        let mut dict = Dictionary::new();
        dict.child_mut("servo").child_mut("left_hip").insert("torque", 0.5);
        let back = Dictionary::from_json(&dict.to_json()).unwrap();
        assert_eq!(back, dict);
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn dictionary_is_send_sync() {
        assert_send_sync::<Dictionary>();
        assert_send_sync::<Value>();
    }
}
