//! A2UI Data Model
//!
//! The DataModel is a JSON tree addressed by `/`-delimited paths. Mutation is a
//! flat overwrite of `base/key`: no deep merge, no deletion of siblings.

use serde_json::{Map, Value};

use super::message::DataContent;

/// Normalize a path: split on `/`, drop empty segments, re-join with a leading `/`.
///
/// `""`, `"/"` and `"//"` all normalize to `"/"`.
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = segments(path).collect();
    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Split a full path into `(base, key)`.
///
/// The key is the last segment and the base is everything before it (`"/"` for
/// top-level keys). Returns `None` when the path has no segment at all.
pub fn split_path(path: &str) -> Option<(String, String)> {
    let segments: Vec<&str> = segments(path).collect();
    let (key, base) = segments.split_last()?;
    let base = if base.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", base.join("/"))
    };
    Some((base, key.to_string()))
}

/// Join a base path and a key into a normalized full path.
pub fn join_path(base: &str, key: &str) -> String {
    normalize_path(&format!("{base}/{key}"))
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// A data store whose values are accessible via slash paths.
///
/// # Path Format
///
/// Segments name object keys from the root (`/weather/summary`). Reads also
/// accept array indexes (`/flights/options/0`); writes never create arrays.
///
/// # Example
///
/// ```rust,ignore
/// let mut model = DataModel::default();
/// model.set("/weather/temp_text", json!("18 ~ 24 °C"));
/// let temp = model.get_string("/weather/temp_text"); // Some("18 ~ 24 °C")
/// ```
#[derive(Debug, Clone)]
pub struct DataModel {
    /// The root data value, always an object
    data: Value,
}

impl Default for DataModel {
    fn default() -> Self {
        Self::new()
    }
}

impl DataModel {
    pub fn new() -> Self {
        DataModel {
            data: Value::Object(Map::new()),
        }
    }

    /// Value at `path`; `/` is the whole tree.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.data;
        for segment in segments(path) {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(arr) => arr.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn get_string(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|v| v.as_str())
    }

    pub fn get_number(&self, path: &str) -> Option<f64> {
        self.get(path).and_then(|v| v.as_f64())
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(|v| v.as_bool())
    }

    pub fn get_array(&self, path: &str) -> Option<&Vec<Value>> {
        self.get(path).and_then(|v| v.as_array())
    }

    /// Display text for the value at `path`; missing and null read as empty.
    pub fn get_text(&self, path: &str) -> String {
        match self.get(path) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// Set a value at the given path.
    ///
    /// Intermediate segments that are missing or not objects become objects.
    /// Setting the root path is ignored.
    pub fn set(&mut self, path: &str, value: Value) {
        let segments: Vec<&str> = segments(path).collect();
        let Some((last, parents)) = segments.split_last() else {
            ::log::warn!("[A2UI] Ignoring write to the data model root");
            return;
        };

        let mut current = &mut self.data;
        for segment in parents {
            current = object_entry(current, segment);
        }
        ensure_object(current).insert(last.to_string(), value);
    }

    /// Apply the entries of one mutation unit under `base_path`
    pub fn apply_updates(&mut self, base_path: &str, contents: &[DataContent]) {
        for content in contents {
            let full_path = join_path(base_path, &content.key);
            self.set(&full_path, content.value().into_json());
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.data
    }

    /// Drop every value
    pub fn clear(&mut self) {
        self.data = Value::Object(Map::new());
    }
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced with an object"),
    }
}

fn object_entry<'a>(value: &'a mut Value, segment: &str) -> &'a mut Value {
    ensure_object(value)
        .entry(segment.to_string())
        .or_insert_with(|| Value::Object(Map::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_and_split() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("//weather//temp_text/"), "/weather/temp_text");

        assert_eq!(
            split_path("/weather/temp_text"),
            Some(("/weather".to_string(), "temp_text".to_string()))
        );
        assert_eq!(split_path("/query"), Some(("/".to_string(), "query".to_string())));
        assert_eq!(split_path("/"), None);
        assert_eq!(split_path(""), None);
    }

    #[test]
    fn test_typed_getters() {
        let mut model = DataModel::new();
        model.set("/form/query", json!("Osaka"));
        model.set("/flights/selectedIndex", json!(-1));
        model.set("/form/roundTrip", json!(false));

        assert_eq!(model.get_string("/form/query"), Some("Osaka"));
        assert_eq!(model.get_number("/flights/selectedIndex"), Some(-1.0));
        assert_eq!(model.get_bool("/form/roundTrip"), Some(false));
        assert_eq!(model.get_string("/flights/selectedIndex"), None);
    }

    #[test]
    fn test_set_replaces_scalar_parent() {
        let mut model = DataModel::new();

        model.set("/flights", json!("loading"));
        model.set("/flights/options", json!([]));

        assert_eq!(model.get_array("/flights/options").map(Vec::len), Some(0));
    }

    #[test]
    fn test_apply_updates_round_trip() {
        let mut model = DataModel::new();
        let (base, key) = split_path("/weather/temp_text").unwrap();

        model.apply_updates(&base, &[DataContent::string(key, "18 ~ 24 °C")]);

        assert_eq!(model.get_string("/weather/temp_text"), Some("18 ~ 24 °C"));
        assert_eq!(model.get_text("/weather/temp_text"), "18 ~ 24 °C");
    }

    #[test]
    fn test_apply_updates_overwrites_without_merge() {
        let mut model = DataModel::new();
        model.set("/flights/options", json!([{"airline": "A"}]));
        model.set("/flights/selectedIndex", json!(0));

        model.apply_updates("/flights", &[DataContent::json("options", json!([]))]);

        assert_eq!(model.get("/flights/options"), Some(&json!([])));
        assert_eq!(model.get_number("/flights/selectedIndex"), Some(0.0));
    }

    #[test]
    fn test_array_access() {
        let mut model = DataModel::new();
        model.set("/flights/options", json!([{"price": 980}, {"price": 1240}]));

        assert_eq!(model.get_number("/flights/options/1/price"), Some(1240.0));
        assert_eq!(model.get("/flights/options/5"), None);
        assert_eq!(model.get("/flights/options/x"), None);
    }

    #[test]
    fn test_root_write_ignored() {
        let mut model = DataModel::new();
        model.set("/", json!("x"));
        assert_eq!(model.as_value(), &json!({}));
    }
}
