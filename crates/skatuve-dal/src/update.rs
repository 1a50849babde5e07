//! Update documents for stored JSON records.
//!
//! A request body is classified once: if any top-level key starts with
//! [`OPERATOR_SIGIL`] the whole body is a raw update expression
//! (`{"$push": {"images": {...}}}`), otherwise it is a field patch where each
//! key is set to its value. Keys may be dotted paths (`images.0.url`).

use serde::{ser::SerializeMap, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};

pub type Document = Map<String, Value>;

pub const OPERATOR_SIGIL: char = '$';

const EACH: &str = "$each";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpdateError {
    #[error("Unsupported update operator {0}")]
    UnknownOperator(String),
    #[error("Unknown modifier {0}, update expression may contain only operators")]
    NotAnOperator(String),
    #[error("Invalid field path {0:?}")]
    InvalidPath(String),
    #[error("Field {path} must be {expected}")]
    TypeMismatch { path: String, expected: &'static str },
    #[error("Invalid argument for {operator}: {reason}")]
    InvalidArgument {
        operator: &'static str,
        reason: String,
    },
}

type UpdateResult<T> = Result<T, UpdateError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Set,
    Unset,
    Inc,
    Push,
    AddToSet,
    Pull,
    Pop,
    Rename,
}

impl Operator {
    pub fn from_key(key: &str) -> UpdateResult<Self> {
        let op = match key {
            "$set" => Operator::Set,
            "$unset" => Operator::Unset,
            "$inc" => Operator::Inc,
            "$push" => Operator::Push,
            "$addToSet" => Operator::AddToSet,
            "$pull" => Operator::Pull,
            "$pop" => Operator::Pop,
            "$rename" => Operator::Rename,
            other if other.starts_with(OPERATOR_SIGIL) => {
                return Err(UpdateError::UnknownOperator(other.to_string()))
            }
            other => return Err(UpdateError::NotAnOperator(other.to_string())),
        };
        Ok(op)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Set => "$set",
            Operator::Unset => "$unset",
            Operator::Inc => "$inc",
            Operator::Push => "$push",
            Operator::AddToSet => "$addToSet",
            Operator::Pull => "$pull",
            Operator::Pop => "$pop",
            Operator::Rename => "$rename",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateDocument {
    /// Set exactly these fields, leave everything else untouched.
    FieldPatch(Document),
    /// Operator expression applied as sent.
    RawExpression(Vec<(Operator, Document)>),
}

pub fn is_operator_key(key: &str) -> bool {
    key.starts_with(OPERATOR_SIGIL)
}

impl TryFrom<Document> for UpdateDocument {
    type Error = UpdateError;

    fn try_from(body: Document) -> Result<Self, Self::Error> {
        if !body.keys().any(|k| is_operator_key(k)) {
            for key in body.keys() {
                split_path(key)?;
            }
            return Ok(UpdateDocument::FieldPatch(body));
        }

        let mut expression = Vec::with_capacity(body.len());
        for (key, arg) in body {
            let op = Operator::from_key(&key)?;
            match arg {
                Value::Object(fields) => {
                    for path in fields.keys() {
                        split_path(path)?;
                    }
                    expression.push((op, fields));
                }
                _ => {
                    return Err(UpdateError::InvalidArgument {
                        operator: op.as_str(),
                        reason: "argument must be an object".to_string(),
                    })
                }
            }
        }
        Ok(UpdateDocument::RawExpression(expression))
    }
}

impl<'de> Deserialize<'de> for UpdateDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let body = Document::deserialize(deserializer)?;
        UpdateDocument::try_from(body).map_err(serde::de::Error::custom)
    }
}

impl Serialize for UpdateDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            UpdateDocument::FieldPatch(fields) => fields.serialize(serializer),
            UpdateDocument::RawExpression(expression) => {
                let mut map = serializer.serialize_map(Some(expression.len()))?;
                for (op, fields) in expression {
                    map.serialize_entry(op.as_str(), fields)?;
                }
                map.end()
            }
        }
    }
}

impl UpdateDocument {
    pub fn is_raw(&self) -> bool {
        matches!(self, UpdateDocument::RawExpression(_))
    }

    /// Field patch setting a single field.
    pub fn set(path: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut doc = Document::new();
        doc.insert(path.into(), value.into());
        UpdateDocument::FieldPatch(doc)
    }

    /// Raw expression with a single operator on a single path.
    pub fn operation(op: Operator, path: impl Into<String>, argument: impl Into<Value>) -> Self {
        let mut fields = Document::new();
        fields.insert(path.into(), argument.into());
        UpdateDocument::RawExpression(vec![(op, fields)])
    }

    /// Applies the update to `doc`. On error `doc` may be partially modified,
    /// callers work on a copy.
    pub fn apply(&self, doc: &mut Value) -> UpdateResult<()> {
        match self {
            UpdateDocument::FieldPatch(fields) => {
                for (path, value) in fields {
                    set_path(doc, path, value.clone())?;
                }
            }
            UpdateDocument::RawExpression(expression) => {
                for (op, fields) in expression {
                    for (path, arg) in fields {
                        apply_operator(doc, *op, path, arg)?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn split_path(path: &str) -> UpdateResult<Vec<&str>> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty() || is_operator_key(s)) {
        return Err(UpdateError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}

fn parse_index(segment: &str, path: &str) -> UpdateResult<usize> {
    segment
        .parse::<usize>()
        .map_err(|_| UpdateError::InvalidPath(path.to_string()))
}

/// Walks to the parent of the last path segment, creating missing objects.
fn parent_mut<'a>(
    doc: &'a mut Value,
    segments: &[&str],
    path: &str,
) -> UpdateResult<&'a mut Value> {
    let mut current = doc;
    for segment in segments {
        current = match current {
            Value::Object(map) => map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
            Value::Array(items) => {
                let index = parse_index(segment, path)?;
                items
                    .get_mut(index)
                    .ok_or_else(|| UpdateError::InvalidPath(path.to_string()))?
            }
            _ => {
                return Err(UpdateError::TypeMismatch {
                    path: path.to_string(),
                    expected: "an object or array",
                })
            }
        };
    }
    Ok(current)
}

fn get_mut<'a>(doc: &'a mut Value, path: &str) -> UpdateResult<Option<&'a mut Value>> {
    let mut current = doc;
    for segment in split_path(path)? {
        current = match current {
            Value::Object(map) => match map.get_mut(segment) {
                Some(value) => value,
                None => return Ok(None),
            },
            Value::Array(items) => match items.get_mut(parse_index(segment, path)?) {
                Some(value) => value,
                None => return Ok(None),
            },
            _ => return Ok(None),
        };
    }
    Ok(Some(current))
}

fn set_path(doc: &mut Value, path: &str, value: Value) -> UpdateResult<()> {
    let segments = split_path(path)?;
    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| UpdateError::InvalidPath(path.to_string()))?;
    match parent_mut(doc, parents, path)? {
        Value::Object(map) => {
            map.insert(last.to_string(), value);
        }
        Value::Array(items) => {
            // an existing element or one past the end
            let index = parse_index(last, path)?;
            match index.cmp(&items.len()) {
                std::cmp::Ordering::Less => items[index] = value,
                std::cmp::Ordering::Equal => items.push(value),
                std::cmp::Ordering::Greater => {
                    return Err(UpdateError::InvalidPath(path.to_string()));
                }
            }
        }
        _ => {
            return Err(UpdateError::TypeMismatch {
                path: path.to_string(),
                expected: "an object or array",
            })
        }
    }
    Ok(())
}

fn remove_path(doc: &mut Value, path: &str) -> UpdateResult<Option<Value>> {
    let segments = split_path(path)?;
    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| UpdateError::InvalidPath(path.to_string()))?;
    let parent_path = parents.join(".");
    let parent = if parents.is_empty() {
        Some(doc)
    } else {
        get_mut(doc, &parent_path)?
    };
    let removed = match parent {
        Some(Value::Object(map)) => map.remove(*last),
        // array elements are nulled, not removed, so indexes stay stable
        Some(Value::Array(items)) => {
            let index = parse_index(last, path)?;
            items.get_mut(index).map(|v| std::mem::replace(v, Value::Null))
        }
        _ => None,
    };
    Ok(removed)
}

fn array_mut<'a>(
    doc: &'a mut Value,
    path: &str,
    create: bool,
) -> UpdateResult<Option<&'a mut Vec<Value>>> {
    if create && get_mut(doc, path)?.is_none() {
        set_path(doc, path, Value::Array(Vec::new()))?;
    }
    match get_mut(doc, path)? {
        Some(Value::Array(items)) => Ok(Some(items)),
        Some(_) => Err(UpdateError::TypeMismatch {
            path: path.to_string(),
            expected: "an array",
        }),
        None => Ok(None),
    }
}

fn each_values(operator: Operator, arg: &Value) -> UpdateResult<Vec<Value>> {
    match arg {
        Value::Object(map) if map.contains_key(EACH) => match map.get(EACH) {
            Some(Value::Array(values)) if map.len() == 1 => Ok(values.clone()),
            _ => Err(UpdateError::InvalidArgument {
                operator: operator.as_str(),
                reason: format!("{EACH} must be the only modifier and hold an array"),
            }),
        },
        value => Ok(vec![value.clone()]),
    }
}

/// `$pull` condition: plain values match by equality, an object condition
/// matches objects having all of its fields, `{"$in": [...]}` matches any
/// listed value.
fn pull_matches(item: &Value, condition: &Value) -> bool {
    match condition {
        Value::Object(cond) if cond.len() == 1 && cond.contains_key("$in") => cond
            .get("$in")
            .and_then(Value::as_array)
            .map(|candidates| candidates.contains(item))
            .unwrap_or(false),
        Value::Object(cond) => match item {
            Value::Object(fields) => cond.iter().all(|(k, v)| fields.get(k) == Some(v)),
            _ => false,
        },
        value => item == value,
    }
}

fn add_numbers(current: &Number, delta: &Number) -> Option<Number> {
    match (current.as_i64(), delta.as_i64()) {
        (Some(a), Some(b)) => a.checked_add(b).map(Number::from),
        _ => Number::from_f64(current.as_f64()? + delta.as_f64()?),
    }
}

fn apply_operator(doc: &mut Value, op: Operator, path: &str, arg: &Value) -> UpdateResult<()> {
    match op {
        Operator::Set => set_path(doc, path, arg.clone())?,
        Operator::Unset => {
            remove_path(doc, path)?;
        }
        Operator::Inc => {
            let delta = match arg {
                Value::Number(delta) => delta,
                _ => {
                    return Err(UpdateError::InvalidArgument {
                        operator: op.as_str(),
                        reason: format!("increment for {path} must be a number"),
                    })
                }
            };
            if get_mut(doc, path)?.is_none() {
                return set_path(doc, path, Value::Number(delta.clone()));
            }
            match get_mut(doc, path)? {
                Some(Value::Number(current)) => {
                    let sum = add_numbers(current, delta).ok_or_else(|| {
                        UpdateError::InvalidArgument {
                            operator: op.as_str(),
                            reason: format!("increment of {path} overflows"),
                        }
                    })?;
                    *current = sum;
                }
                _ => {
                    return Err(UpdateError::TypeMismatch {
                        path: path.to_string(),
                        expected: "a number",
                    })
                }
            }
        }
        Operator::Push => {
            let values = each_values(op, arg)?;
            if let Some(items) = array_mut(doc, path, true)? {
                items.extend(values);
            }
        }
        Operator::AddToSet => {
            let values = each_values(op, arg)?;
            if let Some(items) = array_mut(doc, path, true)? {
                for value in values {
                    if !items.contains(&value) {
                        items.push(value);
                    }
                }
            }
        }
        Operator::Pull => {
            if let Some(items) = array_mut(doc, path, false)? {
                items.retain(|item| !pull_matches(item, arg));
            }
        }
        Operator::Pop => {
            let first = match arg.as_i64() {
                Some(1) => false,
                Some(-1) => true,
                _ => {
                    return Err(UpdateError::InvalidArgument {
                        operator: op.as_str(),
                        reason: "expected 1 or -1".to_string(),
                    })
                }
            };
            if let Some(items) = array_mut(doc, path, false)? {
                if first && !items.is_empty() {
                    items.remove(0);
                } else {
                    items.pop();
                }
            }
        }
        Operator::Rename => {
            let target = arg.as_str().ok_or_else(|| UpdateError::InvalidArgument {
                operator: op.as_str(),
                reason: format!("new name for {path} must be a string"),
            })?;
            split_path(target)?;
            if let Some(value) = remove_path(doc, path)? {
                set_path(doc, target, value)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn update(body: Value) -> UpdateResult<UpdateDocument> {
        match body {
            Value::Object(map) => UpdateDocument::try_from(map),
            _ => panic!("test body must be an object"),
        }
    }

    fn gallery() -> Value {
        json!({
            "id": "g1",
            "name": "Spring show",
            "description": "Photos",
            "images": [{"id": "i1", "url": "https://img/1.jpg"}],
            "views": 1
        })
    }

    #[test]
    fn test_field_patch_classification() {
        let upd = update(json!({"name": "New", "description": "Other"})).unwrap();
        assert!(!upd.is_raw());
        let mut doc = gallery();
        upd.apply(&mut doc).unwrap();
        assert_eq!(doc["name"], "New");
        assert_eq!(doc["description"], "Other");
        assert_eq!(doc["images"][0]["id"], "i1");
        assert_eq!(doc["id"], "g1");
    }

    #[test]
    fn test_field_patch_dotted_path() {
        let upd = update(json!({"images.0.filename": "one.jpg"})).unwrap();
        let mut doc = gallery();
        upd.apply(&mut doc).unwrap();
        assert_eq!(doc["images"][0]["filename"], "one.jpg");
        assert_eq!(doc["images"][0]["url"], "https://img/1.jpg");
    }

    #[test]
    fn test_array_index_sets_or_appends() {
        let mut doc = gallery();
        update(json!({"images.0": {"id": "i0"}, "images.1": {"id": "i2"}}))
            .unwrap()
            .apply(&mut doc)
            .unwrap();
        assert_eq!(doc["images"], json!([{"id": "i0"}, {"id": "i2"}]));
    }

    #[test]
    fn test_array_index_past_end() {
        for path in [
            "images.3",
            "images.1000000000",
            "images.4000000000000000000",
            "images.18446744073709551615",
            "images.99999999999999999999999",
        ] {
            let mut doc = gallery();
            let res = update(json!({ path: 1 })).unwrap().apply(&mut doc);
            assert_eq!(res, Err(UpdateError::InvalidPath(path.to_string())));
            assert_eq!(doc, gallery());

            let mut doc = gallery();
            let res = update(json!({"$set": { path: 1 }}))
                .unwrap()
                .apply(&mut doc);
            assert_eq!(res, Err(UpdateError::InvalidPath(path.to_string())));
        }
    }

    #[test]
    fn test_push_into_missing_array_element() {
        let mut doc = gallery();
        let res = update(json!({"$push": {"images.7": "x"}}))
            .unwrap()
            .apply(&mut doc);
        assert_eq!(res, Err(UpdateError::InvalidPath("images.7".to_string())));
    }

    #[test]
    fn test_push_appends() {
        let upd = update(json!({"$push": {"images": {"id": "i2", "url": "https://img/2.jpg"}}}))
            .unwrap();
        assert!(upd.is_raw());
        let mut doc = gallery();
        upd.apply(&mut doc).unwrap();
        let images = doc["images"].as_array().unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[1]["id"], "i2");
        assert_eq!(doc["name"], "Spring show");
    }

    #[test]
    fn test_push_each_and_create_missing_array() {
        let upd = update(json!({"$push": {"tags": {"$each": ["a", "b"]}}})).unwrap();
        let mut doc = gallery();
        upd.apply(&mut doc).unwrap();
        assert_eq!(doc["tags"], json!(["a", "b"]));
    }

    #[test]
    fn test_mixed_keys_are_raw_expression() {
        let res = update(json!({"$push": {"images": {"id": "i2"}}, "name": "Sneaky"}));
        assert_eq!(res, Err(UpdateError::NotAnOperator("name".to_string())));
    }

    #[test]
    fn test_unknown_operator() {
        let res = update(json!({"$where": {"a": 1}}));
        assert_eq!(res, Err(UpdateError::UnknownOperator("$where".to_string())));
    }

    #[test]
    fn test_operator_argument_must_be_object() {
        let res = update(json!({"$set": 1}));
        assert!(matches!(res, Err(UpdateError::InvalidArgument { .. })));
    }

    #[test]
    fn test_invalid_paths() {
        assert!(update(json!({"a..b": 1})).is_err());
        assert!(update(json!({"": 1})).is_err());
        assert!(update(json!({"$set": {"a.$x": 1}})).is_err());
    }

    #[test]
    fn test_pull_by_subset() {
        let mut doc = gallery();
        update(json!({"$push": {"images": {"id": "i2", "url": "u2"}}}))
            .unwrap()
            .apply(&mut doc)
            .unwrap();
        update(json!({"$pull": {"images": {"id": "i1"}}}))
            .unwrap()
            .apply(&mut doc)
            .unwrap();
        let images = doc["images"].as_array().unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0]["id"], "i2");
    }

    #[test]
    fn test_pull_in_and_missing_field() {
        let mut doc = json!({"tags": ["a", "b", "c"]});
        update(json!({"$pull": {"tags": {"$in": ["a", "c"]}, "missing": "x"}}))
            .unwrap()
            .apply(&mut doc)
            .unwrap();
        assert_eq!(doc["tags"], json!(["b"]));
        assert!(doc.get("missing").is_none());
    }

    #[test]
    fn test_add_to_set() {
        let mut doc = json!({"tags": ["a"]});
        update(json!({"$addToSet": {"tags": {"$each": ["a", "b", "b"]}}}))
            .unwrap()
            .apply(&mut doc)
            .unwrap();
        assert_eq!(doc["tags"], json!(["a", "b"]));
    }

    #[test]
    fn test_inc() {
        let mut doc = gallery();
        update(json!({"$inc": {"views": 2, "likes": 1}}))
            .unwrap()
            .apply(&mut doc)
            .unwrap();
        assert_eq!(doc["views"], 3);
        assert_eq!(doc["likes"], 1);

        update(json!({"$inc": {"views": 0.5}}))
            .unwrap()
            .apply(&mut doc)
            .unwrap();
        assert_eq!(doc["views"], 3.5);

        let res = update(json!({"$inc": {"name": 1}})).unwrap().apply(&mut doc);
        assert!(matches!(res, Err(UpdateError::TypeMismatch { .. })));
    }

    #[test]
    fn test_unset_and_rename() {
        let mut doc = gallery();
        update(json!({"$unset": {"views": ""}, "$rename": {"description": "summary"}}))
            .unwrap()
            .apply(&mut doc)
            .unwrap();
        assert!(doc.get("views").is_none());
        assert!(doc.get("description").is_none());
        assert_eq!(doc["summary"], "Photos");
    }

    #[test]
    fn test_pop() {
        let mut doc = json!({"list": [1, 2, 3]});
        update(json!({"$pop": {"list": -1}}))
            .unwrap()
            .apply(&mut doc)
            .unwrap();
        assert_eq!(doc["list"], json!([2, 3]));
        update(json!({"$pop": {"list": 1}}))
            .unwrap()
            .apply(&mut doc)
            .unwrap();
        assert_eq!(doc["list"], json!([2]));
        assert!(update(json!({"$pop": {"list": 2}}))
            .unwrap()
            .apply(&mut doc)
            .is_err());
    }

    #[test]
    fn test_push_to_non_array() {
        let mut doc = gallery();
        let res = update(json!({"$push": {"name": "x"}}))
            .unwrap()
            .apply(&mut doc);
        assert!(matches!(res, Err(UpdateError::TypeMismatch { .. })));
    }

    #[test]
    fn test_deserialize() {
        let upd: UpdateDocument = serde_json::from_str(r#"{"$set": {"name": "x"}}"#).unwrap();
        assert!(upd.is_raw());
        let res = serde_json::from_str::<UpdateDocument>(r#"[1, 2]"#);
        assert!(res.is_err());
    }

    #[test]
    fn test_serialize_as_sent() {
        let body = json!({"$push": {"images": {"url": "u"}}, "$set": {"name": "x"}});
        let upd = update(body.clone()).unwrap();
        assert_eq!(serde_json::to_value(&upd).unwrap(), body);
        let patch = UpdateDocument::set("order", 3);
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({"order": 3}));
    }
}
