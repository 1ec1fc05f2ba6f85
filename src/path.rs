use serde_json::{Map, Value};

/// A parsed field path such as `req.headers.host`, `items[0].id` or
/// `meta["dotted.key"]`.
///
/// Numeric segments index into arrays; every other segment is an object key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Split a path string into its segments. Parsing never fails; odd input
    /// (an unterminated bracket, empty segments) simply produces segments
    /// that will not resolve.
    pub fn parse(path: &str) -> Self {
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut after_bracket = false;
        let mut chars = path.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '.' => {
                    if !(after_bracket && current.is_empty()) {
                        segments.push(std::mem::take(&mut current));
                    }
                    after_bracket = false;
                }
                '[' => {
                    if !current.is_empty() {
                        segments.push(std::mem::take(&mut current));
                    }
                    let quote = match chars.peek() {
                        Some(&q) if q == '"' || q == '\'' => {
                            chars.next();
                            Some(q)
                        }
                        _ => None,
                    };
                    let mut inner = String::new();
                    while let Some(c) = chars.next() {
                        match quote {
                            Some(q) if c == q => {
                                if chars.peek() == Some(&']') {
                                    chars.next();
                                    break;
                                }
                                inner.push(c);
                            }
                            None if c == ']' => break,
                            _ => inner.push(c),
                        }
                    }
                    segments.push(inner);
                    after_bracket = true;
                }
                _ => {
                    current.push(c);
                    after_bracket = false;
                }
            }
        }

        if !current.is_empty() || !after_bracket {
            segments.push(current);
        }

        FieldPath { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Walk the segments from `root`, stopping at the first one that does not
    /// exist.
    pub fn resolve<'a>(&self, root: &'a Map<String, Value>) -> Option<&'a Value> {
        let (first, rest) = self.segments.split_first()?;
        let mut value = root.get(first)?;
        for segment in rest {
            value = match value {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(value)
    }
}

/// Resolve a configured path against a record.
///
/// A top-level key that literally equals `path` wins over the segmented
/// interpretation, so a field named `"a.b"` is found by the path `a.b`.
pub fn resolve<'a>(root: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    if let Some(value) = root.get(path) {
        return Some(value);
    }
    FieldPath::parse(path).resolve(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_parse_segments() {
        assert_eq!(FieldPath::parse("a.b.c").segments(), ["a", "b", "c"]);
        assert_eq!(FieldPath::parse("a[0].b").segments(), ["a", "0", "b"]);
        assert_eq!(FieldPath::parse("a.0.b").segments(), ["a", "0", "b"]);
        assert_eq!(FieldPath::parse("a[\"x.y\"]").segments(), ["a", "x.y"]);
        assert_eq!(FieldPath::parse("a['x'][1]").segments(), ["a", "x", "1"]);
        assert_eq!(FieldPath::parse("plain").segments(), ["plain"]);
    }

    #[test]
    fn test_resolve_nested_and_arrays() {
        let record = object(json!({
            "req": { "headers": { "host": "example.com" } },
            "items": [ { "id": 7 }, { "id": 8 } ],
        }));

        assert_eq!(resolve(&record, "req.headers.host"), Some(&json!("example.com")));
        assert_eq!(resolve(&record, "items[1].id"), Some(&json!(8)));
        assert_eq!(resolve(&record, "items.0.id"), Some(&json!(7)));
    }

    #[test]
    fn test_resolve_missing_is_none() {
        let record = object(json!({ "req": { "id": 1 }, "items": [1] }));

        assert_eq!(resolve(&record, "req.missing"), None);
        assert_eq!(resolve(&record, "req.id.deeper"), None);
        assert_eq!(resolve(&record, "items[5]"), None);
        assert_eq!(resolve(&record, "items.first"), None);
        assert_eq!(resolve(&record, "nope"), None);
        assert_eq!(resolve(&record, ""), None);
    }

    #[test]
    fn test_literal_key_wins() {
        let record = object(json!({ "a.b": 1, "a": { "b": 2 } }));
        assert_eq!(resolve(&record, "a.b"), Some(&json!(1)));
    }
}
