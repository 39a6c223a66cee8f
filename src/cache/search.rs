//! Search Helpers
//!
//! Key and value matchers used by the cache handler's search operations.

use serde_json::Value;

// == Glob ==
/// Shell-style match of `text` against `pattern`.
///
/// Supports `*`, `?`, `[abc]`, `[a-z]` and negated classes `[!abc]`. A `[`
/// without a closing `]` matches itself.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    // Position of the last `*` and the text index it was tried against
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        let step = match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, t));
                p += 1;
                continue;
            }
            Some('?') => Some(1),
            Some('[') => match_class(&pattern[p..], text[t]),
            Some(&c) if c == text[t] => Some(1),
            _ => None,
        };

        match step {
            Some(width) => {
                p += width;
                t += 1;
            }
            None => match backtrack {
                Some((star, tried)) => {
                    p = star + 1;
                    t = tried + 1;
                    backtrack = Some((star, tried + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Matches one character against the class starting at `class[0] == '['`.
///
/// Returns the width of the class in the pattern on a match.
fn match_class(class: &[char], c: char) -> Option<usize> {
    let mut i = 1;
    let negated = class.get(i) == Some(&'!');
    if negated {
        i += 1;
    }

    let mut matched = false;
    let mut first = true;
    loop {
        match class.get(i) {
            // Unterminated class: treat `[` as a literal
            None => return (c == '[').then_some(1),
            Some(']') if !first => break,
            Some(&lo) => {
                if class.get(i + 1) == Some(&'-') && class.get(i + 2).is_some_and(|&hi| hi != ']') {
                    let hi = class[i + 2];
                    matched |= lo <= c && c <= hi;
                    i += 3;
                } else {
                    matched |= lo == c;
                    i += 1;
                }
            }
        }
        first = false;
    }

    (matched != negated).then_some(i + 1)
}

// == Structural Value Match ==
/// Subset match of `value` against `pattern`.
///
/// An object pattern matches an object value when every pattern key exists
/// in the value with a recursively matching value. Anything else must be
/// equal, with numbers compared by value (`30 == 30.0`).
pub fn value_matches(pattern: &Value, value: &Value) -> bool {
    match (pattern, value) {
        (Value::Object(expected), Value::Object(actual)) => expected.iter().all(|(key, sub)| {
            actual
                .get(key)
                .is_some_and(|candidate| value_matches(sub, candidate))
        }),
        _ => json_eq(pattern, value),
    }
}

fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => match (x.as_u64(), y.as_u64()) {
                (Some(x), Some(y)) => x == y,
                _ => x.as_f64() == y.as_f64(),
            },
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| json_eq(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, sub)| y.get(key).is_some_and(|other| json_eq(sub, other)))
        }
        _ => a == b,
    }
}

// == JSON Path ==
/// Returns true if the dotted `path` resolves inside `value`.
///
/// `*` stands for any child key. An empty path always resolves.
pub fn path_exists(value: &Value, path: &[&str]) -> bool {
    let Some((head, rest)) = path.split_first() else {
        return true;
    };
    let Value::Object(map) = value else {
        return false;
    };

    if *head == "*" {
        map.values().any(|child| path_exists(child, rest))
    } else {
        map.get(*head).is_some_and(|child| path_exists(child, rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_glob_literals_and_wildcards() {
        assert!(glob_match("user_1", "user_1"));
        assert!(!glob_match("user_1", "user_2"));
        assert!(glob_match("user_*", "user_1"));
        assert!(glob_match("user_*", "user_"));
        assert!(!glob_match("user_*", "admin_1"));
        assert!(glob_match("*", ""));
        assert!(glob_match("*:*:name", "id:42:name"));
        assert!(glob_match("user_?", "user_9"));
        assert!(!glob_match("user_?", "user_10"));
    }

    #[test]
    fn test_glob_backtracking() {
        assert!(glob_match("*a*b", "xxaxxab"));
        assert!(!glob_match("*a*b", "xxaxxa"));
        assert!(glob_match("a*", "a"));
        assert!(!glob_match("a*b", "ab_"));
    }

    #[test]
    fn test_glob_classes() {
        assert!(glob_match("id:[0-9]", "id:7"));
        assert!(!glob_match("id:[0-9]", "id:x"));
        assert!(glob_match("[abc]x", "bx"));
        assert!(glob_match("[!abc]x", "dx"));
        assert!(!glob_match("[!abc]x", "ax"));
        assert!(glob_match("[]]", "]"));
        assert!(glob_match("a[", "a["));
        // Only `!` negates; `^` is an ordinary member
        assert!(!glob_match("[^a]x", "bx"));
        assert!(glob_match("[^a]x", "^x"));
        assert!(glob_match("[^a]x", "ax"));
    }

    #[test]
    fn test_value_subset_match() {
        let value = json!({"name": "Alice", "age": 30, "address": {"city": "Paris", "zip": "75001"}});

        assert!(value_matches(&json!({"name": "Alice"}), &value));
        assert!(value_matches(&json!({"address": {"city": "Paris"}}), &value));
        assert!(!value_matches(&json!({"address": {"city": "Lyon"}}), &value));
        assert!(!value_matches(&json!({"email": "a@b.c"}), &value));
        assert!(value_matches(&json!({}), &value));
        assert!(value_matches(&json!(30), &json!(30)));
        assert!(!value_matches(&json!({"age": 30}), &json!(30)));
        // Arrays compare by equality, not subset
        assert!(!value_matches(&json!([1]), &json!([1, 2])));
    }

    #[test]
    fn test_value_match_compares_numbers_by_value() {
        assert!(value_matches(&json!({"age": 30}), &json!({"age": 30.0})));
        assert!(value_matches(&json!([1, 2.0]), &json!([1.0, 2])));
        assert!(value_matches(&json!({"tags": [{"n": 1}]}), &json!({"tags": [{"n": 1.0}]})));
        assert!(!value_matches(&json!({"age": 30}), &json!({"age": 30.5})));
        assert!(!value_matches(&json!({"age": -1}), &json!({"age": u64::MAX})));
        assert!(!value_matches(&json!([{"n": 1}]), &json!([{"n": 1, "m": 2}])));
    }

    #[test]
    fn test_path_exists() {
        let value = json!({"preferences": {"theme": "dark"}, "profile": {"name": "Bob"}});

        assert!(path_exists(&value, &["preferences", "theme"]));
        assert!(!path_exists(&value, &["preferences", "font"]));
        assert!(path_exists(&value, &["*", "name"]));
        assert!(!path_exists(&value, &["*", "missing"]));
        assert!(path_exists(&value, &[]));
        assert!(!path_exists(&json!("scalar"), &["a"]));
    }
}
