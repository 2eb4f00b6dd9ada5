//! Template resolution
//!
//! Substitutes `{name}` placeholders with values from a variable environment.
//! Placeholders naming unknown variables, and braces that are not part of a
//! placeholder, are left exactly as written so templates can be resolved
//! partially and later stages can fill in the rest.

use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;

/// Variable environment threaded through a pipeline run
pub type Variables = HashMap<String, Value>;

/// Result of resolving a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub text: String,
    /// Variables that were substituted, in order of first use
    pub used: Vec<String>,
}

/// Text form of a variable value: strings verbatim, anything else as JSON
pub fn value_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s),
        other => Cow::Owned(other.to_string()),
    }
}

/// Resolves `template` against `vars` in a single left-to-right pass
///
/// Substituted values are never rescanned, so a value containing `{x}` is
/// inserted literally.
pub fn resolve(template: &str, vars: &Variables) -> Resolved {
    let mut text = String::with_capacity(template.len());
    let mut used: Vec<String> = Vec::new();
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        text.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        // The placeholder ends at the next brace, provided it is a closing one
        if let Some(close) = after.find(|c| c == '{' || c == '}') {
            if after[close..].starts_with('}') {
                let name = &after[..close];
                if let Some(value) = vars.get(name) {
                    text.push_str(&value_text(value));
                    if !used.iter().any(|u| u == name) {
                        used.push(name.to_string());
                    }
                    rest = &after[close + 1..];
                    continue;
                }
            }
        }

        text.push('{');
        rest = after;
    }
    text.push_str(rest);

    Resolved { text, used }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(pairs: &[(&str, Value)]) -> Variables {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_partial_resolution_keeps_unknown_placeholders() {
        let v = vars(&[("a", json!("11")), ("c", json!("22"))]);
        let resolved = resolve("ad{a}s{d}", &v);

        assert_eq!(resolved.text, "ad11s{d}");
        assert_eq!(resolved.used, vec!["a".to_string()]);
    }

    #[test]
    fn test_repeated_placeholder() {
        let v = vars(&[("x", json!("1"))]);
        let resolved = resolve("{x}+{x}={y}", &v);

        assert_eq!(resolved.text, "1+1={y}");
        assert_eq!(resolved.used, vec!["x".to_string()]);
    }

    #[test]
    fn test_literal_braces_round_trip() {
        let v = vars(&[("name", json!("Ada"))]);

        assert_eq!(resolve("{", &v).text, "{");
        assert_eq!(resolve("}", &v).text, "}");
        assert_eq!(resolve("{}", &v).text, "{}");
        assert_eq!(resolve("{{name}}", &v).text, "{Ada}");
        assert_eq!(resolve("{\"k\": {name}}", &v).text, "{\"k\": Ada}");
        assert_eq!(resolve("fn() { {name} }", &v).text, "fn() { Ada }");
    }

    #[test]
    fn test_structured_values_render_as_json() {
        let v = vars(&[("n", json!(3)), ("list", json!(["a", "b"]))]);
        assert_eq!(resolve("{n}:{list}", &v).text, "3:[\"a\",\"b\"]");
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let v = vars(&[("a", json!("{b}")), ("b", json!("boom"))]);
        assert_eq!(resolve("{a}", &v).text, "{b}");
    }

    #[test]
    fn test_resolution_is_idempotent_once_satisfied() {
        let v = vars(&[
            ("city", json!("Beijing")),
            ("n", json!(2)),
            ("greeting", json!("hello world")),
        ]);
        let templates = [
            "{greeting}, {city}!",
            "{n} {n} {n}",
            "no placeholders at all",
            "{{city}} and }{ stray",
            "",
        ];

        for template in templates {
            let once = resolve(template, &v).text;
            let twice = resolve(&once, &v).text;
            assert_eq!(once, twice, "template: {:?}", template);
        }
    }

    #[test]
    fn test_empty_environment_is_identity() {
        let template = "a {b} {c d} {{e}} }";
        assert_eq!(resolve(template, &Variables::new()).text, template);
    }
}
