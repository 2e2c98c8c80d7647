use serde_json::{Map, Value};

use crate::primitives::value_to_text;

/// Renders a message template with its parameters.
///
/// The engine never renders messages itself; errors carry templates and
/// parameters, and callers format them after validation.
pub trait MessageFormatter: Send + Sync {
    fn format(&self, template: &str, parameters: &Map<String, Value>) -> String;
}

/// Replaces `{name}` placeholders with parameter values. Strings are
/// inserted verbatim, other values in compact JSON form. Unknown
/// placeholders are left as they are.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimpleMessageFormatter;

impl MessageFormatter for SimpleMessageFormatter {
    fn format(&self, template: &str, parameters: &Map<String, Value>) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            match after.find('}') {
                Some(end) if is_placeholder(&after[..end]) => {
                    let name = &after[..end];
                    match parameters.get(name) {
                        Some(value) => out.push_str(&value_to_text(value)),
                        None => {
                            out.push('{');
                            out.push_str(name);
                            out.push('}');
                        }
                    }
                    rest = &after[end + 1..];
                }
                _ => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

fn is_placeholder(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

impl<F> MessageFormatter for F
where
    F: Fn(&str, &Map<String, Value>) -> String + Send + Sync,
{
    fn format(&self, template: &str, parameters: &Map<String, Value>) -> String {
        self(template, parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn replaces_known_placeholders() {
        let out = SimpleMessageFormatter.format(
            "{property} must be no less than {min}.",
            &params(json!({"property": "age", "min": 20})),
        );
        assert_eq!(out, "age must be no less than 20.");
    }

    #[test]
    fn leaves_unknown_and_malformed_braces() {
        let out = SimpleMessageFormatter.format("{missing} {not closed", &Map::new());
        assert_eq!(out, "{missing} {not closed");
        let out = SimpleMessageFormatter.format("{ a } {}", &params(json!({"a": 1})));
        assert_eq!(out, "{ a } {}");
    }
}
