//! Extracts the first well-formed JSON object embedded in free-form
//! model output. A non-greedy regex cannot do this correctly: nested
//! objects need their braces actually balanced, and braces inside
//! string literals must not count. This is a small hand-rolled scanner
//! instead, tracking brace depth and string/escape state character by
//! character.

use serde_json::Value;

/// Finds the first top-level `{...}` span in `text`, balances its
/// braces (ignoring any inside string literals), and parses it. Returns
/// `None` if no balanced object is found — callers should then treat
/// the whole response as a plain thought.
pub fn extract_first_json_object(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    let start = text.find('{')?;

    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        let ch = byte as char;

        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + 1;
                    return serde_json::from_str(&text[start..end]).ok();
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_simple_object() {
        let text = r#"I'll write a post. {"action": "no_op"} done."#;
        assert_eq!(
            extract_first_json_object(text),
            Some(json!({"action": "no_op"}))
        );
    }

    #[test]
    fn extracts_nested_object_without_truncating() {
        let text = r#"{"action": "post_channel", "params": {"channel": "main", "text": "hi"}}"#;
        let parsed = extract_first_json_object(text).unwrap();
        assert_eq!(parsed["params"]["channel"], "main");
    }

    #[test]
    fn ignores_braces_inside_string_literals() {
        let text = r#"{"action": "write_blog_post", "params": {"title": "a { weird } title"}}"#;
        let parsed = extract_first_json_object(text).unwrap();
        assert_eq!(parsed["params"]["title"], "a { weird } title");
    }

    #[test]
    fn returns_none_for_prose_without_json() {
        let text = "I thought about the garden for a while.";
        assert_eq!(extract_first_json_object(text), None);
    }

    #[test]
    fn returns_none_for_unbalanced_braces() {
        let text = r#"{"action": "no_op""#;
        assert_eq!(extract_first_json_object(text), None);
    }

    #[test]
    fn ignores_escaped_quotes_inside_strings() {
        let text = r#"{"thought": "she said \"ok\" and left"}"#;
        let parsed = extract_first_json_object(text).unwrap();
        assert_eq!(parsed["thought"], "she said \"ok\" and left");
    }
}
