use serde_json::Value;
use std::collections::HashMap;

use crate::errors::BuilderError;
use crate::safety::path_is_allowed;
use crate::wire::{EditorChatResponse, FileEntry};

pub const README: &str = "README.md";

const EMPTY_REPLY_FALLBACK: &str =
    "I seem to be having trouble forming a thought. Could you try rephrasing?";

/// Remove a leading ```` ```<lang> ```` (or bare ```` ``` ````) fence and a trailing
/// ```` ``` ```` fence, trimming whitespace around each step.
pub fn strip_code_fence<'a>(text: &'a str, lang: &str) -> &'a str {
    let mut t = text.trim();
    let opener = format!("```{lang}");
    if let Some(rest) = t.strip_prefix(opener.as_str()) {
        t = rest.trim();
    } else if let Some(rest) = t.strip_prefix("```") {
        t = rest.trim();
    }
    if let Some(rest) = t.strip_suffix("```") {
        t = rest.trim();
    }
    t
}

pub fn strip_html_fence(text: &str) -> &str {
    strip_code_fence(text, "html")
}

pub fn strip_json_fence(text: &str) -> &str {
    strip_code_fence(text, "json")
}

/// Parse the (possibly fenced) reply as JSON. If that fails, retry on the first
/// balanced `{...}` in the text; models sometimes wrap the object in prose.
fn parse_json(raw: &str) -> Result<Value, BuilderError> {
    let body = strip_json_fence(raw);
    match serde_json::from_str::<Value>(body) {
        Ok(v) => Ok(v),
        Err(first) => extract_first_json_object(body)
            .and_then(|obj| serde_json::from_str::<Value>(obj).ok())
            .ok_or_else(|| BuilderError::InvalidResponseShape(format!("reply is not JSON: {first}"))),
    }
}

/// First top-level JSON object substring; braces inside string literals are ignored.
pub fn extract_first_json_object(s: &str) -> Option<&str> {
    let mut start = None;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in s.bytes().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' if start.is_some() => in_string = true,
            b'{' => {
                if start.is_none() {
                    start = Some(i);
                }
                depth += 1;
            }
            b'}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return start.map(|st| &s[st..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

fn file_entries(value: &Value, field: &str) -> Result<Vec<FileEntry>, BuilderError> {
    let list = value
        .get(field)
        .and_then(Value::as_array)
        .ok_or_else(|| BuilderError::InvalidResponseShape(format!("`{field}` is not a list")))?;

    list.iter()
        .enumerate()
        .map(|(i, item)| {
            let name = item.get("name").and_then(Value::as_str);
            let content = item.get("content").and_then(Value::as_str);
            match (name, content) {
                (Some(name), Some(content)) => Ok(FileEntry { name: name.to_string(), content: content.to_string() }),
                _ => Err(BuilderError::InvalidResponseShape(format!(
                    "`{field}[{i}]` needs string `name` and `content`"
                ))),
            }
        })
        .collect()
}

/// Drop entries with unsafe paths and collapse duplicate names (last one wins),
/// keeping first-seen order. Returns human-readable warnings for what was dropped.
pub fn sanitize(entries: Vec<FileEntry>) -> (Vec<FileEntry>, Vec<String>) {
    let mut warnings = Vec::new();
    let mut out: Vec<FileEntry> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for e in entries {
        if !path_is_allowed(&e.name) {
            warnings.push(format!("dropped file with unsafe path {:?}", e.name));
            continue;
        }
        let name = e.name.trim_start_matches("./").to_string();
        match index.get(&name) {
            Some(&at) => {
                warnings.push(format!("duplicate file {name}; keeping the later copy"));
                out[at].content = e.content;
            }
            None => {
                index.insert(name.clone(), out.len());
                out.push(FileEntry { name, content: e.content });
            }
        }
    }
    (out, warnings)
}

/// Validate a backend generation reply: `{ files: [{name, content}] }` with a README.
pub fn parse_project_files(raw: &str) -> Result<(Vec<FileEntry>, Vec<String>), BuilderError> {
    let value = parse_json(raw)?;
    let (files, warnings) = sanitize(file_entries(&value, "files")?);
    if !files.iter().any(|f| f.name == README) {
        return Err(BuilderError::MissingRequiredFile(README.to_string()));
    }
    Ok((files, warnings))
}

/// Validate an edit-turn reply: `{ response, updatedFiles: [{name, content}] }`.
pub fn parse_editor_response(raw: &str) -> Result<(EditorChatResponse, Vec<String>), BuilderError> {
    let value = parse_json(raw)?;
    let response = value
        .get("response")
        .and_then(Value::as_str)
        .ok_or_else(|| BuilderError::InvalidResponseShape("`response` is not a string".into()))?;
    let (updated_files, warnings) = sanitize(file_entries(&value, "updatedFiles")?);

    let response = if response.trim().is_empty() {
        EMPTY_REPLY_FALLBACK.to_string()
    } else {
        response.to_string()
    };
    Ok((EditorChatResponse { response, updated_files }, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_fences_are_stripped() {
        assert_eq!(strip_html_fence("```html\n<!DOCTYPE html><html></html>\n```\n"), "<!DOCTYPE html><html></html>");
        assert_eq!(strip_html_fence("  <html></html>  "), "<html></html>");
        assert_eq!(strip_html_fence("```\n<html></html>```"), "<html></html>");
    }

    #[test]
    fn json_fence_is_stripped_before_parsing() {
        let raw = "```json\n{\"files\":[{\"name\":\"README.md\",\"content\":\"# Api\"}]}\n```";
        let (files, warnings) = parse_project_files(raw).unwrap();
        assert_eq!(files.len(), 1);
        assert!(warnings.is_empty());
    }

    #[test]
    fn files_must_be_a_list() {
        let err = parse_project_files(r#"{"files": {"name": "README.md"}}"#).unwrap_err();
        assert!(matches!(err, BuilderError::InvalidResponseShape(_)));
        let err = parse_project_files("not json at all").unwrap_err();
        assert!(matches!(err, BuilderError::InvalidResponseShape(_)));
    }

    #[test]
    fn readme_is_required() {
        let err = parse_project_files(r#"{"files":[{"name":"server.js","content":"x"}]}"#).unwrap_err();
        match err {
            BuilderError::MissingRequiredFile(name) => assert_eq!(name, "README.md"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn entries_need_string_fields() {
        let err = parse_project_files(r#"{"files":[{"name":"README.md"}]}"#).unwrap_err();
        assert!(matches!(err, BuilderError::InvalidResponseShape(_)));
    }

    #[test]
    fn sanitize_drops_unsafe_and_dedupes() {
        let (files, warnings) = sanitize(vec![
            FileEntry { name: "a.js".into(), content: "1".into() },
            FileEntry { name: "../evil".into(), content: "x".into() },
            FileEntry { name: "./a.js".into(), content: "2".into() },
        ]);
        assert_eq!(files, vec![FileEntry { name: "a.js".into(), content: "2".into() }]);
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn editor_reply_in_prose_is_recovered() {
        let raw = r#"Sure! {"response":"Done {really}","updatedFiles":[{"name":"index.html","content":"<p>}</p>"}]} hope that helps"#;
        let (resp, _) = parse_editor_response(raw).unwrap();
        assert_eq!(resp.response, "Done {really}");
        assert_eq!(resp.updated_files[0].content, "<p>}</p>");
    }

    #[test]
    fn editor_reply_requires_fields() {
        assert!(matches!(
            parse_editor_response(r#"{"updatedFiles":[]}"#),
            Err(BuilderError::InvalidResponseShape(_))
        ));
        assert!(matches!(
            parse_editor_response(r#"{"response":"hi"}"#),
            Err(BuilderError::InvalidResponseShape(_))
        ));
    }

    #[test]
    fn empty_reply_text_gets_fallback() {
        let (resp, _) = parse_editor_response(r#"{"response":"  ","updatedFiles":[]}"#).unwrap();
        assert_eq!(resp.response, EMPTY_REPLY_FALLBACK);
    }

    #[test]
    fn extraction_skips_escaped_quotes() {
        let s = r#"x {"a":"q\"}"} y"#;
        assert_eq!(extract_first_json_object(s), Some(r#"{"a":"q\"}"}"#));
        assert_eq!(extract_first_json_object("no object"), None);
    }
}
