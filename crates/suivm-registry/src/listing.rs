use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ReleaseObject {
    tag_name: String,
}

/// Extracts `tag_name` values from one page of the release listing.
///
/// Structured parsing is tried first; bodies that are not a JSON array of
/// release objects fall back to [`scan_tag_names`], which yields the same tags
/// for well-formed input.
pub fn parse_release_tags(raw: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<ReleaseObject>>(raw) {
        Ok(releases) => releases
            .into_iter()
            .map(|release| release.tag_name)
            .collect(),
        Err(err) => {
            debug!(error = %err, "release listing is not structured JSON; scanning text");
            scan_tag_names(raw)
        }
    }
}

/// Pattern scan for `"tag_name": "<value>"` pairs, in document order.
pub fn scan_tag_names(raw: &str) -> Vec<String> {
    const KEY: &str = "\"tag_name\"";

    let mut tags = Vec::new();
    let mut rest = raw;
    while let Some(index) = rest.find(KEY) {
        rest = &rest[index + KEY.len()..];
        let after_key = rest.trim_start();
        let Some(after_colon) = after_key.strip_prefix(':') else {
            continue;
        };
        let Some(value_start) = after_colon.trim_start().strip_prefix('"') else {
            continue;
        };
        let Some((value, remainder)) = read_json_string(value_start) else {
            break;
        };
        tags.push(value);
        rest = remainder;
    }
    tags
}

fn read_json_string(input: &str) -> Option<(String, &str)> {
    let mut value = String::new();
    let mut chars = input.char_indices();
    while let Some((index, ch)) = chars.next() {
        match ch {
            '"' => return Some((value, &input[index + 1..])),
            '\\' => {
                let (_, escaped) = chars.next()?;
                value.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    other => other,
                });
            }
            other => value.push(other),
        }
    }
    None
}
