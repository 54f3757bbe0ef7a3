//! Lightweight HTML excavation helpers shared by the platform extractors.
//!
//! Upstream pages are not parsed into a DOM; the extractors only ever need a
//! handful of known locations, so text is pulled out with ordered selector
//! tables, element blocks are recovered by balancing open/close tags, and
//! embedded JSON is recovered with marker-and-balance scanning.

use regex::Regex;

/// One location to try when looking for a piece of page text. Selector lists
/// are ordered; the first match wins.
#[derive(Debug, Clone, Copy)]
pub enum Selector {
    /// `<meta property="..." content="...">`
    MetaProperty(&'static str),
    /// First element carrying this class, any tag.
    Class(&'static str),
}

const TEXT_TAGS: &[&str] = &[
    "h1", "h2", "h3", "a", "span", "strong", "p", "td", "li", "div",
];

/// Try each selector in order and return the first non-empty text.
pub fn select_first_text(html: &str, selectors: &[Selector]) -> Option<String> {
    for selector in selectors {
        let found = match selector {
            Selector::MetaProperty(property) => meta_content(html, property),
            Selector::Class(class) => class_text(html, class),
        };
        if let Some(text) = found
            && !text.is_empty()
        {
            return Some(text);
        }
    }
    None
}

/// Content attribute of a `<meta property="...">` tag, either attribute order.
pub fn meta_content(html: &str, property: &str) -> Option<String> {
    let property = regex::escape(property);
    let patterns = [
        format!(r#"<meta[^>]*property="{property}"[^>]*content="([^"]*)""#),
        format!(r#"<meta[^>]*content="([^"]*)"[^>]*property="{property}""#),
    ];

    for pattern in patterns {
        let re = Regex::new(&pattern).unwrap();
        if let Some(caps) = re.captures(html) {
            let content = caps[1].trim().to_string();
            if !content.is_empty() {
                return Some(content);
            }
        }
    }
    None
}

/// Inner text of the first element carrying the given class.
pub fn class_text(html: &str, class: &str) -> Option<String> {
    for tag in TEXT_TAGS {
        if let Some(block) = class_blocks(html, &[tag], class).into_iter().next() {
            let text = strip_tags(&block);
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// Inner HTML of every element with the given tag(s) and class. Blocks are
/// closed by balancing nested tags of the same name.
pub fn class_blocks(html: &str, tags: &[&str], class: &str) -> Vec<String> {
    let class = regex::escape(class);
    let mut blocks = Vec::new();
    for tag in tags {
        let open = format!(r#"<{tag}\s[^>]*class="[^"]*{class}[^"]*"[^>]*>"#);
        blocks.extend(blocks_for_open_pattern(html, tag, &open));
    }
    blocks
}

/// Inner HTML of every element with the given tag.
pub fn tag_blocks(html: &str, tag: &str) -> Vec<String> {
    let open = format!(r#"<{tag}(?:\s[^>]*)?>"#);
    blocks_for_open_pattern(html, tag, &open)
}

/// Inner HTML of every element with the given tag and attribute value.
pub fn attr_blocks(html: &str, tag: &str, attr: &str, value: &str) -> Vec<String> {
    let open = format!(
        r#"<{tag}\s[^>]*{}="{}"[^>]*>"#,
        regex::escape(attr),
        regex::escape(value)
    );
    blocks_for_open_pattern(html, tag, &open)
}

fn blocks_for_open_pattern(html: &str, tag: &str, open_pattern: &str) -> Vec<String> {
    let re = Regex::new(open_pattern).unwrap();
    let mut blocks = Vec::new();
    for m in re.find_iter(html) {
        let body = &html[m.end()..];
        if let Some(close) = find_matching_close(body, tag) {
            blocks.push(body[..close].to_string());
        }
    }
    blocks
}

/// Byte offset of the `</tag>` that closes the element whose opening tag
/// ends right before `body`, accounting for nested elements of the same tag.
fn find_matching_close(body: &str, tag: &str) -> Option<usize> {
    let mut depth = 1usize;
    let mut idx = 0usize;

    loop {
        let next = body[idx..].find('<')? + idx;
        let rest = &body[next..];
        if let Some(after) = rest.strip_prefix("</") {
            if tag_follows(after, tag) {
                depth -= 1;
                if depth == 0 {
                    return Some(next);
                }
            }
        } else if tag_follows(&rest[1..], tag) {
            depth += 1;
        }
        idx = next + 1;
    }
}

/// `s` begins with the tag name as a whole word (`div>`, `div `, `div/`).
fn tag_follows(s: &str, tag: &str) -> bool {
    s.len() > tag.len()
        && s[..tag.len()].eq_ignore_ascii_case(tag)
        && matches!(
            s.as_bytes()[tag.len()],
            b'>' | b' ' | b'\t' | b'\n' | b'\r' | b'/'
        )
}

/// Non-empty texts of `td`/`div`/`span` children of a row fragment, in
/// document order. Used to split heuristic song rows into cells.
pub fn cell_texts(row: &str) -> Vec<String> {
    let mut cells = Vec::new();
    for tag in ["td", "div", "span"] {
        for block in tag_blocks(row, tag) {
            let text = strip_tags(&block);
            if !text.is_empty() && !cells.contains(&text) {
                cells.push(text);
            }
        }
        if !cells.is_empty() {
            break;
        }
    }
    cells
}

/// Contents of every `<script>` tag, JSON payloads included.
pub fn script_blocks(html: &str) -> Vec<String> {
    tag_blocks(html, "script")
}

/// `(href, text)` of every anchor in a fragment.
pub fn anchors(html: &str) -> Vec<(String, String)> {
    let re = Regex::new(r#"(?s)<a[^>]*href="([^"]*)"[^>]*>(.*?)</a>"#).unwrap();
    re.captures_iter(html)
        .map(|caps| (caps[1].to_string(), strip_tags(&caps[2])))
        .collect()
}

/// Recover the balanced JSON object or array that follows `marker` in a
/// script body. Strings are tracked so braces inside values do not end the
/// scan early. Returns the raw JSON slice.
pub fn extract_json_after<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    let marker_pos = text.find(marker)?;
    let after = &text[marker_pos + marker.len()..];
    let start = after.find(['{', '['])?;
    let body = &after[start..];

    let open = body.chars().next()?;
    let close = if open == '{' { '}' } else { ']' };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in body.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        if c == '"' {
            in_string = true;
        } else if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Some(&body[..=i]);
            }
        }
    }
    None
}

/// Remove markup from a fragment and collapse whitespace.
pub fn strip_tags(fragment: &str) -> String {
    let re = Regex::new(r"<[^>]*>").unwrap();
    let text = re.replace_all(fragment, " ");
    let text = text
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_content_both_attribute_orders() {
        let a = r#"<meta property="og:title" content="My Playlist">"#;
        let b = r#"<meta content="My Playlist" property="og:title">"#;
        assert_eq!(meta_content(a, "og:title").unwrap(), "My Playlist");
        assert_eq!(meta_content(b, "og:title").unwrap(), "My Playlist");
        assert!(meta_content(a, "og:image").is_none());
    }

    #[test]
    fn test_select_first_text_ordered_fallback() {
        let html = r#"
            <h2 class="f-ff2">Scraped Title</h2>
            <meta property="og:title" content="Meta Title">
        "#;
        let title = select_first_text(
            html,
            &[Selector::Class("f-ff2"), Selector::MetaProperty("og:title")],
        );
        assert_eq!(title.unwrap(), "Scraped Title");

        let title = select_first_text(
            html,
            &[
                Selector::Class("missing"),
                Selector::MetaProperty("og:title"),
            ],
        );
        assert_eq!(title.unwrap(), "Meta Title");
    }

    #[test]
    fn test_class_text_strips_nested_markup() {
        let html = r#"<div class="data__name_txt"><b>Hot</b> Songs</div>"#;
        assert_eq!(class_text(html, "data__name_txt").unwrap(), "Hot Songs");
    }

    #[test]
    fn test_class_blocks_balance_nested_same_tag() {
        let html = r#"<div class="row"><div>Cell A</div><div>Cell B</div></div><p>after</p>"#;
        let blocks = class_blocks(html, &["div"], "row");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0], "<div>Cell A</div><div>Cell B</div>");
    }

    #[test]
    fn test_tag_blocks_do_not_match_longer_tag_names() {
        let html = r#"<track kind="captions"><tr><td>Cell</td></tr>"#;
        let blocks = tag_blocks(html, "tr");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0], "<td>Cell</td>");
    }

    #[test]
    fn test_attr_blocks() {
        let html = r#"<div role="row"><span>A</span></div><div role="cell">B</div>"#;
        let blocks = attr_blocks(html, "div", "role", "row");
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].contains("A"));
    }

    #[test]
    fn test_cell_texts_from_divs() {
        let row = r#"<div>Title</div><div></div><div><span>Artist</span></div>"#;
        let cells = cell_texts(row);
        assert_eq!(cells, vec!["Title".to_string(), "Artist".to_string()]);
    }

    #[test]
    fn test_extract_json_after_balanced_object() {
        let script = r#"window.__INITIAL_DATA__ = {"a": {"b": 1}, "c": [2, 3]};"#;
        let json = extract_json_after(script, "window.__INITIAL_DATA__").unwrap();
        assert_eq!(json, r#"{"a": {"b": 1}, "c": [2, 3]}"#);
        let value: serde_json::Value = serde_json::from_str(json).unwrap();
        assert_eq!(value["a"]["b"], 1);
    }

    #[test]
    fn test_extract_json_after_ignores_braces_in_strings() {
        let script = r#"GPlaylist = {"name": "a } tricky \" title", "n": 1};"#;
        let json = extract_json_after(script, "GPlaylist").unwrap();
        let value: serde_json::Value = serde_json::from_str(json).unwrap();
        assert_eq!(value["n"], 1);
    }

    #[test]
    fn test_extract_json_after_array() {
        let script = r#"window.PLAYLIST_TRACK_FULL_INFO = [{"id": 9}];"#;
        let json = extract_json_after(script, "PLAYLIST_TRACK_FULL_INFO").unwrap();
        assert_eq!(json, r#"[{"id": 9}]"#);
    }

    #[test]
    fn test_extract_json_after_unbalanced_returns_none() {
        let script = r#"GCollection = {"oops": {"#;
        assert!(extract_json_after(script, "GCollection").is_none());
        assert!(extract_json_after(script, "missing_marker").is_none());
    }

    #[test]
    fn test_anchors() {
        let html = r#"<ul class="f-hide">
            <li><a href="/song?id=123">First <em>Song</em></a></li>
            <li><a href="/song?id=456">Second Song</a></li>
        </ul>"#;
        let lists = class_blocks(html, &["ul"], "f-hide");
        assert_eq!(lists.len(), 1);
        let found = anchors(&lists[0]);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0], ("/song?id=123".into(), "First Song".into()));
    }

    #[test]
    fn test_script_blocks() {
        let html =
            r#"<script>var a = 1;</script><script type="application/json">{"x":1}</script>"#;
        let blocks = script_blocks(html);
        assert_eq!(blocks.len(), 2);
        assert!(blocks[1].contains("\"x\""));
    }

    #[test]
    fn test_strip_tags_decodes_entities() {
        assert_eq!(strip_tags("A &amp; B &#39;C&#39;"), "A & B 'C'");
        assert_eq!(strip_tags("  <i>a</i>\n b  "), "a b");
    }
}
