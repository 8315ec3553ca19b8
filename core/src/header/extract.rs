use crate::header::yaml_block::{parse_first_document, parse_header_block};
use crate::header::{CommentMarker, Extraction, FormatHint, HEADER_MARKER};

/// Pull the header region out of `content` for the given surrounding syntax.
pub fn extract(content: &str, format: FormatHint) -> Extraction {
    match format {
        FormatHint::Document => extract_document(content),
        FormatHint::Docstring => extract_docstring(content),
        FormatHint::LineComment(marker) => extract_line_comment(content, marker),
        FormatHint::Structured => parse_first_document(content),
    }
}

/// Same as [`extract`] for raw file bytes. A leading BOM is ignored.
pub fn extract_bytes(bytes: &[u8], format: FormatHint) -> Extraction {
    match std::str::from_utf8(bytes) {
        Ok(text) => extract(text.strip_prefix('\u{feff}').unwrap_or(text), format),
        Err(_) => Extraction::malformed("artifact is not valid UTF-8"),
    }
}

// A marker line made of more than three dashes.
fn is_deviant_marker(line: &str) -> bool {
    line.len() > HEADER_MARKER.len() && line.chars().all(|c| c == '-')
}

fn extract_document(content: &str) -> Extraction {
    let mut lines = content.lines();
    let first = match lines.next() {
        Some(l) => l.trim_end(),
        None => return Extraction::NotFound,
    };
    if is_deviant_marker(first) {
        return Extraction::malformed(format!(
            "opening marker `{}` must be exactly `{}`",
            first, HEADER_MARKER
        ));
    }
    if first != HEADER_MARKER {
        return Extraction::NotFound;
    }
    collect_block(lines, "document")
}

fn collect_block<'a>(lines: impl Iterator<Item = &'a str>, what: &str) -> Extraction {
    let mut block: Vec<&str> = Vec::new();
    for line in lines {
        let t = line.trim_end();
        if t == HEADER_MARKER {
            return parse_header_block(&block.join("\n"));
        }
        if is_deviant_marker(t) {
            return Extraction::malformed(format!(
                "deviant marker `{}` inside {} header",
                t, what
            ));
        }
        block.push(line);
    }
    Extraction::malformed(format!(
        "{} header has no closing `{}` marker",
        what, HEADER_MARKER
    ))
}

fn extract_docstring(content: &str) -> Extraction {
    let mut lines = content.lines();

    // Shebang, encoding cookies and blank lines may precede the docstring.
    let opening = loop {
        match lines.next() {
            None => return Extraction::NotFound,
            Some(l) => {
                let t = l.trim();
                if t.is_empty() || t.starts_with('#') {
                    continue;
                }
                break t;
            }
        }
    };

    let unprefixed = opening
        .strip_prefix(['r', 'R', 'u', 'U'])
        .unwrap_or(opening);
    let quote = if unprefixed.starts_with("\"\"\"") {
        "\"\"\""
    } else if unprefixed.starts_with("'''") {
        "'''"
    } else {
        return Extraction::NotFound;
    };

    let rest = &unprefixed[quote.len()..];
    let first_line = if rest.trim().is_empty() {
        match lines.next() {
            Some(l) => l.trim(),
            None => return Extraction::NotFound,
        }
    } else {
        rest.trim()
    };
    if is_deviant_marker(first_line) {
        return Extraction::malformed(format!(
            "opening marker `{}` must be exactly `{}`",
            first_line, HEADER_MARKER
        ));
    }
    if first_line != HEADER_MARKER {
        return Extraction::NotFound;
    }

    let mut block: Vec<&str> = Vec::new();
    for line in lines {
        let t = line.trim();
        if t == HEADER_MARKER {
            return parse_header_block(&block.join("\n"));
        }
        if is_deviant_marker(t) {
            return Extraction::malformed(format!("deviant marker `{}` inside docstring header", t));
        }
        if t.contains(quote) {
            return Extraction::malformed("docstring closes before the header's closing marker");
        }
        block.push(line);
    }
    Extraction::malformed(format!(
        "docstring header has no closing `{}` marker",
        HEADER_MARKER
    ))
}

fn strip_comment(line: &str, marker: CommentMarker) -> Option<&str> {
    let rest = line.strip_prefix(marker.as_str())?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

fn extract_line_comment(content: &str, marker: CommentMarker) -> Extraction {
    let mut lines = content.lines().enumerate();

    let opening = loop {
        match lines.next() {
            None => return Extraction::NotFound,
            Some((idx, l)) => {
                if l.trim().is_empty() || (idx == 0 && l.starts_with("#!")) {
                    continue;
                }
                break l;
            }
        }
    };
    let stripped = match strip_comment(opening, marker) {
        Some(s) => s.trim_end(),
        None => return Extraction::NotFound,
    };
    if is_deviant_marker(stripped) {
        return Extraction::malformed(format!(
            "opening marker `{}` must be exactly `{}`",
            stripped, HEADER_MARKER
        ));
    }
    if stripped != HEADER_MARKER {
        return Extraction::NotFound;
    }

    let mut block: Vec<&str> = Vec::new();
    for (idx, line) in lines {
        let Some(s) = strip_comment(line, marker) else {
            return Extraction::malformed(format!(
                "line {} ends the comment run before the closing `{}` marker",
                idx + 1,
                HEADER_MARKER
            ));
        };
        let t = s.trim_end();
        if t == HEADER_MARKER {
            return parse_header_block(&block.join("\n"));
        }
        if is_deviant_marker(t) {
            return Extraction::malformed(format!("deviant marker `{}` inside comment header", t));
        }
        block.push(s);
    }
    Extraction::malformed(format!(
        "comment header has no closing `{}` marker before end of file",
        HEADER_MARKER
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn found(e: Extraction) -> crate::header::RawHeader {
        match e {
            Extraction::Found(h) => h,
            other => panic!("expected header, got {:?}", other),
        }
    }

    #[test]
    fn document_header_is_extracted() {
        let h = found(extract(
            "---\nid: ADR-0001\nowner: team-a\nstatus: active\n---\n# Title\n",
            FormatHint::Document,
        ));
        assert_eq!(h.len(), 3);
        assert_eq!(h.get("owner"), Some(&json!("team-a")));
    }

    #[test]
    fn document_without_marker_has_no_header() {
        assert_eq!(
            extract("# Title\n\nbody\n", FormatHint::Document),
            Extraction::NotFound
        );
    }

    #[test]
    fn document_marker_must_be_first_line() {
        assert_eq!(
            extract("\n---\nowner: a\n---\n", FormatHint::Document),
            Extraction::NotFound
        );
    }

    #[test]
    fn deviant_opening_marker_is_malformed() {
        let out = extract("------\nid: ADR-0001\n------\n", FormatHint::Document);
        assert!(matches!(out, Extraction::Malformed { .. }));
    }

    #[test]
    fn deviant_closing_marker_is_malformed() {
        let out = extract("---\nid: ADR-0001\n-----\nbody\n", FormatHint::Document);
        assert!(matches!(out, Extraction::Malformed { .. }));
    }

    #[test]
    fn unterminated_document_header_is_malformed() {
        let out = extract("---\nid: ADR-0001\nowner: x\n", FormatHint::Document);
        assert!(matches!(out, Extraction::Malformed { .. }));
    }

    #[test]
    fn empty_document_header_is_found_but_empty() {
        let h = found(extract("---\n---\nbody", FormatHint::Document));
        assert!(h.is_empty());
    }

    #[test]
    fn docstring_header_after_shebang() {
        let src = "#!/usr/bin/env python3\n\"\"\"\n---\nowner: team-a\nstatus: active\n---\nRotates keys.\n\"\"\"\nimport os\n";
        let h = found(extract(src, FormatHint::Docstring));
        assert_eq!(h.get("status"), Some(&json!("active")));
    }

    #[test]
    fn docstring_marker_on_opening_line() {
        let src = "'''---\nowner: team-a\n---\n'''\n";
        let h = found(extract(src, FormatHint::Docstring));
        assert_eq!(h.get("owner"), Some(&json!("team-a")));
    }

    #[test]
    fn plain_docstring_has_no_header() {
        let src = "\"\"\"Rotates keys.\"\"\"\nimport os\n";
        assert_eq!(extract(src, FormatHint::Docstring), Extraction::NotFound);
    }

    #[test]
    fn docstring_closing_early_is_malformed() {
        let src = "\"\"\"\n---\nowner: team-a\n\"\"\"\nimport os\n";
        let out = extract(src, FormatHint::Docstring);
        assert!(matches!(out, Extraction::Malformed { .. }));
    }

    #[test]
    fn line_comment_header_strips_one_space() {
        let src = "#!/bin/bash\n# ---\n# owner: team-a\n#status: active\n# tags:\n#   - ops\n# ---\necho hi\n";
        let h = found(extract(src, FormatHint::LineComment(CommentMarker::Hash)));
        assert_eq!(h.get("owner"), Some(&json!("team-a")));
        assert_eq!(h.get("status"), Some(&json!("active")));
        assert_eq!(h.get("tags"), Some(&json!(["ops"])));
    }

    #[test]
    fn line_comment_run_broken_by_code_is_malformed() {
        let src = "# ---\n# owner: team-a\necho hi\n# ---\n";
        let out = extract(src, FormatHint::LineComment(CommentMarker::Hash));
        assert!(matches!(out, Extraction::Malformed { .. }));
    }

    #[test]
    fn line_comment_missing_close_at_eof_is_malformed() {
        let src = "// ---\n// owner: team-a\n";
        let out = extract(src, FormatHint::LineComment(CommentMarker::DoubleSlash));
        assert!(matches!(out, Extraction::Malformed { .. }));
    }

    #[test]
    fn non_utf8_bytes_are_malformed() {
        let out = extract_bytes(&[0xff, 0xfe, 0x00], FormatHint::Document);
        assert!(matches!(out, Extraction::Malformed { .. }));
    }

    #[test]
    fn bom_is_ignored() {
        let h = found(extract_bytes(
            "\u{feff}---\nowner: a\n---\n".as_bytes(),
            FormatHint::Document,
        ));
        assert_eq!(h.get("owner"), Some(&json!("a")));
    }
}
