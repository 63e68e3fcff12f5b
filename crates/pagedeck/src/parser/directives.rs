use std::sync::LazyLock;

use regex::Regex;

use super::Directive;

static AT_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@([A-Za-z0-9_-]+)\s*:\s*(.*)$").expect("valid directive regex")
});

static COMMENT_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<!--\s*_?([A-Za-z0-9_-]+)\s*:\s*(.*?)\s*-->$").expect("valid directive regex")
});

/// Whether a trimmed line is an `@name: value` directive.
pub fn is_directive(line: &str) -> bool {
    AT_DIRECTIVE.is_match(line)
}

/// Parse one trimmed line as a directive, written as `@name: value` or
/// `<!-- name: value -->`. `-` and `_` in names are interchangeable.
pub fn parse_line(line: &str) -> Option<Directive> {
    let caps = AT_DIRECTIVE
        .captures(line)
        .or_else(|| COMMENT_DIRECTIVE.captures(line))?;
    Some(Directive {
        name: normalize_name(&caps[1]),
        value: caps[2].trim().to_string(),
    })
}

/// Pull directive lines out of a slide, returning them and the remaining markdown.
/// Lines inside fenced code are never directives.
pub fn extract(raw: &str) -> (Vec<Directive>, String) {
    let mut directives = Vec::new();
    let mut content: Vec<&str> = Vec::new();
    let mut in_fence = false;

    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
        }
        if !in_fence {
            if let Some(directive) = parse_line(trimmed) {
                directives.push(directive);
                continue;
            }
        }
        content.push(line);
    }

    (directives, content.join("\n").trim().to_string())
}

fn normalize_name(name: &str) -> String {
    name.to_ascii_lowercase().replace('-', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_directive() {
        let d = parse_line("@Chapter: Intro").unwrap();
        assert_eq!(d.name, "chapter");
        assert_eq!(d.value, "Intro");
    }

    #[test]
    fn test_comment_directive_with_scoped_prefix() {
        let d = parse_line("<!-- _skip-mobile: true -->").unwrap();
        assert_eq!(d.name, "skip_mobile");
        assert_eq!(d.value, "true");
    }

    #[test]
    fn test_plain_comment_is_not_directive() {
        assert!(parse_line("<!-- speaker notes -->").is_none());
        assert!(!is_directive("@ not a directive"));
    }

    #[test]
    fn test_extract_keeps_content_order() {
        let (directives, body) = extract("@list_split: 3\n# Title\n\nText\n@chapter: One");
        assert_eq!(directives.len(), 2);
        assert_eq!(directives[0].name, "list_split");
        assert_eq!(directives[1].value, "One");
        assert_eq!(body, "# Title\n\nText");
    }

    #[test]
    fn test_extract_ignores_fenced_code() {
        let (directives, body) = extract("```\n@chapter: nope\n```");
        assert!(directives.is_empty());
        assert!(body.contains("@chapter: nope"));
    }
}
