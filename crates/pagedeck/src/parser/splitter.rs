use super::directives::is_directive;

const BREAK: &str = "\x00SLIDE_BREAK\x00";

/// Split a deck body (front matter already removed) into raw slide sources.
///
/// A slide ends at:
/// 1. a `---` line with blank lines (or the document edge) on both sides,
/// 2. a run of three or more blank lines,
/// 3. a `# ` heading when the slide already has content.
pub fn split(body: &str) -> Vec<String> {
    let body = body.replace("\r\n", "\n");
    let lines: Vec<&str> = body.split('\n').collect();

    let marked = mark_breaks(&lines);
    let joined = collapse_blank_runs(&marked).join("\n");

    let mut slides = Vec::new();
    for chunk in joined.split(BREAK).map(str::trim) {
        if !chunk.is_empty() {
            split_on_headings(chunk, &mut slides);
        }
    }
    slides
}

/// Replace standalone `---` separators with break markers.
fn mark_breaks<'a>(lines: &[&'a str]) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if is_dash_separator(line.trim()) {
            let prev_blank = out.last().is_none_or(|l| l.trim().is_empty() || *l == BREAK);
            let next_blank = lines.get(i + 1).is_none_or(|l| l.trim().is_empty());
            if prev_blank && next_blank {
                if out.last().is_some_and(|l| l.trim().is_empty()) {
                    out.pop();
                }
                out.push(BREAK);
                // the blank line after the separator belongs to the break
                i += 2;
                continue;
            }
        }
        out.push(line);
        i += 1;
    }
    out
}

/// Turn every run of three or more blank lines into a single break marker.
fn collapse_blank_runs<'a>(lines: &[&'a str]) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    let mut blanks = 0;
    for line in lines {
        if *line == BREAK {
            blanks = 0;
            out.push(line);
        } else if line.trim().is_empty() {
            blanks += 1;
            match blanks {
                1 | 2 => out.push(line),
                3 => {
                    out.truncate(out.len() - 2);
                    out.push(BREAK);
                }
                _ => {}
            }
        } else {
            blanks = 0;
            out.push(line);
        }
    }
    out
}

/// Start a new slide at every `# ` heading that follows content. Headings inside
/// fenced code never split, and directive lines directly above a heading travel
/// with it.
fn split_on_headings(chunk: &str, slides: &mut Vec<String>) {
    let mut current: Vec<&str> = Vec::new();
    let mut has_content = false;
    let mut fence: Option<(char, usize)> = None;

    for line in chunk.lines() {
        let trimmed = line.trim();

        fence = match fence {
            Some((ch, len)) => {
                let run = trimmed.chars().take_while(|&c| c == ch).count();
                let closes = run >= len && trimmed[run * ch.len_utf8()..].trim().is_empty();
                if closes { None } else { Some((ch, len)) }
            }
            None => open_fence(trimmed),
        };

        if fence.is_none() && line.starts_with("# ") && has_content {
            let carried = take_trailing_directives(&mut current);
            push_slide(&current, slides);
            current = carried;
            has_content = false;
        }

        current.push(line);
        if !trimmed.is_empty() && !is_directive(trimmed) {
            has_content = true;
        }
    }

    push_slide(&current, slides);
}

fn open_fence(trimmed: &str) -> Option<(char, usize)> {
    let ch = trimmed.chars().next()?;
    if ch != '`' && ch != '~' {
        return None;
    }
    let len = trimmed.chars().take_while(|&c| c == ch).count();
    (len >= 3).then_some((ch, len))
}

/// Remove the trailing block of directive (and blank) lines from `lines` and
/// return the directive lines.
fn take_trailing_directives<'a>(lines: &mut Vec<&'a str>) -> Vec<&'a str> {
    let keep = lines
        .iter()
        .rposition(|l| {
            let t = l.trim();
            !t.is_empty() && !is_directive(t)
        })
        .map_or(0, |i| i + 1);
    lines
        .split_off(keep)
        .into_iter()
        .filter(|l| !l.trim().is_empty())
        .collect()
}

fn push_slide(lines: &[&str], slides: &mut Vec<String>) {
    let text = lines.join("\n").trim().to_string();
    if !text.is_empty() {
        slides.push(text);
    }
}

fn is_dash_separator(line: &str) -> bool {
    line.len() >= 3 && line.chars().all(|c| c == '-')
}
