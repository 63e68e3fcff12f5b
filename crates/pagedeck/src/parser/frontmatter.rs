use serde::Deserialize;

use super::PresentationMeta;

#[derive(Debug, Default, Deserialize)]
struct RawMeta {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, alias = "lang")]
    language: Option<String>,
    #[serde(default, alias = "id")]
    identifier: Option<String>,
}

/// Split a leading YAML front matter block from the deck body.
///
/// A block that fails to parse is dropped with a warning; the body is kept.
pub fn extract(content: &str) -> (PresentationMeta, String) {
    let content = content.trim_start_matches('\u{feff}');
    let Some(rest) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    else {
        return (PresentationMeta::default(), content.to_string());
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &rest[..offset];
            let body = rest[offset + line.len()..].to_string();
            return (parse_yaml(yaml), body);
        }
        offset += line.len();
    }

    // unterminated: treat the whole thing as body
    (PresentationMeta::default(), content.to_string())
}

fn parse_yaml(yaml: &str) -> PresentationMeta {
    if yaml.trim().is_empty() {
        return PresentationMeta::default();
    }
    match serde_yaml::from_str::<RawMeta>(yaml) {
        Ok(raw) => PresentationMeta {
            title: raw.title,
            author: raw.author,
            description: raw.description,
            language: raw.language,
            identifier: raw.identifier,
        },
        Err(e) => {
            log::warn!("ignoring malformed front matter: {e}");
            PresentationMeta::default()
        }
    }
}
