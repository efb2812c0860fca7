//! ---
//! pw_section: "02-schema-generation"
//! pw_subsection: "module"
//! pw_type: "source"
//! pw_scope: "code"
//! pw_description: "Struct-to-schema translation primitives."
//! pw_version: "v0.1.0"
//! pw_owner: "tbd"
//! ---
//! Go struct tag handling.
//!
//! Tags follow the conventional `key:"value" key2:"value2"` layout. Parsing
//! stops at the first malformed pair, the same way Go's `reflect` does.

/// Key whose value supplies the serialized field name.
pub const SERIALIZATION_KEY: &str = "json";

/// Strip the quoting from a tag literal as it appears in source.
///
/// Raw literals lose their backticks; interpreted literals are unescaped.
pub fn literal_value(literal: &str) -> Option<String> {
    if let Some(raw) = literal.strip_prefix('`').and_then(|rest| rest.strip_suffix('`')) {
        return Some(raw.to_owned());
    }
    let inner = literal.strip_prefix('"')?.strip_suffix('"')?;
    unescape(inner)
}

/// Value stored under `key` in a tag string.
pub fn lookup(tag: &str, key: &str) -> Option<String> {
    let mut rest = tag.as_bytes();
    loop {
        while let [b' ', tail @ ..] = rest {
            rest = tail;
        }
        if rest.is_empty() {
            return None;
        }

        let name_len = rest
            .iter()
            .position(|&b| b <= b' ' || b == b':' || b == b'"' || b == 0x7f)
            .unwrap_or(rest.len());
        if name_len == 0 || name_len + 1 >= rest.len() || rest[name_len] != b':' || rest[name_len + 1] != b'"' {
            return None;
        }
        let name = &rest[..name_len];
        rest = &rest[name_len + 1..];

        // `rest` starts at the opening quote.
        let mut end = 1;
        while end < rest.len() && rest[end] != b'"' {
            if rest[end] == b'\\' {
                end += 1;
            }
            end += 1;
        }
        if end >= rest.len() {
            return None;
        }
        let quoted = &rest[1..end];
        rest = &rest[end + 1..];

        if name == key.as_bytes() {
            return unescape(std::str::from_utf8(quoted).ok()?);
        }
    }
}

/// Name a field is serialized under: the first comma-separated token of its
/// `json` tag, or the declared name when that token is empty or `-`.
pub fn serialized_name(tag: Option<&str>, field_name: &str) -> String {
    tag.and_then(|tag| lookup(tag, SERIALIZATION_KEY))
        .and_then(|value| {
            let name = value.split(',').next().unwrap_or_default();
            (!name.is_empty() && name != "-").then(|| name.to_owned())
        })
        .unwrap_or_else(|| field_name.to_owned())
}

fn unescape(text: &str) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = match chars.next()? {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            other => other,
        };
        out.push(escaped);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_finds_keys_anywhere_in_the_tag() {
        let tag = r#"db:"user_id" json:"id,omitempty" xml:"uid""#;
        assert_eq!(lookup(tag, "json").as_deref(), Some("id,omitempty"));
        assert_eq!(lookup(tag, "xml").as_deref(), Some("uid"));
        assert_eq!(lookup(tag, "yaml"), None);
    }

    #[test]
    fn lookup_stops_at_malformed_pairs() {
        assert_eq!(lookup(r#"json:id"#, "json"), None);
        assert_eq!(lookup(r#"bogus json:"id""#, "json"), None);
        assert_eq!(lookup(r#"json:"unterminated"#, "json"), None);
    }

    #[test]
    fn literal_value_handles_both_quoting_styles() {
        assert_eq!(literal_value(r#"`json:"id"`"#).as_deref(), Some(r#"json:"id""#));
        assert_eq!(literal_value(r#""json:\"id\"""#).as_deref(), Some(r#"json:"id""#));
        assert_eq!(literal_value("json"), None);
    }

    #[test]
    fn serialized_name_prefers_the_json_tag() {
        assert_eq!(serialized_name(Some(r#"json:"user_id,omitempty""#), "UserID"), "user_id");
        assert_eq!(serialized_name(Some(r#"json:",omitempty""#), "UserID"), "UserID");
        assert_eq!(serialized_name(Some(r#"json:"-""#), "Secret"), "Secret");
        assert_eq!(serialized_name(Some(r#"db:"x""#), "Name"), "Name");
        assert_eq!(serialized_name(None, "Name"), "Name");
    }
}
