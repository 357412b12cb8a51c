//! Parsers for the Python-literal list strings carried by the raw CSV
//! snapshots (`"['salt', 'water']"`, `"[51.5, 0.0, 13.0, ...]"`).

/// Parse a bracketed list of quoted strings.
///
/// Accepts single or double quotes with backslash escapes, and bare tokens
/// as a fallback. Returns `None` when the value is not a bracketed list.
#[must_use]
pub fn parse_str_list(raw: &str) -> Option<Vec<String>> {
    let inner = strip_brackets(raw)?;
    let mut items = Vec::new();
    let mut chars = inner.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace() || *c == ',') {
            chars.next();
        }
        let Some(&first) = chars.peek() else { break };

        if first == '\'' || first == '"' {
            let quote = first;
            chars.next();
            let mut item = String::new();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            item.push(escaped);
                        }
                    }
                    c if c == quote => {
                        closed = true;
                        break;
                    }
                    c => item.push(c),
                }
            }
            if !closed {
                return None;
            }
            items.push(item);
        } else {
            let mut item = String::new();
            for c in chars.by_ref() {
                if c == ',' {
                    break;
                }
                item.push(c);
            }
            let trimmed = item.trim();
            if !trimmed.is_empty() {
                items.push(trimmed.to_string());
            }
        }
    }

    Some(items)
}

/// Parse a bracketed list of floats.
#[must_use]
pub fn parse_f64_list(raw: &str) -> Option<Vec<f64>> {
    let inner = strip_brackets(raw)?;
    if inner.trim().is_empty() {
        return Some(Vec::new());
    }
    inner
        .split(',')
        .map(|part| part.trim().parse::<f64>().ok())
        .collect()
}

fn strip_brackets(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    trimmed.strip_prefix('[')?.strip_suffix(']')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quoted_ingredient_list() {
        let parsed = parse_str_list("['winter squash', 'mexican seasoning', 'honey']")
            .expect("list should parse");
        assert_eq!(parsed, vec!["winter squash", "mexican seasoning", "honey"]);
    }

    #[test]
    fn parses_double_quotes_and_escapes() {
        let parsed = parse_str_list(r#"["baker\'s chocolate", "salt"]"#).expect("list");
        assert_eq!(parsed, vec!["baker's chocolate", "salt"]);
    }

    #[test]
    fn parses_empty_list() {
        assert_eq!(parse_str_list("[]").expect("list"), Vec::<String>::new());
        assert_eq!(parse_f64_list("[]").expect("list"), Vec::<f64>::new());
    }

    #[test]
    fn parses_nutrition_tuple() {
        let parsed = parse_f64_list("[51.5, 0.0, 13.0, 0.0, 2.0, 0.0, 4.0]").expect("tuple");
        assert_eq!(parsed.len(), 7);
        assert!((parsed[0] - 51.5).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_unbracketed_values() {
        assert!(parse_str_list("salt, water").is_none());
        assert!(parse_f64_list("51.5").is_none());
    }

    #[test]
    fn rejects_non_numeric_tuple_member() {
        assert!(parse_f64_list("[51.5, abc]").is_none());
    }

    #[test]
    fn rejects_unterminated_quote() {
        assert!(parse_str_list("['salt").is_none());
    }
}
