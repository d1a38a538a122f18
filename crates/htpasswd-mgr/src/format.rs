//! The `username:encoded-secret` line format.

use indexmap::IndexMap;

/// Usernames mapped to encoded secrets, in file order.
pub type Registry = IndexMap<String, String>;

/// Parses the contents of a credential file.
///
/// Each line is split on its first `:`; the username and secret are kept
/// verbatim apart from a trailing `\r`. Empty lines are ignored. Lines without
/// a separator or with an empty username are skipped with a warning. If a
/// username repeats, the last line wins but the entry keeps the position of
/// the first.
pub fn parse(contents: &str) -> Registry {
    let mut registry = Registry::new();

    for (index, line) in contents.split('\n').enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            continue;
        }

        match line.split_once(':') {
            Some((username, secret)) if !username.is_empty() => {
                registry.insert(username.to_string(), secret.to_string());
            }
            Some(_) => log::warn!("Skipping line {}: empty username", index + 1),
            None => log::warn!("Skipping line {}: missing ':' separator", index + 1),
        }
    }

    registry
}

/// Renders entries as file contents, one newline-terminated line each.
pub fn render<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    entries
        .into_iter()
        .map(|(username, secret)| format!("{username}:{secret}\n"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_file_order() {
        let registry = parse("zed:abc\nalice:def\nbob:ghi\n");
        let users: Vec<_> = registry.keys().map(String::as_str).collect();
        assert_eq!(users, ["zed", "alice", "bob"]);
        assert_eq!(registry["alice"], "def");
    }

    #[test]
    fn test_parse_splits_on_first_colon() {
        let registry = parse("alice:part:with:colons");
        assert_eq!(registry["alice"], "part:with:colons");
    }

    #[test]
    fn test_parse_skips_malformed_and_blank_lines() {
        let registry = parse("\nnocolon\n:nouser\n\r\nalice:$apr1$x$y\r\n\n");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry["alice"], "$apr1$x$y");
    }

    #[test]
    fn test_parse_keeps_usernames_verbatim() {
        let registry = parse("#admin:a\n bob :b\r\n\tcarol:c \ndésirée:d\n");
        let users: Vec<_> = registry.keys().map(String::as_str).collect();
        assert_eq!(users, ["#admin", " bob ", "\tcarol", "désirée"]);
        assert_eq!(registry[" bob "], "b");
        assert_eq!(registry["\tcarol"], "c ");
    }

    #[test]
    fn test_parse_strips_lone_trailing_carriage_return() {
        let registry = parse("alice:abc\r");
        assert_eq!(registry["alice"], "abc");
    }

    #[test]
    fn test_parse_accepts_missing_trailing_newline() {
        let registry = parse("alice:a\nbob:b");
        assert_eq!(registry.len(), 2);
        assert_eq!(registry["bob"], "b");
    }

    #[test]
    fn test_parse_duplicate_username_last_wins() {
        let registry = parse("alice:first\nbob:b\nalice:second\n");
        let users: Vec<_> = registry.keys().map(String::as_str).collect();
        assert_eq!(users, ["alice", "bob"]);
        assert_eq!(registry["alice"], "second");
    }

    #[test]
    fn test_parse_empty_secret_is_kept() {
        let registry = parse("alice:\n");
        assert_eq!(registry["alice"], "");
    }

    #[test]
    fn test_render() {
        let mut registry = Registry::new();
        registry.insert("alice".into(), "{SHA}abc=".into());
        registry.insert("bob".into(), "$apr1$salt$hash".into());
        assert_eq!(render(&registry), "alice:{SHA}abc=\nbob:$apr1$salt$hash\n");
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&Registry::new()), "");
    }

    #[test]
    fn test_render_then_parse_is_identity() {
        let original = parse("johnsmith:$apr1$xlWep/gn$6UNiHq3WE714EKfeH2X5c.\nbob:$2y$05$abc\n");
        assert_eq!(parse(&render(&original)), original);
    }
}
