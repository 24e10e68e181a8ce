//! Identifier grammar, sanitization, and node-id minting.
//!
//! Node ids follow `^[a-z0-9][a-z0-9._-]{1,62}@\d+(\.\d+){0,2}$` -- a
//! sanitized human name plus a monotonic per-name version suffix, e.g.
//! `fetch-data@2`. Port names follow `^[a-z][a-z0-9_]{0,63}$`. Both grammars
//! are matched with hand-rolled scanners rather than a regex engine.

/// Checks a full node id (`name@version`) against the id grammar.
pub fn is_valid_node_id(id: &str) -> bool {
    let Some((name, version)) = id.rsplit_once('@') else {
        return false;
    };
    if !is_valid_node_name(name) {
        return false;
    }
    // Version: 1 to 3 dot-separated groups of digits.
    let groups: Vec<&str> = version.split('.').collect();
    if groups.is_empty() || groups.len() > 3 {
        return false;
    }
    groups
        .iter()
        .all(|g| !g.is_empty() && g.bytes().all(|b| b.is_ascii_digit()))
}

/// Checks the name portion of a node id (before the `@`).
pub fn is_valid_node_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    if bytes.len() < 2 || bytes.len() > 63 {
        return false;
    }
    if !bytes[0].is_ascii_lowercase() && !bytes[0].is_ascii_digit() {
        return false;
    }
    bytes[1..]
        .iter()
        .all(|&b| b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'.' | b'_' | b'-'))
}

/// Checks a port name against `^[a-z][a-z0-9_]{0,63}$`.
pub fn is_valid_port_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() > 64 {
        return false;
    }
    if !bytes[0].is_ascii_lowercase() {
        return false;
    }
    bytes[1..]
        .iter()
        .all(|&b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

/// Sanitizes a free-form human name into a valid node name.
///
/// Lowercases, maps disallowed characters to `-`, strips disallowed leading
/// characters, and truncates to the 63-byte grammar limit. Empty input
/// falls back to `node`.
pub fn sanitize_node_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        let lower = ch.to_ascii_lowercase();
        if out.is_empty() {
            if lower.is_ascii_lowercase() || lower.is_ascii_digit() {
                out.push(lower);
            }
            continue;
        }
        if lower.is_ascii_lowercase()
            || lower.is_ascii_digit()
            || matches!(lower, '.' | '_' | '-')
        {
            out.push(lower);
        } else {
            out.push('-');
        }
    }
    while out.ends_with(['-', '.', '_']) {
        out.pop();
    }
    if out.is_empty() {
        out.push_str("node");
    }
    if out.len() < 2 {
        out.push('0');
    }
    out.truncate(63);
    out
}

/// Sanitizes a free-form name into a valid port name.
pub fn sanitize_port_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        let lower = ch.to_ascii_lowercase();
        if out.is_empty() {
            if lower.is_ascii_lowercase() {
                out.push(lower);
            }
            continue;
        }
        if lower.is_ascii_lowercase() || lower.is_ascii_digit() || lower == '_' {
            out.push(lower);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() {
        out.push_str("port");
    }
    out.truncate(64);
    out
}

/// Splits a node id into `(name, version)`. Returns `None` for malformed ids.
pub fn split_node_id(id: &str) -> Option<(&str, &str)> {
    id.rsplit_once('@')
}

/// Parses the major component of a node id's version suffix.
pub fn node_version_major(id: &str) -> Option<u64> {
    let (_, version) = split_node_id(id)?;
    version.split('.').next()?.parse().ok()
}

/// Mints a fresh node id for a human name: `<sanitized>@<1 + max existing
/// major version for that sanitized name>`.
pub fn mint_node_id<'a, I>(raw_name: &str, existing_ids: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let name = sanitize_node_name(raw_name);
    let max_version = existing_ids
        .into_iter()
        .filter(|id| split_node_id(id).map(|(n, _)| n == name).unwrap_or(false))
        .filter_map(node_version_major)
        .max()
        .unwrap_or(0);
    format!("{}@{}", name, max_version + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_node_ids() {
        assert!(is_valid_node_id("fetch-data@2"));
        assert!(is_valid_node_id("a0@1"));
        assert!(is_valid_node_id("svc.auth_v2@1.2.3"));
        assert!(is_valid_node_id("0leading-digit@10"));
    }

    #[test]
    fn invalid_node_ids() {
        assert!(!is_valid_node_id("fetch-data")); // no version
        assert!(!is_valid_node_id("x@1")); // name too short
        assert!(!is_valid_node_id("Fetch@1")); // uppercase
        assert!(!is_valid_node_id("fetch data@1")); // space
        assert!(!is_valid_node_id("fetch@1.2.3.4")); // too many groups
        assert!(!is_valid_node_id("fetch@")); // empty version
        assert!(!is_valid_node_id("fetch@1..2")); // empty group
        assert!(!is_valid_node_id("-lead@1")); // bad first char
    }

    #[test]
    fn valid_port_names() {
        assert!(is_valid_port_name("payload"));
        assert!(is_valid_port_name("a"));
        assert!(is_valid_port_name("out_2"));
    }

    #[test]
    fn invalid_port_names() {
        assert!(!is_valid_port_name(""));
        assert!(!is_valid_port_name("2fast"));
        assert!(!is_valid_port_name("Payload"));
        assert!(!is_valid_port_name("pay-load"));
        assert!(!is_valid_port_name(&"p".repeat(65)));
    }

    #[test]
    fn sanitize_node_names() {
        assert_eq!(sanitize_node_name("Fetch Data!"), "fetch-data");
        assert_eq!(sanitize_node_name("  --Weird"), "weird");
        assert_eq!(sanitize_node_name(""), "node");
        assert_eq!(sanitize_node_name("X"), "x0");
        assert!(is_valid_node_name(&sanitize_node_name("Fetch Data!")));
    }

    #[test]
    fn sanitize_port_names() {
        assert_eq!(sanitize_port_name("Pay-Load"), "pay_load");
        assert_eq!(sanitize_port_name("123"), "port");
        assert!(is_valid_port_name(&sanitize_port_name("Pay-Load")));
    }

    #[test]
    fn mint_first_version() {
        let id = mint_node_id("Fetch Data", std::iter::empty());
        assert_eq!(id, "fetch-data@1");
        assert!(is_valid_node_id(&id));
    }

    #[test]
    fn mint_bumps_past_existing_versions() {
        let existing = ["fetch-data@1", "fetch-data@4", "other@9"];
        let id = mint_node_id("fetch-data", existing.iter().copied());
        assert_eq!(id, "fetch-data@5");
    }

    #[test]
    fn mint_ignores_other_names() {
        let existing = ["fetch-data@3"];
        let id = mint_node_id("store-data", existing.iter().copied());
        assert_eq!(id, "store-data@1");
    }
}
