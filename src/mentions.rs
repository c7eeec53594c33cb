use regex::Regex;

use crate::types::User;

/// A mention token found in comment text.
///
/// Mentions are id-addressed: `@[usr-12:Ada Lovelace]`. Matching on the
/// embedded user id makes resolution immune to display-name collisions and
/// renames; the display part is only there for readability of the raw body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionRef {
    pub user_id: String,
    pub display: String,
}

/// Build the canonical mention token for a user.
pub fn mention_token(user: &User) -> String {
    format!("@[{}:{}]", user.id, user.name)
}

/// Extract all mention tokens from a comment body, in order of appearance.
/// Malformed tokens are ignored.
pub fn parse_mentions(body: &str) -> Vec<MentionRef> {
    let re = Regex::new(r"@\[([^:\[\]]+):([^\[\]]+)\]").unwrap();

    re.captures_iter(body)
        .map(|cap| MentionRef {
            user_id: cap[1].to_string(),
            display: cap[2].to_string(),
        })
        .collect()
}

/// Rewrite mention tokens to plain `@Display Name` text for terminal
/// output.
pub fn render_mentions(body: &str) -> String {
    let re = Regex::new(r"@\[([^:\[\]]+):([^\[\]]+)\]").unwrap();
    re.replace_all(body, "@$2").into_owned()
}

/// Resolve mentions against the candidate users (the issue's organization
/// members), de-duplicated by id, preserving first-occurrence order.
/// Unknown ids resolve to nothing.
pub fn resolve_mentions<'a>(body: &str, candidates: &'a [User]) -> Vec<&'a User> {
    let mut seen: Vec<&str> = Vec::new();
    let mut resolved = Vec::new();

    for mention in parse_mentions(body) {
        if seen.contains(&mention.user_id.as_str()) {
            continue;
        }
        if let Some(user) = candidates.iter().find(|u| u.id == mention.user_id) {
            seen.push(&user.id);
            resolved.push(user);
        }
    }

    resolved
}
