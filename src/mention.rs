//! Mention tokens that make Google Chat ping users.

/// Token that pings everyone in the space.
pub const MENTION_ALL: &str = "<users/all> ";

/// Turn a comma-separated id list into mention tokens.
///
/// Ids are deduplicated by exact string, keeping first-seen order. Any id
/// equal to `all` (ignoring case) is dropped from the list and replaced
/// by a single [`MENTION_ALL`] token at the front.
///
/// ```
/// use tracing_google_chat::mention::notifiable_text;
/// assert_eq!(notifiable_text("5,all,7,5"), "<users/all> <users/5> <users/7> ");
/// ```
pub fn notifiable_text(user_ids: &str) -> String {
    if user_ids.is_empty() {
        return String::new();
    }

    let mut seen: Vec<&str> = Vec::new();
    let mut mention_all = false;
    let mut others = String::new();

    for id in user_ids.split(',') {
        if seen.contains(&id) {
            continue;
        }
        seen.push(id);

        if id.eq_ignore_ascii_case("all") {
            mention_all = true;
        } else {
            others.push_str("<users/");
            others.push_str(id);
            others.push_str("> ");
        }
    }

    if mention_all {
        format!("{MENTION_ALL}{others}")
    } else {
        others
    }
}
