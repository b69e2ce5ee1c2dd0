//! Client-side id generation: `<prefix>-<unix millis>-<9 base36 chars>`

use chrono::Utc;
use rand::Rng;

const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 9;

pub const POST_PREFIX: &str = "user-post";
pub const COMMENT_PREFIX: &str = "comment";
pub const REPLY_PREFIX: &str = "reply";

pub fn generate(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{}-{}-{}", prefix, Utc::now().timestamp_millis(), suffix)
}

pub fn post_id() -> String {
    generate(POST_PREFIX)
}

pub fn comment_id() -> String {
    generate(COMMENT_PREFIX)
}

pub fn reply_id() -> String {
    generate(REPLY_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_id_shape() {
        let id = post_id();
        let rest = id.strip_prefix("user-post-").unwrap();
        let (millis, suffix) = rest.split_once('-').unwrap();

        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_ids_are_distinct() {
        assert_ne!(comment_id(), comment_id());
        assert!(reply_id().starts_with("reply-"));
    }
}
