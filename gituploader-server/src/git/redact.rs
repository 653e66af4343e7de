//! Scrubbing credentials out of command text and diagnostics.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

const MASK: &str = "***";

/// Shorter secrets are only masked as URL userinfo. Masking them anywhere
/// would mangle ordinary output.
pub const MIN_SECRET_LEN: usize = 8;

// Userinfo of any URL git may echo back, e.g. `https://token@host/`.
static URL_USERINFO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"://[^/@\s]+@").expect("userinfo pattern is valid"));

/// Replaces known secrets, and any URL userinfo, with `***`.
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    secrets: Vec<String>,
}

impl Redactor {
    /// Redactor for an access token embedded in a remote URL.
    ///
    /// The percent-encoded form is masked as well, since that is what ends
    /// up in the URL when the token contains reserved characters. Tokens
    /// shorter than [`MIN_SECRET_LEN`] are left to the userinfo pattern.
    pub fn for_token(token: &str) -> Self {
        let mut secrets = Vec::new();
        if token.len() >= MIN_SECRET_LEN {
            secrets.push(token.to_string());
            if let Some(encoded) = encoded_userinfo(token) {
                if encoded != token {
                    secrets.push(encoded);
                }
            }
        }
        // Longest first so a secret containing another is masked whole.
        secrets.sort_by_key(|s| std::cmp::Reverse(s.len()));
        Self { secrets }
    }

    pub fn redact(&self, text: &str) -> String {
        let mut out = text.to_string();
        for secret in &self.secrets {
            out = out.replace(secret.as_str(), MASK);
        }
        URL_USERINFO
            .replace_all(&out, format!("://{MASK}@").as_str())
            .into_owned()
    }
}

fn encoded_userinfo(token: &str) -> Option<String> {
    let mut url = Url::parse("https://redact.invalid/").ok()?;
    url.set_username(token).ok()?;
    Some(url.username().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masks_token() {
        let redactor = Redactor::for_token("ghp_abc123");
        assert_eq!(
            redactor.redact("git remote add origin https://ghp_abc123@github.com/o/r.git"),
            "git remote add origin https://***@github.com/o/r.git"
        );
        assert_eq!(redactor.redact("token ghp_abc123 leaked"), "token *** leaked");
    }

    #[test]
    fn test_masks_encoded_token() {
        let redactor = Redactor::for_token("ghp x/y_123");
        let text = "fatal: could not read from ghp%20x%2Fy_123";
        assert!(!redactor.redact(text).contains("ghp%20x%2Fy_123"));
    }

    #[test]
    fn test_masks_unknown_userinfo() {
        let redactor = Redactor::default();
        assert_eq!(
            redactor.redact("fatal: unable to access 'https://someone@github.com/o/r.git/'"),
            "fatal: unable to access 'https://***@github.com/o/r.git/'"
        );
    }

    #[test]
    fn test_short_token_only_masked_in_urls() {
        let redactor = Redactor::for_token("a");
        assert_eq!(
            redactor.redact("Initialized empty Git repository in /tmp/upload/.git/"),
            "Initialized empty Git repository in /tmp/upload/.git/"
        );
        assert_eq!(
            redactor.redact("git remote add origin https://a@github.com/o/r.git"),
            "git remote add origin https://***@github.com/o/r.git"
        );
    }

    #[test]
    fn test_leaves_plain_text() {
        let redactor = Redactor::for_token("secret");
        assert_eq!(redactor.redact("git push -f origin main"), "git push -f origin main");
    }
}
