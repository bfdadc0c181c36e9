use std::collections::HashSet;

use regex::Regex;

/// The configurable `contains_sensitive` predicate consulted by the
/// Relocation Manager's sanitization check (§4.H). A positive result means
/// full delete from all indices; there is no partial redaction path.
pub trait SanitizationPolicy: Send + Sync {
    fn contains_sensitive(
        &self,
        prompt_text: &str,
        reasoning_trace: &str,
        final_response: &str,
        access_roles: &HashSet<String>,
        entities: &HashSet<String>,
    ) -> bool;
}

/// Never flags anything. Useful for tests that want relocation without
/// sanitization noise.
pub struct NoOpSanitizationPolicy;

impl SanitizationPolicy for NoOpSanitizationPolicy {
    fn contains_sensitive(
        &self,
        _prompt_text: &str,
        _reasoning_trace: &str,
        _final_response: &str,
        _access_roles: &HashSet<String>,
        _entities: &HashSet<String>,
    ) -> bool {
        false
    }
}

/// Reference sanitization policy: a deny-word list, a PII-shaped-token
/// heuristic (email/phone), an `access_roles` tag-prefix check, and an
/// entity-label deny list. A real deployment swaps this for a stronger
/// classifier behind the same trait.
pub struct BasicSanitizationPolicy {
    deny_words: Vec<String>,
    deny_entity_labels: HashSet<String>,
    role_tag_prefixes: Vec<String>,
    email_pattern: Regex,
    phone_pattern: Regex,
}

impl Default for BasicSanitizationPolicy {
    fn default() -> Self {
        Self {
            deny_words: vec![
                "secret".to_string(),
                "confidential".to_string(),
                "password".to_string(),
            ],
            deny_entity_labels: HashSet::new(),
            role_tag_prefixes: vec!["secret:".to_string()],
            email_pattern: email_regex(),
            phone_pattern: phone_regex(),
        }
    }
}

impl BasicSanitizationPolicy {
    pub fn new(
        deny_words: Vec<String>,
        deny_entity_labels: HashSet<String>,
        role_tag_prefixes: Vec<String>,
    ) -> Self {
        Self {
            deny_words,
            deny_entity_labels,
            role_tag_prefixes,
            email_pattern: email_regex(),
            phone_pattern: phone_regex(),
        }
    }

    fn text_flagged(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.deny_words.iter().any(|word| lowered.contains(&word.to_lowercase()))
            || self.email_pattern.is_match(text)
            || self.phone_pattern.is_match(text)
    }
}

/// Matches a bare `user@domain.tld`-shaped token; reference-grade, not
/// RFC 5322 complete.
fn email_regex() -> Regex {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("static email pattern")
}

/// Matches a North-American-style phone number: optional country code,
/// area code, and a 3-4 digit split, with `.`, `-`, or space separators.
fn phone_regex() -> Regex {
    Regex::new(r"(\+?1[-.\s]?)?\(?\d{3}\)?[-.\s]\d{3}[-.\s]\d{4}\b").expect("static phone pattern")
}

impl SanitizationPolicy for BasicSanitizationPolicy {
    fn contains_sensitive(
        &self,
        prompt_text: &str,
        reasoning_trace: &str,
        final_response: &str,
        access_roles: &HashSet<String>,
        entities: &HashSet<String>,
    ) -> bool {
        if self.text_flagged(prompt_text)
            || self.text_flagged(reasoning_trace)
            || self.text_flagged(final_response)
        {
            return true;
        }

        let role_flagged = access_roles.iter().any(|role| {
            self.role_tag_prefixes
                .iter()
                .any(|prefix| role.starts_with(prefix.as_str()))
        });
        if role_flagged {
            return true;
        }

        entities.iter().any(|e| self.deny_entity_labels.contains(e))
    }
}
