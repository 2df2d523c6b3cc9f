//! Name-like values: rfc822 mailboxes, X.500 distinguished names and URIs.

use std::fmt;

use url::Url;

// ============================================================================
// rfc822Name
// ============================================================================

/// An e-mail style name `local@domain`.
///
/// The local part is case-sensitive, the domain is not.
#[derive(Debug, Clone)]
pub struct Rfc822Name {
    local: String,
    domain: String,
}

impl Rfc822Name {
    pub(crate) fn parse(literal: &str) -> Result<Self, String> {
        if literal.chars().any(char::is_whitespace) {
            return Err("rfc822Name must not contain whitespace".to_string());
        }
        let (local, domain) = literal
            .rsplit_once('@')
            .ok_or_else(|| "missing '@'".to_string())?;
        if local.is_empty() || domain.is_empty() {
            return Err("local part and domain must be non-empty".to_string());
        }
        Ok(Self {
            local: local.to_string(),
            domain: domain.to_string(),
        })
    }

    pub fn local_part(&self) -> &str {
        &self.local
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Matches this name against an `rfc822Name-match` pattern.
    ///
    /// - `local@domain`: exact mailbox (domain compared case-insensitively)
    /// - `.example.com`: any host strictly inside the domain
    /// - `example.com`: exactly that host
    pub fn matches_pattern(&self, pattern: &str) -> bool {
        if let Some((local, domain)) = pattern.rsplit_once('@') {
            return self.local == local && self.domain.eq_ignore_ascii_case(domain);
        }
        if pattern.starts_with('.') {
            let domain = self.domain.to_ascii_lowercase();
            return domain.ends_with(&pattern.to_ascii_lowercase());
        }
        self.domain.eq_ignore_ascii_case(pattern)
    }
}

impl PartialEq for Rfc822Name {
    fn eq(&self, other: &Self) -> bool {
        self.local == other.local && self.domain.eq_ignore_ascii_case(&other.domain)
    }
}

impl fmt::Display for Rfc822Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.local, self.domain)
    }
}

// ============================================================================
// x500Name
// ============================================================================

/// An X.500 distinguished name such as `cn=Jane Doe, o=Medico, c=US`.
///
/// The most specific RDN comes first. Comparison uses the normalised RDN
/// sequence: attribute types and values are trimmed, inner whitespace is
/// collapsed and case is ignored.
#[derive(Debug, Clone)]
pub struct X500Name {
    text: String,
    rdns: Vec<(String, String)>,
}

impl X500Name {
    pub(crate) fn parse(literal: &str) -> Result<Self, String> {
        let text = literal.trim();
        let mut rdns = Vec::new();
        if !text.is_empty() {
            for rdn in split_unescaped(text, ',') {
                let (attr, value) = rdn
                    .split_once('=')
                    .ok_or_else(|| format!("RDN '{}' has no '='", rdn.trim()))?;
                let attr = normalize(attr);
                if attr.is_empty() {
                    return Err(format!("RDN '{}' has an empty attribute type", rdn.trim()));
                }
                rdns.push((attr, normalize(value)));
            }
        }
        Ok(Self {
            text: text.to_string(),
            rdns,
        })
    }

    /// Number of relative distinguished names.
    pub fn len(&self) -> usize {
        self.rdns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rdns.is_empty()
    }

    /// `x500Name-match`: true when this name equals a terminal sequence of
    /// `other`'s RDNs.
    pub fn is_suffix_of(&self, other: &X500Name) -> bool {
        other.rdns.ends_with(&self.rdns)
    }
}

impl PartialEq for X500Name {
    fn eq(&self, other: &Self) -> bool {
        self.rdns == other.rdns
    }
}

impl fmt::Display for X500Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn normalize(part: &str) -> String {
    part.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn split_unescaped(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == separator {
            parts.push(&text[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&text[start..]);
    parts
}

// ============================================================================
// anyURI
// ============================================================================

/// A validated URI reference (absolute or relative).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnyUri(String);

impl AnyUri {
    pub(crate) fn parse(literal: &str) -> Result<Self, String> {
        if literal.chars().any(char::is_whitespace) {
            return Err("URI must not contain whitespace".to_string());
        }
        match Url::parse(literal) {
            Ok(_) => {}
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = Url::parse("http://relative.invalid/").map_err(|e| e.to_string())?;
                base.join(literal).map_err(|e| e.to_string())?;
            }
            Err(e) => return Err(e.to_string()),
        }
        Ok(Self(literal.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnyUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_rfc822_domain_is_case_insensitive() {
        let a = Rfc822Name::parse("Anderson@SUN.COM").expect("valid name");
        let b = Rfc822Name::parse("Anderson@sun.com").expect("valid name");
        let c = Rfc822Name::parse("anderson@sun.com").expect("valid name");
        assert_eq!(a, b);
        assert_ne!(a, c, "local part is case-sensitive");
    }

    #[test_case("Anderson@east.sun.com", true; "exact mailbox")]
    #[test_case("anderson@east.sun.com", false; "local part differs in case")]
    #[test_case("sun.com", false; "host differs")]
    #[test_case("east.sun.com", true; "exact host")]
    #[test_case(".sun.com", true; "any host in domain")]
    #[test_case(".east.sun.com", false; "domain suffix requires a subdomain")]
    fn test_rfc822_match_patterns(pattern: &str, expected: bool) {
        let name = Rfc822Name::parse("Anderson@EAST.sun.com").expect("valid name");
        assert_eq!(name.matches_pattern(pattern), expected, "{pattern}");
    }

    #[test_case("nobody"; "no at sign")]
    #[test_case("@sun.com"; "empty local part")]
    #[test_case("a b@sun.com"; "whitespace")]
    fn test_rfc822_rejects(literal: &str) {
        assert!(Rfc822Name::parse(literal).is_err());
    }

    #[test]
    fn test_x500_normalisation() {
        let a = X500Name::parse("cn=Jane  Doe, o=Medico Corp, c=US").expect("valid name");
        let b = X500Name::parse("CN=jane doe,O=medico corp,C=us").expect("valid name");
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        assert_eq!(a.to_string(), "cn=Jane  Doe, o=Medico Corp, c=US");
    }

    #[test]
    fn test_x500_terminal_sequence_match() {
        let org = X500Name::parse("o=Medico Corp, c=US").expect("valid name");
        let person = X500Name::parse("cn=Jane Doe, o=Medico Corp, c=US").expect("valid name");
        let other = X500Name::parse("cn=Jane Doe, o=Other, c=US").expect("valid name");
        assert!(org.is_suffix_of(&person));
        assert!(!org.is_suffix_of(&other));
        assert!(!person.is_suffix_of(&org));
    }

    #[test]
    fn test_x500_escaped_comma() {
        let name = X500Name::parse(r"cn=Doe\, Jane, c=US").expect("valid name");
        assert_eq!(name.len(), 2);
        assert!(X500Name::parse("cn=Jane, broken").is_err());
    }

    #[test_case("http://example.com/docs?id=1"; "absolute")]
    #[test_case("urn:example:resource:1"; "urn")]
    #[test_case("../relative/path"; "relative")]
    #[test_case(""; "empty reference")]
    fn test_any_uri_accepts(literal: &str) {
        assert_eq!(AnyUri::parse(literal).map(|u| u.to_string()), Ok(literal.to_string()));
    }

    #[test]
    fn test_any_uri_rejects_whitespace() {
        assert!(AnyUri::parse("http://example.com/a b").is_err());
    }
}
