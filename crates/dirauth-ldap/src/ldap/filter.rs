//! LDAP search filter expressions
//!
//! Filter text is parsed by `ldap3` into its BER structure, combined
//! structurally and rendered back to text only when handed to the directory
//! client. Values that come from users must go through [`escape`] before they
//! are placed in filter text.

use dirauth_core::{Error, Result};
use ldap3::asn1::{ASNTag, StructureTag, TagClass, PL};
use std::borrow::Cow;
use std::fmt;

/// Nesting limit for parsed filters
const MAX_DEPTH: usize = 64;

// RFC 4511 Filter choice tags
const AND_FILT: u64 = 0;
const OR_FILT: u64 = 1;
const NOT_FILT: u64 = 2;
const EQ_MATCH: u64 = 3;
const SUBSTR_MATCH: u64 = 4;
const GTE_MATCH: u64 = 5;
const LTE_MATCH: u64 = 6;
const PRES_MATCH: u64 = 7;
const APPROX_MATCH: u64 = 8;
const EXT_MATCH: u64 = 9;

const SUB_INITIAL: u64 = 0;
const SUB_ANY: u64 = 1;
const SUB_FINAL: u64 = 2;

const EXT_RULE: u64 = 1;
const EXT_TYPE: u64 = 2;
const EXT_VALUE: u64 = 3;
const EXT_DN: u64 = 4;

/// Escape a value for use inside filter text
pub fn escape(value: &str) -> Cow<'_, str> {
    ldap3::ldap_escape(value)
}

/// A validated search filter.
///
/// The empty filter imposes no constraint and is the neutral element of [`LdapFilter::and`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LdapFilter {
    root: Option<StructureTag>,
}

impl LdapFilter {
    /// Parse filter text. Surrounding parentheses are optional; blank text gives the empty filter.
    pub fn new(text: &str) -> Result<Self> {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return Ok(Self::empty());
        }

        if nesting_depth(&normalized) > MAX_DEPTH {
            return Err(Error::invalid_filter(text.trim(), "filter nested too deeply"));
        }

        let tag = ldap3::parse_filter(&normalized)
            .map_err(|()| Error::invalid_filter(text.trim(), "not a valid RFC 4515 filter"))?;

        Ok(Self {
            root: Some(tag.into_structure()),
        })
    }

    pub fn empty() -> Self {
        Self { root: None }
    }

    /// Equality match on a raw, unescaped value
    pub fn equality(attr: &str, value: &str) -> Result<Self> {
        Self::new(&format!("({}={})", attr.trim(), escape(value)))
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Conjunction of two filters
    #[must_use]
    pub fn and(self, other: LdapFilter) -> LdapFilter {
        match (self.root, other.root) {
            (None, root) | (root, None) => LdapFilter { root },
            (Some(a), Some(b)) => LdapFilter {
                root: Some(StructureTag {
                    class: TagClass::Context,
                    id: AND_FILT,
                    payload: PL::C(vec![a, b]),
                }),
            },
        }
    }

    /// Filter text for the directory client; the empty filter matches every entry.
    pub fn to_search_string(&self) -> String {
        if self.is_empty() {
            "(objectClass=*)".to_string()
        } else {
            self.to_string()
        }
    }
}

impl std::str::FromStr for LdapFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for LdapFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.root {
            Some(tag) => write_filter(f, tag),
            None => Ok(()),
        }
    }
}

fn normalize(filter: &str) -> String {
    let trimmed = filter.trim();
    if trimmed.is_empty() || (trimmed.starts_with('(') && trimmed.ends_with(')')) {
        trimmed.to_string()
    } else {
        format!("({})", trimmed)
    }
}

/// Deepest parenthesis nesting; values can only carry parentheses escaped
fn nesting_depth(text: &str) -> usize {
    let mut depth = 0usize;
    let mut max = 0usize;
    for b in text.bytes() {
        match b {
            b'(' => {
                depth += 1;
                max = max.max(depth);
            }
            b')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    max
}

// ============================================================================
// Decompiler
// ============================================================================

fn constructed(tag: &StructureTag) -> std::result::Result<&[StructureTag], fmt::Error> {
    match &tag.payload {
        PL::C(inner) => Ok(inner),
        PL::P(_) => Err(fmt::Error),
    }
}

fn primitive(tag: &StructureTag) -> std::result::Result<&[u8], fmt::Error> {
    match &tag.payload {
        PL::P(bytes) => Ok(bytes),
        PL::C(_) => Err(fmt::Error),
    }
}

fn write_attr(f: &mut fmt::Formatter<'_>, attr: &[u8]) -> fmt::Result {
    f.write_str(&String::from_utf8_lossy(attr))
}

fn write_value(f: &mut fmt::Formatter<'_>, value: &[u8]) -> fmt::Result {
    match std::str::from_utf8(value) {
        Ok(text) => {
            for c in text.chars() {
                match c {
                    '*' | '(' | ')' | '\\' | '\0' => write!(f, "\\{:02x}", c as u32)?,
                    _ => write!(f, "{}", c)?,
                }
            }
        }
        Err(_) => {
            for &b in value {
                if b > 0x7f || matches!(b, b'*' | b'(' | b')' | b'\\' | 0) {
                    write!(f, "\\{:02x}", b)?;
                } else {
                    write!(f, "{}", b as char)?;
                }
            }
        }
    }
    Ok(())
}

fn write_filter(f: &mut fmt::Formatter<'_>, tag: &StructureTag) -> fmt::Result {
    match tag.id {
        AND_FILT | OR_FILT => {
            f.write_str(if tag.id == AND_FILT { "(&" } else { "(|" })?;
            for child in constructed(tag)? {
                write_filter(f, child)?;
            }
            f.write_str(")")
        }
        NOT_FILT => {
            f.write_str("(!")?;
            for child in constructed(tag)? {
                write_filter(f, child)?;
            }
            f.write_str(")")
        }
        EQ_MATCH | GTE_MATCH | LTE_MATCH | APPROX_MATCH => {
            let op = match tag.id {
                EQ_MATCH => "=",
                GTE_MATCH => ">=",
                LTE_MATCH => "<=",
                _ => "~=",
            };
            let [attr, value] = constructed(tag)? else {
                return Err(fmt::Error);
            };
            f.write_str("(")?;
            write_attr(f, primitive(attr)?)?;
            f.write_str(op)?;
            write_value(f, primitive(value)?)?;
            f.write_str(")")
        }
        PRES_MATCH => {
            f.write_str("(")?;
            write_attr(f, primitive(tag)?)?;
            f.write_str("=*)")
        }
        SUBSTR_MATCH => {
            let [attr, subs] = constructed(tag)? else {
                return Err(fmt::Error);
            };
            let subs = constructed(subs)?;
            f.write_str("(")?;
            write_attr(f, primitive(attr)?)?;
            f.write_str("=")?;
            if let Some(initial) = subs.iter().find(|s| s.id == SUB_INITIAL) {
                write_value(f, primitive(initial)?)?;
            }
            f.write_str("*")?;
            for any in subs.iter().filter(|s| s.id == SUB_ANY) {
                write_value(f, primitive(any)?)?;
                f.write_str("*")?;
            }
            if let Some(last) = subs.iter().find(|s| s.id == SUB_FINAL) {
                write_value(f, primitive(last)?)?;
            }
            f.write_str(")")
        }
        EXT_MATCH => {
            let parts = constructed(tag)?;
            let part = |id: u64| parts.iter().find(|p| p.id == id);

            f.write_str("(")?;
            if let Some(attr) = part(EXT_TYPE) {
                write_attr(f, primitive(attr)?)?;
            }
            if let Some(dn) = part(EXT_DN) {
                if primitive(dn)?.first().is_some_and(|b| *b != 0) {
                    f.write_str(":dn")?;
                }
            }
            if let Some(rule) = part(EXT_RULE) {
                f.write_str(":")?;
                write_attr(f, primitive(rule)?)?;
            }
            f.write_str(":=")?;
            if let Some(value) = part(EXT_VALUE) {
                write_value(f, primitive(value)?)?;
            }
            f.write_str(")")
        }
        _ => Err(fmt::Error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(text: &str) -> LdapFilter {
        LdapFilter::new(text).unwrap()
    }

    #[test]
    fn test_empty_filter() {
        assert!(filter("").is_empty());
        assert!(filter("   ").is_empty());
        assert_eq!(filter("").to_string(), "");
        assert_eq!(filter("").to_search_string(), "(objectClass=*)");
    }

    #[test]
    fn test_wraps_missing_parentheses() {
        assert_eq!(filter("objectClass=person").to_string(), "(objectClass=person)");
        assert_eq!(filter("  (uid=jdoe)  ").to_string(), "(uid=jdoe)");
    }

    #[test]
    fn test_and_identity() {
        let samples = [
            "(uid=jdoe)",
            "(&(objectClass=person)(!(disabled=TRUE)))",
            "(|(mail=*@example.com)(cn=J*n*e))",
        ];
        for text in samples {
            let f = filter(text);
            assert_eq!(LdapFilter::empty().and(f.clone()), f);
            assert_eq!(f.clone().and(LdapFilter::empty()), f);
        }
        assert!(LdapFilter::empty().and(LdapFilter::empty()).is_empty());
    }

    #[test]
    fn test_and_requires_both() {
        let combined = filter("objectClass=person").and(filter("(uid=jdoe)"));
        assert_eq!(combined.to_string(), "(&(objectClass=person)(uid=jdoe))");

        let nested = combined.and(filter("(mail=*)"));
        assert_eq!(
            nested.to_string(),
            "(&(&(objectClass=person)(uid=jdoe))(mail=*))"
        );
    }

    #[test]
    fn test_decompile_operators() {
        for text in [
            "(cn~=john)",
            "(uidNumber>=1000)",
            "(uidNumber<=2000)",
            "(cn=*)",
            "(cn=jo*)",
            "(cn=*hn)",
            "(cn=j*o*h*n)",
            "(cn:caseExactMatch:=John)",
            "(ou:dn:=people)",
            "(:1.2.840.113556.1.4.803:=2)",
            "(memberOf:1.2.840.113556.1.4.1941:=cn=admins\\2cdc=example)",
            "(&)",
            "(|)",
        ] {
            assert_eq!(filter(text).to_string(), text.replace("\\2c", ","), "round trip {}", text);
        }
    }

    #[test]
    fn test_escapes_are_canonicalized() {
        assert_eq!(filter("(cn=a\\2A)").to_string(), "(cn=a\\2a)");
        assert_eq!(filter("(cn=\\61bc)").to_string(), "(cn=abc)");
        assert_eq!(filter("(cn=caf\\c3\\a9)").to_string(), "(cn=caf\u{e9})");
        assert_eq!(filter("(cn=\\ff)").to_string(), "(cn=\\ff)");
    }

    #[test]
    fn test_escaped_value_cannot_inject() {
        let hostile = "jdoe)(uid=*";
        let text = format!("(uid={})", escape(hostile));
        let parsed = filter(&text);
        assert_eq!(parsed, LdapFilter::equality("uid", hostile).unwrap());
        assert_eq!(parsed.to_string(), "(uid=jdoe\\29\\28uid=\\2a)");
    }

    #[test]
    fn test_malformed_rejected_at_construction() {
        for text in [
            "(uid=jdoe",
            "uid=jdoe)",
            "(&(a=b)",
            "((a=b))",
            "(=b)",
            "(a=b(c)",
            "(a=\\zz)",
            "(a=\\4)",
            "(a~=b*)",
            "(a=b)(c=d)",
            "(a=b**c)",
            "(!(a=b)(c=d))",
            "(a b=c)",
            "(:=x)",
            "(_x=y)",
            "(1bad=x)",
        ] {
            let err = LdapFilter::new(text).unwrap_err();
            assert_eq!(err.code(), "InvalidFilter", "expected InvalidFilter for {:?}", text);
        }
    }

    #[test]
    fn test_composed_text_is_accepted_by_client() {
        let composed = filter("(objectClass=person)")
            .and(filter("(|(cn=J*n*e)(!(mail=*)))"))
            .and(LdapFilter::equality("uid", "a*b(c)").unwrap());
        let text = composed.to_search_string();

        assert!(ldap3::parse_filter(&text).is_ok(), "{}", text);
        assert_eq!(filter(&text), composed);
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}(a=b){}", "(!".repeat(100), ")".repeat(100));
        assert!(LdapFilter::new(&deep).is_err());
    }

    #[test]
    fn test_equality_constructor_validates_attribute() {
        assert!(LdapFilter::equality("uid", "x").is_ok());
        assert!(LdapFilter::equality("ui)d", "x").is_err());
        assert!(LdapFilter::equality("", "x").is_err());
    }
}
