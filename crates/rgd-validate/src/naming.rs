//! Identifier rules shared by the naming stage and editor tooling

use once_cell::sync::Lazy;
use regex::Regex;

static UPPER_CAMEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][a-zA-Z0-9]*$").expect("static regex"));

static LOWER_CAMEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-zA-Z0-9]*$").expect("static regex"));

static KUBERNETES_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^v\d+(?:(?:alpha|beta)\d+)?$").expect("static regex"));

/// Words the controller claims for itself; compared case-insensitively
pub const RESERVED_WORDS: &[&str] = &[
    "apiVersion",
    "context",
    "dependency",
    "dependencies",
    "externalRef",
    "externalReference",
    "externalRefs",
    "externalReferences",
    "graph",
    "instance",
    "kind",
    "kro",
    "metadata",
    "namespace",
    "object",
    "resource",
    "resourcegraphdefinition",
    "resources",
    "runtime",
    "schema",
    "serviceAccountName",
    "spec",
    "status",
    "variables",
    "vars",
    "version",
];

/// `WebApplication`, `Service2`
pub fn is_upper_camel_case(name: &str) -> bool {
    UPPER_CAMEL.is_match(name)
}

/// `database`, `webServer`
pub fn is_lower_camel_case(name: &str) -> bool {
    LOWER_CAMEL.is_match(name)
}

pub fn is_reserved_word(name: &str) -> bool {
    RESERVED_WORDS.iter().any(|w| w.eq_ignore_ascii_case(name))
}

/// `v1`, `v1alpha1`, `v2beta3`
pub fn is_kubernetes_version(version: &str) -> bool {
    KUBERNETES_VERSION.is_match(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upper_camel_case() {
        assert!(is_upper_camel_case("WebApp"));
        assert!(is_upper_camel_case("A1"));
        assert!(!is_upper_camel_case("webApp"));
        assert!(!is_upper_camel_case("Web_App"));
        assert!(!is_upper_camel_case(""));
    }

    #[test]
    fn test_lower_camel_case() {
        assert!(is_lower_camel_case("database"));
        assert!(is_lower_camel_case("webServer2"));
        assert!(!is_lower_camel_case("My_Resource"));
        assert!(!is_lower_camel_case("web-server"));
        assert!(!is_lower_camel_case("2fast"));
    }

    #[test]
    fn test_reserved_words_ignore_case() {
        assert!(is_reserved_word("spec"));
        assert!(is_reserved_word("Metadata"));
        assert!(is_reserved_word("ResourceGraphDefinition"));
        assert!(is_reserved_word("serviceaccountname"));
        assert!(!is_reserved_word("database"));
    }

    #[test]
    fn test_kubernetes_version() {
        assert!(is_kubernetes_version("v1"));
        assert!(is_kubernetes_version("v1alpha1"));
        assert!(is_kubernetes_version("v2beta3"));
        assert!(!is_kubernetes_version("1"));
        assert!(!is_kubernetes_version("v1gamma1"));
        assert!(!is_kubernetes_version("v1alpha"));
    }
}
