//! Syntactic recognition of embedded CEL expressions
//!
//! Values such as `${deployment.status.readyReplicas}` are evaluated by the
//! controller at runtime. Nothing here parses CEL; the helpers only find the
//! `${ ... }` delimiters so static checks can stay away from those values.

const REFERENCE_PREFIXES: &[&str] = &["spec.", "status.", "metadata."];

/// Check if a value contains an expression opener
pub fn contains_expression(value: &str) -> bool {
    value.contains("${")
}

/// Check if a value is a bare field reference such as `spec.name`
pub fn is_field_reference(value: &str) -> bool {
    REFERENCE_PREFIXES.iter().any(|p| value.starts_with(p))
}

/// Values that cannot be checked statically against a schema
pub fn is_dynamic(value: &str) -> bool {
    contains_expression(value) || is_field_reference(value)
}

/// Check if a value is exactly one `${...}` expression, ignoring outer whitespace
pub fn is_standalone_expression(value: &str) -> bool {
    let trimmed = value.trim();
    match expression_spans(trimmed).as_slice() {
        [(start, end)] => *start == 0 && *end == trimmed.len() && end - start > 3,
        _ => false,
    }
}

/// Byte spans `[start, end)` of every complete `${...}` expression in `value`.
///
/// Braces nest inside an expression and quoted CEL strings may contain
/// braces without closing it.
pub fn expression_spans(value: &str) -> Vec<(usize, usize)> {
    scan(value).0
}

/// Character offset of the first `${` that is never closed
pub fn find_unterminated(value: &str) -> Option<usize> {
    scan(value)
        .1
        .map(|byte| value[..byte].chars().count())
}

fn scan(value: &str) -> (Vec<(usize, usize)>, Option<usize>) {
    let bytes = value.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'{') {
            let start = i;
            let mut depth = 0usize;
            let mut quote: Option<u8> = None;
            let mut j = i + 1;
            let mut closed = None;

            while j < bytes.len() {
                let b = bytes[j];
                match quote {
                    Some(q) => {
                        if b == b'\\' {
                            j += 1;
                        } else if b == q {
                            quote = None;
                        }
                    }
                    None => match b {
                        b'"' | b'\'' => quote = Some(b),
                        b'{' => depth += 1,
                        b'}' => {
                            depth -= 1;
                            if depth == 0 {
                                closed = Some(j + 1);
                                break;
                            }
                        }
                        _ => {}
                    },
                }
                j += 1;
            }

            match closed {
                Some(end) => {
                    spans.push((start, end));
                    i = end;
                }
                None => return (spans, Some(start)),
            }
        } else {
            i += 1;
        }
    }

    (spans, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_dynamic() {
        assert!(is_dynamic("${schema.spec.name}"));
        assert!(is_dynamic("prefix-${schema.spec.name}-suffix"));
        assert!(is_dynamic("spec.replicas"));
        assert!(is_dynamic("status.ready"));
        assert!(is_dynamic("metadata.name"));
        assert!(!is_dynamic("nginx:latest"));
        assert!(!is_dynamic("$HOME"));
    }

    #[test]
    fn test_standalone_expression() {
        assert!(is_standalone_expression("${deployment.status.ready}"));
        assert!(is_standalone_expression("  ${a == 'b'}  "));
        assert!(is_standalone_expression("${items.map(i, {'k': i})}"));
        assert!(!is_standalone_expression("x-${a}"));
        assert!(!is_standalone_expression("${a}${b}"));
        assert!(!is_standalone_expression("${}"));
        assert!(!is_standalone_expression("${a"));
    }

    #[test]
    fn test_expression_spans() {
        let spans = expression_spans("a-${b}-${c.d}");
        assert_eq!(spans, vec![(2, 6), (7, 13)]);
    }

    #[test]
    fn test_quoted_brace_does_not_close() {
        assert_eq!(expression_spans("${x == '}'}"), vec![(0, 11)]);
        assert_eq!(find_unterminated("${x == '}'"), Some(0));
    }

    #[test]
    fn test_find_unterminated() {
        assert_eq!(find_unterminated("${a.b}"), None);
        assert_eq!(find_unterminated("ok ${a.b"), Some(3));
        assert_eq!(find_unterminated("é${"), Some(1));
        assert_eq!(find_unterminated("plain"), None);
    }
}
