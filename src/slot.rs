//! Slot grammar: find and decompose placeholder expressions in text.
//!
//! Two forms are recognized, shown here with the default `$` prefix:
//!
//! | Form | Example | Meaning |
//! |------|---------|---------|
//! | basic | `$PORT` | one environment variable, name is `[A-Za-z0-9_]+` |
//! | braced | `${PORT}` | same, braced |
//! | chain | `${PORT_1::PORT_2}` | first defined variable wins, left to right |
//! | fallback | `${PORT::-3000}` | literal after `::-` when nothing resolves |
//! | self-reference | `${self.api.port}` | value already present in the config tree |
//!
//! Chains mix freely: `${HOST::self.hostname::-localhost}`.
//!
//! A braced body that contains a token which is neither `self.<path>` nor a
//! variable name (for example `${PORT::=3000}`) is not a slot at all and stays
//! in the text untouched. A self-reference without a path (`${self.}`), an
//! empty body or an empty chain token is a hard error.

use std::ops::Range;

use crate::error::LayerfigError;

const CHAIN_SEPARATOR: &str = "::";
const FALLBACK_MARKER: &str = "::-";
const SELF_PREFIX: &str = "self.";

/// One candidate inside a slot chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// A runtime environment variable name.
    EnvVar { name: String },
    /// A dot-delimited path into the configuration tree being built.
    SelfReference { path: String },
}

/// A parsed placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotExpression {
    /// The exact text that gets replaced, prefix and braces included.
    pub full_match: String,
    /// Candidates in declaration order.
    pub references: Vec<Reference>,
    pub fallback: Option<String>,
}

impl SlotExpression {
    fn env_var(full_match: &str, name: &str) -> Self {
        Self {
            full_match: full_match.to_string(),
            references: vec![Reference::EnvVar {
                name: name.to_string(),
            }],
            fallback: None,
        }
    }

    /// Whether any candidate points back into the configuration tree.
    pub fn is_self_referencing(&self) -> bool {
        self.references
            .iter()
            .any(|r| matches!(r, Reference::SelfReference { .. }))
    }

    /// Names of the environment variables in the chain, in order.
    pub fn env_var_names(&self) -> Vec<&str> {
        self.references
            .iter()
            .filter_map(|r| match r {
                Reference::EnvVar { name } => Some(name.as_str()),
                Reference::SelfReference { .. } => None,
            })
            .collect()
    }
}

/// A slot found at a byte range of the scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Occurrence {
    pub span: Range<usize>,
    pub expr: SlotExpression,
}

/// Parse every distinct slot in `text`, in order of first appearance.
///
/// Returns an empty list when the text holds no slot. Fails with
/// [`LayerfigError::InvalidSlotSyntax`] on malformed braced slots.
pub fn parse_expression(text: &str, prefix: char) -> Result<Vec<SlotExpression>, LayerfigError> {
    let mut unique: Vec<SlotExpression> = Vec::new();
    for occurrence in scan(text, prefix)? {
        if !unique.iter().any(|e| e.full_match == occurrence.expr.full_match) {
            unique.push(occurrence.expr);
        }
    }
    Ok(unique)
}

/// Cheap check for anything that looks like a slot marker.
///
/// May return `true` for text that [`parse_expression`] later treats as
/// literal (an unclosed brace, an operator token), never the reverse.
pub fn has_slot(text: &str, prefix: char) -> bool {
    let mut rest = text;
    while let Some(offset) = rest.find(prefix) {
        rest = &rest[offset + prefix.len_utf8()..];
        match rest.chars().next() {
            Some(c) if c == '{' || is_word(c) => return true,
            Some(_) => {}
            None => return false,
        }
    }
    false
}

/// Locate every slot occurrence in `text`, duplicates included.
pub(crate) fn scan(text: &str, prefix: char) -> Result<Vec<Occurrence>, LayerfigError> {
    let mut found = Vec::new();
    let mut pos = 0;

    while let Some(offset) = text[pos..].find(prefix) {
        let start = pos + offset;
        let after = start + prefix.len_utf8();
        let rest = &text[after..];

        if let Some(inner) = rest.strip_prefix('{') {
            let Some(close) = inner.find('}') else {
                // Unclosed brace: not a slot, keep looking for basic ones.
                pos = after;
                continue;
            };
            let end = after + 1 + close + 1;
            let full_match = &text[start..end];
            if let Some(expr) = parse_braced(full_match, &inner[..close])? {
                found.push(Occurrence {
                    span: start..end,
                    expr,
                });
            }
            pos = end;
            continue;
        }

        let len = rest.find(|c: char| !is_word(c)).unwrap_or(rest.len());
        if len == 0 {
            pos = after;
            continue;
        }
        let end = after + len;
        found.push(Occurrence {
            span: start..end,
            expr: SlotExpression::env_var(&text[start..end], &rest[..len]),
        });
        pos = end;
    }

    Ok(found)
}

/// Decompose the body of a braced slot. `Ok(None)` means "literal text".
fn parse_braced(full_match: &str, body: &str) -> Result<Option<SlotExpression>, LayerfigError> {
    if body.trim().is_empty() {
        return Err(LayerfigError::invalid_slot(full_match, "slot body is empty"));
    }

    let (chain, fallback) = match body.split_once(FALLBACK_MARKER) {
        Some((chain, fallback)) => (chain, Some(fallback.to_string())),
        None => (body, None),
    };

    let mut references = Vec::new();
    for token in chain.split(CHAIN_SEPARATOR) {
        let token = token.trim();
        if token.is_empty() {
            return Err(LayerfigError::invalid_slot(
                full_match,
                "slot chain contains an empty reference",
            ));
        }

        if let Some(path) = token.strip_prefix(SELF_PREFIX) {
            let path = path.trim();
            if path.is_empty() {
                return Err(LayerfigError::invalid_slot(
                    full_match,
                    "self-reference is missing its property path",
                ));
            }
            references.push(Reference::SelfReference {
                path: path.to_string(),
            });
        } else if token.starts_with(is_word) {
            references.push(Reference::EnvVar {
                name: token.to_string(),
            });
        } else {
            return Ok(None);
        }
    }

    Ok(Some(SlotExpression {
        full_match: full_match.to_string(),
        references,
        fallback,
    }))
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn env(name: &str) -> Reference {
        Reference::EnvVar { name: name.into() }
    }

    fn this(path: &str) -> Reference {
        Reference::SelfReference { path: path.into() }
    }

    #[rstest]
    #[case("${PORT}", vec![env("PORT")], None)]
    #[case("${PORT::-3000}", vec![env("PORT")], Some("3000"))]
    #[case("${self.hostname}", vec![this("hostname")], None)]
    #[case("${self.hostname::HOSTNAME}", vec![this("hostname"), env("HOSTNAME")], None)]
    #[case("${HOSTNAME::self.hostname}", vec![env("HOSTNAME"), this("hostname")], None)]
    #[case(
        "${HOSTNAME::self.hostname::-localhost}",
        vec![env("HOSTNAME"), this("hostname")],
        Some("localhost")
    )]
    #[case("${PORT_1::PORT_2::-3000}", vec![env("PORT_1"), env("PORT_2")], Some("3000"))]
    #[case("${URL::-http://localhost:80}", vec![env("URL")], Some("http://localhost:80"))]
    #[case("${PORT::-}", vec![env("PORT")], Some(""))]
    fn braced_forms(
        #[case] text: &str,
        #[case] references: Vec<Reference>,
        #[case] fallback: Option<&str>,
    ) {
        let slots = parse_expression(text, '$').unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].full_match, text);
        assert_eq!(slots[0].references, references);
        assert_eq!(slots[0].fallback.as_deref(), fallback);
    }

    #[test]
    fn basic_form_is_single_env_var() {
        let slots = parse_expression("localhost:$PORT/api", '$').unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].full_match, "$PORT");
        assert_eq!(slots[0].references, vec![env("PORT")]);
        assert_eq!(slots[0].fallback, None);
    }

    #[test]
    fn multiple_slots_in_one_string() {
        let slots = parse_expression("http://$HOST:${PORT::-80}", '$').unwrap();
        let matches: Vec<&str> = slots.iter().map(|s| s.full_match.as_str()).collect();
        assert_eq!(matches, vec!["$HOST", "${PORT::-80}"]);
    }

    #[test]
    fn duplicates_are_parsed_once() {
        let slots = parse_expression("$PORT and $PORT", '$').unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(scan("$PORT and $PORT", '$').unwrap().len(), 2);
    }

    #[test]
    fn basic_names_do_not_swallow_each_other() {
        let occurrences = scan("$PORT-$PORT_2", '$').unwrap();
        assert_eq!(occurrences[0].span, 0..5);
        assert_eq!(occurrences[1].span, 6..13);
        assert_eq!(occurrences[1].expr.references, vec![env("PORT_2")]);
    }

    #[test]
    fn custom_prefix() {
        let slots = parse_expression("@{NAME::-x} costs $5", '@').unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].references, vec![env("NAME")]);
    }

    #[rstest]
    #[case("${NAME1::NAME2::=Nolan}")]
    #[case("${NAME1::NAME2::+Nolan}")]
    #[case("${-Nolan}")]
    fn operators_other_than_fallback_leave_literal(#[case] text: &str) {
        assert!(parse_expression(text, '$').unwrap().is_empty());
    }

    #[rstest]
    #[case("${self.}")]
    #[case("${ self. }")]
    #[case("${PORT::self.}")]
    #[case("${}")]
    #[case("${A::::B}")]
    fn malformed_slots_are_errors(#[case] text: &str) {
        let err = parse_expression(text, '$').unwrap_err();
        assert!(matches!(err, LayerfigError::InvalidSlotSyntax { .. }));
    }

    #[test]
    fn no_slot_text() {
        assert!(parse_expression("price: 5$ or $ 6", '$').unwrap().is_empty());
        assert!(parse_expression("", '$').unwrap().is_empty());
    }

    #[test]
    fn unclosed_brace_is_literal_but_later_slots_count() {
        let slots = parse_expression("${OPEN and $CLOSED", '$').unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].full_match, "$CLOSED");
    }

    #[test]
    fn has_slot_detects_markers() {
        assert!(has_slot("This is a test with ${FOO} and ${BAR::self.baz}", '$'));
        assert!(has_slot("$PORT", '$'));
        assert!(!has_slot("This is a test without slots", '$'));
        assert!(!has_slot("trailing $", '$'));
        assert!(!has_slot("$PORT", '@'));
    }

    #[test]
    fn self_reference_helpers() {
        let slots = parse_expression("${HOST::self.host::ALT}", '$').unwrap();
        assert!(slots[0].is_self_referencing());
        assert_eq!(slots[0].env_var_names(), vec!["HOST", "ALT"]);
    }
}
