//! Command template compiler
//!
//! Turns a human-written template such as
//! `vset /object/[uint]/color [uint] [uint] [uint]` into a compiled matcher.
//!
//! ## Grammar
//!
//! ```text
//! template    := (literal | placeholder)*
//! placeholder := '[' type ']'
//! type        := 'str' | 'uint' | 'float'
//! ```
//!
//! Brackets do not nest and a stray `]` is an error. Each placeholder becomes
//! one capture group, numbered left to right.

use dispatch_types::TypeSpecifier;
use regex::Regex;

use crate::error::TemplateError;

/// One piece of a compiled template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text that must appear verbatim
    Literal(String),
    /// A typed argument slot
    Placeholder(TypeSpecifier),
}

/// A compiled command template.
///
/// Immutable once built. Two templates with equal `pattern()` are
/// structurally identical and match exactly the same inputs.
#[derive(Debug, Clone)]
pub struct CommandTemplate {
    raw: String,
    segments: Vec<Segment>,
    pattern: String,
    matcher: Regex,
}

impl CommandTemplate {
    /// Raw template as written at registration
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Compiled pattern source, one capture group per placeholder
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Placeholder types in capture-group order
    pub fn placeholders(&self) -> impl Iterator<Item = TypeSpecifier> + '_ {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(spec) => Some(*spec),
            Segment::Literal(_) => None,
        })
    }

    /// Number of placeholders
    pub fn arity(&self) -> usize {
        self.placeholders().count()
    }

    /// Whether `input` matches the whole template
    pub fn is_match(&self, input: &str) -> bool {
        self.matcher.is_match(input)
    }

    /// Match `input` against the whole template and extract the captured
    /// arguments in order.
    ///
    /// Extraction stops at the first capture group that did not participate
    /// in the match or after `limit` arguments. An empty capture is a valid
    /// argument. Returns `None` when the input does not match.
    pub fn captures(&self, input: &str, limit: usize) -> Option<Vec<String>> {
        let caps = self.matcher.captures(input)?;
        let mut args = Vec::new();
        for group in (1..caps.len()).take(limit) {
            match caps.get(group) {
                Some(m) => args.push(m.as_str().to_string()),
                None => break,
            }
        }
        Some(args)
    }

    /// Re-join the literal segments with `args`, one argument per placeholder.
    ///
    /// Missing arguments render as empty text.
    pub fn render<S: AsRef<str>>(&self, args: &[S]) -> String {
        let mut out = String::new();
        let mut next = args.iter();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(_) => {
                    if let Some(arg) = next.next() {
                        out.push_str(arg.as_ref());
                    }
                }
            }
        }
        out
    }
}

/// Scanner state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Literal,
    InsideTypeSpecifier,
}

/// Compile a raw template.
///
/// Errors name the offending character index (counted in chars, not bytes).
pub fn compile_template(raw: &str) -> Result<CommandTemplate, TemplateError> {
    let mut segments = Vec::new();
    let mut state = ScanState::Literal;
    let mut literal = String::new();
    let mut type_name = String::new();

    for (index, ch) in raw.chars().enumerate() {
        match (state, ch) {
            (ScanState::Literal, '[') => {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                state = ScanState::InsideTypeSpecifier;
            }
            (ScanState::Literal, ']') => {
                return Err(TemplateError::malformed(raw, index, "unexpected ']'"));
            }
            (ScanState::Literal, _) => literal.push(ch),
            (ScanState::InsideTypeSpecifier, '[') => {
                return Err(TemplateError::malformed(raw, index, "unexpected '['"));
            }
            (ScanState::InsideTypeSpecifier, ']') => {
                let spec = TypeSpecifier::from_name(&type_name).ok_or_else(|| {
                    TemplateError::UnknownTypeSpecifier {
                        template: raw.to_string(),
                        name: type_name.clone(),
                    }
                })?;
                segments.push(Segment::Placeholder(spec));
                type_name.clear();
                state = ScanState::Literal;
            }
            (ScanState::InsideTypeSpecifier, _) => type_name.push(ch),
        }
    }

    if state == ScanState::InsideTypeSpecifier {
        return Err(TemplateError::malformed(
            raw,
            raw.chars().count(),
            "'[' is never closed by ']'",
        ));
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    let pattern = segments
        .iter()
        .map(|segment| match segment {
            Segment::Literal(text) => regex::escape(text),
            Segment::Placeholder(spec) => spec.pattern().to_string(),
        })
        .collect::<String>();

    let matcher = Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
        TemplateError::malformed(raw, 0, format!("pattern rejected by matcher: {}", e))
    })?;

    Ok(CommandTemplate {
        raw: raw.to_string(),
        segments,
        pattern,
        matcher,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_compile_object_color_template() {
        let template = compile_template("vset /object/[str]/color [uint] [uint] [uint]").unwrap();
        assert_eq!(template.arity(), 4);
        assert_eq!(
            template.placeholders().collect::<Vec<_>>(),
            vec![
                TypeSpecifier::Str,
                TypeSpecifier::UInt,
                TypeSpecifier::UInt,
                TypeSpecifier::UInt
            ]
        );

        let args = template
            .captures("vset /object/Chair_3/color 255 0 128", usize::MAX)
            .unwrap();
        assert_eq!(args, vec!["Chair_3", "255", "0", "128"]);
    }

    #[test]
    fn test_unterminated_specifier_is_malformed() {
        let err = compile_template("a[b").unwrap_err();
        assert!(matches!(
            err,
            TemplateError::MalformedTemplate { index: 3, .. }
        ));
    }

    #[test]
    fn test_unterminated_empty_specifier_is_malformed() {
        let err = compile_template("vget [").unwrap_err();
        assert!(matches!(err, TemplateError::MalformedTemplate { .. }));
    }

    #[test]
    fn test_stray_close_is_malformed() {
        let err = compile_template("a]b").unwrap_err();
        assert!(matches!(
            err,
            TemplateError::MalformedTemplate { index: 1, .. }
        ));
    }

    #[test]
    fn test_nested_open_is_malformed() {
        let err = compile_template("a[st[r]]").unwrap_err();
        assert!(matches!(
            err,
            TemplateError::MalformedTemplate { index: 4, .. }
        ));
    }

    #[test]
    fn test_unknown_specifier() {
        let err = compile_template("[foo]").unwrap_err();
        assert_eq!(
            err,
            TemplateError::UnknownTypeSpecifier {
                template: "[foo]".into(),
                name: "foo".into()
            }
        );
    }

    #[test]
    fn test_empty_specifier_is_unknown() {
        let err = compile_template("vget []").unwrap_err();
        assert!(matches!(
            err,
            TemplateError::UnknownTypeSpecifier { ref name, .. } if name.is_empty()
        ));
    }

    #[test]
    fn test_float_boundary() {
        let template = compile_template("[float]").unwrap();
        assert!(template.is_match("-3.14"));
        assert!(template.is_match("0.5"));
        assert!(template.is_match("+.5"));
        assert!(!template.is_match("5"));
        assert!(!template.is_match("5."));
        assert!(!template.is_match("abc"));
    }

    #[test]
    fn test_uint_accepts_empty_and_digits_only() {
        let template = compile_template("vget /camera/[uint]/location").unwrap();
        assert!(template.is_match("vget /camera/0/location"));
        assert!(template.is_match("vget /camera//location"));
        assert!(!template.is_match("vget /camera/-1/location"));
        assert!(!template.is_match("vget /camera/1.5/location"));
    }

    #[test]
    fn test_numeric_placeholders_reject_non_ascii_digits() {
        let uint = compile_template("vget /camera/[uint]").unwrap();
        assert!(uint.is_match("vget /camera/3"));
        assert!(!uint.is_match("vget /camera/\u{0663}"));

        let float = compile_template("f [float]").unwrap();
        assert!(float.is_match("f 3.5"));
        assert!(!float.is_match("f \u{0663}.\u{0665}"));
        assert!(!float.is_match("f 3.\u{0665}"));
    }

    #[test]
    fn test_str_matches_empty_argument() {
        let template = compile_template("echo [str]").unwrap();
        assert_eq!(template.captures("echo ", 8).unwrap(), vec![String::new()]);
    }

    #[test]
    fn test_match_is_full_string() {
        let template = compile_template("vget /camera/[uint]").unwrap();
        assert!(!template.is_match("xvget /camera/1"));
        assert!(!template.is_match("vget /camera/1 trailing"));
    }

    #[test]
    fn test_literals_are_escaped() {
        let template = compile_template("a.b ([uint])?").unwrap();
        assert!(template.is_match("a.b (12)?"));
        assert!(!template.is_match("axb (12)?"));
        assert!(!template.is_match("a.b 12"));
    }

    #[test]
    fn test_identical_templates_share_pattern() {
        let first = compile_template("vget /object/[str]/location").unwrap();
        let second = compile_template("vget /object/[str]/location").unwrap();
        assert_eq!(first.pattern(), second.pattern());
        assert_eq!(first.pattern(), r"vget /object/(.*)/location");
    }

    #[test]
    fn test_captures_respects_limit() {
        let template = compile_template("[uint] [uint] [uint]").unwrap();
        assert_eq!(template.captures("1 2 3", 2).unwrap(), vec!["1", "2"]);
    }

    #[test]
    fn test_render_rejoins_literals() {
        let template = compile_template("vset /object/[str]/rotation [float] [float]").unwrap();
        assert_eq!(
            template.render(&["Sofa", "1.5", "-0.25"]),
            "vset /object/Sofa/rotation 1.5 -0.25"
        );
    }

    #[test]
    fn test_template_without_placeholders() {
        let template = compile_template("vget /unrealcv/status").unwrap();
        assert_eq!(template.arity(), 0);
        assert_eq!(
            template.captures("vget /unrealcv/status", 8).unwrap(),
            Vec::<String>::new()
        );
    }
}
