//! Lexical scope detection for search results.
//!
//! A single forward pass over a snippet's lines collects every namespace,
//! type and member declaration it sees and joins their names with `.`.
//! Braces are not tracked, so a chunk that leaves one class and enters a
//! sibling reports both; the path is a display hint, not a real enclosing
//! scope.

use std::sync::OnceLock;

use regex::Regex;

/// Return types that mark a line as a member declaration without any modifier.
const RETURN_TYPE_KEYWORDS: &[&str] = &["void", "bool", "int", "long", "string", "Task"];

/// Identifiers that precede `(` in statements rather than declarations.
const CONTROL_WORDS: &[&str] = &[
    "if", "for", "foreach", "while", "switch", "catch", "using", "lock", "return", "new",
    "nameof", "typeof", "sizeof", "await",
];

fn namespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^namespace\s+([A-Za-z_][\w.]*)").expect("namespace pattern is valid")
    })
}

fn type_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?:(?:public|private|protected|internal|static|abstract|sealed|partial|readonly|unsafe|export|final)\s+)*(?:class|interface|struct|enum)\s+([A-Za-z_]\w*)",
        )
        .expect("type pattern is valid")
    })
}

/// `modifiers* [ReturnType] Name (`, anchored at the start of the line.
/// Captures the modifier run, the return type's base name and the member name.
fn member_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^((?:(?:public|private|protected|internal|static|async|override|virtual|abstract|sealed|extern|unsafe|partial|readonly)\s+)*)(?:([A-Za-z_][\w.]*)(?:<[^()]*>)?(?:\[\])*\??\s+)?([A-Za-z_]\w*)\s*(?:<[^()]*>)?\s*\(",
        )
        .expect("member pattern is valid")
    })
}

/// Build the dotted scope path (`Namespace.Type.Member`) for a snippet.
///
/// Returns an empty string when no declaration is found.
pub fn resolve_scope(text: &str) -> String {
    let mut segments: Vec<String> = Vec::new();

    for line in text.lines() {
        let line = line.trim_start();
        if let Some(name) = declared_name(line) {
            segments.push(name);
        }
    }

    segments.join(".")
}

/// Name declared on a single trimmed line, trying namespace, type and member
/// patterns in that order.
fn declared_name(line: &str) -> Option<String> {
    if let Some(caps) = namespace_re().captures(line) {
        return Some(caps[1].to_string());
    }
    if let Some(caps) = type_re().captures(line) {
        return Some(caps[1].to_string());
    }
    member_name(line)
}

fn member_name(line: &str) -> Option<String> {
    if is_comment(line) {
        return None;
    }

    let caps = member_re().captures(line)?;
    let has_modifier = !caps[1].is_empty();
    let keyword_return_type = caps
        .get(2)
        .is_some_and(|ty| RETURN_TYPE_KEYWORDS.contains(&ty.as_str()));
    if !has_modifier && !keyword_return_type {
        return None;
    }

    let name = &caps[3];
    if CONTROL_WORDS.contains(&name) {
        return None;
    }
    Some(name.to_string())
}

fn is_comment(line: &str) -> bool {
    line.starts_with("//") || line.starts_with("/*") || line.starts_with('*')
}
