//! Source pattern compilation.
//!
//! # Responsibilities
//! - Escape characters that carry meaning in request URIs (`?`, `&`, `:`)
//! - Expand optional characters, non-capturing spans and smart wildcards
//! - Expand typed wildcards into capture groups, recording capture order
//!
//! # Design Decisions
//! - Each stage operates on the literal output of the previous one
//! - Unknown wildcard types stay in place and match only themselves
//! - Compilation never fails; the regex engine may still reject the result

use once_cell::sync::Lazy;
use regex::Regex;

use super::table::{self, SMART_WILDCARDS};

/// Replacement for `index.php` in sources and requests, so that such
/// requests can be matched without clashing with `?` escaping.
///
/// Every `index.php` in a source gets the sentinel, but [`normalize`] only
/// rewrites a leading one in the request. A source with `index.php` past its
/// first segment (`blog/index.php`) therefore never matches.
///
/// [`normalize`]: crate::routing::matcher::normalize
pub const INDEX_SENTINEL: &str = "index.php.jumplink";

const SENTINEL_SUFFIX: &str = ".jumplink";

static OPTIONAL_CHAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[([a-z0-9/])\]").expect("static pattern"));

static ESCAPED_WILDCARD_COLON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\{(!?[a-z]+)\\:([a-z]+)\}").expect("static pattern"));

static NON_CAPTURING: Lazy<Regex> = Lazy::new(|| Regex::new(r"<(.*?)>").expect("static pattern"));

static SMART: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    SMART_WILDCARDS
        .iter()
        .map(|(aliases, kind)| {
            let pattern = format!(r"(?i)\{{({})\}}", aliases.join("|"));
            (Regex::new(&pattern).expect("static pattern"), *kind)
        })
        .collect()
});

static TYPED: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(r"\{{(!?)([a-z]+):({})\}}", table::type_alternation());
    Regex::new(&pattern).expect("static pattern")
});

/// `{type:name}`, the type-first authoring order.
static TYPE_FIRST: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(r"\{{(!?)({}):([a-z]+)\}}", table::type_alternation());
    Regex::new(&pattern).expect("static pattern")
});

/// One capture group of a compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WildcardCapture {
    /// Wildcard name, referenced from the destination as `{name}`.
    pub name: String,
    /// Wildcard type from the table.
    pub kind: String,
    /// Declared as `{!name:type}`: never cleaned.
    pub raw: bool,
}

/// Result of compiling one source pattern.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    /// After escaping and optional-character expansion.
    pub escaped: String,
    /// After non-capturing spans and smart wildcards.
    pub expanded: String,
    /// Unanchored expression ready for the matcher.
    pub expression: String,
    /// Capture groups in left-to-right order.
    pub captures: Vec<WildcardCapture>,
}

impl CompiledPattern {
    /// Capture names in capture order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.captures.iter().map(|c| c.name.as_str())
    }
}

/// Compile a source pattern.
pub fn compile(source: &str) -> CompiledPattern {
    let escaped = escape(source);
    let escaped = ESCAPED_WILDCARD_COLON
        .replace_all(&escaped, "{${1}:${2}}")
        .into_owned();

    let mut expanded = NON_CAPTURING.replace_all(&escaped, "(?:${1})").into_owned();
    expanded = reorder_type_first(&expanded);
    for (matcher, kind) in SMART.iter() {
        if matcher.is_match(&expanded) {
            let replacement = format!("{{${{1}}:{kind}}}");
            expanded = matcher.replace_all(&expanded, replacement.as_str()).into_owned();
        }
    }

    let (expression, captures) = expand_typed(&expanded);

    CompiledPattern {
        escaped,
        expanded,
        expression: escape_stray_braces(&expression),
        captures,
    }
}

/// Remove the internal `index.php` sentinel from a string meant for display.
pub fn strip_sentinel(value: &str) -> String {
    value.replace(SENTINEL_SUFFIX, "")
}

fn escape(source: &str) -> String {
    let escaped = source
        .replace('?', r"\?")
        .replace(r"/\?", "/?")
        .replace('&', r"\&")
        .replace(':', r"\:")
        .replace("index.php", INDEX_SENTINEL);
    OPTIONAL_CHAR.replace_all(&escaped, "${1}?").into_owned()
}

/// Rewrite `{type:name}` as `{name:type}` when `name` is not itself a type.
fn reorder_type_first(pattern: &str) -> String {
    TYPE_FIRST
        .replace_all(pattern, |caps: &regex::Captures<'_>| {
            if table::fragment(&caps[3]).is_some() {
                caps[0].to_string()
            } else {
                format!("{{{}{}:{}}}", &caps[1], &caps[3], &caps[2])
            }
        })
        .into_owned()
}

fn expand_typed(expanded: &str) -> (String, Vec<WildcardCapture>) {
    let mut expression = String::with_capacity(expanded.len());
    let mut captures = Vec::new();
    let mut last = 0;

    for caps in TYPED.captures_iter(expanded) {
        let (Some(whole), Some(fragment)) = (caps.get(0), table::fragment(&caps[3])) else {
            continue;
        };
        let kind = &caps[3];

        expression.push_str(&expanded[last..whole.start()]);
        expression.push('(');
        expression.push_str(fragment);
        expression.push(')');
        last = whole.end();

        captures.push(WildcardCapture {
            name: caps[2].to_string(),
            kind: kind.to_string(),
            raw: !caps[1].is_empty(),
        });
    }
    expression.push_str(&expanded[last..]);

    (expression, captures)
}

/// Escape braces that do not form a `{n}`, `{n,}` or `{n,m}` repetition.
fn escape_stray_braces(expression: &str) -> String {
    let chars: Vec<char> = expression.chars().collect();
    let mut out = String::with_capacity(expression.len());
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' => {
                out.push('\\');
                if let Some(&next) = chars.get(i + 1) {
                    out.push(next);
                }
                i += 2;
            }
            '{' => match repetition_len(&chars[i..]) {
                Some(len) => {
                    out.extend(&chars[i..i + len]);
                    i += len;
                }
                None => {
                    out.push_str(r"\{");
                    i += 1;
                }
            },
            '}' => {
                out.push_str(r"\}");
                i += 1;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

fn repetition_len(chars: &[char]) -> Option<usize> {
    let mut i = 1;
    let digits_start = i;
    while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
        i += 1;
    }
    if i == digits_start {
        return None;
    }
    if chars.get(i) == Some(&',') {
        i += 1;
        while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
            i += 1;
        }
    }
    (chars.get(i) == Some(&'}')).then_some(i + 1)
}
