//! Balanced-parenthesis call parsing over guarded code.
//!
//! Literals and comments are placeholders by the time code reaches here, so
//! every `(` and `)` seen is structural. Only ASCII bytes are inspected, which
//! keeps all slice indices on char boundaries.

/// Calls nested deeper than this are copied through untouched.
pub const MAX_NESTING: usize = 64;

/// A call expression found by [`rewrite_calls`].
#[derive(Debug)]
pub struct CallSite<'a> {
    /// Function name as written.
    pub name: &'a str,
    /// Arguments, trimmed, with nested calls already rewritten.
    pub args: Vec<String>,
    /// Word right before the name, if any.
    pub prev_word: Option<&'a str>,
    /// Name is preceded by `.` or `:` (method or path syntax).
    pub qualified: bool,
}

pub fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Index of the `)` that closes the `(` at `open`.
pub fn matching_paren(code: &str, open: usize) -> Option<usize> {
    let bytes = code.as_bytes();
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Index of the `(` that opens the `)` at `close`.
pub fn matching_open(code: &str, close: usize) -> Option<usize> {
    let bytes = code.as_bytes();
    let mut depth = 0usize;
    for i in (0..=close).rev() {
        match bytes[i] {
            b')' => depth += 1,
            b'(' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split an argument list on top-level commas.
pub fn split_args(inner: &str) -> Vec<&str> {
    if inner.trim().is_empty() {
        return Vec::new();
    }
    let mut args = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, b) in inner.bytes().enumerate() {
        match b {
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth -= 1,
            b',' if depth == 0 => {
                args.push(inner[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    args.push(inner[start..].trim());
    args
}

/// Paren depth at byte `pos`.
pub fn depth_at(code: &str, pos: usize) -> i32 {
    code.as_bytes()[..pos].iter().fold(0, |d, &b| match b {
        b'(' => d + 1,
        b')' => d - 1,
        _ => d,
    })
}

/// Name of the innermost call whose argument list contains `pos`.
pub fn enclosing_call(code: &str, pos: usize) -> Option<&str> {
    let bytes = code.as_bytes();
    let mut depth = 0i32;
    for i in (0..pos).rev() {
        match bytes[i] {
            b')' => depth += 1,
            b'(' if depth == 0 => {
                let before = code[..i].trim_end();
                let start = before
                    .bytes()
                    .rposition(|b| !is_word_byte(b))
                    .map_or(0, |p| p + 1);
                let name = &before[start..];
                return (!name.is_empty()).then_some(name);
            }
            b'(' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Word immediately before byte `pos`, skipping whitespace.
pub fn word_before(code: &str, pos: usize) -> Option<&str> {
    let before = code[..pos].trim_end();
    let start = before
        .bytes()
        .rposition(|b| !is_word_byte(b))
        .map_or(0, |p| p + 1);
    let word = &before[start..];
    (!word.is_empty()).then_some(word)
}

/// Rewrite every call expression in `code`, innermost first.
///
/// `visit` receives each call after its arguments have been rewritten and
/// returns the replacement text, or `None` to keep the call as written.
pub fn rewrite_calls<F>(code: &str, visit: &mut F) -> String
where
    F: FnMut(&CallSite<'_>) -> Option<String>,
{
    rewrite_at_depth(code, 0, visit)
}

fn rewrite_at_depth<F>(code: &str, depth: usize, visit: &mut F) -> String
where
    F: FnMut(&CallSite<'_>) -> Option<String>,
{
    if depth > MAX_NESTING {
        return code.to_string();
    }

    let bytes = code.as_bytes();
    let mut out = String::with_capacity(code.len());
    let mut last = 0;
    let mut i = 0;

    while i < bytes.len() {
        let starts_word = (bytes[i].is_ascii_alphabetic() || bytes[i] == b'_')
            && (i == 0 || !is_word_byte(bytes[i - 1]));
        if !starts_word {
            i += 1;
            continue;
        }

        let name_start = i;
        while i < bytes.len() && is_word_byte(bytes[i]) {
            i += 1;
        }
        let name_end = i;
        let mut open = i;
        while open < bytes.len() && bytes[open].is_ascii_whitespace() {
            open += 1;
        }
        if open >= bytes.len() || bytes[open] != b'(' {
            continue;
        }
        let Some(close) = matching_paren(code, open) else {
            break;
        };

        let inner = rewrite_at_depth(&code[open + 1..close], depth + 1, visit);
        let site = CallSite {
            name: &code[name_start..name_end],
            args: split_args(&inner).into_iter().map(str::to_string).collect(),
            prev_word: word_before(code, name_start),
            qualified: name_start > 0 && matches!(bytes[name_start - 1], b'.' | b':'),
        };

        out.push_str(&code[last..name_start]);
        match visit(&site) {
            Some(replacement) => out.push_str(&replacement),
            None => {
                out.push_str(&code[name_start..=open]);
                out.push_str(&inner);
                out.push(')');
            }
        }
        last = close + 1;
        i = close + 1;
    }

    out.push_str(&code[last..]);
    out
}

/// Render `NAME(arg, arg, ...)`.
pub fn render_call(name: &str, args: &[impl AsRef<str>]) -> String {
    let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
    format!("{}({})", name, args.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_paren() {
        let code = "f(a, g(b), (c))";
        assert_eq!(matching_paren(code, 1), Some(14));
        assert_eq!(matching_paren(code, 6), Some(8));
        assert_eq!(matching_paren("f(a", 1), None);
        assert_eq!(matching_open(code, 14), Some(1));
    }

    #[test]
    fn test_split_args_nested() {
        assert_eq!(split_args("a, f(b, c), d[1,2]"), vec!["a", "f(b, c)", "d[1,2]"]);
        assert!(split_args("  ").is_empty());
    }

    #[test]
    fn test_enclosing_call() {
        let code = "SELECT EXTRACT(YEAR FROM d) FROM t";
        let inner_from = code.find("FROM d").unwrap();
        assert_eq!(enclosing_call(code, inner_from), Some("EXTRACT"));
        assert_eq!(enclosing_call(code, code.rfind("FROM").unwrap()), None);
    }

    #[test]
    fn test_rewrite_innermost_first() {
        let mut seen = Vec::new();
        let out = rewrite_calls("SELECT outer_fn(inner_fn(x), 1) FROM t", &mut |site| {
            seen.push(site.name.to_string());
            match site.name {
                "inner_fn" => Some(render_call("INNER", &site.args)),
                "outer_fn" => Some(render_call("OUTER", &site.args)),
                _ => None,
            }
        });
        assert_eq!(seen, vec!["inner_fn", "outer_fn"]);
        assert_eq!(out, "SELECT OUTER(INNER(x), 1) FROM t");
    }

    #[test]
    fn test_rewrite_keeps_unvisited_spacing() {
        let out = rewrite_calls("count (*) + a.b(1)", &mut |site| {
            assert!(site.name != "b" || site.qualified);
            None
        });
        assert_eq!(out, "count (*) + a.b(1)");
    }

    #[test]
    fn test_unbalanced_call_is_left_alone() {
        let out = rewrite_calls("f(g(x)", &mut |_| Some("X".to_string()));
        assert_eq!(out, "f(g(x)");
    }
}
