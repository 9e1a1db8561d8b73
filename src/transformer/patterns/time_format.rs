//! Java `SimpleDateFormat` patterns to warehouse format strings.

/// Convert a Java date pattern (`yyyy-MM-dd HH:mm:ss`) to the target
/// dialect's format (`YYYY-MM-DD HH24:MI:SS`).
///
/// Quoted text (`'T'`) becomes double-quoted text; letters without a
/// counterpart are copied as-is.
pub fn java_to_warehouse(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() + 4);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            let end = chars[i + 1..]
                .iter()
                .position(|&q| q == '\'')
                .map_or(chars.len(), |p| i + 1 + p);
            let text: String = chars[i + 1..end].iter().collect();
            if !text.is_empty() {
                out.push('"');
                out.push_str(&text);
                out.push('"');
            }
            i = end + 1;
            continue;
        }

        if !c.is_ascii_alphabetic() {
            out.push(c);
            i += 1;
            continue;
        }

        let run = chars[i..].iter().take_while(|&&x| x == c).count();
        out.push_str(&letter_run(c, run));
        i += run;
    }

    out
}

fn letter_run(letter: char, len: usize) -> String {
    let mapped = match (letter, len) {
        ('y', 2) => "YY",
        ('y', _) => "YYYY",
        ('M', 1 | 2) => "MM",
        ('M', 3) => "MON",
        ('M', _) => "MMMM",
        ('d', _) => "DD",
        ('H', _) => "HH24",
        ('h', _) => "HH12",
        ('m', _) => "MI",
        ('s', _) => "SS",
        ('S', n) => return format!("FF{}", n.min(9)),
        ('a', _) => "AM",
        ('E', _) => "DY",
        ('Z' | 'X', _) => "TZHTZM",
        (other, n) => return other.to_string().repeat(n),
    };
    mapped.to_string()
}
