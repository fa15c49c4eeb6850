//! Text repair for pasted keys
//!
//! Text fields substitute "smart" punctuation and paste can carry invisible
//! characters. Both break the fixed `-----BEGIN ...-----` markers and the
//! base64 body.

/// Replace dash look-alikes, drop invisible characters, map non-breaking
/// spaces to spaces and unify line endings.
pub fn repair(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            c if is_dash_like(c) => out.push('-'),
            c if is_invisible(c) => {}
            '\u{00A0}' | '\u{202F}' => out.push(' '),
            '\r' => {
                if chars.peek() != Some(&'\n') {
                    out.push('\n');
                }
            }
            c => out.push(c),
        }
    }

    out
}

fn is_dash_like(c: char) -> bool {
    matches!(
        c,
        '\u{2010}' // hyphen
            | '\u{2011}' // non-breaking hyphen
            | '\u{2012}' // figure dash
            | '\u{2013}' // en dash
            | '\u{2014}' // em dash
            | '\u{2015}' // horizontal bar
            | '\u{2043}' // hyphen bullet
            | '\u{2212}' // minus sign
            | '\u{FE31}' // vertical em dash
            | '\u{FE32}' // vertical en dash
            | '\u{FE58}' // small em dash
            | '\u{FE63}' // small hyphen-minus
            | '\u{FF0D}' // fullwidth hyphen-minus
    )
}

fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{200B}' // zero width space
            | '\u{200C}' // zero width non-joiner
            | '\u{200D}' // zero width joiner
            | '\u{2060}' // word joiner
            | '\u{FEFF}' // byte order mark
            | '\u{00AD}' // soft hyphen
    )
}
