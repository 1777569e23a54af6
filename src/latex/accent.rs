//! Composition table for LaTeX accent commands.
//!
//! Maps an accent command character (the char after the backslash) and a
//! base letter to the precomposed Unicode character. Combinations outside
//! the table yield `None`; the scanner then emits an empty replacement.

/// Compose `letter` with the accent named by `accent`. The dotless `\i` is
/// passed in as `i` and shares the lowercase-i row.
pub fn compose(accent: char, letter: char) -> Option<char> {
    let composed = match accent {
        '`' => match letter {
            'A' => '\u{00C0}',
            'E' => '\u{00C8}',
            'I' => '\u{00CC}',
            'O' => '\u{00D2}',
            'U' => '\u{00D9}',
            'a' => '\u{00E0}',
            'e' => '\u{00E8}',
            'i' => '\u{00EC}',
            'o' => '\u{00F2}',
            'u' => '\u{00F9}',
            _ => return None,
        },
        '\'' => match letter {
            'A' => '\u{00C1}',
            'E' => '\u{00C9}',
            'I' => '\u{00CD}',
            'O' => '\u{00D3}',
            'U' => '\u{00DA}',
            'Y' => '\u{00DD}',
            'a' => '\u{00E1}',
            'e' => '\u{00E9}',
            'i' => '\u{00ED}',
            'o' => '\u{00F3}',
            'u' => '\u{00FA}',
            'y' => '\u{00FD}',
            _ => return None,
        },
        '^' => match letter {
            'A' => '\u{00C2}',
            'E' => '\u{00CA}',
            'I' => '\u{00CE}',
            'O' => '\u{00D4}',
            'U' => '\u{00DB}',
            'Y' => '\u{0176}',
            'a' => '\u{00E2}',
            'e' => '\u{00EA}',
            'i' => '\u{00EE}',
            'o' => '\u{00F4}',
            'u' => '\u{00FB}',
            'y' => '\u{0177}',
            _ => return None,
        },
        '~' => match letter {
            'A' => '\u{00C3}',
            'E' => '\u{1EBC}',
            'I' => '\u{0128}',
            'N' => '\u{00D1}',
            'O' => '\u{00D5}',
            'U' => '\u{0168}',
            'a' => '\u{00E3}',
            'e' => '\u{1EBD}',
            'i' => '\u{0129}',
            'n' => '\u{00F1}',
            'o' => '\u{00F5}',
            'u' => '\u{0169}',
            _ => return None,
        },
        '"' => match letter {
            'A' => '\u{00C4}',
            'E' => '\u{00CB}',
            'I' => '\u{00CF}',
            'O' => '\u{00D6}',
            'U' => '\u{00DC}',
            'Y' => '\u{0178}',
            'a' => '\u{00E4}',
            'e' => '\u{00EB}',
            'i' => '\u{00EF}',
            'o' => '\u{00F6}',
            'u' => '\u{00FC}',
            'y' => '\u{00FF}',
            _ => return None,
        },
        '=' => match letter {
            'A' => '\u{0100}',
            'E' => '\u{0112}',
            'I' => '\u{012A}',
            'O' => '\u{014C}',
            'U' => '\u{016A}',
            'Y' => '\u{0232}',
            'a' => '\u{0101}',
            'e' => '\u{0113}',
            'i' => '\u{012B}',
            'o' => '\u{014D}',
            'u' => '\u{016B}',
            'y' => '\u{0233}',
            _ => return None,
        },
        '.' => match letter {
            'A' => '\u{0226}',
            'E' => '\u{0116}',
            'I' => '\u{0130}',
            'O' => '\u{022E}',
            'a' => '\u{0227}',
            'e' => '\u{0117}',
            // a dot over a dotless i is the plain letter again
            'i' => 'i',
            'o' => '\u{022F}',
            _ => return None,
        },
        'c' => match letter {
            'C' => '\u{00C7}',
            'c' => '\u{00E7}',
            _ => return None,
        },
        'r' => match letter {
            'A' => '\u{00C5}',
            'U' => '\u{016E}',
            'a' => '\u{00E5}',
            'u' => '\u{016F}',
            _ => return None,
        },
        _ => return None,
    };
    Some(composed)
}
