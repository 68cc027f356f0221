//! Player-facing messages and chat colour handling.

/// Colour escape the host renders
pub const COLOR_CHAR: char = '\u{a7}';

/// Escape players type in names and config messages
pub const ALT_COLOR_CHAR: char = '&';

/// Codes that follow an escape: colours 0-9a-f, then formatting k-o and reset r
const COLOR_CODES: &str = "0123456789abcdefklmnor";

/// Turn `&c`-style codes into host colour escapes. Unknown codes are left alone.
pub fn translate_color_codes(alt: char, text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == alt {
            if let Some(&next) = chars.peek() {
                let code = next.to_ascii_lowercase();
                if COLOR_CODES.contains(code) {
                    out.push(COLOR_CHAR);
                    out.push(code);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// Remove every host colour escape and the code after it
pub fn strip_color(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == COLOR_CHAR {
            chars.next();
            continue;
        }
        out.push(c);
    }
    out
}

/// Remove `&k`..`&o` and `&r` formatting codes, keeping colour codes.
///
/// Repeats until nothing changes, since removing `&l` from `&&ll` leaves `&l`.
pub fn strip_formatting_codes(text: &str) -> String {
    let mut current = strip_formatting_once(text);
    loop {
        let next = strip_formatting_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_formatting_once(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ALT_COLOR_CHAR {
            if let Some(&next) = chars.peek() {
                if "klmnor".contains(next.to_ascii_lowercase()) {
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// Canned messages sent to players
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    CantHurtOthersHorses,
    NotYourHorse,
    SummonFailed,
    HorseOnCooldown,
    NoActiveHorse,
}

impl Message {
    fn template(&self) -> &'static str {
        match self {
            Self::CantHurtOthersHorses => "&cYou can't hurt other players' horses",
            Self::NotYourHorse => "&cThat horse does not belong to you",
            Self::SummonFailed => "&cYour horse could not be summoned here",
            Self::HorseOnCooldown => "&cYour horse is still recovering, try again later",
            Self::NoActiveHorse => "&eYou have no horse out",
        }
    }

    /// Message text with colour escapes applied
    pub fn text(&self) -> String {
        translate_color_codes(ALT_COLOR_CHAR, self.template())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_and_strip() {
        let colored = translate_color_codes('&', "&cRed &Lbold & plain");
        assert_eq!(colored, "\u{a7}cRed \u{a7}lbold & plain");
        assert_eq!(strip_color(&colored), "Red bold & plain");
    }

    #[test]
    fn test_strip_formatting_keeps_colors() {
        assert_eq!(strip_formatting_codes("&lMy &KHorse &aGreen"), "My Horse &aGreen");
    }

    #[test]
    fn test_strip_formatting_leaves_no_code_behind() {
        assert_eq!(strip_formatting_codes("&&ll"), "");
        assert_eq!(strip_formatting_codes("&&&lll&aHi"), "&aHi");
        assert_eq!(translate_color_codes('&', &strip_formatting_codes("&&lLong")), "ong");
    }

    #[test]
    fn test_message_text_is_colored() {
        assert!(Message::CantHurtOthersHorses.text().starts_with(COLOR_CHAR));
        assert!(strip_color(&Message::CantHurtOthersHorses.text()).contains("other players"));
    }
}
