//! Localized narration connector phrases for emotive delivery.
//!
//! When a segment carries an `emote` description, the spoken text is
//! extended with a narrated aside ("..., he said, beaming") so the
//! vendor renders the intended tone; the aside is trimmed back out of
//! the final audio by the merge stage.

/// Connector phrase pair for one language.
#[derive(Debug, Clone, Copy)]
pub struct SaidPhrase {
    /// Joins the spoken text to the narration, e.g. ", "
    pub connector: &'static str,
    /// Fallback narration verb when no emote description exists
    pub verb: &'static str,
}

const DEFAULT: SaidPhrase = SaidPhrase {
    connector: ", ",
    verb: "he said",
};

/// Look up the narration phrase for a language code.
///
/// Matches on the primary subtag ("en-US" -> "en") and falls back to
/// English for unknown languages.
pub fn said_phrase(language: &str) -> SaidPhrase {
    let primary = language
        .split(['-', '_'])
        .next()
        .unwrap_or(language)
        .to_ascii_lowercase();

    match primary.as_str() {
        "en" => DEFAULT,
        "de" => SaidPhrase {
            connector: ", ",
            verb: "sagte er",
        },
        "es" => SaidPhrase {
            connector: ", ",
            verb: "dijo",
        },
        "fr" => SaidPhrase {
            connector: ", ",
            verb: "dit-il",
        },
        "it" => SaidPhrase {
            connector: ", ",
            verb: "disse",
        },
        "pt" => SaidPhrase {
            connector: ", ",
            verb: "disse ele",
        },
        "nl" => SaidPhrase {
            connector: ", ",
            verb: "zei hij",
        },
        _ => DEFAULT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_subtag_lookup() {
        assert_eq!(said_phrase("de-DE").verb, "sagte er");
        assert_eq!(said_phrase("en-GB").verb, "he said");
    }

    #[test]
    fn unknown_language_falls_back_to_english() {
        assert_eq!(said_phrase("xx").verb, "he said");
        assert_eq!(said_phrase("").verb, "he said");
    }
}
