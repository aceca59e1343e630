//! Review language classification.
//!
//! Wraps whatlang behind a single function that can never fail: empty text,
//! detection failure, and languages without a two-letter code all collapse to
//! "unknown" so classification problems never propagate into the pipeline.

use whatlang::Lang;

pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// Detect the language of review text, returning an ISO 639-1 code or
/// "unknown".
pub fn detect_language(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return UNKNOWN_LANGUAGE.to_string();
    }

    match whatlang::detect(trimmed) {
        Some(info) => iso639_1(info.lang())
            .unwrap_or(UNKNOWN_LANGUAGE)
            .to_string(),
        None => UNKNOWN_LANGUAGE.to_string(),
    }
}

/// Map a detected language to its ISO 639-1 code. whatlang reports ISO 639-3;
/// languages without a two-letter equivalent map to None.
fn iso639_1(lang: Lang) -> Option<&'static str> {
    match lang {
        Lang::Eng => Some("en"),
        Lang::Fra => Some("fr"),
        Lang::Ara => Some("ar"),
        Lang::Spa => Some("es"),
        Lang::Deu => Some("de"),
        Lang::Por => Some("pt"),
        Lang::Ita => Some("it"),
        Lang::Nld => Some("nl"),
        Lang::Rus => Some("ru"),
        Lang::Cmn => Some("zh"),
        Lang::Jpn => Some("ja"),
        Lang::Kor => Some("ko"),
        Lang::Tur => Some("tr"),
        Lang::Pol => Some("pl"),
        Lang::Ukr => Some("uk"),
        Lang::Ron => Some("ro"),
        Lang::Swe => Some("sv"),
        Lang::Dan => Some("da"),
        Lang::Fin => Some("fi"),
        Lang::Nob => Some("no"),
        Lang::Ces => Some("cs"),
        Lang::Slk => Some("sk"),
        Lang::Slv => Some("sl"),
        Lang::Hun => Some("hu"),
        Lang::Ell => Some("el"),
        Lang::Bul => Some("bg"),
        Lang::Bel => Some("be"),
        Lang::Heb => Some("he"),
        Lang::Hin => Some("hi"),
        Lang::Ben => Some("bn"),
        Lang::Urd => Some("ur"),
        Lang::Vie => Some("vi"),
        Lang::Tha => Some("th"),
        Lang::Ind => Some("id"),
        Lang::Cat => Some("ca"),
        Lang::Hrv => Some("hr"),
        Lang::Srp => Some("sr"),
        Lang::Mkd => Some("mk"),
        Lang::Lit => Some("lt"),
        Lang::Lav => Some("lv"),
        Lang::Est => Some("et"),
        Lang::Aze => Some("az"),
        Lang::Kat => Some("ka"),
        Lang::Hye => Some("hy"),
        Lang::Pes => Some("fa"),
        Lang::Tam => Some("ta"),
        Lang::Tel => Some("te"),
        Lang::Mar => Some("mr"),
        Lang::Mal => Some("ml"),
        Lang::Kan => Some("kn"),
        Lang::Guj => Some("gu"),
        Lang::Pan => Some("pa"),
        Lang::Afr => Some("af"),
        Lang::Lat => Some("la"),
        Lang::Epo => Some("eo"),
        Lang::Tgl => Some("tl"),
        Lang::Uzb => Some("uz"),
        Lang::Amh => Some("am"),
        Lang::Mya => Some("my"),
        Lang::Nep => Some("ne"),
        Lang::Sin => Some("si"),
        Lang::Khm => Some("km"),
        Lang::Jav => Some("jv"),
        Lang::Zul => Some("zu"),
        Lang::Sna => Some("sn"),
        Lang::Yid => Some("yi"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_english() {
        let text = "The staff at this branch were extremely helpful and the waiting time was short.";
        assert_eq!(detect_language(text), "en");
    }

    #[test]
    fn test_detects_french() {
        let text = "Le personnel de cette agence est très accueillant et le service est rapide.";
        assert_eq!(detect_language(text), "fr");
    }

    #[test]
    fn test_empty_text_is_unknown() {
        assert_eq!(detect_language(""), UNKNOWN_LANGUAGE);
        assert_eq!(detect_language("   "), UNKNOWN_LANGUAGE);
    }
}
