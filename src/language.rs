use std::fmt;

/// An ordered (source, target) pair of caller-supplied language codes.
///
/// Codes are ISO 639-1 by convention. Engines derive the alphabet they need
/// through [`LanguagePair::alpha2`] / [`LanguagePair::alpha3`]; the pair
/// itself is never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LanguagePair {
    source: String,
    target: String,
}

impl LanguagePair {
    pub fn new<S: Into<String>, T: Into<String>>(source: S, target: T) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Two-letter codes, as the argos engine expects them
    pub fn alpha2(&self) -> (String, String) {
        (to_alpha2(&self.source), to_alpha2(&self.target))
    }

    /// Three-letter codes, as the apertium engine expects them
    pub fn alpha3(&self) -> (String, String) {
        (to_alpha3(&self.source), to_alpha3(&self.target))
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

// ISO 639-1 -> ISO 639-3, all 183 two-letter codes. Macrolanguages map to
// their macrolanguage code (`fas`, `msa`, `zho`).
const ALPHA2_TO_ALPHA3: &[(&str, &str)] = &[
    ("aa", "aar"),
    ("ab", "abk"),
    ("ae", "ave"),
    ("af", "afr"),
    ("ak", "aka"),
    ("am", "amh"),
    ("an", "arg"),
    ("ar", "ara"),
    ("as", "asm"),
    ("av", "ava"),
    ("ay", "aym"),
    ("az", "aze"),
    ("ba", "bak"),
    ("be", "bel"),
    ("bg", "bul"),
    ("bi", "bis"),
    ("bm", "bam"),
    ("bn", "ben"),
    ("bo", "bod"),
    ("br", "bre"),
    ("bs", "bos"),
    ("ca", "cat"),
    ("ce", "che"),
    ("ch", "cha"),
    ("co", "cos"),
    ("cr", "cre"),
    ("cs", "ces"),
    ("cu", "chu"),
    ("cv", "chv"),
    ("cy", "cym"),
    ("da", "dan"),
    ("de", "deu"),
    ("dv", "div"),
    ("dz", "dzo"),
    ("ee", "ewe"),
    ("el", "ell"),
    ("en", "eng"),
    ("eo", "epo"),
    ("es", "spa"),
    ("et", "est"),
    ("eu", "eus"),
    ("fa", "fas"),
    ("ff", "ful"),
    ("fi", "fin"),
    ("fj", "fij"),
    ("fo", "fao"),
    ("fr", "fra"),
    ("fy", "fry"),
    ("ga", "gle"),
    ("gd", "gla"),
    ("gl", "glg"),
    ("gn", "grn"),
    ("gu", "guj"),
    ("gv", "glv"),
    ("ha", "hau"),
    ("he", "heb"),
    ("hi", "hin"),
    ("ho", "hmo"),
    ("hr", "hrv"),
    ("ht", "hat"),
    ("hu", "hun"),
    ("hy", "hye"),
    ("hz", "her"),
    ("ia", "ina"),
    ("id", "ind"),
    ("ie", "ile"),
    ("ig", "ibo"),
    ("ii", "iii"),
    ("ik", "ipk"),
    ("io", "ido"),
    ("is", "isl"),
    ("it", "ita"),
    ("iu", "iku"),
    ("ja", "jpn"),
    ("jv", "jav"),
    ("ka", "kat"),
    ("kg", "kon"),
    ("ki", "kik"),
    ("kj", "kua"),
    ("kk", "kaz"),
    ("kl", "kal"),
    ("km", "khm"),
    ("kn", "kan"),
    ("ko", "kor"),
    ("kr", "kau"),
    ("ks", "kas"),
    ("ku", "kur"),
    ("kv", "kom"),
    ("kw", "cor"),
    ("ky", "kir"),
    ("la", "lat"),
    ("lb", "ltz"),
    ("lg", "lug"),
    ("li", "lim"),
    ("ln", "lin"),
    ("lo", "lao"),
    ("lt", "lit"),
    ("lu", "lub"),
    ("lv", "lav"),
    ("mg", "mlg"),
    ("mh", "mah"),
    ("mi", "mri"),
    ("mk", "mkd"),
    ("ml", "mal"),
    ("mn", "mon"),
    ("mr", "mar"),
    ("ms", "msa"),
    ("mt", "mlt"),
    ("my", "mya"),
    ("na", "nau"),
    ("nb", "nob"),
    ("nd", "nde"),
    ("ne", "nep"),
    ("ng", "ndo"),
    ("nl", "nld"),
    ("nn", "nno"),
    ("no", "nor"),
    ("nr", "nbl"),
    ("nv", "nav"),
    ("ny", "nya"),
    ("oc", "oci"),
    ("oj", "oji"),
    ("om", "orm"),
    ("or", "ori"),
    ("os", "oss"),
    ("pa", "pan"),
    ("pi", "pli"),
    ("pl", "pol"),
    ("ps", "pus"),
    ("pt", "por"),
    ("qu", "que"),
    ("rm", "roh"),
    ("rn", "run"),
    ("ro", "ron"),
    ("ru", "rus"),
    ("rw", "kin"),
    ("sa", "san"),
    ("sc", "srd"),
    ("sd", "snd"),
    ("se", "sme"),
    ("sg", "sag"),
    ("si", "sin"),
    ("sk", "slk"),
    ("sl", "slv"),
    ("sm", "smo"),
    ("sn", "sna"),
    ("so", "som"),
    ("sq", "sqi"),
    ("sr", "srp"),
    ("ss", "ssw"),
    ("st", "sot"),
    ("su", "sun"),
    ("sv", "swe"),
    ("sw", "swa"),
    ("ta", "tam"),
    ("te", "tel"),
    ("tg", "tgk"),
    ("th", "tha"),
    ("ti", "tir"),
    ("tk", "tuk"),
    ("tl", "tgl"),
    ("tn", "tsn"),
    ("to", "ton"),
    ("tr", "tur"),
    ("ts", "tso"),
    ("tt", "tat"),
    ("tw", "twi"),
    ("ty", "tah"),
    ("ug", "uig"),
    ("uk", "ukr"),
    ("ur", "urd"),
    ("uz", "uzb"),
    ("ve", "ven"),
    ("vi", "vie"),
    ("vo", "vol"),
    ("wa", "wln"),
    ("wo", "wol"),
    ("xh", "xho"),
    ("yi", "yid"),
    ("yo", "yor"),
    ("za", "zha"),
    ("zh", "zho"),
    ("zu", "zul"),
];

/// Convert a language code to ISO 639-3. Codes that are already three
/// letters, or that are unknown, pass through lowercased.
pub fn to_alpha3(code: &str) -> String {
    let code = code.trim().to_lowercase();
    ALPHA2_TO_ALPHA3
        .iter()
        .find(|(alpha2, _)| *alpha2 == code)
        .map(|(_, alpha3)| alpha3.to_string())
        .unwrap_or(code)
}

/// Convert a language code to ISO 639-1. Unknown codes pass through
/// lowercased.
pub fn to_alpha2(code: &str) -> String {
    let code = code.trim().to_lowercase();
    ALPHA2_TO_ALPHA3
        .iter()
        .find(|(_, alpha3)| *alpha3 == code)
        .map(|(alpha2, _)| alpha2.to_string())
        .unwrap_or(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alpha3_conversion() {
        assert_eq!(to_alpha3("de"), "deu");
        assert_eq!(to_alpha3("EN"), "eng");
        assert_eq!(to_alpha3("spa"), "spa");
        assert_eq!(to_alpha3("xx"), "xx");
    }

    #[test]
    fn test_every_two_letter_code_is_known() {
        assert_eq!(ALPHA2_TO_ALPHA3.len(), 183);
        assert_eq!(to_alpha3("fo"), "fao");
        assert_eq!(to_alpha3("kw"), "cor");
        assert_eq!(to_alpha3("zu"), "zul");
        assert_eq!(to_alpha2("fao"), "fo");
        for (alpha2, alpha3) in ALPHA2_TO_ALPHA3 {
            assert_eq!(alpha2.len(), 2);
            assert_eq!(alpha3.len(), 3);
        }
    }

    #[test]
    fn test_alpha2_conversion() {
        assert_eq!(to_alpha2("deu"), "de");
        assert_eq!(to_alpha2("en"), "en");
        assert_eq!(to_alpha2("qqq"), "qqq");
    }

    #[test]
    fn test_pair_keeps_caller_codes() {
        let pair = LanguagePair::new("deu", "en");
        assert_eq!(pair.alpha2(), ("de".to_string(), "en".to_string()));
        assert_eq!(pair.alpha3(), ("deu".to_string(), "eng".to_string()));
        assert_eq!(pair.source(), "deu");
        assert_eq!(pair.to_string(), "deu -> en");
    }
}
