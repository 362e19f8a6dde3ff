use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// DOI in bare, `doi:` or URL form; group 1 is the DOI itself
    pub static ref DOI_PATTERN: Regex = Regex::new(
        r#"(?i)(?:doi[:\s]*|(?:https?://)?(?:dx\.)?doi\.org/)?(10\.\d{4,}/[^\s\]\)>,;"']+)"#
    ).unwrap();
}

const DOI_PREFIXES: &[&str] = &[
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
    "doi:",
];

/// Canonical comparison form of a DOI.
///
/// Lowercases, strips resolver URL and `doi:` prefixes, decodes the
/// common URL escapes and drops trailing punctuation picked up from prose.
pub fn normalize_doi(doi: &str) -> String {
    let mut result = doi.trim().to_lowercase();

    for prefix in DOI_PREFIXES {
        if let Some(rest) = result.strip_prefix(prefix) {
            result = rest.trim_start().to_string();
            break;
        }
    }

    result = result
        .replace("%2f", "/")
        .replace("%3a", ":")
        .replace("%28", "(")
        .replace("%29", ")");

    let trailing_chars: &[char] = &['.', ',', ';', ':', ')', ']', '>', '"', '\'', ' '];
    while result.ends_with(trailing_chars) {
        result.pop();
    }

    result
}

/// First DOI mentioned in free text, normalized
pub fn extract_doi(text: &str) -> Option<String> {
    DOI_PATTERN
        .captures(text)
        .and_then(|cap| cap.get(1))
        .map(|m| normalize_doi(m.as_str()))
        .filter(|doi| !doi.is_empty())
}

/// Compare two DOIs after normalization
pub fn dois_match(a: &str, b: &str) -> bool {
    let a = normalize_doi(a);
    !a.is_empty() && a == normalize_doi(b)
}
