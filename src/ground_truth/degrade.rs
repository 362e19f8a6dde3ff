use rand::seq::SliceRandom;
use rand::Rng;

use super::{CorpusRecord, DegradationType};
use crate::resolution::Citation;

/// Titles longer than this are cut by [`truncate_title`]
pub const TITLE_TRUNCATION_LENGTH: usize = 50;

/// Words must be longer than this to receive a typo
const MIN_TYPO_WORD_LENGTH: usize = 3;

/// Rendering used when varying author names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorForm {
    /// "First Middle Last"
    Natural,
    /// "F. M. Last"
    Initials,
}

/// Split a name into (given names, family name).
///
/// "Last, First Middle" splits on the comma; otherwise the last token is
/// the family name.
fn split_name(name: &str) -> (Vec<&str>, &str) {
    if let Some((family, given)) = name.split_once(',') {
        return (given.split_whitespace().collect(), family.trim());
    }
    let mut tokens: Vec<&str> = name.split_whitespace().collect();
    match tokens.pop() {
        Some(family) => (tokens, family),
        None => (Vec::new(), ""),
    }
}

/// Re-render an author name.
///
/// Names without a comma are already in natural order, so they always get
/// the initials form.
pub fn vary_author_name(name: &str, form: AuthorForm) -> String {
    let has_comma = name.contains(',');
    let (given, family) = split_name(name);
    if family.is_empty() {
        return name.trim().to_string();
    }

    let form = if has_comma { form } else { AuthorForm::Initials };
    let given: Vec<String> = match form {
        AuthorForm::Natural => given.iter().map(|g| g.to_string()).collect(),
        AuthorForm::Initials => given
            .iter()
            .filter_map(|g| g.chars().next())
            .map(|c| format!("{}.", c))
            .collect(),
    };

    if given.is_empty() {
        family.to_string()
    } else {
        format!("{} {}", given.join(" "), family)
    }
}

/// Cut long titles to [`TITLE_TRUNCATION_LENGTH`] characters followed by "..."
pub fn truncate_title(title: &str) -> String {
    if title.chars().count() <= TITLE_TRUNCATION_LENGTH {
        return title.to_string();
    }
    let head: String = title.chars().take(TITLE_TRUNCATION_LENGTH).collect();
    format!("{}...", head)
}

fn typo_in_word<R: Rng + ?Sized>(word: &str, rng: &mut R) -> String {
    let mut chars: Vec<char> = word.chars().collect();
    let len = chars.len();
    match rng.gen_range(0..3) {
        0 => {
            let pos = rng.gen_range(0..len - 1);
            chars.swap(pos, pos + 1);
        }
        1 => {
            chars.remove(rng.gen_range(0..len));
        }
        _ => {
            let pos = rng.gen_range(0..len);
            chars.insert(pos, chars[pos]);
        }
    }
    chars.into_iter().collect()
}

/// Corrupt one or two distinct words longer than three characters with an
/// adjacent swap, a deletion or a duplicated character.
///
/// Text without eligible words is returned unchanged. Whitespace runs are
/// collapsed to single spaces.
pub fn introduce_typos<R: Rng + ?Sized>(text: &str, rng: &mut R) -> String {
    let mut words: Vec<String> = text.split_whitespace().map(String::from).collect();
    let eligible: Vec<usize> = words
        .iter()
        .enumerate()
        .filter(|(_, w)| w.chars().count() > MIN_TYPO_WORD_LENGTH)
        .map(|(i, _)| i)
        .collect();
    if eligible.is_empty() {
        return text.to_string();
    }

    let count = rng.gen_range(1..=2).min(eligible.len());
    let chosen: Vec<usize> = eligible.choose_multiple(rng, count).copied().collect();
    for idx in chosen {
        words[idx] = typo_in_word(&words[idx], rng);
    }
    words.join(" ")
}

/// Build the degraded citation a resolver will see for `record`.
///
/// Clean citations carry the DOI in their raw text, as a well-formed
/// reference list entry would.
pub fn apply_degradation<R: Rng + ?Sized>(
    record: &CorpusRecord,
    degradation: DegradationType,
    rng: &mut R,
) -> Citation {
    let mut title = record.title.clone();
    let mut authors = record.authors.clone();
    let mut year = record.year;
    let mut journal = record.journal.clone();

    match degradation {
        DegradationType::Clean => {}
        DegradationType::AuthorVariation => {
            let form = if rng.gen_bool(0.5) {
                AuthorForm::Natural
            } else {
                AuthorForm::Initials
            };
            authors = authors.iter().map(|a| vary_author_name(a, form)).collect();
        }
        DegradationType::TitleTruncation => title = truncate_title(&title),
        DegradationType::MissingYear => year = None,
        DegradationType::MissingAuthors => authors.clear(),
        DegradationType::Typos => title = introduce_typos(&title, rng),
        DegradationType::JournalMissing => journal = None,
    }

    let citation = Citation::from_parts(title, authors, year, journal);
    match (&degradation, record.doi.as_deref().filter(|d| !d.trim().is_empty())) {
        (DegradationType::Clean, Some(doi)) => {
            let raw_text = format!("{} doi:{}", citation.raw_text, doi.trim());
            Citation { raw_text, ..citation }
        }
        _ => citation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn record() -> CorpusRecord {
        CorpusRecord {
            paper_id: "p1".to_string(),
            title: "Attention Is All You Need: Transformers for Sequence Transduction".to_string(),
            authors: vec!["Vaswani, Ashish".to_string(), "Shazeer, Noam M".to_string()],
            year: Some(2017),
            journal: Some("NeurIPS".to_string()),
            doi: Some("10.5555/3295222.3295349".to_string()),
            openalex_id: Some("W2963403868".to_string()),
            s2_id: None,
        }
    }

    #[test]
    fn test_vary_author_name_forms() {
        assert_eq!(vary_author_name("Smith, John Paul", AuthorForm::Natural), "John Paul Smith");
        assert_eq!(vary_author_name("Smith, John Paul", AuthorForm::Initials), "J. P. Smith");
        assert_eq!(vary_author_name("John Smith", AuthorForm::Natural), "J. Smith");
        assert_eq!(vary_author_name("Plato", AuthorForm::Natural), "Plato");
        assert_eq!(vary_author_name("Curie,", AuthorForm::Initials), "Curie");
    }

    #[test]
    fn test_truncate_title() {
        let long = "a".repeat(60);
        let truncated = truncate_title(&long);
        assert_eq!(truncated, format!("{}...", "a".repeat(50)));

        let exact = "b".repeat(50);
        assert_eq!(truncate_title(&exact), exact);
    }

    #[test]
    fn test_truncate_title_multibyte() {
        let title = "é".repeat(55);
        let truncated = truncate_title(&title);
        assert_eq!(truncated.chars().count(), 53);
    }

    #[test]
    fn test_typos_change_one_or_two_words() {
        let text = "deep residual learning for image recognition";
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let typoed = introduce_typos(text, &mut rng);
            let changed = text
                .split_whitespace()
                .zip(typoed.split_whitespace())
                .filter(|(a, b)| a != b)
                .count();
            assert_eq!(typoed.split_whitespace().count(), 6);
            assert!(changed <= 2, "seed {} changed {} words", seed, changed);
            // short words are never touched
            assert!(typoed.contains(" for "));
        }
    }

    #[test]
    fn test_typos_leave_short_text_alone() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(introduce_typos("a b cat", &mut rng), "a b cat");
    }

    #[test]
    fn test_degradation_deterministic_for_seed() {
        let rec = record();
        for degradation in [DegradationType::Typos, DegradationType::AuthorVariation] {
            let a = apply_degradation(&rec, degradation, &mut StdRng::seed_from_u64(42));
            let b = apply_degradation(&rec, degradation, &mut StdRng::seed_from_u64(42));
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_field_clearing_degradations() {
        let rec = record();
        let mut rng = StdRng::seed_from_u64(0);

        let c = apply_degradation(&rec, DegradationType::MissingYear, &mut rng);
        assert_eq!(c.year, None);
        assert!(!c.raw_text.contains("2017"));

        let c = apply_degradation(&rec, DegradationType::MissingAuthors, &mut rng);
        assert!(c.authors.is_empty());

        let c = apply_degradation(&rec, DegradationType::JournalMissing, &mut rng);
        assert_eq!(c.journal, None);
        assert!(!c.raw_text.contains("NeurIPS"));

        let c = apply_degradation(&rec, DegradationType::TitleTruncation, &mut rng);
        assert!(c.title.ends_with("..."));
    }

    #[test]
    fn test_clean_citation_carries_doi() {
        let rec = record();
        let mut rng = StdRng::seed_from_u64(0);

        let clean = apply_degradation(&rec, DegradationType::Clean, &mut rng);
        assert_eq!(clean.title, rec.title);
        assert!(clean.raw_text.ends_with("doi:10.5555/3295222.3295349"));

        let degraded = apply_degradation(&rec, DegradationType::MissingYear, &mut rng);
        assert!(!degraded.raw_text.contains("doi:"));
    }
}
