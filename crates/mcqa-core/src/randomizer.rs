//! Option shuffling and relabelling.
//!
//! Every question is shown to the model with its options in a fresh random
//! order under fresh random label letters, so a model cannot lean on
//! positional priors ("it's usually A"). The resulting [`AnswerKey`] tracks
//! where the ground-truth answer ended up.

use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use regex::Regex;

use crate::error::McqaError;

/// Number of available label letters (A-Z).
pub const MAX_OPTIONS: usize = 26;

/// Separator between rendered options in a prompt.
const OPTION_SEPARATOR: &str = "\n ";

/// Split a leading `"B. "` label off an option.
///
/// Returns the label letter (if any) and the remaining text, trimmed.
pub fn split_label(option: &str) -> (Option<char>, &str) {
    let trimmed = option.trim();
    let mut chars = trimmed.char_indices();
    if let (Some((_, letter)), Some((_, '.'))) = (chars.next(), chars.next()) {
        if letter.is_ascii_uppercase() {
            let rest = &trimmed[2..];
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                return (Some(letter), rest.trim_start());
            }
        }
    }
    (None, trimmed)
}

/// Normalize an option: collapse whitespace (including newlines) and drop any
/// existing label prefix, so relabelling an already-labelled option is
/// idempotent.
pub fn clean_option(option: &str) -> String {
    let collapsed = option.split_whitespace().collect::<Vec<_>>().join(" ");
    split_label(&collapsed).1.to_string()
}

fn label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:^|\s)([A-Z])\.(?:\s|$)").expect("valid label regex"))
}

/// Split a single string of labelled options (`"A. foo B. bar C. baz"`) into
/// one entry per option, keeping the labels.
///
/// Text without any labels falls back to one option per non-empty line.
pub fn split_labelled_options(text: &str) -> Vec<String> {
    let starts: Vec<usize> = label_re()
        .captures_iter(text)
        .filter_map(|c| c.get(1).map(|m| m.start()))
        .collect();

    if starts.is_empty() {
        return text
            .lines()
            .map(|l| l.trim().trim_end_matches([',', ';']).trim())
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
    }

    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(text.len());
            text[start..end].trim().trim_end_matches([',', ';']).trim().to_string()
        })
        .filter(|o| !o.is_empty())
        .collect()
}

/// Mapping from each original (cleaned) option to its relabelled form, e.g.
/// `"penicillin"` → `"C. penicillin"`. Kept in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerKey {
    entries: Vec<(String, String)>,
}

impl AnswerKey {
    fn from_pairs(originals: Vec<String>, labels: &[char]) -> Self {
        let entries = originals
            .into_iter()
            .zip(labels)
            .map(|(original, letter)| {
                let relabelled = format!("{letter}. {original}");
                (original, relabelled)
            })
            .collect();
        Self { entries }
    }

    /// Relabelled form of an original option, if present.
    pub fn get(&self, original: &str) -> Option<&str> {
        let cleaned = clean_option(original);
        self.entries
            .iter()
            .find(|(o, _)| *o == cleaned)
            .map(|(_, r)| r.as_str())
    }

    /// Relabelled form of the ground-truth answer.
    pub fn relabel(&self, answer: &str) -> Result<&str, McqaError> {
        self.get(answer).ok_or_else(|| McqaError::AnswerNotInOptions {
            answer: answer.trim().to_string(),
        })
    }

    /// `(original, relabelled)` pairs in display order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(o, r)| (o.as_str(), r.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The options text embedded in prompts.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(_, r)| r.as_str())
            .collect::<Vec<_>>()
            .join(OPTION_SEPARATOR)
    }
}

fn prepare(options: &[String]) -> Result<Vec<String>, McqaError> {
    if options.is_empty() {
        return Err(McqaError::EmptyOptions);
    }
    if options.len() > MAX_OPTIONS {
        return Err(McqaError::TooManyOptions(options.len()));
    }

    let mut seen = HashSet::new();
    let mut cleaned = Vec::with_capacity(options.len());
    for (i, option) in options.iter().enumerate() {
        let c = clean_option(option);
        if c.is_empty() {
            return Err(McqaError::EmptyOption(i + 1));
        }
        if !seen.insert(c.clone()) {
            return Err(McqaError::DuplicateOption(c));
        }
        cleaned.push(c);
    }
    Ok(cleaned)
}

/// Label options A, B, C… in their given order (randomization disabled).
pub fn sequential(options: &[String]) -> Result<AnswerKey, McqaError> {
    let cleaned = prepare(options)?;
    let labels: Vec<char> = ('A'..='Z').take(cleaned.len()).collect();
    Ok(AnswerKey::from_pairs(cleaned, &labels))
}

/// Shuffles options and assigns random, non-repeating label letters.
pub struct OptionRandomizer {
    rng: Mutex<StdRng>,
}

impl OptionRandomizer {
    /// A randomizer seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// A reproducible randomizer.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Shuffle `options` and relabel them with letters drawn without
    /// replacement from A-Z.
    pub fn randomize(&self, options: &[String]) -> Result<AnswerKey, McqaError> {
        let mut cleaned = prepare(options)?;
        let mut letters: Vec<char> = ('A'..='Z').collect();

        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        cleaned.shuffle(&mut *rng);
        letters.shuffle(&mut *rng);
        drop(rng);

        letters.truncate(cleaned.len());
        Ok(AnswerKey::from_pairs(cleaned, &letters))
    }
}

impl Default for OptionRandomizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn assert_bijection(key: &AnswerKey, originals: &[String]) {
        assert_eq!(key.len(), originals.len());
        let values: HashSet<&str> = key.iter().map(|(_, r)| r).collect();
        assert_eq!(values.len(), originals.len(), "duplicate relabelled values");
        let labels: HashSet<char> = key
            .iter()
            .filter_map(|(_, r)| split_label(r).0)
            .collect();
        assert_eq!(labels.len(), originals.len(), "duplicate label letters");
        for o in originals {
            let relabelled = key.get(o).expect("every original is a key");
            assert_eq!(split_label(relabelled).1, clean_option(o));
        }
    }

    #[test]
    fn randomize_is_a_bijection() {
        let options = opts(&["Ibuprofen", "Penicillin", "Aspirin", "Metformin"]);
        let key = OptionRandomizer::new().randomize(&options).unwrap();
        assert_bijection(&key, &options);
        assert!(key.relabel("Penicillin").unwrap().ends_with(". Penicillin"));
    }

    #[test]
    fn repeated_randomization_differs() {
        let options: Vec<String> = (0..10).map(|i| format!("option {i}")).collect();
        let randomizer = OptionRandomizer::new();
        let keys: Vec<AnswerKey> = (0..5)
            .map(|_| randomizer.randomize(&options).unwrap())
            .collect();
        for key in &keys {
            assert_bijection(key, &options);
        }
        assert!(
            keys.windows(2).any(|w| w[0] != w[1]),
            "five randomizations of ten options should not all agree"
        );
    }

    #[test]
    fn seeded_randomizer_is_reproducible() {
        let options = opts(&["a", "b", "c", "d"]);
        let first = OptionRandomizer::with_seed(7).randomize(&options).unwrap();
        let second = OptionRandomizer::with_seed(7).randomize(&options).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn existing_labels_are_stripped() {
        let options = opts(&["A. Ibuprofen", "B.  Penicillin\n", "  C. Aspirin"]);
        let key = OptionRandomizer::new().randomize(&options).unwrap();
        assert!(key.get("Penicillin").is_some());
        assert!(key.relabel("B. Penicillin").is_ok());
        for (original, _) in key.iter() {
            assert_eq!(split_label(original).0, None);
        }
    }

    #[test]
    fn sequential_labels_in_order() {
        let key = sequential(&opts(&["Ibuprofen", "Penicillin", "Aspirin"])).unwrap();
        assert_eq!(key.render(), "A. Ibuprofen\n B. Penicillin\n C. Aspirin");
        assert_eq!(key.relabel("penicillin ").ok(), None);
        assert_eq!(key.relabel("Penicillin").unwrap(), "B. Penicillin");
    }

    #[test]
    fn input_errors_fail_fast() {
        let randomizer = OptionRandomizer::new();
        assert!(matches!(
            randomizer.randomize(&[]),
            Err(McqaError::EmptyOptions)
        ));
        let many: Vec<String> = (0..27).map(|i| format!("o{i}")).collect();
        assert!(matches!(
            randomizer.randomize(&many),
            Err(McqaError::TooManyOptions(27))
        ));
        assert!(matches!(
            randomizer.randomize(&opts(&["x", "A. x"])),
            Err(McqaError::DuplicateOption(_))
        ));
        assert!(matches!(
            randomizer.randomize(&opts(&["x", "  "])),
            Err(McqaError::EmptyOption(2))
        ));
        let key = randomizer.randomize(&opts(&["x", "y"])).unwrap();
        assert!(matches!(
            key.relabel("z"),
            Err(McqaError::AnswerNotInOptions { .. })
        ));
    }

    #[test]
    fn twenty_six_options_use_every_letter() {
        let options: Vec<String> = (0..26).map(|i| format!("option {i}")).collect();
        let key = OptionRandomizer::new().randomize(&options).unwrap();
        assert_bijection(&key, &options);
    }

    #[test]
    fn split_label_variants() {
        assert_eq!(split_label("C. penicillin"), (Some('C'), "penicillin"));
        assert_eq!(split_label("  B."), (Some('B'), ""));
        assert_eq!(split_label("B.12 vitamin"), (None, "B.12 vitamin"));
        assert_eq!(split_label("penicillin"), (None, "penicillin"));
    }

    #[test]
    fn split_single_line_options() {
        let split = split_labelled_options("A. Ibuprofen B. Penicillin G C. Aspirin");
        assert_eq!(split, vec!["A. Ibuprofen", "B. Penicillin G", "C. Aspirin"]);
    }

    #[test]
    fn split_options_with_commas_and_newlines() {
        let split = split_labelled_options("A. Ibuprofen,\nB. Penicillin,\nC. Aspirin");
        assert_eq!(split, vec!["A. Ibuprofen", "B. Penicillin", "C. Aspirin"]);
    }

    #[test]
    fn split_unlabelled_falls_back_to_lines() {
        let split = split_labelled_options("Ibuprofen\nPenicillin\n\nAspirin");
        assert_eq!(split, vec!["Ibuprofen", "Penicillin", "Aspirin"]);
    }
}
