//! Answer scoring.

use crate::randomizer::split_label;

/// Scores a generated answer against the true answer.
///
/// Implementations must be deterministic and return a value in `[0, 1]`.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, generated_answer: &str, actual_answer: &str) -> f64;
}

/// Case- and whitespace-insensitive matching that understands option labels.
///
/// `"c.  Penicillin"`, `"C. penicillin"` and a bare `"C"` all match an actual
/// answer of `"C. Penicillin"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelMatch;

fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches('.')
        .to_lowercase()
}

impl Evaluator for LabelMatch {
    fn evaluate(&self, generated_answer: &str, actual_answer: &str) -> f64 {
        let generated = normalize(generated_answer);
        let actual = normalize(actual_answer);
        if generated.is_empty() || actual.is_empty() {
            return 0.0;
        }
        if generated == actual {
            return 1.0;
        }

        // Labels are compared on the original text since they are uppercase.
        let (gen_label, gen_body) = split_label(generated_answer);
        let (act_label, act_body) = split_label(actual_answer);

        if actual.len() > 1 && generated.contains(&actual) {
            return 1.0;
        }

        if let (Some(label), [only]) = (act_label, generated.as_bytes()) {
            if label.to_ascii_lowercase() as u8 == *only {
                return 1.0;
            }
        }

        let gen_body = normalize(gen_body);
        let labelled = gen_label.is_some() || act_label.is_some();
        if labelled && !gen_body.is_empty() && gen_body == normalize(act_body) {
            return 1.0;
        }

        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(generated: &str, actual: &str) -> f64 {
        LabelMatch.evaluate(generated, actual)
    }

    #[test]
    fn exact_match_scores_one() {
        assert_eq!(eval("C. penicillin", "C. penicillin"), 1.0);
    }

    #[test]
    fn different_option_scores_zero() {
        assert_eq!(eval("C. penicillin", "B. amoxicillin"), 0.0);
    }

    #[test]
    fn case_and_whitespace_variants_match() {
        assert_eq!(eval("  c.   PENICILLIN ", "C. penicillin"), 1.0);
        assert_eq!(eval("C. Penicillin.", "C. penicillin"), 1.0);
        assert_eq!(eval("C.\npenicillin", "C. penicillin"), 1.0);
    }

    #[test]
    fn bare_label_matches() {
        assert_eq!(eval("C", "C. penicillin"), 1.0);
        assert_eq!(eval("c.", "C. penicillin"), 1.0);
        assert_eq!(eval("B", "C. penicillin"), 0.0);
    }

    #[test]
    fn body_without_label_matches() {
        assert_eq!(eval("Penicillin", "C. Penicillin"), 1.0);
    }

    #[test]
    fn right_text_under_wrong_label_still_matches() {
        // Option text decides when the labels disagree
        assert_eq!(eval("B. Penicillin", "C. Penicillin"), 1.0);
        assert_eq!(eval("B. Aspirin", "C. Penicillin"), 0.0);
    }

    #[test]
    fn containing_sentence_matches() {
        assert_eq!(eval("The answer is C. Penicillin", "C. Penicillin"), 1.0);
    }

    #[test]
    fn placeholder_scores_zero() {
        assert_eq!(eval("Answer", "C. Penicillin"), 0.0);
        assert_eq!(eval("", "C. Penicillin"), 0.0);
    }

    #[test]
    fn deterministic_and_bounded() {
        for (g, a) in [("A. x", "A. x"), ("A", "B. y"), ("foo", "bar")] {
            let first = eval(g, a);
            assert_eq!(first, eval(g, a));
            assert!((0.0..=1.0).contains(&first));
        }
    }
}
