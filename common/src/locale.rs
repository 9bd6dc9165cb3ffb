use crate::config::LocalePolicy;
use crate::error::{Nl2SqlError, Result};

pub const SUPPORTED_LOCALE: &str = "pt-BR";

/// below this many words the detector does not commit either way
const MIN_WORDS: usize = 3;

const PORTUGUESE_MARKERS: &[&str] = &[
    "de", "do", "da", "dos", "das", "que", "quantos", "quantas", "qual", "quais", "quem",
    "quando", "onde", "em", "para", "com", "os", "um", "uma", "foram", "foi", "tem", "temos",
    "mes", "semana", "ano", "pacientes", "paciente", "consultas", "por", "nao", "esta", "essa",
    "entre", "ate", "agendados", "agendamentos", "hoje", "ontem", "nos", "pelo", "pela",
];

const ENGLISH_MARKERS: &[&str] = &[
    "the", "of", "how", "many", "much", "what", "which", "who", "when", "where", "in", "on",
    "for", "with", "is", "are", "were", "was", "last", "this", "week", "month", "year",
    "patients", "patient", "appointments", "and", "to", "show", "list", "did", "between",
    "today", "yesterday",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocaleVerdict {
    Supported,
    Inconclusive,
    Unsupported,
}

fn fold_accents(word: &str) -> String {
    word.chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' => 'a',
            'é' | 'ê' => 'e',
            'í' => 'i',
            'ó' | 'ô' | 'õ' => 'o',
            'ú' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

fn has_portuguese_diacritics(word: &str) -> bool {
    word.chars().any(|c| "ãõçâêô".contains(c))
}

/// stopword vote between portuguese and english. short or markerless
/// questions come back inconclusive.
pub fn detect(question: &str) -> LocaleVerdict {
    let lowered = question.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .collect();

    if words.len() < MIN_WORDS {
        return LocaleVerdict::Inconclusive;
    }

    let mut portuguese = 0usize;
    let mut english = 0usize;

    for word in &words {
        if has_portuguese_diacritics(word) {
            portuguese += 2;
        }
        let folded = fold_accents(word);
        if PORTUGUESE_MARKERS.contains(&folded.as_str()) {
            portuguese += 1;
        }
        if ENGLISH_MARKERS.contains(word) {
            english += 1;
        }
    }

    match (portuguese, english) {
        (0, 0) => LocaleVerdict::Inconclusive,
        (pt, en) if en > pt => LocaleVerdict::Unsupported,
        _ => LocaleVerdict::Supported,
    }
}

pub struct LocaleGate {
    policy: LocalePolicy,
}

impl LocaleGate {
    pub fn new(policy: LocalePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> LocalePolicy {
        self.policy
    }

    /// `Ok(true)` means the question passes but was flagged
    pub fn check(&self, question: &str) -> Result<bool> {
        if self.policy == LocalePolicy::Off {
            return Ok(false);
        }

        match (detect(question), self.policy) {
            (LocaleVerdict::Unsupported, LocalePolicy::Reject) => {
                tracing::warn!("rejecting question in unsupported locale");
                Err(Nl2SqlError::UnsupportedLocale {
                    expected: SUPPORTED_LOCALE.to_string(),
                })
            }
            (LocaleVerdict::Unsupported, _) => {
                tracing::warn!("question does not look like {}, continuing", SUPPORTED_LOCALE);
                Ok(true)
            }
            (verdict, _) => {
                tracing::debug!(?verdict, "locale check passed");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_portuguese() {
        assert_eq!(
            detect("quantos pacientes foram agendados no mês de março"),
            LocaleVerdict::Supported
        );
        assert_eq!(detect("Qual o nome do paciente mais antigo?"), LocaleVerdict::Supported);
    }

    #[test]
    fn test_detects_english() {
        assert_eq!(
            detect("how many patients were scheduled last month"),
            LocaleVerdict::Unsupported
        );
    }

    #[test]
    fn test_short_input_is_inconclusive() {
        assert_eq!(detect("pacientes março"), LocaleVerdict::Inconclusive);
        assert_eq!(detect("show patients"), LocaleVerdict::Inconclusive);
        assert_eq!(detect("xpto zzz qwerty"), LocaleVerdict::Inconclusive);
    }

    #[test]
    fn test_reject_policy_blocks_english() {
        let gate = LocaleGate::new(LocalePolicy::Reject);
        let err = gate.check("how many patients were seen this week").unwrap_err();
        assert!(matches!(err, Nl2SqlError::UnsupportedLocale { ref expected } if expected == "pt-BR"));
        assert!(!gate.check("quantos pacientes temos hoje").unwrap());
    }

    #[test]
    fn test_flag_policy_lets_english_through() {
        let gate = LocaleGate::new(LocalePolicy::Flag);
        assert!(gate.check("how many patients were seen this week").unwrap());
        assert!(!gate.check("quantos pacientes temos hoje").unwrap());
    }

    #[test]
    fn test_off_policy_skips_detection() {
        let gate = LocaleGate::new(LocalePolicy::Off);
        assert!(!gate.check("how many patients were seen this week").unwrap());
    }
}
