use crate::config::{NormalizationMode, NormalizationOptions};
use crate::error::ProcessingError;
use crate::lexicon::{self, MIN_STEM_LENGTH, STEM_RULES, SUFFIX_CONTRACTIONS, WORD_CONTRACTIONS};
use fancy_regex::{Regex as FancyRegex, RegexBuilder as FancyRegexBuilder};
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// What one `normalize` call changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationReport {
    pub contractions_expanded: usize,
    /// words rewritten by the stem or lemma step
    pub morphology_transformations: usize,
}

/// Second pipeline stage: canonicalizes cleaned text
///
/// Fixed order:
/// 1. Case fold
/// 2. Accent stripping (NFD, drop combining marks)
/// 3. Contraction expansion, then leftover apostrophes become spaces
/// 4. Number placeholders
/// 5. Whitespace normalization
/// 6. Stemming or lemmatization, per `NormalizationMode`
pub struct TextNormalizer {
    options: NormalizationOptions,
    word_contraction_regex: FancyRegex,
    suffix_contraction_regex: FancyRegex,
    number_regex: Regex,
    whitespace_regex: Regex,
}

impl TextNormalizer {
    pub fn new(options: NormalizationOptions) -> Self {
        // Whole-word forms go first so `won't` never degrades to `wo not` via `n't`
        let word_keys = lexicon::keys_longest_first(WORD_CONTRACTIONS).join("|");
        let suffix_keys = lexicon::keys_longest_first(SUFFIX_CONTRACTIONS).join("|");
        let backtrack_limit = options.backtrack_limit;

        Self {
            options,
            word_contraction_regex: FancyRegexBuilder::new(&format!(r"(?i)(?<![\w'])(?:{})(?![\w'])", word_keys))
                .backtrack_limit(backtrack_limit)
                .build()
                .expect("Invalid word contraction regex"),
            suffix_contraction_regex: FancyRegexBuilder::new(&format!(r"(?i)(?<=\w)(?:{})(?![\w'])", suffix_keys))
                .backtrack_limit(backtrack_limit)
                .build()
                .expect("Invalid suffix contraction regex"),
            number_regex: Regex::new(r"\d+(?:[.,]\d+)*").expect("Invalid number regex"),
            whitespace_regex: Regex::new(r"\s+").expect("Invalid whitespace regex"),
        }
    }

    pub fn options(&self) -> &NormalizationOptions {
        &self.options
    }

    pub fn mode(&self) -> NormalizationMode {
        self.options.mode
    }

    pub fn normalize(&self, text: &str) -> Result<String, ProcessingError> {
        self.normalize_with_report(text).map(|(normalized, _)| normalized)
    }

    /// Normalize and count the contractions expanded and words rewritten by
    /// stemming or lemmatization
    pub fn normalize_with_report(&self, text: &str) -> Result<(String, NormalizationReport), ProcessingError> {
        let mut report = NormalizationReport::default();
        let mut normalized = if self.options.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        if self.options.strip_accents {
            normalized = strip_accents(&normalized);
        }

        if self.options.expand_contractions {
            normalized = normalized.replace('\u{2019}', "'");
            let (expanded, words) = self.expand(&self.word_contraction_regex, &normalized)?;
            let (expanded, suffixes) = self.expand(&self.suffix_contraction_regex, &expanded)?;
            report.contractions_expanded = words + suffixes;
            normalized = expanded;
            // possessives and stray quotes are not words
            normalized = normalized.replace('\'', " ");
        }

        if self.options.normalize_numbers {
            let placeholder = format!(" {} ", self.options.number_placeholder);
            normalized = self
                .number_regex
                .replace_all(&normalized, placeholder.as_str())
                .into_owned();
        }

        if self.options.normalize_whitespace {
            normalized = self.whitespace_regex.replace_all(&normalized, " ").trim().to_string();
        }

        let (normalized, transformations) = match self.options.mode {
            NormalizationMode::None => (normalized, 0),
            NormalizationMode::Stem => map_words(&normalized, stem_word),
            NormalizationMode::Lemmatize => map_words(&normalized, lemmatize_word),
        };
        report.morphology_transformations = transformations;

        debug!(
            "Normalized text ({}): {} -> {} characters",
            self.options.mode.as_str(),
            text.len(),
            normalized.len()
        );
        Ok((normalized, report))
    }

    /// Replace every match of `regex` with its table expansion.
    ///
    /// The backtracking engine can fail at match time, so matches are walked by
    /// hand instead of using `replace_all`.
    fn expand(&self, regex: &FancyRegex, text: &str) -> Result<(String, usize), ProcessingError> {
        let mut out = String::with_capacity(text.len() + 16);
        let mut last = 0;
        let mut expanded = 0;

        for found in regex.find_iter(text) {
            let m = found.map_err(|e| ProcessingError::Normalization(e.to_string()))?;
            out.push_str(&text[last..m.start()]);
            match lexicon::contraction_expansion(&m.as_str().to_lowercase()) {
                Some(expansion) => {
                    out.push_str(expansion);
                    expanded += 1;
                }
                None => out.push_str(m.as_str()),
            }
            last = m.end();
        }

        out.push_str(&text[last..]);
        Ok((out, expanded))
    }
}

/// Decompose, drop combining marks, recompose.
pub fn strip_accents(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .nfc()
        .collect()
}

/// Apply `f` to every word; also returns how many words it changed
fn map_words(text: &str, f: fn(&str) -> String) -> (String, usize) {
    let mut changed = 0;
    let words: Vec<String> = text
        .split_whitespace()
        .map(|word| {
            let mapped = f(word);
            if mapped != word {
                changed += 1;
            }
            mapped
        })
        .collect();
    (words.join(" "), changed)
}

/// Single-pass suffix stemmer.
///
/// Only the first rule in `STEM_RULES` whose suffix matches is considered. If
/// its rewrite would leave fewer than `MIN_STEM_LENGTH` characters the word is
/// returned unchanged; later rules are not tried.
pub fn stem_word(word: &str) -> String {
    for (suffix, replacement) in STEM_RULES {
        if let Some(stem) = word.strip_suffix(suffix) {
            let candidate = format!("{}{}", stem, replacement);
            if candidate.chars().count() >= MIN_STEM_LENGTH {
                return candidate;
            }
            return word.to_string();
        }
    }
    word.to_string()
}

/// Dictionary lookup; unknown words pass through.
pub fn lemmatize_word(word: &str) -> String {
    lexicon::lemma(word).unwrap_or(word).to_string()
}
