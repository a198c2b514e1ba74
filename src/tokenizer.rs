use crate::config::TokenizationOptions;
use crate::error::ProcessingError;
use crate::lexicon;
use crate::stats::TokenMetrics;
use log::debug;
use regex::Regex;
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
use serde::Serialize;
use std::collections::BTreeMap;

/// How raw text is cut into candidate tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitStrategy {
    /// Runs of whitespace or punctuation
    Combined,
    WhitespaceOnly,
    PunctuationOnly,
    /// Every non-whitespace character is a token
    Characters,
}

impl SplitStrategy {
    fn from_options(options: &TokenizationOptions) -> Self {
        match (options.split_on_whitespace, options.split_on_punctuation) {
            (true, true) => SplitStrategy::Combined,
            (true, false) => SplitStrategy::WhitespaceOnly,
            (false, true) => SplitStrategy::PunctuationOnly,
            (false, false) => SplitStrategy::Characters,
        }
    }
}

/// What the filter pipeline dropped from one text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenizationReport {
    pub raw_tokens: usize,
    pub removed_stopwords: usize,
    pub removed_duplicates: usize,
}

/// Tokens surrounding one occurrence of a target token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextWindow {
    /// index of the target in the token sequence
    pub position: usize,
    pub before: Vec<String>,
    pub after: Vec<String>,
}

/// Third pipeline stage: turns normalized text into tokens
///
/// Output depends only on the input text and the options this tokenizer was
/// built with. Filters run in a fixed order after splitting:
/// 1. Length bounds (in characters)
/// 2. Purely numeric tokens, unless `preserve_numbers`
/// 3. Digit-run splitting of mixed tokens, if `split_on_numbers`
/// 4. Stop words, if `remove_stopwords`
/// 5. Duplicates, if `remove_duplicates` (first occurrence kept, order preserved)
pub struct Tokenizer {
    options: TokenizationOptions,
    strategy: SplitStrategy,
    sentence_regex: Regex,
    paragraph_regex: Regex,
}

impl Tokenizer {
    pub fn new(options: TokenizationOptions) -> Result<Self, ProcessingError> {
        if options.max_token_length == 0 {
            return Err(ProcessingError::Config("max_token_length must be greater than 0".to_string()));
        }
        if options.min_token_length > options.max_token_length {
            return Err(ProcessingError::Config(format!(
                "min_token_length ({}) exceeds max_token_length ({})",
                options.min_token_length, options.max_token_length
            )));
        }

        let strategy = SplitStrategy::from_options(&options);
        debug!("Initialized tokenizer: strategy={:?}, length={}..={}",
               strategy, options.min_token_length, options.max_token_length);

        Ok(Self {
            options,
            strategy,
            sentence_regex: Regex::new(r"[.!?]+").expect("Invalid sentence regex"),
            paragraph_regex: Regex::new(r"\n[ \t\r]*\n").expect("Invalid paragraph regex"),
        })
    }

    pub fn options(&self) -> &TokenizationOptions {
        &self.options
    }

    pub fn strategy(&self) -> SplitStrategy {
        self.strategy
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        self.tokenize_with_report(text).0
    }

    pub fn tokenize_with_report(&self, text: &str) -> (Vec<String>, TokenizationReport) {
        let mut report = TokenizationReport::default();
        if text.trim().is_empty() {
            return (Vec::new(), report);
        }

        let raw = self.split(text);
        report.raw_tokens = raw.len();

        let mut tokens: Vec<String> = raw
            .into_iter()
            .filter(|t| {
                let len = t.chars().count();
                len >= self.options.min_token_length && len <= self.options.max_token_length
            })
            .filter(|t| self.options.preserve_numbers || !is_numeric(t))
            .collect();

        if self.options.split_on_numbers {
            tokens = tokens
                .into_iter()
                .flat_map(|t| split_digit_runs(&t, self.options.preserve_numbers))
                .collect();
        }

        if self.options.remove_stopwords {
            let before = tokens.len();
            tokens.retain(|t| !lexicon::is_stop_word(&t.to_lowercase()));
            report.removed_stopwords = before - tokens.len();
        }

        if self.options.remove_duplicates {
            let before = tokens.len();
            let mut seen: HashSet<String> = HashSet::default();
            tokens.retain(|t| seen.insert(t.clone()));
            report.removed_duplicates = before - tokens.len();
        }

        debug!("Tokenized {} raw pieces into {} tokens", report.raw_tokens, tokens.len());
        (tokens, report)
    }

    fn split(&self, text: &str) -> Vec<String> {
        let keep_punct = self.options.preserve_punctuation;
        match self.strategy {
            SplitStrategy::Combined => split_on(text, |c| c.is_whitespace() || is_punctuation(c), keep_punct),
            SplitStrategy::WhitespaceOnly => text.split_whitespace().map(str::to_string).collect(),
            SplitStrategy::PunctuationOnly => split_on(text, is_punctuation, keep_punct)
                .into_iter()
                .map(|piece| piece.trim().to_string())
                .filter(|piece| !piece.is_empty())
                .collect(),
            SplitStrategy::Characters => text
                .chars()
                .filter(|c| !c.is_whitespace())
                .map(String::from)
                .collect(),
        }
    }

    /// token -> number of occurrences
    pub fn token_frequency(&self, tokens: &[String]) -> HashMap<String, usize> {
        let mut frequency = HashMap::default();
        for token in tokens {
            *frequency.entry(token.clone()).or_insert(0) += 1;
        }
        frequency
    }

    pub fn token_metrics(&self, tokens: &[String]) -> TokenMetrics {
        TokenMetrics::from_tokens(tokens.iter().map(String::as_str))
    }

    /// Overlapping n-grams joined by single spaces. Empty when `n` is 0 or
    /// exceeds the token count.
    pub fn generate_ngrams(&self, text: &str, n: usize) -> Vec<String> {
        let tokens = self.tokenize(text);
        ngrams(&tokens, n)
    }

    /// n-grams for every size from 1 to `max_n`
    pub fn generate_all_ngrams(&self, text: &str, max_n: usize) -> BTreeMap<usize, Vec<String>> {
        let tokens = self.tokenize(text);
        (1..=max_n)
            .map(|n| (n, ngrams(&tokens, n)))
            .filter(|(_, grams)| !grams.is_empty())
            .collect()
    }

    /// Split on runs of `.`, `!` or `?`
    pub fn tokenize_sentences(&self, text: &str) -> Vec<String> {
        self.sentence_regex
            .split(text)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Split on blank lines
    pub fn tokenize_paragraphs(&self, text: &str) -> Vec<String> {
        self.paragraph_regex
            .split(text)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Tokens occurring at least `min_frequency` times with at least
    /// `min_length` characters, most frequent first. Equal counts keep the
    /// order in which the tokens first appeared.
    pub fn extract_keywords(&self, text: &str, min_frequency: usize, min_length: usize) -> Vec<(String, usize)> {
        let tokens = self.tokenize(text);

        let mut order: Vec<(String, usize)> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::default();
        for token in &tokens {
            match index.get(token.as_str()) {
                Some(&i) => order[i].1 += 1,
                None => {
                    index.insert(token.as_str(), order.len());
                    order.push((token.clone(), 1));
                }
            }
        }

        order.retain(|(token, count)| *count >= min_frequency && token.chars().count() >= min_length);
        // stable sort keeps first-encounter order among ties
        order.sort_by(|a, b| b.1.cmp(&a.1));
        order
    }

    /// One window of up to `window_size` tokens on each side per occurrence of `target`
    pub fn contextual_tokens(&self, text: &str, target: &str, window_size: usize) -> Vec<ContextWindow> {
        let tokens = self.tokenize(text);
        tokens
            .iter()
            .enumerate()
            .filter(|(_, token)| token.as_str() == target)
            .map(|(position, _)| {
                let start = position.saturating_sub(window_size);
                let end = (position + 1 + window_size).min(tokens.len());
                ContextWindow {
                    position,
                    before: tokens[start..position].to_vec(),
                    after: tokens[position + 1..end].to_vec(),
                }
            })
            .collect()
    }
}

fn ngrams(tokens: &[String], n: usize) -> Vec<String> {
    if n == 0 || n > tokens.len() {
        return Vec::new();
    }
    tokens.windows(n).map(|window| window.join(" ")).collect()
}

pub fn is_punctuation(c: char) -> bool {
    !c.is_alphanumeric() && !c.is_whitespace() && c != '_'
}

/// Shared by every numeric filter, so `٣` or `½` count as digits everywhere
fn is_digit(c: char) -> bool {
    c.is_numeric()
}

fn is_numeric(token: &str) -> bool {
    !token.is_empty() && token.chars().all(is_digit)
}

/// Split `text` wherever `is_separator` holds. Separators that are punctuation
/// become tokens of their own when `keep_punctuation` is set.
fn split_on(text: &str, is_separator: impl Fn(char) -> bool, keep_punctuation: bool) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        if is_separator(c) {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
            }
            if keep_punctuation && is_punctuation(c) {
                pieces.push(c.to_string());
            }
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// `abc123def` -> `abc`, `123`, `def`. Digit pieces are dropped unless
/// `keep_digits`. Tokens without both kinds of characters pass unchanged.
fn split_digit_runs(token: &str, keep_digits: bool) -> Vec<String> {
    let has_digit = token.chars().any(is_digit);
    let has_other = token.chars().any(|c| !is_digit(c));
    if !(has_digit && has_other) {
        return vec![token.to_string()];
    }

    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_is_digit = false;

    for c in token.chars() {
        let digit = is_digit(c);
        if !current.is_empty() && digit != current_is_digit {
            if !current_is_digit || keep_digits {
                pieces.push(std::mem::take(&mut current));
            } else {
                current.clear();
            }
        }
        current_is_digit = digit;
        current.push(c);
    }
    if !current.is_empty() && (!current_is_digit || keep_digits) {
        pieces.push(current);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenizer(options: TokenizationOptions) -> Tokenizer {
        Tokenizer::new(options).unwrap()
    }

    fn default_tokenizer() -> Tokenizer {
        tokenizer(TokenizationOptions::default())
    }

    #[test]
    fn test_empty_input_for_every_strategy() {
        for (ws, punct) in [(true, true), (true, false), (false, true), (false, false)] {
            let t = tokenizer(TokenizationOptions {
                split_on_whitespace: ws,
                split_on_punctuation: punct,
                ..Default::default()
            });
            assert!(t.tokenize("").is_empty());
            assert!(t.tokenize("   ").is_empty());
        }
    }

    #[test]
    fn test_min_length() {
        let t = tokenizer(TokenizationOptions {
            min_token_length: 2,
            ..Default::default()
        });
        assert_eq!(t.tokenize("a big cat"), vec!["big", "cat"]);
    }

    #[test]
    fn test_strategies() {
        let text = "hello, world-wide web";
        assert_eq!(default_tokenizer().tokenize(text), vec!["hello", "world", "wide", "web"]);

        let ws = tokenizer(TokenizationOptions {
            split_on_punctuation: false,
            ..Default::default()
        });
        assert_eq!(ws.tokenize(text), vec!["hello,", "world-wide", "web"]);

        let punct = tokenizer(TokenizationOptions {
            split_on_whitespace: false,
            ..Default::default()
        });
        assert_eq!(punct.tokenize(text), vec!["hello", "world", "wide web"]);

        let chars = tokenizer(TokenizationOptions {
            split_on_whitespace: false,
            split_on_punctuation: false,
            ..Default::default()
        });
        assert_eq!(chars.tokenize("ab c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_preserve_punctuation() {
        let t = tokenizer(TokenizationOptions {
            preserve_punctuation: true,
            ..Default::default()
        });
        assert_eq!(t.tokenize("wow! really?"), vec!["wow", "!", "really", "?"]);
    }

    #[test]
    fn test_numeric_filters() {
        let drop_numbers = tokenizer(TokenizationOptions {
            preserve_numbers: false,
            ..Default::default()
        });
        assert_eq!(drop_numbers.tokenize("route 66 is iconic"), vec!["route", "is", "iconic"]);

        let split = tokenizer(TokenizationOptions {
            split_on_numbers: true,
            ..Default::default()
        });
        assert_eq!(split.tokenize("abc123def"), vec!["abc", "123", "def"]);

        let split_drop = tokenizer(TokenizationOptions {
            split_on_numbers: true,
            preserve_numbers: false,
            ..Default::default()
        });
        assert_eq!(split_drop.tokenize("mp3 player 2024"), vec!["mp", "player"]);
    }

    #[test]
    fn test_numeric_filters_agree_on_unicode_digits() {
        let t = tokenizer(TokenizationOptions {
            split_on_numbers: true,
            preserve_numbers: false,
            ..Default::default()
        });
        assert_eq!(t.tokenize("٣ ½ abc٣ x½y"), vec!["abc", "x", "y"]);

        let keep = tokenizer(TokenizationOptions {
            split_on_numbers: true,
            ..Default::default()
        });
        assert_eq!(keep.tokenize("abc٣"), vec!["abc", "٣"]);
    }

    #[test]
    fn test_report_counts_dropped_tokens() {
        let t = tokenizer(TokenizationOptions {
            remove_stopwords: true,
            remove_duplicates: true,
            ..Default::default()
        });
        let (tokens, report) = t.tokenize_with_report("the cat and the other cat");
        assert_eq!(tokens, vec!["cat"]);
        assert_eq!(report.raw_tokens, 6);
        assert_eq!(report.removed_stopwords, 4);
        assert_eq!(report.removed_duplicates, 1);
    }

    #[test]
    fn test_dedup_keeps_first_occurrence_order() {
        let t = tokenizer(TokenizationOptions {
            remove_duplicates: true,
            ..Default::default()
        });
        assert_eq!(t.tokenize("b a b c a"), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_stopwords() {
        let t = tokenizer(TokenizationOptions {
            remove_stopwords: true,
            ..Default::default()
        });
        assert_eq!(t.tokenize("the battery is great"), vec!["battery", "great"]);
    }

    #[test]
    fn test_invalid_length_bounds() {
        let result = Tokenizer::new(TokenizationOptions {
            min_token_length: 5,
            max_token_length: 3,
            ..Default::default()
        });
        assert!(matches!(result, Err(ProcessingError::Config(_))));
    }

    #[test]
    fn test_ngrams() {
        let t = default_tokenizer();
        assert_eq!(t.generate_ngrams("a b c", 2), vec!["a b", "b c"]);
        assert!(t.generate_ngrams("a b c", 4).is_empty());
        assert!(t.generate_ngrams("a b c", 0).is_empty());

        let all = t.generate_all_ngrams("a b c", 5);
        assert_eq!(all.len(), 3);
        assert_eq!(all[&3], vec!["a b c"]);
    }

    #[test]
    fn test_sentences_and_paragraphs() {
        let t = default_tokenizer();
        assert_eq!(
            t.tokenize_sentences("Great product!!! Would buy again. Really?"),
            vec!["Great product", "Would buy again", "Really"]
        );
        assert_eq!(
            t.tokenize_paragraphs("first para\nstill first\n\n  \nsecond"),
            vec!["first para\nstill first", "second"]
        );
    }

    #[test]
    fn test_keywords_ties_follow_encounter_order() {
        let t = default_tokenizer();
        let keywords = t.extract_keywords("zeta alpha zeta alpha beta gamma gamma gamma", 2, 1);
        assert_eq!(
            keywords,
            vec![
                ("gamma".to_string(), 3),
                ("zeta".to_string(), 2),
                ("alpha".to_string(), 2),
            ]
        );
    }

    #[test]
    fn test_contextual_tokens() {
        let t = default_tokenizer();
        let windows = t.contextual_tokens("the cat sat near the cat door", "cat", 1);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].before, vec!["the"]);
        assert_eq!(windows[0].after, vec!["sat"]);
        assert_eq!(windows[1].position, 5);
        assert_eq!(windows[1].after, vec!["door"]);
    }

    #[test]
    fn test_frequency_and_metrics() {
        let t = default_tokenizer();
        let tokens = t.tokenize("go go stop");
        let freq = t.token_frequency(&tokens);
        assert_eq!(freq["go"], 2);
        assert_eq!(freq["stop"], 1);

        let metrics = t.token_metrics(&tokens);
        assert_eq!(metrics.unique_tokens, 2);
        assert_eq!(metrics.vocabulary_diversity, metrics.unique_tokens as f64 / metrics.total_tokens as f64);
    }

    #[test]
    fn test_deterministic() {
        let t = default_tokenizer();
        let text = "same input, same tokens";
        assert_eq!(t.tokenize(text), t.tokenize(text));
    }
}
