use crate::config::CleaningOptions;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;

/// Counts of the structural noise removed from one text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub urls: usize,
    pub emails: usize,
    pub mentions: usize,
    pub hashtags: usize,
    pub numbers: usize,
    pub html_tags: usize,
    pub punctuation: usize,
}

/// First pipeline stage: strips URLs, emails, social markers, numbers, HTML and
/// punctuation, folds case and collapses whitespace.
///
/// Pure: the same input and options always produce the same output, and
/// cleaning an already cleaned string returns it unchanged.
pub struct TextCleaner {
    options: CleaningOptions,
    url_regex: Regex,
    email_regex: Regex,
    mention_regex: Regex,
    hashtag_regex: Regex,
    number_regex: Regex,
    html_regex: Regex,
    whitespace_regex: Regex,
}

impl TextCleaner {
    pub fn new(options: CleaningOptions) -> Self {
        Self {
            options,
            url_regex: Regex::new(r"(?:https?|ftp)://\S+|www\.\S+").expect("Invalid URL regex"),
            email_regex: Regex::new(r"[\w.+-]+@[\w-]+(?:\.[\w-]+)*\.\w+").expect("Invalid email regex"),
            mention_regex: Regex::new(r"@(\w+)").expect("Invalid mention regex"),
            hashtag_regex: Regex::new(r"#(\w+)").expect("Invalid hashtag regex"),
            number_regex: Regex::new(r"\d+(?:[.,]\d+)*").expect("Invalid number regex"),
            html_regex: Regex::new(r"<[^>]+>").expect("Invalid HTML regex"),
            whitespace_regex: Regex::new(r"\s+").expect("Invalid whitespace regex"),
        }
    }

    pub fn options(&self) -> &CleaningOptions {
        &self.options
    }

    pub fn clean(&self, text: &str) -> String {
        self.clean_with_report(text).0
    }

    /// Clean text and report what was removed
    ///
    /// Steps, each skipped when disabled:
    /// 1. Lowercase
    /// 2. URLs, then email addresses
    /// 3. `@` and `#` markers (the word itself is kept)
    /// 4. Digit runs, HTML tags
    /// 5. Punctuation and symbols, replaced by spaces
    /// 6. Collapse whitespace and trim
    pub fn clean_with_report(&self, text: &str) -> (String, CleaningReport) {
        let mut report = CleaningReport::default();
        let mut cleaned = if self.options.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        if self.options.remove_urls {
            report.urls = self.url_regex.find_iter(&cleaned).count();
            cleaned = self.url_regex.replace_all(&cleaned, " ").into_owned();
        }

        if self.options.remove_emails {
            report.emails = self.email_regex.find_iter(&cleaned).count();
            cleaned = self.email_regex.replace_all(&cleaned, " ").into_owned();
        }

        if self.options.remove_mentions {
            report.mentions = self.mention_regex.find_iter(&cleaned).count();
            cleaned = self.mention_regex.replace_all(&cleaned, "$1").into_owned();
        }

        if self.options.remove_hashtags {
            report.hashtags = self.hashtag_regex.find_iter(&cleaned).count();
            cleaned = self.hashtag_regex.replace_all(&cleaned, "$1").into_owned();
        }

        if self.options.remove_numbers {
            report.numbers = self.number_regex.find_iter(&cleaned).count();
            cleaned = self.number_regex.replace_all(&cleaned, "").into_owned();
        }

        if self.options.remove_html {
            report.html_tags = self.html_regex.find_iter(&cleaned).count();
            cleaned = self.html_regex.replace_all(&cleaned, " ").into_owned();
        }

        if self.options.remove_punctuation {
            let (stripped, removed) = strip_punctuation(&cleaned, self.options.keep_contractions);
            report.punctuation = removed;
            cleaned = stripped;
        }

        if self.options.normalize_whitespace {
            cleaned = self.whitespace_regex.replace_all(&cleaned, " ").trim().to_string();
        }

        debug!("Cleaned text: {} -> {} characters", text.len(), cleaned.len());
        (cleaned, report)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || is_combining_mark(c)
}

fn is_apostrophe(c: char) -> bool {
    c == '\'' || c == '\u{2019}'
}

/// Replace every character that is neither a word character nor whitespace with
/// a space. With `keep_contractions`, an apostrophe between two word characters
/// survives as a straight `'`.
fn strip_punctuation(text: &str, keep_contractions: bool) -> (String, usize) {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut removed = 0;

    for (i, &c) in chars.iter().enumerate() {
        if is_word_char(c) || c.is_whitespace() {
            out.push(c);
            continue;
        }

        let inside_word = i > 0
            && i + 1 < chars.len()
            && is_word_char(chars[i - 1])
            && is_word_char(chars[i + 1]);
        if keep_contractions && is_apostrophe(c) && inside_word {
            out.push('\'');
        } else {
            out.push(' ');
            removed += 1;
        }
    }

    (out, removed)
}
