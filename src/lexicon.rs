//! Static word tables used by normalization and tokenization
//!
//! The tables are plain data compiled into the binary. Lookups go through
//! lazily built hash maps so a table is only materialized when first used.

use once_cell::sync::Lazy;
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

/// Contractions that are whole words. Matched before the suffix forms.
pub const WORD_CONTRACTIONS: &[(&str, &str)] = &[
    ("won't", "will not"),
    ("can't", "cannot"),
    ("shan't", "shall not"),
    ("ain't", "is not"),
    ("it's", "it is"),
    ("that's", "that is"),
    ("there's", "there is"),
    ("here's", "here is"),
    ("what's", "what is"),
    ("where's", "where is"),
    ("who's", "who is"),
    ("how's", "how is"),
    ("let's", "let us"),
    ("don't", "do not"),
    ("doesn't", "does not"),
    ("didn't", "did not"),
    ("haven't", "have not"),
    ("hasn't", "has not"),
    ("hadn't", "had not"),
    ("wouldn't", "would not"),
    ("shouldn't", "should not"),
    ("couldn't", "could not"),
    ("mightn't", "might not"),
    ("mustn't", "must not"),
    ("y'all", "you all"),
];

/// Contraction endings that attach to the preceding word (`they're`, `we've`).
/// `'s` is deliberately absent: it is just as often a possessive.
pub const SUFFIX_CONTRACTIONS: &[(&str, &str)] = &[
    ("n't", " not"),
    ("'re", " are"),
    ("'ve", " have"),
    ("'ll", " will"),
    ("'d", " would"),
    ("'m", " am"),
];

/// Ordered suffix rewrite rules for the stemmer.
///
/// The first rule whose suffix matches wins and no further rule is tried.
/// `ss -> ss` exists only to stop `s -> ""` from firing on words like `class`.
pub const STEM_RULES: &[(&str, &str)] = &[
    ("ization", "ize"),
    ("ational", "ate"),
    ("fulness", "ful"),
    ("ousness", "ous"),
    ("iveness", "ive"),
    ("tional", "tion"),
    ("biliti", "ble"),
    ("ation", "ate"),
    ("alism", "al"),
    ("aliti", "al"),
    ("iviti", "ive"),
    ("ousli", "ous"),
    ("entli", "ent"),
    ("fulli", "ful"),
    ("enci", "ence"),
    ("anci", "ance"),
    ("izer", "ize"),
    ("abli", "able"),
    ("alli", "al"),
    ("ator", "ate"),
    ("sses", "ss"),
    ("ness", ""),
    ("ment", ""),
    ("ing", ""),
    ("ies", "i"),
    ("ied", "i"),
    ("eed", "ee"),
    ("ed", ""),
    ("ly", ""),
    ("ss", "ss"),
    ("s", ""),
];

/// Minimum length a stemmed word may have; shorter results are discarded.
pub const MIN_STEM_LENGTH: usize = 2;

const LEMMA_PAIRS: &[(&str, &str)] = &[
    // irregular verbs
    ("was", "be"), ("were", "be"), ("been", "be"), ("being", "be"), ("am", "be"), ("is", "be"), ("are", "be"),
    ("had", "have"), ("has", "have"), ("having", "have"),
    ("did", "do"), ("does", "do"), ("doing", "do"), ("done", "do"),
    ("went", "go"), ("gone", "go"), ("going", "go"), ("goes", "go"),
    ("came", "come"), ("coming", "come"),
    ("said", "say"), ("saying", "say"),
    ("got", "get"), ("gotten", "get"), ("getting", "get"),
    ("made", "make"), ("making", "make"),
    ("took", "take"), ("taken", "take"), ("taking", "take"),
    ("saw", "see"), ("seen", "see"), ("seeing", "see"),
    ("knew", "know"), ("known", "know"), ("knowing", "know"),
    ("thought", "think"), ("thinking", "think"),
    ("felt", "feel"), ("feeling", "feel"),
    ("found", "find"), ("finding", "find"),
    ("gave", "give"), ("given", "give"), ("giving", "give"),
    ("left", "leave"), ("leaving", "leave"),
    ("told", "tell"), ("telling", "tell"),
    ("became", "become"), ("becoming", "become"),
    ("brought", "bring"), ("bringing", "bring"),
    ("bought", "buy"), ("buying", "buy"),
    ("caught", "catch"), ("catching", "catch"),
    ("chose", "choose"), ("chosen", "choose"), ("choosing", "choose"),
    ("drew", "draw"), ("drawn", "draw"), ("drawing", "draw"),
    ("drove", "drive"), ("driven", "drive"), ("driving", "drive"),
    ("ate", "eat"), ("eaten", "eat"), ("eating", "eat"),
    ("fell", "fall"), ("fallen", "fall"), ("falling", "fall"),
    ("flew", "fly"), ("flown", "fly"), ("flying", "fly"),
    ("forgot", "forget"), ("forgotten", "forget"), ("forgetting", "forget"),
    ("grew", "grow"), ("grown", "grow"), ("growing", "grow"),
    ("heard", "hear"), ("hearing", "hear"),
    ("held", "hold"), ("holding", "hold"),
    ("kept", "keep"), ("keeping", "keep"),
    ("led", "lead"), ("leading", "lead"),
    ("learned", "learn"), ("learnt", "learn"), ("learning", "learn"),
    ("lost", "lose"), ("losing", "lose"),
    ("meant", "mean"), ("meaning", "mean"),
    ("met", "meet"), ("meeting", "meet"),
    ("paid", "pay"), ("paying", "pay"),
    ("ran", "run"), ("running", "run"),
    ("sent", "send"), ("sending", "send"),
    ("sold", "sell"), ("selling", "sell"),
    ("showed", "show"), ("shown", "show"), ("showing", "show"),
    ("spoke", "speak"), ("spoken", "speak"), ("speaking", "speak"),
    ("spent", "spend"), ("spending", "spend"),
    ("stood", "stand"), ("standing", "stand"),
    ("taught", "teach"), ("teaching", "teach"),
    ("threw", "throw"), ("thrown", "throw"), ("throwing", "throw"),
    ("understood", "understand"), ("understanding", "understand"),
    ("won", "win"), ("winning", "win"),
    ("wrote", "write"), ("written", "write"), ("writing", "write"),
    // irregular plurals
    ("children", "child"), ("people", "person"), ("men", "man"), ("women", "woman"),
    ("feet", "foot"), ("teeth", "tooth"), ("geese", "goose"), ("mice", "mouse"),
    ("oxen", "ox"), ("sheep", "sheep"), ("deer", "deer"), ("fish", "fish"),
    // comparatives and superlatives
    ("better", "good"), ("best", "good"), ("worse", "bad"), ("worst", "bad"),
    ("further", "far"), ("furthest", "far"), ("farther", "far"), ("farthest", "far"),
    ("more", "much"), ("most", "much"), ("less", "little"), ("least", "little"),
    ("older", "old"), ("oldest", "old"), ("elder", "old"), ("eldest", "old"),
    ("bigger", "big"), ("biggest", "big"), ("smaller", "small"), ("smallest", "small"),
    ("larger", "large"), ("largest", "large"), ("longer", "long"), ("longest", "long"),
    ("shorter", "short"), ("shortest", "short"), ("higher", "high"), ("highest", "high"),
    ("lower", "low"), ("lowest", "low"), ("stronger", "strong"), ("strongest", "strong"),
    ("weaker", "weak"), ("weakest", "weak"), ("faster", "fast"), ("fastest", "fast"),
    ("slower", "slow"), ("slowest", "slow"), ("newer", "new"), ("newest", "new"),
];

const STOP_WORD_LIST: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
    "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers",
    "herself", "it", "its", "itself", "they", "them", "their", "theirs", "themselves",
    "what", "which", "who", "whom", "whose", "when", "where", "why", "how",
    "this", "that", "these", "those", "a", "an", "the",
    "and", "but", "or", "nor", "for", "yet", "so", "because", "since", "as", "while",
    "although", "though", "unless", "until", "if", "whether",
    "of", "at", "by", "with", "about", "against", "between", "into", "through",
    "during", "before", "after", "above", "below", "up", "down", "in", "out",
    "on", "off", "over", "under", "to", "from",
    "am", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "having",
    "do", "does", "did", "doing", "will", "would", "could", "should", "may", "might", "must",
    "can", "shall",
    "again", "further", "then", "once", "here", "there", "now", "just", "only", "very",
    "too", "than", "quite", "rather", "really", "already", "still", "also", "even",
    "all", "any", "both", "each", "few", "more", "most", "other", "some", "such",
    "no", "not", "own", "same", "many", "much",
];

static LEMMAS: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| LEMMA_PAIRS.iter().copied().collect());

static STOP_WORDS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| STOP_WORD_LIST.iter().copied().collect());

static CONTRACTIONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    WORD_CONTRACTIONS
        .iter()
        .chain(SUFFIX_CONTRACTIONS.iter())
        .copied()
        .collect()
});

/// Exact-match lemma lookup
pub fn lemma(word: &str) -> Option<&'static str> {
    LEMMAS.get(word).copied()
}

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(word)
}

/// Expansion for a contraction key (lowercase, straight apostrophe)
pub fn contraction_expansion(key: &str) -> Option<&'static str> {
    CONTRACTIONS.get(key).copied()
}

/// Contraction keys of a table, longest first, so alternations try long keys before short ones.
pub fn keys_longest_first(table: &[(&'static str, &'static str)]) -> Vec<&'static str> {
    let mut keys: Vec<&'static str> = table.iter().map(|(key, _)| *key).collect();
    keys.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    keys
}
