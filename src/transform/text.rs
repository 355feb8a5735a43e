use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static READ_MORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*(read\s*more)[^\w]*$").unwrap());
static PUNCT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]").unwrap());

/// Eyes, optional nose, one or more mouth characters.
pub const EMOTICON_PATTERN: &str = r"[:;=8][\-o\*']?[\)\]\(\[dDpP/\\:\}\{@\|]+";

/// NLTK English stopword list.
pub const ENGLISH_STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan", "shan't",
    "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't", "wouldn",
    "wouldn't",
];

/// Word lists the normalizer consults. Built once at startup and shared.
#[derive(Debug, Clone)]
pub struct Lexicon {
    stopwords: HashSet<String>,
    emoticons: Regex,
}

impl Lexicon {
    pub fn new<I, S>(stopwords: I, emoticon_pattern: &str) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            stopwords: stopwords.into_iter().map(Into::into).collect(),
            emoticons: Regex::new(emoticon_pattern)?,
        })
    }

    pub fn english() -> Self {
        Self::new(ENGLISH_STOPWORDS.iter().copied(), EMOTICON_PATTERN)
            .expect("built-in emoticon pattern compiles")
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }
}

pub struct TextNormalizer {
    lexicon: Lexicon,
}

impl TextNormalizer {
    pub fn new(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    /// Clean one review body in a single pass. A missing value stays missing.
    ///
    /// Not a fixpoint: removing punctuation or stopwords can leave text that a
    /// second pass strips further.
    pub fn normalize(&self, text: Option<&str>) -> Option<String> {
        let text = text?;

        let lowered = text.to_lowercase();
        let trimmed = READ_MORE_RE.replace(&lowered, "");
        let no_emoticons = self.lexicon.emoticons.replace_all(&trimmed, "");
        let bare = PUNCT_RE.replace_all(&no_emoticons, "");

        let tokens: Vec<&str> = bare
            .split_whitespace()
            .filter(|t| !self.lexicon.is_stopword(t))
            .collect();
        Some(tokens.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> TextNormalizer {
        TextNormalizer::new(Lexicon::english())
    }

    fn norm(s: &str) -> String {
        normalizer().normalize(Some(s)).unwrap()
    }

    #[test]
    fn missing_stays_missing() {
        assert_eq!(normalizer().normalize(None), None);
    }

    #[test]
    fn strips_read_more_suffix() {
        assert_eq!(norm("Awesome camera quality READ MORE"), "awesome camera quality");
        assert_eq!(norm("Great battery life.READ MORE"), "great battery life");
        assert_eq!(norm("Great display readmore..."), "great display");
    }

    #[test]
    fn read_more_only_at_end() {
        // "more" is a stopword, "read" is not
        assert_eq!(norm("read more reviews before buying"), "read reviews buying");
    }

    #[test]
    fn strips_emoticons_and_punctuation() {
        assert_eq!(norm("Loved it :) best phone ;-P"), "loved best phone");
        assert_eq!(norm("Worth every rupee!!! :D"), "worth every rupee");
        assert_eq!(norm("Camera = superb, display = wow"), "camera superb display wow");
    }

    #[test]
    fn removes_stopwords() {
        assert_eq!(norm("This is the best phone I have ever used"), "best phone ever used");
        assert_eq!(norm("the and of"), "");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(norm("  super\tfast \n charging  "), "super fast charging");
    }

    #[test]
    fn keeps_unicode_word_chars() {
        assert_eq!(norm("Bahut badhiya फ़ोन!"), "bahut badhiya फ़ोन");
    }

    #[test]
    fn idempotent_on_typical_reviews() {
        let n = normalizer();
        for input in [
            "Awesome camera quality READ MORE",
            "Loved it :) best phone ;-P",
            "This is the best phone I have ever used!!",
            "Battery drains fast, heating issue... READ MORE",
            "",
        ] {
            let once = n.normalize(Some(input));
            let twice = n.normalize(once.as_deref());
            assert_eq!(once, twice, "input: {input:?}");
        }
    }

    #[test]
    fn single_pass_can_expose_new_matches() {
        let n = normalizer();
        // punctuation removal joins "8" and "d" into an emoticon
        let once = n.normalize(Some("8.d audio"));
        assert_eq!(once.as_deref(), Some("8d audio"));
        assert_eq!(n.normalize(once.as_deref()).as_deref(), Some("audio"));

        // stopword removal leaves "readmore" at the end
        let once = n.normalize(Some("readmore the"));
        assert_eq!(once.as_deref(), Some("readmore"));
        assert_eq!(n.normalize(once.as_deref()).as_deref(), Some(""));
    }

    #[test]
    fn custom_lexicon() {
        let lexicon = Lexicon::new(["phone"], EMOTICON_PATTERN).unwrap();
        let n = TextNormalizer::new(lexicon);
        assert_eq!(n.normalize(Some("The phone is good")).as_deref(), Some("the is good"));
    }
}
