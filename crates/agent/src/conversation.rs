const HOSTILE_WORDS: &[&str] = &[
    "hate", "stupid", "useless", "broken", "ridiculous", "terrible", "awful", "wtf", "damn",
    "annoying", "garbage", "sick",
];
const URGENCY_WORDS: &[&str] = &["now", "immediately", "asap", "again", "still", "just", "already"];

const HOSTILE_WEIGHT: f64 = 0.35;
const URGENCY_WEIGHT: f64 = 0.1;
const EXCLAMATION_WEIGHT: f64 = 0.1;
const SHOUTING_WEIGHT: f64 = 0.15;

const MAX_EXCLAMATIONS: usize = 3;
const MAX_SHOUTED_TOKENS: usize = 2;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrustrationSignals {
    pub hostile_hits: usize,
    pub urgency_hits: usize,
    pub exclamations: usize,
    pub shouted_tokens: usize,
}

impl FrustrationSignals {
    pub fn score(&self) -> f64 {
        let raw = HOSTILE_WEIGHT * self.hostile_hits as f64
            + URGENCY_WEIGHT * self.urgency_hits as f64
            + EXCLAMATION_WEIGHT * self.exclamations.min(MAX_EXCLAMATIONS) as f64
            + SHOUTING_WEIGHT * self.shouted_tokens.min(MAX_SHOUTED_TOKENS) as f64;
        raw.clamp(0.0, 1.0)
    }
}

/// Lexical frustration signal fed to the gate ahead of each turn. The gate treats
/// the resulting level as an input; this is the upstream that produces it.
#[derive(Clone, Debug)]
pub struct FrustrationEstimator {
    smoothing: f64,
}

impl Default for FrustrationEstimator {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl FrustrationEstimator {
    pub fn new(smoothing: f64) -> Self {
        Self { smoothing: smoothing.clamp(0.0, 1.0) }
    }

    pub fn signals(&self, text: &str) -> FrustrationSignals {
        let raw_tokens = tokenize(text);
        let tokens = raw_tokens.iter().map(|token| normalize_text(token)).collect::<Vec<_>>();

        FrustrationSignals {
            hostile_hits: count_hits(&tokens, HOSTILE_WORDS),
            urgency_hits: count_hits(&tokens, URGENCY_WORDS),
            exclamations: text.matches('!').count(),
            shouted_tokens: raw_tokens.iter().filter(|token| is_shouted(token)).count(),
        }
    }

    pub fn score_message(&self, text: &str) -> f64 {
        self.signals(text).score()
    }

    /// Blends the newest message into the running level.
    pub fn update(&self, previous: f64, text: &str) -> f64 {
        let previous = if previous.is_finite() { previous.clamp(0.0, 1.0) } else { 0.0 };
        let next = self.smoothing * self.score_message(text) + (1.0 - self.smoothing) * previous;
        next.clamp(0.0, 1.0)
    }
}

fn normalize_text(text: &str) -> String {
    text.to_ascii_lowercase()
}

fn tokenize(text: &str) -> Vec<String> {
    let mut sanitized = String::with_capacity(text.len());
    for character in text.chars() {
        if character.is_ascii_alphanumeric() || character == '\'' {
            sanitized.push(character);
        } else {
            sanitized.push(' ');
        }
    }
    sanitized.split_whitespace().map(|token| token.to_string()).collect()
}

fn count_hits(tokens: &[String], words: &[&str]) -> usize {
    tokens.iter().filter(|token| words.contains(&token.as_str())).count()
}

fn is_shouted(token: &str) -> bool {
    token.len() >= 3
        && token.chars().all(|character| character.is_ascii_alphabetic())
        && token.chars().all(|character| character.is_ascii_uppercase())
}
