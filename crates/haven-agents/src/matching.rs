//! Parsing and ranking of shelter match replies.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

/// Returned verbatim when no shelter produced a usable candidate.
pub const NO_MATCH_MESSAGE: &str = "I'm sorry, but I couldn't find any matches that fit your preferences. Consider adjusting your criteria to see more potential matches.";

/// How many matches are presented to the adopter.
pub const MAX_MATCHES: usize = 3;

static NUMBERED_MATCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\.\s+([^-]+)-\s*(\d+)/100\s*-\s*([^\n]+)").expect("valid match pattern")
});

/// One animal proposed by a shelter agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub animal: String,
    /// 0 to 100.
    pub score: u8,
    pub explanation: String,
}

/// A shelter's reply to a match request, after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShelterReply {
    Matches(Vec<Candidate>),
    /// Nothing recognizable; contributes no candidates.
    Unparsed(String),
}

/// A candidate tagged with the shelter that proposed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedMatch {
    pub shelter_id: String,
    pub shelter_name: String,
    pub candidate: Candidate,
}

#[derive(Deserialize)]
struct RawCandidate {
    animal: String,
    score: Value,
    #[serde(default)]
    explanation: String,
}

impl RawCandidate {
    fn validate(self) -> Option<Candidate> {
        let score = self.score.as_u64().filter(|s| *s <= 100)?;
        let animal = self.animal.trim();
        if animal.is_empty() {
            return None;
        }
        Some(Candidate {
            animal: animal.to_string(),
            score: score as u8,
            explanation: self.explanation.trim().to_string(),
        })
    }
}

impl ShelterReply {
    /// Validate a reply: a JSON array of `{animal, score, explanation}` is
    /// preferred, a numbered `N. animal - score/100 - reason` list is the
    /// fallback.
    pub fn parse(text: &str) -> Self {
        if let Some(candidates) = parse_json_array(text) {
            return Self::Matches(candidates);
        }
        let candidates: Vec<Candidate> = NUMBERED_MATCH
            .captures_iter(text)
            .filter_map(|caps| {
                let score: u8 = caps[3].parse().ok().filter(|s| *s <= 100)?;
                Some(Candidate {
                    animal: caps[2].trim().to_string(),
                    score,
                    explanation: caps[4].trim().to_string(),
                })
            })
            .collect();
        if candidates.is_empty() {
            Self::Unparsed(text.to_string())
        } else {
            Self::Matches(candidates)
        }
    }

    pub fn candidates(&self) -> &[Candidate] {
        match self {
            Self::Matches(c) => c,
            Self::Unparsed(_) => &[],
        }
    }
}

/// Find the first JSON array in `text` that parses as a list of candidates.
fn parse_json_array(text: &str) -> Option<Vec<Candidate>> {
    for (start, _) in text.match_indices('[') {
        let mut stream =
            serde_json::Deserializer::from_str(&text[start..]).into_iter::<Vec<RawCandidate>>();
        if let Some(Ok(raw)) = stream.next() {
            let candidates: Vec<Candidate> =
                raw.into_iter().filter_map(RawCandidate::validate).collect();
            if !candidates.is_empty() {
                return Some(candidates);
            }
        }
    }
    None
}

/// Stable sort by descending score, keeping the best [`MAX_MATCHES`].
/// Ties keep the order the matches were pooled in.
pub fn rank(mut pool: Vec<RankedMatch>) -> Vec<RankedMatch> {
    pool.sort_by(|a, b| b.candidate.score.cmp(&a.candidate.score));
    pool.truncate(MAX_MATCHES);
    pool
}

/// Render ranked matches for the adopter.
pub fn format_matches(matches: &[RankedMatch]) -> String {
    if matches.is_empty() {
        return NO_MATCH_MESSAGE.to_string();
    }
    let body = matches
        .iter()
        .enumerate()
        .map(|(i, m)| {
            [
                format!("🐾 Match #{}: {}", i + 1, m.candidate.animal),
                format!("⭐ Match Score: {}/100", m.candidate.score),
                format!("💭 Why this could be a good fit:\n   {}", m.candidate.explanation),
                format!("📍 Available at: {}", m.shelter_name),
            ]
            .join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    [
        "I've found some great potential matches for you!",
        body.as_str(),
        "Would you like to learn more about any of these pets or schedule a visit to meet them? Just let me know which one interests you the most!",
    ]
    .join("\n\n")
}
