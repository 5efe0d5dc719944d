//! Two-tier bio classification.
//!
//! Tier one is a local keyword/pattern heuristic that settles the
//! unambiguous majority without network cost: empty bios are No, any
//! predicate hit is Yes. Whatever remains goes to the semantic tier as ONE
//! batched chat request; the reply must be a whitespace-separated yes/no
//! list aligned with the batch, and any failure there (transport, length
//! mismatch, junk token) downgrades that batch to the same heuristic.
//! Verdicts are merged back in input order, defaulting to No.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use tracing::{debug, info, warn};

use ai_client::{ChatAgent, Message};
use flocksift_common::{FlocksiftError, ProfileRecord, Verdict};

// ---------------------------------------------------------------------------
// Predicate
// ---------------------------------------------------------------------------

/// The semantic question asked of each bio: a lowercase substring keyword
/// set, a whole-word pattern list, and the prompt sent to the semantic tier
/// for bios the local tiers cannot settle.
pub struct Predicate {
    keywords: Vec<String>,
    word_pattern: Regex,
    prompt: String,
}

/// Affiliation markers matched as substrings of the lowercased bio.
const CHRISTIAN_WORDS: &[&str] = &[
    "jesus",
    "christ",
    "christian",
    "god",
    "lord",
    "bible",
    "believer",
    "disciple",
    "faith",
    "saved",
    "born again",
    "church",
    "worship",
];

/// Glyphs and slang abbreviations that read as explicit signals on their own.
const QUICK_FLAGS: &[&str] = &["†", "✝", "cross", "amen", "agtg", "jesusfreak", "bibleverse"];

/// Canonical scripture book names, matched whole-word only (with optional
/// trailing possessive) so "johnson" never hits "john".
const BIBLE_BOOKS: &[&str] = &[
    "genesis", "exodus", "leviticus", "numbers", "deuteronomy", "joshua", "judges", "ruth",
    "samuel", "kings", "chronicles", "ezra", "nehemiah", "esther", "job", "psalm", "psalms",
    "proverbs", "ecclesiastes", "song", "songs", "canticles", "isaiah", "jeremiah",
    "lamentations", "ezekiel", "daniel", "hosea", "joel", "amos", "obadiah", "jonah", "micah",
    "nahum", "habakkuk", "zephaniah", "haggai", "zechariah", "malachi", "matthew", "mark",
    "luke", "john", "acts", "romans", "corinthians", "galatians", "ephesians", "philippians",
    "colossians", "thessalonians", "timothy", "titus", "philemon", "hebrews", "james", "peter",
    "jude", "revelation", "rev",
];

const STUDENT_CHRISTIAN_PROMPT: &str = "\
For each numbered bio below answer **yes** or **no**.
Say **yes** **only** when BOTH of the following are true:
  1. The bio clearly belongs to a *student* (college).
     - clues: \"class of 2027\", \"'28\", \"freshman\", \"senior\", etc.
  2. The bio contains an explicit Christian signal (e.g. Jesus, Christ, a cross glyph, a Bible verse).
All other cases, including churches, ministries, businesses, adults, or students without
Christian references, must be **no**.
Return one space-separated list of yes/no in the same order.";

impl Predicate {
    /// `words` match as lowercase substrings; `whole_words` as whole words
    /// with an optional trailing `'s`/`s`.
    pub fn new(
        words: impl IntoIterator<Item = String>,
        whole_words: &[&str],
        prompt: impl Into<String>,
    ) -> Self {
        let pattern = format!(r"(?i)\b({})(?:'s|s)?\b", whole_words.join("|"));
        Self {
            keywords: words.into_iter().map(|w| w.to_lowercase()).collect(),
            word_pattern: Regex::new(&pattern).expect("predicate word pattern is valid"),
            prompt: prompt.into(),
        }
    }

    /// The default predicate: college student with an explicit Christian
    /// affiliation signal.
    pub fn christian_student() -> Self {
        let words = CHRISTIAN_WORDS
            .iter()
            .chain(QUICK_FLAGS.iter())
            .map(|w| w.to_string());
        Self::new(words, BIBLE_BOOKS, STUDENT_CHRISTIAN_PROMPT)
    }

    /// Local heuristic: does this bio carry a definite signal?
    pub fn matches(&self, bio: &str) -> bool {
        let lc = bio.to_lowercase();
        self.keywords.iter().any(|k| lc.contains(k.as_str())) || self.word_pattern.is_match(&lc)
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

// ---------------------------------------------------------------------------
// BioClassifier
// ---------------------------------------------------------------------------

pub struct BioClassifier {
    agent: Arc<dyn ChatAgent>,
    predicate: Predicate,
}

impl BioClassifier {
    pub fn new(agent: Arc<dyn ChatAgent>, predicate: Predicate) -> Self {
        Self { agent, predicate }
    }

    /// One verdict per record, same order as the input. Never fails: the
    /// semantic tier degrades to the heuristic on any error.
    pub async fn classify(&self, records: &[ProfileRecord]) -> Vec<(String, Verdict)> {
        let mut verdicts: HashMap<&str, Verdict> = HashMap::new();
        let mut unsure: Vec<(&str, String)> = Vec::new();

        for record in records {
            let bio = record.bio.trim();
            if bio.is_empty() {
                verdicts.insert(record.username.as_str(), Verdict::No);
            } else if self.predicate.matches(bio) {
                verdicts.insert(record.username.as_str(), Verdict::Yes);
            } else {
                unsure.push((record.username.as_str(), strip_punctuation(bio)));
            }
        }

        info!(
            total = records.len(),
            definite = verdicts.len(),
            undecided = unsure.len(),
            "Heuristic tier done"
        );

        if !unsure.is_empty() {
            let bios: Vec<&str> = unsure.iter().map(|(_, bio)| bio.as_str()).collect();
            let flags = match self.judge_batch(&bios).await {
                Ok(flags) => flags,
                Err(e) => {
                    warn!(error = %e, count = bios.len(), "Semantic tier failed, keyword fallback");
                    bios.iter()
                        .map(|bio| {
                            if self.predicate.matches(bio) {
                                Verdict::Yes
                            } else {
                                Verdict::No
                            }
                        })
                        .collect()
                }
            };
            for ((username, _), flag) in unsure.iter().zip(flags) {
                verdicts.insert(username, flag);
            }
        }

        records
            .iter()
            .map(|r| {
                let verdict = verdicts
                    .get(r.username.as_str())
                    .copied()
                    .unwrap_or(Verdict::No);
                (r.username.clone(), verdict)
            })
            .collect()
    }

    /// One chat request for the whole undecided batch. The reply contract is
    /// strict: exactly one yes/no token per bio, in order.
    async fn judge_batch(&self, bios: &[&str]) -> anyhow::Result<Vec<Verdict>> {
        let payload = bios
            .iter()
            .enumerate()
            .map(|(i, bio)| format!("{}) {}", i + 1, bio))
            .collect::<Vec<_>>()
            .join("\n");

        debug!(count = bios.len(), "Sending undecided batch to semantic tier");

        let reply = self
            .agent
            .chat(vec![
                Message::system(self.predicate.prompt()),
                Message::user(payload),
            ])
            .await?;

        Ok(parse_reply(&reply, bios.len())?)
    }
}

fn strip_punctuation(bio: &str) -> String {
    bio.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect::<String>()
        .trim()
        .to_string()
}

fn parse_reply(reply: &str, expected: usize) -> Result<Vec<Verdict>, FlocksiftError> {
    let mut flags = Vec::with_capacity(expected);
    for token in reply.split_whitespace() {
        let word = token.trim_matches(|c: char| !c.is_ascii_alphanumeric());
        match word.to_lowercase().as_str() {
            "yes" => flags.push(Verdict::Yes),
            "no" => flags.push(Verdict::No),
            "" => {}
            other => {
                return Err(FlocksiftError::Parse(format!(
                    "unexpected verdict token: {other}"
                )))
            }
        }
    }
    if flags.len() != expected {
        return Err(FlocksiftError::Parse(format!(
            "verdict count mismatch: expected {expected}, got {}",
            flags.len()
        )));
    }
    Ok(flags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockAgent;

    fn records(bios: &[&str]) -> Vec<ProfileRecord> {
        bios.iter()
            .enumerate()
            .map(|(i, bio)| ProfileRecord::new(format!("user{i}"), *bio))
            .collect()
    }

    fn verdicts_of(out: &[(String, Verdict)]) -> Vec<Verdict> {
        out.iter().map(|(_, v)| *v).collect()
    }

    #[tokio::test]
    async fn keyword_bios_never_reach_the_semantic_tier() {
        let agent = Arc::new(MockAgent::replying("no no no"));
        let classifier = BioClassifier::new(agent.clone(), Predicate::christian_student());

        let out = classifier
            .classify(&records(&["Jesus follower", "amen †", "church staff"]))
            .await;

        assert_eq!(
            verdicts_of(&out),
            vec![Verdict::Yes, Verdict::Yes, Verdict::Yes]
        );
        assert_eq!(agent.calls(), 0, "heuristic tier must short-circuit");
    }

    #[tokio::test]
    async fn empty_bios_are_no_unconditionally() {
        let agent = Arc::new(MockAgent::replying("yes"));
        let classifier = BioClassifier::new(agent.clone(), Predicate::christian_student());

        let out = classifier.classify(&records(&["", "   "])).await;

        assert_eq!(verdicts_of(&out), vec![Verdict::No, Verdict::No]);
        assert_eq!(agent.calls(), 0);
    }

    #[tokio::test]
    async fn output_is_aligned_with_input() {
        // Two undecided bios interleaved with definite ones; the scripted
        // reply flips the first and keeps the second.
        let agent = Arc::new(MockAgent::replying("yes no"));
        let classifier = BioClassifier::new(agent.clone(), Predicate::christian_student());

        let input = records(&[
            "worship team lead",
            "senior at state, loves hiking",
            "",
            "just vibes",
        ]);
        let out = classifier.classify(&input).await;

        assert_eq!(out.len(), input.len());
        for (record, (username, _)) in input.iter().zip(&out) {
            assert_eq!(&record.username, username);
        }
        assert_eq!(
            verdicts_of(&out),
            vec![Verdict::Yes, Verdict::Yes, Verdict::No, Verdict::No]
        );
        assert_eq!(agent.calls(), 1, "one batched request for all undecided");
    }

    #[tokio::test]
    async fn transport_failure_falls_back_to_heuristics() {
        let agent = Arc::new(MockAgent::failing("connection refused"));
        let classifier = BioClassifier::new(agent.clone(), Predicate::christian_student());

        let out = classifier
            .classify(&records(&["no signal here", "still nothing"]))
            .await;

        assert_eq!(verdicts_of(&out), vec![Verdict::No, Verdict::No]);
        assert_eq!(agent.calls(), 1);
    }

    #[tokio::test]
    async fn misaligned_reply_falls_back_to_heuristics() {
        // Three tokens for two bios is a contract violation, not a partial
        // answer to guess at.
        let agent = Arc::new(MockAgent::replying("yes no yes"));
        let classifier = BioClassifier::new(agent, Predicate::christian_student());

        let out = classifier
            .classify(&records(&["plain bio one", "plain bio two"]))
            .await;

        assert_eq!(verdicts_of(&out), vec![Verdict::No, Verdict::No]);
    }

    #[tokio::test]
    async fn junk_token_in_reply_falls_back() {
        let agent = Arc::new(MockAgent::replying("yes maybe"));
        let classifier = BioClassifier::new(agent, Predicate::christian_student());

        let out = classifier
            .classify(&records(&["plain bio one", "plain bio two"]))
            .await;

        assert_eq!(verdicts_of(&out), vec![Verdict::No, Verdict::No]);
    }

    #[tokio::test]
    async fn end_to_end_example_verdicts() {
        let agent = Arc::new(MockAgent::replying("no"));
        let classifier = BioClassifier::new(agent.clone(), Predicate::christian_student());

        let out = classifier
            .classify(&records(&[
                "",
                "class of 2027 Jesus is king",
                "local cafe ☕",
                "senior ✝️ go bears",
            ]))
            .await;

        assert_eq!(
            verdicts_of(&out),
            vec![Verdict::No, Verdict::Yes, Verdict::No, Verdict::Yes]
        );
        // Only the cafe bio needed the semantic tier.
        assert_eq!(agent.calls(), 1);

        // Same verdicts when the semantic tier is down.
        let failing = BioClassifier::new(
            Arc::new(MockAgent::failing("boom")),
            Predicate::christian_student(),
        );
        let out = failing
            .classify(&records(&[
                "",
                "class of 2027 Jesus is king",
                "local cafe ☕",
                "senior ✝️ go bears",
            ]))
            .await;
        assert_eq!(
            verdicts_of(&out),
            vec![Verdict::No, Verdict::Yes, Verdict::No, Verdict::Yes]
        );
    }

    #[test]
    fn book_names_match_whole_words_only() {
        let predicate = Predicate::christian_student();
        assert!(predicate.matches("Psalm 23 is my anchor"));
        assert!(predicate.matches("reading John's gospel"));
        assert!(predicate.matches("Romans 8:28"));
        assert!(!predicate.matches("the johnson family bakery"));
        assert!(!predicate.matches("marketing actsually"));
    }

    #[test]
    fn keywords_match_as_substrings() {
        let predicate = Predicate::christian_student();
        assert!(predicate.matches("JESUSFREAK forever"));
        assert!(predicate.matches("born again in 2020"));
        assert!(!predicate.matches("plain coffee enjoyer"));
    }

    #[test]
    fn punctuation_stripping_keeps_words() {
        assert_eq!(strip_punctuation("hey! (agtg) #blessed"), "hey   agtg   blessed");
    }

    #[test]
    fn reply_parser_accepts_markdown_noise() {
        let flags = parse_reply("**yes** no, YES", 3).unwrap();
        assert_eq!(flags, vec![Verdict::Yes, Verdict::No, Verdict::Yes]);
        assert!(parse_reply("yes", 2).is_err());
        assert!(parse_reply("yes dunno", 2).is_err());
    }
}
