//! Keyword intent detection
//!
//! Transfer and hang-up wishes are resolved locally, before any engine
//! round trip, so they still work when the engine is down and they cannot
//! be talked over by a generated reply. Matching is substring-based over
//! the lowercased transcript; callers phrase these things predictably.

const TRANSFER_KEYWORDS: &[&str] = &[
    "conseiller",
    "humain",
    "agent",
    "service client",
    "transfert",
    "parler à quelqu'un",
    "vraie personne",
    "human",
    "transfer",
    "real person",
];

const END_KEYWORDS: &[&str] = &[
    "au revoir",
    "bonne journée",
    "raccrocher",
    "c'est bon merci",
    "c'est tout",
    "terminé",
    "goodbye",
    "bye bye",
    "hang up",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct IntentDetector;

impl IntentDetector {
    pub fn wants_transfer(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        TRANSFER_KEYWORDS.iter().any(|kw| lowered.contains(kw))
    }

    pub fn wants_end(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        END_KEYWORDS.iter().any(|kw| lowered.contains(kw))
    }
}
