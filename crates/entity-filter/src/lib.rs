//! Content-safety filter: a pure function gating outbound text against a
//! denylist. No I/O, no async — `agent::core_loop` calls `filter`
//! synchronously before any outbound dispatch.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockCategory {
    HateSlurs,
    SexualMinors,
    ExplicitPornography,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    Allow,
    Block(BlockCategory),
}

impl FilterOutcome {
    pub fn is_blocked(&self) -> bool {
        matches!(self, FilterOutcome::Block(_))
    }
}

struct Entry {
    category: BlockCategory,
    normalized: &'static str,
}

/// Denylist of normalized substrings. Kept short and explicit rather
/// than pulled from an external list, since the categories this gates
/// are fixed and few (spec §4.7): slurs/hate, sexual content involving
/// minors, explicit pornography.
const DENYLIST: &[Entry] = &[
    Entry {
        category: BlockCategory::HateSlurs,
        normalized: "nigger",
    },
    Entry {
        category: BlockCategory::HateSlurs,
        normalized: "kike",
    },
    Entry {
        category: BlockCategory::HateSlurs,
        normalized: "chink",
    },
    Entry {
        category: BlockCategory::HateSlurs,
        normalized: "faggot",
    },
    Entry {
        category: BlockCategory::SexualMinors,
        normalized: "child porn",
    },
    Entry {
        category: BlockCategory::SexualMinors,
        normalized: "cp of kids",
    },
    Entry {
        category: BlockCategory::ExplicitPornography,
        normalized: "explicit porn",
    },
    Entry {
        category: BlockCategory::ExplicitPornography,
        normalized: "hardcore porn",
    },
];

/// Normalize text the way the denylist entries are written: lowercase,
/// collapse whitespace runs, and fold a small set of leet substitutions
/// back to their letter so `n1gger`/`f4ggot`-style evasions still match.
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for ch in text.chars() {
        let mapped = match ch.to_ascii_lowercase() {
            '0' => 'o',
            '1' => 'i',
            '3' => 'e',
            '4' => 'a',
            '5' => 's',
            '7' => 't',
            '@' => 'a',
            '$' => 's',
            c => c,
        };
        if mapped.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            out.push(mapped);
            last_was_space = false;
        }
    }
    out.trim().to_string()
}

/// Gate a piece of outbound text. A block is a hard stop at dispatch;
/// callers must record the attempt as a `blocked` activity event
/// without the raw text and drop the action.
pub fn filter(text: &str) -> FilterOutcome {
    let normalized = normalize(text);
    for entry in DENYLIST {
        if normalized.contains(entry.normalized) {
            return FilterOutcome::Block(entry.category);
        }
    }
    FilterOutcome::Allow
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_is_allowed() {
        assert_eq!(filter("the weather is nice today"), FilterOutcome::Allow);
    }

    #[test]
    fn slur_is_blocked() {
        assert_eq!(
            filter("you are a faggot"),
            FilterOutcome::Block(BlockCategory::HateSlurs)
        );
    }

    #[test]
    fn leet_substitution_is_caught() {
        assert_eq!(
            filter("f4gg0t"),
            FilterOutcome::Block(BlockCategory::HateSlurs)
        );
    }

    #[test]
    fn whitespace_padded_variant_is_caught() {
        assert_eq!(
            filter("that's   hardcore   porn right there"),
            FilterOutcome::Block(BlockCategory::ExplicitPornography)
        );
    }
}
