//! Bounded, process-wide log of exchanges shown on the page.

use std::collections::VecDeque;

use serde::Serialize;

use crate::engine::Completion;
use crate::model::GenerationOutcome;

/// Default number of entries kept before the oldest is evicted.
pub const DEFAULT_LOG_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversationEntry {
    Exchange { prompt: String, output: String },
    Debug { rendered_prompt: String, raw: Completion },
    Notice { message: String },
}

impl From<GenerationOutcome> for ConversationEntry {
    fn from(outcome: GenerationOutcome) -> Self {
        match outcome {
            GenerationOutcome::Text {
                prompt,
                continuation,
            } => Self::Exchange {
                prompt,
                output: continuation,
            },
            GenerationOutcome::Debug {
                rendered_prompt,
                raw,
            } => Self::Debug {
                rendered_prompt,
                raw,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConversationLog {
    entries: VecDeque<ConversationEntry>,
    /// 0 = unbounded.
    capacity: usize,
}

impl Default for ConversationLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl ConversationLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, entry: impl Into<ConversationEntry>) {
        if self.capacity > 0 && self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry.into());
    }

    pub fn notice(&mut self, message: impl Into<String>) {
        self.push(ConversationEntry::Notice {
            message: message.into(),
        });
    }

    /// Newest first.
    pub fn recent(&self) -> impl Iterator<Item = &ConversationEntry> {
        self.entries.iter().rev()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange(n: usize) -> ConversationEntry {
        ConversationEntry::Exchange {
            prompt: format!("p{n}"),
            output: format!("o{n}"),
        }
    }

    #[test]
    fn recent_is_newest_first() {
        let mut log = ConversationLog::with_capacity(0);
        log.push(exchange(1));
        log.notice("No model selected!");
        log.push(exchange(2));

        let got: Vec<_> = log.recent().cloned().collect();
        assert_eq!(
            got,
            vec![
                exchange(2),
                ConversationEntry::Notice {
                    message: "No model selected!".into()
                },
                exchange(1),
            ]
        );
    }

    #[test]
    fn capacity_evicts_oldest() {
        let mut log = ConversationLog::with_capacity(2);
        for n in 0..5 {
            log.push(exchange(n));
        }
        assert_eq!(log.len(), 2);
        let got: Vec<_> = log.recent().cloned().collect();
        assert_eq!(got, vec![exchange(4), exchange(3)]);
    }

    #[test]
    fn zero_capacity_is_unbounded() {
        let mut log = ConversationLog::with_capacity(0);
        for n in 0..500 {
            log.push(exchange(n));
        }
        assert_eq!(log.len(), 500);
    }

    #[test]
    fn outcomes_convert_to_entries() {
        let entry: ConversationEntry = GenerationOutcome::Text {
            prompt: "hi".into(),
            continuation: " there".into(),
        }
        .into();
        assert_eq!(
            entry,
            ConversationEntry::Exchange {
                prompt: "hi".into(),
                output: " there".into()
            }
        );
    }
}
