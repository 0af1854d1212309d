//! Token accounting per generation phase.

use serde::{Deserialize, Serialize};

/// The generation phases tracked for token and cost accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Questions,
    Draft,
    Outline,
    Chapters,
    Critique,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Questions => "questions",
            Phase::Draft => "draft",
            Phase::Outline => "outline",
            Phase::Chapters => "chapters",
            Phase::Critique => "critique",
        }
    }
}

/// Usage reported by a single LLM call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub model: String,
}

/// Accumulated usage for one phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PhaseUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub model: Option<String>,
    /// Call counter, kept only for the multi-call phases (draft, chapters).
    pub calls: Option<u64>,
}

/// Grand totals across phases.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TotalUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Token usage document stored on the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TokenUsage {
    pub questions: PhaseUsage,
    pub draft: PhaseUsage,
    pub outline: PhaseUsage,
    pub chapters: PhaseUsage,
    pub critique: PhaseUsage,
    pub total: TotalUsage,
}

impl Default for TokenUsage {
    fn default() -> Self {
        Self {
            questions: PhaseUsage::default(),
            draft: PhaseUsage {
                calls: Some(0),
                ..PhaseUsage::default()
            },
            outline: PhaseUsage::default(),
            chapters: PhaseUsage {
                calls: Some(0),
                ..PhaseUsage::default()
            },
            critique: PhaseUsage::default(),
            total: TotalUsage::default(),
        }
    }
}

impl TokenUsage {
    pub fn phase(&self, phase: Phase) -> &PhaseUsage {
        match phase {
            Phase::Questions => &self.questions,
            Phase::Draft => &self.draft,
            Phase::Outline => &self.outline,
            Phase::Chapters => &self.chapters,
            Phase::Critique => &self.critique,
        }
    }

    fn phase_mut(&mut self, phase: Phase) -> &mut PhaseUsage {
        match phase {
            Phase::Questions => &mut self.questions,
            Phase::Draft => &mut self.draft,
            Phase::Outline => &mut self.outline,
            Phase::Chapters => &mut self.chapters,
            Phase::Critique => &mut self.critique,
        }
    }

    /// Accumulates one call into a phase: token counts add up, the model
    /// name is overwritten, the call counter bumps for draft/chapters,
    /// and the grand total follows.
    pub fn record(&mut self, phase: Phase, input_tokens: u64, output_tokens: u64, model: &str) {
        let entry = self.phase_mut(phase);
        entry.input_tokens += input_tokens;
        entry.output_tokens += output_tokens;
        entry.model = Some(model.to_string());
        if matches!(phase, Phase::Draft | Phase::Chapters) {
            entry.calls = Some(entry.calls.unwrap_or(0) + 1);
        }
        self.total.input_tokens += input_tokens;
        self.total.output_tokens += output_tokens;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_accumulates_and_counts_calls() {
        let mut usage = TokenUsage::default();
        usage.record(Phase::Chapters, 100, 50, "gemini-2.5-flash");
        usage.record(Phase::Chapters, 200, 70, "gemini-2.5-flash");
        usage.record(Phase::Outline, 10, 5, "gemini-3-pro-preview");

        assert_eq!(usage.chapters.input_tokens, 300);
        assert_eq!(usage.chapters.output_tokens, 120);
        assert_eq!(usage.chapters.calls, Some(2));
        assert_eq!(usage.outline.calls, None);
        assert_eq!(usage.total.input_tokens, 310);
        assert_eq!(usage.total.output_tokens, 125);
    }
}
