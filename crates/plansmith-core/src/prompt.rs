//! Prompt construction
//!
//! The orchestrator treats prompts as opaque strings produced by a
//! [`PromptBuilder`].

/// One successful model output fed into synthesis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelOutput {
    /// Model that produced the output
    pub model_name: String,
    /// Generated content
    pub content: String,
}

/// Renders prompts for the regular and synthesis passes
pub trait PromptBuilder: Send + Sync {
    /// Prompt sent to every regular model
    fn build(&self, task: &str, context: &str) -> String;

    /// Prompt sent to the synthesis model; `outputs` holds successful models only
    fn build_synthesis(&self, task: &str, outputs: &[ModelOutput]) -> String;
}

const DEFAULT_INSTRUCTIONS: &str = "You are a senior software engineer. \
Produce a concrete, step-by-step technical plan for the task below. \
Reference specific files and functions from the context where relevant, \
call out risks, and list the verification steps.";

const DEFAULT_SYNTHESIS_INSTRUCTIONS: &str = "Several engineers independently \
wrote plans for the same task. Merge them into one consolidated plan: keep \
the strongest ideas, resolve contradictions explicitly, and drop duplicates.";

/// XML-sectioned prompts
#[derive(Debug, Clone)]
pub struct DefaultPromptBuilder {
    instructions: String,
    synthesis_instructions: String,
}

impl Default for DefaultPromptBuilder {
    fn default() -> Self {
        Self {
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            synthesis_instructions: DEFAULT_SYNTHESIS_INSTRUCTIONS.to_string(),
        }
    }
}

impl DefaultPromptBuilder {
    /// Builder with the stock instructions
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the planning instructions
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// Replace the synthesis instructions
    #[must_use]
    pub fn with_synthesis_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.synthesis_instructions = instructions.into();
        self
    }
}

impl PromptBuilder for DefaultPromptBuilder {
    fn build(&self, task: &str, context: &str) -> String {
        let mut prompt = format!(
            "<instructions>\n{}\n</instructions>\n\n<task>\n{}\n</task>\n",
            self.instructions,
            task.trim()
        );
        if !context.trim().is_empty() {
            prompt.push_str(&format!("\n<context>\n{}\n</context>\n", context.trim_end()));
        }
        prompt
    }

    fn build_synthesis(&self, task: &str, outputs: &[ModelOutput]) -> String {
        let mut prompt = format!(
            "<instructions>\n{}\n</instructions>\n\n<task>\n{}\n</task>\n\n<model_outputs>\n",
            self.synthesis_instructions,
            task.trim()
        );
        for output in outputs {
            prompt.push_str(&format!(
                "<output model=\"{}\">\n{}\n</output>\n",
                output.model_name,
                output.content.trim()
            ));
        }
        prompt.push_str("</model_outputs>\n");
        prompt
    }
}
