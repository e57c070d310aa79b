//! Few-shot prompt assembly from historical outcomes.
//!
//! Examples are annotated with what *actually* happened — the resolving
//! department, resolution time, satisfaction, and whether the AI call
//! made at the time turned out right. Prior predictions themselves are
//! deliberately absent: the model learns from ground truth, not from
//! earlier guesses.

use ticketwise_core::{IndexMatch, Ticket};
use uuid::Uuid;

/// A fully assembled routing prompt.
#[derive(Debug, Clone)]
pub struct RoutingPrompt {
    /// Audit id tying the decision back to this exact prompt.
    pub prompt_id: String,
    pub system: String,
    pub user: String,
}

/// Builds routing prompts.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    /// Assemble the prompt for one ticket.
    ///
    /// `examples` must already be ordered by similarity descending (the
    /// similarity stage's ranking is reused); `top_k` bounds how many are
    /// embedded. An empty department list means the model may answer
    /// freely.
    pub fn build(
        &self,
        ticket: &Ticket,
        examples: &[IndexMatch],
        departments: &[String],
        top_k: usize,
    ) -> RoutingPrompt {
        let mut system = String::from(
            "You are a support ticket routing engine. Given a new ticket and the \
             actual outcomes of similar past tickets, choose the department that \
             should handle it.\n\
             Respond with a single JSON object and nothing else:\n\
             {\"department\": \"<name>\", \"confidence\": <0.0-1.0>, \"rationale\": \"<one sentence>\"}",
        );
        if !departments.is_empty() {
            system.push_str("\nValid departments: ");
            system.push_str(&departments.join(", "));
        }

        let mut user = String::new();
        for (i, example) in examples.iter().take(top_k).enumerate() {
            let record = &example.record;
            user.push_str(&format!(
                "Example {n} (similarity {similarity:.2}):\n\
                 - resolved by: {department}\n\
                 - resolution time: {hours:.1}h\n\
                 - customer satisfaction: {satisfaction}/5\n\
                 - prior AI prediction correct: {correct}\n\n",
                n = i + 1,
                similarity = example.similarity,
                department = record.actual_department,
                hours = record.resolution_time_hours,
                satisfaction = record.satisfaction,
                correct = if record.prior_prediction_correct { "yes" } else { "no" },
            ));
        }

        user.push_str("New ticket:\n");
        user.push_str(&ticket.text);

        RoutingPrompt {
            prompt_id: Uuid::new_v4().to_string(),
            system,
            user,
        }
    }
}
