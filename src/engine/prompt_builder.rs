use crate::model::context::SharedContext;
use crate::model::turn::{Speaker, Turn};

/// What the speaking agent is asked to do this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleDirective {
    /// Opening turn of the negotiation (A, round 0).
    Propose,
    /// Every later turn.
    RespondAndRefine,
}

impl RoleDirective {
    pub fn for_turn(speaker: Speaker, round: u32) -> Self {
        match (speaker, round) {
            (Speaker::A, 0) => RoleDirective::Propose,
            _ => RoleDirective::RespondAndRefine,
        }
    }
}

/// Builds the prompt for a single negotiation turn.
/// This struct only formats text: no parsing, no networking, no session logic.
///
/// Only the latest opposing message is carried forward, never the whole
/// transcript, so prompt size stays flat across rounds.
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn build(
        context: &SharedContext,
        speaker: Speaker,
        directive: RoleDirective,
        previous: Option<&Turn>,
    ) -> String {
        let mut prompt = String::new();

        push_system_instructions(&mut prompt, context);
        push_shared_goal(&mut prompt, context);
        push_shared_interests(&mut prompt, context);
        if let Some(turn) = previous {
            push_opponent_message(&mut prompt, turn);
        }
        push_directive(&mut prompt, speaker, directive);

        prompt
    }
}

fn push_system_instructions(prompt: &mut String, context: &SharedContext) {
    prompt.push_str(&context.system_instructions);
    prompt.push_str("\n\n");
}

fn push_shared_goal(prompt: &mut String, context: &SharedContext) {
    prompt.push_str("Shared goal: ");
    prompt.push_str(&context.goal);
    prompt.push('\n');
}

fn push_shared_interests(prompt: &mut String, context: &SharedContext) {
    prompt.push_str(&format!(
        "Shared interests: User 1 is interested in {}. User 2 is interested in {}.\n\n",
        context.profile_a, context.profile_b
    ));
}

fn push_opponent_message(prompt: &mut String, turn: &Turn) {
    prompt.push_str(&format!(
        "{} said: {}\n\n",
        turn.speaker.agent_label(),
        turn.response
    ));
}

fn push_directive(prompt: &mut String, speaker: Speaker, directive: RoleDirective) {
    let text = match (speaker, directive) {
        (Speaker::A, RoleDirective::Propose) => "propose a candidate question and rationale.",
        (Speaker::A, RoleDirective::RespondAndRefine) => {
            "propose an improved question and aim for consensus."
        }
        (Speaker::B, _) => "respond and refine toward consensus.",
    };
    prompt.push_str(speaker.agent_label());
    prompt.push_str(", ");
    prompt.push_str(text);
}
