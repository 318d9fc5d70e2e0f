use super::types::RagContext;
use crate::models::ChatTurn;

pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a personal wellness assistant. You help the user understand their own activity, sleep, nutrition, body and lab data. You are NOT a doctor.

RULES:
1. Ground statements about the user in the HEALTH_CONTEXT block when one is provided.
2. Quote the actual numbers and dates from the context; never invent values.
3. If the context says no data is available, tell the user and suggest syncing their devices or uploading records.
4. Do not diagnose or prescribe. For concerning values, suggest discussing them with a healthcare provider.
5. Keep answers short, friendly and specific."#;

const CONTEXT_OPEN: &str = "<HEALTH_CONTEXT>";
const CONTEXT_CLOSE: &str = "</HEALTH_CONTEXT>";

/// Assemble the final generation prompt.
///
/// Sections, in order: system prompt, the health-context block (only when
/// `context.has_health_data`), prior turns as `role: content` lines, then the
/// current message. History is used as given; callers bound its length.
pub fn build_chat_prompt(
    system_prompt: &str,
    context: &RagContext,
    history: &[ChatTurn],
    current_message: &str,
) -> String {
    let mut prompt = String::new();

    prompt.push_str(system_prompt.trim_end());
    prompt.push_str("\n\n");

    if context.has_health_data {
        prompt.push_str(CONTEXT_OPEN);
        prompt.push('\n');
        prompt.push_str(context.health_context.trim_end());
        prompt.push('\n');
        prompt.push_str(CONTEXT_CLOSE);
        prompt.push_str("\n\n");
    }

    for turn in history {
        prompt.push_str(&format!("{}: {}\n", turn.role, turn.content));
    }

    prompt.push_str(&format!("user: {current_message}"));
    prompt
}
