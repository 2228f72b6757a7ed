use tradedesk_models::state::AgentState;
use tradedesk_models::transcript::{Message, Role};

/// Whether `message` is a final answer authored by `agent_name`.
///
/// Tool results, user turns and assistant turns that only request tools are
/// internal to the reasoning loop. Assistant messages tagged with another
/// agent's name are not attributable to this one.
fn is_final_answer(message: &Message, agent_name: &str) -> bool {
    message.role == Role::Assistant
        && message.tool_calls.is_empty()
        && message.text().is_some()
        && message
            .name
            .as_deref()
            .map_or(true, |name| name == agent_name)
}

/// The last assistant-authored answer in a transcript, if there is one.
pub fn final_output(messages: &[Message], agent_name: &str) -> Option<String> {
    messages
        .iter()
        .rev()
        .find(|m| is_final_answer(m, agent_name))
        .and_then(Message::text)
        .map(str::to_string)
}

/// Distill a reasoning transcript into an [`AgentState`].
///
/// Never fails: a transcript without a final answer yields `agent_output: None`
/// and the caller decides what that means.
pub fn build_agent_state(messages: Vec<Message>, agent_name: &str) -> AgentState {
    let agent_output = final_output(&messages, agent_name);
    AgentState {
        agent_name: agent_name.to_string(),
        messages,
        agent_output,
    }
}
