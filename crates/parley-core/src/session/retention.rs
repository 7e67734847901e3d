//! History retention

use crate::llm::Message;

/// Keep the first message and the last `max_messages` of the rest
pub fn apply_retention(mut history: Vec<Message>, max_messages: usize) -> Vec<Message> {
    if history.len() <= max_messages + 1 {
        return history;
    }
    let cut = history.len() - max_messages;
    history.drain(1..cut);
    history
}
