/// Protocol token an agent emits once both sides agree.
pub const CONSENSUS_MARKER: &str = "CONSENSUS:";

/// Extracts the agreed question from an agent response.
///
/// Only the first marker counts. Everything after it, including any later
/// marker, is kept and trimmed. No check is made that the text is a question.
pub fn parse_consensus(response: &str) -> Option<String> {
    let (_, rest) = response.split_once(CONSENSUS_MARKER)?;
    Some(rest.trim().to_string())
}
