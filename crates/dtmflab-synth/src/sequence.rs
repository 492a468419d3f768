use dtmflab_detect::keypad::key_position;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    #[error("empty key sequence")]
    Empty,
    #[error("unknown DTMF key {key:?} at position {position}")]
    UnknownKey { key: char, position: usize },
}

/// Parse a keypad sequence such as `"911"` or `"*0#"` into uppercase symbols.
pub fn parse_sequence(text: &str) -> Result<Vec<char>, SequenceError> {
    if text.is_empty() {
        return Err(SequenceError::Empty);
    }

    text.chars()
        .enumerate()
        .map(|(position, key)| match key_position(key) {
            Some(_) => Ok(key.to_ascii_uppercase()),
            None => Err(SequenceError::UnknownKey { key, position }),
        })
        .collect()
}
