use crate::core::konst::MAX_NAME_LENGTH;

/// Split one line of an input file into hostname tokens.
pub fn hostname_tokens(line: &str) -> impl Iterator<Item = &str> {
    line.split_whitespace()
}

/// Whether `token` fits in a queue slot. Longer tokens are skipped whole,
/// not split into `MAX_NAME_LENGTH` byte pieces.
pub fn valid_hostname_len(token: &str) -> bool {
    !token.is_empty() && token.len() <= MAX_NAME_LENGTH
}
