// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Display form of card numbers.

const MIN_MASKABLE_LEN: usize = 12;

/// Mask a plaintext card number down to its last four digits.
///
/// Inputs shorter than 12 characters are returned unchanged.
pub fn mask(card_number: &str) -> String {
    let chars: Vec<char> = card_number.chars().collect();
    if chars.len() < MIN_MASKABLE_LEN {
        return card_number.to_string();
    }
    let last4: String = chars[chars.len() - 4..].iter().collect();
    format!("**** **** **** {last4}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_sixteen_digit_number() {
        assert_eq!(mask("4111111111111234"), "**** **** **** 1234");
    }

    #[test]
    fn short_input_passes_through() {
        assert_eq!(mask("123"), "123");
        assert_eq!(mask(""), "");
        assert_eq!(mask("12345678901"), "12345678901");
    }

    #[test]
    fn twelve_characters_is_masked() {
        assert_eq!(mask("123456789012"), "**** **** **** 9012");
    }
}
