//! Short code generation and validation of caller-supplied codes.

use crate::error::{LinkError, LinkResult};
use rand::distr::Alphanumeric;
use rand::Rng;
use regex::Regex;
use std::sync::LazyLock;

pub const CODE_LENGTH: usize = 6;
pub const MAX_CUSTOM_CODE_LENGTH: usize = 32;

/// Paths the router serves itself; a link under one of these would never redirect.
pub const RESERVED_CODES: &[&str] = &["health", "shorten", "shorturls"];

static CUSTOM_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]{1,32}$").expect("custom code pattern is valid")
});

/// Draws a fresh code from the thread-local RNG. Uniqueness is the store's job.
pub fn generate() -> String {
    generate_with(&mut rand::rng(), CODE_LENGTH)
}

pub fn generate_with<R: Rng>(rng: &mut R, len: usize) -> String {
    first_unreserved(|| (0..len).map(|_| rng.sample(Alphanumeric) as char).collect())
}

fn first_unreserved(mut draw: impl FnMut() -> String) -> String {
    loop {
        let code = draw();
        if !is_reserved(&code) {
            return code;
        }
    }
}

pub fn is_reserved(code: &str) -> bool {
    RESERVED_CODES.contains(&code)
}

pub fn validate_custom_code(code: &str) -> LinkResult<()> {
    if CUSTOM_CODE.is_match(code) && !is_reserved(code) {
        Ok(())
    } else {
        Err(LinkError::InvalidCode(code.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_generate_length_and_alphabet() {
        for _ in 0..200 {
            let code = generate();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn test_generate_with_seeded_rng_is_deterministic() {
        let a = generate_with(&mut StdRng::seed_from_u64(7), 12);
        let b = generate_with(&mut StdRng::seed_from_u64(7), 12);
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
    }

    #[test]
    fn test_generated_codes_use_all_character_classes() {
        let mut rng = StdRng::seed_from_u64(42);
        let sample = generate_with(&mut rng, 2_000);
        assert!(sample.chars().any(|c| c.is_ascii_lowercase()));
        assert!(sample.chars().any(|c| c.is_ascii_uppercase()));
        assert!(sample.chars().any(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_validate_custom_code() {
        assert_ok!(validate_custom_code("abc123"));
        assert_ok!(validate_custom_code("Z"));
        assert_ok!(validate_custom_code(&"a".repeat(MAX_CUSTOM_CODE_LENGTH)));

        assert_err!(validate_custom_code(""));
        assert_err!(validate_custom_code("has space"));
        assert_err!(validate_custom_code("dash-ed"));
        assert_err!(validate_custom_code("ünï"));
        assert_err!(validate_custom_code(&"a".repeat(MAX_CUSTOM_CODE_LENGTH + 1)));
    }

    #[test]
    fn test_reserved_codes_rejected() {
        for reserved in RESERVED_CODES {
            assert_eq!(
                assert_err!(validate_custom_code(reserved)),
                LinkError::InvalidCode(reserved.to_string())
            );
        }
        // Route matching is case-sensitive, so other spellings stay usable.
        assert_ok!(validate_custom_code("Health"));
    }

    #[test]
    fn test_generate_redraws_reserved_codes() {
        let mut draws = vec!["health", "abc123"].into_iter();
        let code = first_unreserved(|| draws.next().unwrap().to_string());
        assert_eq!(code, "abc123");

        for _ in 0..500 {
            assert!(!is_reserved(&generate()));
        }
    }
}
