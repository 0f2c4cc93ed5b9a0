//! Checks for user-supplied keys and values
//!
//! The flattened string has no escaping, so a key containing `:` or a value
//! containing the separator would not read back as written. Such input is
//! refused up front rather than encoded.

use crate::codec::SEPARATOR;
use crate::error::InputError;
use crate::rule::Rule;

/// Validate a proposed key, returning it trimmed
///
/// # Errors
/// - `InputError::EmptyKey` if nothing is left after trimming
/// - `InputError::KeyContainsColon` / `InputError::KeyContainsNewline` if it
///   would not survive a parse
pub fn validate_key(raw: &str) -> Result<String, InputError> {
    let key = raw.trim();
    if key.is_empty() {
        return Err(InputError::EmptyKey);
    }
    if key.contains(':') {
        return Err(InputError::KeyContainsColon(key.to_string()));
    }
    if key.contains(['\n', '\r']) {
        return Err(InputError::KeyContainsNewline(key.to_string()));
    }
    Ok(key.to_string())
}

/// Validate a value for `key`
///
/// # Errors
/// `InputError::ValueContainsSeparator` if the value holds the entry separator
pub fn validate_value(key: &str, value: &str) -> Result<(), InputError> {
    if value.contains(SEPARATOR) {
        return Err(InputError::ValueContainsSeparator {
            key: key.to_string(),
        });
    }
    Ok(())
}

/// Ensure `key` is not used by any rule other than `except_id`
///
/// # Errors
/// `InputError::DuplicateKey` if another rule already has the key
pub fn ensure_unique_key(
    rules: &[Rule],
    key: &str,
    except_id: Option<i64>,
) -> Result<(), InputError> {
    let taken = rules
        .iter()
        .any(|r| r.key == key && Some(r.id) != except_id);
    if taken {
        Err(InputError::DuplicateKey(key.to_string()))
    } else {
        Ok(())
    }
}

/// Validator for prompts that require some text
#[inline]
#[must_use]
pub fn non_empty(text: &str) -> bool {
    !text.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_trimmed() {
        assert_eq!(validate_key("  greeting ").unwrap(), "greeting");
    }

    #[test]
    fn key_rejections() {
        assert_eq!(validate_key("   "), Err(InputError::EmptyKey));
        assert!(matches!(validate_key("a:b"), Err(InputError::KeyContainsColon(_))));
        assert!(matches!(validate_key("a\nb"), Err(InputError::KeyContainsNewline(_))));
    }

    #[test]
    fn value_may_hold_short_newline_runs() {
        assert!(validate_value("k", "a\n\n\nb").is_ok());
        assert!(validate_value("k", "a\n\n\n\nb").is_err());
    }

    #[test]
    fn unique_key_ignores_edited_rule() {
        let rules = vec![Rule::new(1, "a"), Rule::new(2, "b")];
        assert!(ensure_unique_key(&rules, "a", Some(1)).is_ok());
        assert_eq!(
            ensure_unique_key(&rules, "a", Some(2)),
            Err(InputError::DuplicateKey("a".to_string()))
        );
        assert!(ensure_unique_key(&rules, "c", None).is_ok());
    }

    #[test]
    fn non_empty_validator() {
        assert!(non_empty("x"));
        assert!(!non_empty(" \t"));
    }
}
