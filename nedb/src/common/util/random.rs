use rand::distributions::Alphanumeric;
use rand::Rng;

/// Uniformly random alphanumeric string of `len` characters.
pub fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_string_length() {
        for len in [0, 1, 16, 29] {
            assert_eq!(random_string(len).chars().count(), len);
        }
    }

    #[test]
    fn test_random_string_is_alphanumeric() {
        assert!(random_string(64).chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_random_strings_differ() {
        assert_ne!(random_string(16), random_string(16));
    }
}
