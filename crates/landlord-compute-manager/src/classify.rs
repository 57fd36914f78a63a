/// Result of classifying a raw provider error string into a stable code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedError {
    pub code: &'static str,
    pub message: String,
    pub is_retriable: bool,
    pub provider_error: String,
}

/// `MapProviderErrorToComputeError`: classifies a provider's raw error text
/// by substring match. Order matters — first match wins.
pub fn classify_provider_error(provider_error: impl Into<String>) -> ClassifiedError {
    let provider_error = provider_error.into();
    let lower = provider_error.to_ascii_lowercase();

    let (code, is_retriable) = if lower.contains("timeout") || lower.contains("deadline exceeded") {
        ("PROVIDER_TIMEOUT", true)
    } else if lower.contains("unavailable") {
        ("PROVIDER_UNAVAILABLE", true)
    } else if lower.contains("exhausted") || lower.contains("quota") {
        ("RESOURCE_EXHAUSTED", true)
    } else if lower.contains("invalid") {
        ("INVALID_CONFIGURATION", false)
    } else if lower.contains("not found") {
        ("RESOURCE_NOT_FOUND", false)
    } else {
        ("UNKNOWN_ERROR", false)
    };

    ClassifiedError {
        code,
        message: provider_error.clone(),
        is_retriable,
        provider_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_retriable() {
        let c = classify_provider_error("request timeout after 30s");
        assert_eq!(c.code, "PROVIDER_TIMEOUT");
        assert!(c.is_retriable);
    }

    #[test]
    fn deadline_exceeded_classifies_as_timeout() {
        assert_eq!(classify_provider_error("context deadline exceeded").code, "PROVIDER_TIMEOUT");
    }

    #[test]
    fn quota_and_exhausted_are_resource_exhausted() {
        assert_eq!(classify_provider_error("quota exceeded for project").code, "RESOURCE_EXHAUSTED");
        assert_eq!(classify_provider_error("resource pool exhausted").code, "RESOURCE_EXHAUSTED");
    }

    #[test]
    fn invalid_is_non_retriable() {
        let c = classify_provider_error("invalid container image reference");
        assert_eq!(c.code, "INVALID_CONFIGURATION");
        assert!(!c.is_retriable);
    }

    #[test]
    fn not_found_is_non_retriable() {
        let c = classify_provider_error("tenant not found");
        assert_eq!(c.code, "RESOURCE_NOT_FOUND");
        assert!(!c.is_retriable);
    }

    #[test]
    fn unrecognized_text_is_unknown_and_non_retriable() {
        let c = classify_provider_error("something went sideways");
        assert_eq!(c.code, "UNKNOWN_ERROR");
        assert!(!c.is_retriable);
    }

    #[test]
    fn timeout_takes_priority_over_later_matches() {
        // Contains both "timeout" and "invalid" — timeout must win (checked first).
        let c = classify_provider_error("invalid request: client timeout");
        assert_eq!(c.code, "PROVIDER_TIMEOUT");
    }
}
