use super::*;

#[test]
fn test_error_display() {
    let err = ProviderError::Transport("connection refused".to_string());
    assert_eq!(err.to_string(), "transport error: connection refused");

    let err = ProviderError::AuthenticationFailed("invalid key".to_string());
    assert_eq!(err.to_string(), "authentication failed: invalid key");

    let err = ProviderError::Api {
        code: "invalid_api_key".to_string(),
        message: "The API key is invalid".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "provider error: invalid_api_key: The API key is invalid"
    );

    let err = ProviderError::RateLimited {
        message: "too many requests".to_string(),
        retry_after: Some(Duration::from_secs(5)),
    };
    assert_eq!(err.to_string(), "rate limited: too many requests");
}

#[test]
fn test_retryable_classification() {
    let retryable = [
        ProviderError::RateLimited {
            message: "429".into(),
            retry_after: None,
        },
        ProviderError::RateLimited {
            message: "429".into(),
            retry_after: Some(Duration::from_secs(1)),
        },
        ProviderError::Transport("timeout".into()),
    ];
    for err in retryable {
        assert!(err.is_retryable(), "Should be retryable: {err:?}");
    }

    let fatal = [
        ProviderError::InvalidRequest("bad params".into()),
        ProviderError::AuthenticationFailed("auth".into()),
        ProviderError::ContextWindowExceeded("too long".into()),
        ProviderError::Api {
            code: "500".into(),
            message: "internal".into(),
        },
        ProviderError::Parse("invalid json".into()),
        ProviderError::Internal("bug".into()),
    ];
    for err in fatal {
        assert!(!err.is_retryable(), "Should NOT be retryable: {err:?}");
    }
}

#[test]
fn test_retry_delay() {
    let err = ProviderError::RateLimited {
        message: "try again".to_string(),
        retry_after: Some(Duration::from_secs(5)),
    };
    assert_eq!(err.retry_delay(), Some(Duration::from_secs(5)));

    let err_no_delay = ProviderError::RateLimited {
        message: "try again".to_string(),
        retry_after: None,
    };
    assert_eq!(err_no_delay.retry_delay(), None);

    let other_err = ProviderError::Transport("timeout".to_string());
    assert_eq!(other_err.retry_delay(), None);
}

#[test]
fn test_error_from_serde_json() {
    let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
    let err: ProviderError = json_err.into();
    assert!(matches!(err, ProviderError::Parse(_)));
    assert!(err.to_string().contains("parse error"));
}

#[test]
fn test_context_window_exceeded_not_retryable() {
    // Context window errors need a smaller input, not another attempt
    let err = ProviderError::ContextWindowExceeded("max 128k tokens".into());
    assert!(!err.is_retryable());
}
