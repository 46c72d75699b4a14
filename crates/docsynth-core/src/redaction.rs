/// Mask an API key, keeping a short prefix so operators can tell keys apart.
pub fn redact_secret(secret: &str) -> String {
    let trimmed = secret.trim();
    if trimmed.chars().count() <= 8 {
        return "***".to_string();
    }
    let prefix: String = trimmed.chars().take(4).collect();
    format!("{prefix}***")
}

/// Redact credentials from an endpoint URL (userinfo and sensitive query params).
pub fn redact_url(url: &str) -> String {
    let mut redacted = url.to_string();

    if let Some(scheme_end) = url.find("://") {
        let authority_start = scheme_end + 3;
        let authority_end = url[authority_start..]
            .find(['/', '?'])
            .map(|idx| authority_start + idx)
            .unwrap_or(url.len());
        if let Some(at_idx) = url[authority_start..authority_end].rfind('@') {
            redacted.replace_range(authority_start..authority_start + at_idx, "***");
        }
    }

    redact_query_params(&redacted)
}

fn redact_query_params(url: &str) -> String {
    let Some(query_start) = url.find('?') else {
        return url.to_string();
    };

    let (base, query) = url.split_at(query_start + 1);
    let mut redacted_params = Vec::new();

    for pair in query.split('&') {
        let mut iter = pair.splitn(2, '=');
        let key = iter.next().unwrap_or("");
        let value = iter.next().unwrap_or("");
        if is_sensitive_key(key) {
            redacted_params.push(format!("{key}=***"));
        } else if value.is_empty() {
            redacted_params.push(key.to_string());
        } else {
            redacted_params.push(format!("{key}={value}"));
        }
    }

    format!("{base}{}", redacted_params.join("&"))
}

fn is_sensitive_key(key: &str) -> bool {
    matches!(
        key.to_lowercase().as_str(),
        "key" | "password" | "pass" | "token" | "api_key" | "apikey" | "access_token"
    )
}
