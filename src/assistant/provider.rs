//! Provider-specific URL building and authentication.
//!
//! Azure `OpenAI` serves the Assistants API under `/openai/...` with an
//! `api-version` query parameter and an `api-key` header; `OpenAI` serves it
//! under `/v1/...` with bearer auth and a beta opt-in header.

/// Default Azure API version when none is configured.
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-02-15-preview";

/// Supported assistant service providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    /// `OpenAI` (api.openai.com)
    OpenAI,
    /// Azure `OpenAI` Service
    AzureOpenAI {
        /// API version (e.g., "2024-02-15-preview")
        api_version: String,
    },
}

impl Provider {
    /// Detect provider from the endpoint URL.
    ///
    /// # Example
    ///
    /// ```rust
    /// use opendata_bridge::assistant::Provider;
    ///
    /// let provider = Provider::detect_from_url("https://api.openai.com", "");
    /// assert_eq!(provider, Provider::OpenAI);
    /// ```
    #[must_use]
    pub fn detect_from_url(endpoint: &str, api_version: &str) -> Self {
        let lower = endpoint.to_lowercase();

        if lower.contains("openai.com") && !lower.contains("azure") {
            Self::OpenAI
        } else {
            let api_version = if api_version.trim().is_empty() {
                DEFAULT_AZURE_API_VERSION.to_string()
            } else {
                api_version.to_string()
            };
            Self::AzureOpenAI { api_version }
        }
    }

    /// Build the URL for an API path such as `threads/{id}/runs`.
    #[must_use]
    pub fn build_url(&self, endpoint: &str, path: &str) -> String {
        let base = endpoint.trim_end_matches('/');
        let path = path.trim_start_matches('/');

        match self {
            Self::AzureOpenAI { api_version } => {
                format!("{base}/openai/{path}?api-version={api_version}")
            }
            Self::OpenAI => format!("{base}/v1/{path}"),
        }
    }

    /// Attach authentication and provider headers to a request.
    pub fn authorize(
        &self,
        rb: reqwest::RequestBuilder,
        api_key: &str,
    ) -> reqwest::RequestBuilder {
        match self {
            Self::AzureOpenAI { .. } => rb.header("api-key", api_key),
            Self::OpenAI => rb
                .bearer_auth(api_key)
                .header("OpenAI-Beta", "assistants=v1"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_openai() {
        let provider = Provider::detect_from_url("https://api.openai.com", "");
        assert_eq!(provider, Provider::OpenAI);
    }

    #[test]
    fn test_detect_azure() {
        let provider = Provider::detect_from_url("https://my-resource.openai.azure.com", "");
        assert_eq!(
            provider,
            Provider::AzureOpenAI {
                api_version: DEFAULT_AZURE_API_VERSION.to_string()
            }
        );
    }

    #[test]
    fn test_detect_keeps_configured_version() {
        let provider = Provider::detect_from_url("https://proxy.internal", "2024-05-01-preview");
        assert_eq!(
            provider,
            Provider::AzureOpenAI {
                api_version: "2024-05-01-preview".to_string()
            }
        );
    }

    #[test]
    fn test_build_url_openai() {
        let url = Provider::OpenAI.build_url("https://api.openai.com/", "threads/t1/runs");
        assert_eq!(url, "https://api.openai.com/v1/threads/t1/runs");
    }

    #[test]
    fn test_build_url_azure() {
        let provider = Provider::AzureOpenAI {
            api_version: "2024-02-15-preview".to_string(),
        };
        let url = provider.build_url("https://my-resource.openai.azure.com", "/files");
        assert_eq!(
            url,
            "https://my-resource.openai.azure.com/openai/files?api-version=2024-02-15-preview"
        );
    }
}
