use anyhow::{Context, Result};
use reqwest::{Client, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use std::time::Duration;

/// Builds the shared HTTP client: exponential-backoff retries (max 3)
/// on transient failures, conservative timeouts.
pub fn retrying_client() -> ClientWithMiddleware {
    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);

    let client = Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_else(|_| Client::new());

    ClientBuilder::new(client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build()
}

/// Parses `base_url` and appends percent-encoded query parameters.
/// reqwest-middleware does not expose reqwest's `.query()`, so the URL
/// is finalized before the request is built.
pub fn url_with_query<'a, I>(base_url: &str, params: I) -> Result<Url>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    Url::parse_with_params(base_url, params)
        .with_context(|| format!("Invalid request URL: {}", base_url))
}
