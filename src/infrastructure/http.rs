//! Shared HTTP plumbing for the outbound adapters

use std::time::Duration;

use crate::error::BatonResult;

const ATTEMPTS: u32 = 3;

pub(crate) fn client() -> BatonResult<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?)
}

/// GET with up to three attempts before the error propagates.
pub(crate) fn get_json_with_retries(
    client: &reqwest::blocking::Client,
    url: &str,
    bearer: Option<&str>,
) -> BatonResult<serde_json::Value> {
    let mut tries = 0;
    loop {
        let mut request = client.get(url);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let attempt = request
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.json::<serde_json::Value>());

        match attempt {
            Ok(value) => return Ok(value),
            Err(err) => {
                tries += 1;
                if tries == ATTEMPTS {
                    return Err(err.into());
                }
                tracing::warn!(url, error = %err, "fetch failed, retrying");
            }
        }
    }
}
