use std::time::Duration;

use reqwest::{Client, StatusCode, Url, header::HeaderMap};
use serde::de::DeserializeOwned;

use crate::prelude::*;

#[derive(Debug, thiserror::Error)]
pub enum ExternalFetchError {
    #[error("`{url}` responded with {status}")]
    Status { url: Url, status: StatusCode },

    #[error("failed to fetch `{url}`")]
    Transport {
        url: Url,

        #[source]
        source: reqwest::Error,
    },

    #[error("failed to decode the response of `{url}`")]
    Decode {
        url: Url,

        #[source]
        source: reqwest::Error,
    },
}

/// Build a default client.
pub fn try_new(default_headers: HeaderMap) -> Result<Client> {
    Ok(Client::builder().timeout(Duration::from_secs(10)).default_headers(default_headers).build()?)
}

/// Fetch and deserialize the JSON document, treating any non-success status as an error.
#[instrument(skip_all, level = "debug", fields(url = %url))]
pub async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: Url,
    query: &[(&str, String)],
) -> Result<T, ExternalFetchError> {
    debug!("fetching…");
    let response = client
        .get(url.clone())
        .query(query)
        .send()
        .await
        .map_err(|source| ExternalFetchError::Transport { url: url.clone(), source })?;
    let status = response.status();
    if !status.is_success() {
        return Err(ExternalFetchError::Status { url, status });
    }
    response.json().await.map_err(|source| ExternalFetchError::Decode { url, source })
}

#[cfg(test)]
mod tests {
    use std::{
        io::{Read, Write},
        net::TcpListener,
        thread,
    };

    use super::*;

    /// Answer a single request on a local port with the raw response.
    fn serve_once(status_line: &'static str, body: &'static str) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = [0; 4096];
            let _ = stream.read(&mut request).unwrap();
            let response = format!(
                "HTTP/1.1 {status_line}\r\n\
                 content-type: application/json\r\n\
                 content-length: {}\r\n\
                 connection: close\r\n\r\n{body}",
                body.len(),
            );
            stream.write_all(response.as_bytes()).unwrap();
        });
        url
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_decode_error() {
        let url = serve_once("200 OK", "not json");
        let client = try_new(HeaderMap::new()).unwrap();
        let error = get_json::<Vec<f64>>(&client, url.clone(), &[]).await.unwrap_err();
        assert!(matches!(
            error,
            ExternalFetchError::Decode { url: ref actual, .. } if *actual == url,
        ));
        assert!(error.to_string().starts_with("failed to decode the response of"));
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let url = serve_once("503 Service Unavailable", "[]");
        let client = try_new(HeaderMap::new()).unwrap();
        let error = get_json::<Vec<f64>>(&client, url, &[]).await.unwrap_err();
        assert!(matches!(
            error,
            ExternalFetchError::Status { status: StatusCode::SERVICE_UNAVAILABLE, .. },
        ));
    }
}
