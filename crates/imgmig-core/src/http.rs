//! Blocking HTTP over libcurl.
//!
//! One `Easy` handle per request. Every call returns the full response body on
//! 2xx and `TransportError::Http` otherwise. Run from `spawn_blocking` when
//! called from async code.

use crate::config::HttpConfig;
use crate::error::TransportError;
use std::path::Path;
use std::time::Duration;

/// Shared request settings; cheap to clone.
#[derive(Debug, Clone)]
pub struct HttpClient {
    connect_timeout: Duration,
    timeout: Duration,
    user_agent: String,
}

impl Default for HttpClient {
    fn default() -> Self {
        HttpClient::new(&HttpConfig::default())
    }
}

/// `Authorization` header line for a bearer token.
pub fn bearer(token: &str) -> String {
    format!("Authorization: Bearer {}", token.trim())
}

impl HttpClient {
    pub fn new(cfg: &HttpConfig) -> Self {
        Self {
            connect_timeout: cfg.connect_timeout(),
            timeout: cfg.timeout(),
            user_agent: cfg
                .user_agent
                .clone()
                .unwrap_or_else(|| format!("imgmig/{}", env!("CARGO_PKG_VERSION"))),
        }
    }

    fn easy(&self, url: &str, headers: &[String]) -> Result<curl::easy::Easy, TransportError> {
        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.timeout(self.timeout)?;
        easy.useragent(&self.user_agent)?;

        if !headers.is_empty() {
            let mut list = curl::easy::List::new();
            for h in headers {
                list.append(h)?;
            }
            easy.http_headers(list)?;
        }
        Ok(easy)
    }

    /// GET `url` and return the body.
    pub fn get(&self, url: &str, headers: &[String]) -> Result<Vec<u8>, TransportError> {
        let mut easy = self.easy(url, headers)?;
        easy.get(true)?;
        perform(easy, url)
    }

    /// POST a JSON document and return the body.
    pub fn post_json(
        &self,
        url: &str,
        headers: &[String],
        body: &serde_json::Value,
    ) -> Result<Vec<u8>, TransportError> {
        let mut all = headers.to_vec();
        all.push("Content-Type: application/json".to_string());
        all.push("Accept: application/json".to_string());
        let mut easy = self.easy(url, &all)?;
        easy.post(true)?;
        easy.post_fields_copy(&serde_json::to_vec(body)?)?;
        perform(easy, url)
    }

    /// POST `path` as a multipart part named `field`. The part's filename is the file's basename.
    pub fn post_file(
        &self,
        url: &str,
        headers: &[String],
        field: &str,
        path: &Path,
    ) -> Result<Vec<u8>, TransportError> {
        let mut easy = self.easy(url, headers)?;
        let mut form = curl::easy::Form::new();
        form.part(field).file(path).add()?;
        easy.httppost(form)?;
        perform(easy, url)
    }
}

fn perform(mut easy: curl::easy::Easy, url: &str) -> Result<Vec<u8>, TransportError> {
    let mut body = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }

    let status = easy.response_code()?;
    if !(200..300).contains(&status) {
        return Err(TransportError::Http {
            status,
            url: url.to_string(),
        });
    }
    Ok(body)
}
