use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;

use crate::app::{EstuaryError, Result};
use crate::media::MediaHandle;
use crate::poster::{MediaRef, Poster};

/// Mastodon API client over the shared HTTP transport.
pub struct MastodonPoster {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Attachment {
    id: String,
}

#[derive(Debug, Deserialize)]
struct AppCredentials {
    client_id: String,
    client_secret: String,
}

#[derive(Debug, Deserialize)]
struct Token {
    access_token: String,
}

impl MastodonPoster {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: trim_base(base_url.into()),
            access_token: access_token.into(),
        }
    }

    /// Register a new OAuth application, returning (client_id, client_secret).
    pub async fn register_app(
        client: &reqwest::Client,
        base_url: &str,
        name: &str,
    ) -> Result<(String, String)> {
        let url = format!("{}/api/v1/apps", trim_base(base_url.to_string()));
        let params = [
            ("client_name", name),
            ("redirect_uris", "urn:ietf:wg:oauth:2.0:oob"),
            ("scopes", "read write"),
        ];
        let response = client.post(&url).form(&params).send().await?;
        let body = check(response, "app registration").await?;
        let creds: AppCredentials = serde_json::from_slice(&body)
            .map_err(|e| EstuaryError::Api(format!("app registration: {}", e)))?;
        Ok((creds.client_id, creds.client_secret))
    }

    /// Obtain an access token via the password grant.
    pub async fn obtain_token(
        client: &reqwest::Client,
        base_url: &str,
        client_id: &str,
        client_secret: &str,
        username: &str,
        password: &str,
    ) -> Result<String> {
        let url = format!("{}/oauth/token", trim_base(base_url.to_string()));
        let params = [
            ("grant_type", "password"),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("username", username),
            ("password", password),
            ("scope", "read write"),
        ];
        let response = client.post(&url).form(&params).send().await?;
        let body = check(response, "login").await?;
        let token: Token = serde_json::from_slice(&body)
            .map_err(|e| EstuaryError::Api(format!("login: {}", e)))?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl Poster for MastodonPoster {
    async fn upload_media(&self, handle: MediaHandle) -> Result<MediaRef> {
        let url = format!("{}/api/v1/media", self.base_url);
        let content_type = handle.content_type().to_string();
        let bytes = handle.into_bytes().await?;
        let part = multipart::Part::bytes(bytes)
            .file_name("media")
            .mime_str(&content_type)?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .multipart(form)
            .send()
            .await?;
        let body = check(response, "media upload").await?;
        let attachment: Attachment = serde_json::from_slice(&body)
            .map_err(|e| EstuaryError::Api(format!("media upload: {}", e)))?;
        Ok(MediaRef(attachment.id))
    }

    async fn post_status(&self, text: &str, media: &[MediaRef]) -> Result<()> {
        let url = format!("{}/api/v1/statuses", self.base_url);
        let mut params: Vec<(&str, &str)> = vec![("status", text)];
        for media_ref in media {
            params.push(("media_ids[]", &media_ref.0));
        }

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .form(&params)
            .send()
            .await?;
        check(response, "status post").await?;
        Ok(())
    }
}

fn trim_base(mut base_url: String) -> String {
    while base_url.ends_with('/') {
        base_url.pop();
    }
    base_url
}

/// Surface non-success responses with the server's error payload.
async fn check(response: reqwest::Response, operation: &str) -> Result<Vec<u8>> {
    let status = response.status();
    let body = response.bytes().await?.to_vec();
    if !status.is_success() {
        let detail = String::from_utf8_lossy(&body);
        return Err(EstuaryError::Api(format!(
            "{} failed with {}: {}",
            operation,
            status,
            detail.trim()
        )));
    }
    Ok(body)
}
