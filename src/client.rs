use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::{
    model::{FileChanges, Gist, GistUpdate, NewFile, NewGist},
    settings::{Settings, SettingsHandle},
    transport::{HttpRequest, HttpTransport, Method, RawResponse, Transport},
    Error, Result,
};

/// What a successful request produced.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    /// The server answered `204 No Content`
    NoContent,
    Json(Value),
}

impl Reply {
    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::NoContent => None,
            Self::Json(value) => Some(value),
        }
    }

    pub fn decode<T>(self) -> Result<T>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        match self {
            Self::NoContent => Err(Error::EmptyResponse),
            Self::Json(value) => serde_json::from_value(value).map_err(Into::into),
        }
    }
}

#[derive(serde::Deserialize)]
struct Login {
    login: String,
}

#[derive(Clone)]
pub struct GistClient {
    transport: Arc<dyn Transport>,
    settings: SettingsHandle,
}

impl GistClient {
    pub fn new(settings: impl Into<SettingsHandle>) -> Self {
        Self::with_transport(settings, Arc::new(HttpTransport::new()))
    }

    pub fn with_transport(
        settings: impl Into<SettingsHandle>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            transport,
            settings: settings.into(),
        }
    }

    /// The settings snapshot the next request will use
    pub fn settings(&self) -> Arc<Settings> {
        self.settings.get()
    }

    pub fn settings_handle(&self) -> &SettingsHandle {
        &self.settings
    }

    /// Performs one authenticated round trip.
    ///
    /// With a `body` the method defaults to `POST`, otherwise to `GET`.
    pub async fn request(
        &self,
        url: &str,
        body: Option<&Value>,
        method: Option<Method>,
    ) -> Result<Reply> {
        let body = body.map(serde_json::to_vec).transpose()?;
        self.send(url, body, method).await
    }

    async fn send(&self, url: &str, body: Option<Vec<u8>>, method: Option<Method>) -> Result<Reply> {
        let settings = self.settings();
        let token = settings.token()?;

        let method = method.unwrap_or(match body {
            Some(..) => Method::Post,
            None => Method::Get,
        });

        log::debug!("{method} {url}");

        let req = HttpRequest {
            method,
            url: url.to_string(),
            headers: vec![
                ("Authorization", format!("token {token}")),
                ("Accept", "application/json".into()),
                ("Content-Type", "application/json".into()),
            ],
            body,
            proxy: settings.proxy().map(ToString::to_string),
        };

        let RawResponse { status, body } = self.transport.send(req).await?;
        log::trace!("{method} {url} -> {status}");

        match status {
            204 => Ok(Reply::NoContent),
            200..=299 => {
                // invalid utf-8 is dropped rather than failing the whole response
                let text = body
                    .utf8_chunks()
                    .map(|chunk| chunk.valid())
                    .collect::<String>();
                serde_json::from_str(&text).map(Reply::Json).map_err(Into::into)
            }
            code => Err(Error::Http {
                code,
                body: String::from_utf8_lossy(&body).into_owned(),
            }),
        }
    }

    /// Fetches a single gist, including the file contents
    pub async fn get_gist(&self, url: &str) -> Result<Gist> {
        self.request(url, None, None).await?.decode()
    }

    pub async fn list_gists(&self, url: &str) -> Result<Vec<Gist>> {
        match self.request(url, None, None).await? {
            Reply::NoContent => Ok(Vec::new()),
            reply => reply.decode(),
        }
    }

    /// Creates a gist from `files`, keyed by filename.
    ///
    /// Nothing is sent if there are no files or any of them is empty.
    pub async fn create_gist(
        &self,
        public: bool,
        description: &str,
        files: &IndexMap<String, String>,
    ) -> Result<Gist> {
        if files.is_empty() {
            return Err(Error::Validation(
                "unable to create a gist without files".into(),
            ));
        }
        if let Some((name, _)) = files.iter().find(|(_, content)| content.is_empty()) {
            return Err(Error::Validation(format!(
                "unable to create a gist with empty content ('{name}')"
            )));
        }

        let body = NewGist {
            description,
            public,
            files: files
                .iter()
                .map(|(name, content)| (name.as_str(), NewFile { content }))
                .collect(),
        };

        let url = self.settings().endpoints()?.create();
        let gist: Gist = self
            .send(&url, Some(serde_json::to_vec(&body)?), Some(Method::Post))
            .await?
            .decode()?;

        log::info!("created gist: {}", gist.html_url);
        Ok(gist)
    }

    pub async fn update_gist(
        &self,
        url: &str,
        changes: &FileChanges,
        new_description: Option<&str>,
    ) -> Result<Gist> {
        let body = GistUpdate {
            files: changes,
            description: new_description,
        };

        let gist = self
            .send(url, Some(serde_json::to_vec(&body)?), Some(Method::Patch))
            .await?
            .decode()?;

        log::info!("updated gist: {url}");
        Ok(gist)
    }

    pub async fn delete_gist(&self, url: &str) -> Result<()> {
        self.send(url, None, Some(Method::Delete)).await?;
        log::info!("deleted gist: {url}");
        Ok(())
    }

    /// Logins of the organizations the authenticated user belongs to
    pub async fn list_orgs(&self) -> Result<Vec<String>> {
        let url = self.settings().endpoints()?.orgs();
        self.logins(&url).await
    }

    pub async fn list_org_members(&self, org: &str) -> Result<Vec<String>> {
        let url = self.settings().endpoints()?.org_members(org);
        self.logins(&url).await
    }

    async fn logins(&self, url: &str) -> Result<Vec<String>> {
        let logins: Vec<Login> = match self.request(url, None, None).await? {
            Reply::NoContent => Vec::new(),
            reply => reply.decode()?,
        };
        Ok(logins.into_iter().map(|Login { login }| login).collect())
    }
}
