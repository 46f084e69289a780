use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use parking_lot::RwLock;

use crate::{
    env::{EnvVar, Secret, GIST_HTTPS_PROXY, GIST_TOKEN, HTTPS_PROXY},
    Error, Result,
};

/// GitHub won't return more than this many gists per page
pub const MAX_PER_PAGE: u32 = 100;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const ENTERPRISE_API_PATH: &str = "/api/v3";

#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(untagged)]
pub enum IncludeOrgs {
    /// `true` lists every organization the token's user belongs to
    All(bool),
    Named(Vec<String>),
}

impl Default for IncludeOrgs {
    fn default() -> Self {
        Self::All(false)
    }
}

/// How listings are ordered, both orders ignore case
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SortGists {
    /// The order the API sent
    #[default]
    Off,
    /// By display title
    Description,
    /// By the extension of the first file, gists without one last
    Extension,
}

impl<'de> serde::Deserialize<'de> for SortGists {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Name(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Flag(true) => Ok(Self::Description),
            Raw::Flag(false) => Ok(Self::Off),
            Raw::Name(name) => match name.trim().to_ascii_lowercase().as_str() {
                "" => Ok(Self::Off),
                "description" => Ok(Self::Description),
                "extension" | "file extension" | "ext" => Ok(Self::Extension),
                other => Err(serde::de::Error::custom(format!(
                    "unknown sort_gists '{other}', expected 'description' or 'extension'"
                ))),
            },
        }
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default)]
pub struct Settings {
    pub token: Option<Secret>,
    pub https_proxy: Option<String>,

    pub api_url: String,
    pub enterprise: bool,
    pub url: Option<String>,
    pub max_gists: u32,

    pub prefer_filename: bool,
    pub show_authors: bool,
    pub gist_prefix: String,
    pub gist_tag: String,
    pub sort_gists: SortGists,

    pub use_starred: bool,
    pub include_users: Vec<String>,
    pub include_orgs: IncludeOrgs,

    pub update_on_save: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            token: None,
            https_proxy: None,
            api_url: DEFAULT_API_URL.to_string(),
            enterprise: false,
            url: None,
            max_gists: MAX_PER_PAGE,
            prefer_filename: false,
            show_authors: false,
            gist_prefix: String::new(),
            gist_tag: String::new(),
            sort_gists: SortGists::Off,
            use_starred: false,
            include_users: Vec::new(),
            include_orgs: IncludeOrgs::default(),
            update_on_save: false,
        }
    }
}

impl Settings {
    pub async fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read_to_string(path).await.map_err(|err| {
            anyhow::anyhow!("cannot read settings from '{}': {err}", path.display())
        })?;
        let this = Self::from_yaml(&data)?.with_env();
        log::debug!("loaded settings from '{}'", path.display());
        Ok(this)
    }

    /// Parses and normalizes settings, without consulting the environment
    pub fn from_yaml(data: &str) -> anyhow::Result<Self> {
        // an empty file is a valid, all-defaults configuration
        if data.trim().is_empty() {
            return Ok(Self::default().normalize());
        }
        let this: Self = serde_yaml::from_str(data)?;
        this.endpoint_base()?;
        Ok(this.normalize())
    }

    /// Fills the token and proxy from the environment when the file has none.
    ///
    /// `GIST_HTTPS_PROXY` wins over the system wide `HTTPS_PROXY`.
    pub fn with_env(self) -> Self {
        self.with_env_vars::<GIST_TOKEN, GIST_HTTPS_PROXY, HTTPS_PROXY>()
    }

    fn with_env_vars<Token, Proxy, SystemProxy>(mut self) -> Self
    where
        Token: EnvVar,
        Proxy: EnvVar,
        SystemProxy: EnvVar,
    {
        if self.token.as_ref().map_or(true, Secret::is_blank) {
            self.token = Secret::from_env::<Token>();
        }
        if self.https_proxy.as_deref().map_or(true, |s| s.trim().is_empty()) {
            self.https_proxy = Proxy::get_opt().or_else(SystemProxy::get_opt);
        }
        self
    }

    /// Clamps `max_gists` into the range the API accepts
    pub fn normalize(mut self) -> Self {
        if self.max_gists > MAX_PER_PAGE {
            log::warn!(
                "max_gists is {}, GitHub does not support more than {MAX_PER_PAGE}",
                self.max_gists
            );
            self.max_gists = MAX_PER_PAGE;
        }
        if self.max_gists == 0 {
            self.max_gists = 1;
        }
        self
    }

    /// The credential to send, or [`Error::MissingCredentials`]
    pub fn token(&self) -> Result<&str> {
        self.token
            .as_ref()
            .filter(|token| !token.is_blank())
            .map(|token| token.as_str())
            .ok_or(Error::MissingCredentials)
    }

    pub fn proxy(&self) -> Option<&str> {
        self.https_proxy.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn endpoints(&self) -> Result<Endpoints> {
        let base = self.endpoint_base()?;
        Ok(Endpoints {
            per_page: self.max_gists.clamp(1, MAX_PER_PAGE),
            base,
        })
    }

    fn endpoint_base(&self) -> Result<String> {
        if !self.enterprise {
            return Ok(self.api_url.trim_end_matches('/').to_string());
        }

        match self.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => {
                Ok(format!("{}{ENTERPRISE_API_PATH}", url.trim_end_matches('/')))
            }
            _ => Err(Error::Settings(
                "`enterprise` is enabled but `url` is not set".into(),
            )),
        }
    }
}

/// The API urls derived from a [`Settings`] snapshot
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    base: String,
    per_page: u32,
}

impl Endpoints {
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn gists(&self) -> String {
        format!("{}/gists?per_page={}", self.base, self.per_page)
    }

    pub fn starred(&self) -> String {
        format!("{}/gists/starred?per_page={}", self.base, self.per_page)
    }

    pub fn user_gists(&self, user: &str) -> String {
        format!("{}/users/{user}/gists?per_page={}", self.base, self.per_page)
    }

    pub fn orgs(&self) -> String {
        format!("{}/user/orgs", self.base)
    }

    pub fn org_members(&self, org: &str) -> String {
        format!("{}/orgs/{org}/members", self.base)
    }

    /// Where new gists are posted to
    pub fn create(&self) -> String {
        format!("{}/gists", self.base)
    }
}

/// A shared, replaceable [`Settings`] snapshot.
///
/// Readers take an `Arc` of the current settings and keep it for the whole
/// operation, a reload swaps in a new snapshot without touching the old one.
#[derive(Clone, Debug)]
pub struct SettingsHandle {
    current: Arc<RwLock<Arc<Settings>>>,
}

impl Default for SettingsHandle {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl From<Settings> for SettingsHandle {
    fn from(settings: Settings) -> Self {
        Self::new(settings)
    }
}

impl SettingsHandle {
    pub fn new(settings: Settings) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(settings))),
        }
    }

    pub async fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Settings::load(path).await.map(Self::new)
    }

    pub fn get(&self) -> Arc<Settings> {
        Arc::clone(&self.current.read())
    }

    pub fn replace(&self, settings: Settings) {
        *self.current.write() = Arc::new(settings);
    }

    /// Reloads the settings whenever `path` changes
    pub fn watch(&self, path: impl Into<PathBuf>) -> tokio::task::JoinHandle<()> {
        self.watch_every(path.into(), Duration::from_secs(1))
    }

    fn watch_every(&self, path: PathBuf, sleep: Duration) -> tokio::task::JoinHandle<()> {
        const SETTLE: Duration = Duration::from_millis(50);

        let this = self.clone();
        tokio::spawn(async move {
            let fut = crate::watch::watch_file(path.clone(), sleep, SETTLE, move |path| {
                let this = this.clone();
                async move {
                    match Settings::load(&path).await {
                        Ok(settings) => {
                            log::info!("reloaded settings from '{}'", path.display());
                            this.replace(settings)
                        }
                        // keep the previous snapshot, the file may be mid-edit
                        Err(err) => log::warn!("cannot reload settings: {err}"),
                    }
                    Ok(())
                }
            });

            if let Err(err) = fut.await {
                log::error!("stopped watching '{}': {err}", path.display());
            }
        })
    }
}
