use std::borrow::Cow;

pub trait EnvVar {
    fn key() -> &'static str;
    fn get() -> anyhow::Result<String>;

    /// The variable's value, if it is set and not blank
    fn get_opt() -> Option<String> {
        Self::get().ok().filter(|s| !s.trim().is_empty())
    }
}

pub(crate) fn get_env_var<T: EnvVar>() -> anyhow::Result<String> {
    let key = T::key();
    log::trace!("loading: {key}");
    std::env::var(key).map_err(|_| anyhow::anyhow!("expected '{key}' to exist in env"))
}

macro_rules! make_env_key {
    ($($(#[$meta:meta])* $lit:ident)*) => {
        $(
            #[allow(non_camel_case_types)]
            #[derive(Copy, Clone)]
            $(#[$meta])*
            pub struct $lit;

            impl $crate::env::EnvVar for $lit {
                fn key() -> &'static str { stringify!($lit) }
                fn get() -> anyhow::Result<String> { $crate::env::get_env_var::<Self>() }
            }
        )*
    };
}

#[cfg(test)]
pub(crate) use make_env_key;

make_env_key! {
    /// GitHub personal access token, used when the settings file has none
    GIST_TOKEN
    /// Proxy for HTTPS connections, used when the settings file has none
    GIST_HTTPS_PROXY
    /// Path to the settings file
    GIST_SETTINGS
    /// The system wide proxy, used when no other proxy is configured
    HTTPS_PROXY
}

/// A credential that only ever prints where it came from.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret<T = String> {
    source: Cow<'static, str>,
    value: T,
}

impl<T> Secret<T> {
    pub fn new(source: impl Into<Cow<'static, str>>, value: T) -> Self {
        Self {
            source: source.into(),
            value,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

impl Secret {
    /// Reads the secret from an environment variable
    pub fn from_env<E: EnvVar>() -> Option<Self> {
        E::get_opt().map(|value| Self::new(E::key(), value))
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }
}

impl<T> std::ops::Deref for Secret<T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<T> AsRef<str> for Secret<T>
where
    T: AsRef<str>,
{
    fn as_ref(&self) -> &str {
        self.value.as_ref()
    }
}

impl<T> std::fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret({})", self.source)
    }
}

impl<'de> serde::Deserialize<'de> for Secret {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer).map(|value| Self::new("settings", value))
    }
}
