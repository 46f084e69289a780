use crate::{
    client::GistClient,
    filter::{DisplayName, Filter, STARRED_MARKER},
    model::Gist,
    settings::IncludeOrgs,
    Result,
};

/// A row picked from a [`Catalog`]
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Pick<'a> {
    Org(&'a str),
    User(&'a str),
    Gist(&'a Gist),
}

/// Everything a gist list shows: organizations and users to drill into,
/// followed by the gists themselves.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Catalog {
    pub orgs: Vec<String>,
    pub users: Vec<String>,
    pub gists: Vec<(Gist, DisplayName)>,
}

impl Catalog {
    /// The authenticated user's listing.
    ///
    /// Own gists come first, then starred gists (marked with
    /// [`STARRED_MARKER`]). With `use_starred` only the starred ones are listed.
    pub async fn fetch(client: &GistClient) -> Result<Self> {
        let settings = client.settings();
        let endpoints = settings.endpoints()?;
        let filter = Filter::new(&settings)?;

        let starred = client.list_gists(&endpoints.starred()).await?;
        let starred = filter.apply(starred, STARRED_MARKER);

        let gists = if settings.use_starred {
            starred
        } else {
            let own = client.list_gists(&endpoints.gists()).await?;
            let mut own = filter.apply(own, "");
            own.extend(starred);
            own
        };

        let orgs = match &settings.include_orgs {
            IncludeOrgs::All(true) => client.list_orgs().await?,
            IncludeOrgs::All(false) => Vec::new(),
            IncludeOrgs::Named(orgs) => orgs.clone(),
        };

        Ok(Self {
            orgs,
            users: settings.include_users.clone(),
            gists,
        })
    }

    pub async fn for_user(client: &GistClient, user: &str) -> Result<Self> {
        let settings = client.settings();
        let url = settings.endpoints()?.user_gists(user);
        let gists = client.list_gists(&url).await?;

        Ok(Self {
            gists: Filter::new(&settings)?.apply(gists, ""),
            ..Self::default()
        })
    }

    /// The gists of every member of `org`, in member order
    pub async fn for_org(client: &GistClient, org: &str) -> Result<Self> {
        let settings = client.settings();
        let endpoints = settings.endpoints()?;

        let mut gists = Vec::new();
        for member in client.list_org_members(org).await? {
            log::debug!("listing gists of {org}/{member}");
            gists.extend(client.list_gists(&endpoints.user_gists(&member)).await?);
        }

        Ok(Self {
            gists: Filter::new(&settings)?.apply(gists, ""),
            ..Self::default()
        })
    }

    /// Fetches whatever `pick` drills into, `None` for a gist
    pub async fn expand(client: &GistClient, pick: Pick<'_>) -> Result<Option<Self>> {
        match pick {
            Pick::Org(org) => Self::for_org(client, org).await.map(Some),
            Pick::User(user) => Self::for_user(client, user).await.map(Some),
            Pick::Gist(..) => Ok(None),
        }
    }

    pub fn len(&self) -> usize {
        self.orgs.len() + self.users.len() + self.gists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One label per row, in the order [`Catalog::pick`] indexes them
    pub fn labels(&self) -> Vec<DisplayName> {
        let drill = |name: &String| DisplayName::new(format!("> {name}"));
        self.orgs
            .iter()
            .map(drill)
            .chain(self.users.iter().map(drill))
            .chain(self.gists.iter().map(|(_, name)| name.clone()))
            .collect()
    }

    pub fn pick(&self, index: usize) -> Option<Pick<'_>> {
        let users = self.orgs.len();
        let gists = users + self.users.len();

        match index {
            i if i < users => self.orgs.get(i).map(|s| Pick::Org(s)),
            i if i < gists => self.users.get(i - users).map(|s| Pick::User(s)),
            i => self.gists.get(i - gists).map(|(gist, _)| Pick::Gist(gist)),
        }
    }
}
