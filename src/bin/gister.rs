use std::{path::PathBuf, time::Duration};

use anyhow::Context as _;
use indexmap::IndexMap;

use gister::{
    catalog::{Catalog, Pick},
    env::{EnvVar as _, GIST_SETTINGS},
    model::FileChanges,
    naming, open, GistClient, SettingsHandle, UpdateQueue,
};

const USAGE: &str = "\
usage: gister <command>

commands:
    list [index...]                       list gists, descending into orgs/users by index
    open <url>                            print the text files of a gist
    embed <url>                           print <script> embeds for a gist
    create [--private] <description> <path>...
    update <url> <path>                   replace a file with a local one
    rename <url> <old> <new> <path>
    describe <url> <description>
    delete-file <url> <filename>
    delete <url>
    watch <url> <path>                    push <path> every time it changes
    version";

fn filename_of(path: &str) -> String {
    PathBuf::from(path)
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

async fn read(path: &str) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read '{path}'"))
}

async fn list(client: &GistClient, path: &[String]) -> anyhow::Result<()> {
    let mut catalog = Catalog::fetch(client).await?;

    for index in path {
        let index = index.parse::<usize>().context("expected an index")?;
        let pick = catalog
            .pick(index)
            .with_context(|| format!("no entry at {index}"))?;
        if let Pick::Gist(gist) = pick {
            println!("{}", gist.url);
            return Ok(());
        }
        catalog = Catalog::expand(client, pick)
            .await?
            .context("nothing to expand")?;
    }

    for (i, label) in catalog.labels().into_iter().enumerate() {
        println!("{i:>3}  {label}");
    }
    Ok(())
}

async fn create(client: &GistClient, args: &[String]) -> anyhow::Result<()> {
    let (public, args) = match args {
        [flag, rest @ ..] if flag == "--private" => (false, rest),
        rest => (true, rest),
    };
    let [description, paths @ ..] = args else {
        anyhow::bail!("{USAGE}")
    };
    anyhow::ensure!(!paths.is_empty(), "{USAGE}");

    let mut files = IndexMap::new();
    if let [path] = paths {
        files = naming::selection_files(&filename_of(path), "", vec![read(path).await?]);
    } else {
        for path in paths {
            files.insert(filename_of(path), read(path).await?);
        }
    }

    let gist = client.create_gist(public, description, &files).await?;
    let mode = if public { "public" } else { "private" };
    println!("{mode} gist: {}", gist.html_url);
    Ok(())
}

async fn watch(client: &GistClient, url: &str, path: &str) -> anyhow::Result<()> {
    let queue = UpdateQueue::new(client.clone());
    let filename = filename_of(path);
    log::info!("pushing '{path}' to {url} on every change");

    let url = url.to_string();
    gister::watch::watch_file(
        PathBuf::from(path),
        Duration::from_millis(500),
        Duration::from_millis(50),
        move |path| {
            let (queue, url, filename) = (queue.clone(), url.clone(), filename.clone());
            async move {
                let text = tokio::fs::read_to_string(&path).await?;
                queue.enqueue(&url, FileChanges::new().update(filename, text));
                Ok::<_, anyhow::Error>(())
            }
        },
    )
    .await
}

async fn run(args: Vec<String>) -> anyhow::Result<()> {
    let args = args.iter().map(String::as_str).collect::<Vec<_>>();
    if let ["version"] = args.as_slice() {
        println!(
            "{} ({} @ {}, built {})",
            gister::USER_AGENT,
            gister::GIT_BRANCH,
            gister::GIT_REVISION,
            gister::BUILD_TIME
        );
        return Ok(());
    }

    let path = GIST_SETTINGS::get_opt().unwrap_or_else(|| "gist.yaml".into());
    let settings = SettingsHandle::load(&path).await?;
    let _reload = settings.watch(&path);
    let client = GistClient::new(settings);

    match args.as_slice() {
        ["list", rest @ ..] => {
            let rest = rest.iter().map(ToString::to_string).collect::<Vec<_>>();
            list(&client, &rest).await?
        }

        ["open", url] => {
            for file in open::open_gist(&client, url).await?.1 {
                println!("==> {} ({})", file.filename, file.language.as_deref().unwrap_or("plain"));
                println!("{}", file.content);
            }
        }

        ["embed", url] => {
            for tag in open::embed_tags(&client.get_gist(url).await?) {
                println!("{tag}");
            }
        }

        ["create", rest @ ..] => {
            let rest = rest.iter().map(ToString::to_string).collect::<Vec<_>>();
            create(&client, &rest).await?
        }

        ["update", url, path] => {
            let changes = FileChanges::new().update(filename_of(path), read(path).await?);
            client.update_gist(url, &changes, None).await?;
            println!("gist updated");
        }

        ["rename", url, old, new, path] => {
            let changes = FileChanges::new().rename(*old, *new, read(path).await?);
            client.update_gist(url, &changes, None).await?;
            println!("gist file renamed");
        }

        ["describe", url, description] => {
            client
                .update_gist(url, &FileChanges::new(), Some(*description))
                .await?;
            println!("gist description changed");
        }

        ["delete-file", url, filename] => {
            let changes = FileChanges::new().delete(*filename);
            client.update_gist(url, &changes, None).await?;
            println!("gist file deleted");
        }

        ["delete", url] => {
            client.delete_gist(url).await?;
            println!("gist deleted");
        }

        ["watch", url, path] => watch(&client, url, path).await?,

        _ => anyhow::bail!("{USAGE}"),
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    simple_env_load::load_env_from([".dev.env", ".secrets.env"]);
    if let Err(err) = alto_logger::init_term_logger() {
        eprintln!("cannot start logger: {err}");
    }

    if let Err(err) = run(std::env::args().skip(1).collect()).await {
        match err.downcast_ref::<gister::Error>() {
            Some(err @ gister::Error::MissingCredentials) => {
                eprintln!("ERROR: {err}");
                eprintln!("create a token at https://github.com/settings/tokens with the `gist` scope");
            }
            Some(err @ gister::Error::Http { .. }) => {
                eprintln!("ERROR: {}", err.http_message().unwrap_or_default());
            }
            _ => eprintln!("ERROR: {err:#}"),
        }
        std::process::exit(1)
    }
}
