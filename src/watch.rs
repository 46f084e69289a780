use std::{future::Future, path::PathBuf, time::Duration, time::SystemTime};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
struct Stamp {
    modified: SystemTime,
    len: u64,
}

async fn stamp(path: &PathBuf) -> std::io::Result<Stamp> {
    let md = tokio::fs::metadata(path).await?;
    Ok(Stamp {
        modified: md.modified()?,
        len: md.len(),
    })
}

/// Polls `path` every `sleep` and calls `on_change` after it has been modified.
///
/// `settle` is waited out between noticing a change and calling `on_change`,
/// so editors that write in several steps are seen once. This only returns if
/// the file can't be read initially or `on_change` fails.
pub async fn watch_file<F, Fut>(
    path: PathBuf,
    sleep: Duration,
    settle: Duration,
    mut on_change: F,
) -> anyhow::Result<()>
where
    F: FnMut(PathBuf) -> Fut + Send,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    let mut last = stamp(&path).await?;
    log::trace!("watching: {}", path.display());

    loop {
        tokio::time::sleep(sleep).await;

        let current = match stamp(&path).await {
            Ok(current) => current,
            Err(err) => {
                log::warn!("cannot stat '{}': {err}", path.display());
                continue;
            }
        };

        if current == last {
            continue;
        }

        tokio::time::sleep(settle).await;
        last = stamp(&path).await.unwrap_or(current);

        log::debug!("changed: {}", path.display());
        on_change(path.clone()).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn notices_modification() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watched.txt");
        tokio::fs::write(&path, "one").await.unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let task = tokio::spawn(watch_file(
            path.clone(),
            Duration::from_millis(10),
            Duration::from_millis(1),
            move |path| {
                let tx = tx.clone();
                async move {
                    let data = tokio::fs::read_to_string(&path).await?;
                    let _ = tx.send(data);
                    Ok::<_, anyhow::Error>(())
                }
            },
        ));

        tokio::time::sleep(Duration::from_millis(50)).await;
        tokio::fs::write(&path, "one two").await.unwrap();

        let seen = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("change noticed")
            .unwrap();
        assert_eq!(seen, "one two");

        task.abort();
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let res = watch_file(
            dir.path().join("nope"),
            Duration::from_millis(1),
            Duration::from_millis(1),
            |_| async { Ok(()) },
        )
        .await;
        assert!(res.is_err());
    }
}
