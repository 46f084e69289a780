use std::{collections::HashMap, sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::{
    runtime::Handle,
    sync::{mpsc, oneshot},
};

use crate::{client::GistClient, model::FileChanges};

/// How long a worker waits for more updates before it exits
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

enum Job {
    Update(FileChanges),
    Flush(oneshot::Sender<()>),
}

type Workers = Arc<Mutex<HashMap<String, mpsc::UnboundedSender<Job>>>>;

/// Pushes gist updates in the background, one gist at a time.
///
/// Every gist url gets its own worker, so updates to the same gist are sent
/// in the order they were queued while different gists don't wait on each
/// other. Queueing never blocks and works from any thread. A worker that
/// has had nothing to do for [`IDLE_TIMEOUT`] exits and is started again by
/// the next update.
#[derive(Clone)]
pub struct UpdateQueue {
    client: GistClient,
    runtime: Handle,
    idle: Duration,
    workers: Workers,
}

impl UpdateQueue {
    /// Must be called from within a tokio runtime, which runs the workers
    pub fn new(client: GistClient) -> Self {
        Self::with_runtime(client, Handle::current())
    }

    pub fn with_runtime(client: GistClient, runtime: Handle) -> Self {
        Self {
            client,
            runtime,
            idle: IDLE_TIMEOUT,
            workers: Workers::default(),
        }
    }

    pub fn idle_timeout(self, idle: Duration) -> Self {
        Self { idle, ..self }
    }

    pub fn enqueue(&self, url: &str, changes: FileChanges) {
        self.send(url, Job::Update(changes))
    }

    /// Queues the new `text` of `filename` if `update_on_save` is enabled
    pub fn on_save(&self, url: &str, filename: &str, text: &str) -> bool {
        if !self.client.settings().update_on_save {
            return false;
        }
        self.enqueue(url, FileChanges::new().update(filename, text));
        true
    }

    /// Resolves once everything queued for `url` before this call has run
    pub async fn flush(&self, url: &str) {
        let (tx, rx) = oneshot::channel();
        self.send(url, Job::Flush(tx));
        let _ = rx.await;
    }

    /// Number of gists with a running worker
    pub fn workers(&self) -> usize {
        self.workers.lock().len()
    }

    fn send(&self, url: &str, job: Job) {
        let mut workers = self.workers.lock();
        let job = match workers.get(url) {
            Some(tx) => match tx.send(job) {
                Ok(()) => return,
                // the worker is gone, start a new one below
                Err(mpsc::error::SendError(job)) => job,
            },
            None => job,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(job);
        workers.insert(url.to_string(), tx);

        log::trace!("starting update worker for {url}");
        self.runtime.spawn(Self::work(
            self.client.clone(),
            url.to_string(),
            rx,
            Arc::clone(&self.workers),
            self.idle,
        ));
    }

    async fn work(
        client: GistClient,
        url: String,
        mut rx: mpsc::UnboundedReceiver<Job>,
        workers: Workers,
        idle: Duration,
    ) {
        loop {
            let job = match tokio::time::timeout(idle, rx.recv()).await {
                Ok(Some(job)) => job,
                Ok(None) => break,
                Err(..) => {
                    // senders only send while holding this lock, so nothing
                    // can arrive once our entry is gone
                    let mut workers = workers.lock();
                    match rx.try_recv() {
                        Ok(job) => job,
                        Err(..) => {
                            workers.remove(&url);
                            log::trace!("stopping idle update worker for {url}");
                            break;
                        }
                    }
                }
            };

            match job {
                Job::Update(changes) => {
                    if let Err(err) = client.update_gist(&url, &changes, None).await {
                        log::error!("cannot update {url}: {err}");
                    }
                }
                Job::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{settings::Settings, testing::MockTransport, transport::Method, Error};
    use serde_json::json;

    fn queue(mock: &Arc<MockTransport>, yaml: &str) -> UpdateQueue {
        let settings = Settings::from_yaml(&format!("token: abc\n{yaml}")).unwrap();
        UpdateQueue::new(GistClient::with_transport(settings, mock.clone()))
    }

    #[tokio::test]
    async fn updates_run_in_order() {
        let mock = MockTransport::new();
        for _ in 0..5 {
            mock.push_json(200, json!({ "id": "1" }));
        }

        let queue = queue(&mock, "");
        let url = "https://api.github.com/gists/1";
        for i in 0..5 {
            queue.enqueue(url, FileChanges::new().update("a.txt", format!("rev {i}")));
        }
        queue.flush(url).await;

        let contents = mock
            .requests()
            .into_iter()
            .map(|req| {
                assert_eq!(req.method, Method::Patch);
                assert_eq!(req.url, url);
                req.json_body().unwrap()["files"]["a.txt"]["content"].clone()
            })
            .collect::<Vec<_>>();
        assert_eq!(contents, [json!("rev 0"), json!("rev 1"), json!("rev 2"), json!("rev 3"), json!("rev 4")]);
        assert_eq!(queue.workers(), 1);
    }

    #[tokio::test]
    async fn failures_do_not_stop_the_worker() {
        let mock = MockTransport::new();
        mock.push_error(Error::Transport("timed out".into()));
        mock.push_json(200, json!({ "id": "1" }));

        let queue = queue(&mock, "");
        let url = "https://api.github.com/gists/1";
        queue.enqueue(url, FileChanges::new().update("a.txt", "first"));
        queue.enqueue(url, FileChanges::new().update("a.txt", "second"));
        queue.flush(url).await;

        assert_eq!(mock.requests().len(), 2);
        assert_eq!(mock.pending(), 0);
    }

    #[tokio::test]
    async fn one_worker_per_gist() {
        let mock = MockTransport::new();
        mock.push_json(200, json!({}));
        mock.push_json(200, json!({}));

        let queue = queue(&mock, "");
        queue.enqueue("https://x.test/gists/1", FileChanges::new().delete("a"));
        queue.enqueue("https://x.test/gists/2", FileChanges::new().delete("b"));
        queue.flush("https://x.test/gists/1").await;
        queue.flush("https://x.test/gists/2").await;

        assert_eq!(queue.workers(), 2);
        assert_eq!(mock.requests().len(), 2);
    }

    #[tokio::test]
    async fn on_save_respects_setting() {
        let mock = MockTransport::new();
        mock.push_json(200, json!({}));
        let url = "https://x.test/gists/1";

        let off = queue(&mock, "");
        assert!(!off.on_save(url, "a.txt", "text"));
        assert_eq!(off.workers(), 0);

        let on = queue(&mock, "update_on_save: true");
        assert!(on.on_save(url, "a.txt", "text"));
        on.flush(url).await;

        let req = &mock.requests()[0];
        assert_eq!(
            req.json_body(),
            Some(json!({ "files": { "a.txt": { "content": "text" } } }))
        );
    }

    #[tokio::test]
    async fn idle_workers_exit() {
        let mock = MockTransport::new();
        mock.push_json(200, json!({}));
        mock.push_json(200, json!({}));

        let queue = queue(&mock, "").idle_timeout(Duration::from_millis(20));
        let url = "https://x.test/gists/1";
        queue.enqueue(url, FileChanges::new().update("a", "1"));
        queue.flush(url).await;

        let idle = async {
            while queue.workers() > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), idle)
            .await
            .expect("worker should exit");

        // the next update starts a fresh worker
        queue.enqueue(url, FileChanges::new().update("a", "2"));
        queue.flush(url).await;
        assert_eq!(mock.requests().len(), 2);
        assert_eq!(mock.pending(), 0);
    }

    #[test]
    fn enqueue_from_a_plain_thread() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let mock = MockTransport::new();
        mock.push_json(200, json!({}));
        let settings = Settings::from_yaml("token: abc").unwrap();
        let client = GistClient::with_transport(settings, mock.clone());
        let queue = UpdateQueue::with_runtime(client, runtime.handle().clone());

        let url = "https://x.test/gists/1";
        let sender = queue.clone();
        std::thread::spawn(move || sender.enqueue(url, FileChanges::new().update("a", "b")))
            .join()
            .unwrap();

        runtime.block_on(queue.flush(url));
        assert_eq!(mock.requests().len(), 1);
    }
}
