use std::{collections::VecDeque, sync::Arc};

use parking_lot::Mutex;

use crate::{
    transport::{HttpRequest, RawResponse, Transport},
    Error, Result,
};

/// A [`Transport`] that replays canned responses and records every request.
///
/// Responses are handed out in the order they were pushed. A request with
/// nothing left to replay fails with [`Error::Transport`].
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<RawResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_raw(&self, status: u16, body: Vec<u8>) {
        self.responses
            .lock()
            .push_back(Ok(RawResponse { status, body }));
    }

    pub fn push_status(&self, status: u16, body: &str) {
        self.push_raw(status, body.as_bytes().to_vec())
    }

    pub fn push_json(&self, status: u16, value: serde_json::Value) {
        self.push_raw(status, value.to_string().into_bytes())
    }

    pub fn push_error(&self, err: Error) {
        self.responses.lock().push_back(Err(err))
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// How many pushed responses haven't been consumed yet
    pub fn pending(&self) -> usize {
        self.responses.lock().len()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn send(&self, req: HttpRequest) -> Result<RawResponse> {
        let url = req.url.clone();
        self.requests.lock().push(req);
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Transport(format!("no response queued for {url}"))))
    }
}
