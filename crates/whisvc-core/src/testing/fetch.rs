use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::ports::{ArchiveFetcher, FetchError};

/// Serves canned payloads by URL suffix and counts requests.
#[derive(Debug, Default)]
pub struct FakeArchiveFetcher {
    payloads: Vec<(String, Vec<u8>)>,
    requests: Mutex<Vec<String>>,
}

impl FakeArchiveFetcher {
    #[must_use]
    pub fn serve(mut self, url_suffix: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.payloads.push((url_suffix.into(), bytes));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ArchiveFetcher for FakeArchiveFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());

        let Some((_, bytes)) = self
            .payloads
            .iter()
            .find(|(suffix, _)| url.ends_with(suffix.as_str()))
        else {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            });
        };

        std::fs::write(dest, bytes).map_err(|e| FetchError::Write {
            path: dest.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(bytes.len() as u64)
    }
}
