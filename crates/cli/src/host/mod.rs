//! Local trigger host.
//!
//! Plays the role of the storage-event runtime: opens each blob, hands it to the
//! dispatcher, and closes it once the invocation returns.

mod stats;

pub use stats::{FileOutcome, HostStats};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use contracts::{ContractError, IncomingFile, Processor};
use dispatcher::{CountingReader, IngestionDispatcher};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// A blob waiting to be dispatched
#[derive(Debug, Clone)]
pub struct BlobRef {
    pub path: PathBuf,
    pub name: String,
}

impl BlobRef {
    /// Use the file name of `path` as the blob name
    pub fn from_path(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, name }
    }
}

struct Invocation {
    name: String,
    bytes_read: u64,
    latency_ms: f64,
    result: Result<String, ContractError>,
}

/// Runs one dispatcher invocation per blob with bounded parallelism
pub struct TriggerHost<P> {
    dispatcher: Arc<IngestionDispatcher<P>>,
    concurrency: usize,
}

impl<P> TriggerHost<P>
where
    P: Processor + Send + Sync + 'static,
{
    pub fn new(dispatcher: IngestionDispatcher<P>, concurrency: usize) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            concurrency: concurrency.max(1),
        }
    }

    pub fn dispatcher(&self) -> &Arc<IngestionDispatcher<P>> {
        &self.dispatcher
    }

    /// Dispatch every blob and collect the outcomes
    pub async fn run(&self, blobs: Vec<BlobRef>) -> HostStats {
        let start_time = Instant::now();
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        info!(
            files = blobs.len(),
            concurrency = self.concurrency,
            "Dispatching files"
        );

        for blob in blobs {
            let dispatcher = Arc::clone(&self.dispatcher);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                // Semaphore is never closed
                let _permit = permits.acquire_owned().await.ok();
                invoke(&dispatcher, blob).await
            });
        }

        let mut stats = HostStats::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(invocation) => record(&mut stats, invocation),
                Err(e) => error!(error = %e, "Invocation task failed"),
            }
        }

        stats.duration = start_time.elapsed();
        stats
    }
}

/// One trigger invocation: open, dispatch, close
async fn invoke<P>(dispatcher: &IngestionDispatcher<P>, blob: BlobRef) -> Invocation
where
    P: Processor + Sync,
{
    let started = Instant::now();
    let mut file = match tokio::fs::File::open(&blob.path).await {
        Ok(file) => file,
        Err(e) => {
            error!(path = %blob.path.display(), error = %e, "Cannot open file");
            return Invocation {
                name: blob.name,
                bytes_read: 0,
                latency_ms: 0.0,
                result: Err(e.into()),
            };
        }
    };
    let mut reader = CountingReader::new(&mut file);
    let result = dispatcher
        .handle(IncomingFile::new(blob.name.clone(), &mut reader))
        .await;
    let bytes_read = reader.bytes_read();
    drop(file);
    debug!(file = %blob.name, bytes_read, "Stream released");

    Invocation {
        name: blob.name,
        bytes_read,
        latency_ms: started.elapsed().as_secs_f64() * 1000.0,
        result,
    }
}

fn record(stats: &mut HostStats, invocation: Invocation) {
    let (success, message) = match invocation.result {
        Ok(result) => {
            stats
                .dispatch_metrics
                .record_success(invocation.latency_ms, invocation.bytes_read);
            (true, result)
        }
        Err(e) => {
            stats
                .dispatch_metrics
                .record_failure(e.kind(), invocation.latency_ms);
            (false, e.to_string())
        }
    };
    stats.outcomes.push(FileOutcome {
        name: invocation.name,
        message,
        success,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ApiKey;
    use dispatcher::{DispatchSettings, LogProcessor};
    use std::io::Write;
    use tokio::io::AsyncReadExt;

    fn host(concurrency: usize) -> TriggerHost<LogProcessor> {
        let dispatcher = IngestionDispatcher::new(
            LogProcessor::new("log"),
            DispatchSettings::new(ApiKey::new("k")),
        );
        TriggerHost::new(dispatcher, concurrency)
    }

    #[test]
    fn test_blob_ref_from_path() {
        let blob = BlobRef::from_path(PathBuf::from("/data/in/invoice_42.pdf"));
        assert_eq!(blob.name, "invoice_42.pdf");
    }

    #[tokio::test]
    async fn test_host_dispatches_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut blobs = Vec::new();
        for i in 0..5 {
            let path = dir.path().join(format!("file_{i}.csv"));
            let mut f = std::fs::File::create(&path).unwrap();
            f.write_all(b"a,b,c\n").unwrap();
            blobs.push(BlobRef::from_path(path));
        }

        let host = host(2);
        let stats = host.run(blobs).await;

        assert_eq!(stats.succeeded(), 5);
        assert_eq!(stats.failed(), 0);
        assert_eq!(stats.outcomes.len(), 5);
        assert!(stats.outcomes.iter().all(|o| o.message.starts_with("processed file_")));
        assert_eq!(host.dispatcher().metrics().snapshot().bytes_read, 30);
    }

    /// Reads only the first two bytes of each stream
    struct HeaderProcessor;

    impl Processor for HeaderProcessor {
        fn name(&self) -> &str {
            "header"
        }

        async fn run<R>(
            &self,
            _context: contracts::RequestContext,
            content: &mut R,
        ) -> Result<String, ContractError>
        where
            R: tokio::io::AsyncRead + Unpin + Send,
        {
            let mut magic = [0u8; 2];
            content.read_exact(&mut magic).await?;
            Ok(format!("magic {:02x}{:02x}", magic[0], magic[1]))
        }
    }

    #[tokio::test]
    async fn test_host_counts_consumed_bytes_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoice_42.pdf");
        std::fs::write(&path, b"%PDF-1.7 body").unwrap();

        let dispatcher = IngestionDispatcher::new(
            HeaderProcessor,
            DispatchSettings::new(ApiKey::new("k")),
        );
        let stats = TriggerHost::new(dispatcher, 1)
            .run(vec![BlobRef::from_path(path)])
            .await;

        assert_eq!(stats.succeeded(), 1);
        assert_eq!(stats.outcomes[0].message, "magic 2550");
        assert_eq!(stats.dispatch_metrics.bytes_read, 2);
    }

    #[tokio::test]
    async fn test_host_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let blob = BlobRef::from_path(dir.path().join("absent.bin"));

        let stats = host(1).run(vec![blob]).await;

        assert_eq!(stats.failed(), 1);
        assert_eq!(stats.dispatch_metrics.failures.get("io"), Some(&1));
        assert!(!stats.outcomes[0].success);
    }

    #[tokio::test]
    async fn test_host_surfaces_invalid_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"x").unwrap();
        let blob = BlobRef {
            path,
            name: String::new(),
        };

        let host = host(1);
        let stats = host.run(vec![blob]).await;

        assert_eq!(stats.dispatch_metrics.failures.get("invalid_input"), Some(&1));
        assert_eq!(host.dispatcher().metrics().snapshot().rejected, 1);
    }
}
