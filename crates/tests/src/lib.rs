//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 分发器行为场景测试 (mock processor + 日志捕获)
//! - 配置 -> 分发器 -> processor 的端到端测试

#[cfg(test)]
mod support {
    use std::io;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    use contracts::{ContractError, ProcessingResult, Processor, RequestContext};
    use tokio::io::{AsyncRead, AsyncReadExt};

    /// In-memory log sink for a thread-local subscriber
    #[derive(Clone, Default)]
    pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        pub fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }

        /// Lines containing every needle
        pub fn lines_with(&self, needles: &[&str]) -> Vec<String> {
            self.contents()
                .lines()
                .filter(|line| needles.iter().all(|n| line.contains(n)))
                .map(str::to_string)
                .collect()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Install a capturing subscriber for the current thread
    pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (logs, guard)
    }

    /// Processor double recording every call
    pub struct RecordingProcessor {
        pub calls: AtomicU64,
        pub contexts: Mutex<Vec<RequestContext>>,
        pub payloads: Mutex<Vec<Vec<u8>>>,
        reply: Result<String, String>,
    }

    impl RecordingProcessor {
        pub fn replying(reply: &str) -> Self {
            Self {
                calls: AtomicU64::new(0),
                contexts: Mutex::new(Vec::new()),
                payloads: Mutex::new(Vec::new()),
                reply: Ok(reply.to_string()),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                ..Self::replying("")
            }
        }

        pub fn calls(&self) -> u64 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Processor for RecordingProcessor {
        fn name(&self) -> &str {
            "recording"
        }

        async fn run<R>(
            &self,
            context: RequestContext,
            content: &mut R,
        ) -> Result<ProcessingResult, ContractError>
        where
            R: AsyncRead + Unpin + Send,
        {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut payload = Vec::new();
            content.read_to_end(&mut payload).await?;
            self.contexts.lock().unwrap().push(context);
            self.payloads.lock().unwrap().push(payload);

            match &self.reply {
                Ok(reply) => Ok(reply.clone()),
                Err(message) => Err(ContractError::processor_failure("recording", message.clone())),
            }
        }
    }
}

#[cfg(test)]
mod contract_tests {
    use contracts::{ApiKey, ConfigVersion, RequestContext, API_KEY_HEADER, CONTAINER_NAME_KEY};

    #[test]
    fn test_contracts_compile() {
        let _ = ConfigVersion::V1;
    }

    #[test]
    fn test_reserved_keys() {
        assert_eq!(API_KEY_HEADER, "x-api-key");
        assert_eq!(CONTAINER_NAME_KEY, "ContainerName");
    }

    #[test]
    fn test_context_never_prints_key() {
        let ctx = RequestContext::for_file(&ApiKey::new("43EFE991"), "a.csv");
        assert!(!format!("{ctx:?}").contains("43EFE991"));
    }
}

#[cfg(test)]
mod dispatch_scenarios {
    use std::sync::Arc;

    use contracts::{ApiKey, ContractError, IncomingFile, API_KEY_HEADER, CONTAINER_NAME_KEY};
    use dispatcher::{DispatchSettings, IngestionDispatcher};

    use crate::support::{capture_logs, RecordingProcessor};

    fn recording_dispatcher(processor: RecordingProcessor) -> IngestionDispatcher<RecordingProcessor> {
        IngestionDispatcher::new(processor, DispatchSettings::new(ApiKey::new("test-api-key")))
    }

    #[tokio::test]
    async fn test_invoice_scenario_logs_result() {
        let (logs, _guard) = capture_logs();
        let dispatcher = recording_dispatcher(RecordingProcessor::replying("processed invoice_42.pdf"));

        let mut blob: &[u8] = b"PDF-DATA";
        let result = dispatcher
            .handle(IncomingFile::new("invoice_42.pdf", &mut blob))
            .await;

        assert_eq!(result.unwrap(), "processed invoice_42.pdf");
        assert_eq!(dispatcher.processor().calls(), 1);

        let contexts = dispatcher.processor().contexts.lock().unwrap();
        assert_eq!(contexts[0].get(API_KEY_HEADER), Some("test-api-key"));
        assert_eq!(contexts[0].get(CONTAINER_NAME_KEY), Some("invoice_42.pdf"));
        assert_eq!(dispatcher.processor().payloads.lock().unwrap()[0], b"PDF-DATA");

        let info_lines = logs.lines_with(&["INFO", "processed invoice_42.pdf"]);
        assert_eq!(info_lines.len(), 1, "logs: {}", logs.contents());
        assert!(logs.lines_with(&["ERROR"]).is_empty());
    }

    #[tokio::test]
    async fn test_empty_name_scenario() {
        let (logs, _guard) = capture_logs();
        let dispatcher = recording_dispatcher(RecordingProcessor::replying("unused"));

        let mut blob: &[u8] = b"PDF-DATA";
        let err = dispatcher
            .handle(IncomingFile::new("", &mut blob))
            .await
            .unwrap_err();

        assert!(matches!(err, ContractError::InvalidInput { .. }));
        assert_eq!(dispatcher.processor().calls(), 0);
        assert_eq!(logs.lines_with(&["ERROR", "invalid_input"]).len(), 1);
    }

    #[tokio::test]
    async fn test_processor_error_logged_and_reraised() {
        let (logs, _guard) = capture_logs();
        let dispatcher = recording_dispatcher(RecordingProcessor::failing("orchestrator unavailable"));

        let mut blob: &[u8] = b"data";
        let err = dispatcher
            .handle(IncomingFile::new("a.csv", &mut blob))
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "processor 'recording' failed: orchestrator unavailable"
        );
        assert_eq!(dispatcher.processor().calls(), 1);
        assert_eq!(
            logs.lines_with(&["ERROR", "Dispatch failed", "orchestrator unavailable"])
                .len(),
            1
        );
        assert!(logs.lines_with(&["INFO", "a.csv"]).is_empty());
    }

    #[tokio::test]
    async fn test_api_key_never_logged() {
        let (logs, _guard) = capture_logs();
        let dispatcher = recording_dispatcher(RecordingProcessor::replying("done"));

        let mut blob: &[u8] = b"x";
        dispatcher
            .handle(IncomingFile::new("a.csv", &mut blob))
            .await
            .unwrap();

        assert!(!logs.contents().contains("test-api-key"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_invocations_are_independent() {
        let dispatcher = Arc::new(recording_dispatcher(RecordingProcessor::replying("ok")));

        let mut tasks = Vec::new();
        for i in 0..16 {
            let dispatcher = Arc::clone(&dispatcher);
            tasks.push(tokio::spawn(async move {
                let name = format!("file_{i}.bin");
                let payload = vec![i as u8; i + 1];
                let mut blob: &[u8] = &payload;
                dispatcher
                    .handle(IncomingFile::new(name, &mut blob))
                    .await
            }));
        }
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), "ok");
        }

        assert_eq!(dispatcher.processor().calls(), 16);
        let contexts = dispatcher.processor().contexts.lock().unwrap();
        let mut names: Vec<_> = contexts
            .iter()
            .map(|c| c.container_name().unwrap().to_string())
            .collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 16);

        let snap = dispatcher.metrics().snapshot();
        assert_eq!(snap.received, 16);
        assert_eq!(snap.succeeded, 16);
        assert_eq!(snap.bytes_read, (1..=16).sum::<u64>());
    }
}

#[cfg(test)]
mod e2e_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ApiKey, ContractError, IncomingFile};
    use dispatcher::create_dispatcher;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// End-to-end: config -> dispatcher -> FileProcessor
    #[tokio::test]
    async fn test_e2e_file_processor() {
        let dir = tempfile::tempdir().unwrap();
        let content = format!(
            r#"
[dispatcher]
timeout_ms = 5000

[processor]
name = "archive"
processor_type = "file"
[processor.params]
base_path = "{}"

[context]
Source = "blob-trigger"
"#,
            dir.path().display()
        );
        let config = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap();
        let dispatcher = create_dispatcher(&config, ApiKey::new("e2e-key")).unwrap();

        let mut blob: &[u8] = b"PDF-DATA";
        let result = dispatcher
            .handle(IncomingFile::new("invoice_42.pdf", &mut blob))
            .await
            .unwrap();
        assert_eq!(result, "stored invoice_42.pdf (8 bytes)");

        let stored = std::fs::read(dir.path().join("invoice_42.pdf")).unwrap();
        assert_eq!(stored, b"PDF-DATA");

        let manifest: serde_json::Value = serde_json::from_slice(
            &std::fs::read(dir.path().join("invoice_42.pdf.meta.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(manifest["context"]["Source"], "blob-trigger");
        assert_eq!(manifest["context"]["ContainerName"], "invoice_42.pdf");
        assert!(!manifest.to_string().contains("e2e-key"));

        // Traversal is rejected as invalid input, nothing written
        let mut blob: &[u8] = b"x";
        let err = dispatcher
            .handle(IncomingFile::new("../outside.txt", &mut blob))
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::InvalidInput { .. }));
        assert_eq!(dispatcher.metrics().snapshot().rejected, 1);
    }

    /// End-to-end: config -> dispatcher -> NetworkProcessor -> fake orchestrator
    #[tokio::test]
    async fn test_e2e_network_processor() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let orchestrator = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let header_len = socket.read_u32().await.unwrap() as usize;
            let mut header = vec![0u8; header_len];
            socket.read_exact(&mut header).await.unwrap();
            let body_len = socket.read_u64().await.unwrap() as usize;
            let mut body = vec![0u8; body_len];
            socket.read_exact(&mut body).await.unwrap();

            let header: serde_json::Value = serde_json::from_slice(&header).unwrap();
            let reply = format!(
                "OK processed {} ({} bytes)\n",
                header["ContainerName"].as_str().unwrap(),
                body.len()
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            header
        });

        let content = format!(
            r#"
[processor]
name = "orchestrator"
processor_type = "network"
[processor.params]
addr = "{addr}"
"#
        );
        let config = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap();
        let dispatcher = create_dispatcher(&config, ApiKey::new("43EF-e2e")).unwrap();

        let mut blob: &[u8] = b"PDF-DATA";
        let result = dispatcher
            .handle(IncomingFile::new("invoice_42.pdf", &mut blob))
            .await
            .unwrap();
        assert_eq!(result, "processed invoice_42.pdf (8 bytes)");

        let header = orchestrator.await.unwrap();
        assert_eq!(header["x-api-key"], "43EF-e2e");
    }

    /// A stalled orchestrator is cut off by the configured deadline
    #[tokio::test]
    async fn test_e2e_network_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let orchestrator = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            // Never answer until the test is done
            let _ = release_rx.await;
        });

        let content = format!(
            r#"
[dispatcher]
timeout_ms = 200

[processor]
name = "orchestrator"
processor_type = "network"
[processor.params]
addr = "{addr}"
"#
        );
        let config = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap();
        let dispatcher = create_dispatcher(&config, ApiKey::new("k")).unwrap();

        let mut blob: &[u8] = b"x";
        let err = dispatcher
            .handle(IncomingFile::new("slow.csv", &mut blob))
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::Timeout { .. }), "{err:?}");
        assert_eq!(dispatcher.metrics().snapshot().timed_out, 1);

        let _ = release_tx.send(());
        orchestrator.await.unwrap();
    }
}

#[cfg(test)]
mod stats_tests {
    use contracts::{ApiKey, IncomingFile};
    use dispatcher::{DispatchSettings, IngestionDispatcher};
    use observability::DispatchStatsAggregator;
    use std::time::Instant;

    use crate::support::RecordingProcessor;

    /// Aggregated summary mirrors per-invocation outcomes
    #[tokio::test]
    async fn test_summary_over_mixed_outcomes() {
        let dispatcher = IngestionDispatcher::new(
            RecordingProcessor::replying("ok"),
            DispatchSettings::new(ApiKey::new("k")),
        );
        let mut stats = DispatchStatsAggregator::new();

        for name in ["a.csv", "", "b.csv", " "] {
            let started = Instant::now();
            let mut blob: &[u8] = b"1234";
            let result = dispatcher.handle(IncomingFile::new(name, &mut blob)).await;
            let latency = started.elapsed().as_secs_f64() * 1000.0;
            match result {
                Ok(_) => stats.record_success(latency, 4),
                Err(e) => stats.record_failure(e.kind(), latency),
            }
        }

        let summary = stats.summary();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failures_by_kind.get("invalid_input"), Some(&2));
        assert_eq!(summary.bytes_read, 8);
        assert!((summary.failure_rate - 50.0).abs() < f64::EPSILON);

        let snap = dispatcher.metrics().snapshot();
        assert_eq!(snap.rejected, 2);
        assert_eq!(snap.bytes_read, 8);
    }
}
