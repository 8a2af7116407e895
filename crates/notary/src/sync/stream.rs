//! Streaming a store's grants to a remote caller.

use std::sync::Arc;

use notary_proto::Grant;
use notary_storage::{StorageError, SyncStorage};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tonic::Status;
use tracing::{debug, warn};

/// Capacity of the channel between enumeration and the response writer.
pub(crate) const ENUMERATION_BUFFER: usize = 200;

/// Most grants per response message.
pub(crate) const BATCH_SIZE: usize = 100;

/// Response messages buffered ahead of the transport.
const RESPONSE_BUFFER: usize = 4;

/// Enumerate `storage` into a response stream.
///
/// Grants for which `skip` is true are left out; the rest are batched into
/// messages of up to [`BATCH_SIZE`] built by `wrap`. A partial batch is
/// always flushed before an enumeration error is reported as `Internal`.
/// Dropping the stream cancels enumeration.
pub(crate) fn stream_grants<T, S, W>(
    storage: Arc<dyn SyncStorage>,
    skip: S,
    wrap: W,
) -> ReceiverStream<Result<T, Status>>
where
    T: Send + 'static,
    S: Fn(&Grant) -> bool + Send + 'static,
    W: Fn(Vec<Grant>) -> T + Send + 'static,
{
    let (out_tx, out_rx) = mpsc::channel(RESPONSE_BUFFER);
    let (grant_tx, grant_rx) = mpsc::channel(ENUMERATION_BUFFER);
    let cancel = CancellationToken::new();

    let enumeration = tokio::spawn({
        let cancel = cancel.clone();
        async move { storage.sync(grant_tx, cancel).await }
    });

    tokio::spawn(async move {
        let sent = forward(grant_rx, &out_tx, &cancel, skip, wrap).await;
        let result = enumeration
            .await
            .unwrap_or_else(|e| Err(StorageError::Internal(e.to_string())));
        match result {
            Ok(()) => debug!(sent, "grant stream complete"),
            Err(err) => {
                warn!(sent, error = %err, "grant enumeration failed");
                // The receiver may already be gone; the error is logged either way.
                let _ = out_tx.send(Err(Status::internal(err.to_string()))).await;
            },
        }
    });

    ReceiverStream::new(out_rx)
}

/// Batch grants from `grant_rx` onto `out_tx` until enumeration ends or the
/// receiver goes away, in which case `cancel` is fired. Returns the number of
/// grants handed to the transport.
async fn forward<T, S, W>(
    mut grant_rx: mpsc::Receiver<Grant>,
    out_tx: &mpsc::Sender<Result<T, Status>>,
    cancel: &CancellationToken,
    skip: S,
    wrap: W,
) -> usize
where
    S: Fn(&Grant) -> bool,
    W: Fn(Vec<Grant>) -> T,
{
    let mut batch = Vec::with_capacity(BATCH_SIZE);
    let mut sent = 0usize;
    loop {
        tokio::select! {
            () = out_tx.closed() => {
                debug!(sent, "stream receiver went away, cancelling enumeration");
                cancel.cancel();
                return sent;
            },
            next = grant_rx.recv() => match next {
                Some(grant) if skip(&grant) => {},
                Some(grant) => {
                    batch.push(grant);
                    if batch.len() >= BATCH_SIZE {
                        let full = std::mem::replace(&mut batch, Vec::with_capacity(BATCH_SIZE));
                        let len = full.len();
                        if out_tx.send(Ok(wrap(full))).await.is_err() {
                            cancel.cancel();
                            return sent;
                        }
                        sent = sent.saturating_add(len);
                    }
                },
                None => break,
            },
        }
    }

    if !batch.is_empty() {
        let len = batch.len();
        if out_tx.send(Ok(wrap(batch))).await.is_err() {
            cancel.cancel();
            return sent;
        }
        sent = sent.saturating_add(len);
    }
    sent
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use notary_crypto::KeyPair;
    use notary_proto::Permission;
    use notary_storage::{Memory, Storage, StorageResult};
    use tokio_stream::StreamExt;
    use tonic::Code;
    use tracing_subscriber::fmt::MakeWriter;

    use super::*;

    fn grants(count: usize) -> Vec<Grant> {
        (0..count)
            .map(|_| Grant::for_key(&KeyPair::generate().export_public_key(), Permission::none()))
            .collect()
    }

    /// Emits its grants, then fails.
    struct Failing(Memory);

    #[async_trait]
    impl Storage for Failing {
        async fn lookup(&self, fingerprint: &str) -> StorageResult<Grant> {
            self.0.lookup(fingerprint).await
        }

        async fn insert(&self, grant: Grant) -> StorageResult<Grant> {
            self.0.insert(grant).await
        }

        async fn delete(&self, grant: Grant) -> StorageResult<Grant> {
            self.0.delete(grant).await
        }
    }

    #[async_trait]
    impl SyncStorage for Failing {
        async fn sync(
            &self,
            tx: mpsc::Sender<Grant>,
            cancel: CancellationToken,
        ) -> StorageResult<()> {
            self.0.sync(tx, cancel).await?;
            Err(StorageError::Internal("disk on fire".into()))
        }
    }

    /// Enumerates nothing until cancelled, then fails.
    struct Stalling;

    #[async_trait]
    impl Storage for Stalling {
        async fn lookup(&self, fingerprint: &str) -> StorageResult<Grant> {
            Err(StorageError::NotFound(fingerprint.to_owned()))
        }

        async fn insert(&self, grant: Grant) -> StorageResult<Grant> {
            Ok(grant)
        }

        async fn delete(&self, grant: Grant) -> StorageResult<Grant> {
            Err(StorageError::NotFound(grant.fingerprint))
        }
    }

    #[async_trait]
    impl SyncStorage for Stalling {
        async fn sync(
            &self,
            _tx: mpsc::Sender<Grant>,
            cancel: CancellationToken,
        ) -> StorageResult<()> {
            cancel.cancelled().await;
            Err(StorageError::Cancelled)
        }
    }

    /// Log sink shared with the test body.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn test_batches_of_one_hundred() {
        let storage = Arc::new(Memory::from_grants(grants(250)));
        let sizes: Vec<usize> = stream_grants(storage, |_| false, |batch| batch.len())
            .map(Result::unwrap)
            .collect()
            .await;
        assert_eq!(sizes, vec![100, 100, 50]);
    }

    #[tokio::test]
    async fn test_skip_filters_grants() {
        let all = grants(10);
        let skipped = all[0].fingerprint.clone();
        let storage = Arc::new(Memory::from_grants(all));
        let received: Vec<Vec<Grant>> =
            stream_grants(storage, move |g| g.fingerprint == skipped, |batch| batch)
                .map(Result::unwrap)
                .collect()
                .await;
        assert_eq!(received.concat().len(), 9);
    }

    #[tokio::test]
    async fn test_partial_batch_flushed_before_error() {
        let storage = Arc::new(Failing(Memory::from_grants(grants(30))));
        let items: Vec<Result<usize, Status>> =
            stream_grants(storage, |_| false, |batch| batch.len())
                .collect()
                .await;

        assert_eq!(items.len(), 2);
        assert_eq!(*items[0].as_ref().unwrap(), 30);
        assert_eq!(items[1].as_ref().unwrap_err().code(), Code::Internal);
    }

    #[tokio::test]
    async fn test_empty_store_yields_nothing() {
        let storage = Arc::new(Memory::new());
        let items: Vec<_> = stream_grants(storage, |_| false, |batch| batch)
            .collect()
            .await;
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_enumeration_error_logged_after_receiver_drops() {
        let logs = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        drop(stream_grants(Arc::new(Stalling), |_| false, |batch: Vec<Grant>| batch));

        tokio::time::timeout(Duration::from_secs(5), async {
            while !logs.contents().contains("grant enumeration failed") {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("enumeration error was never logged");
        assert!(logs.contents().contains("operation cancelled"));
    }
}
