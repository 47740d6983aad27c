use crate::db::ProductRepository;
use crate::models::{Product, ProductChanges, SyncStatus};
use crate::remote::RemoteCatalog;

/// Outcome of driving the state machine for one local mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The remote call succeeded and the product is now synced
    Synced,
    /// The remote call failed; the local mutation stands and the product
    /// is marked `sync_failed`
    Failed { warning: String },
    /// The mutation did not warrant a remote call
    Skipped,
    /// Explicit sync found nothing to do
    AlreadySynced,
}

/// Errors from the sync engine. Remote failures are absorbed into
/// [`SyncOutcome::Failed`]; only local store failures surface as errors.
#[derive(Debug)]
pub enum SyncEngineError {
    Store(sqlx::Error),
}

impl std::fmt::Display for SyncEngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncEngineError::Store(e) => write!(f, "Local store error: {}", e),
        }
    }
}

impl std::error::Error for SyncEngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncEngineError::Store(e) => Some(e),
        }
    }
}

impl From<sqlx::Error> for SyncEngineError {
    fn from(e: sqlx::Error) -> Self {
        SyncEngineError::Store(e)
    }
}

/// The sync state machine. Owns no state of its own; every transition
/// reads the product row the caller passed in and commits the resulting
/// status through the repository before returning.
pub struct SyncEngine<'a> {
    repo: &'a ProductRepository,
    remote: &'a RemoteCatalog,
}

impl<'a> SyncEngine<'a> {
    pub fn new(repo: &'a ProductRepository, remote: &'a RemoteCatalog) -> Self {
        Self { repo, remote }
    }

    /// A product was just persisted locally: push the first remote create.
    ///
    /// On success the remote-assigned id and `synced` are committed; on
    /// failure the product stays without a remote id, marked `sync_failed`.
    pub async fn after_create(
        &self,
        product: &Product,
    ) -> Result<(Product, SyncOutcome), SyncEngineError> {
        match self.remote.create_product(product).await {
            Ok(remote) => {
                let committed = self
                    .repo
                    .update_sync_state(product.id, SyncStatus::Synced, Some(remote.id))
                    .await?;
                Ok((committed, SyncOutcome::Synced))
            }
            Err(e) => {
                tracing::warn!("Remote create failed for product {}: {}", product.id, e);
                let committed = self
                    .repo
                    .update_sync_state(product.id, SyncStatus::SyncFailed, None)
                    .await?;
                Ok((committed, failed(&e.to_string())))
            }
        }
    }

    /// A local update was applied: propagate it only if the product was in
    /// sync beforehand. Products that are `local_only` or `sync_failed`
    /// keep their local edit and wait for an explicit sync.
    ///
    /// `product` is the row as it was before the local update; `changes`
    /// is the partial diff that was applied.
    pub async fn after_update(
        &self,
        product: &Product,
        changes: &ProductChanges,
    ) -> Result<(Option<Product>, SyncOutcome), SyncEngineError> {
        let remote_id = match product.remote_id {
            Some(id) if product.status == SyncStatus::Synced => id,
            _ => return Ok((None, SyncOutcome::Skipped)),
        };

        match self.remote.update_product(remote_id, changes).await {
            Ok(_) => {
                let committed = self
                    .repo
                    .update_sync_state(product.id, SyncStatus::Synced, None)
                    .await?;
                Ok((Some(committed), SyncOutcome::Synced))
            }
            Err(e) => {
                tracing::warn!("Remote update failed for product {}: {}", product.id, e);
                let committed = self
                    .repo
                    .update_sync_state(product.id, SyncStatus::SyncFailed, None)
                    .await?;
                Ok((Some(committed), failed(&e.to_string())))
            }
        }
    }

    /// Explicit sync request. Already-synced products are a no-op; a
    /// product with a remote id gets a full update, one without gets its
    /// first create.
    pub async fn resync(
        &self,
        product: &Product,
    ) -> Result<(Product, SyncOutcome), SyncEngineError> {
        if product.status == SyncStatus::Synced {
            return Ok((product.clone(), SyncOutcome::AlreadySynced));
        }

        let result = match product.remote_id {
            Some(remote_id) => self
                .remote
                .update_product(remote_id, &all_fields(product))
                .await
                .map(|remote| remote.id),
            None => self
                .remote
                .create_product(product)
                .await
                .map(|remote| remote.id),
        };

        match result {
            Ok(remote_id) => {
                let committed = self
                    .repo
                    .update_sync_state(product.id, SyncStatus::Synced, Some(remote_id))
                    .await?;
                Ok((committed, SyncOutcome::Synced))
            }
            Err(e) => {
                tracing::warn!("Sync failed for product {}: {}", product.id, e);
                let committed = self
                    .repo
                    .update_sync_state(product.id, SyncStatus::SyncFailed, None)
                    .await?;
                Ok((committed, failed(&e.to_string())))
            }
        }
    }

    /// Deletes the product. The remote copy is removed best-effort first;
    /// the local row goes away regardless of the remote outcome. Returns
    /// the warning to surface when remote deletion failed.
    pub async fn delete(&self, product: &Product) -> Result<Option<String>, SyncEngineError> {
        let mut warning = None;

        if product.is_synced() {
            if let Some(remote_id) = product.remote_id {
                if let Err(e) = self.remote.delete_product(remote_id).await {
                    tracing::warn!(
                        "Remote deletion failed for product {} (remote {}): {}",
                        product.id,
                        remote_id,
                        e
                    );
                    warning = Some(format!("Remote deletion failed: {}", e));
                }
            }
        }

        self.repo.delete(product.id).await?;
        Ok(warning)
    }
}

fn failed(message: &str) -> SyncOutcome {
    SyncOutcome::Failed {
        warning: format!("Remote sync failed: {}", message),
    }
}

/// Every user-editable field of the product, for the full push an explicit
/// sync performs against an existing remote copy.
fn all_fields(product: &Product) -> ProductChanges {
    ProductChanges {
        name: Some(product.name.clone()),
        description: Some(product.description.clone().unwrap_or_default()),
        price: Some(product.price.clone()),
        image_url: product.image_url.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RemoteCredentials;
    use crate::db::{init_db, NewProduct, ProductRepository};
    use crate::remote::SignedClient;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// One-shot HTTP stub: serves each scripted (status, body) response on
    /// its own connection and records the requests it saw.
    async fn spawn_stub(script: Vec<(u16, &'static str)>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = requests.clone();

        tokio::spawn(async move {
            for (code, body) in script {
                let (mut sock, _) = listener.accept().await.unwrap();

                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                loop {
                    let n = sock.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                    let text = String::from_utf8_lossy(&buf);
                    if let Some(header_end) = text.find("\r\n\r\n") {
                        let content_length = text
                            .lines()
                            .find_map(|l| {
                                l.to_ascii_lowercase().strip_prefix("content-length: ").map(str::to_string)
                            })
                            .and_then(|v| v.trim().parse::<usize>().ok())
                            .unwrap_or(0);
                        if buf.len() >= header_end + 4 + content_length {
                            break;
                        }
                    }
                }
                recorded
                    .lock()
                    .unwrap()
                    .push(String::from_utf8_lossy(&buf).into_owned());

                let reason = match code {
                    200 => "OK",
                    201 => "Created",
                    500 => "Internal Server Error",
                    _ => "Unknown",
                };
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    code,
                    reason,
                    body.len(),
                    body
                );
                sock.write_all(response.as_bytes()).await.unwrap();
                let _ = sock.shutdown().await;
            }
        });

        (format!("http://{}", addr), requests)
    }

    struct TestContext {
        repo: ProductRepository,
        requests: Arc<Mutex<Vec<String>>>,
        remote: RemoteCatalog,
        _temp_dir: TempDir,
    }

    async fn setup(script: Vec<(u16, &'static str)>) -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(temp_dir.path().join("test.db")).await.unwrap();
        let (base_url, requests) = spawn_stub(script).await;

        let client = SignedClient::new(RemoteCredentials {
            api_url: base_url,
            consumer_key: "ck_test".to_string(),
            consumer_secret: "cs_secret".to_string(),
        });

        TestContext {
            repo: ProductRepository::new(pool),
            requests,
            remote: RemoteCatalog::new(client),
            _temp_dir: temp_dir,
        }
    }

    fn mug() -> NewProduct {
        NewProduct {
            name: "Mug".to_string(),
            description: None,
            price: "9.99".to_string(),
            image_url: None,
            owner: "alice".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_success_commits_synced() {
        let ctx = setup(vec![(201, r#"{"id":4242,"name":"Mug"}"#)]).await;
        let engine = SyncEngine::new(&ctx.repo, &ctx.remote);

        let product = ctx.repo.create(&mug()).await.unwrap();
        let (committed, outcome) = engine.after_create(&product).await.unwrap();

        assert_eq!(outcome, SyncOutcome::Synced);
        assert_eq!(committed.status, SyncStatus::Synced);
        assert_eq!(committed.remote_id, Some(4242));

        let requests = ctx.requests.lock().unwrap();
        assert!(requests[0].starts_with("POST /products HTTP/1.1"));
        assert!(requests[0].contains(r#""regular_price":"9.99""#));
        assert!(requests[0].contains(r#""status":"publish""#));
    }

    #[tokio::test]
    async fn test_create_failure_keeps_row_marks_failed() {
        let ctx = setup(vec![(500, r#"{"message":"boom"}"#)]).await;
        let engine = SyncEngine::new(&ctx.repo, &ctx.remote);

        let product = ctx.repo.create(&mug()).await.unwrap();
        let (committed, outcome) = engine.after_create(&product).await.unwrap();

        match outcome {
            SyncOutcome::Failed { warning } => assert!(warning.contains("boom")),
            other => panic!("expected Failed, got {:?}", other),
        }
        assert_eq!(committed.status, SyncStatus::SyncFailed);
        assert_eq!(committed.remote_id, None);

        // The local row survives the remote failure
        let stored = ctx.repo.get(product.id, "alice").await.unwrap().unwrap();
        assert_eq!(stored.name, "Mug");
    }

    #[tokio::test]
    async fn test_update_synced_pushes_partial_payload() {
        let ctx = setup(vec![(200, r#"{"id":4242}"#)]).await;
        let engine = SyncEngine::new(&ctx.repo, &ctx.remote);

        let product = ctx.repo.create(&mug()).await.unwrap();
        let synced = ctx
            .repo
            .update_sync_state(product.id, SyncStatus::Synced, Some(4242))
            .await
            .unwrap();

        let changes = ProductChanges {
            price: Some("12.50".to_string()),
            ..Default::default()
        };
        ctx.repo.update_fields(product.id, &changes).await.unwrap();
        let (committed, outcome) = engine.after_update(&synced, &changes).await.unwrap();

        assert_eq!(outcome, SyncOutcome::Synced);
        assert_eq!(committed.unwrap().status, SyncStatus::Synced);

        let requests = ctx.requests.lock().unwrap();
        assert!(requests[0].starts_with("PUT /products/4242 HTTP/1.1"));
        // Partial update: only the supplied field crosses the wire
        assert!(requests[0].contains(r#"{"regular_price":"12.50"}"#));
    }

    #[tokio::test]
    async fn test_update_not_synced_is_not_propagated() {
        let ctx = setup(vec![]).await;
        let engine = SyncEngine::new(&ctx.repo, &ctx.remote);

        let product = ctx.repo.create(&mug()).await.unwrap();
        let changes = ProductChanges {
            price: Some("12.50".to_string()),
            ..Default::default()
        };
        ctx.repo.update_fields(product.id, &changes).await.unwrap();

        let (committed, outcome) = engine.after_update(&product, &changes).await.unwrap();

        assert_eq!(outcome, SyncOutcome::Skipped);
        assert!(committed.is_none());
        assert!(ctx.requests.lock().unwrap().is_empty());

        // Status untouched
        let stored = ctx.repo.get(product.id, "alice").await.unwrap().unwrap();
        assert_eq!(stored.status, SyncStatus::LocalOnly);
        assert_eq!(stored.price, "12.50");
    }

    #[tokio::test]
    async fn test_resync_already_synced_is_noop() {
        let ctx = setup(vec![]).await;
        let engine = SyncEngine::new(&ctx.repo, &ctx.remote);

        let product = ctx.repo.create(&mug()).await.unwrap();
        let synced = ctx
            .repo
            .update_sync_state(product.id, SyncStatus::Synced, Some(4242))
            .await
            .unwrap();

        let (_, outcome) = engine.resync(&synced).await.unwrap();
        assert_eq!(outcome, SyncOutcome::AlreadySynced);

        // Idempotent: a second call is still a no-op with no request sent
        let (_, outcome) = engine.resync(&synced).await.unwrap();
        assert_eq!(outcome, SyncOutcome::AlreadySynced);
        assert!(ctx.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resync_with_remote_id_updates() {
        let ctx = setup(vec![(200, r#"{"id":4242}"#)]).await;
        let engine = SyncEngine::new(&ctx.repo, &ctx.remote);

        let product = ctx.repo.create(&mug()).await.unwrap();
        let failed = ctx
            .repo
            .update_sync_state(product.id, SyncStatus::SyncFailed, Some(4242))
            .await
            .unwrap();

        let (committed, outcome) = engine.resync(&failed).await.unwrap();

        assert_eq!(outcome, SyncOutcome::Synced);
        assert_eq!(committed.status, SyncStatus::Synced);
        assert_eq!(committed.remote_id, Some(4242));

        let requests = ctx.requests.lock().unwrap();
        assert!(requests[0].starts_with("PUT /products/4242 HTTP/1.1"));
        // The full push carries every user-editable field
        assert!(requests[0].contains(r#""name":"Mug""#));
        assert!(requests[0].contains(r#""regular_price":"9.99""#));
    }

    #[tokio::test]
    async fn test_resync_without_remote_id_creates() {
        let ctx = setup(vec![(201, r#"{"id":777}"#)]).await;
        let engine = SyncEngine::new(&ctx.repo, &ctx.remote);

        let product = ctx.repo.create(&mug()).await.unwrap();
        let failed = ctx
            .repo
            .update_sync_state(product.id, SyncStatus::SyncFailed, None)
            .await
            .unwrap();

        let (committed, outcome) = engine.resync(&failed).await.unwrap();

        assert_eq!(outcome, SyncOutcome::Synced);
        assert_eq!(committed.status, SyncStatus::Synced);
        assert_eq!(committed.remote_id, Some(777));
        assert!(ctx.requests.lock().unwrap()[0].starts_with("POST /products HTTP/1.1"));

        // A second sync right after a successful one is a pure no-op
        let (_, outcome) = engine.resync(&committed).await.unwrap();
        assert_eq!(outcome, SyncOutcome::AlreadySynced);
        assert_eq!(ctx.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_remote_failure_still_removes_row() {
        let ctx = setup(vec![(500, r#"{"message":"cannot delete"}"#)]).await;
        let engine = SyncEngine::new(&ctx.repo, &ctx.remote);

        let product = ctx.repo.create(&mug()).await.unwrap();
        let synced = ctx
            .repo
            .update_sync_state(product.id, SyncStatus::Synced, Some(4242))
            .await
            .unwrap();

        let warning = engine.delete(&synced).await.unwrap();

        assert!(warning.unwrap().contains("cannot delete"));
        assert!(ctx.repo.get(product.id, "alice").await.unwrap().is_none());

        let requests = ctx.requests.lock().unwrap();
        assert!(requests[0].starts_with("DELETE /products/4242?force=true HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_delete_local_only_skips_remote() {
        let ctx = setup(vec![]).await;
        let engine = SyncEngine::new(&ctx.repo, &ctx.remote);

        let product = ctx.repo.create(&mug()).await.unwrap();
        let warning = engine.delete(&product).await.unwrap();

        assert!(warning.is_none());
        assert!(ctx.requests.lock().unwrap().is_empty());
        assert!(ctx.repo.get(product.id, "alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_end_to_end_create_then_failed_update() {
        let ctx = setup(vec![
            (201, r#"{"id":4242,"name":"Mug"}"#),
            (500, r#"{"message":"server exploded"}"#),
        ])
        .await;
        let engine = SyncEngine::new(&ctx.repo, &ctx.remote);

        // Create with a working remote: synced, remote id assigned
        let product = ctx.repo.create(&mug()).await.unwrap();
        let (after_create, outcome) = engine.after_create(&product).await.unwrap();
        assert_eq!(outcome, SyncOutcome::Synced);
        assert_eq!(after_create.remote_id, Some(4242));

        // Update while the remote returns 500: sync_failed, remote id
        // unchanged, local edit kept
        let changes = ProductChanges {
            price: Some("11.00".to_string()),
            ..Default::default()
        };
        ctx.repo.update_fields(product.id, &changes).await.unwrap();
        let (committed, outcome) = engine.after_update(&after_create, &changes).await.unwrap();

        match outcome {
            SyncOutcome::Failed { warning } => assert!(warning.contains("server exploded")),
            other => panic!("expected Failed, got {:?}", other),
        }
        let stored = committed.unwrap();
        assert_eq!(stored.status, SyncStatus::SyncFailed);
        assert_eq!(stored.remote_id, Some(4242));
        assert_eq!(stored.price, "11.00");
    }
}
