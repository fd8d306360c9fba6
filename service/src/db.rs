//! Store connection wrapper that survives the remote database dropping idle
//! connections: a failed operation that looks like a dead connection is retried
//! exactly once on a freshly opened connection.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use log::{info, warn};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction, DbBackend,
    DbErr, ExecResult, QueryResult, Statement, TransactionTrait,
};

/// Opens new store connections. The wrapper calls it once at start and again
/// whenever the current connection is found to be dead.
#[rocket::async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<DatabaseConnection, DbErr>;
}

pub struct UrlConnector(pub ConnectOptions);

#[rocket::async_trait]
impl Connector for UrlConnector {
    async fn connect(&self) -> Result<DatabaseConnection, DbErr> {
        Database::connect(self.0.clone()).await
    }
}

/// Rows per multi-row insert, keeps statements well under bind parameter limits.
pub const BATCH_SIZE: usize = 500;

const STALE_MARKERS: [&str; 7] = [
    "connection closed",
    "server closed the connection",
    "terminating connection",
    "connection reset",
    "broken pipe",
    "ssl syscall",
    "pool timed out",
];

/// Whether the error means the connection itself is gone rather than the statement being bad.
pub fn is_stale_connection(err: &DbErr) -> bool {
    match err {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => true,
        other => {
            let message = other.to_string().to_lowercase();
            STALE_MARKERS.iter().any(|marker| message.contains(marker))
        }
    }
}

struct Inner {
    current: RwLock<Arc<DatabaseConnection>>,
    connector: Arc<dyn Connector>,
    backend: DbBackend,
    reconnects: AtomicU64,
}

#[derive(Clone)]
pub struct ResilientConnection {
    inner: Arc<Inner>,
}

impl ResilientConnection {
    pub async fn connect(connector: Arc<dyn Connector>) -> Result<Self, DbErr> {
        let conn = connector.connect().await?;
        Ok(Self {
            inner: Arc::new(Inner {
                backend: conn.get_database_backend(),
                current: RwLock::new(Arc::new(conn)),
                connector,
                reconnects: AtomicU64::new(0),
            }),
        })
    }

    /// Connection currently in use. Do not hold on to it across unrelated work,
    /// it is replaced on reconnect.
    pub fn current(&self) -> Arc<DatabaseConnection> {
        self.inner
            .current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn reconnect_count(&self) -> u64 {
        self.inner.reconnects.load(Ordering::Relaxed)
    }

    async fn reconnect(&self, failed: &Arc<DatabaseConnection>) -> Result<(), DbErr> {
        // Another caller may already have replaced the dead connection.
        if !Arc::ptr_eq(failed, &self.current()) {
            return Ok(());
        }
        let fresh = Arc::new(self.inner.connector.connect().await?);
        *self.inner.current.write().unwrap_or_else(|e| e.into_inner()) = fresh;
        let count = self.inner.reconnects.fetch_add(1, Ordering::Relaxed) + 1;
        info!("Reconnected to the database (reconnect #{count})");
        Ok(())
    }

    async fn with_retry<T, F, Fut>(&self, op: F) -> Result<T, DbErr>
    where
        F: Fn(Arc<DatabaseConnection>) -> Fut,
        Fut: Future<Output = Result<T, DbErr>>,
    {
        let conn = self.current();
        match op(conn.clone()).await {
            Err(err) if is_stale_connection(&err) => {
                warn!("Stale database connection ({err}), reconnecting and retrying once");
                self.reconnect(&conn).await?;
                op(self.current()).await
            }
            other => other,
        }
    }

    /// Runs `callback` inside a transaction, committing on `Ok`. A transaction
    /// that failed is rolled back, and if the failure was a dead connection the
    /// whole callback is run once more on a new connection, so it must be safe
    /// to call twice.
    pub async fn transaction<F, T>(&self, callback: F) -> Result<T, DbErr>
    where
        F: for<'c> Fn(
                &'c DatabaseTransaction,
            ) -> Pin<Box<dyn Future<Output = Result<T, DbErr>> + Send + 'c>>
            + Send
            + Sync,
        T: Send,
    {
        let conn = self.current();
        match run_transaction(&conn, &callback).await {
            Err(err) if is_stale_connection(&err) => {
                warn!("Transaction hit a stale connection ({err}), reconnecting and retrying once");
                self.reconnect(&conn).await?;
                run_transaction(&self.current(), &callback).await
            }
            other => other,
        }
    }
}

async fn run_transaction<F, T>(conn: &DatabaseConnection, callback: &F) -> Result<T, DbErr>
where
    F: for<'c> Fn(
        &'c DatabaseTransaction,
    ) -> Pin<Box<dyn Future<Output = Result<T, DbErr>> + Send + 'c>>,
{
    let txn = conn.begin().await?;
    match callback(&txn).await {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) = txn.rollback().await {
                warn!("Rollback after failed transaction also failed: {rollback}");
            }
            Err(err)
        }
    }
}

#[rocket::async_trait]
impl ConnectionTrait for ResilientConnection {
    fn get_database_backend(&self) -> DbBackend {
        self.inner.backend
    }

    async fn execute(&self, stmt: Statement) -> Result<ExecResult, DbErr> {
        self.with_retry(|conn| {
            let stmt = stmt.clone();
            async move { conn.execute(stmt).await }
        })
        .await
    }

    async fn execute_unprepared(&self, sql: &str) -> Result<ExecResult, DbErr> {
        self.with_retry(|conn| async move { conn.execute_unprepared(sql).await })
            .await
    }

    async fn query_one(&self, stmt: Statement) -> Result<Option<QueryResult>, DbErr> {
        self.with_retry(|conn| {
            let stmt = stmt.clone();
            async move { conn.query_one(stmt).await }
        })
        .await
    }

    async fn query_all(&self, stmt: Statement) -> Result<Vec<QueryResult>, DbErr> {
        self.with_retry(|conn| {
            let stmt = stmt.clone();
            async move { conn.query_all(stmt).await }
        })
        .await
    }

    fn is_mock_connection(&self) -> bool {
        self.current().is_mock_connection()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{MockDatabase, MockExecResult, RuntimeErr};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct QueuedConnector {
        connections: Mutex<VecDeque<DatabaseConnection>>,
        opened: AtomicU64,
    }

    impl QueuedConnector {
        fn new(connections: Vec<DatabaseConnection>) -> Arc<Self> {
            Arc::new(Self {
                connections: Mutex::new(connections.into()),
                opened: AtomicU64::new(0),
            })
        }
    }

    #[rocket::async_trait]
    impl Connector for QueuedConnector {
        async fn connect(&self) -> Result<DatabaseConnection, DbErr> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            self.connections
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| DbErr::Conn(RuntimeErr::Internal("no more connections".into())))
        }
    }

    fn dropped() -> DbErr {
        DbErr::Conn(RuntimeErr::Internal(
            "server closed the connection unexpectedly".into(),
        ))
    }

    fn ok_exec() -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }
    }

    fn stmt() -> Statement {
        Statement::from_string(DbBackend::Postgres, "UPDATE golfer SET name = 'x'")
    }

    #[test]
    fn classifies_stale_errors() {
        assert!(is_stale_connection(&dropped()));
        assert!(is_stale_connection(&DbErr::Exec(RuntimeErr::Internal(
            "SSL SYSCALL error: EOF detected".into()
        ))));
        assert!(is_stale_connection(&DbErr::Query(RuntimeErr::Internal(
            "error communicating with database: Broken pipe".into()
        ))));
        assert!(!is_stale_connection(&DbErr::Exec(RuntimeErr::Internal(
            "duplicate key value violates unique constraint".into()
        ))));
        assert!(!is_stale_connection(&DbErr::RecordNotFound("x".into())));
    }

    #[tokio::test]
    async fn retries_once_on_a_fresh_connection() {
        let broken = MockDatabase::new(DbBackend::Postgres)
            .append_exec_errors([dropped()])
            .into_connection();
        let healthy = MockDatabase::new(DbBackend::Postgres)
            .append_exec_results([ok_exec()])
            .into_connection();
        let connector = QueuedConnector::new(vec![broken, healthy]);
        let db = ResilientConnection::connect(connector.clone()).await.unwrap();

        let res = db.execute(stmt()).await.unwrap();
        assert_eq!(res.rows_affected(), 1);
        assert_eq!(db.reconnect_count(), 1);
        assert_eq!(connector.opened.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn second_failure_propagates() {
        let broken = MockDatabase::new(DbBackend::Postgres)
            .append_exec_errors([dropped()])
            .into_connection();
        let also_broken = MockDatabase::new(DbBackend::Postgres)
            .append_exec_errors([dropped()])
            .into_connection();
        let db = ResilientConnection::connect(QueuedConnector::new(vec![broken, also_broken]))
            .await
            .unwrap();

        assert!(db.execute(stmt()).await.is_err());
        assert_eq!(db.reconnect_count(), 1);
    }

    #[tokio::test]
    async fn statement_errors_are_not_retried() {
        let failing = MockDatabase::new(DbBackend::Postgres)
            .append_exec_errors([DbErr::Exec(RuntimeErr::Internal(
                "syntax error at or near".into(),
            ))])
            .into_connection();
        let connector = QueuedConnector::new(vec![failing]);
        let db = ResilientConnection::connect(connector.clone()).await.unwrap();

        assert!(db.execute(stmt()).await.is_err());
        assert_eq!(db.reconnect_count(), 0);
        assert_eq!(connector.opened.load(Ordering::SeqCst), 1);
    }

    async fn counted_update(db: &ResilientConnection, attempts: Arc<AtomicU64>) -> Result<u64, DbErr> {
        db.transaction(move |txn| {
            let attempts = attempts.clone();
            Box::pin(async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Ok(txn.execute(stmt()).await?.rows_affected())
            })
        })
        .await
    }

    #[tokio::test]
    async fn transaction_is_rerun_on_a_fresh_connection() {
        let broken = MockDatabase::new(DbBackend::Postgres)
            .append_exec_errors([dropped()])
            .into_connection();
        let healthy = MockDatabase::new(DbBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 3,
            }])
            .into_connection();
        let connector = QueuedConnector::new(vec![broken, healthy]);
        let db = ResilientConnection::connect(connector.clone()).await.unwrap();
        let attempts = Arc::new(AtomicU64::new(0));

        let affected = counted_update(&db, attempts.clone()).await.unwrap();
        assert_eq!(affected, 3);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(db.reconnect_count(), 1);
        assert_eq!(connector.opened.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn transaction_gives_up_after_second_dead_connection() {
        let broken = MockDatabase::new(DbBackend::Postgres)
            .append_exec_errors([dropped()])
            .into_connection();
        let also_broken = MockDatabase::new(DbBackend::Postgres)
            .append_exec_errors([dropped()])
            .into_connection();
        let connector = QueuedConnector::new(vec![broken, also_broken]);
        let db = ResilientConnection::connect(connector.clone()).await.unwrap();
        let attempts = Arc::new(AtomicU64::new(0));

        let err = counted_update(&db, attempts.clone()).await.unwrap_err();
        assert!(is_stale_connection(&err));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(db.reconnect_count(), 1);
        assert_eq!(connector.opened.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_transaction_is_not_rerun_for_statement_errors() {
        let failing = MockDatabase::new(DbBackend::Postgres)
            .append_exec_errors([DbErr::Exec(RuntimeErr::Internal(
                "duplicate key value violates unique constraint".into(),
            ))])
            .into_connection();
        let connector = QueuedConnector::new(vec![failing]);
        let db = ResilientConnection::connect(connector.clone()).await.unwrap();
        let attempts = Arc::new(AtomicU64::new(0));

        let err = counted_update(&db, attempts.clone()).await.unwrap_err();
        assert!(!is_stale_connection(&err));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(db.reconnect_count(), 0);
        assert_eq!(connector.opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reports_backend_of_wrapped_connection() {
        let conn = MockDatabase::new(DbBackend::Sqlite).into_connection();
        let db = ResilientConnection::connect(QueuedConnector::new(vec![conn]))
            .await
            .unwrap();
        assert_eq!(db.get_database_backend(), DbBackend::Sqlite);
        assert!(db.is_mock_connection());
    }
}
