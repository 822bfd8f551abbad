//! Shared fixtures for the end-to-end suites

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use strata_client::{
    Database, DatabaseConfig, PartitionConfig, PartitionId, RetryPolicy, SessionConfig,
};
use strata_testing::{serve_tcp, Replica, TestCluster};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Route client logs to the test writer
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn config() -> DatabaseConfig {
    let mut config = DatabaseConfig::default();
    config.identity.namespace = "e2e".to_string();
    config.session = SessionConfig::default()
        .with_timeout(Duration::from_secs(5))
        .with_request_timeout(Duration::from_secs(2))
        .with_retry(
            RetryPolicy::new()
                .with_max_retries(3)
                .with_base_delay_ms(1)
                .with_max_delay_ms(5),
        );
    config
}

/// Database over an in-process cluster of `partitions` replicas
pub async fn open(partitions: u32) -> (TestCluster, Database) {
    init_tracing();
    let cluster = TestCluster::start(partitions);
    let db = Database::open(config(), &cluster.configs(), &cluster.connector())
        .await
        .expect("database opens");
    (cluster, db)
}

/// Replicas served over loopback TCP
pub struct TcpCluster {
    pub replicas: Vec<Arc<Replica>>,
    pub configs: Vec<PartitionConfig>,
    servers: Vec<JoinHandle<()>>,
}

impl TcpCluster {
    pub async fn start(partitions: u32) -> Self {
        let mut cluster = Self {
            replicas: Vec::new(),
            configs: Vec::new(),
            servers: Vec::new(),
        };
        for id in 1..=partitions {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let port = listener.local_addr().unwrap().port();
            let replica = Replica::new(
                PartitionId::new(id).unwrap(),
                strata_client::Address::new("127.0.0.1", port),
            );
            cluster.servers.push(serve_tcp(listener, replica.clone()));
            cluster.replicas.push(replica);
            cluster
                .configs
                .push(PartitionConfig::new(id, "127.0.0.1", port));
        }
        cluster
    }
}

impl Drop for TcpCluster {
    fn drop(&mut self) {
        for server in &self.servers {
            server.abort();
        }
    }
}
