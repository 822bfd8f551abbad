//! Shared fixtures for primitive client tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use strata_core::{Name, PrimitiveId, PrimitiveType};
use strata_primitives::Primitive;
use strata_session::{RetryPolicy, Session, SessionConfig};
use strata_testing::TestCluster;

pub fn config() -> SessionConfig {
    SessionConfig::default()
        .with_timeout(Duration::from_secs(5))
        .with_request_timeout(Duration::from_secs(2))
        .with_retry(
            RetryPolicy::new()
                .with_max_retries(3)
                .with_base_delay_ms(1)
                .with_max_delay_ms(5),
        )
}

/// One open session per partition, in ascending partition order
pub async fn sessions(cluster: &TestCluster) -> Vec<Arc<Session>> {
    let connector = cluster.connector();
    let mut sessions = Vec::new();
    for partition in cluster.partitions() {
        let session = Session::open(partition, &connector, config()).await.unwrap();
        sessions.push(Arc::new(session));
    }
    sessions
}

pub fn bind(
    sessions: &[Arc<Session>],
    primitive_type: PrimitiveType,
    name: &str,
) -> Primitive {
    let id = PrimitiveId::new(primitive_type, Name::new("test", "db", "scope", name));
    Primitive::new(id, sessions.to_vec()).unwrap()
}
