//! A set of in-process partitions

use crate::replica::Replica;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use strata_core::{Address, Error, Partition, PartitionConfig, PartitionId, Result};
use strata_protocol::{Request, Response};
use strata_session::{Connector, ResponseReceiver, Transport};

/// Port every test partition pretends to listen on
pub const TEST_PORT: u16 = 5678;

/// Transport that hands requests straight to a replica
pub struct LocalTransport {
    replica: Arc<Replica>,
}

impl LocalTransport {
    /// Wrap a replica
    pub fn new(replica: Arc<Replica>) -> Self {
        Self { replica }
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn unary(&self, request: Request) -> Result<Response> {
        self.replica.unary(request).await
    }

    async fn stream(&self, request: Request) -> Result<ResponseReceiver> {
        self.replica.stream(request).await
    }
}

/// Connects to the replicas of a [`TestCluster`] by address
#[derive(Clone)]
pub struct TestConnector {
    replicas: Arc<HashMap<Address, Arc<Replica>>>,
    connects: Arc<AtomicUsize>,
}

impl TestConnector {
    /// Number of connections made so far
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for TestConnector {
    async fn connect(&self, partition: &Partition) -> Result<Arc<dyn Transport>> {
        let replica = self.replicas.get(&partition.address).ok_or_else(|| {
            Error::connection(partition.address.as_str(), "no such partition")
        })?;
        if replica.faults().is_unreachable() {
            return Err(Error::connection(
                partition.address.as_str(),
                "partition unreachable",
            ));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(LocalTransport::new(Arc::clone(replica))))
    }
}

/// Replicas for partitions `1..=n`
pub struct TestCluster {
    replicas: Vec<Arc<Replica>>,
    connector: TestConnector,
}

impl TestCluster {
    /// Start `partitions` empty replicas
    pub fn start(partitions: u32) -> Self {
        let replicas: Vec<Arc<Replica>> = (1..=partitions)
            .filter_map(|id| PartitionId::new(id).ok())
            .map(|id| Replica::new(id, Address::new(&format!("partition-{}", id), TEST_PORT)))
            .collect();
        let by_address = replicas
            .iter()
            .map(|r| (r.address().clone(), Arc::clone(r)))
            .collect();
        Self {
            replicas,
            connector: TestConnector {
                replicas: Arc::new(by_address),
                connects: Arc::new(AtomicUsize::new(0)),
            },
        }
    }

    /// Partition configuration in ascending ID order
    pub fn configs(&self) -> Vec<PartitionConfig> {
        self.replicas
            .iter()
            .map(|r| PartitionConfig::new(r.id().as_u32(), format!("partition-{}", r.id()), TEST_PORT))
            .collect()
    }

    /// Partitions in ascending ID order
    pub fn partitions(&self) -> Vec<Partition> {
        self.replicas
            .iter()
            .map(|r| Partition::new(r.id(), r.address().clone()))
            .collect()
    }

    /// Replica serving a partition ID
    ///
    /// # Panics
    ///
    /// If the cluster has no such partition.
    pub fn replica(&self, id: u32) -> &Arc<Replica> {
        self.replicas
            .iter()
            .find(|r| r.id().as_u32() == id)
            .unwrap_or_else(|| panic!("no partition {}", id))
    }

    /// All replicas in ascending ID order
    pub fn replicas(&self) -> &[Arc<Replica>] {
        &self.replicas
    }

    /// Connector reaching this cluster's replicas
    pub fn connector(&self) -> TestConnector {
        self.connector.clone()
    }
}
