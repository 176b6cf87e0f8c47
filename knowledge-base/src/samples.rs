//! Sample diagnosis knowledge for self-tests and demos

use crate::entry::Entry;
use crate::error::Result;
use crate::registry::{Registry, DATANODE_EXPERT, NAMENODE_EXPERT};

/// Sample NameNode troubleshooting entries
pub fn namenode_samples() -> Vec<Entry> {
    vec![
        Entry::new(
            "Common reasons the NameNode fails to start: 1) configuration file errors \
             2) port already in use 3) insufficient disk space",
        )
        .source("Hadoop documentation")
        .desc("NameNode startup problems"),
        Entry::new(
            "When the NameNode fails to start, check that hdfs-site.xml and core-site.xml \
             are configured correctly",
        )
        .source("Incident case")
        .desc("Configuration check"),
        Entry::new(
            "When the NameNode runs out of memory, increase the JVM heap by raising \
             HADOOP_HEAPSIZE in hadoop-env.sh",
        )
        .source("Incident case")
        .desc("Memory problems"),
    ]
}

/// Sample DataNode troubleshooting entries
pub fn datanode_samples() -> Vec<Entry> {
    vec![
        Entry::new(
            "When a DataNode cannot connect to the NameNode, check network connectivity \
             and firewall settings",
        )
        .source("Incident case")
        .desc("Connectivity problems"),
        Entry::new("A DataNode running out of disk space causes block replication to fail")
            .source("Incident case")
            .desc("Storage problems"),
        Entry::new(
            "DataNode heartbeat timeouts can come from network latency or an overloaded NameNode",
        )
        .source("Incident case")
        .desc("Heartbeat problems"),
    ]
}

/// Add the sample entries to the NameNode and DataNode collections
///
/// Each call appends; seeding twice stores the samples twice.
pub fn seed_sample_knowledge(registry: &Registry) -> Result<()> {
    registry
        .get_or_create(NAMENODE_EXPERT)
        .add_entries(namenode_samples())?;
    registry
        .get_or_create(DATANODE_EXPERT)
        .add_entries(datanode_samples())?;
    registry.persist_all()?;

    log::info!("Sample knowledge initialized");
    Ok(())
}
