//! Prints the CassandraCluster CustomResourceDefinition as YAML.
//!
//! Usage: `cargo run -p crds --bin crdgen | kubectl apply -f -`

use anyhow::Result;
use crds::CassandraCluster;
use kube::CustomResourceExt;

fn main() -> Result<()> {
    let crd = CassandraCluster::crd();
    print!("{}", serde_yaml::to_string(&crd)?);
    Ok(())
}
