//! End-to-end cluster tests
//!
//! Each test boots a primary and one or more workers on loopback ports and
//! drives them through the public HTTP API only.

use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;

use shardkv::common::config::{PrimaryConfig, WorkerConfig};
use shardkv::{Primary, WorkerServer};

#[derive(Deserialize)]
struct NodesResponse {
    nodes: Vec<NodeInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeInfo {
    id: String,
    index: usize,
    stats: Stats,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Stats {
    object_count: usize,
}

fn spawn_primary(port: u16) {
    let config = PrimaryConfig {
        bind_addr: format!("127.0.0.1:{}", port).parse().unwrap(),
        health_check_interval_secs: 1,
    };
    tokio::spawn(Primary::new(config).serve());
}

fn spawn_worker(port: u16, primary_port: u16, id: &str) {
    let config = WorkerConfig {
        bind_addr: format!("127.0.0.1:{}", port).parse().unwrap(),
        primary_url: format!("http://127.0.0.1:{}", primary_port),
    };
    tokio::spawn(WorkerServer::new(config, id.to_string()).serve());
}

fn primary_url(port: u16) -> String {
    format!("http://127.0.0.1:{}", port)
}

async fn wait_for_health(client: &reqwest::Client, base: &str) {
    for _ in 0..100 {
        if let Ok(res) = client.get(format!("{}/health", base)).send().await {
            if res.status().is_success() {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("{} never became healthy", base);
}

async fn wait_for_node_count(client: &reqwest::Client, base: &str, expected: usize) {
    for _ in 0..100 {
        if let Some(nodes) = fetch_nodes(client, base).await {
            if nodes.len() == expected {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(300)).await;
    }
    panic!("{} never reached {} nodes", base, expected);
}

async fn fetch_nodes(client: &reqwest::Client, base: &str) -> Option<Vec<NodeInfo>> {
    let res = client.get(format!("{}/nodes", base)).send().await.ok()?;
    if !res.status().is_success() {
        return None;
    }
    let body: NodesResponse = res.json().await.ok()?;
    Some(body.nodes)
}

async fn set_key(client: &reqwest::Client, base: &str, key: &str, value: &[u8]) {
    let res = client
        .post(format!("{}/keys/{}", base, key))
        .body(value.to_vec())
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success(), "set {} failed: {}", key, res.status());
}

async fn get_key(client: &reqwest::Client, base: &str, key: &str) -> Option<Vec<u8>> {
    let res = client
        .get(format!("{}/keys/{}", base, key))
        .send()
        .await
        .unwrap();
    if !res.status().is_success() {
        return None;
    }
    Some(res.bytes().await.unwrap().to_vec())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_single_node_set_get_delete() {
    let primary = 18100;
    spawn_primary(primary);
    spawn_worker(18101, primary, "solo");

    let client = reqwest::Client::new();
    let base = primary_url(primary);
    wait_for_health(&client, &base).await;
    wait_for_node_count(&client, &base, 1).await;

    set_key(&client, &base, "foo", b"bar").await;
    assert_eq!(get_key(&client, &base, "foo").await.unwrap(), b"bar");

    let nodes = fetch_nodes(&client, &base).await.unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].id, "solo");
    assert_eq!(nodes[0].index, 0);
    assert_eq!(nodes[0].stats.object_count, 1);

    let res = client
        .delete(format!("{}/keys/foo", base))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    assert!(get_key(&client, &base, "foo").await.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rebalance_on_added_worker() {
    let primary = 18200;
    spawn_primary(primary);
    spawn_worker(18201, primary, "first");

    let client = reqwest::Client::new();
    let base = primary_url(primary);
    wait_for_health(&client, &base).await;
    wait_for_node_count(&client, &base, 1).await;

    let values: Vec<Vec<u8>> = {
        let mut rng = rand::thread_rng();
        (0..100).map(|_| (0..50).map(|_| rng.gen()).collect()).collect()
    };
    for (i, value) in values.iter().enumerate() {
        let key = format!("seed-key-{:03}", i);
        set_key(&client, &base, &key, value).await;
    }

    let nodes = fetch_nodes(&client, &base).await.unwrap();
    assert_eq!(nodes[0].stats.object_count, 100);

    spawn_worker(18202, primary, "second");
    wait_for_node_count(&client, &base, 2).await;

    let nodes = fetch_nodes(&client, &base).await.unwrap();
    let counts: Vec<usize> = nodes.iter().map(|n| n.stats.object_count).collect();
    assert_eq!(counts.iter().sum::<usize>(), 100, "no entries lost");
    let delta = counts[0].abs_diff(counts[1]);
    assert!(delta < 10, "lopsided split after rebalance: {:?}", counts);

    // every key still resolves through the primary with its original value
    for (i, value) in values.iter().enumerate() {
        let key = format!("seed-key-{:03}", i);
        assert_eq!(get_key(&client, &base, &key).await.unwrap(), *value);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rebalance_on_removed_worker() {
    let primary = 18300;
    spawn_primary(primary);
    spawn_worker(18301, primary, "worker-a");

    let client = reqwest::Client::new();
    let base = primary_url(primary);
    wait_for_health(&client, &base).await;
    wait_for_node_count(&client, &base, 1).await;

    spawn_worker(18302, primary, "worker-b");
    wait_for_node_count(&client, &base, 2).await;

    let mut expected = HashMap::new();
    for i in 0..60 {
        let key = format!("drain-key-{}", i);
        let value = format!("value-{}", i).into_bytes();
        set_key(&client, &base, &key, &value).await;
        expected.insert(key, value);
    }

    let res = client
        .delete(format!("{}/nodes/worker-a", base))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    wait_for_node_count(&client, &base, 1).await;

    let nodes = fetch_nodes(&client, &base).await.unwrap();
    assert_eq!(nodes[0].id, "worker-b");
    assert_eq!(nodes[0].index, 0);
    assert_eq!(nodes[0].stats.object_count, 60, "survivor holds everything");

    for (key, value) in &expected {
        assert_eq!(get_key(&client, &base, key).await.unwrap(), *value);
    }
}
