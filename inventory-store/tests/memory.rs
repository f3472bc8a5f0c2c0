#![allow(clippy::needless_return)]
mod store;

use inventory_store::MemoryStore;

#[tokio_shared_rt::test]
async fn single_life() {
    store::test_single_life(&MemoryStore::new()).await.unwrap();
}

#[tokio_shared_rt::test]
async fn out_of_order() {
    store::test_out_of_order(&MemoryStore::new()).await.unwrap();
}

#[tokio_shared_rt::test]
async fn replay() {
    store::test_replay(&MemoryStore::new()).await.unwrap();
}

#[tokio_shared_rt::test]
async fn repeated_added() {
    store::test_repeated_added(&MemoryStore::new()).await.unwrap();
}

#[tokio_shared_rt::test]
async fn boundary() {
    store::test_boundary(&MemoryStore::new()).await.unwrap();
}

#[tokio_shared_rt::test]
async fn resource_id() {
    store::test_resource_id(&MemoryStore::new()).await.unwrap();
}

#[tokio_shared_rt::test]
async fn public_ip_without_hostname() {
    store::test_public_ip_without_hostname(&MemoryStore::new())
        .await
        .unwrap();
}

#[tokio_shared_rt::test]
async fn account_owner() {
    store::test_account_owner(&MemoryStore::new()).await.unwrap();
}

#[tokio_shared_rt::test]
async fn invalid_input() {
    store::test_invalid_input(&MemoryStore::new()).await.unwrap();
}

#[tokio_shared_rt::test]
async fn concurrent_ingest() {
    store::test_concurrent_ingest(&MemoryStore::new())
        .await
        .unwrap();
}

#[tokio_shared_rt::test]
async fn legacy() {
    store::test_legacy(&MemoryStore::new()).await.unwrap();
}

#[tokio_shared_rt::test]
async fn back_fill() {
    store::test_back_fill(&MemoryStore::new()).await.unwrap();
}

#[tokio_shared_rt::test]
async fn partitions() {
    store::test_partitions(&MemoryStore::new()).await.unwrap();
}
