use chrono::{DateTime, Utc};
use inventory::{
    migrator::{
        MemoryMigrator, MigrateError, SchemaManager, SchemaVersion, DUAL_WRITES_SCHEMA_VERSION,
        NEW_SCHEMA_ONLY_VERSION, READS_FROM_NEW_SCHEMA_VERSION,
    },
    store::{CloudAssetChanges, MemoryStore, Store, StoreError},
    wire, ConfigBuilder, Inventory, InventoryError,
};
use serde_json::json;
use tracing_test::traced_test;

fn at(value: &str) -> DateTime<Utc> {
    value.parse().unwrap()
}

fn inventory(min_schema_version: u32) -> (Inventory, Store, MemoryMigrator) {
    let store = MemoryStore::new();
    let migrator = MemoryMigrator::new();
    let config = ConfigBuilder::new()
        .min_schema_version(min_schema_version)
        .build()
        .unwrap();

    (
        Inventory::new(store.clone(), SchemaManager::new(migrator.clone()), config),
        store,
        migrator,
    )
}

fn changes(change_type: &str, ip: &str, time: &str) -> CloudAssetChanges {
    let body: wire::CloudAssetChanges = serde_json::from_value(json!({
        "changes": [{
            "privateIpAddresses": [],
            "publicIpAddresses": [ip],
            "hostnames": ["routed.example"],
            "changeType": change_type
        }],
        "changeTime": time,
        "resourceType": "AWS::EC2::Instance",
        "accountId": "001234567891",
        "region": "us-west-2",
        "resourceId": "arn:aws:ec2:us-west-2:001234567891:instance/i-routed",
        "tags": {}
    }))
    .unwrap();

    body.try_into().unwrap()
}

#[tokio_shared_rt::test]
async fn startup_migrates_to_minimum_version() {
    let (inventory, _, migrator) = inventory(READS_FROM_NEW_SCHEMA_VERSION);

    assert_eq!(
        inventory.ensure_schema().await.unwrap(),
        SchemaVersion::new(READS_FROM_NEW_SCHEMA_VERSION)
    );
    assert_eq!(migrator.applied().len(), 4);

    assert_eq!(
        inventory.ensure_schema().await.unwrap(),
        SchemaVersion::new(READS_FROM_NEW_SCHEMA_VERSION)
    );
    assert_eq!(migrator.applied().len(), 4);

    inventory.schema_up().await.unwrap();
    assert_eq!(
        inventory.ensure_schema().await.unwrap(),
        SchemaVersion::new(5)
    );
}

#[tokio_shared_rt::test]
async fn legacy_schema_routing() {
    let (inventory, store, _) = inventory(1);
    inventory.ensure_schema().await.unwrap();

    inventory
        .store_cloud_asset(&changes("ADDED", "8.8.8.8", "2019-08-09T08:00:00Z"))
        .await
        .unwrap();

    let when = at("2019-08-09T09:00:00Z");
    let assets = inventory.fetch_by_ip(when, "8.8.8.8").await.unwrap();

    assert_eq!(assets.len(), 1);
    assert_eq!(
        assets[0].arn,
        "arn:aws:ec2:us-west-2:001234567891:instance/i-routed"
    );
    assert_eq!(
        inventory
            .fetch_by_hostname(when, "routed.example")
            .await
            .unwrap()
            .len(),
        1
    );
    assert!(inventory
        .fetch_by_resource_id(when, "i-routed")
        .await
        .unwrap()
        .is_empty());
    assert!(store.fetch_by_ip(when, "8.8.8.8").await.unwrap().is_empty());
}

#[tokio_shared_rt::test]
async fn dual_writes_then_reads_from_new() {
    let (inventory, store, _) = inventory(DUAL_WRITES_SCHEMA_VERSION);
    inventory.ensure_schema().await.unwrap();

    inventory
        .store_cloud_asset(&changes("ADDED", "8.8.4.4", "2019-08-09T08:00:00Z"))
        .await
        .unwrap();

    let when = at("2019-08-09T09:00:00Z");

    assert_eq!(store.fetch_by_ip(when, "8.8.4.4").await.unwrap().len(), 1);
    assert_eq!(
        store.legacy_fetch_by_ip(when, "8.8.4.4").await.unwrap().len(),
        1
    );

    let legacy = inventory.fetch_by_ip(when, "8.8.4.4").await.unwrap();
    assert!(legacy[0].arn.starts_with("arn:"));

    inventory
        .schema_to(READS_FROM_NEW_SCHEMA_VERSION)
        .await
        .unwrap();

    let new = inventory.fetch_by_ip(when, "8.8.4.4").await.unwrap();
    assert_eq!(new[0].arn, "i-routed");
    assert_eq!(
        inventory
            .fetch_by_resource_id(when, "i-routed")
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio_shared_rt::test]
async fn new_schema_only_stops_legacy_writes() {
    let (inventory, store, _) = inventory(NEW_SCHEMA_ONLY_VERSION);
    inventory.ensure_schema().await.unwrap();

    inventory
        .store_cloud_asset(&changes("ADDED", "9.9.9.9", "2019-08-09T08:00:00Z"))
        .await
        .unwrap();

    let when = at("2019-08-09T09:00:00Z");

    assert_eq!(inventory.fetch_by_ip(when, "9.9.9.9").await.unwrap().len(), 1);
    assert!(store
        .legacy_fetch_by_ip(when, "9.9.9.9")
        .await
        .unwrap()
        .is_empty());
}

#[tokio_shared_rt::test]
async fn unreadable_version_writes_legacy_only() {
    let (inventory, store, migrator) = inventory(NEW_SCHEMA_ONLY_VERSION);
    inventory.ensure_schema().await.unwrap();

    migrator.disconnect();
    migrator.set_unreachable(true);

    inventory
        .store_cloud_asset(&changes("ADDED", "1.1.1.1", "2019-08-09T08:00:00Z"))
        .await
        .unwrap();

    let when = at("2019-08-09T09:00:00Z");

    assert_eq!(
        store.legacy_fetch_by_ip(when, "1.1.1.1").await.unwrap().len(),
        1
    );
    assert!(store.fetch_by_ip(when, "1.1.1.1").await.unwrap().is_empty());
    assert!(matches!(
        inventory.fetch_by_ip(when, "1.1.1.1").await,
        Err(InventoryError::Migrate(MigrateError::Connection(_)))
    ));
}

#[tokio_shared_rt::test]
async fn back_fill_before_switching_reads() {
    let (inventory, _, _) = inventory(1);
    inventory.ensure_schema().await.unwrap();

    inventory
        .store_cloud_asset(&changes("ADDED", "2.2.2.2", "2019-08-09T08:00:00Z"))
        .await
        .unwrap();
    inventory
        .store_cloud_asset(&changes("DELETED", "2.2.2.2", "2019-08-09T10:00:00Z"))
        .await
        .unwrap();

    inventory
        .schema_to(READS_FROM_NEW_SCHEMA_VERSION)
        .await
        .unwrap();

    let range = wire::BackFillEvents {
        from: "2019-08-09T00:00:00Z".to_owned(),
        to: "2019-08-10T00:00:00Z".to_owned(),
    }
    .range()
    .unwrap();

    assert_eq!(inventory.back_fill(range.0, range.1).await.unwrap(), 2);

    let during = inventory
        .fetch_by_ip(at("2019-08-09T09:00:00Z"), "2.2.2.2")
        .await
        .unwrap();
    assert_eq!(during.len(), 1);
    assert_eq!(during[0].arn, "i-routed");

    assert!(inventory
        .fetch_by_ip(at("2019-08-09T11:00:00Z"), "2.2.2.2")
        .await
        .unwrap()
        .is_empty());
}

#[tokio_shared_rt::test]
async fn expired_partitions_use_configured_ttl() {
    let store = MemoryStore::new().with_clock(|| at("2032-06-01T00:00:00Z"));
    let config = ConfigBuilder::new().partition_ttl_days(30).build().unwrap();
    let inventory = Inventory::new(store, SchemaManager::new(MemoryMigrator::new()), config);

    let old = inventory
        .generate_partition(Some(at("2032-01-01T00:00:00Z")), 0)
        .await
        .unwrap()
        .unwrap();
    let recent = inventory
        .generate_partition(Some(at("2032-04-01T00:00:00Z")), 45)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(inventory.drop_expired_partitions().await.unwrap(), vec![old.name]);

    let partitions = wire::Partitions::from(inventory.partitions().await.unwrap());
    assert_eq!(partitions.results.len(), 1);
    assert_eq!(partitions.results[0].name, recent.name);
}

#[tokio_shared_rt::test]
async fn lookup_answer_policy() {
    let (inventory, _, _) = inventory(NEW_SCHEMA_ONLY_VERSION);
    inventory.ensure_schema().await.unwrap();

    let params = wire::FetchByIpParameters {
        ip_address: "3.3.3.3".to_owned(),
        time: "2019-08-09T09:00:00Z".to_owned(),
    };

    let assets = inventory
        .fetch_by_ip(params.when().unwrap(), &params.ip_address)
        .await
        .unwrap();

    assert!(matches!(
        wire::CloudAssets::require_non_empty(assets, &params.ip_address),
        Err(InventoryError::NotFound { .. })
    ));

    assert!(matches!(
        inventory.fetch_all(params.when().unwrap()).await,
        Err(InventoryError::Store(StoreError::NotAvailable(_)))
    ));
}

#[tokio_shared_rt::test]
#[traced_test]
async fn invalid_input_is_logged() {
    let (inventory, _, _) = inventory(NEW_SCHEMA_ONLY_VERSION);
    inventory.ensure_schema().await.unwrap();

    let err = inventory
        .fetch_by_ip(at("2019-08-09T09:00:00Z"), "not-an-ip")
        .await
        .unwrap_err();

    assert!(err.is_invalid_input());
    assert!(logs_contain("invalid input"));
    assert!(logs_contain("schema migrated to version 6"));
}

#[tokio_shared_rt::test]
#[traced_test]
async fn public_ips_without_hostname_are_logged() {
    let (inventory, store, _) = inventory(NEW_SCHEMA_ONLY_VERSION);
    inventory.ensure_schema().await.unwrap();

    let mut changes = changes("ADDED", "4.4.4.4", "2019-08-09T08:00:00Z");
    changes.changes[0].hostnames.clear();

    inventory.store_cloud_asset(&changes).await.unwrap();

    assert!(logs_contain("without hostname are not recorded"));
    assert!(store
        .fetch_by_ip(at("2019-08-09T09:00:00Z"), "4.4.4.4")
        .await
        .unwrap()
        .is_empty());
}

#[tokio_shared_rt::test]
async fn account_owner_through_wire() {
    let (inventory, _, _) = inventory(NEW_SCHEMA_ONLY_VERSION);
    inventory.ensure_schema().await.unwrap();

    let body: wire::AccountOwner = serde_json::from_value(json!({
        "accountId": "001234567891",
        "owner": {"name": "Jane", "login": "jane", "email": "jane@example.com", "valid": true},
        "champions": [
            {"name": "Ann", "login": "ann", "email": "ann@example.com", "valid": true}
        ]
    }))
    .unwrap();

    inventory
        .store_account_owner(&body.try_into().unwrap())
        .await
        .unwrap();

    inventory
        .store_cloud_asset(&changes("ADDED", "5.5.5.5", "2019-08-09T08:00:00Z"))
        .await
        .unwrap();

    let assets = inventory
        .fetch_by_ip(at("2019-08-09T09:00:00Z"), "5.5.5.5")
        .await
        .unwrap();
    let answer = wire::CloudAssets::require_non_empty(assets, "5.5.5.5").unwrap();
    let value = serde_json::to_value(&answer).unwrap();

    assert_eq!(value["assets"][0]["accountOwner"]["owner"]["login"], json!("jane"));
    assert_eq!(
        value["assets"][0]["accountOwner"]["champions"][0]["login"],
        json!("ann")
    );
}
