use std::net::IpAddr;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use inventory_store::{
    AccountOwner, ChangeType, CloudAssetChanges, NetworkChanges, Person, Store, StoreError, Tags,
};

pub fn at(value: &str) -> DateTime<Utc> {
    value.parse().unwrap()
}

fn ip(value: &str) -> IpAddr {
    value.parse().unwrap()
}

pub struct Event {
    arn: String,
    account: String,
    time: DateTime<Utc>,
    tags: Tags,
    change: NetworkChanges,
}

impl Event {
    pub fn added(arn: &str, account: &str, time: &str) -> Self {
        Self::new(arn, account, time, ChangeType::Added)
    }

    pub fn deleted(arn: &str, account: &str, time: &str) -> Self {
        Self::new(arn, account, time, ChangeType::Deleted)
    }

    fn new(arn: &str, account: &str, time: &str, change_type: ChangeType) -> Self {
        Self {
            arn: format!("arn:aws:ec2:us-west-2:{account}:instance/{arn}"),
            account: account.to_owned(),
            time: at(time),
            tags: Tags::new(),
            change: NetworkChanges::new(change_type),
        }
    }

    pub fn private(mut self, value: &str) -> Self {
        self.change.private_ips.push(ip(value));
        self
    }

    pub fn public(mut self, value: &str) -> Self {
        self.change.public_ips.push(ip(value));
        self
    }

    pub fn hostname(mut self, value: &str) -> Self {
        self.change.hostnames.push(value.to_owned());
        self
    }

    pub fn related(mut self, value: &str) -> Self {
        self.change.related_resources.push(value.to_owned());
        self
    }

    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_owned(), value.to_owned());
        self
    }

    pub fn build(self) -> CloudAssetChanges {
        CloudAssetChanges {
            changes: vec![self.change],
            change_time: self.time,
            resource_type: "AWS::EC2::Instance".to_owned(),
            account_id: self.account,
            region: "us-west-2".to_owned(),
            arn: self.arn,
            tags: self.tags,
        }
    }
}

fn person(login: &str, email: &str) -> Person {
    Person {
        name: login.replace('.', " "),
        login: login.to_owned(),
        email: email.to_owned(),
        valid: true,
    }
}

pub async fn test_single_life(store: &Store) -> anyhow::Result<()> {
    store
        .store_cloud_asset(
            &Event::added("i-1", "001234567891", "2019-08-09T08:29:35Z")
                .private("10.0.0.1")
                .public("8.8.8.8")
                .hostname("a.example")
                .build(),
        )
        .await?;

    let assets = store
        .fetch_by_ip(at("2019-08-10T00:00:00Z"), "8.8.8.8")
        .await?;

    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0].arn, "i-1");
    assert_eq!(assets[0].public_ip_addresses, vec![ip("8.8.8.8")]);
    assert_eq!(assets[0].hostnames, vec!["a.example"]);
    assert_eq!(assets[0].account_id, "001234567891");
    assert_eq!(assets[0].region, "us-west-2");
    assert_eq!(assets[0].resource_type, "AWS::EC2::Instance");
    assert!(assets[0].account_owner.is_none());

    let before = store
        .fetch_by_hostname(at("2019-08-08T00:00:00Z"), "a.example")
        .await?;
    assert!(before.is_empty());

    store
        .store_cloud_asset(
            &Event::deleted("i-1", "001234567891", "2019-08-09T09:00:00Z")
                .private("10.0.0.1")
                .public("8.8.8.8")
                .hostname("a.example")
                .build(),
        )
        .await?;

    let during = store
        .fetch_by_ip(at("2019-08-09T08:45:00Z"), "8.8.8.8")
        .await?;
    assert_eq!(during.len(), 1);

    let after = store
        .fetch_by_ip(at("2019-08-09T09:05:00Z"), "8.8.8.8")
        .await?;
    assert!(after.is_empty());

    store
        .store_cloud_asset(
            &Event::added("i-2", "001234567891", "2019-08-09T10:00:00Z")
                .public("8.8.8.8")
                .hostname("b.example")
                .build(),
        )
        .await?;

    let reassigned = store
        .fetch_by_ip(at("2019-08-09T11:00:00Z"), "8.8.8.8")
        .await?;
    assert_eq!(reassigned.len(), 1);
    assert_eq!(reassigned[0].arn, "i-2");
    assert_eq!(reassigned[0].hostnames, vec!["b.example"]);

    let private = store
        .fetch_by_ip(at("2019-08-09T08:45:00Z"), "10.0.0.1")
        .await?;
    assert_eq!(private.len(), 1);
    assert_eq!(private[0].private_ip_addresses, vec![ip("10.0.0.1")]);
    assert!(private[0].public_ip_addresses.is_empty());

    Ok(())
}

pub async fn test_out_of_order(store: &Store) -> anyhow::Result<()> {
    let release = Event::deleted("i-ooo", "001234567892", "2019-08-09T09:00:00Z")
        .public("8.8.4.4")
        .hostname("ooo.example")
        .build();

    store.store_cloud_asset(&release).await?;

    let provisional = store
        .fetch_by_ip(at("2019-08-09T08:00:00Z"), "8.8.4.4")
        .await?;
    assert_eq!(provisional.len(), 1);

    store
        .store_cloud_asset(
            &Event::added("i-ooo", "001234567892", "2019-08-09T08:29:35Z")
                .public("8.8.4.4")
                .hostname("ooo.example")
                .build(),
        )
        .await?;

    let during = store
        .fetch_by_ip(at("2019-08-09T08:45:00Z"), "8.8.4.4")
        .await?;
    assert_eq!(during.len(), 1);
    assert_eq!(during[0].arn, "i-ooo");

    for when in [
        "2019-08-09T08:00:00Z",
        "2019-08-09T08:29:34Z",
        "2019-08-09T09:00:00Z",
    ] {
        assert!(store.fetch_by_ip(at(when), "8.8.4.4").await?.is_empty());
    }

    assert_eq!(
        store
            .fetch_by_ip(at("2019-08-09T08:29:35Z"), "8.8.4.4")
            .await?
            .len(),
        1
    );

    Ok(())
}

pub async fn test_replay(store: &Store) -> anyhow::Result<()> {
    let added = Event::added("i-replay", "001234567893", "2019-08-09T08:00:00Z")
        .private("10.1.0.1")
        .public("9.9.9.9")
        .hostname("replay.example")
        .build();
    let deleted = Event::deleted("i-replay", "001234567893", "2019-08-09T09:00:00Z")
        .private("10.1.0.1")
        .public("9.9.9.9")
        .hostname("replay.example")
        .build();

    for _ in 0..2 {
        store.store_cloud_asset(&added).await?;
        store.store_cloud_asset(&deleted).await?;
    }

    store.store_cloud_asset(&added).await?;

    assert_eq!(
        store
            .fetch_by_ip(at("2019-08-09T08:30:00Z"), "9.9.9.9")
            .await?
            .len(),
        1
    );
    assert!(store
        .fetch_by_ip(at("2019-08-09T09:30:00Z"), "10.1.0.1")
        .await?
        .is_empty());

    Ok(())
}

pub async fn test_repeated_added(store: &Store) -> anyhow::Result<()> {
    for time in ["2019-08-09T08:00:00Z", "2019-08-09T08:30:00Z"] {
        store
            .store_cloud_asset(
                &Event::added("i-twice", "001234567894", time)
                    .private("10.2.0.1")
                    .build(),
            )
            .await?;
    }

    store
        .store_cloud_asset(
            &Event::deleted("i-twice", "001234567894", "2019-08-09T09:00:00Z")
                .private("10.2.0.1")
                .build(),
        )
        .await?;

    assert_eq!(
        store
            .fetch_by_ip(at("2019-08-09T08:45:00Z"), "10.2.0.1")
            .await?
            .len(),
        1
    );
    assert!(store
        .fetch_by_ip(at("2019-08-09T09:30:00Z"), "10.2.0.1")
        .await?
        .is_empty());

    Ok(())
}

pub async fn test_boundary(store: &Store) -> anyhow::Result<()> {
    let event = |change: fn(&str, &str, &str) -> Event, time: &str| {
        change("i-edge", "001234567895", time)
            .public("1.1.1.1")
            .hostname("edge.example")
            .build()
    };

    store
        .store_cloud_asset(&event(Event::added, "2019-08-09T08:00:00Z"))
        .await?;
    store
        .store_cloud_asset(&event(Event::deleted, "2019-08-09T09:00:00Z"))
        .await?;
    store
        .store_cloud_asset(&event(Event::added, "2019-08-09T09:00:00Z"))
        .await?;

    for when in [
        "2019-08-09T08:59:59Z",
        "2019-08-09T09:00:00Z",
        "2019-08-10T00:00:00Z",
    ] {
        assert_eq!(store.fetch_by_ip(at(when), "1.1.1.1").await?.len(), 1);
    }

    assert!(store
        .fetch_by_ip(at("2019-08-09T07:59:59Z"), "1.1.1.1")
        .await?
        .is_empty());

    Ok(())
}

pub async fn test_resource_id(store: &Store) -> anyhow::Result<()> {
    store
        .store_cloud_asset(
            &Event::added("i-full", "001234567896", "2019-08-09T08:00:00Z")
                .private("10.3.0.1")
                .public("2.2.2.2")
                .hostname("full-a.example")
                .hostname("full-b.example")
                .related("eni-full")
                .tag("team", "edge")
                .build(),
        )
        .await?;

    store
        .store_cloud_asset(
            &Event::added("i-full", "001234567896", "2019-08-09T08:10:00Z")
                .tag("team", "core")
                .build(),
        )
        .await?;

    let assets = store
        .fetch_by_resource_id(at("2019-08-09T08:30:00Z"), "i-full")
        .await?;

    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0].private_ip_addresses, vec![ip("10.3.0.1")]);
    assert_eq!(assets[0].public_ip_addresses, vec![ip("2.2.2.2")]);
    assert_eq!(assets[0].hostnames.len(), 2);
    assert_eq!(assets[0].related_resources, vec!["eni-full"]);
    assert_eq!(assets[0].tags.get("team").map(String::as_str), Some("core"));

    let by_ip = store
        .fetch_by_ip(at("2019-08-09T08:30:00Z"), "2.2.2.2")
        .await?;
    assert_eq!(by_ip.len(), 1);
    assert_eq!(by_ip[0].public_ip_addresses.len(), 1);

    assert!(store
        .fetch_by_resource_id(at("2019-08-09T07:00:00Z"), "i-full")
        .await?
        .is_empty());
    assert!(store
        .fetch_by_resource_id(at("2019-08-09T08:30:00Z"), "i-unknown")
        .await?
        .is_empty());

    Ok(())
}

pub async fn test_public_ip_without_hostname(store: &Store) -> anyhow::Result<()> {
    store
        .store_cloud_asset(
            &Event::added("i-nohost", "001234567897", "2019-08-09T08:00:00Z")
                .public("3.3.3.3")
                .build(),
        )
        .await?;

    assert!(store
        .fetch_by_ip(at("2019-08-09T09:00:00Z"), "3.3.3.3")
        .await?
        .is_empty());

    Ok(())
}

pub async fn test_account_owner(store: &Store) -> anyhow::Result<()> {
    let account = "001234567898";
    let owner = AccountOwner {
        account_id: account.to_owned(),
        owner: person("jane.owner", "jane@example.com"),
        champions: vec![
            person("ann.champion", "ann@example.com"),
            person("bob.champion", "bob@example.com"),
        ],
    };

    store.store_account_owner(&owner).await?;
    store.store_account_owner(&owner).await?;

    store
        .store_cloud_asset(
            &Event::added("i-owned", account, "2019-08-09T08:00:00Z")
                .private("10.4.0.1")
                .build(),
        )
        .await?;

    let assets = store
        .fetch_by_ip(at("2019-08-09T09:00:00Z"), "10.4.0.1")
        .await?;
    let found = assets[0].account_owner.clone().unwrap();

    assert_eq!(found.owner.login, "jane.owner");
    assert_eq!(found.champions.len(), 2);

    let replaced = AccountOwner {
        owner: Person {
            email: "jane@corp.example.com".to_owned(),
            ..person("jane.owner", "")
        },
        champions: vec![
            person("carl.champion", "carl@example.com"),
            person("carl.alias", "CARL@example.com"),
        ],
        ..owner
    };

    store.store_account_owner(&replaced).await?;

    let found = store.account_owner(account).await?.unwrap();

    assert_eq!(found.owner.email, "jane@corp.example.com");
    assert_eq!(found.champions.len(), 1);
    assert!(found.champions[0].email.eq_ignore_ascii_case("carl@example.com"));

    assert!(store.account_owner("000000000000").await?.is_none());

    Ok(())
}

pub async fn test_invalid_input(store: &Store) -> anyhow::Result<()> {
    let when = at("2019-08-09T09:00:00Z");

    assert!(matches!(
        store.fetch_by_ip(when, "10.0.0").await,
        Err(StoreError::InvalidInput { .. })
    ));
    assert!(matches!(
        store.fetch_by_hostname(when, " ").await,
        Err(StoreError::InvalidInput { .. })
    ));
    assert!(matches!(
        store.fetch_by_resource_id(when, "").await,
        Err(StoreError::InvalidInput { .. })
    ));
    assert!(matches!(
        store.fetch_all(when).await,
        Err(StoreError::NotAvailable(_))
    ));
    assert!(matches!(
        store
            .back_fill(at("2019-08-10T00:00:00Z"), at("2019-08-09T00:00:00Z"))
            .await,
        Err(StoreError::InvalidInput { .. })
    ));

    Ok(())
}

pub async fn test_concurrent_ingest(store: &Store) -> anyhow::Result<()> {
    let events: Vec<CloudAssetChanges> = (0..8)
        .map(|n| {
            Event::added("i-busy", "001234567899", "2019-08-09T08:00:00Z")
                .private(&format!("10.5.0.{n}"))
                .build()
        })
        .collect();

    for res in join_all(events.iter().map(|e| store.store_cloud_asset(e))).await {
        res?;
    }

    let assets = store
        .fetch_by_resource_id(at("2019-08-09T09:00:00Z"), "i-busy")
        .await?;

    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0].private_ip_addresses.len(), 8);

    Ok(())
}

pub async fn test_legacy(store: &Store) -> anyhow::Result<()> {
    let arn = "arn:aws:ec2:us-west-2:001234567900:instance/i-legacy";

    store
        .store_legacy(
            &Event::added("i-legacy", "001234567900", "2018-03-01T08:00:00Z")
                .private("10.6.0.1")
                .public("4.4.4.4")
                .hostname("legacy.example")
                .build(),
        )
        .await?;
    store
        .store_legacy(
            &Event::deleted("i-legacy", "001234567900", "2018-03-01T09:00:00Z")
                .public("4.4.4.4")
                .hostname("legacy.example")
                .build(),
        )
        .await?;

    let during = store
        .legacy_fetch_by_ip(at("2018-03-01T08:30:00Z"), "4.4.4.4")
        .await?;
    assert_eq!(during.len(), 1);
    assert_eq!(during[0].arn, arn);
    assert_eq!(during[0].hostnames, vec!["legacy.example"]);

    assert!(store
        .legacy_fetch_by_ip(at("2018-03-01T09:30:00Z"), "4.4.4.4")
        .await?
        .is_empty());
    assert!(store
        .legacy_fetch_by_hostname(at("2018-03-01T07:30:00Z"), "legacy.example")
        .await?
        .is_empty());

    let private = store
        .legacy_fetch_by_ip(at("2018-03-01T08:30:00Z"), "10.6.0.1")
        .await?;
    assert_eq!(private[0].private_ip_addresses, vec![ip("10.6.0.1")]);

    Ok(())
}

pub async fn test_back_fill(store: &Store) -> anyhow::Result<()> {
    store
        .store_legacy(
            &Event::added("i-fill", "001234567901", "2017-05-01T08:00:00Z")
                .private("10.7.0.1")
                .public("5.5.5.5")
                .hostname("fill.example")
                .build(),
        )
        .await?;
    store
        .store_legacy(
            &Event::deleted("i-fill", "001234567901", "2017-05-01T09:00:00Z")
                .public("5.5.5.5")
                .hostname("fill.example")
                .build(),
        )
        .await?;

    let replayed = store
        .back_fill(at("2017-05-01T00:00:00Z"), at("2017-05-02T00:00:00Z"))
        .await?;
    assert_eq!(replayed, 3);

    let during = store
        .fetch_by_hostname(at("2017-05-01T08:30:00Z"), "fill.example")
        .await?;
    assert_eq!(during.len(), 1);
    assert_eq!(during[0].arn, "i-fill");

    assert!(store
        .fetch_by_ip(at("2017-05-01T09:30:00Z"), "5.5.5.5")
        .await?
        .is_empty());
    assert_eq!(
        store
            .fetch_by_ip(at("2017-05-01T09:30:00Z"), "10.7.0.1")
            .await?
            .len(),
        1
    );

    assert_eq!(
        store
            .back_fill(at("2017-05-01T00:00:00Z"), at("2017-05-02T00:00:00Z"))
            .await?,
        3
    );
    assert_eq!(
        store
            .fetch_by_hostname(at("2017-05-01T08:30:00Z"), "fill.example")
            .await?
            .len(),
        1
    );

    Ok(())
}

pub async fn test_partitions(store: &Store) -> anyhow::Result<()> {
    store
        .store_legacy(
            &Event::added("i-early", "001234567902", "2030-08-09T08:00:00Z")
                .public("4.3.2.1")
                .hostname("early.example")
                .build(),
        )
        .await?;

    let adopted = store
        .generate_partition(Some(at("2030-07-01T00:00:00Z")), 0)
        .await?
        .unwrap();

    assert_eq!(
        adopted.name,
        "aws_events_ips_hostnames_2030_07_01to2030_10_01"
    );
    assert_eq!(adopted.count, 1);

    let listed = store.partitions().await?;
    let listed = listed.iter().find(|p| p.name == adopted.name).unwrap();
    assert_eq!(listed.count, 1);

    let when = at("2030-08-09T09:00:00Z");
    assert_eq!(store.legacy_fetch_by_ip(when, "4.3.2.1").await?.len(), 1);

    store.delete_partition(&adopted.name).await?;
    assert!(store.legacy_fetch_by_ip(when, "4.3.2.1").await?.is_empty());

    let first = store
        .generate_partition(Some(at("2031-01-01T00:00:00Z")), 0)
        .await?
        .unwrap();

    assert_eq!(
        first.name,
        "aws_events_ips_hostnames_2031_01_01to2031_04_01"
    );
    assert_eq!(first.end, at("2031-04-01T00:00:00Z"));

    assert!(matches!(
        store
            .generate_partition(Some(at("2031-02-01T00:00:00Z")), 10)
            .await,
        Err(StoreError::PartitionConflict(_))
    ));

    store
        .store_legacy(
            &Event::added("i-part", "001234567902", "2031-02-01T00:00:00Z")
                .private("10.8.0.1")
                .build(),
        )
        .await?;

    let partitions = store.partitions().await?;
    let listed = partitions.iter().find(|p| p.name == first.name).unwrap();
    assert_eq!(listed.count, 1);

    let early = store.clone().with_clock(|| at("2031-02-01T00:00:00Z"));
    assert!(early.generate_partition(None, 0).await?.is_none());

    let due = store.clone().with_clock(|| at("2031-03-30T00:00:00Z"));
    let next = due.generate_partition(None, 0).await?.unwrap();
    assert_eq!(next.begin, first.end);
    assert_eq!(next.end, at("2031-07-01T00:00:00Z"));
    assert!(due.generate_partition(None, 0).await?.is_none());

    let later = store.clone().with_clock(|| at("2032-06-01T00:00:00Z"));
    let dropped = later.drop_expired_partitions(360).await?;
    assert_eq!(dropped, vec![first.name.clone()]);

    assert!(matches!(
        store.delete_partition(&first.name).await,
        Err(StoreError::NotFoundPartition(_))
    ));
    assert!(matches!(
        store.delete_partition("person").await,
        Err(StoreError::InvalidInput { .. })
    ));

    store.delete_partition(&next.name).await?;
    assert!(!store
        .partitions()
        .await?
        .iter()
        .any(|p| p.name == next.name));

    Ok(())
}
