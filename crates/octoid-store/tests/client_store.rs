//! Client store behavior against the in-memory backend.

use std::sync::Arc;

use octoid_store::hasher::BcryptHasher;
use octoid_store::memory::{self, MemoryDatabase};
use octoid_store::secret::{self, MAX_SECRET_LENGTH};
use octoid_store::{
    AlreadyExistsRegistry, ClientCredentials, ClientMetadata, ClientRow, ClientStore, NewClient,
    StorageError,
};
use serde_json::json;

fn setup() -> (MemoryDatabase, ClientStore) {
    let db = MemoryDatabase::new();
    let mut registry = AlreadyExistsRegistry::new();
    memory::register_already_exists_checker(&mut registry);
    let store = ClientStore::new(Arc::new(db.clone()), Arc::new(registry))
        .with_hasher(Arc::new(BcryptHasher::new(4).expect("valid cost")));
    (db, store)
}

fn metadata(name: &str) -> ClientMetadata {
    serde_json::from_value(json!({
        "redirectURIs": [format!("https://{name}.example.com/callback")],
        "clientName": name,
    }))
    .expect("valid metadata")
}

fn seeded(id: &str, raw_secret: &[u8]) -> NewClient {
    NewClient::new(id, metadata(id)).with_secret(secret::encode(raw_secret))
}

#[tokio::test]
async fn test_create_then_authenticate() {
    let (_db, store) = setup();
    for id in ["web", "cli", "mobile"] {
        let creds = store.create(None, NewClient::new(id, metadata(id))).await.unwrap();
        assert_eq!(creds.id, id);
        assert_eq!(secret::decode(&creds.secret).unwrap().len(), MAX_SECRET_LENGTH);
        assert!(store.authenticate(None, &creds).await.unwrap());
    }
}

#[tokio::test]
async fn test_supplied_secret_is_used_as_is() {
    let (_db, store) = setup();
    let encoded = secret::encode(b"caller-chosen");
    let creds = store
        .create(None, NewClient::new("web", metadata("web")).with_secret(encoded.clone()))
        .await
        .unwrap();
    assert_eq!(creds.secret, encoded);
    assert!(store.authenticate(None, &creds).await.unwrap());
}

#[tokio::test]
async fn test_authenticate_rejects_single_byte_change() {
    let (_db, store) = setup();
    let creds = store.create(None, NewClient::new("web", metadata("web"))).await.unwrap();
    let raw = secret::decode(&creds.secret).unwrap();

    for index in [0, raw.len() / 2, raw.len() - 1] {
        let mut tampered = raw.clone();
        tampered[index] ^= 0x01;
        let presented = ClientCredentials::new("web", secret::encode(&tampered));
        assert!(!store.authenticate(None, &presented).await.unwrap());
    }
}

#[tokio::test]
async fn test_authenticate_rejects_overlong_secret_with_matching_prefix() {
    let (_db, store) = setup();
    let raw = vec![b'k'; MAX_SECRET_LENGTH];
    store.create(None, seeded("web", &raw)).await.unwrap();

    let mut longer = raw.clone();
    longer.extend_from_slice(b"trailing");
    let presented = ClientCredentials::new("web", secret::encode(&longer));
    assert!(!store.authenticate(None, &presented).await.unwrap());

    let exact = ClientCredentials::new("web", secret::encode(&raw));
    assert!(store.authenticate(None, &exact).await.unwrap());
}

#[tokio::test]
async fn test_authenticate_normalizes_failures_to_false() {
    let (_db, store) = setup();
    store.create(None, seeded("web", b"secret")).await.unwrap();

    let malformed = ClientCredentials::new("web", "%%% not base64 %%%");
    assert!(!store.authenticate(None, &malformed).await.unwrap());

    let unknown = ClientCredentials::new("nobody", secret::encode(b"secret"));
    assert!(!store.authenticate(None, &unknown).await.unwrap());

    let empty = ClientCredentials::new("web", "");
    assert!(!store.authenticate(None, &empty).await.unwrap());
}

#[tokio::test]
async fn test_duplicate_id_keeps_first_row() {
    let (db, store) = setup();
    let first = store.create(None, seeded("web", b"first")).await.unwrap();

    let err = store
        .create(
            None,
            NewClient::new("web", metadata("other"))
                .with_secret(secret::encode(b"second"))
                .with_admin(true),
        )
        .await
        .unwrap_err();
    assert!(err.is_already_exists(), "unexpected error: {err}");

    assert_eq!(db.client_count().await, 1);
    let stored = store.get(None, "web").await.unwrap();
    assert_eq!(stored.metadata, metadata("web"));
    assert!(!stored.admin);
    assert!(store.authenticate(None, &first).await.unwrap());
    let second = ClientCredentials::new("web", secret::encode(b"second"));
    assert!(!store.authenticate(None, &second).await.unwrap());
}

#[tokio::test]
async fn test_concurrent_creates_with_same_id() {
    let (db, store) = setup();
    let (a, b) = tokio::join!(
        store.create(None, seeded("race", b"a")),
        store.create(None, seeded("race", b"b")),
    );

    let results = [a, b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert!(loser.is_already_exists());
    assert_eq!(db.client_count().await, 1);
}

#[tokio::test]
async fn test_create_rejects_overlong_supplied_secret() {
    let (db, store) = setup();
    let err = store
        .create(None, seeded("web", &[7u8; MAX_SECRET_LENGTH + 1]))
        .await
        .unwrap_err();
    assert!(err.is_validation());

    let err = store
        .create(None, NewClient::new("web", metadata("web")).with_secret("***"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Decode { .. }));
    assert_eq!(db.client_count().await, 0);
}

#[tokio::test]
async fn test_batch_rolls_back_on_missing_secret() {
    let (db, store) = setup();
    let mut clients: Vec<NewClient> = (1..=5)
        .map(|i| seeded(&format!("client-{i}"), format!("secret-{i}").as_bytes()))
        .collect();
    clients[2].secret = Some(String::new());

    let err = store.create_batch(clients).await.unwrap_err();
    assert!(err.is_validation());
    assert_eq!(db.client_count().await, 0);
}

#[tokio::test]
async fn test_batch_rolls_back_on_duplicate() {
    let (db, store) = setup();
    store.create(None, seeded("existing", b"x")).await.unwrap();

    let clients = vec![seeded("new-1", b"a"), seeded("existing", b"b"), seeded("new-2", b"c")];
    let err = store.create_batch(clients).await.unwrap_err();
    assert!(err.is_already_exists());
    assert_eq!(db.client_count().await, 1);
}

#[tokio::test]
async fn test_from_clients_seeds_store() {
    let (db, store) = setup();
    let store = store
        .from_clients(vec![seeded("a", b"secret-a"), seeded("b", b"secret-b").with_admin(true)])
        .await
        .unwrap();

    assert_eq!(db.client_count().await, 2);
    assert!(store.is_admin("b").await.unwrap());
    let creds = ClientCredentials::new("a", secret::encode(b"secret-a"));
    assert!(store.authenticate(None, &creds).await.unwrap());
}

#[tokio::test]
async fn test_get_and_metadata() {
    let (_db, store) = setup();
    store.create(None, NewClient::new("web", metadata("web"))).await.unwrap();

    let client = store.get(None, "web").await.unwrap();
    assert_eq!(client.id, "web");
    assert_eq!(client.metadata, metadata("web"));
    assert_eq!(store.metadata(None, "web").await.unwrap(), metadata("web"));

    let err = store.get(None, "missing").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_metadata_roundtrips_through_store() {
    let (_db, store) = setup();
    let doc = json!({
        "redirectURIs": ["https://a.example.com", "http://localhost:8080/cb"],
        "clientName": "Nested",
        "clientURI": "https://a.example.com",
        "grantTypes": ["authorization_code", "refresh_token"],
        "x-settings": {"theme": {"colors": ["#fff", "#000"]}, "retries": 3, "beta": false}
    });
    let original: ClientMetadata = serde_json::from_value(doc.clone()).unwrap();
    store.create(None, NewClient::new("nested", original.clone())).await.unwrap();

    let loaded = store.metadata(None, "nested").await.unwrap();
    assert_eq!(loaded, original);
    assert_eq!(loaded.redirect_uris[0], "https://a.example.com");
    assert_eq!(serde_json::to_value(&loaded).unwrap(), doc);
}

#[tokio::test]
async fn test_null_and_empty_known_fields_load_as_absent() {
    let (_db, store) = setup();
    let original: ClientMetadata = serde_json::from_value(json!({
        "clientName": null,
        "contacts": [],
        "x-flag": null
    }))
    .unwrap();
    store.create(None, NewClient::new("sparse", original.clone())).await.unwrap();

    let loaded = store.metadata(None, "sparse").await.unwrap();
    assert_eq!(loaded, original);
    assert_eq!(serde_json::to_value(&loaded).unwrap(), json!({"x-flag": null}));
}

#[tokio::test]
async fn test_reserved_extra_key_is_rejected_and_listing_survives() {
    let (db, store) = setup();
    store.create(None, NewClient::new("good", metadata("good"))).await.unwrap();

    let mut bad = metadata("bad");
    bad.extra.insert("clientName".into(), json!(5));
    let err = store.create(None, NewClient::new("bad", bad)).await.unwrap_err();
    assert!(err.is_validation());

    let clients = store.all(None).await.unwrap();
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0].id, "good");
    assert_eq!(db.client_count().await, 1);
}

#[tokio::test]
async fn test_invalid_redirect_uri_is_rejected() {
    let (db, store) = setup();
    let mut bad = metadata("web");
    bad.redirect_uris.push("/relative/callback".into());
    let err = store.create(None, NewClient::new("web", bad)).await.unwrap_err();
    assert!(err.is_validation());
    assert_eq!(db.client_count().await, 0);
}

#[tokio::test]
async fn test_set_admin_and_is_admin() {
    let (db, store) = setup();
    store.create(None, NewClient::new("web", metadata("web"))).await.unwrap();
    assert!(!store.is_admin("web").await.unwrap());

    store.set_admin("web", true).await.unwrap();
    assert!(store.is_admin("web").await.unwrap());
    assert!(store.get(None, "web").await.unwrap().admin);

    store.set_admin("web", false).await.unwrap();
    assert!(!store.is_admin("web").await.unwrap());

    let err = store.set_admin("ghost", true).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(db.client_count().await, 1);
    assert!(!store.is_admin("ghost").await.unwrap());
}

#[tokio::test]
async fn test_all_lists_every_client() {
    let (_db, store) = setup();
    assert!(store.all(None).await.unwrap().is_empty());

    for id in ["a", "b", "c"] {
        store.create(None, NewClient::new(id, metadata(id))).await.unwrap();
    }
    let mut ids: Vec<String> = store.all(None).await.unwrap().into_iter().map(|c| c.id).collect();
    ids.sort();
    assert_eq!(ids, ["a", "b", "c"]);
}

#[tokio::test]
async fn test_all_fails_fast_on_bad_metadata() {
    let (db, store) = setup();
    store.create(None, NewClient::new("good", metadata("good"))).await.unwrap();
    db.put_client_row(ClientRow {
        id: "bad".into(),
        secret: Vec::new(),
        metadata: "[1, 2".into(),
        dex_admin: false,
    })
    .await;

    let err = store.all(None).await.unwrap_err();
    assert!(matches!(err, StorageError::Deserialization { .. }));
}
