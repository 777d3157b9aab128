use tempfile::TempDir;

use super::*;

const API_URL: &str = "http://localhost:8080";

async fn assert_round_trip(store: &dyn SessionStore) {
    assert_eq!(store.load().await.expect("initial load"), None);

    store.store("tok-1").await.expect("store");
    assert_eq!(store.load().await.expect("load").as_deref(), Some("tok-1"));

    store.store("tok-2").await.expect("overwrite");
    assert_eq!(store.load().await.expect("load").as_deref(), Some("tok-2"));

    store.clear().await.expect("clear");
    assert_eq!(store.load().await.expect("load after clear"), None);

    store.clear().await.expect("clear is idempotent");
}

#[tokio::test]
async fn memory_store_round_trip() {
    assert_round_trip(&MemorySessionStore::new()).await;
}

#[tokio::test]
async fn memory_store_can_start_signed_in() {
    let store = MemorySessionStore::with_token("tok-seed");
    assert_eq!(store.load().await.expect("load").as_deref(), Some("tok-seed"));
}

#[tokio::test]
async fn persistent_store_round_trip() {
    let store = PersistentSessionStore::open("sqlite::memory:")
        .await
        .expect("open store");
    assert_round_trip(&store).await;
}

#[tokio::test]
async fn persistent_store_survives_reopen() {
    let dir = TempDir::new().expect("temp dir");
    let url = format!("sqlite://{}", dir.path().join("session.db").display());

    {
        let store = PersistentSessionStore::open(&url).await.expect("open store");
        store.store("tok-kept").await.expect("store");
    }

    let reopened = PersistentSessionStore::open(&url).await.expect("reopen store");
    assert_eq!(
        reopened.load().await.expect("load").as_deref(),
        Some("tok-kept")
    );
}

#[tokio::test]
async fn persistent_store_refuses_unusable_location() {
    let dir = TempDir::new().expect("temp dir");
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"file").expect("write blocker");
    let url = format!("sqlite://{}", blocker.join("session.db").display());

    assert!(PersistentSessionStore::open(&url).await.is_err());
}

#[tokio::test]
async fn cookie_store_round_trip() {
    let store = CookieSessionStore::new(API_URL).expect("cookie store");
    assert_round_trip(&store).await;
}

#[tokio::test]
async fn cookie_store_writes_token_cookie_into_shared_jar() {
    let jar = Arc::new(Jar::default());
    let store = CookieSessionStore::with_jar(Arc::clone(&jar), API_URL).expect("cookie store");

    store.store("tok-jar").await.expect("store");

    let url = Url::parse("http://localhost:8080/real-estate-objects").expect("url");
    let header = jar.cookies(&url).expect("cookie header");
    assert_eq!(header.to_str().expect("ascii"), "token=tok-jar");
    assert!(Arc::ptr_eq(&store.jar(), &jar));
}

#[tokio::test]
async fn cookie_store_rejects_unsafe_tokens() {
    let store = CookieSessionStore::new(API_URL).expect("cookie store");

    for token in ["a;b", "a,b", "a b"] {
        assert!(store.store(token).await.is_err(), "{token}");
    }
    assert_eq!(store.load().await.expect("load"), None);
}

#[test]
fn cookie_store_needs_http_origin() {
    assert!(CookieSessionStore::new("localhost").is_err());
    assert!(CookieSessionStore::new("mailto:ann@example.com").is_err());
}

#[test]
fn finds_named_cookie_in_header() {
    assert_eq!(find_cookie("theme=dark; token=abc", "token"), Some("abc"));
    assert_eq!(find_cookie("token=", "token"), None);
    assert_eq!(find_cookie("tokenx=abc", "token"), None);
}

#[test]
fn parses_storage_kind_names() {
    assert_eq!(
        "Memory".parse::<SessionStorageKind>().ok(),
        Some(SessionStorageKind::Memory)
    );
    assert_eq!(
        "local".parse::<SessionStorageKind>().ok(),
        Some(SessionStorageKind::Persistent)
    );
    assert_eq!(
        "cookie".parse::<SessionStorageKind>().ok(),
        Some(SessionStorageKind::Cookie)
    );
    assert!("redis".parse::<SessionStorageKind>().is_err());
    assert_eq!(SessionStorageKind::default().to_string(), "persistent");
}
