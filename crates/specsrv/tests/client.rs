//! Client against a live server.

mod common;

use common::TestServer;
use specsrv::client::{CachedSpecClient, DEFAULT_RETRY_DELAY, SpecCache, SpecClient};
use specsrv::config::ServerConfig;
use specsrv::error::ClientError;
use specsrv::server::SpecServer;
use specsrv::shutdown::ShutdownReason;
use specsrv_core::{PackageSpecifier, PrereleaseId};
use std::time::Duration;

#[tokio::test]
async fn test_classify_both_outcomes() {
    let server = TestServer::start(ServerConfig::default()).await;
    let mut client = SpecClient::connect(&server.socket).await.unwrap();

    assert_eq!(
        client.classify("latest").await.unwrap(),
        Ok(PackageSpecifier::Tag("latest".into()))
    );
    assert_eq!(
        client.classify("git+https://example.com/x.git").await.unwrap(),
        Ok(PackageSpecifier::Git("git+https://example.com/x.git".into()))
    );

    let err = client.classify("ht://stuff.cat").await.unwrap().unwrap_err();
    assert!(err.starts_with("EUNSUPPORTEDPROTOCOL: "), "{}", err);
}

#[tokio::test]
async fn test_prerelease_survives_the_wire() {
    let server = TestServer::start(ServerConfig::default()).await;
    let mut client = SpecClient::connect(&server.socket).await.unwrap();

    let Ok(PackageSpecifier::Range(constraint)) = client.classify("1.2.3-alpha.5").await.unwrap()
    else {
        panic!("expected a range");
    };
    let version = constraint.0[0][0].version().unwrap();
    assert_eq!(
        version.prerelease,
        vec![PrereleaseId::String("alpha".into()), PrereleaseId::Int(5)]
    );
}

#[tokio::test]
async fn test_multiline_spec_rejected_locally() {
    let server = TestServer::start(ServerConfig::default()).await;
    let mut client = SpecClient::connect(&server.socket).await.unwrap();

    assert!(matches!(
        client.classify("a\nb").await,
        Err(ClientError::MultilineRequest(_))
    ));
    assert!(client.classify("latest").await.unwrap().is_ok());
}

#[tokio::test]
async fn test_closed_connection() {
    let server = TestServer::start(ServerConfig::default()).await;
    let mut client = SpecClient::connect(&server.socket).await.unwrap();

    server.token.cancel(ShutdownReason::Signal);
    server.join().await;

    assert!(matches!(
        client.classify("latest").await,
        Err(ClientError::Closed | ClientError::Io(_))
    ));
}

#[tokio::test]
async fn test_cached_client_reuses_answers() {
    let server = TestServer::start(ServerConfig::default()).await;
    let cache = SpecCache::new();
    let mut client = CachedSpecClient::new(
        SpecClient::connect(&server.socket).await.unwrap(),
        cache.clone(),
    );

    let first = client.classify("^1.2.3").await.unwrap();
    assert_eq!(cache.len(), 1);

    // Answers keep coming from the cache once the server is gone.
    server.token.cancel(ShutdownReason::Signal);
    server.join().await;

    assert_eq!(client.classify("^1.2.3").await.unwrap(), first);
    assert_eq!(client.cache().len(), 1);
}

#[tokio::test]
async fn test_connect_with_retry_waits_for_server() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("late.sock");

    let server = SpecServer::new(specsrv::npm_classifier(), &socket, ServerConfig::default());
    let token = server.shutdown_token();
    let handle = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        server.run().await
    });

    let mut client = SpecClient::connect_with_retry(&socket, 50, Duration::from_millis(10))
        .await
        .unwrap();
    assert_eq!(
        client.classify("next").await.unwrap(),
        Ok(PackageSpecifier::Tag("next".into()))
    );

    token.cancel(ShutdownReason::Signal);
    handle.await.unwrap().unwrap();
    assert_eq!(DEFAULT_RETRY_DELAY, Duration::from_millis(200));
}
