//! Endpoint cache: read-through resolution and invalidation on every mutation

#![allow(clippy::disallowed_methods)] // Integration test - unwrap is acceptable

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::TestEnv;
use regsrv::address_space::RegisterClass;
use regsrv::coherency::{CacheCoherency, Invalidation};
use regsrv::models::{UpdateConnection, UpdateRegister};
use regsrv::repository::ConnectionRepository;
use regsrv::{ErrorKind, ProtocolType, RegisterCache, RegisterImage};

#[tokio::test]
async fn test_resolve_hits_cache_on_second_read() {
    let env = TestEnv::create().await;
    let conn = env.connection("Main", None).await;
    let slave = env.slave(&conn, "Sensor", 1).await;
    env.register(&slave, 40001, "ABCD").await;

    let first = env.state.registers.resolve_endpoint(conn.port, 1).await.unwrap();
    let second = env.state.registers.resolve_endpoint(conn.port, 1).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    let stats = env.state.cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.entries, 1);
}

#[tokio::test]
async fn test_register_writes_invalidate_endpoint() {
    let env = TestEnv::create().await;
    let conn = env.connection("Main", None).await;
    let slave = env.slave(&conn, "Sensor", 1).await;
    let register = env.register(&slave, 40001, "ABCD").await;

    env.state.registers.resolve_endpoint(conn.port, 1).await.unwrap();
    env.register(&slave, 40002, "0001").await;
    assert!(!env.state.cache.contains(conn.port, 1));

    let served = env.state.registers.resolve_endpoint(conn.port, 1).await.unwrap();
    assert_eq!(served.len(), 2);

    env.state
        .registers
        .update(UpdateRegister {
            connection_id: conn.id.clone(),
            slave_id: slave.id.clone(),
            register_id: register.id.clone(),
            start_address: 40001,
            hex_payload: "FFFF".to_string(),
            names: String::new(),
            coefficients: String::new(),
        })
        .await
        .unwrap();
    assert!(!env.state.cache.contains(conn.port, 1));

    let served = env.state.registers.resolve_endpoint(conn.port, 1).await.unwrap();
    assert_eq!(served[0].hex_payload, "FFFF");

    env.state
        .registers
        .delete(&conn.id, &slave.id, &register.id)
        .await
        .unwrap();
    assert!(!env.state.cache.contains(conn.port, 1));
    assert_eq!(
        env.state
            .registers
            .resolve_endpoint(conn.port, 1)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_connection_port_change_invalidates_both_ports() {
    let env = TestEnv::create().await;
    let conn = env.connection("Main", None).await;
    env.slave(&conn, "A", 1).await;
    env.slave(&conn, "B", 2).await;

    env.state.registers.resolve_endpoint(conn.port, 1).await.unwrap();
    env.state.registers.resolve_endpoint(conn.port, 2).await.unwrap();
    // Leftover at the destination port
    env.state
        .cache
        .insert_if_current(1502, 1, Vec::new(), env.state.cache.epoch());

    env.state
        .connections
        .update(UpdateConnection {
            id: conn.id.clone(),
            name: "Main".to_string(),
            port: 1502,
            protocol_type: ProtocolType::Tcp,
        })
        .await
        .unwrap();

    assert!(env.state.cache.is_empty());
    let err = env
        .state
        .registers
        .resolve_endpoint(conn.port, 1)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(env.state.registers.resolve_endpoint(1502, 1).await.is_ok());
}

#[tokio::test]
async fn test_connection_delete_invalidates_every_slave() {
    let env = TestEnv::create().await;
    let main = env.connection("Main", None).await;
    let backup = env.connection("Backup", None).await;
    env.slave(&main, "A", 1).await;
    env.slave(&main, "B", 2).await;
    env.slave(&backup, "A", 1).await;

    for (port, address) in [(main.port, 1), (main.port, 2), (backup.port, 1)] {
        env.state
            .registers
            .resolve_endpoint(port, address)
            .await
            .unwrap();
    }

    env.state.connections.delete(&main.id).await.unwrap();

    assert!(!env.state.cache.contains(main.port, 1));
    assert!(!env.state.cache.contains(main.port, 2));
    assert!(env.state.cache.contains(backup.port, 1));
}

#[tokio::test]
async fn test_invalidation_for_missing_connection_is_skipped() {
    let env = TestEnv::create().await;
    let coherency = CacheCoherency::new(
        Arc::clone(&env.state.cache),
        ConnectionRepository::new(env.state.sqlite_client.pool().clone()),
    );

    let outcome = coherency.invalidate_for_connection("missing").await;
    assert!(matches!(outcome, Invalidation::Skipped(_)));

    let conn = env.connection("Main", None).await;
    env.slave(&conn, "A", 1).await;
    env.slave(&conn, "B", 2).await;
    assert_eq!(
        coherency.invalidate_for_connection(&conn.id).await,
        Invalidation::Applied(vec![(conn.port, 1), (conn.port, 2)])
    );
}

#[tokio::test]
async fn test_expired_entry_is_reloaded() {
    let env = TestEnv::with_ttl(Duration::from_millis(20)).await;
    let conn = env.connection("Main", None).await;
    let slave = env.slave(&conn, "Sensor", 1).await;
    env.register(&slave, 40001, "ABCD").await;

    let first = env.state.registers.resolve_endpoint(conn.port, 1).await.unwrap();
    tokio::time::sleep(Duration::from_millis(40)).await;
    let second = env.state.registers.resolve_endpoint(conn.port, 1).await.unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(env.state.cache.stats().misses, 2);
}

#[tokio::test]
async fn test_disabled_cache_always_reads_store() {
    let env = TestEnv::with_cache(RegisterCache::disabled()).await;
    let conn = env.connection("Main", None).await;
    let slave = env.slave(&conn, "Sensor", 1).await;
    env.register(&slave, 40001, "ABCD").await;

    env.state.registers.resolve_endpoint(conn.port, 1).await.unwrap();
    env.state.registers.resolve_endpoint(conn.port, 1).await.unwrap();
    assert!(env.state.cache.is_empty());
    assert_eq!(env.state.cache.stats().hits, 0);
}

#[tokio::test]
async fn test_resolved_set_decodes_into_image() {
    let env = TestEnv::create().await;
    let conn = env.connection("Main", None).await;
    let slave = env.slave(&conn, "Sensor", 1).await;
    env.register(&slave, 1, "03").await;
    env.register(&slave, 40001, "00640190").await;

    let registers = env.state.registers.resolve_endpoint(conn.port, 1).await.unwrap();
    let image = RegisterImage::from_registers(&registers).unwrap();

    assert_eq!(
        image.read_bits(RegisterClass::Coil, 1, 3),
        Some(vec![true, true, false])
    );
    assert_eq!(
        image.read_words(RegisterClass::HoldingRegister, 40001, 2),
        Some(vec![100, 400])
    );
    assert!(image
        .read_words(RegisterClass::HoldingRegister, 40003, 1)
        .is_none());
}
