//! Register writes: address-space rules, check ordering and uniqueness

#![allow(clippy::disallowed_methods)] // Integration test - unwrap is acceptable

mod common;

use common::{register_request, TestEnv};
use regsrv::models::{CreateConnection, CreateRegister, CreateSlave, UpdateRegister};
use regsrv::{ErrorKind, ProtocolType};

#[tokio::test]
async fn test_main_sensor_scenario() {
    let env = TestEnv::create().await;

    let conn = env
        .state
        .connections
        .create(CreateConnection {
            name: "Main".to_string(),
            port: None,
            protocol_type: ProtocolType::RtuOverTcp,
        })
        .await
        .unwrap();
    assert_eq!(conn.port, 502);

    let slave = env
        .state
        .slaves
        .create(CreateSlave {
            connection_id: conn.id.clone(),
            name: "Sensor".to_string(),
            slave_address: 1,
        })
        .await
        .unwrap();

    env.state
        .registers
        .create(register_request(&slave, 40001, "ABCD"))
        .await
        .unwrap();

    let duplicate = env
        .state
        .registers
        .create(register_request(&slave, 40001, "1234"))
        .await
        .unwrap_err();
    assert_eq!(duplicate.kind(), ErrorKind::Conflict);
    assert_eq!(duplicate.field(), Some("start_address"));

    let odd = env
        .state
        .registers
        .create(register_request(&slave, 1, "ABC"))
        .await
        .unwrap_err();
    assert_eq!(odd.kind(), ErrorKind::Validation);
    assert_eq!(odd.field(), Some("hex_payload"));
    assert!(odd.to_string().contains("Coil"));
}

#[tokio::test]
async fn test_first_failing_check_wins() {
    let env = TestEnv::create().await;
    let conn = env.connection("Main", None).await;
    let slave = env.slave(&conn, "Sensor", 1).await;

    // Blank id beats a negative address
    let mut req = register_request(&slave, -5, "");
    req.slave_id = " ".to_string();
    let err = env.state.registers.create(req).await.unwrap_err();
    assert_eq!(err.field(), Some("slave_id"));

    // Negative address beats a blank payload
    let err = env
        .state
        .registers
        .create(register_request(&slave, -5, ""))
        .await
        .unwrap_err();
    assert_eq!(err.field(), Some("start_address"));

    // Blank payload beats an unmapped address
    let err = env
        .state
        .registers
        .create(register_request(&slave, 20000, ""))
        .await
        .unwrap_err();
    assert_eq!(err.field(), Some("hex_payload"));

    // Non-hex payload beats an unmapped address
    let err = env
        .state
        .registers
        .create(register_request(&slave, 20000, "AB CD"))
        .await
        .unwrap_err();
    assert_eq!(err.field(), Some("hex_payload"));

    // Unmapped address lists every valid range
    let err = env
        .state
        .registers
        .create(register_request(&slave, 20000, "ABCD"))
        .await
        .unwrap_err();
    assert_eq!(err.field(), Some("start_address"));
    let message = err.to_string();
    for range in ["1-9999", "10001-19999", "30001-39999", "40001-49999"] {
        assert!(message.contains(range), "{message}");
    }
}

#[tokio::test]
async fn test_validation_runs_before_parent_lookup() {
    let env = TestEnv::create().await;

    let err = env
        .state
        .registers
        .create(CreateRegister {
            connection_id: "missing".to_string(),
            slave_id: "missing".to_string(),
            start_address: 0,
            hex_payload: "ABCD".to_string(),
            names: String::new(),
            coefficients: String::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = env
        .state
        .registers
        .create(CreateRegister {
            connection_id: "missing".to_string(),
            slave_id: "missing".to_string(),
            start_address: 40001,
            hex_payload: "ABCD".to_string(),
            names: String::new(),
            coefficients: String::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_payload_is_stored_uppercase_and_list_is_ordered() {
    let env = TestEnv::create().await;
    let conn = env.connection("Main", None).await;
    let slave = env.slave(&conn, "Sensor", 1).await;

    env.register(&slave, 40001, "abcd").await;
    env.register(&slave, 10001, "0f").await;
    env.register(&slave, 30001, "00ff00ff").await;
    env.register(&slave, 1, "a5").await;

    let registers = env.state.registers.list(&slave.id).await.unwrap();
    let starts: Vec<_> = registers.iter().map(|r| r.start_address).collect();
    assert_eq!(starts, [1, 10001, 30001, 40001]);
    assert_eq!(registers[3].hex_payload, "ABCD");
    assert_eq!(registers[0].hex_payload, "A5");
}

#[tokio::test]
async fn test_register_under_wrong_connection_is_not_found() {
    let env = TestEnv::create().await;
    let main = env.connection("Main", None).await;
    let backup = env.connection("Backup", None).await;
    let slave = env.slave(&main, "Sensor", 1).await;

    let mut req = register_request(&slave, 40001, "ABCD");
    req.connection_id = backup.id.clone();
    let err = env.state.registers.create(req).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(env.state.registers.list(&slave.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_and_delete() {
    let env = TestEnv::create().await;
    let conn = env.connection("Main", None).await;
    let slave = env.slave(&conn, "Sensor", 1).await;
    let first = env.register(&slave, 40001, "ABCD").await;
    env.register(&slave, 40010, "0001").await;

    let updated = env
        .state
        .registers
        .update(UpdateRegister {
            connection_id: conn.id.clone(),
            slave_id: slave.id.clone(),
            register_id: first.id.clone(),
            start_address: 40002,
            hex_payload: "beef0001".to_string(),
            names: "voltage,current".to_string(),
            coefficients: "0.1,0.01".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(updated.hex_payload, "BEEF0001");

    let fetched = env
        .state
        .registers
        .get(&conn.id, &slave.id, &first.id)
        .await
        .unwrap();
    assert_eq!(fetched.start_address, 40002);
    assert_eq!(fetched.names, "voltage,current");

    let collision = env
        .state
        .registers
        .update(UpdateRegister {
            connection_id: conn.id.clone(),
            slave_id: slave.id.clone(),
            register_id: first.id.clone(),
            start_address: 40010,
            hex_payload: "0000".to_string(),
            names: String::new(),
            coefficients: String::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(collision.kind(), ErrorKind::Conflict);

    env.state
        .registers
        .delete(&conn.id, &slave.id, &first.id)
        .await
        .unwrap();
    let err = env
        .state
        .registers
        .delete(&conn.id, &slave.id, &first.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(env.state.registers.list(&slave.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_missing_register_is_not_found() {
    let env = TestEnv::create().await;
    let conn = env.connection("Main", None).await;
    let slave = env.slave(&conn, "Sensor", 1).await;

    let err = env
        .state
        .registers
        .update(UpdateRegister {
            connection_id: conn.id.clone(),
            slave_id: slave.id.clone(),
            register_id: "missing".to_string(),
            start_address: 40001,
            hex_payload: "ABCD".to_string(),
            names: String::new(),
            coefficients: String::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
