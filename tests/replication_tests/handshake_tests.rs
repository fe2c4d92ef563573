//! Handshake Tests
//!
//! Replica handshake against scripted mock masters, plus the
//! replication identity.

#[path = "../common/mod.rs"]
mod common;

use std::time::Duration;

use common::{replica_of, spawn_mock_master, unused_port, MasterStep};
use relaykv::error::HandshakeError;
use relaykv::protocol::{Command, ProtocolValue};
use relaykv::replication::{
    HandshakeState, ReplicaHandshake, Role, ServerIdentity, REPLICATION_ID_LEN,
};
use relaykv::{Config, ReplicaOf};

const STEP_TIMEOUT: Duration = Duration::from_secs(2);

fn expected_commands(port: u16) -> Vec<Command> {
    vec![
        Command::new("PING", Vec::<String>::new()),
        Command::new("REPLCONF", ["listening-port".to_string(), port.to_string()]),
        Command::new("REPLCONF", ["capa", "psync2"]),
    ]
}

// =============================================================================
// Handshake Sequencing
// =============================================================================

#[test]
fn test_handshake_completes_against_cooperative_master() {
    let (addr, master) = spawn_mock_master(vec![
        MasterStep::Reply(b"+PONG\r\n"),
        MasterStep::Reply(b"+OK\r\n"),
        MasterStep::Reply(b"+OK\r\n"),
    ]);

    let mut handshake = ReplicaHandshake::new(replica_of(addr), 7001, STEP_TIMEOUT);
    assert_eq!(handshake.state(), HandshakeState::NotStarted);

    let link = handshake.run().unwrap();
    assert_eq!(handshake.state(), HandshakeState::AwaitingFullResync);
    assert_eq!(link.master(), &replica_of(addr));

    drop(link);
    assert_eq!(master.join().unwrap(), expected_commands(7001));
}

#[test]
fn test_handshake_accepts_bulk_pong() {
    let (addr, _master) = spawn_mock_master(vec![
        MasterStep::Reply(b"$4\r\nPONG\r\n"),
        MasterStep::Reply(b"+OK\r\n"),
        MasterStep::Reply(b"+OK\r\n"),
    ]);

    let mut handshake = ReplicaHandshake::new(replica_of(addr), 7002, STEP_TIMEOUT);
    assert!(handshake.run().is_ok());
}

#[test]
fn test_handshake_keeps_bytes_after_last_reply() {
    let (addr, _master) = spawn_mock_master(vec![
        MasterStep::Reply(b"+PONG\r\n"),
        MasterStep::Reply(b"+OK\r\n"),
        MasterStep::Reply(b"+OK\r\n+FULLRESYNC abc 0\r\n"),
    ]);

    let mut handshake = ReplicaHandshake::new(replica_of(addr), 7003, STEP_TIMEOUT);
    let link = handshake.run().unwrap();

    let (mut stream, mut buffer) = link.into_parts();
    let next = buffer.read_frame(&mut stream).unwrap();
    assert_eq!(next, Some(ProtocolValue::simple("FULLRESYNC abc 0")));
}

#[test]
fn test_handshake_fails_when_master_closes_after_ping() {
    let (addr, master) = spawn_mock_master(vec![MasterStep::Close]);

    let mut handshake = ReplicaHandshake::new(replica_of(addr), 7004, STEP_TIMEOUT);
    let err = handshake.run().unwrap_err();

    assert!(
        matches!(err, HandshakeError::Closed { .. } | HandshakeError::Io(_)),
        "unexpected error: {}",
        err
    );
    assert_eq!(handshake.state(), HandshakeState::SentPing);
    assert_eq!(master.join().unwrap().len(), 1);
}

#[test]
fn test_handshake_fails_on_error_reply() {
    let (addr, _master) = spawn_mock_master(vec![
        MasterStep::Reply(b"+PONG\r\n"),
        MasterStep::Reply(b"-ERR not allowed\r\n"),
    ]);

    let mut handshake = ReplicaHandshake::new(replica_of(addr), 7005, STEP_TIMEOUT);
    match handshake.run() {
        Err(HandshakeError::Rejected { message, .. }) => assert_eq!(message, "ERR not allowed"),
        other => panic!("expected rejection, got {:?}", other.map(|_| ())),
    }
    assert_eq!(handshake.state(), HandshakeState::SentListeningPort);
}

#[test]
fn test_handshake_fails_on_unexpected_reply() {
    let (addr, _master) = spawn_mock_master(vec![MasterStep::Reply(b"+OK\r\n")]);

    let mut handshake = ReplicaHandshake::new(replica_of(addr), 7006, STEP_TIMEOUT);
    assert!(matches!(
        handshake.run(),
        Err(HandshakeError::UnexpectedReply { step: "PING", .. })
    ));
}

#[test]
fn test_handshake_requires_simple_ok_for_replconf() {
    let (addr, _master) = spawn_mock_master(vec![
        MasterStep::Reply(b"+PONG\r\n"),
        MasterStep::Reply(b"$2\r\nOK\r\n"),
    ]);

    let mut handshake = ReplicaHandshake::new(replica_of(addr), 7010, STEP_TIMEOUT);
    assert!(matches!(
        handshake.run(),
        Err(HandshakeError::UnexpectedReply {
            step: "REPLCONF listening-port",
            ..
        })
    ));
    assert_eq!(handshake.state(), HandshakeState::SentListeningPort);
}

#[test]
fn test_handshake_fails_on_malformed_reply() {
    let (addr, _master) = spawn_mock_master(vec![MasterStep::Reply(b"?garbage\r\n")]);

    let mut handshake = ReplicaHandshake::new(replica_of(addr), 7007, STEP_TIMEOUT);
    assert!(matches!(handshake.run(), Err(HandshakeError::Decode(_))));
}

#[test]
fn test_handshake_times_out_on_silent_master() {
    let (addr, _master) = spawn_mock_master(vec![MasterStep::Stall(Duration::from_secs(2))]);

    let mut handshake = ReplicaHandshake::new(replica_of(addr), 7008, Duration::from_millis(200));
    assert!(matches!(
        handshake.run(),
        Err(HandshakeError::Timeout { step: "PING" })
    ));
}

#[test]
fn test_handshake_fails_when_master_unreachable() {
    let master = ReplicaOf::new("127.0.0.1", unused_port());

    let mut handshake = ReplicaHandshake::new(master, 7009, STEP_TIMEOUT);
    assert!(matches!(handshake.run(), Err(HandshakeError::Connect { .. })));
    assert_eq!(handshake.state(), HandshakeState::NotStarted);
}

// =============================================================================
// Identity Tests
// =============================================================================

#[test]
fn test_master_identity() {
    let identity = ServerIdentity::master();

    assert!(identity.is_master());
    assert_eq!(identity.role(), &Role::Master);
    let id = identity.replication_id().unwrap();
    assert_eq!(id.len(), REPLICATION_ID_LEN);
    assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(identity.replication_offset(), 0);
}

#[test]
fn test_master_ids_differ() {
    let a = ServerIdentity::master();
    let b = ServerIdentity::master();
    assert_ne!(a.replication_id(), b.replication_id());
}

#[test]
fn test_replica_identity_from_config() {
    let config = Config::builder().replica_of("10.0.0.1", 6380).build();
    let identity = ServerIdentity::from_config(&config);

    assert!(!identity.is_master());
    assert_eq!(identity.role(), &Role::Replica(ReplicaOf::new("10.0.0.1", 6380)));
    assert_eq!(identity.replication_id(), None);
    assert_eq!(identity.info_replication(), "role:slave");
}

#[test]
fn test_offset_never_decreases() {
    let identity = ServerIdentity::master();

    assert_eq!(identity.advance_offset(10), 10);
    assert_eq!(identity.advance_offset(0), 10);
    assert_eq!(identity.advance_offset(5), 15);
    assert_eq!(identity.replication_offset(), 15);
}
