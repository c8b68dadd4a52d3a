use super::*;
use crate::config::ClientConfig;
use crate::constants::HANDSHAKE_LEN;
use crate::metainfo::InfoHash;
use bytes::{Bytes, BytesMut};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const MAX: usize = 1 << 20;

fn info_hash() -> InfoHash {
    InfoHash::from([0xab; 20])
}

fn test_config() -> ClientConfig {
    ClientConfig {
        connect_timeout_ms: 1_000,
        handshake_timeout_ms: 1_000,
        read_timeout_ms: 1_000,
        write_timeout_ms: 1_000,
        ..ClientConfig::default()
    }
}

fn peer_addr() -> SocketAddr {
    "127.0.0.1:6881".parse().unwrap()
}

#[test]
fn test_peer_id_generate() {
    let id1 = PeerId::generate();
    let id2 = PeerId::generate();
    assert_ne!(id1.0, id2.0);
    assert_eq!(&id1.0[..8], b"-SD0001-");
    assert_eq!(id1.client_id(), Some("SD0001"));
}

#[test]
fn test_peer_id_from_bytes() {
    assert!(PeerId::from_bytes(&[1u8; 20]).is_some());
    assert!(PeerId::from_bytes(&[1u8; 19]).is_none());
    assert!(PeerId::from_bytes(&[1u8; 21]).is_none());
}

#[test]
fn test_handshake_layout() {
    let handshake = Handshake::new(&info_hash(), [2u8; 20]);
    let encoded = handshake.encode();

    assert_eq!(encoded.len(), 68);
    assert_eq!(encoded[0], 19);
    assert_eq!(&encoded[1..20], b"BitTorrent protocol");
    assert_eq!(&encoded[20..28], &[0u8; 8]);
    assert_eq!(&encoded[28..48], &[0xab; 20]);
    assert_eq!(&encoded[48..68], &[2u8; 20]);
}

#[test]
fn test_handshake_validate_accepts_matching_hash() {
    let encoded = Handshake::new(&info_hash(), [7u8; 20]).encode();

    let handshake = Handshake::validate(&encoded, &info_hash()).unwrap();
    assert_eq!(handshake.peer_id, [7u8; 20]);
    assert_eq!(handshake.reserved, [0u8; 8]);
}

#[test]
fn test_handshake_validate_accepts_reserved_bits() {
    let mut encoded = Handshake::new(&info_hash(), [7u8; 20]).encode().to_vec();
    encoded[25] = 0x10;

    let handshake = Handshake::validate(&encoded, &info_hash()).unwrap();
    assert_eq!(handshake.reserved[5], 0x10);
}

#[test]
fn test_handshake_validate_rejects_any_hash_byte() {
    let encoded = Handshake::new(&info_hash(), [7u8; 20]).encode();

    for i in 28..48 {
        let mut tampered = encoded.to_vec();
        tampered[i] ^= 0x01;

        let result = Handshake::validate(&tampered, &info_hash());
        assert!(
            matches!(result, Err(PeerError::InvalidHandshake("info hash"))),
            "byte {} accepted",
            i
        );
    }
}

#[test]
fn test_handshake_rejects_wrong_length() {
    let encoded = Handshake::new(&info_hash(), [7u8; 20]).encode();

    assert!(matches!(
        Handshake::decode(&encoded[..67]),
        Err(PeerError::InvalidHandshake("length"))
    ));

    let mut long = encoded.to_vec();
    long.push(0);
    assert!(matches!(
        Handshake::decode(&long),
        Err(PeerError::InvalidHandshake("length"))
    ));
}

#[test]
fn test_handshake_rejects_wrong_protocol() {
    let mut encoded = Handshake::new(&info_hash(), [7u8; 20]).encode().to_vec();
    encoded[1] = b'b';
    assert!(matches!(
        Handshake::decode(&encoded),
        Err(PeerError::InvalidHandshake("protocol name"))
    ));

    let mut encoded = Handshake::new(&info_hash(), [7u8; 20]).encode().to_vec();
    encoded[0] = 18;
    assert!(matches!(
        Handshake::decode(&encoded),
        Err(PeerError::InvalidHandshake("protocol name length"))
    ));
}

#[test]
fn test_message_id_conversion() {
    assert_eq!(MessageId::try_from(0).unwrap(), MessageId::Choke);
    assert_eq!(MessageId::try_from(9).unwrap(), MessageId::Port);
    assert!(matches!(
        MessageId::try_from(20),
        Err(PeerError::UnknownMessageId(20))
    ));
}

#[test]
fn test_interested_bytes() {
    assert_eq!(&interested()[..], &[0, 0, 0, 1, 2]);
}

#[test]
fn test_request_bytes() {
    let msg = request(1, 0x4000, 0x4000);

    assert_eq!(msg.len(), 17);
    assert_eq!(&msg[..5], &[0, 0, 0, 13, 6]);
    assert_eq!(&msg[5..9], &[0, 0, 0, 1]);
    assert_eq!(&msg[9..13], &[0, 0, 0x40, 0]);
    assert_eq!(&msg[13..17], &[0, 0, 0x40, 0]);
}

#[test]
fn test_frame_parse_keep_alive() {
    let mut buf = BytesMut::from(&[0u8, 0, 0, 0][..]);

    assert_eq!(Frame::parse(&mut buf, MAX).unwrap(), Some(Frame::KeepAlive));
    assert!(buf.is_empty());
}

#[test]
fn test_frame_parse_partial() {
    let mut buf = BytesMut::from(&[0u8, 0, 0][..]);
    assert_eq!(Frame::parse(&mut buf, MAX).unwrap(), None);
    assert_eq!(buf.len(), 3);

    let mut buf = BytesMut::from(&[0u8, 0, 0, 5, 4, 0, 0][..]);
    assert_eq!(Frame::parse(&mut buf, MAX).unwrap(), None);
    assert_eq!(buf.len(), 7);
}

#[test]
fn test_frame_parse_consecutive() {
    let mut buf = BytesMut::new();
    buf.extend_from_slice(&interested());
    buf.extend_from_slice(&[0, 0, 0, 0]);
    buf.extend_from_slice(&[0, 0, 0, 5, 4, 0, 0, 0, 3]);

    assert_eq!(
        Frame::parse(&mut buf, MAX).unwrap(),
        Some(Frame::Message {
            id: 2,
            payload: Bytes::new()
        })
    );
    assert_eq!(Frame::parse(&mut buf, MAX).unwrap(), Some(Frame::KeepAlive));

    let have = Frame::parse(&mut buf, MAX).unwrap().unwrap();
    assert_eq!(have.message_id(), Some(MessageId::Have));
    assert_eq!(
        have,
        Frame::Message {
            id: 4,
            payload: Bytes::from_static(&[0, 0, 0, 3])
        }
    );
    assert!(buf.is_empty());
}

#[test]
fn test_frame_parse_oversized() {
    let mut buf = BytesMut::from(&[0u8, 0, 0x10, 0x01][..]);
    assert!(matches!(
        Frame::parse(&mut buf, 4096),
        Err(PeerError::InvalidMessage(_))
    ));
}

#[test]
fn test_frame_encode() {
    assert_eq!(&Frame::KeepAlive.encode().unwrap()[..], &[0, 0, 0, 0]);

    let frame = Frame::Message {
        id: 42,
        payload: Bytes::from_static(b"xy"),
    };
    assert_eq!(&frame.encode().unwrap()[..], &[0, 0, 0, 3, 42, b'x', b'y']);
}

#[test]
fn test_frame_length_limit() {
    assert_eq!(super::message::frame_length(0).unwrap(), 1);
    assert_eq!(super::message::frame_length(u32::MAX as usize - 1).unwrap(), u32::MAX);
    assert!(matches!(
        super::message::frame_length(u32::MAX as usize),
        Err(PeerError::InvalidMessage(_))
    ));
    assert!(matches!(
        super::message::frame_length(usize::MAX),
        Err(PeerError::InvalidMessage(_))
    ));
}

#[test]
fn test_dispatcher_routes_by_id() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let mut dispatcher = Dispatcher::new();
    dispatcher.register(
        MessageId::Have,
        move |_peer: SocketAddr, payload: &Bytes| -> Result<(), PeerError> {
            sink.lock().unwrap().push(payload.clone());
            Ok(())
        },
    );
    assert!(dispatcher.is_registered(4));
    assert!(!dispatcher.is_registered(5));

    let frame = Frame::Message {
        id: 4,
        payload: Bytes::from_static(&[0, 0, 0, 9]),
    };
    assert_eq!(
        dispatcher.dispatch(peer_addr(), &frame).unwrap(),
        Dispatched::Handled(4)
    );
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn test_dispatcher_keep_alive_and_unknown() {
    let mut dispatcher = Dispatcher::default();

    assert_eq!(
        dispatcher.dispatch(peer_addr(), &Frame::KeepAlive).unwrap(),
        Dispatched::KeepAlive
    );

    let frame = Frame::Message {
        id: 20,
        payload: Bytes::from_static(b"extension"),
    };
    assert_eq!(
        dispatcher.dispatch(peer_addr(), &frame).unwrap(),
        Dispatched::Unrecognized(20)
    );
}

#[test]
fn test_dispatcher_custom_fallback_and_raw_ids() {
    let count = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&count);

    let mut dispatcher = Dispatcher::new().with_fallback(
        move |_peer: SocketAddr, _payload: &Bytes| -> Result<(), PeerError> {
            *counter.lock().unwrap() += 1;
            Ok(())
        },
    );
    dispatcher.register_raw(
        20,
        |_peer: SocketAddr, _payload: &Bytes| -> Result<(), PeerError> { Ok(()) },
    );

    let ext = Frame::Message {
        id: 20,
        payload: Bytes::new(),
    };
    let unknown = Frame::Message {
        id: 99,
        payload: Bytes::new(),
    };
    assert_eq!(
        dispatcher.dispatch(peer_addr(), &ext).unwrap(),
        Dispatched::Handled(20)
    );
    assert_eq!(
        dispatcher.dispatch(peer_addr(), &unknown).unwrap(),
        Dispatched::Unrecognized(99)
    );
    assert_eq!(*count.lock().unwrap(), 1);
}

#[test]
fn test_dispatcher_propagates_handler_error() {
    let mut dispatcher = Dispatcher::new();
    dispatcher.register(
        MessageId::Piece,
        |_peer: SocketAddr, _payload: &Bytes| -> Result<(), PeerError> {
            Err(PeerError::InvalidMessage("bad piece".into()))
        },
    );

    let frame = Frame::Message {
        id: 7,
        payload: Bytes::new(),
    };
    assert!(dispatcher.dispatch(peer_addr(), &frame).is_err());
}

#[test]
fn test_session_starts_connecting() {
    let mut session = PeerSession::new(peer_addr(), info_hash(), &test_config());

    assert_eq!(session.state(), SessionState::Connecting);
    assert!(!session.is_established());
    assert!(session.remote_id().is_none());

    assert!(session.close());
    assert!(!session.close());
    assert_eq!(session.state(), SessionState::Closed);
}

/// Accepts one connection and reads the client's handshake.
async fn accept_handshake(listener: &TcpListener) -> (TcpStream, Handshake) {
    let (mut stream, _) = listener.accept().await.unwrap();
    let mut buf = [0u8; HANDSHAKE_LEN];
    stream.read_exact(&mut buf).await.unwrap();
    let handshake = Handshake::decode(&buf).unwrap();
    (stream, handshake)
}

/// Waits for the client to hang up.
async fn drain(mut stream: TcpStream) {
    let mut rest = Vec::new();
    let _ = stream.read_to_end(&mut rest).await;
}

#[tokio::test]
async fn test_session_established() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let our_id = PeerId::generate();

    let peer = tokio::spawn(async move {
        let (mut stream, theirs) = accept_handshake(&listener).await;
        let reply = Handshake::new(&InfoHash::from(theirs.info_hash), [9u8; 20]);
        stream.write_all(&reply.encode()).await.unwrap();
        (theirs, stream)
    });

    let session = PeerSession::connect(addr, info_hash(), our_id, &test_config())
        .await
        .unwrap();
    let (theirs, stream) = peer.await.unwrap();

    assert_eq!(session.state(), SessionState::Established);
    assert_eq!(session.remote_id(), Some(PeerId([9u8; 20])));
    assert_eq!(theirs.info_hash, [0xab; 20]);
    assert_eq!(theirs.peer_id, our_id.0);
    assert_eq!(theirs.reserved, [0u8; 8]);
    drop(stream);
}

#[tokio::test]
async fn test_session_rejects_other_torrent() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let peer = tokio::spawn(async move {
        let (mut stream, _) = accept_handshake(&listener).await;
        let reply = Handshake::new(&InfoHash::from([0xcd; 20]), [9u8; 20]);
        stream.write_all(&reply.encode()).await.unwrap();
        drain(stream).await;
    });

    let mut session = PeerSession::new(addr, info_hash(), &test_config());
    let result = session.open(PeerId::generate()).await;

    assert!(matches!(result, Err(PeerError::InvalidHandshake("info hash"))));
    assert_eq!(session.state(), SessionState::Closed);
    assert!(session.remote_id().is_none());
    assert!(!session.close());
    peer.await.unwrap();
}

#[tokio::test]
async fn test_session_short_handshake() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let peer = tokio::spawn(async move {
        let (mut stream, theirs) = accept_handshake(&listener).await;
        let reply = Handshake::new(&InfoHash::from(theirs.info_hash), [9u8; 20]).encode();
        stream.write_all(&reply[..40]).await.unwrap();
    });

    let mut session = PeerSession::new(addr, info_hash(), &test_config());
    let result = session.open(PeerId::generate()).await;

    assert!(matches!(result, Err(PeerError::InvalidHandshake("length"))));
    assert_eq!(session.state(), SessionState::Closed);
    peer.await.unwrap();
}

#[tokio::test]
async fn test_session_handshake_timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let _peer = tokio::spawn(async move {
        let (stream, _) = accept_handshake(&listener).await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(stream);
    });

    let config = ClientConfig {
        handshake_timeout_ms: 100,
        ..test_config()
    };
    let mut session = PeerSession::new(addr, info_hash(), &config);
    let result = session.open(PeerId::generate()).await;

    assert!(matches!(result, Err(PeerError::Timeout)));
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_session_connect_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut session = PeerSession::new(addr, info_hash(), &test_config());
    let result = session.open(PeerId::generate()).await;

    assert!(result.is_err());
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_session_requires_established() {
    let mut session = PeerSession::new(peer_addr(), info_hash(), &test_config());

    assert!(matches!(
        session.next_frame().await,
        Err(PeerError::NotEstablished)
    ));
    assert!(matches!(
        session.send(&interested()).await,
        Err(PeerError::NotEstablished)
    ));

    session.close();
    assert!(session.open(PeerId::generate()).await.is_err());
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_session_frames_after_handshake() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let peer = tokio::spawn(async move {
        let (mut stream, theirs) = accept_handshake(&listener).await;

        // Handshake and first frames in a single write.
        let mut reply = Handshake::new(&InfoHash::from(theirs.info_hash), [9u8; 20])
            .encode()
            .to_vec();
        reply.extend_from_slice(&[0, 0, 0, 0]);
        reply.extend_from_slice(&[0, 0, 0, 3, 42, 1, 2]);
        stream.write_all(&reply).await.unwrap();

        let mut msg = [0u8; 5];
        stream.read_exact(&mut msg).await.unwrap();
        assert_eq!(msg, [0, 0, 0, 1, 2]);
        drain(stream).await;
    });

    let mut session = PeerSession::connect(addr, info_hash(), PeerId::generate(), &test_config())
        .await
        .unwrap();
    let mut dispatcher = Dispatcher::new();

    let frame = session.next_frame().await.unwrap();
    assert_eq!(frame, Frame::KeepAlive);

    let frame = session.next_frame().await.unwrap();
    assert_eq!(
        dispatcher.dispatch(session.addr(), &frame).unwrap(),
        Dispatched::Unrecognized(42)
    );
    assert!(session.is_established());

    session.send(&interested()).await.unwrap();
    assert!(session.close());
    peer.await.unwrap();
}

#[tokio::test]
async fn test_session_run_until_peer_closes() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let peer = tokio::spawn(async move {
        let (mut stream, theirs) = accept_handshake(&listener).await;
        let reply = Handshake::new(&InfoHash::from(theirs.info_hash), [9u8; 20]);
        stream.write_all(&reply.encode()).await.unwrap();
        stream.write_all(&[0, 0, 0, 1, 1]).await.unwrap();
        stream.write_all(&[0, 0, 0, 5, 4, 0, 0, 0, 2]).await.unwrap();
    });

    let haves = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&haves);
    let mut dispatcher = Dispatcher::new();
    dispatcher.register(
        MessageId::Have,
        move |_peer: SocketAddr, payload: &Bytes| -> Result<(), PeerError> {
            sink.lock().unwrap().push(payload.clone());
            Ok(())
        },
    );

    let mut session = PeerSession::connect(addr, info_hash(), PeerId::generate(), &test_config())
        .await
        .unwrap();
    peer.await.unwrap();

    session.run(&mut dispatcher).await.unwrap();

    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(
        haves.lock().unwrap().as_slice(),
        &[Bytes::from_static(&[0, 0, 0, 2])]
    );
}

#[tokio::test]
async fn test_session_handler_error_closes() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let peer = tokio::spawn(async move {
        let (mut stream, theirs) = accept_handshake(&listener).await;
        let reply = Handshake::new(&InfoHash::from(theirs.info_hash), [9u8; 20]);
        stream.write_all(&reply.encode()).await.unwrap();
        stream.write_all(&[0, 0, 0, 1, 0]).await.unwrap();
        drain(stream).await;
    });

    let mut dispatcher = Dispatcher::new();
    dispatcher.register(
        MessageId::Choke,
        |_peer: SocketAddr, _payload: &Bytes| -> Result<(), PeerError> {
            Err(PeerError::InvalidMessage("choked".into()))
        },
    );

    let mut session = PeerSession::connect(addr, info_hash(), PeerId::generate(), &test_config())
        .await
        .unwrap();
    let result = session.run(&mut dispatcher).await;

    assert!(matches!(result, Err(PeerError::InvalidMessage(_))));
    assert_eq!(session.state(), SessionState::Closed);
    peer.await.unwrap();
}
