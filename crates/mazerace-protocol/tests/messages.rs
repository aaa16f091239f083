//! Message-level tests: every opcode through the codec, and whole frames
//! through a real TCP connection.

use std::time::Duration;

use mazerace_maze::{Maze, Position};
use mazerace_protocol::{
    Codec, ErrorCode, Message, MrmpCodec, ProtocolError, receive_message, send_message,
};
use mazerace_transport::{Instant, TcpConnection, TcpTransport, Transport};

fn every_message() -> Vec<Message> {
    vec![
        Message::Error(ErrorCode::Unknown),
        Message::Error(ErrorCode::IllegalOpcode),
        Message::Error(ErrorCode::VersionMismatch),
        Message::Error(ErrorCode::FullQueue),
        Message::Ping,
        Message::hello(),
        Message::Hello { version: 7 },
        Message::Join,
        Message::Leave,
        Message::Move(Position::new(3, 4)),
        Message::BadMove(Position::new(0, 0)),
        Message::Result { won: true },
        Message::Result { won: false },
        Message::JoinResponse(Maze::generate(10, 20).unwrap()),
        Message::JoinResponse(Maze::generate(1, 1).unwrap()),
        Message::Start,
        Message::Ready,
        Message::Pong,
        Message::Timeout,
        Message::OpponentMove(Position::new(254, 254)),
        Message::HelloAck,
    ]
}

#[test]
fn test_every_opcode_survives_the_codec() {
    let codec = MrmpCodec;
    for message in every_message() {
        let frame = codec.encode(&message);
        let decoded = codec.decode_frame(&frame).expect("well-formed frame");
        assert_eq!(decoded, message, "{} did not survive", message.opcode());
    }
}

#[test]
fn test_join_response_for_10x20_maze_is_202_payload_bytes() {
    let maze = Maze::generate(10, 20).unwrap();
    let frame = MrmpCodec.encode(&Message::JoinResponse(maze.clone()));
    assert_eq!(frame.len(), 5 + 2 + 200);
    assert_eq!(&frame[..5], &[8, 0, 0, 0, 202]);

    let Message::JoinResponse(decoded) = MrmpCodec.decode_frame(&frame).unwrap() else {
        panic!("expected a join-response");
    };
    assert_eq!(decoded, maze);
    assert_eq!(decoded.goal(), Position::new(9, 19));
}

#[test]
fn test_largest_maze_fits_in_one_frame() {
    let maze = Maze::generate(255, 255).unwrap();
    let frame = MrmpCodec.encode(&Message::JoinResponse(maze.clone()));
    assert_eq!(
        MrmpCodec.decode_frame(&frame).unwrap(),
        Message::JoinResponse(maze)
    );
}

// ===========================================================================
// Over the wire
// ===========================================================================

async fn connected_pair() -> (TcpConnection, TcpConnection) {
    let mut transport = TcpTransport::bind("127.0.0.1:0").await.unwrap();
    let addr = transport.local_addr().unwrap();
    let server = tokio::spawn(async move { transport.accept().await.unwrap() });
    let client = TcpConnection::connect(addr).await.unwrap();
    (server.await.unwrap(), client)
}

#[tokio::test]
async fn test_send_and_receive_back_to_back_messages() {
    let (server, client) = connected_pair().await;
    let codec = MrmpCodec;

    let sent = every_message();
    for message in &sent {
        send_message(&client, &codec, message, None).await.unwrap();
    }
    for expected in &sent {
        let got = receive_message(&server, &codec, None).await.unwrap();
        assert_eq!(&got, expected);
    }
}

#[tokio::test]
async fn test_receive_unknown_opcode_keeps_stream_in_sync() {
    use mazerace_transport::Connection;

    let (server, client) = connected_pair().await;
    let codec = MrmpCodec;

    // Opcode 99 with a 3-byte payload, then a valid ping.
    client.send_all(&[99, 0, 0, 0, 3, 1, 2, 3]).await.unwrap();
    send_message(&client, &codec, &Message::Ping, None).await.unwrap();

    let err = receive_message(&server, &codec, None).await.unwrap_err();
    assert!(matches!(err, ProtocolError::UnknownOpcode(99)));
    assert_eq!(
        receive_message(&server, &codec, None).await.unwrap(),
        Message::Ping
    );
}

#[tokio::test]
async fn test_receive_times_out_on_trickled_payload() {
    use mazerace_transport::Connection;

    let (server, client) = connected_pair().await;
    // Header announces two bytes; only one ever arrives.
    client.send_all(&[5, 0, 0, 0, 2, 1]).await.unwrap();

    let deadline = Instant::now() + Duration::from_millis(100);
    let err = receive_message(&server, &MrmpCodec, Some(deadline))
        .await
        .unwrap_err();
    assert!(err.is_timeout(), "expected a timeout, got {err:?}");
}

#[tokio::test]
async fn test_receive_reports_closed_peer() {
    let (server, client) = connected_pair().await;
    drop(client);

    let err = receive_message(&server, &MrmpCodec, None).await.unwrap_err();
    assert!(
        err.as_transport()
            .is_some_and(mazerace_transport::TransportError::is_clean_close)
    );
}

#[tokio::test]
async fn test_send_times_out_when_peer_stops_reading() {
    // The peer never reads, so the socket buffers fill up and a write
    // eventually cannot finish before its deadline.
    let (_server, client) = connected_pair().await;
    let big = Message::JoinResponse(Maze::generate(255, 255).unwrap());

    let mut timed_out = None;
    for _ in 0..2_000 {
        let deadline = Instant::now() + Duration::from_millis(100);
        if let Err(e) = send_message(&client, &MrmpCodec, &big, Some(deadline)).await {
            timed_out = Some(e);
            break;
        }
    }
    let err = timed_out.expect("writes to a stalled peer must time out");
    assert!(err.is_timeout(), "expected a timeout, got {err:?}");
}
