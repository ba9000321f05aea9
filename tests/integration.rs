use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use rand::Rng;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;

use exoredis::codec::FrameCodec;
use exoredis::config::Config;
use exoredis::frame::Frame;
use exoredis::request::Request;
use exoredis::server::serve;

type Client = Framed<TcpStream, FrameCodec>;

async fn connect() -> Client {
    connect_with(Config::default()).await
}

/// Serves a fresh keyspace on an ephemeral port and connects a client to it.
async fn connect_with(config: Config) -> Client {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();

    tokio::spawn(serve(listener, config));

    let stream = TcpStream::connect(address).await.unwrap();
    Framed::new(stream, FrameCodec::default())
}

async fn send_raw(client: &mut Client, bytes: &[u8]) -> Frame {
    use tokio::io::AsyncWriteExt;

    client.get_mut().write_all(bytes).await.unwrap();
    client.next().await.unwrap().unwrap()
}

async fn query(client: &mut Client, line: &str) -> Frame {
    let mut parts = line.split(' ');
    let name = parts.next().unwrap().to_string();
    let args = parts.map(|part| Bytes::from(part.to_string())).collect();

    query_request(client, Request::new(name, args)).await
}

async fn query_request(client: &mut Client, request: Request) -> Frame {
    client.send(request).await.unwrap();
    client.next().await.unwrap().unwrap()
}

fn ok() -> Frame {
    Frame::Simple("OK".to_string())
}

fn error(message: &str) -> Frame {
    Frame::Error(message.to_string())
}

fn bulks(items: &[&str]) -> Frame {
    Frame::Array(
        items
            .iter()
            .map(|item| Frame::Bulk(Bytes::from(item.to_string())))
            .collect(),
    )
}

/// Random bytes that can travel inside a request line.
fn random_token(rng: &mut impl Rng, len: usize) -> Bytes {
    (0..len)
        .map(|_| loop {
            let byte: u8 = rng.gen();
            if !matches!(byte, b' ' | b'\r' | b'\n') {
                break byte;
            }
        })
        .collect::<Vec<u8>>()
        .into()
}

#[tokio::test]
async fn test_set_and_get() {
    let mut client = connect().await;

    assert_eq!(query(&mut client, "SET key1 value1").await, ok());
    assert_eq!(
        query(&mut client, "GET key1").await,
        Frame::Bulk(Bytes::from("value1"))
    );
    assert_eq!(query(&mut client, "GET key2").await, Frame::Null);
}

#[tokio::test]
async fn test_set_nx_xx() {
    let mut client = connect().await;

    assert_eq!(query(&mut client, "SET key1 1 XX").await, Frame::Null);
    assert_eq!(query(&mut client, "SET key1 1 NX").await, ok());
    assert_eq!(query(&mut client, "SET key1 2 NX").await, Frame::Null);
    assert_eq!(query(&mut client, "SET key1 3 XX").await, ok());
    assert_eq!(
        query(&mut client, "GET key1").await,
        Frame::Bulk(Bytes::from("3"))
    );
}

#[tokio::test]
async fn test_set_with_expiration() {
    let mut client = connect().await;

    assert_eq!(query(&mut client, "SET key1 v EX 100").await, ok());
    assert_eq!(query(&mut client, "TTL key1").await, Frame::Integer(100));

    assert_eq!(query(&mut client, "SET key1 v PX 1").await, ok());
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    assert_eq!(query(&mut client, "GET key1").await, Frame::Null);
    assert_eq!(query(&mut client, "TTL key1").await, Frame::Integer(-2));
}

#[tokio::test]
async fn test_bits() {
    let mut client = connect().await;

    assert_eq!(query(&mut client, "SET x hello").await, ok());
    assert_eq!(query(&mut client, "SETBIT x 0 1").await, Frame::Integer(0));
    assert_eq!(query(&mut client, "GETBIT x 0").await, Frame::Integer(1));
    assert_eq!(
        query(&mut client, "GET x").await,
        Frame::Bulk(Bytes::from_static(b"\xe8ello"))
    );

    assert_eq!(query(&mut client, "GETBIT missing 100").await, Frame::Integer(0));
    assert_eq!(query(&mut client, "SETBIT y 15 1").await, Frame::Integer(0));
    assert_eq!(
        query(&mut client, "GET y").await,
        Frame::Bulk(Bytes::from_static(b"\x00\x01"))
    );
    assert_eq!(
        query(&mut client, "SETBIT y 0 2").await,
        error("ERR bit is not an integer or out of range")
    );
}

#[tokio::test]
async fn test_sorted_set() {
    let mut client = connect().await;

    assert_eq!(query(&mut client, "ZADD zset 1.5 a").await, Frame::Integer(1));
    assert_eq!(query(&mut client, "ZADD zset 0.5 b").await, Frame::Integer(1));
    assert_eq!(query(&mut client, "ZADD zset 1.5 c").await, Frame::Integer(1));
    assert_eq!(query(&mut client, "ZADD zset 1.5 c").await, Frame::Integer(0));
    assert_eq!(query(&mut client, "ZCARD zset").await, Frame::Integer(3));

    assert_eq!(
        query(&mut client, "ZRANGE zset 0 -1").await,
        bulks(&["b", "a", "c"])
    );
    assert_eq!(query(&mut client, "ZRANGE zset -2 -1").await, bulks(&["a", "c"]));
    assert_eq!(query(&mut client, "ZRANGE zset 2 1").await, bulks(&[]));
    assert_eq!(
        query(&mut client, "ZRANGE zset 0 0 WITHSCORES").await,
        bulks(&["b", "0.5"])
    );
    assert_eq!(query(&mut client, "ZRANGE nothing 0 -1").await, bulks(&[]));

    assert_eq!(query(&mut client, "ZCOUNT zset 1 2").await, Frame::Integer(2));
    assert_eq!(
        query(&mut client, "ZCOUNT zset (0.5 +inf").await,
        Frame::Integer(2)
    );
    assert_eq!(
        query(&mut client, "ZSCORE zset a").await,
        Frame::Bulk(Bytes::from("1.5"))
    );

    assert_eq!(query(&mut client, "ZREM zset a b c").await, Frame::Integer(3));
    assert_eq!(query(&mut client, "TYPE zset").await, Frame::Simple("none".into()));
}

#[tokio::test]
async fn test_sorted_set_against_model() {
    let mut client = connect().await;
    let mut rng = rand::thread_rng();
    let mut model: Vec<(i64, String)> = vec![];

    for i in 0..200 {
        let score = rng.gen_range(-20..20);
        let member = format!("m{}", rng.gen_range(0..100));

        let added = query(&mut client, &format!("ZADD zset {score} {member}")).await;
        let existing = model.iter().position(|(_, m)| *m == member);
        assert_eq!(added, Frame::Integer(existing.is_none() as i64), "step {i}");

        if let Some(index) = existing {
            model.remove(index);
        }
        model.push((score, member));
    }

    model.sort();
    let expected: Vec<&str> = model.iter().map(|(_, member)| member.as_str()).collect();

    assert_eq!(
        query(&mut client, "ZCARD zset").await,
        Frame::Integer(model.len() as i64)
    );
    assert_eq!(query(&mut client, "ZRANGE zset 0 -1").await, bulks(&expected));
    assert_eq!(
        query(&mut client, "ZRANGE zset 5 9").await,
        bulks(&expected[5..10])
    );
    assert_eq!(
        query(&mut client, "ZCOUNT zset -5 5").await,
        Frame::Integer(model.iter().filter(|(s, _)| (-5..=5).contains(s)).count() as i64)
    );
}

#[tokio::test]
async fn test_binary_keys_and_values() {
    let mut client = connect().await;
    let mut rng = rand::thread_rng();

    for _ in 0..50 {
        let (key_len, value_len) = (rng.gen_range(1..32), rng.gen_range(0..256));
        let key = random_token(&mut rng, key_len);
        let value = random_token(&mut rng, value_len);

        let reply = query_request(
            &mut client,
            Request::new("SET", vec![key.clone(), value.clone()]),
        )
        .await;
        assert_eq!(reply, ok());

        let reply = query_request(&mut client, Request::new("GET", vec![key])).await;
        assert_eq!(reply, Frame::Bulk(value));
    }
}

#[tokio::test]
async fn test_wrong_type() {
    let mut client = connect().await;
    let wrong_type = error("WRONGTYPE Operation against a key holding the wrong kind of value");

    assert_eq!(query(&mut client, "SET s v").await, ok());
    assert_eq!(query(&mut client, "ZADD z 1 a").await, Frame::Integer(1));

    assert_eq!(query(&mut client, "ZADD s 1 a").await, wrong_type);
    assert_eq!(query(&mut client, "ZRANGE s 0 -1").await, wrong_type);
    assert_eq!(query(&mut client, "SETBIT z 0 1").await, wrong_type);
    assert_eq!(query(&mut client, "GETBIT z 0").await, wrong_type);
    assert_eq!(query(&mut client, "GET z").await, Frame::Null);

    assert_eq!(query(&mut client, "SET z v").await, ok());
    assert_eq!(query(&mut client, "TYPE z").await, Frame::Simple("string".into()));
}

#[tokio::test]
async fn test_errors_keep_the_connection_open() {
    let mut client = connect().await;

    assert_eq!(
        query(&mut client, "GET").await,
        error("ERR wrong number of arguments for 'get' command")
    );
    assert_eq!(
        query(&mut client, "FOO bar").await,
        error("ERR unknown command 'FOO'")
    );
    assert_eq!(
        query(&mut client, "ZADD z x a").await,
        error("ERR value is not a valid float")
    );
    assert_eq!(
        query(&mut client, "ZRANGE z a 1").await,
        error("ERR value is not an integer or out of range")
    );
    assert_eq!(
        send_raw(&mut client, b"\r\n").await,
        error("ERR Protocol error: empty request line")
    );

    assert_eq!(query(&mut client, "PING").await, Frame::Simple("PONG".into()));
}

#[tokio::test]
async fn test_line_too_long_closes_the_connection() {
    let mut client = connect_with(Config {
        max_line_length: 16,
        ..Config::default()
    })
    .await;

    let reply = query(&mut client, "SET key a-value-much-longer-than-the-limit").await;

    assert_eq!(reply, error("ERR Protocol error: request line exceeds 16 bytes"));
    assert!(client.next().await.is_none());
}

#[tokio::test]
async fn test_clients_share_the_keyspace() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, Config::default()));

    let mut first = Framed::new(
        TcpStream::connect(address).await.unwrap(),
        FrameCodec::default(),
    );
    let mut second = Framed::new(
        TcpStream::connect(address).await.unwrap(),
        FrameCodec::default(),
    );

    assert_eq!(query(&mut first, "SET shared 1").await, ok());
    assert_eq!(
        query(&mut second, "GET shared").await,
        Frame::Bulk(Bytes::from("1"))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_zadd() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, Config::default()));

    let tasks: Vec<_> = (0..8)
        .map(|client_id| {
            tokio::spawn(async move {
                let mut client = Framed::new(
                    TcpStream::connect(address).await.unwrap(),
                    FrameCodec::default(),
                );
                for i in 0..50 {
                    let line = format!("ZADD zset {i} c{client_id}-{i}");
                    assert_eq!(query(&mut client, &line).await, Frame::Integer(1));
                }
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    let mut client = Framed::new(
        TcpStream::connect(address).await.unwrap(),
        FrameCodec::default(),
    );
    assert_eq!(query(&mut client, "ZCARD zset").await, Frame::Integer(400));
}
