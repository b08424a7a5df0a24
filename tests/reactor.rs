//! End-to-end scenarios over real sockets: a reactor runs on its own
//! thread, plain blocking `std::net` clients talk to it.

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use spindle_io::prelude::*;

const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

fn spawn_reactor<H>(handler: H) -> (SocketAddr, ShutdownHandle, JoinHandle<spindle_io::Result<()>>)
where
    H: ServiceHandler + Send + 'static,
{
    let config = ReactorConfig::builder()
        .address("127.0.0.1:0".parse().unwrap())
        .poll_timeout_ms(50)
        .build();
    let mut reactor = Reactor::new(config, handler).expect("reactor construction failed");
    let addr = reactor.local_addr();
    let stop = reactor.shutdown_handle();
    let join = thread::spawn(move || reactor.run());
    (addr, stop, join)
}

fn connect(addr: SocketAddr) -> TcpStream {
    let client = TcpStream::connect(addr).expect("connect failed");
    client.set_read_timeout(Some(CLIENT_TIMEOUT)).unwrap();
    client
}

fn wait_for(cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + CLIENT_TIMEOUT;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

struct Echo;

impl ServiceHandler for Echo {
    fn on_data_readable(&mut self, conn: &mut Connection, data: &[u8]) -> spindle_io::Result<()> {
        conn.send(data);
        Ok(())
    }
}

#[test]
fn ping_gets_pong_and_connection_stays_open() {
    struct PingPong;
    impl ServiceHandler for PingPong {
        fn on_data_readable(
            &mut self,
            conn: &mut Connection,
            data: &[u8],
        ) -> spindle_io::Result<()> {
            if data == b"ping" {
                conn.send(b"pong");
            }
            Ok(())
        }
    }

    let (addr, stop, join) = spawn_reactor(PingPong);
    let mut client = connect(addr);

    for _ in 0..2 {
        client.write_all(b"ping").unwrap();
        let mut reply = [0u8; 4];
        client.read_exact(&mut reply).unwrap();
        assert_eq!(&reply, b"pong");
    }

    stop.shutdown();
    join.join().unwrap().unwrap();
}

#[test]
fn one_mib_is_fully_read_before_eof_close() {
    struct Counter {
        bytes: Arc<AtomicUsize>,
        disconnected: Arc<AtomicBool>,
    }
    impl ServiceHandler for Counter {
        fn on_data_readable(
            &mut self,
            _conn: &mut Connection,
            data: &[u8],
        ) -> spindle_io::Result<()> {
            self.bytes.fetch_add(data.len(), Ordering::SeqCst);
            Ok(())
        }
        fn on_disconnect(&mut self, _token: Token) {
            self.disconnected.store(true, Ordering::SeqCst);
        }
    }

    let bytes = Arc::new(AtomicUsize::new(0));
    let disconnected = Arc::new(AtomicBool::new(false));
    let (addr, stop, join) = spawn_reactor(Counter {
        bytes: bytes.clone(),
        disconnected: disconnected.clone(),
    });

    const TOTAL: usize = 1024 * 1024;
    let mut client = connect(addr);
    client.write_all(&pattern(TOTAL)).unwrap();
    client.shutdown(Shutdown::Write).unwrap();

    // The reactor must observe every byte (across many READABLE cycles)
    // before acting on the EOF.
    assert!(wait_for(|| disconnected.load(Ordering::SeqCst)));
    assert_eq!(bytes.load(Ordering::SeqCst), TOTAL);

    // With nothing buffered for us, the server closes its side too.
    let mut sink = [0u8; 64];
    assert_eq!(client.read(&mut sink).unwrap(), 0);

    stop.shutdown();
    join.join().unwrap().unwrap();
}

#[test]
fn oversized_response_arrives_in_order_across_partial_writes() {
    const TOTAL: usize = 2 * 1024 * 1024;

    struct Firehose;
    impl ServiceHandler for Firehose {
        fn on_connection_accepted(&mut self, conn: &mut Connection) -> spindle_io::Result<()> {
            // Far larger than any socket buffer; the reactor must drain it
            // through WRITABLE cycles, then honor the deferred close.
            conn.send(&pattern(TOTAL));
            conn.close_after_flush();
            Ok(())
        }
        fn on_data_readable(
            &mut self,
            _conn: &mut Connection,
            _data: &[u8],
        ) -> spindle_io::Result<()> {
            Ok(())
        }
    }

    let (addr, stop, join) = spawn_reactor(Firehose);
    let mut client = connect(addr);

    let mut received = Vec::with_capacity(TOTAL);
    client.read_to_end(&mut received).unwrap();
    assert_eq!(received.len(), TOTAL);
    assert_eq!(received, pattern(TOTAL));

    stop.shutdown();
    join.join().unwrap().unwrap();
}

#[test]
fn shutdown_closes_every_open_connection() {
    struct AcceptCounter {
        accepted: Arc<AtomicUsize>,
    }
    impl ServiceHandler for AcceptCounter {
        fn on_connection_accepted(&mut self, _conn: &mut Connection) -> spindle_io::Result<()> {
            self.accepted.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn on_data_readable(
            &mut self,
            _conn: &mut Connection,
            _data: &[u8],
        ) -> spindle_io::Result<()> {
            Ok(())
        }
    }

    let accepted = Arc::new(AtomicUsize::new(0));
    let (addr, stop, join) = spawn_reactor(AcceptCounter {
        accepted: accepted.clone(),
    });

    let clients: Vec<TcpStream> = (0..5).map(|_| connect(addr)).collect();
    assert!(wait_for(|| accepted.load(Ordering::SeqCst) == 5));

    stop.shutdown();
    join.join().unwrap().unwrap();

    // Every client observes the orderly close.
    for mut client in clients {
        let mut sink = [0u8; 16];
        assert_eq!(client.read(&mut sink).unwrap(), 0);
    }
}

#[test]
fn concurrent_connections_are_each_served() {
    let (addr, stop, join) = spawn_reactor(Echo);

    let workers: Vec<JoinHandle<()>> = (0..8)
        .map(|i| {
            thread::spawn(move || {
                let mut client = connect(addr);
                let payload = format!("client-{i}-payload");
                client.write_all(payload.as_bytes()).unwrap();

                let mut echoed = vec![0u8; payload.len()];
                client.read_exact(&mut echoed).unwrap();
                assert_eq!(echoed, payload.as_bytes());
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    stop.shutdown();
    join.join().unwrap().unwrap();
}

#[test]
fn second_reactor_on_same_port_fails_to_start() {
    let (addr, stop, join) = spawn_reactor(Echo);

    let config = ReactorConfig::builder().address(addr).build();
    let err = Reactor::new(config, Echo).unwrap_err();
    assert!(matches!(err, ReactorError::Bind { .. }));

    stop.shutdown();
    join.join().unwrap().unwrap();
}
