//! Minimal echo server on the spindle-io reactor.
//!
//! Run with `cargo run --example echo_server`, then:
//! `printf 'hello\n' | nc 127.0.0.1 8080`

use std::sync::Arc;

use anyhow::Result;
use spindle_io::prelude::*;

struct EchoHandler;

impl ServiceHandler for EchoHandler {
    fn on_connection_accepted(&mut self, conn: &mut Connection) -> spindle_io::Result<()> {
        println!("connected: {} as {:?}", conn.peer_addr(), conn.token());
        Ok(())
    }

    fn on_data_readable(&mut self, conn: &mut Connection, data: &[u8]) -> spindle_io::Result<()> {
        conn.send(data);
        Ok(())
    }

    fn on_disconnect(&mut self, token: Token) {
        println!("disconnected: {token:?}");
    }
}

fn main() -> Result<()> {
    let config = ReactorConfig::builder()
        .address("127.0.0.1:8080".parse()?)
        .logger(Arc::new(ConsoleLogger))
        .build();

    let mut reactor = Reactor::new(config, EchoHandler)?;
    println!("echo server listening on {}", reactor.local_addr());
    reactor.run()?;
    Ok(())
}
