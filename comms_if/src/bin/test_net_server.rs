//! Simple network server test

use comms_if::net::{NetParams, NetSock, PacketRegistry};
use comms_if::packet::{Packet, PacketType};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Print any MSG packets the client sends us
    let mut registry = PacketRegistry::new();
    registry.add_handler(PacketType::Msg, |packet| {
        if let Packet::Msg(s) = packet {
            println!("Recieved \"{}\"", s);
        }
        Ok(())
    });

    println!("Serving on port 5000, waiting for a client");

    // Create the socket, accepting a single client
    let socket = NetSock::serve("0.0.0.0:5000", NetParams::default(), registry)?;

    println!("Client connected");

    // Echo a message back once a second until the client disconnects
    let mut count = 0u32;
    while socket.is_open() {
        count += 1;
        match socket.send(&Packet::Msg(format!("server tick {}", count))) {
            Ok(_) => (),
            Err(e) => println!("Could not send: {}", e),
        }

        std::thread::sleep(std::time::Duration::from_millis(1000));
    }

    println!("Client disconnected, exiting");

    Ok(())
}
