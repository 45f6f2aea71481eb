//! Simple network client test

use comms_if::net::{NetParams, NetSock, PacketRegistry};
use comms_if::packet::{Packet, PacketType};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Print any MSG packets the server sends us
    let mut registry = PacketRegistry::new();
    registry.add_handler(PacketType::Msg, |packet| {
        if let Packet::Msg(s) = packet {
            println!("Recieved \"{}\"", s);
        }
        Ok(())
    });

    // Create the socket
    let socket = match NetSock::connect("localhost:5000", NetParams::default(), registry) {
        Ok(s) => s,
        Err(e) => {
            println!("Could not connect to the server");
            return Err(e.into());
        }
    };

    // Send a few messages to the server
    for i in 0..5 {
        print!("Sending data... ");
        match socket.send(&Packet::Msg(format!("HELLO {}", i))) {
            Ok(_) => println!("ok"),
            Err(e) => println!("could not send: {}", e),
        }

        // Wait a bit
        std::thread::sleep(std::time::Duration::from_millis(1000));
    }

    // Perform the shutdown handshake
    println!("Disconnecting");
    socket.disconnect()?;

    Ok(())
}
