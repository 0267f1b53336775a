//! List MIDI output ports visible to this machine.
//!
//! ```sh
//! cargo run -p sonar-midi-out --example list_ports --features midir
//! ```

use sonar_midi_out::{MidiTransport, MidirTransport};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut transport = MidirTransport::new("sonar-list-ports")?;
    let names = transport.port_names()?;

    if names.is_empty() {
        println!("No MIDI output ports found.");
        return Ok(());
    }

    println!("Available MIDI output ports:");
    for (i, name) in names.iter().enumerate() {
        println!("  [{}]: {}", i, name);
    }
    Ok(())
}
