//! Demo sequence - exercises every message type against a real port
//!
//! # How to run
//!
//! ```sh
//! cargo run -p sonar-midi-out --example demo_sequence --features midir -- 3
//! ```
//!
//! The optional argument is a port index or part of a port name
//! ("UM-ONE", "Midi Gadget"). Without it the port list is printed and you
//! are asked to choose.

use sonar_midi_out::{MidiSender, MidirTransport, PortSelection};
use std::io::{self, Write};
use std::{env, thread, time::Duration};

const CHANNEL: u8 = 0;
const ARPEGGIO: [u8; 4] = [60, 64, 67, 72]; // C4 E4 G4 C5

fn ask_for_port(names: &[String]) -> Option<usize> {
    println!("Available MIDI output ports:");
    for (i, name) in names.iter().enumerate() {
        println!("  [{}]: {}", i, name);
    }
    print!("Index of the output port to use: ");
    io::stdout().flush().ok()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line).ok()?;
    line.trim().parse().ok()
}

fn play_arpeggio(sender: &mut MidiSender<MidirTransport>, velocity: u8) {
    for note in ARPEGGIO {
        sender.note_on(CHANNEL, note, velocity);
        thread::sleep(Duration::from_millis(300));
        sender.release_note(CHANNEL, note);
        thread::sleep(Duration::from_millis(100));
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let transport = MidirTransport::new("sonar-demo")?;
    let mut prompt = ask_for_port;
    let selection = match env::args().nth(1) {
        Some(arg) => match arg.parse::<usize>() {
            Ok(index) => PortSelection::Index(index),
            Err(_) => PortSelection::Name(arg),
        },
        None => PortSelection::Prompt(&mut prompt),
    };

    let mut sender = MidiSender::open(transport, selection);
    if !sender.is_ready() {
        eprintln!("Could not open a MIDI port, exiting.");
        return Ok(());
    }

    println!("C major arpeggio...");
    play_arpeggio(&mut sender, 100);
    thread::sleep(Duration::from_secs(1));

    println!("Program change to 25 (Acoustic Guitar, steel), arpeggio again...");
    sender.program_change(CHANNEL, 25);
    thread::sleep(Duration::from_millis(500));
    play_arpeggio(&mut sender, 90);
    thread::sleep(Duration::from_secs(1));

    println!("Modulation wheel (CC 1) sweep...");
    for value in (0..=127u8).step_by(10) {
        sender.control_change(CHANNEL, 1, value);
        thread::sleep(Duration::from_millis(100));
    }
    for value in (0..=127u8).rev().step_by(10) {
        sender.control_change(CHANNEL, 1, value);
        thread::sleep(Duration::from_millis(100));
    }
    thread::sleep(Duration::from_secs(1));

    println!("Pitch bend sweep over D4...");
    sender.note_on(CHANNEL, 62, 100);
    thread::sleep(Duration::from_millis(500));
    for bend in (-8192..=8191i16).step_by(500) {
        sender.pitch_bend(CHANNEL, bend);
        thread::sleep(Duration::from_millis(50));
    }
    for bend in (-8192..=8191i16).rev().step_by(500) {
        sender.pitch_bend(CHANNEL, bend);
        thread::sleep(Duration::from_millis(50));
    }
    sender.pitch_bend(CHANNEL, 0);
    sender.release_note(CHANNEL, 62);

    sender.close();
    println!("Done.");
    Ok(())
}
