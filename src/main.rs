#![cfg_attr(not(feature = "hardware"), allow(dead_code))]

mod blackboard;
mod mapping;
mod sampler;
mod settings;

use blackboard::{Blackboard, snapshot};
use settings::Settings;

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tracing::{error, info, warn};
use tracing_subscriber::{self, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    info!("sonar-midi starting");
    let settings = settings::load_settings()?;
    settings.validate()?;

    let bb: Blackboard = Arc::default();
    let stop = Arc::new(AtomicBool::new(false));

    let mut sampling = tokio::task::spawn_blocking({
        let stop = Arc::clone(&stop);
        let bb = Arc::clone(&bb);
        move || run_hardware(&settings, &stop, &bb)
    });

    let outcome = tokio::select! {
        joined = &mut sampling => joined,
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => info!("Interrupted, stopping sampler"),
                Err(e) => warn!("Could not listen for Ctrl-C ({}), stopping sampler", e),
            }
            stop.store(true, Ordering::Relaxed);
            sampling.await
        }
    };

    let summary = snapshot(&bb);
    match outcome {
        Ok(Ok(cycles)) => {
            info!(cycles, "Exiting: {}", summary);
            Ok(())
        }
        Ok(Err(e)) => {
            error!("Sampler failed: {:#}. {}", e, summary);
            Err(e)
        }
        Err(e) => {
            error!("Sampler thread panicked: {}", e);
            Err(e.into())
        }
    }
}

/// Open the MIDI port and the sensor, then sample until `stop` is set.
///
/// Both handles are closed explicitly on the way out; their `Drop` impls cover
/// the early-return paths.
#[cfg(feature = "hardware")]
fn run_hardware(settings: &Settings, stop: &AtomicBool, bb: &Blackboard) -> anyhow::Result<u64> {
    use anyhow::Context;
    use sonar_midi_out::{MidiSender, MidirTransport};
    use sonar_ranging::{SystemClock, UltrasonicSensor, rpi::RppalGpio};

    let transport = MidirTransport::new(settings.midi.client_name.as_str())
        .context("creating MIDI client")?;
    let mut prompt = ask_for_port;
    let mut sender = MidiSender::open(transport, settings.midi.selection(&mut prompt));

    let gpio = RppalGpio::new().context("opening GPIO")?;
    let mut sensor = UltrasonicSensor::new(gpio, SystemClock::new(), settings.sensor.sensor_config())
        .context("setting up ultrasonic sensor")?;

    let cycles = sampler::run(&mut sensor, &mut sender, settings, stop, bb);

    sender.close();
    sensor.release();
    Ok(cycles)
}

#[cfg(not(feature = "hardware"))]
fn run_hardware(_settings: &Settings, _stop: &AtomicBool, _bb: &Blackboard) -> anyhow::Result<u64> {
    anyhow::bail!("built without the `hardware` feature; rebuild with `--features hardware`")
}

/// Interactive port choice used when neither an index nor a name is configured.
#[cfg(feature = "hardware")]
fn ask_for_port(names: &[String]) -> Option<usize> {
    use std::io::{self, Write};

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
