use sonar_ranging::rpi::RppalGpio;
use sonar_ranging::*;
use std::time::Duration;

fn main() {
    tracing_subscriber::fmt::init();

    let trigger_pin = 23;
    let echo_pin = 24;
    let config = SensorConfig::new(trigger_pin, echo_pin).with_timeout(Duration::from_millis(100));

    let bus = match RppalGpio::new() {
        Ok(bus) => bus,
        Err(e) => {
            eprintln!("Failed to open GPIO: {}", e);
            return;
        }
    };

    match UltrasonicSensor::new(bus, SystemClock::new(), config) {
        Ok(mut sensor) => {
            println!("Measuring on TRIG={} ECHO={} ...", trigger_pin, echo_pin);
            for i in 0..20 {
                match sensor.measure() {
                    Ok(distance) => println!("Reading {:>2}: {}", i + 1, distance),
                    Err(e) => println!("Reading {:>2}: failed ({})", i + 1, e),
                }
                // HC-SR04 wants at least 60 ms between pings
                std::thread::sleep(Duration::from_millis(100));
            }
            sensor.release();
        }
        Err(e) => {
            eprintln!("Failed to initialize sensor: {:?}", e);
        }
    }
}
