use parking_lot::RwLock;
use sonar_ranging::Distance;
use std::{fmt, sync::Arc, time::Instant};

/// Running totals of the sampling loop, shared with the main task.
#[derive(Clone)]
pub struct State {
    pub samples: u64,
    pub failed_readings: u64,
    pub out_of_range: u64,
    pub events_sent: u64,
    pub send_failures: u64,
    pub last_distance: Option<Distance>,
    pub last_value: Option<u8>,
    pub last_sample_ts: Instant,
    pub faults: Vec<String>,
}

impl Default for State {
    fn default() -> Self {
        State {
            samples: 0,
            failed_readings: 0,
            out_of_range: 0,
            events_sent: 0,
            send_failures: 0,
            last_distance: None,
            last_value: None,
            last_sample_ts: Instant::now(),
            faults: Vec::new(),
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} samples, {} failed, {} out of range, {} sent, {} send failures",
            self.samples, self.failed_readings, self.out_of_range, self.events_sent, self.send_failures
        )?;
        if !self.faults.is_empty() {
            write!(f, "; faults: {}", self.faults.join(", "))?;
        }
        Ok(())
    }
}

pub type Blackboard = Arc<RwLock<State>>;

pub fn snapshot(bb: &Blackboard) -> State {
    (*bb.read()).clone()
}

pub fn record_reading(bb: &Blackboard, distance: Option<Distance>) {
    let mut g = bb.write();
    g.samples += 1;
    g.last_sample_ts = Instant::now();
    match distance {
        Some(d) => g.last_distance = Some(d),
        None => g.failed_readings += 1,
    }
}

pub fn record_value(bb: &Blackboard, value: Option<u8>) {
    let mut g = bb.write();
    g.last_value = value;
    if value.is_none() {
        g.out_of_range += 1;
    }
}

pub fn record_send(bb: &Blackboard, ok: bool) {
    let mut g = bb.write();
    if ok {
        g.events_sent += 1;
    } else {
        g.send_failures += 1;
    }
}

pub fn raise_fault(bb: &Blackboard, msg: &str) {
    let mut g = bb.write();
    if !g.faults.iter().any(|s| s == msg) {
        g.faults.push(msg.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonar_ranging::DistanceUnit;

    #[test]
    fn test_counters() {
        let bb: Blackboard = Arc::default();
        record_reading(&bb, None);
        record_reading(&bb, Some(Distance::from_centimeters(50.0, DistanceUnit::Centimeters)));
        record_value(&bb, Some(74));
        record_send(&bb, true);
        record_send(&bb, false);

        let state = snapshot(&bb);
        assert_eq!(state.samples, 2);
        assert_eq!(state.failed_readings, 1);
        assert_eq!(state.out_of_range, 0);
        assert_eq!(state.events_sent, 1);
        assert_eq!(state.send_failures, 1);
        assert_eq!(state.last_value, Some(74));
    }

    #[test]
    fn test_faults_are_deduplicated() {
        let bb: Blackboard = Arc::default();
        raise_fault(&bb, "MIDI port unavailable");
        raise_fault(&bb, "MIDI port unavailable");
        assert_eq!(snapshot(&bb).faults.len(), 1);
        assert!(snapshot(&bb).to_string().contains("faults: MIDI port unavailable"));
    }
}
