//! Race start/end transition detection.
//!
//! The monitor holds a single scalar, the previous packet's `is_race_on`
//! flag, and compares it against each incoming packet. It is
//! thread-confined: callers are expected to own one monitor per consumer
//! loop and never share it across tasks.

#![warn(missing_docs, rust_2018_idioms)]

use forza_telemetry_wire::TelemetryPacket;

/// A race start or end transition detected between two consecutive packets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RaceEvent {
    /// `is_race_on` transitioned from 0 to 1.
    Started {
        /// The car model ordinal from the triggering packet.
        car_ordinal: i32,
        /// The car class from the triggering packet.
        car_class: i32,
        /// The car performance index from the triggering packet.
        car_performance_index: i32,
        /// The race clock at the moment of transition.
        current_race_time: f32,
    },
    /// `is_race_on` transitioned from 1 to 0.
    Ended {
        /// The race clock at the moment of transition.
        current_race_time: f32,
    },
}

/// Tracks `is_race_on` across consecutive packets and emits transition
/// events.
///
/// Starts in the "race off" state, matching the spec's initial
/// `last_is_race_on = 0`: a first packet that already has racing on does
/// produce a `Started` event, since the transition is from the monitor's
/// initial state rather than from a previously observed packet.
#[derive(Debug)]
pub struct RaceStateMonitor {
    last_is_race_on: i32,
}

impl Default for RaceStateMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl RaceStateMonitor {
    /// Creates a monitor in the initial "race off" state.
    pub fn new() -> Self {
        Self { last_is_race_on: 0 }
    }

    /// Observes one packet, updating internal state and returning a
    /// transition event if the race state changed.
    pub fn observe(&mut self, packet: &TelemetryPacket) -> Option<RaceEvent> {
        let cur = packet.is_race_on;
        let event = match (self.last_is_race_on, cur) {
            (0, 1) => Some(RaceEvent::Started {
                car_ordinal: packet.car_ordinal,
                car_class: packet.car_class,
                car_performance_index: packet.car_performance_index,
                current_race_time: packet.current_race_time,
            }),
            (1, 0) => Some(RaceEvent::Ended {
                current_race_time: packet.current_race_time,
            }),
            _ => None,
        };
        self.last_is_race_on = cur;
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet_with_race_on(is_race_on: i32) -> TelemetryPacket {
        let mut data = vec![0u8; forza_telemetry_wire::CAR_DASH_LEN];
        data[0..4].copy_from_slice(&is_race_on.to_le_bytes());
        forza_telemetry_wire::decode(&data).expect("zeroed packet decodes")
    }

    #[test]
    fn emits_started_on_rising_edge() {
        let mut mon = RaceStateMonitor::new();
        assert_eq!(mon.observe(&packet_with_race_on(0)), None);
        assert!(matches!(
            mon.observe(&packet_with_race_on(1)),
            Some(RaceEvent::Started { .. })
        ));
    }

    #[test]
    fn emits_ended_on_falling_edge() {
        let mut mon = RaceStateMonitor::new();
        mon.observe(&packet_with_race_on(1));
        assert!(matches!(
            mon.observe(&packet_with_race_on(0)),
            Some(RaceEvent::Ended { .. })
        ));
    }

    #[test]
    fn first_packet_already_racing_emits_started() {
        let mut mon = RaceStateMonitor::new();
        assert!(matches!(
            mon.observe(&packet_with_race_on(1)),
            Some(RaceEvent::Started { .. })
        ));
    }

    #[test]
    fn repeated_same_state_emits_nothing() {
        let mut mon = RaceStateMonitor::new();
        mon.observe(&packet_with_race_on(1));
        assert_eq!(mon.observe(&packet_with_race_on(1)), None);
        assert_eq!(mon.observe(&packet_with_race_on(1)), None);
    }
}
