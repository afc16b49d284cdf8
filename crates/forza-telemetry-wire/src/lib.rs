//! Decoder for the Forza Motorsport/Horizon UDP "Data Out" telemetry format.
//!
//! The wire format is a tightly packed, little-endian struct with no framing
//! or length prefix: one UDP datagram is one packet. Two datagrams lengths
//! are recognized: the 311-byte "CarDash" packet, and a 324-byte variant
//! that carries 13 extra trailing bytes we never look at. Everything is
//! decoded with a small sequential cursor rather than a table of named
//! offset constants, since the two layouts share every field up to byte 311
//! and only differ in what follows.

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs, rust_2018_idioms)]

use thiserror::Error;

/// Length in bytes of the "CarDash" packet.
pub const CAR_DASH_LEN: usize = 311;

/// Length in bytes of the data-out packet with trailing padding.
pub const DATA_OUT_PADDED_LEN: usize = 324;

/// Errors that can occur while decoding a telemetry datagram.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The datagram length did not match any known packet layout.
    #[error("unsupported packet length: {0}")]
    UnsupportedLength(usize),

    /// The datagram had a recognized length but a field could not be read.
    #[error("malformed packet: {0}")]
    Malformed(String),
}

/// A single decoded telemetry sample.
///
/// Field order mirrors the wire layout exactly; nothing is reordered or
/// renamed from how it appears in the datagram. `session_id` is not part of
/// the wire format: it is filled in downstream once the packet has been
/// attributed to a session.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TelemetryPacket {
    /// Whether a race is currently in progress.
    pub is_race_on: i32,
    /// Milliseconds since the game was started.
    pub timestamp_ms: u32,

    /// Engine maximum RPM.
    pub engine_max_rpm: f32,
    /// Engine idle RPM.
    pub engine_idle_rpm: f32,
    /// Current engine RPM.
    pub current_engine_rpm: f32,

    /// Acceleration, X axis, m/s^2.
    pub accel_x: f32,
    /// Acceleration, Y axis, m/s^2.
    pub accel_y: f32,
    /// Acceleration, Z axis, m/s^2.
    pub accel_z: f32,

    /// Velocity, X axis, m/s.
    pub vel_x: f32,
    /// Velocity, Y axis, m/s.
    pub vel_y: f32,
    /// Velocity, Z axis, m/s.
    pub vel_z: f32,

    /// Angular velocity, X axis, rad/s.
    pub angvel_x: f32,
    /// Angular velocity, Y axis, rad/s.
    pub angvel_y: f32,
    /// Angular velocity, Z axis, rad/s.
    pub angvel_z: f32,

    /// Yaw, radians.
    pub yaw: f32,
    /// Pitch, radians.
    pub pitch: f32,
    /// Roll, radians.
    pub roll: f32,

    /// Normalized suspension travel, front left.
    pub norm_suspension_travel_fl: f32,
    /// Normalized suspension travel, front right.
    pub norm_suspension_travel_fr: f32,
    /// Normalized suspension travel, rear left.
    pub norm_suspension_travel_rl: f32,
    /// Normalized suspension travel, rear right.
    pub norm_suspension_travel_rr: f32,

    /// Tire slip ratio, front left.
    pub tire_slip_ratio_fl: f32,
    /// Tire slip ratio, front right.
    pub tire_slip_ratio_fr: f32,
    /// Tire slip ratio, rear left.
    pub tire_slip_ratio_rl: f32,
    /// Tire slip ratio, rear right.
    pub tire_slip_ratio_rr: f32,

    /// Wheel rotation speed, front left.
    pub wheel_rotation_speed_fl: f32,
    /// Wheel rotation speed, front right.
    pub wheel_rotation_speed_fr: f32,
    /// Wheel rotation speed, rear left.
    pub wheel_rotation_speed_rl: f32,
    /// Wheel rotation speed, rear right.
    pub wheel_rotation_speed_rr: f32,

    /// Whether the front left wheel is on a rumble strip.
    pub wheel_on_rumble_strip_fl: i32,
    /// Whether the front right wheel is on a rumble strip.
    pub wheel_on_rumble_strip_fr: i32,
    /// Whether the rear left wheel is on a rumble strip.
    pub wheel_on_rumble_strip_rl: i32,
    /// Whether the rear right wheel is on a rumble strip.
    pub wheel_on_rumble_strip_rr: i32,

    /// Front left wheel puddle depth.
    pub wheel_in_puddle_fl: f32,
    /// Front right wheel puddle depth.
    pub wheel_in_puddle_fr: f32,
    /// Rear left wheel puddle depth.
    pub wheel_in_puddle_rl: f32,
    /// Rear right wheel puddle depth.
    pub wheel_in_puddle_rr: f32,

    /// Front left surface rumble.
    pub surface_rumble_fl: f32,
    /// Front right surface rumble.
    pub surface_rumble_fr: f32,
    /// Rear left surface rumble.
    pub surface_rumble_rl: f32,
    /// Rear right surface rumble.
    pub surface_rumble_rr: f32,

    /// Front left tire slip angle.
    pub tire_slip_angle_fl: f32,
    /// Front right tire slip angle.
    pub tire_slip_angle_fr: f32,
    /// Rear left tire slip angle.
    pub tire_slip_angle_rl: f32,
    /// Rear right tire slip angle.
    pub tire_slip_angle_rr: f32,

    /// Front left tire combined slip.
    pub tire_combined_slip_fl: f32,
    /// Front right tire combined slip.
    pub tire_combined_slip_fr: f32,
    /// Rear left tire combined slip.
    pub tire_combined_slip_rl: f32,
    /// Rear right tire combined slip.
    pub tire_combined_slip_rr: f32,

    /// Front left suspension travel, meters.
    pub suspension_travel_meters_fl: f32,
    /// Front right suspension travel, meters.
    pub suspension_travel_meters_fr: f32,
    /// Rear left suspension travel, meters.
    pub suspension_travel_meters_rl: f32,
    /// Rear right suspension travel, meters.
    pub suspension_travel_meters_rr: f32,

    /// Ordinal identifying the player's car model.
    pub car_ordinal: i32,
    /// Car class.
    pub car_class: i32,
    /// Car performance index.
    pub car_performance_index: i32,
    /// Drivetrain type (FWD/RWD/AWD).
    pub drivetrain_type: i32,
    /// Number of cylinders in the car's engine.
    pub num_cylinders: i32,

    /// World position, X.
    pub position_x: f32,
    /// World position, Y.
    pub position_y: f32,
    /// World position, Z.
    pub position_z: f32,

    /// Speed, m/s.
    pub speed: f32,
    /// Power, watts.
    pub power: f32,
    /// Torque, Nm.
    pub torque: f32,

    /// Front left tire temperature.
    pub tire_temp_fl: f32,
    /// Front right tire temperature.
    pub tire_temp_fr: f32,
    /// Rear left tire temperature.
    pub tire_temp_rl: f32,
    /// Rear right tire temperature.
    pub tire_temp_rr: f32,

    /// Boost pressure.
    pub boost: f32,
    /// Fuel remaining, fraction.
    pub fuel: f32,
    /// Distance traveled this lap, meters.
    pub distance_traveled: f32,
    /// Best lap time, seconds.
    pub best_lap_time: f32,
    /// Last lap time, seconds.
    pub last_lap_time: f32,
    /// Current lap time, seconds.
    pub current_lap_time: f32,
    /// Current race time, seconds.
    pub current_race_time: f32,

    /// Current lap number.
    pub lap_number: u16,
    /// Current race position.
    pub race_position: u8,
    /// Accelerator input, 0-255.
    pub accelerator: u8,
    /// Brake input, 0-255.
    pub brake: u8,
    /// Clutch input, 0-255.
    pub clutch: u8,
    /// Handbrake input, 0-255.
    pub handbrake: u8,
    /// Current gear (0 = reverse, 1 = neutral, 2+ = forward gears).
    pub gear: u8,
    /// Steering input, -127 to 127.
    pub steer: i8,
    /// Normalized driving line, -127 to 127.
    pub normalized_driving_line: i8,
    /// Normalized AI brake difference, -127 to 127.
    pub normalized_ai_brake_difference: i8,

    /// Session this packet has been attributed to, filled in downstream.
    pub session_id: Option<i64>,
}

/// Sequential little-endian reader over a byte slice.
///
/// Each read advances the cursor and fails with [`DecodeError::Malformed`]
/// if fewer bytes remain than the read requires. Numeric values are never
/// range- or sanity-checked: the sim is known to emit NaN/infinite floats on
/// some frames, and every field that is present on the wire is decoded and
/// passed through unchanged.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.pos + n;
        let slice = self
            .data
            .get(self.pos..end)
            .ok_or_else(|| DecodeError::Malformed(format!("expected {n} more bytes at offset {}", self.pos)))?;
        self.pos = end;
        Ok(slice)
    }

    fn f32(&mut self) -> Result<f32, DecodeError> {
        let bytes: [u8; 4] = self.take(4)?.try_into().expect("slice of len 4");
        Ok(f32::from_le_bytes(bytes))
    }

    fn i32(&mut self) -> Result<i32, DecodeError> {
        let bytes: [u8; 4] = self.take(4)?.try_into().expect("slice of len 4");
        Ok(i32::from_le_bytes(bytes))
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        let bytes: [u8; 4] = self.take(4)?.try_into().expect("slice of len 4");
        Ok(u32::from_le_bytes(bytes))
    }

    fn u16(&mut self) -> Result<u16, DecodeError> {
        let bytes: [u8; 2] = self.take(2)?.try_into().expect("slice of len 2");
        Ok(u16::from_le_bytes(bytes))
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn i8(&mut self) -> Result<i8, DecodeError> {
        Ok(self.take(1)?[0] as i8)
    }
}

/// Decode one UDP datagram into a [`TelemetryPacket`].
///
/// Accepts exactly [`CAR_DASH_LEN`] or [`DATA_OUT_PADDED_LEN`] bytes; any
/// other length is rejected before a single field is read. The 13 trailing
/// bytes of the padded variant are never inspected.
pub fn decode(data: &[u8]) -> Result<TelemetryPacket, DecodeError> {
    if data.len() != CAR_DASH_LEN && data.len() != DATA_OUT_PADDED_LEN {
        return Err(DecodeError::UnsupportedLength(data.len()));
    }

    let mut c = Cursor::new(data);

    let is_race_on = c.i32()?;
    let timestamp_ms = c.u32()?;

    let engine_max_rpm = c.f32()?;
    let engine_idle_rpm = c.f32()?;
    let current_engine_rpm = c.f32()?;

    let accel_x = c.f32()?;
    let accel_y = c.f32()?;
    let accel_z = c.f32()?;

    let vel_x = c.f32()?;
    let vel_y = c.f32()?;
    let vel_z = c.f32()?;

    let angvel_x = c.f32()?;
    let angvel_y = c.f32()?;
    let angvel_z = c.f32()?;

    let yaw = c.f32()?;
    let pitch = c.f32()?;
    let roll = c.f32()?;

    let norm_suspension_travel_fl = c.f32()?;
    let norm_suspension_travel_fr = c.f32()?;
    let norm_suspension_travel_rl = c.f32()?;
    let norm_suspension_travel_rr = c.f32()?;

    let tire_slip_ratio_fl = c.f32()?;
    let tire_slip_ratio_fr = c.f32()?;
    let tire_slip_ratio_rl = c.f32()?;
    let tire_slip_ratio_rr = c.f32()?;

    let wheel_rotation_speed_fl = c.f32()?;
    let wheel_rotation_speed_fr = c.f32()?;
    let wheel_rotation_speed_rl = c.f32()?;
    let wheel_rotation_speed_rr = c.f32()?;

    let wheel_on_rumble_strip_fl = c.i32()?;
    let wheel_on_rumble_strip_fr = c.i32()?;
    let wheel_on_rumble_strip_rl = c.i32()?;
    let wheel_on_rumble_strip_rr = c.i32()?;

    let wheel_in_puddle_fl = c.f32()?;
    let wheel_in_puddle_fr = c.f32()?;
    let wheel_in_puddle_rl = c.f32()?;
    let wheel_in_puddle_rr = c.f32()?;

    let surface_rumble_fl = c.f32()?;
    let surface_rumble_fr = c.f32()?;
    let surface_rumble_rl = c.f32()?;
    let surface_rumble_rr = c.f32()?;

    let tire_slip_angle_fl = c.f32()?;
    let tire_slip_angle_fr = c.f32()?;
    let tire_slip_angle_rl = c.f32()?;
    let tire_slip_angle_rr = c.f32()?;

    let tire_combined_slip_fl = c.f32()?;
    let tire_combined_slip_fr = c.f32()?;
    let tire_combined_slip_rl = c.f32()?;
    let tire_combined_slip_rr = c.f32()?;

    let suspension_travel_meters_fl = c.f32()?;
    let suspension_travel_meters_fr = c.f32()?;
    let suspension_travel_meters_rl = c.f32()?;
    let suspension_travel_meters_rr = c.f32()?;

    let car_ordinal = c.i32()?;
    let car_class = c.i32()?;
    let car_performance_index = c.i32()?;
    let drivetrain_type = c.i32()?;
    let num_cylinders = c.i32()?;

    let position_x = c.f32()?;
    let position_y = c.f32()?;
    let position_z = c.f32()?;

    let speed = c.f32()?;
    let power = c.f32()?;
    let torque = c.f32()?;

    let tire_temp_fl = c.f32()?;
    let tire_temp_fr = c.f32()?;
    let tire_temp_rl = c.f32()?;
    let tire_temp_rr = c.f32()?;

    let boost = c.f32()?;
    let fuel = c.f32()?;
    let distance_traveled = c.f32()?;
    let best_lap_time = c.f32()?;
    let last_lap_time = c.f32()?;
    let current_lap_time = c.f32()?;
    let current_race_time = c.f32()?;

    let lap_number = c.u16()?;
    let race_position = c.u8()?;
    let accelerator = c.u8()?;
    let brake = c.u8()?;
    let clutch = c.u8()?;
    let handbrake = c.u8()?;
    let gear = c.u8()?;
    let steer = c.i8()?;
    let normalized_driving_line = c.i8()?;
    let normalized_ai_brake_difference = c.i8()?;

    Ok(TelemetryPacket {
        is_race_on,
        timestamp_ms,
        engine_max_rpm,
        engine_idle_rpm,
        current_engine_rpm,
        accel_x,
        accel_y,
        accel_z,
        vel_x,
        vel_y,
        vel_z,
        angvel_x,
        angvel_y,
        angvel_z,
        yaw,
        pitch,
        roll,
        norm_suspension_travel_fl,
        norm_suspension_travel_fr,
        norm_suspension_travel_rl,
        norm_suspension_travel_rr,
        tire_slip_ratio_fl,
        tire_slip_ratio_fr,
        tire_slip_ratio_rl,
        tire_slip_ratio_rr,
        wheel_rotation_speed_fl,
        wheel_rotation_speed_fr,
        wheel_rotation_speed_rl,
        wheel_rotation_speed_rr,
        wheel_on_rumble_strip_fl,
        wheel_on_rumble_strip_fr,
        wheel_on_rumble_strip_rl,
        wheel_on_rumble_strip_rr,
        wheel_in_puddle_fl,
        wheel_in_puddle_fr,
        wheel_in_puddle_rl,
        wheel_in_puddle_rr,
        surface_rumble_fl,
        surface_rumble_fr,
        surface_rumble_rl,
        surface_rumble_rr,
        tire_slip_angle_fl,
        tire_slip_angle_fr,
        tire_slip_angle_rl,
        tire_slip_angle_rr,
        tire_combined_slip_fl,
        tire_combined_slip_fr,
        tire_combined_slip_rl,
        tire_combined_slip_rr,
        suspension_travel_meters_fl,
        suspension_travel_meters_fr,
        suspension_travel_meters_rl,
        suspension_travel_meters_rr,
        car_ordinal,
        car_class,
        car_performance_index,
        drivetrain_type,
        num_cylinders,
        position_x,
        position_y,
        position_z,
        speed,
        power,
        torque,
        tire_temp_fl,
        tire_temp_fr,
        tire_temp_rl,
        tire_temp_rr,
        boost,
        fuel,
        distance_traveled,
        best_lap_time,
        last_lap_time,
        current_lap_time,
        current_race_time,
        lap_number,
        race_position,
        accelerator,
        brake,
        clutch,
        handbrake,
        gear,
        steer,
        normalized_driving_line,
        normalized_ai_brake_difference,
        session_id: None,
    })
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn rejects_unsupported_length() {
        let err = decode(&[0u8; 10]).unwrap_err();
        assert_eq!(err, DecodeError::UnsupportedLength(10));
    }

    #[test]
    fn decodes_zeroed_car_dash_packet() {
        let data = vec![0u8; CAR_DASH_LEN];
        let p = decode(&data).expect("zeroed packet decodes");
        assert_eq!(p.is_race_on, 0);
        assert_eq!(p.timestamp_ms, 0);
        assert_eq!(p.speed, 0.0);
        assert_eq!(p.session_id, None);
    }

    #[test]
    fn decodes_padded_data_out_packet_ignoring_trailing_bytes() {
        let mut data = vec![0u8; CAR_DASH_LEN];
        data[0..4].copy_from_slice(&1i32.to_le_bytes());
        data.extend_from_slice(&[0xAAu8; DATA_OUT_PADDED_LEN - CAR_DASH_LEN]);
        assert_eq!(data.len(), DATA_OUT_PADDED_LEN);

        let p = decode(&data).expect("padded packet decodes");
        assert_eq!(p.is_race_on, 1);
    }

    #[test]
    fn round_trips_a_populated_packet() {
        let mut p = sample_packet();
        p.is_race_on = 1;
        p.timestamp_ms = 123_456;
        p.speed = 42.5;
        p.gear = 4;
        p.steer = -100;
        p.lap_number = 7;

        let bytes = encode(&p);
        let decoded = decode(&bytes).expect("re-decodes");
        assert_eq!(decoded, p);
    }

    #[test]
    fn passes_non_finite_float_fields_through() {
        let mut data = vec![0u8; CAR_DASH_LEN];
        // engine_max_rpm sits right after is_race_on (4) and timestamp_ms (4).
        data[8..12].copy_from_slice(&f32::NAN.to_le_bytes());
        data[12..16].copy_from_slice(&f32::INFINITY.to_le_bytes());
        let p = decode(&data).expect("non-finite floats are not rejected");
        assert!(p.engine_max_rpm.is_nan());
        assert_eq!(p.engine_idle_rpm, f32::INFINITY);
    }
}

#[cfg(test)]
mod proptest_tests {
    use super::test_support::*;
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn decode_never_panics_on_arbitrary_bytes(data in proptest::collection::vec(any::<u8>(), 0..400)) {
            let _ = decode(&data);
        }

        #[test]
        fn any_length_outside_known_sizes_is_rejected(len in 0usize..400) {
            prop_assume!(len != CAR_DASH_LEN && len != DATA_OUT_PADDED_LEN);
            let data = vec![0u8; len];
            prop_assert_eq!(decode(&data), Err(DecodeError::UnsupportedLength(len)));
        }

        // restricted to normal floats only so `prop_assert_eq!` is meaningful
        // (NaN != NaN); decode() itself places no such restriction on input.
        #[test]
        fn round_trip_holds_for_finite_scalar_fields(
            speed in proptest::num::f32::NORMAL,
            gear in any::<u8>(),
            steer in any::<i8>(),
            lap_number in any::<u16>(),
        ) {
            let mut p = sample_packet();
            p.speed = speed;
            p.gear = gear;
            p.steer = steer;
            p.lap_number = lap_number;
            let bytes = encode(&p);
            let decoded = decode(&bytes).expect("encoded packet always redecodes");
            prop_assert_eq!(decoded, p);
        }
    }
}
