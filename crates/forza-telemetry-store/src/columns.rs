//! Column order and row formatting for the `telemetry_packets` bulk-copy
//! path.
//!
//! The column list is the packet's wire-field declaration order, so the
//! `COPY` statement, the row writer, and `TelemetryPacket`'s own field order
//! all stay in lockstep: adding a field to the decoder and forgetting it
//! here shows up immediately as a "wrong number of columns" error from
//! Postgres rather than silently shifting every later column.

use forza_telemetry_wire::TelemetryPacket;

/// Comma-separated column list for the `COPY telemetry_packets (...)`
/// statement, matching [`write_row`]'s field order exactly.
pub const COLUMN_LIST: &str = "is_race_on,timestamp_ms,engine_max_rpm,engine_idle_rpm,current_engine_rpm,\
accel_x,accel_y,accel_z,vel_x,vel_y,vel_z,angvel_x,angvel_y,angvel_z,yaw,pitch,roll,\
norm_suspension_travel_fl,norm_suspension_travel_fr,norm_suspension_travel_rl,norm_suspension_travel_rr,\
tire_slip_ratio_fl,tire_slip_ratio_fr,tire_slip_ratio_rl,tire_slip_ratio_rr,\
wheel_rotation_speed_fl,wheel_rotation_speed_fr,wheel_rotation_speed_rl,wheel_rotation_speed_rr,\
wheel_on_rumble_strip_fl,wheel_on_rumble_strip_fr,wheel_on_rumble_strip_rl,wheel_on_rumble_strip_rr,\
wheel_in_puddle_fl,wheel_in_puddle_fr,wheel_in_puddle_rl,wheel_in_puddle_rr,\
surface_rumble_fl,surface_rumble_fr,surface_rumble_rl,surface_rumble_rr,\
tire_slip_angle_fl,tire_slip_angle_fr,tire_slip_angle_rl,tire_slip_angle_rr,\
tire_combined_slip_fl,tire_combined_slip_fr,tire_combined_slip_rl,tire_combined_slip_rr,\
suspension_travel_meters_fl,suspension_travel_meters_fr,suspension_travel_meters_rl,suspension_travel_meters_rr,\
car_ordinal,car_class,car_performance_index,drivetrain_type,num_cylinders,\
position_x,position_y,position_z,speed,power,torque,\
tire_temp_fl,tire_temp_fr,tire_temp_rl,tire_temp_rr,\
boost,fuel,distance_traveled,best_lap_time,last_lap_time,current_lap_time,current_race_time,\
lap_number,race_position,accelerator,brake,clutch,handbrake,gear,\
steer,normalized_driving_line,normalized_ai_brake_difference,session_id";

/// Renders one packet's columns in [`COLUMN_LIST`] order, as the raw text
/// that goes between tabs in a `COPY ... FROM STDIN` text-format row.
///
/// Kept as a plain ordered `Vec` rather than one long `write!` so the field
/// order is trivially visible and can't drift from [`COLUMN_LIST`] by an
/// off-by-one without also changing the length assertion tests exercise.
fn field_values(p: &TelemetryPacket) -> Vec<String> {
    vec![
        p.is_race_on.to_string(),
        p.timestamp_ms.to_string(),
        p.engine_max_rpm.to_string(),
        p.engine_idle_rpm.to_string(),
        p.current_engine_rpm.to_string(),
        p.accel_x.to_string(),
        p.accel_y.to_string(),
        p.accel_z.to_string(),
        p.vel_x.to_string(),
        p.vel_y.to_string(),
        p.vel_z.to_string(),
        p.angvel_x.to_string(),
        p.angvel_y.to_string(),
        p.angvel_z.to_string(),
        p.yaw.to_string(),
        p.pitch.to_string(),
        p.roll.to_string(),
        p.norm_suspension_travel_fl.to_string(),
        p.norm_suspension_travel_fr.to_string(),
        p.norm_suspension_travel_rl.to_string(),
        p.norm_suspension_travel_rr.to_string(),
        p.tire_slip_ratio_fl.to_string(),
        p.tire_slip_ratio_fr.to_string(),
        p.tire_slip_ratio_rl.to_string(),
        p.tire_slip_ratio_rr.to_string(),
        p.wheel_rotation_speed_fl.to_string(),
        p.wheel_rotation_speed_fr.to_string(),
        p.wheel_rotation_speed_rl.to_string(),
        p.wheel_rotation_speed_rr.to_string(),
        p.wheel_on_rumble_strip_fl.to_string(),
        p.wheel_on_rumble_strip_fr.to_string(),
        p.wheel_on_rumble_strip_rl.to_string(),
        p.wheel_on_rumble_strip_rr.to_string(),
        p.wheel_in_puddle_fl.to_string(),
        p.wheel_in_puddle_fr.to_string(),
        p.wheel_in_puddle_rl.to_string(),
        p.wheel_in_puddle_rr.to_string(),
        p.surface_rumble_fl.to_string(),
        p.surface_rumble_fr.to_string(),
        p.surface_rumble_rl.to_string(),
        p.surface_rumble_rr.to_string(),
        p.tire_slip_angle_fl.to_string(),
        p.tire_slip_angle_fr.to_string(),
        p.tire_slip_angle_rl.to_string(),
        p.tire_slip_angle_rr.to_string(),
        p.tire_combined_slip_fl.to_string(),
        p.tire_combined_slip_fr.to_string(),
        p.tire_combined_slip_rl.to_string(),
        p.tire_combined_slip_rr.to_string(),
        p.suspension_travel_meters_fl.to_string(),
        p.suspension_travel_meters_fr.to_string(),
        p.suspension_travel_meters_rl.to_string(),
        p.suspension_travel_meters_rr.to_string(),
        p.car_ordinal.to_string(),
        p.car_class.to_string(),
        p.car_performance_index.to_string(),
        p.drivetrain_type.to_string(),
        p.num_cylinders.to_string(),
        p.position_x.to_string(),
        p.position_y.to_string(),
        p.position_z.to_string(),
        p.speed.to_string(),
        p.power.to_string(),
        p.torque.to_string(),
        p.tire_temp_fl.to_string(),
        p.tire_temp_fr.to_string(),
        p.tire_temp_rl.to_string(),
        p.tire_temp_rr.to_string(),
        p.boost.to_string(),
        p.fuel.to_string(),
        p.distance_traveled.to_string(),
        p.best_lap_time.to_string(),
        p.last_lap_time.to_string(),
        p.current_lap_time.to_string(),
        p.current_race_time.to_string(),
        p.lap_number.to_string(),
        p.race_position.to_string(),
        p.accelerator.to_string(),
        p.brake.to_string(),
        p.clutch.to_string(),
        p.handbrake.to_string(),
        p.gear.to_string(),
        p.steer.to_string(),
        p.normalized_driving_line.to_string(),
        p.normalized_ai_brake_difference.to_string(),
        match p.session_id {
            Some(id) => id.to_string(),
            None => "\\N".to_string(),
        },
    ]
}

/// Appends one packet as a tab-delimited `COPY` text-format row, including
/// the trailing newline.
///
/// `session_id` is written as Postgres's text-format NULL marker (`\N`)
/// when unset; every other column is a plain numeric scalar, so no
/// quoting or escaping is needed.
pub fn write_row(out: &mut String, p: &TelemetryPacket) {
    let fields = field_values(p);
    out.push_str(&fields.join("\t"));
    out.push('\n');
}
