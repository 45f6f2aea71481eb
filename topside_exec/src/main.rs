//! Main topside (surface station) executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Connect to the vehicle
//!     - Main loop:
//!         - Input acquisition:
//!             - Pad polling
//!             - Keyboard fallback snapshot
//!         - Pilot control processing
//!         - Demand transmission
//!         - Link control (correction toggle, vehicle stop, quit)
//!
//! Inbound camera frames and text messages arrive on the socket's receive
//! thread and are cached here for the presentation layer.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod input;
mod params;
mod pilot_ctrl;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use comms_if::{
    eqpt::{ControlDems, NUM_THRUSTERS},
    net::{NetParams, NetSock, PacketRegistry, SockEvent},
    packet::{Packet, PacketType},
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

use input::{InputMap, KeySnapshot, NullDevice, Pad, VectorFallback};
use params::TopsideExecParams;
use pilot_ctrl::PilotCtrl;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Keyboard keys which force individual thrusters to full throttle, in demand vector order.
const THRUSTER_OVERRIDE_KEYS: [&str; NUM_THRUSTERS] = ["kp_7", "kp_9", "kp_4", "kp_6", "kp_1", "kp_3"];

/// Keyboard key which reverses the throttle forced by a thruster override.
const OVERRIDE_REVERSE_KEY: &str = "kp_0";

/// Fallback keyboard key toggling the vehicle's attitude correction.
const TOGGLE_CORRECTION_KEY: &str = "c";

/// Fallback keyboard key commanding the vehicle software to stop.
const STOP_SERVER_KEY: &str = "f10";

/// Fallback keyboard key ending the session.
const QUIT_KEY: &str = "escape";

/// Period between inbound traffic summary log entries.
const TRAFFIC_SUMMARY_INTERVAL: Duration = Duration::from_secs(1);

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    let cli_args = CliArgs::from_args();

    // Initialise session
    let session = Session::new("topside_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Triton ROV Topside Executable\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: TopsideExecParams =
        util::params::load("topside_exec.toml").wrap_err("Could not load topside_exec params")?;

    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;

    info!("Exec parameters loaded");

    // Duration::from_secs_f64 panics on negative or non-finite input
    if !exec_params.cycle_period_s.is_finite() || exec_params.cycle_period_s <= 0.0 {
        return Err(eyre!(
            "Invalid cycle period of {} s",
            exec_params.cycle_period_s
        ));
    }

    let vehicle_address = match cli_args.address {
        Some(a) => a,
        None => exec_params.vehicle_address.clone(),
    };

    // ---- INITIALISE INPUT ----

    let input_map = InputMap::load(&exec_params.input_map_file)
        .wrap_err("Failed to load the input map")?;

    info!("Input map loaded with {} bindings", input_map.len());

    // No pad backend is attached in a headless build. The pad polls the null device, and all
    // piloting comes from the keyboard fallbacks once a presentation layer supplies key
    // snapshots.
    let mut pad = Pad::new(Box::new(NullDevice), input_map);

    info!("Input device: \"{}\"", pad.device_name());

    // Resolve the logical inputs once, the map is fixed for the life of the executable
    let cap_forward = pad.translate("axis.rov.forward");
    let cap_strafe = pad.translate("axis.rov.strafe");
    let cap_rotate = pad.translate("axis.rov.rotate");
    let cap_elevate = pad.translate("axis.rov.elevate");
    let cap_camera_tilt = pad.translate("axis.camera_angle_change");
    let cap_tool_grip = pad.translate("axis.tool_grip");
    let cap_wrist_cw = pad.translate("digital.rotate_wrist.cw");
    let cap_wrist_ccw = pad.translate("digital.rotate_wrist.ccw");
    let cap_toggle_correction = pad.translate("digital.toggle_correction");
    let cap_stop_server = pad.translate("digital.stop_server");
    let cap_quit = pad.translate("digital.quit");

    let surge_fallback = VectorFallback {
        x_pos: Some(String::from("d")),
        x_neg: Some(String::from("a")),
        y_pos: Some(String::from("w")),
        y_neg: Some(String::from("s")),
    };

    let yaw_heave_fallback = VectorFallback {
        x_pos: Some(String::from("right")),
        x_neg: Some(String::from("left")),
        y_pos: Some(String::from("up")),
        y_neg: Some(String::from("down")),
    };

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut pilot_ctrl = PilotCtrl::default();

    pilot_ctrl
        .init("pilot_ctrl.toml", &session)
        .wrap_err("Failed to initialise PilotCtrl")?;
    info!("PilotCtrl init complete");

    info!("Module initialisation complete\n");

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let inbound = Arc::new(Inbound::default());
    let link_closed = Arc::new(AtomicBool::new(false));

    let mut registry = PacketRegistry::new();

    {
        let inbound = inbound.clone();
        registry.add_handler(PacketType::Camera, move |packet| {
            if let Packet::Camera(frame) = packet {
                let mut latest = inbound.frame.lock().unwrap_or_else(|e| e.into_inner());
                *latest = Some(frame.clone());
                inbound.num_frames.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        });
    }

    {
        let inbound = inbound.clone();
        registry.add_handler(PacketType::Msg, move |packet| {
            if let Packet::Msg(msg) = packet {
                info!("Vehicle: {}", msg);
                inbound.num_msgs.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        });
    }

    {
        let closed = link_closed.clone();
        registry.add_event_listener(move |event| match event {
            SockEvent::Opened => info!("Link to the vehicle open"),
            SockEvent::Closed => {
                closed.store(true, Ordering::SeqCst);
                info!("Link to the vehicle closed");
            }
            SockEvent::Errored => warn!("Link to the vehicle failed"),
        });
    }

    let sock = NetSock::connect(&vehicle_address, net_params, registry)
        .wrap_err_with(|| format!("Could not connect to the vehicle at {}", vehicle_address))?;

    info!("Network initialisation complete");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let cycle_period = Duration::from_secs_f64(exec_params.cycle_period_s);
    let dt_s = exec_params.cycle_period_s as f32;
    let deadzone = exec_params.axis_deadzone;

    // The vehicle boots with attitude correction off, this mirrors that state
    let mut correction_enabled = false;

    let mut num_cycles: u64 = 0;
    let mut num_consec_overruns: u64 = 0;
    let mut last_summary = Instant::now();

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Stop once the link has gone down, whatever closed it
        if link_closed.load(Ordering::SeqCst) {
            info!("Link is down, ending the session");
            break;
        }

        // ---- INPUT ACQUISITION ----

        // Headless runs have no presentation layer, so the keyboard snapshot is empty
        pad.poll(KeySnapshot::new());

        let (strafe, forward) = pad.read_vector(cap_strafe, cap_forward, deadzone, &surge_fallback);
        let (rotate, elevate) =
            pad.read_vector(cap_rotate, cap_elevate, deadzone, &yaw_heave_fallback);

        let mut thruster_overrides = [false; NUM_THRUSTERS];
        for (i, key) in THRUSTER_OVERRIDE_KEYS.iter().copied().enumerate() {
            thruster_overrides[i] = pad.digital_down(&[], Some(key));
        }

        let pilot_input = pilot_ctrl::InputData {
            forward,
            strafe,
            rotate,
            elevate,
            camera_tilt_rate: pad.read_axis(cap_camera_tilt, deadzone),
            wrist_cw: pad.digital_down(&[cap_wrist_cw], Some("e")),
            wrist_ccw: pad.digital_down(&[cap_wrist_ccw], Some("q")),
            tool_grip: pad.read_axis(cap_tool_grip, deadzone),
            thruster_overrides,
            override_reverse: pad.digital_down(&[], Some(OVERRIDE_REVERSE_KEY)),
            dt_s,
        };

        // ---- CONTROL ALGORITHM PROCESSING ----

        let dems = match pilot_ctrl.proc(&pilot_input) {
            Ok((dems, _report)) => dems,
            Err(e) => {
                // Never leave the vehicle running on stale demands
                warn!("Error during PilotCtrl processing: {}", e);
                ControlDems::neutral()
            }
        };

        // ---- DEMAND TRANSMISSION ----

        if let Err(e) = sock.send(&Packet::Control(dems)) {
            warn!("Could not send control demands: {}", e);
        }

        // ---- LINK CONTROL ----

        if pad.digital_pressed(&[cap_toggle_correction], Some(TOGGLE_CORRECTION_KEY)) {
            correction_enabled = !correction_enabled;

            let packet = match correction_enabled {
                true => Packet::EnableCorrection,
                false => Packet::DisableCorrection,
            };

            match sock.send(&packet) {
                Ok(()) => info!(
                    "Attitude correction {}",
                    if correction_enabled { "enabled" } else { "disabled" }
                ),
                Err(e) => {
                    // Keep our idea of the vehicle's state in step with what was actually sent
                    correction_enabled = !correction_enabled;
                    warn!("Could not send the correction toggle: {}", e);
                }
            }
        }

        if pad.digital_pressed(&[cap_stop_server], Some(STOP_SERVER_KEY)) {
            match sock.send(&Packet::StopServer) {
                Ok(()) => info!("Vehicle stop requested"),
                Err(e) => warn!("Could not send the stop request: {}", e),
            }
        }

        if pad.digital_pressed(&[cap_quit], Some(QUIT_KEY)) {
            info!("Quit requested");
            break;
        }

        // ---- INBOUND TRAFFIC SUMMARY ----

        if last_summary.elapsed() >= TRAFFIC_SUMMARY_INTERVAL {
            let num_frames = inbound.num_frames.swap(0, Ordering::SeqCst);
            let num_msgs = inbound.num_msgs.swap(0, Ordering::SeqCst);

            if num_frames > 0 || num_msgs > 0 {
                let latest_frame_bytes = inbound
                    .frame
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .as_ref()
                    .map_or(0, Vec::len);

                debug!(
                    "Recieved {} camera frames and {} messages in the last second (latest frame \
                     {} bytes)",
                    num_frames, num_msgs, latest_frame_bytes
                );
            }

            last_summary = Instant::now();
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => {
                num_consec_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
                );
                num_consec_overruns += 1;

                if num_consec_overruns > 1 {
                    debug!("{} consecutive cycle overruns", num_consec_overruns);
                }
            }
        }

        // Increment cycle counter
        num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    if sock.is_open() {
        match sock.disconnect() {
            Ok(()) => info!("Disconnected from the vehicle"),
            Err(e) => warn!("Disconnect handshake failed: {}", e),
        }
    }

    info!("End of execution after {} cycles", num_cycles);

    Ok(())
}

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Topside executable command line arguments.
#[derive(Debug, StructOpt)]
#[structopt(name = "topside_exec", about = "Triton ROV surface station executable")]
struct CliArgs {
    /// Vehicle address to connect to, overriding the parameter file value.
    #[structopt(short, long)]
    address: Option<String>,
}

/// Inbound data published by the socket's receive thread.
#[derive(Default)]
struct Inbound {
    /// Most recent camera frame, JPEG encoded, kept for the presentation layer.
    frame: Mutex<Option<Vec<u8>>>,

    /// Number of camera frames recieved since the last summary.
    num_frames: AtomicU32,

    /// Number of text messages recieved since the last summary.
    num_msgs: AtomicU32,
}
