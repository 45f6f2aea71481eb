//! Main vehicle-side executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Arm the mechanisms
//!     - Serve the control link and wait for the surface station
//!     - Main loop:
//!         - Demand acquisition (latest demand vector snapshot)
//!         - Attitude correction processing
//!         - Mechanism actuation
//!     - Safe the mechanisms and shut down
//!
//! Inbound packets are handled on the socket's receive thread, which
//! publishes the demand vector and command flags read by the main loop.
//! Camera frames are captured and sent by a dedicated relay thread, see the
//! [`cam`] module.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod att_ctrl;
mod cam;
mod mech;
mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use crossbeam::atomic::AtomicCell;
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use comms_if::{
    eqpt::ControlDems,
    net::{NetParams, NetSock, PacketRegistry, SockEvent},
    packet::{Packet, PacketType},
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

use att_ctrl::AttCtrl;
use cam::TestPattern;
use mech::{MechDriver, SimMech};
use params::RovExecParams;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Limit of the number of times actuation errors can occur consecutively
/// before the executable stops and safes the vehicle.
const MAX_ACTUATION_ERROR_LIMIT: u64 = 5;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    let cli_args = CliArgs::from_args();

    // Initialise session
    let session =
        Session::new("rov_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Triton ROV Vehicle Executable\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: RovExecParams =
        util::params::load("rov_exec.toml").wrap_err("Could not load rov_exec params")?;

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
    if !exec_params.frame_interval_s.is_finite() || exec_params.frame_interval_s <= 0.0 {
        return Err(eyre!(
            "Invalid camera frame interval of {} s",
            exec_params.frame_interval_s
        ));
    }

    let bind_address = match cli_args.bind {
        Some(a) => a,
        None => exec_params.bind_address.clone(),
    };

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut att_ctrl = AttCtrl::default();

    att_ctrl
        .init("att_ctrl.toml", &session)
        .wrap_err("Failed to initialise AttCtrl")?;
    info!("AttCtrl init complete");

    let mut mech: Box<dyn MechDriver> = match exec_params.sim_mech || cli_args.sim {
        true => {
            info!("Using simulated mechanisms");
            Box::new(SimMech::new())
        }
        false => hardware_mech().wrap_err("Failed to initialise the mechanisms hardware")?,
    };

    mech.arm().wrap_err("Failed to arm the mechanisms")?;
    info!("Mechanisms armed");

    info!("Module initialisation complete\n");

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let latest_dems = Arc::new(AtomicCell::new(ControlDems::neutral()));
    let correction_enabled = Arc::new(AtomicBool::new(false));
    let stop_requested = Arc::new(AtomicBool::new(false));
    let link_closed = Arc::new(AtomicBool::new(false));

    let mut registry = PacketRegistry::new();

    {
        let dems = latest_dems.clone();
        registry.add_handler(PacketType::Control, move |packet| {
            if let Packet::Control(new_dems) = packet {
                dems.store(*new_dems);
            }
            Ok(())
        });
    }

    {
        let enabled = correction_enabled.clone();
        registry.add_handler(PacketType::EnableCorrection, move |_| {
            enabled.store(true, Ordering::SeqCst);
            info!("Attitude correction enabled");
            Ok(())
        });
    }

    {
        let enabled = correction_enabled.clone();
        registry.add_handler(PacketType::DisableCorrection, move |_| {
            enabled.store(false, Ordering::SeqCst);
            info!("Attitude correction disabled");
            Ok(())
        });
    }

    {
        let stop = stop_requested.clone();
        registry.add_handler(PacketType::StopServer, move |_| {
            stop.store(true, Ordering::SeqCst);
            info!("Stop requested by the surface station");
            Ok(())
        });
    }

    registry.add_handler(PacketType::Msg, |packet| {
        if let Packet::Msg(msg) = packet {
            info!("Surface: {}", msg);
        }
        Ok(())
    });

    {
        let closed = link_closed.clone();
        registry.add_event_listener(move |event| match event {
            SockEvent::Opened => info!("Link to the surface station open"),
            SockEvent::Closed => {
                closed.store(true, Ordering::SeqCst);
                info!("Link to the surface station closed");
            }
            SockEvent::Errored => warn!("Link to the surface station failed"),
        });
    }

    // Blocks until the surface station connects
    let sock = Arc::new(
        NetSock::serve(&bind_address, net_params, registry)
            .wrap_err_with(|| format!("Could not serve on {}", bind_address))?,
    );

    info!("Network initialisation complete");

    // ---- START CAMERA RELAY ----

    let cam_handle = cam::spawn_relay(
        sock.clone(),
        Box::new(TestPattern::new()),
        Duration::from_secs_f64(exec_params.frame_interval_s),
    );

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let cycle_period = Duration::from_secs_f64(exec_params.cycle_period_s);

    let mut num_cycles: u64 = 0;
    let mut num_consec_overruns: u64 = 0;
    let mut num_consec_actuation_errors: u64 = 0;
    let mut actuation_fault = false;

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        if stop_requested.load(Ordering::SeqCst) {
            info!("Stopping on surface station request");
            break;
        }

        if link_closed.load(Ordering::SeqCst) {
            info!("Link is down, stopping");
            break;
        }

        // ---- DEMAND ACQUISITION ----

        // The wire carries raw f32s, clamp again before they reach the
        // mechanisms
        let dems = latest_dems.load().clamped();

        // ---- ATTITUDE CORRECTION PROCESSING ----

        let attitude = match mech.attitude() {
            Ok(a) => Some(a),
            Err(e) => {
                warn!("Could not read the vehicle attitude: {}", e);
                None
            }
        };

        // Correction needs a live attitude reading
        let att_input = att_ctrl::InputData {
            dems,
            roll_deg: attitude.map_or(0.0, |a| a.roll_deg),
            enabled: correction_enabled.load(Ordering::SeqCst) && attitude.is_some(),
        };

        let dems = match att_ctrl.proc(&att_input) {
            Ok((corrected, _report)) => corrected,
            Err(e) => {
                warn!("Error during AttCtrl processing: {}", e);
                dems
            }
        };

        // ---- ACTUATION ----

        match mech.actuate(&dems) {
            Ok(()) => num_consec_actuation_errors = 0,
            Err(e) => {
                warn!("Could not actuate the mechanisms: {}", e);
                num_consec_actuation_errors += 1;

                if num_consec_actuation_errors > MAX_ACTUATION_ERROR_LIMIT {
                    error!(
                        "Maximum number of consecutive actuation errors ({}) has been \
                         exceeded",
                        MAX_ACTUATION_ERROR_LIMIT
                    );
                    actuation_fault = true;
                    break;
                }
            }
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

    info!("Safing mechanisms");

    if let Err(e) = mech.safe_all() {
        warn!("Could not safe the mechanisms: {}", e);
    }

    sock.close();

    if cam_handle.join().is_err() {
        warn!("Camera relay thread panicked");
    }

    info!("End of execution after {} cycles", num_cycles);

    if actuation_fault {
        return Err(eyre!(
            "Stopped after {} consecutive actuation failures",
            num_consec_actuation_errors
        ));
    }

    Ok(())
}

/// Open the I2C bus and initialise the PWM driver board.
#[cfg(target_arch = "arm")]
fn hardware_mech() -> Result<Box<dyn MechDriver>, Report> {
    let mech_params: mech::MechParams =
        util::params::load("mech.toml").wrap_err("Could not load mech params")?;

    let i2c = rppal::i2c::I2c::new().wrap_err("Could not open the I2C bus")?;

    let driver = mech::Pca9685Mech::new(i2c, mech_params)
        .wrap_err("Could not initialise the PWM driver board")?;

    Ok(Box::new(driver))
}

/// On non-vehicle targets there is no I2C bus to drive.
#[cfg(not(target_arch = "arm"))]
fn hardware_mech() -> Result<Box<dyn MechDriver>, Report> {
    Err(eyre!(
        "Mechanisms hardware is only supported on the vehicle's ARM computer, enable sim_mech \
         or pass --sim"
    ))
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Vehicle executable command line arguments.
#[derive(Debug, StructOpt)]
#[structopt(name = "rov_exec", about = "Triton ROV vehicle executable")]
struct CliArgs {
    /// Address to serve the control link on, overriding the parameter file
    /// value.
    #[structopt(short, long)]
    bind: Option<String>,

    /// Use simulated mechanisms even if the parameter file selects hardware.
    #[structopt(long)]
    sim: bool,
}
