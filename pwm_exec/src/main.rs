//! # PWM Demonstration Executable
//!
//! Drives a PCA9685 board from a parameter file:
//! - `led` mode blinks an LED on one channel
//! - `servo` mode sweeps a servo between its calibrated end points
//!
//! On a Raspberry Pi the board is opened on the Linux I2C bus. Everywhere else a simulated chip
//! stands in for it, which is enough to see every register transaction in the log.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Blink and sweep loops.
mod demo;

/// Parameters for the PWM executable.
mod params;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Result};
use log::info;
use structopt::StructOpt;

// Internal
use params::PwmExecParams;
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Command line options.
#[derive(Debug, StructOpt)]
#[structopt(name = "pwm_exec", about = "Blink an LED or sweep a servo on a PCA9685")]
struct Opt {
    /// Parameter file, relative to the `params` directory of the software root.
    #[structopt(short, long, default_value = "pwm_exec.toml")]
    params: String,

    /// Log a dump of every register once the board is configured.
    #[structopt(short, long)]
    dump: bool,

    /// Number of cycles to run, overriding the parameter file.
    #[structopt(short, long)]
    cycles: Option<u32>,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("pwm_exec", "sessions")
        .wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("PWM Demonstration Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let mut params: PwmExecParams = util::params::load(&opt.params)
        .wrap_err_with(|| format!("Failed to load the parameter file {}", opt.params))?;

    if opt.cycles.is_some() {
        params.cycles = opt.cycles;
    }

    info!("Parameters loaded: {:#?}", params);

    // ---- RUN ----

    run_on_bus(&params, opt.dump)?;

    info!("End of execution");

    Ok(())
}

// ------------------------------------------------------------------------------------------------
// BUS SELECTION
// ------------------------------------------------------------------------------------------------

#[cfg(all(target_arch = "arm", target_os = "linux"))]
fn run_on_bus(params: &PwmExecParams, dump: bool) -> Result<()> {
    use rppal::{hal::Delay, i2c::I2c};

    let i2c = I2c::with_bus(params.i2c_bus)
        .wrap_err_with(|| format!("Failed to open I2C bus {}", params.i2c_bus))?;

    info!("Opened I2C bus {}", params.i2c_bus);

    demo::run(params, i2c, Delay::new(), dump)
}

#[cfg(not(all(target_arch = "arm", target_os = "linux")))]
fn run_on_bus(params: &PwmExecParams, dump: bool) -> Result<()> {
    use log::warn;
    use pca9685::sim::SimChip;

    warn!("No I2C hardware on this target, using a simulated PCA9685");

    let chip = SimChip::new(params.i2c_address);
    demo::run(params, chip.bus(), chip.delay(), dump)?;

    info!(
        "Simulated chip saw {} transactions and {} us of delays",
        chip.frame_count(),
        chip.total_delay_us()
    );

    Ok(())
}
