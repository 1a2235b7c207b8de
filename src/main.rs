//! Console entry point.
//!
//! Loads a cartridge and runs it with a display window.
//! Usage: fantasy8 [OPTIONS] <CARTRIDGE>

use std::error::Error;
use std::path::PathBuf;
use std::process;

use ansi_term::Colour::Red;
use clap::Parser;
use fantasy8::{
    cartridge::cartridge::Cartridge,
    console::{Console, Event},
    controller::{Button, Controller},
    gpu::gpu::{FRAMEBUFFER_LEN, SCREEN_HEIGHT, SCREEN_WIDTH},
};
use log::{error, info, LevelFilter};
use minifb::{Key, KeyRepeat, Scale, Window, WindowOptions};

const KEYMAP: [(Key, Button); 8] = [
    (Key::Z, Button::A),
    (Key::X, Button::B),
    (Key::Up, Button::Up),
    (Key::Right, Button::Right),
    (Key::Down, Button::Down),
    (Key::Left, Button::Left),
    (Key::RightShift, Button::Select),
    (Key::Enter, Button::Start),
];

#[derive(Parser, Debug)]
#[command(name = "fantasy8", about = "Run a fantasy 8-bit console cartridge.")]
struct Args {
    /// Cartridge image to run.
    #[arg(value_name = "CARTRIDGE")]
    cartridge: PathBuf,

    /// Window scale factor (1, 2, 4, 8, 16, 32).
    #[arg(long, default_value = "8", value_parser = parse_scale)]
    scale: Scale,

    /// Frame rate; overrides the cartridge header.
    #[arg(long)]
    fps: Option<u8>,

    /// Instructions to run per host frame while waiting for a refresh.
    #[arg(long, default_value_t = 1_000_000)]
    max_steps: usize,

    /// Log every executed instruction.
    #[arg(long)]
    trace: bool,
}

fn parse_scale(s: &str) -> Result<Scale, String> {
    match s {
        "1" => Ok(Scale::X1),
        "2" => Ok(Scale::X2),
        "4" => Ok(Scale::X4),
        "8" => Ok(Scale::X8),
        "16" => Ok(Scale::X16),
        "32" => Ok(Scale::X32),
        _ => Err(format!("unsupported scale {s}, expected 1, 2, 4, 8, 16 or 32")),
    }
}

fn main() {
    let args = Args::parse();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if args.trace {
        logger.filter_level(LevelFilter::Trace);
    }
    logger.init();

    if let Err(e) = run(&args) {
        error!("{e}");
        eprintln!("{} {e}", Red.bold().paint("ABORT"));
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let cart = Cartridge::load(&args.cartridge)?;
    let mut console = Console::new(cart);
    let fps = args.fps.unwrap_or_else(|| console.target_fps());

    let mut window = Window::new(
        &console.title(),
        SCREEN_WIDTH,
        SCREEN_HEIGHT,
        WindowOptions {
            scale: args.scale,
            ..WindowOptions::default()
        },
    )?;
    window.set_target_fps(fps as usize);
    info!("running at {fps} fps");

    let mut rgb = vec![0u32; FRAMEBUFFER_LEN];
    while window.is_open() && !window.is_key_down(Key::Escape) {
        poll_controller(&window, &mut console.controller);

        match console.run_frame(args.max_steps)? {
            Event::FrameReady => {
                console.gpu.to_rgb(&mut rgb);
                window.update_with_buffer(&rgb, SCREEN_WIDTH, SCREEN_HEIGHT)?;
            }
            Event::Running => window.update(),
            Event::Halted => {
                eprint!("{}", console.cpu.dump());
                eprintln!("press Enter or Space to continue");
                if !wait_for_acknowledge(&mut window) {
                    break;
                }
                console.acknowledge();
            }
        }
    }
    Ok(())
}

/// Rebuild the button state from the keys held right now.
fn poll_controller(window: &Window, controller: &mut Controller) {
    controller.release_all();
    for (key, button) in KEYMAP {
        if window.is_key_down(key) {
            controller.set(button, true);
        }
    }
}

/// Block on the window until the operator presses Enter/Space. False if the window closed.
fn wait_for_acknowledge(window: &mut Window) -> bool {
    loop {
        if !window.is_open() || window.is_key_down(Key::Escape) {
            return false;
        }
        if window.is_key_pressed(Key::Enter, KeyRepeat::No)
            || window.is_key_pressed(Key::Space, KeyRepeat::No)
        {
            return true;
        }
        window.update();
    }
}
