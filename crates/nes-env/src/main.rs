//! Headless script-driven runner.
//!
//! Runs a ROM for a scripted sequence of joypad inputs and prints a
//! SHA-1 digest of the rendered frames after each segment. The digests
//! pin emulator behaviour: two runs (or two builds) that agree on every
//! digest rendered identical frames.
//!
//! ```text
//! nes-env game.nes --frames 600 --screenshot out.png
//! nes-env game.nes --script inputs.json
//! nes-env game.nes --script inputs.json --verify-determinism
//! ```
//!
//! Script format: a JSON array of segments, each holding an input for a
//! number of frames:
//!
//! ```json
//! [
//!   {"frames": 60},
//!   {"frames": 5, "buttons": ["START"]},
//!   {"frames": 120, "buttons": ["RIGHT", "A"]}
//! ]
//! ```

use std::fs;
use std::path::PathBuf;
use std::process;

use serde::Deserialize;
use sha1::{Digest, Sha1};

use nes_env::{JoypadButtons, Nes, capture};

/// One scripted stretch of frames with a fixed pad state.
#[derive(Debug, Clone, Deserialize)]
struct Segment {
    /// Frames to hold the input for.
    frames: u32,
    /// Button names held for the segment; empty means a released pad.
    #[serde(default)]
    buttons: Vec<String>,
}

struct CliArgs {
    rom_path: PathBuf,
    script_path: Option<PathBuf>,
    frames: u32,
    screenshot_path: Option<PathBuf>,
    verify_determinism: bool,
    trace: bool,
}

fn usage() -> ! {
    eprintln!("Usage: nes-env <rom.nes> [options]");
    eprintln!("  --script <inputs.json>   scripted joypad segments");
    eprintln!("  --frames <N>             run N input-free frames (default 60, ignored with --script)");
    eprintln!("  --screenshot <out.png>   save the final frame");
    eprintln!("  --verify-determinism     run the script twice from reset and compare digests");
    eprintln!("  --trace                  log component diagnostics to stderr");
    process::exit(2);
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();

    let mut rom_path = None;
    let mut script_path = None;
    let mut frames = 60;
    let mut screenshot_path = None;
    let mut verify_determinism = false;
    let mut trace = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--script" => {
                i += 1;
                script_path = args.get(i).map(PathBuf::from);
            }
            "--frames" => {
                i += 1;
                frames = match args.get(i).map(|s| s.parse()) {
                    Some(Ok(n)) => n,
                    _ => usage(),
                };
            }
            "--screenshot" => {
                i += 1;
                screenshot_path = args.get(i).map(PathBuf::from);
            }
            "--verify-determinism" => verify_determinism = true,
            "--trace" => trace = true,
            arg if !arg.starts_with('-') && rom_path.is_none() => {
                rom_path = Some(PathBuf::from(arg));
            }
            _ => usage(),
        }
        i += 1;
    }

    let Some(rom_path) = rom_path else { usage() };
    CliArgs {
        rom_path,
        script_path,
        frames,
        screenshot_path,
        verify_determinism,
        trace,
    }
}

/// Resolve a segment's button names into a pad bitmask.
fn parse_buttons(names: &[String]) -> Result<JoypadButtons, String> {
    let mut buttons = JoypadButtons::empty();
    for name in names {
        match JoypadButtons::from_name(name) {
            Some(button) => buttons |= button,
            None => return Err(format!("unknown button name {name:?}")),
        }
    }
    Ok(buttons)
}

fn hex(digest: &[u8]) -> String {
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Run every segment, returning one digest per segment (SHA-1 over each
/// of the segment's frames in order).
fn run_script(nes: &mut Nes, segments: &[(JoypadButtons, u32)]) -> Vec<String> {
    let mut digests = Vec::with_capacity(segments.len());
    for &(buttons, frames) in segments {
        let mut hasher = Sha1::new();
        for _ in 0..frames {
            let frame = nes.step(buttons);
            hasher.update(frame.as_slice());
        }
        digests.push(hex(&hasher.finalize()));
    }
    digests
}

fn main() {
    let cli = parse_args();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    }

    let rom = match fs::read(&cli.rom_path) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("error: failed to read {}: {e}", cli.rom_path.display());
            process::exit(1);
        }
    };

    let mut nes = match Nes::from_ines(&rom) {
        Ok(nes) => nes,
        Err(e) => {
            eprintln!("error: {}: {e}", cli.rom_path.display());
            process::exit(1);
        }
    };

    let segments = match &cli.script_path {
        Some(path) => {
            let text = match fs::read_to_string(path) {
                Ok(text) => text,
                Err(e) => {
                    eprintln!("error: failed to read {}: {e}", path.display());
                    process::exit(1);
                }
            };
            let raw: Vec<Segment> = match serde_json::from_str(&text) {
                Ok(raw) => raw,
                Err(e) => {
                    eprintln!("error: {}: {e}", path.display());
                    process::exit(1);
                }
            };
            raw
        }
        None => vec![Segment {
            frames: cli.frames,
            buttons: Vec::new(),
        }],
    };

    let mut resolved = Vec::with_capacity(segments.len());
    for (index, segment) in segments.iter().enumerate() {
        match parse_buttons(&segment.buttons) {
            Ok(buttons) => resolved.push((buttons, segment.frames)),
            Err(e) => {
                eprintln!("error: segment {index}: {e}");
                process::exit(1);
            }
        }
    }

    let digests = run_script(&mut nes, &resolved);
    for (index, (segment, digest)) in segments.iter().zip(&digests).enumerate() {
        let buttons = if segment.buttons.is_empty() {
            "-".to_string()
        } else {
            segment.buttons.join("+")
        };
        println!(
            "segment {index}: frames={} buttons={buttons} sha1={digest}",
            segment.frames
        );
    }

    if let Some(path) = &cli.screenshot_path {
        if let Err(e) = capture::save_png(nes.frame(), path) {
            eprintln!("error: failed to save {}: {e}", path.display());
            process::exit(1);
        }
        println!("screenshot: {}", path.display());
    }

    if cli.verify_determinism {
        nes.reset();
        let second = run_script(&mut nes, &resolved);
        if second == digests {
            println!("determinism: ok ({} segments identical after reset)", digests.len());
        } else {
            for (index, (a, b)) in digests.iter().zip(&second).enumerate() {
                if a != b {
                    eprintln!("determinism: segment {index} diverged: {a} vs {b}");
                }
            }
            process::exit(1);
        }
    }

    nes.close();
}
