//! graver - run a PostScript/EPS program and trace its vector output.
//!
//! The interpreter core is device-agnostic; this front end wires it to one
//! of three simple devices: a trace device that prints every device call as
//! a text line, a bounding-box device that reports the extent of all drawn
//! geometry, and a null device that only checks the program executes.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use graver_core::dsc::DscHeader;
use graver_core::graphics::device::{CacheDevice, NullDevice, OutputDevice};
use graver_core::Interpreter;
use memmap2::Mmap;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

/// Output device to run the program against.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum DeviceKind {
    /// Print every device call as a text line (default)
    #[default]
    Trace,
    /// Report the bounding box of all drawn geometry
    Bbox,
    /// Discard all output; only check that the program runs
    Null,
}

/// Interpret a PostScript/EPS program and trace its vector output.
#[derive(Parser, Debug)]
#[command(name = "graver")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the PostScript/EPS input
    input: PathBuf,

    /// Output device
    #[arg(short, long, value_enum, default_value_t = DeviceKind::Trace)]
    device: DeviceKind,

    /// Print the DSC header bounding box before running
    #[arg(long)]
    header: bool,
}

/// Prints each device call as one line, indented by scope depth.
struct TraceDevice {
    out: io::Stdout,
    depth: usize,
}

impl TraceDevice {
    fn new() -> Self {
        Self {
            out: io::stdout(),
            depth: 0,
        }
    }

    fn line(&mut self, text: &str) {
        let indent = "  ".repeat(self.depth);
        let _ = writeln!(self.out, "{indent}{text}");
    }
}

impl OutputDevice for TraceDevice {
    fn start_scope(&mut self) {
        self.line("startscope");
        self.depth += 1;
    }

    fn end_scope(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.line("endscope");
    }

    fn moveto(&mut self, x: f64, y: f64) {
        self.line(&format!("{x:.4} {y:.4} moveto"));
    }

    fn lineto(&mut self, x: f64, y: f64) {
        self.line(&format!("{x:.4} {y:.4} lineto"));
    }

    fn curveto(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) {
        self.line(&format!(
            "{x1:.4} {y1:.4} {x2:.4} {y2:.4} {x3:.4} {y3:.4} curveto"
        ));
    }

    fn closepath(&mut self) {
        self.line("closepath");
    }

    fn stroke(&mut self) {
        self.line("stroke");
    }

    fn fill(&mut self, even_odd: bool) {
        self.line(if even_odd { "eofill" } else { "fill" });
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let file = File::open(&args.input)
        .with_context(|| format!("cannot open {}", args.input.display()))?;
    let mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("cannot map {}", args.input.display()))?;
    let data: &[u8] = &mmap;

    let header = DscHeader::scan(data);
    if args.header {
        match header.bounding_box {
            Some((x0, y0, x1, y1)) => println!("%%BoundingBox: {x0} {y0} {x1} {y1}"),
            None => println!("%%BoundingBox: (none)"),
        }
    }

    let cache = CacheDevice::new();
    let cache_data = cache.data();
    let device: Box<dyn OutputDevice> = match args.device {
        DeviceKind::Trace => Box::new(TraceDevice::new()),
        DeviceKind::Bbox => Box::new(cache),
        DeviceKind::Null => Box::new(NullDevice),
    };

    let mut interp = Interpreter::new(device).context("interpreter setup failed")?;
    interp.set_writer(Box::new(io::stdout()));
    interp.push_program(data);
    let outcome = interp.run();
    interp.finish_device();

    if let Err(error) = outcome {
        let position = interp.error_position();
        match (error.as_ps(), position) {
            (Some(ps), Some(pos)) => bail!("{ps} (near byte {pos})"),
            _ => bail!("{error}"),
        }
    }

    if matches!(args.device, DeviceKind::Bbox) {
        match cache_data.borrow().bbox {
            Some((x0, y0, x1, y1)) => {
                println!(
                    "%%BoundingBox: {} {} {} {}",
                    x0.floor(),
                    y0.floor(),
                    x1.ceil(),
                    y1.ceil()
                );
            }
            None => println!("%%BoundingBox: (empty)"),
        }
    }

    Ok(())
}
