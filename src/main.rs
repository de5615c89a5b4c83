//! MCS-4 Emulator - CLI Entry Point
//!
//! Commands:
//! - `mcs4-emu run <image>` - Run a ROM image and print the final state
//! - `mcs4-emu test` - Run the built-in self-test

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mcs4-emu")]
#[command(version)]
#[command(about = "An instruction-set simulator for the Intel 4004")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a ROM image
    Run {
        /// Path to the image (.bin for raw bytes, hex text otherwise)
        image: String,
        /// JSON run configuration
        #[arg(short, long)]
        config: Option<String>,
        /// ROM address to load the image at
        #[arg(short, long, value_parser = parse_address)]
        origin: Option<u16>,
        /// Maximum number of instructions to execute
        #[arg(short, long)]
        max_steps: Option<u64>,
        /// Stop when the program counter reaches this address
        #[arg(short, long, value_parser = parse_address)]
        stop_at: Option<u16>,
        /// Log every executed instruction
        #[arg(short, long)]
        trace: bool,
    },
    /// Run the built-in self-test
    Test,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run { image, config, origin, max_steps, stop_at, trace }) => {
            init_logging(trace);
            let overrides = Overrides { origin, max_steps, stop_at };
            run_program(&image, config.as_deref(), overrides);
        }
        Some(Commands::Test) => {
            init_logging(false);
            run_self_test();
        }
        None => {
            println!("MCS-4 Emulator v{}", env!("CARGO_PKG_VERSION"));
            println!("An Intel 4004 instruction-set simulator");
            println!();
            println!("Use --help for available commands");
        }
    }
}

fn init_logging(trace: bool) {
    let filter = if trace {
        EnvFilter::new("trace")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Accepts decimal or `0x`-prefixed hex.
fn parse_address(text: &str) -> Result<u16, String> {
    let value = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => text.parse(),
    }
    .map_err(|e| format!("invalid address '{}': {}", text, e))?;

    if value > 0xFFF {
        return Err(format!("address 0x{:X} is outside 0x000-0xFFF", value));
    }
    Ok(value)
}

struct Overrides {
    origin: Option<u16>,
    max_steps: Option<u64>,
    stop_at: Option<u16>,
}

fn run_program(path: &str, config_path: Option<&str>, overrides: Overrides) {
    use mcs4::{load_image, Cpu, RunConfig};

    let mut config = match config_path {
        Some(p) => match RunConfig::from_file(p) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => RunConfig::default(),
    };
    if let Some(origin) = overrides.origin {
        config.origin = origin;
    }
    if let Some(max_steps) = overrides.max_steps {
        config.max_steps = max_steps;
    }
    if overrides.stop_at.is_some() {
        config.stop_at = overrides.stop_at;
    }

    let image = match load_image(path) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Failed to load image: {}", e);
            std::process::exit(1);
        }
    };

    if image.is_empty() {
        eprintln!("Image {} is empty", path);
        std::process::exit(1);
    }

    let mut cpu = Cpu::new();
    if let Err(e) = cpu.load_image(usize::from(config.origin), &image.bytes) {
        eprintln!("Failed to load image: {}", e);
        std::process::exit(1);
    }
    // Both values were range checked by RunConfig::validate or parse_address.
    if let Err(e) = cpu.regs.pc.set(config.entry_point()) {
        eprintln!("Invalid start address: {}", e);
        std::process::exit(1);
    }
    if let Err(e) = cpu.regs.test.set(config.test_pin) {
        eprintln!("Invalid test pin level: {}", e);
        std::process::exit(1);
    }

    tracing::info!(path, bytes = image.len(), origin = config.origin, "image loaded");

    let start = usize::from(config.origin);
    let end = start + image.len();
    let stop_at = config.stop_at;
    let result = cpu.run_until(config.max_steps, |cpu| {
        let pc = cpu.regs.pc.get();
        match stop_at {
            Some(addr) => pc == addr,
            None => !(start..end).contains(&usize::from(pc)),
        }
    });

    if let Err(e) = result {
        eprintln!("CPU error at PC=0x{:03X}: {}", cpu.regs.pc.get(), e);
        std::process::exit(1);
    }

    if cpu.cycles >= config.max_steps {
        tracing::warn!(max_steps = config.max_steps, "step limit reached");
    }

    match serde_json::to_string_pretty(&cpu.snapshot()) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to serialize state: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_self_test() {
    use mcs4::Cpu;

    println!("MCS-4 Emulator Self-Test");
    println!();

    let mut passed = 0;
    let mut failed = 0;

    // Each case: name, program, expected index register, expected value
    let cases: [(&str, &[u8], usize, u16); 3] = [
        ("LDM / XCH", &[0xD5, 0xB2], 2, 5),
        ("JUN skips code", &[0xD5, 0xB0, 0x40, 0x06, 0xD6, 0xB1, 0xD7, 0xB2], 2, 7),
        (
            "loop summing 4 + 3 + 2 + 1",
            &[0xD4, 0xB0, 0xF1, 0xA1, 0x80, 0xB1, 0xA0, 0xF8, 0xB0, 0x12, 0x02],
            1,
            10,
        ),
    ];

    for (name, program, reg, expected) in cases {
        print!("{}... ", name);
        let mut cpu = Cpu::new();
        let end = program.len() as u16;
        let outcome = cpu
            .load_image(0, program)
            .and_then(|_| cpu.run_until(1000, |c| c.regs.pc.get() >= end));

        match outcome {
            Ok(_) if cpu.regs.reg(reg).get() == expected => {
                println!("ok");
                passed += 1;
            }
            Ok(_) => {
                println!("FAILED (r{} = {}, expected {})", reg, cpu.regs.reg(reg).get(), expected);
                failed += 1;
            }
            Err(e) => {
                println!("FAILED ({})", e);
                failed += 1;
            }
        }
    }

    println!();
    println!("Results: {} passed, {} failed", passed, failed);

    if failed != 0 {
        std::process::exit(1);
    }
}
