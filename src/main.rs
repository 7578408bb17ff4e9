use grantviz::config::LayoutConfig;
use grantviz::grant::parse_grants;
use grantviz::layout::{LayoutEngine, LayoutMode};
use std::env;
use std::fs;
use std::path::Path;
use std::process;
use tracing::Level;

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} <grants.json> [options]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -m, --mode <name>     Layout mode, or \"all\" (default: packed)");
    eprintln!("  -W, --width <px>      Container width (default: 1000)");
    eprintln!("  -H, --height <px>     Container height (default: 800)");
    eprintln!("  -c, --config <file>   Engine configuration (JSON)");
    eprintln!("  -o, --output <file>   Output file (default: stdout)");
    eprintln!("  -v, --verbose         Debug logging on stderr");
    eprintln!();
    let modes: Vec<&str> = LayoutMode::ALL.iter().map(|m| m.name()).collect();
    eprintln!("Modes: {}", modes.join(", "));
    process::exit(1);
}

fn parse_size(flag: &str, value: &str) -> f64 {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => v,
        _ => {
            eprintln!("Invalid {}: {}", flag, value);
            process::exit(1);
        }
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "-h" || args[1] == "--help" {
        usage(&args[0]);
    }

    let input_path = &args[1];
    let mut output_path: Option<String> = None;
    let mut config_path: Option<String> = None;
    let mut mode_name = "packed".to_string();
    let mut width = 1000.0;
    let mut height = 800.0;
    let mut verbose = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "-o" | "--output" => {
                i += 1;
                if i < args.len() {
                    output_path = Some(args[i].clone());
                }
            }
            "-c" | "--config" => {
                i += 1;
                if i < args.len() {
                    config_path = Some(args[i].clone());
                }
            }
            "-m" | "--mode" => {
                i += 1;
                if i < args.len() {
                    mode_name = args[i].clone();
                }
            }
            "-W" | "--width" => {
                i += 1;
                if i < args.len() {
                    width = parse_size("width", &args[i]);
                }
            }
            "-H" | "--height" => {
                i += 1;
                if i < args.len() {
                    height = parse_size("height", &args[i]);
                }
            }
            "-v" | "--verbose" => verbose = true,
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .compact()
        .init();

    let modes: Vec<LayoutMode> = if mode_name == "all" {
        LayoutMode::ALL.to_vec()
    } else {
        match mode_name.parse() {
            Ok(mode) => vec![mode],
            Err(e) => {
                eprintln!("{}", e);
                process::exit(1);
            }
        }
    };

    let config = match config_path {
        Some(path) => match LayoutConfig::load(Path::new(&path)) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Config error: {}", e);
                process::exit(1);
            }
        },
        None => LayoutConfig::default(),
    };

    let input = match fs::read_to_string(input_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read {}: {}", input_path, e);
            process::exit(1);
        }
    };

    let grants = match parse_grants(&input) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Dataset error: {}", e);
            process::exit(1);
        }
    };

    let engine = LayoutEngine::new(config);
    let mut layouts = Vec::with_capacity(modes.len());
    for mode in &modes {
        match engine.layout(*mode, &grants, width, height) {
            Ok(layout) => layouts.push(layout),
            Err(e) => {
                eprintln!("Layout error ({}): {}", mode, e);
                process::exit(1);
            }
        }
    }
    tracing::info!(grants = grants.len(), layouts = layouts.len(), width, height, "Done");

    let json = if layouts.len() == 1 {
        serde_json::to_string_pretty(&layouts[0])
    } else {
        serde_json::to_string_pretty(&layouts)
    };
    let json = match json {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to serialize layout: {}", e);
            process::exit(1);
        }
    };

    match output_path {
        Some(path) => {
            if let Err(e) = fs::write(&path, &json) {
                eprintln!("Failed to write {}: {}", path, e);
                process::exit(1);
            }
        }
        None => println!("{}", json),
    }
}
