// CLI entry point for the gdhost extension host.
//
// Loads native extensions the way the engine does at startup and reports
// what they registered, or prints the engine API as JSON for binding
// generators.
//
// Usage:
//   gdhost [OPTIONS] <COMMAND>
//
// Commands:
//   load <MANIFEST>...     Load each manifest, initialize every level up to
//                          the configured one, list registered classes,
//                          then deinitialize and unload.
//   list                   Same as `load`, for the manifests named in the
//                          config's `extension_list`.
//   dump-api               Print the engine API as JSON.
//
// Options:
//   --config <PATH>        Host config JSON (see `config.rs`).
//   --feature <TAG>        Extra feature tag (repeatable).
//   --verbose, -v          Log at debug level (default: RUST_LOG or warn).

use std::path::{Path, PathBuf};

use gdhost_core::class_db;
use gdhost_extension::{ExtensionManager, HostConfig, NativeExtension, api};

enum Command {
    Load(Vec<PathBuf>),
    List,
    DumpApi,
}

struct Args {
    config: Option<PathBuf>,
    features: Vec<String>,
    verbose: bool,
    command: Command,
}

fn main() {
    let args = parse_args();

    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let mut config = match &args.config {
        Some(path) => HostConfig::load(path).unwrap_or_else(|e| {
            eprintln!("{e}");
            std::process::exit(1);
        }),
        None => HostConfig::default(),
    };
    config.features.extend(args.features);

    match args.command {
        Command::DumpApi => dump_api(),
        Command::Load(manifests) => {
            let mut manager = ExtensionManager::new(config);
            let mut failed = false;
            for manifest in &manifests {
                if let Err(e) = manager.load_extension(manifest) {
                    eprintln!("{e}");
                    failed = true;
                }
            }
            run(manager);
            if failed {
                std::process::exit(1);
            }
        }
        Command::List => {
            let mut manager = ExtensionManager::new(config);
            let loaded = manager.load_extension_list();
            println!("Loaded {loaded} extension(s) from the extension list");
            run(manager);
        }
    }
}

fn dump_api() {
    match serde_json::to_string_pretty(&api::dump()) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Failed to serialize API: {e}");
            std::process::exit(1);
        }
    }
}

/// Initialize, report, and tear down every loaded extension.
fn run(mut manager: ExtensionManager) {
    manager.initialize_all();
    for path in manager.loaded_extensions() {
        report(&path, manager.get_extension(&path).as_deref());
    }
    manager.deinitialize_all();
    for path in manager.loaded_extensions().iter().rev() {
        if let Err(e) = manager.unload_extension(path) {
            eprintln!("{e}");
        }
    }
}

fn report(path: &Path, extension: Option<&NativeExtension>) {
    let Some(extension) = extension else {
        return;
    };
    println!("{}", path.display());
    if let Some(library) = extension.library_path() {
        println!("  library: {}", library.display());
    }
    println!("  level:   {}", extension.initialization_level());
    for class in extension.class_names() {
        let parent = class_db::parent_class(&class)
            .map(|p| p.to_string())
            .unwrap_or_default();
        let methods = class_db::class_info(&class).map_or(0, |info| info.methods.len());
        println!("  class {class} : {parent} ({methods} methods)");
    }
}

/// Parse command-line arguments. Uses simple `std::env::args()` matching.
fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut config = None;
    let mut features = Vec::new();
    let mut verbose = false;
    let mut command = None;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                config = Some(args.get(i).map(PathBuf::from).unwrap_or_else(|| {
                    eprintln!("--config requires a path");
                    std::process::exit(1);
                }));
            }
            "--feature" => {
                i += 1;
                features.push(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--feature requires a tag");
                    std::process::exit(1);
                }));
            }
            "--verbose" | "-v" => verbose = true,
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "load" => {
                let manifests: Vec<PathBuf> = args[i + 1..].iter().map(PathBuf::from).collect();
                if manifests.is_empty() {
                    eprintln!("load requires at least one manifest");
                    std::process::exit(1);
                }
                command = Some(Command::Load(manifests));
                break;
            }
            "list" => command = Some(Command::List),
            "dump-api" => command = Some(Command::DumpApi),
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let Some(command) = command else {
        print_usage();
        std::process::exit(1);
    };
    Args {
        config,
        features,
        verbose,
        command,
    }
}

fn print_usage() {
    println!("Usage: gdhost [OPTIONS] <COMMAND>");
    println!();
    println!("Commands:");
    println!("  load <MANIFEST>...   Load, initialize and report extensions");
    println!("  list                 Load the manifests in the config's extension_list");
    println!("  dump-api             Print the engine API as JSON");
    println!();
    println!("Options:");
    println!("  --config <PATH>      Host config JSON");
    println!("  --feature <TAG>      Extra feature tag (repeatable)");
    println!("  --verbose, -v        Log at debug level");
    println!("  --help, -h           Show this help");
}
