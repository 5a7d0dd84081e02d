// vm-translator - Hack VM to Hack assembly translator
// Translates a single .vm file, or every .vm file in a directory as one program

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use hackvm::vm_translator::{TranslatorConfig, TranslatorError, VmTranslator};
use indexmap::IndexMap;
use log::{debug, info};

const SOURCE_EXTENSION: &str = "vm";
const OUTPUT_EXTENSION: &str = "asm";

struct Options {
    input: PathBuf,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    no_bootstrap: bool,
    verbose: bool,
}

fn main() {
    // Initialize logging
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let options = parse_args(&args);

    if let Err(err) = run(&options) {
        eprintln!("Translation error: {}", err);
        process::exit(1);
    }
}

fn parse_args(args: &[String]) -> Options {
    let program_name = args.first().map(String::as_str).unwrap_or("vm-translator");
    let mut options = Options {
        input: PathBuf::from("."),
        output: None,
        config: None,
        no_bootstrap: false,
        verbose: false,
    };
    let mut input_seen = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-o" | "--output" => {
                if i + 1 >= args.len() {
                    eprintln!("Error: -o requires a filename");
                    process::exit(1);
                }
                options.output = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--config" => {
                if i + 1 >= args.len() {
                    eprintln!("Error: --config requires a filename");
                    process::exit(1);
                }
                options.config = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--no-bootstrap" => {
                options.no_bootstrap = true;
                i += 1;
            }
            "-v" | "--verbose" => {
                options.verbose = true;
                i += 1;
            }
            "-h" | "--help" => {
                print_usage(program_name);
                process::exit(0);
            }
            arg if arg.starts_with('-') => {
                eprintln!("Error: Unknown option '{}'", arg);
                print_usage(program_name);
                process::exit(1);
            }
            _ => {
                if input_seen {
                    eprintln!("Error: Multiple inputs specified");
                    process::exit(1);
                }
                options.input = PathBuf::from(&args[i]);
                input_seen = true;
                i += 1;
            }
        }
    }

    options
}

fn run(options: &Options) -> Result<(), TranslatorError> {
    let input = options.input.as_path();
    let is_program = input.is_dir();

    let mut config = match &options.config {
        Some(path) => TranslatorConfig::load(path)?,
        None if is_program => TranslatorConfig::discover(input)?,
        None => TranslatorConfig::default(),
    };
    if options.no_bootstrap {
        config.bootstrap = false;
    }
    let translator = VmTranslator::with_config(config);

    let (assembly, default_output) = if is_program {
        translate_directory(&translator, input)?
    } else if has_source_extension(input) {
        translate_file(&translator, input)?
    } else {
        return Err(TranslatorError::IOError(format!(
            "input must be a .{} file or a directory: {}",
            SOURCE_EXTENSION,
            input.display()
        )));
    };

    let output = options.output.clone().unwrap_or(default_output);
    if options.verbose {
        println!("Translating {} -> {}", input.display(), output.display());
    }
    fs::write(&output, &assembly)
        .map_err(|err| TranslatorError::IOError(format!("{}: {}", output.display(), err)))?;
    info!(
        "Wrote {} lines of assembly to {}",
        assembly.lines().count(),
        output.display()
    );
    Ok(())
}

fn has_source_extension(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(SOURCE_EXTENSION)
}

/// File name without its extension; this is the module name
fn module_name(path: &Path) -> Result<String, TranslatorError> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .ok_or_else(|| TranslatorError::IOError(format!("invalid file name: {}", path.display())))
}

fn read_source(path: &Path) -> Result<String, TranslatorError> {
    fs::read_to_string(path)
        .map_err(|err| TranslatorError::IOError(format!("{}: {}", path.display(), err)))
}

fn translate_file(
    translator: &VmTranslator,
    path: &Path,
) -> Result<(String, PathBuf), TranslatorError> {
    let module = module_name(path)?;
    debug!("Translating module '{}' from {}", module, path.display());
    let source = read_source(path)?;
    let assembly = translator.translate_module(&module, &source)?;
    Ok((assembly, path.with_extension(OUTPUT_EXTENSION)))
}

fn translate_directory(
    translator: &VmTranslator,
    dir: &Path,
) -> Result<(String, PathBuf), TranslatorError> {
    let canonical = dir.canonicalize()?;
    let program = module_name(&canonical)?;

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_source_extension(&path) {
            paths.push(path);
        }
    }
    paths.sort();

    let mut modules = IndexMap::new();
    for path in &paths {
        modules.insert(module_name(path)?, read_source(path)?);
    }
    debug!(
        "Program '{}' has modules: {:?}",
        program,
        modules.keys().collect::<Vec<_>>()
    );

    let assembly = translator.translate_program(&modules)?;
    let output = dir.join(format!("{}.{}", program, OUTPUT_EXTENSION));
    Ok((assembly, output))
}

fn print_usage(program_name: &str) {
    println!("Usage: {} [options] [input.vm | directory]", program_name);
    println!();
    println!("Options:");
    println!("  -o, --output <file>    Output filename (default: <input>.asm)");
    println!("  --config <file>        Translator settings (TOML)");
    println!("  --no-bootstrap         Do not emit the entry-point call for directories");
    println!("  -v, --verbose          Verbose output");
    println!("  -h, --help             Show this help message");
    println!();
    println!("A directory is translated as one program: every .vm file in it is");
    println!("translated and the output starts with a call to Sys.init.");
    println!("Settings are read from vm-translator.toml in the directory if present.");
    println!();
    println!("Examples:");
    println!(
        "  {} SimpleAdd.vm              # Translate to SimpleAdd.asm",
        program_name
    );
    println!(
        "  {} FibonacciElement/         # Translate to FibonacciElement/FibonacciElement.asm",
        program_name
    );
}
