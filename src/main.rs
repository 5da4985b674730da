use std::process::ExitCode;

use anyhow::Context;

const USAGE: &str = "\
Usage: dynsem [OPTIONS] <PROGRAM>

Arguments:
  <PROGRAM>      path to a program file to parse and reduce

Options:
  -v, --version  print the version
  -h, --help     print this help
";

fn run(path: &str) -> anyhow::Result<()> {
    let input = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read `{path}`"))?;
    let term = dynsem::process(path, &input)?;
    log::info!("normal form: {term}");
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("-v") | Some("--version") => {
            println!("dynsem {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        Some("-h") | Some("--help") => {
            print!("{USAGE}");
            ExitCode::SUCCESS
        }
        Some(path) => match run(path) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("{err:?}");
                ExitCode::FAILURE
            }
        },
        None => {
            eprint!("{USAGE}");
            ExitCode::FAILURE
        }
    }
}
