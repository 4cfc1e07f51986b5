use std::process::ExitCode;

fn main() -> ExitCode {
    alma_cli::run()
}
