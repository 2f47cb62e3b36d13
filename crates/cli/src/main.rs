use std::process::ExitCode;

fn main() -> ExitCode {
    rebill_cli::run()
}
