use std::process::ExitCode;

fn main() -> ExitCode {
    payhub_cli::run()
}
