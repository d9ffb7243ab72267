use std::process::ExitCode;

fn main() -> ExitCode {
    docbrief::run()
}
