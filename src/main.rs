use std::process::ExitCode;

fn main() -> ExitCode {
    match trunksync::run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("trunksync: {}", err);
            ExitCode::FAILURE
        }
    }
}
