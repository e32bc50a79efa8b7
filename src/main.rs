use std::process::ExitCode;

fn main() -> ExitCode {
    match scriptc::driver::main() {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}
