fn main() {
    let code = joblog_cli::run_from_env();
    std::process::exit(code);
}
