fn main() {
    use clap::Parser;
    use std::error::Error;
    let args = wanderscrape::cli::Args::parse();
    let level = if args.quiet { "warn" } else { "info" };
    if let Err(e) = wanderscrape::logging::init(level) {
        eprintln!("{}", e);
    }
    if let Err(e) = wanderscrape::cli::run(&args) {
        eprintln!("{}", e);
        if args.verbose {
            let mut source = e.source();
            while let Some(s) = source {
                eprintln!("  cause: {}", s);
                source = s.source();
            }
        }
        std::process::exit(e.exit_code());
    }
}
