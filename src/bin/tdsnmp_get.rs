//! tdsnmp-get: fetch objects with GET or GETNEXT.

use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use tdsnmp::Session;
use tdsnmp::cli::args::{CommonArgs, OutputArgs, V3Args, session_config};
use tdsnmp::cli::output::{print_results, write_error};

/// Retrieve one or more SNMP objects.
#[derive(Debug, Parser)]
#[command(name = "tdsnmp-get", version, about)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    v3: V3Args,

    #[command(flatten)]
    output: OutputArgs,

    /// Send GETNEXT instead of GET.
    #[arg(long = "next")]
    next: bool,

    /// Objects to fetch: `sysDescr.0`, `.1.3.6.1.2.1.1.5.0`, `IF-MIB::ifDescr.2`.
    #[arg(required = true, value_name = "OID")]
    oids: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    args.output.init_tracing();

    let config = match session_config(&args.common, &args.v3, &args.output) {
        Ok(config) => config,
        Err(e) => {
            write_error(&e);
            return ExitCode::FAILURE;
        }
    };
    let session = Session::new(config);

    let start = Instant::now();
    let result = if args.next {
        session.get_next(&args.oids).await
    } else {
        session.get(&args.oids).await
    };
    let elapsed = start.elapsed();
    session.close().await;

    match result {
        Ok(response) => {
            let timing = args.output.timing.then_some(elapsed);
            if let Err(e) = print_results(args.output.format, &response.into_vec(), timing) {
                eprintln!("Error writing output: {}", e);
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            write_error(&e);
            ExitCode::FAILURE
        }
    }
}
