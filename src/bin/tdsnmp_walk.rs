//! tdsnmp-walk: walk subtrees with GETBULK or GETNEXT.

use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use tdsnmp::Session;
use tdsnmp::Version;
use tdsnmp::cli::args::{CommonArgs, OutputArgs, V3Args, WalkArgs, session_config};
use tdsnmp::cli::output::{print_results, write_error};
use tdsnmp::session::DEFAULT_WALK_ROOT;

/// Walk one or more SNMP subtrees.
#[derive(Debug, Parser)]
#[command(name = "tdsnmp-walk", version, about)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    v3: V3Args,

    #[command(flatten)]
    output: OutputArgs,

    #[command(flatten)]
    walk: WalkArgs,

    /// Subtree roots; mib-2 when none are given.
    #[arg(value_name = "OID", default_value = DEFAULT_WALK_ROOT)]
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
    // GETBULK does not exist in v1.
    let use_getnext = args.walk.getnext || config.version() == Version::V1;
    let session = Session::new(config);

    let start = Instant::now();
    let result = if use_getnext {
        session.walk(&args.oids).await
    } else {
        session.bulkwalk(&args.oids, 0, args.walk.max_repetitions).await
    };
    let elapsed = start.elapsed();
    session.close().await;

    match result {
        Ok(vars) => {
            let timing = args.output.timing.then_some(elapsed);
            if let Err(e) = print_results(args.output.format, &vars, timing) {
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
