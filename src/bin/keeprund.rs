//! Daemon entry point.
//!
//! Launched with a single argument, the configuration payload (raw JSON or
//! base64-encoded JSON). Supervises the configured command until the respawn
//! policy or a termination signal ends the run, then exits with the
//! propagated code. Payload problems are reported on stderr before any claim
//! is attempted.

use std::process;

use keeprun::{claim_and_run, DaemonConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let payload = match std::env::args().nth(1) {
        Some(payload) => payload,
        None => {
            eprintln!("usage: keeprund <config-payload>");
            process::exit(2);
        }
    };

    let config = match DaemonConfig::decode_payload(&payload) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("keeprund: {error}");
            process::exit(2);
        }
    };

    match claim_and_run(config).await {
        Ok(code) => process::exit(code),
        Err(error) => {
            eprintln!("keeprund: {error}");
            process::exit(1);
        }
    }
}
