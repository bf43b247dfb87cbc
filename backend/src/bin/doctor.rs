//! `purretys-doctor`: check that a checkout has the tools and files it needs.
//!
//! Always exits 0; read the summary line for the verdict.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use purretys::doctor::{run_doctor, DoctorOptions};

#[tokio::main]
async fn main() {
    let options = DoctorOptions::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    println!("Purretys environment check ({})\n", options.root.display());
    let report = run_doctor(&options).await;
    print!("{}", report.render(!options.no_color));
}
