pub mod battery;
pub mod device;
mod heartbeat;
mod hunt;
mod influx;
mod perch;
mod planner;
mod solar;
mod tariff;

use clap::{Parser, Subcommand};

use crate::cli::{hunt::HuntArgs, perch::PerchArgs};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Main command: fetch the prices, plan the charging, and program the inverter.
    #[clap(name = "hunt")]
    Hunt(Box<HuntArgs>),

    /// Read-only queries.
    #[clap(name = "perch")]
    Perch(Box<PerchArgs>),
}

impl Command {
    pub async fn run(self) -> crate::prelude::Result {
        match self {
            Self::Hunt(args) => args.run().await,
            Self::Perch(args) => args.run().await,
        }
    }
}
