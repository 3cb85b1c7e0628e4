use std::net::IpAddr;

use clap::Parser;

#[derive(Parser)]
#[command(name = "clipsyncd", about = "Share one clipboard with a phone over LAN polling")]
pub struct Cli {
    /// HTTP listen port
    #[arg(long, default_value_t = 9273)]
    pub port: u16,

    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Shared secret clients must send in X-Password (empty disables)
    #[arg(long)]
    pub password: Option<String>,

    /// Do not show desktop notifications for transfers
    #[arg(long)]
    pub no_notify: bool,

    /// Seconds after which a silent device counts as a first contact again
    #[arg(long, default_value_t = 120)]
    pub liveness_window: u64,

    /// Clipboard sampling interval in milliseconds
    #[arg(long, default_value_t = 500)]
    pub poll_interval_ms: u64,
}
