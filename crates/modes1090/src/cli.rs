//! Command-line options, grounded on `jet1090`'s `clap::Parser` usage
//! (`Options` struct, `--` flag/value conventions) adapted to the ports
//! and toggles this receiver actually exposes.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "modes1090",
    version,
    author = "xoolive",
    about = "1090 MHz Mode S / ADS-B receiver, decoder and network distribution service"
)]
pub struct Options {
    /// Read raw I/Q samples from this file instead of a live device
    /// ("-" for stdin).
    #[arg(long)]
    pub iq_file: Option<PathBuf>,

    /// Loop the input file forever instead of exiting at EOF.
    #[arg(long, default_value_t = false)]
    pub r#loop: bool,

    /// Try to correct single-bit errors on DF11/DF17 frames.
    #[arg(long, default_value_t = true)]
    pub fix_errors: bool,

    /// Also attempt two-bit correction on DF17 (implies --fix-errors).
    #[arg(long, default_value_t = false)]
    pub aggressive: bool,

    /// TCP port for raw-in (accepts `*HEX;\n` lines).
    #[arg(long, default_value_t = 30001)]
    pub raw_in_port: u16,

    /// TCP port for raw-out (emits `*HEX;\n` lines).
    #[arg(long, default_value_t = 30002)]
    pub raw_out_port: u16,

    /// TCP port for sbs-in/sbs-out (Base-Station CSV).
    #[arg(long, default_value_t = 30003)]
    pub sbs_port: u16,

    /// HTTP port for the JSON API and static file server.
    #[arg(long, default_value_t = 8080)]
    pub http_port: u16,

    /// Directory served for any path not matched by a JSON route.
    #[arg(long, default_value = "web_root")]
    pub web_root: PathBuf,

    /// Aircraft record TTL before it's marked LAST_TIME (seconds).
    #[arg(long, default_value_t = 60)]
    pub interactive_ttl: u64,

    /// Silence all network services and just decode to stdout.
    #[arg(long, default_value_t = false)]
    pub quiet: bool,

    /// Verbosity: repeat for more detail (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
