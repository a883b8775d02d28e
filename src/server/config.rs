use clap::Parser;
use std::io;
use std::path::PathBuf;

/// Local static file server for the Agon Web VDP.
#[derive(Parser, Debug, Clone)]
#[command(name = "serve", version, about, long_about = None)]
pub struct ServerConfig {
    /// Port to listen on
    #[arg(default_value_t = 8000)]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8000 }
    }
}

/// The canonical directory containing the launcher executable.
///
/// Served content lives next to the binary, so lookups must not depend on
/// the directory the server was started from.
pub fn serving_root() -> io::Result<PathBuf> {
    let exe = std::env::current_exe()?;
    let dir = exe.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "executable has no parent directory",
        )
    })?;
    dir.canonicalize()
}
