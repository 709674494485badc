//! Formats a template document from stdin to stdout.
//!
//! An optional first argument names a JSON settings file; without one the
//! defaults apply.

use std::io::{self, Read, Write};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn load_config() -> io::Result<settings::Config> {
    match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            serde_json::from_str(&text).map_err(io::Error::other)
        }
        None => Ok(settings::Config::default()),
    }
}

fn main() -> io::Result<()> {
    let config = load_config()?;
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;
    let output = markup::format(&input, &config);
    io::stdout().write_all(output.as_bytes())
}
