use std::io::{self, Write};

use super::config::OutputConfig;
use super::types::Envelope;

/// Writes one JSON envelope per line to stdout.
pub struct Emitter {
    pretty: bool,
}

impl Emitter {
    pub fn from_config(cfg: OutputConfig) -> Self {
        Emitter { pretty: cfg.pretty }
    }

    pub fn emit(&self, env: &Envelope) -> io::Result<()> {
        let mut out = io::stdout();
        self.write_to(env, &mut out)?;
        out.flush()
    }

    fn write_to(&self, env: &Envelope, w: &mut dyn Write) -> io::Result<()> {
        if self.pretty { serde_json::to_writer_pretty(&mut *w, env).map_err(to_io)? } else { serde_json::to_writer(&mut *w, env).map_err(to_io)? }
        writeln!(w)
    }
}

fn to_io(e: serde_json::Error) -> io::Error { io::Error::new(io::ErrorKind::Other, e) }
