//! Demo CLI: dump a das stream's packet structure to stdout.
//!
//! Usage: `das-dump <path>` — reads a local stream file and prints each
//! descriptor and data packet as it is decoded.

use std::fs::File;
use std::io::BufReader;
use std::process::ExitCode;

use das::stream::{Handlers, Oob, PacketDescriptor, StreamReader};

struct Dump {
    packets: u64,
    records: u64,
}

impl Handlers for Dump {
    fn on_packet_descriptor(&mut self, desc: &PacketDescriptor) {
        self.packets += 1;
        let y_count = desc.planes.len();
        println!("descriptor #{:02} ({} y/yscan/z planes)", desc.id, y_count);
    }

    fn on_data(&mut self, desc: &PacketDescriptor, record: &[u8]) {
        self.records += 1;
        println!("data #{:02}: {} bytes", desc.id, record.len());
    }

    fn on_comment(&mut self, oob: &Oob) {
        if let Oob::Comment { kind, text, .. } = oob {
            tracing::info!(kind = %kind, "{text}");
        }
    }

    fn on_exception(&mut self, oob: &Oob) {
        if let Oob::Exception { kind, message } = oob {
            tracing::error!(kind = %kind, "{message}");
        }
    }

    fn on_close(&mut self) {
        println!("-- stream closed: {} descriptors, {} records --", self.packets, self.records);
    }
}

fn run() -> das::Result<()> {
    das::init_logging();
    let path = std::env::args().nth(1).ok_or_else(|| {
        das::DasError::InvalidArgument("usage: das-dump <path>".into())
    })?;
    let file = File::open(&path)?;
    let mut reader = StreamReader::new(BufReader::new(file));
    let mut dump = Dump { packets: 0, records: 0 };
    reader.read_all(&mut dump)
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("das-dump: {e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
