//! Loopback simulator: two mailbox endpoints sharing one register file, an
//! interrupt thread per endpoint, and a device handle on each side pushing
//! words both ways.
//!
//! Usage: `mailbox-sim [COUNT]` (default 10000 words per direction).

use std::fmt;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use log::{LevelFilter, error, info};
use mailbox_abi::{MESSAGE_SIZE, READ_MODE_CREDIT};
use mailbox_driver::loopback::{LoopbackChannel, loopback_pair};
use mailbox_driver::logging::{LOGGER, LogSink};
use mailbox_driver::{MailboxConfig, MailboxFile, SeekFrom, SharedRegisters};

const DEFAULT_COUNT: u64 = 10_000;
const DEADLINE: Duration = Duration::from_secs(30);

struct Stdout;

impl LogSink for Stdout {
    fn write_line(&self, args: fmt::Arguments<'_>) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_fmt(args);
        let _ = out.write_all(b"\n");
    }
}

static STDOUT: Stdout = Stdout;

type File = MailboxFile<SharedRegisters>;

fn main() -> ExitCode {
    if LOGGER.init(&STDOUT, LevelFilter::Info).is_err() {
        eprintln!("mailbox-sim: logger already installed");
        return ExitCode::FAILURE;
    }

    let count = match std::env::args().nth(1).map(|arg| arg.parse::<u64>()) {
        None => DEFAULT_COUNT,
        Some(Ok(count)) => count,
        Some(Err(err)) => {
            error!("invalid word count: {}", err);
            return ExitCode::FAILURE;
        }
    };

    match run(count) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            error!("FAIL: {}", msg);
            ExitCode::FAILURE
        }
    }
}

fn run(count: u64) -> Result<(), String> {
    let config = MailboxConfig::default();
    info!("{:?} encoding, {} words each way", config.encoding, count);

    let (host, peer) = loopback_pair(config).map_err(|err| err.to_string())?;
    // The pair comes back opened; hand each session over to a device handle.
    host.close();
    peer.close();
    let mut host_file = MailboxFile::open(host.clone()).map_err(|err| err.to_string())?;
    let mut peer_file = MailboxFile::open(peer.clone()).map_err(|err| err.to_string())?;
    info!("host credit at start: {}", credit(&mut host_file)?);

    let running = Arc::new(AtomicBool::new(true));
    let irq_threads = [host.clone(), peer.clone()].map(|channel| {
        let running = running.clone();
        thread::spawn(move || interrupt_loop(&channel, &running))
    });

    let to_peer: Vec<u64> = (0..count).collect();
    let to_host: Vec<u64> = (0..count).map(|i| i ^ 0xa5a5_0000_0000_0000).collect();

    let result = thread::scope(|s| {
        let host_side = s.spawn(|| exchange(&mut host_file, &to_peer, &to_host));
        let peer_side = s.spawn(|| exchange(&mut peer_file, &to_host, &to_peer));
        let host_result = host_side.join().map_err(|_| "host thread panicked".to_string());
        let peer_result = peer_side.join().map_err(|_| "peer thread panicked".to_string());
        host_result.and_then(|r| r).and(peer_result.and_then(|r| r))
    });

    running.store(false, Ordering::Release);
    for handle in irq_threads {
        let _ = handle.join();
    }

    for (name, channel) in [("host", &host), ("peer", &peer)] {
        let stats = channel.stats();
        info!(
            "{}: sent {} received {} dropped {} interrupts {} halts {} resumes {}",
            name,
            stats.sent,
            stats.received,
            stats.dropped,
            stats.interrupts,
            stats.halts,
            stats.resumes
        );
    }
    result?;
    info!("PASS");
    Ok(())
}

fn interrupt_loop(channel: &LoopbackChannel, running: &AtomicBool) {
    while running.load(Ordering::Acquire) {
        if channel.interrupt_pending() {
            channel.handle_interrupt();
        } else {
            thread::yield_now();
        }
    }
}

fn credit(file: &mut File) -> Result<u64, String> {
    file.seek(SeekFrom::Start(READ_MODE_CREDIT))
        .map_err(|err| err.to_string())?;
    let mut buf = [0u8; 8];
    file.read(&mut buf).map_err(|err| err.to_string())?;
    Ok(u64::from_ne_bytes(buf))
}

/// Interleave writing `outgoing` with reading until `incoming` has arrived,
/// checking order as it goes.
fn exchange(file: &mut File, outgoing: &[u64], incoming: &[u64]) -> Result<(), String> {
    let bytes: Vec<u8> = outgoing.iter().flat_map(|w| w.to_ne_bytes()).collect();
    let deadline = Instant::now() + DEADLINE;
    let mut written = 0;
    let mut received = 0;
    // Ring-index reads are bare words, bitmask reads are {slot, value}.
    let record_size = file.channel().encoding().record_size();
    let mut buf = [0u8; 64 * 2 * MESSAGE_SIZE];

    while written < bytes.len() || received < incoming.len() {
        if Instant::now() > deadline {
            return Err(format!(
                "timed out with {} of {} bytes written, {} of {} words received",
                written,
                bytes.len(),
                received,
                incoming.len()
            ));
        }

        if written < bytes.len() {
            written += file.write(&bytes[written..]).map_err(|err| err.to_string())?;
        }

        if received < incoming.len() {
            // Only block once there is nothing left to send.
            if written == bytes.len() {
                pollster::block_on(file.readable()).map_err(|err| err.to_string())?;
            }
            let n = file.read(&mut buf).map_err(|err| err.to_string())?;
            for record in buf[..n].chunks_exact(record_size) {
                let mut word = [0u8; MESSAGE_SIZE];
                word.copy_from_slice(&record[record_size - MESSAGE_SIZE..]);
                let word = u64::from_ne_bytes(word);
                if incoming.get(received) != Some(&word) {
                    return Err(format!("word {} out of order: got {:#x}", received, word));
                }
                received += 1;
            }
        }
    }
    Ok(())
}
