// In demos/pipe_demo.rs
//
// cargo run --example pipe_demo -- <num_messages>
use dmxp_msgdev::Gateway::MessageDevice;
use dmxp_msgdev::QueueError;
use sha2::{Digest, Sha256};
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn digest(i: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("message_{}", i).as_bytes());
    format!("{:x}", hasher.finalize())
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let num_messages: usize = match args.get(1).map(|s| s.parse()) {
        Some(Ok(n)) => n,
        _ => {
            eprintln!("Usage: {} <num_messages>", args[0]);
            std::process::exit(1);
        }
    };

    let running = Arc::new(AtomicBool::new(true));
    let running_for_handler = Arc::clone(&running);
    ctrlc::set_handler(move || {
        running_for_handler.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");

    let device = Arc::new(MessageDevice::default());
    device.on_open();
    let start = Instant::now();

    let writer = {
        let device = Arc::clone(&device);
        let running = Arc::clone(&running);
        thread::spawn(move || {
            let mut sent = 0;
            for i in 0..num_messages {
                // Format: "message_number:hash\0"
                let message = format!("{}:{}\0", i, digest(i));
                loop {
                    if !running.load(Ordering::SeqCst) {
                        return sent;
                    }
                    match device.on_write(message.as_bytes(), message.len()) {
                        Ok(_) => {
                            sent += 1;
                            break;
                        }
                        Err(e) if e.is_retryable() => thread::sleep(Duration::from_micros(10)),
                        Err(e) => {
                            eprintln!("Writer: message {} rejected: {}", i, e);
                            break;
                        }
                    }
                }
            }
            sent
        })
    };

    let mut received = 0;
    let mut mismatches = 0;
    while received < num_messages && running.load(Ordering::SeqCst) {
        match device.read_to_vec(256) {
            Ok(mut framed) => {
                framed.pop(); // terminator
                let text = String::from_utf8_lossy(&framed);
                match text.split_once(':') {
                    Some((num, hash)) if num.parse().map(digest).as_deref() == Ok(hash) => {}
                    _ => mismatches += 1,
                }
                received += 1;
                if received % 1000 == 0 {
                    println!("--- Received {} messages ---", received);
                }
            }
            Err(QueueError::Empty) => {
                if writer.is_finished() && device.store().is_empty() {
                    break;
                }
                thread::yield_now();
            }
            Err(e) => {
                eprintln!("Reader: {}", e);
                break;
            }
        }
    }

    let sent = writer.join().unwrap_or(0);
    let elapsed = start.elapsed();
    device.on_close();

    println!("Sent {} / received {} messages in {:.2?}", sent, received, elapsed);
    println!(
        "Throughput: {:.2} messages/sec",
        received as f64 / elapsed.as_secs_f64()
    );
    println!("Hash mismatches: {}", mismatches);
    println!("{:#?}", device.stats());
}
