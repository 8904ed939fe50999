use std::error::Error;
use std::time::Duration;

use clap::Parser;
use once_cell::sync::Lazy;
use regex::Regex;

use futar_rust::osc::message::OscArg;
use futar_rust::publisher::{Publisher, SendError};

/// Paced OSC sender: publishes typed values to one address pattern over UDP.
#[derive(Parser)]
struct Cli {
    /// Destination host name or IP
    #[clap(long, default_value = "127.0.0.1")]
    host: String,
    /// Destination UDP port
    #[clap(long, default_value_t = 9000)]
    port: u16,
    /// Minimum milliseconds between consecutive sends
    #[clap(long, default_value_t = 500)]
    interval_ms: u64,
    /// Stop after this many passes over the value list (default: run forever)
    #[clap(long)]
    cycles: Option<u64>,
    /// OSC address pattern, e.g. /track/2/volume
    address: String,
    /// Values to send, one message each. Typed literals are i:123, f:0.5,
    /// s:hello, b:00ff07 (hex); bare literals infer int, then float, then
    /// string.
    #[clap(required = true, allow_negative_numbers = true)]
    values: Vec<String>,
}

// Typed literals look like "i:123": a tag character, a colon, the body.
static TYPED_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([ifsb]):(.*)$").unwrap());

fn parse_value(raw: &str) -> Result<OscArg, String> {
    if let Some(caps) = TYPED_LITERAL.captures(raw) {
        let body = &caps[2];
        return match &caps[1] {
            "i" => body
                .parse()
                .map(OscArg::Int)
                .map_err(|err| format!("bad int literal {body:?}: {err}")),
            "f" => body
                .parse()
                .map(OscArg::Float)
                .map_err(|err| format!("bad float literal {body:?}: {err}")),
            "s" => Ok(OscArg::Str(body.to_string())),
            "b" => parse_hex(body).map(OscArg::Blob),
            _ => unreachable!("regex only matches the four tag characters"),
        };
    }
    if let Ok(v) = raw.parse::<i32>() {
        return Ok(OscArg::Int(v));
    }
    if let Ok(v) = raw.parse::<f32>() {
        return Ok(OscArg::Float(v));
    }
    Ok(OscArg::Str(raw.to_string()))
}

fn parse_hex(s: &str) -> Result<Vec<u8>, String> {
    if s.len() % 2 != 0 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(format!("bad blob literal {s:?}: expected an even number of hex digits"));
    }
    Ok(s.as_bytes()
        .chunks(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair).expect("hex digits are ASCII");
            u8::from_str_radix(pair, 16).expect("validated above")
        })
        .collect())
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let args = cli
        .values
        .iter()
        .map(|v| parse_value(v))
        .collect::<Result<Vec<_>, _>>()?;

    let mut publisher = Publisher::new(&cli.host, cli.port, Duration::from_millis(cli.interval_ms))?;
    println!(
        "Publishing to {}:{}, at most one message per {} ms",
        cli.host, cli.port, cli.interval_ms
    );

    let mut cycle = 0;
    loop {
        if let Some(limit) = cli.cycles {
            if cycle >= limit {
                break;
            }
        }
        for arg in &args {
            match publisher.send(&cli.address, vec![arg.clone()]) {
                Ok(()) => println!("{} <- {:?}", cli.address, arg),
                // Bad message content will not fix itself on the next loop.
                Err(err @ SendError::Encoding(_)) => return Err(err.into()),
                Err(SendError::Cancelled) => return Ok(()),
                // Transport errors are per-datagram; keep going.
                Err(err) => eprintln!("send failed: {err}"),
            }
        }
        cycle += 1;
    }
    Ok(())
}
